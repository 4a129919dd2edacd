//! Pattern tokenizer and per-side spec builder.

use crate::error::ParseError;

/// Name used for the ellipsis entry of a side.
pub const ELLIPSIS: &str = "...";

/// Name of the literal singleton axis.
pub const SINGLETON: &str = "1";

/// Lexical token of a pattern side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `[A-Za-z0-9_]+`, except the exact text `1`.
    Ident(String),
    /// The literal `1`.
    One,
    Ellipsis,
    LParen,
    RParen,
    Arrow,
}

/// One parsed axis entry of a side.
///
/// A parenthesized group contributes one entry per member, all carrying the
/// same `group` ordinal so that adjacent groups stay distinguishable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisSpec {
    pub name: String,
    pub group: Option<usize>,
    pub is_ellipsis: bool,
}

impl AxisSpec {
    fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: None,
            is_ellipsis: false,
        }
    }

    fn ellipsis() -> Self {
        Self {
            name: ELLIPSIS.to_string(),
            group: None,
            is_ellipsis: true,
        }
    }

    fn member(name: impl Into<String>, group: usize) -> Self {
        Self {
            name: name.into(),
            group: Some(group),
            is_ellipsis: false,
        }
    }

    /// True if this entry is a member of a parenthesized group.
    #[inline]
    pub fn is_group(&self) -> bool {
        self.group.is_some()
    }

    /// True for the literal `1`.
    #[inline]
    pub fn is_singleton(&self) -> bool {
        self.name == SINGLETON
    }

    /// True for an axis that carries a real name (not `1`, not `...`).
    #[inline]
    pub fn is_named(&self) -> bool {
        !self.is_ellipsis && !self.is_singleton()
    }
}

/// One physical dimension of a side: a run of entries that maps to exactly
/// one input or output dimension (or, for the ellipsis, to zero or more).
#[derive(Debug, Clone, Copy)]
pub(crate) enum Term<'a> {
    Ellipsis,
    Singleton,
    Axis(&'a str),
    Group(&'a [AxisSpec]),
}

/// Split a side into terms, each paired with the index of its first entry.
pub(crate) fn terms(spec: &[AxisSpec]) -> Vec<(usize, Term<'_>)> {
    let mut out = Vec::with_capacity(spec.len());
    let mut i = 0;
    while i < spec.len() {
        let entry = &spec[i];
        if let Some(g) = entry.group {
            let len = spec[i..]
                .iter()
                .take_while(|e| e.group == Some(g))
                .count();
            out.push((i, Term::Group(&spec[i..i + len])));
            i += len;
            continue;
        }
        let term = if entry.is_ellipsis {
            Term::Ellipsis
        } else if entry.is_singleton() {
            Term::Singleton
        } else {
            Term::Axis(&entry.name)
        };
        out.push((i, term));
        i += 1;
    }
    out
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Lex one pattern side into tokens.
pub fn tokenize(s: &str) -> crate::Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut rest = s;
    let mut offset = 0;

    while let Some(c) = rest.chars().next() {
        let len = if c.is_whitespace() {
            c.len_utf8()
        } else if is_ident_char(c) {
            let len = rest.find(|ch: char| !is_ident_char(ch)).unwrap_or(rest.len());
            let ident = &rest[..len];
            tokens.push(if ident == SINGLETON {
                Token::One
            } else {
                Token::Ident(ident.to_string())
            });
            len
        } else if rest.starts_with(ELLIPSIS) {
            tokens.push(Token::Ellipsis);
            3
        } else if rest.starts_with("->") {
            tokens.push(Token::Arrow);
            2
        } else if c == '(' {
            tokens.push(Token::LParen);
            1
        } else if c == ')' {
            tokens.push(Token::RParen);
            1
        } else {
            return Err(ParseError::InvalidToken {
                token: c.to_string(),
                offset,
            }
            .into());
        };
        rest = &rest[len..];
        offset += len;
    }

    if tokens.is_empty() {
        return Err(ParseError::EmptyPattern.into());
    }
    Ok(tokens)
}

/// Build the ordered [`AxisSpec`] sequence of one side from its tokens.
pub fn build_spec(tokens: &[Token]) -> crate::Result<Vec<AxisSpec>> {
    let mut spec = Vec::with_capacity(tokens.len());
    let mut pending: Option<Vec<String>> = None;
    let mut groups = 0;
    let mut seen_ellipsis = false;

    for token in tokens {
        match token {
            Token::LParen => {
                if pending.is_some() {
                    return Err(ParseError::NestedParentheses.into());
                }
                pending = Some(Vec::new());
            }
            Token::RParen => {
                let members = pending.take().ok_or(ParseError::UnmatchedClosingParenthesis)?;
                if members.is_empty() {
                    return Err(ParseError::EmptyGroup.into());
                }
                spec.extend(members.into_iter().map(|m| AxisSpec::member(m, groups)));
                groups += 1;
            }
            Token::Ellipsis => {
                if pending.is_some() {
                    return Err(ParseError::EllipsisInGroup.into());
                }
                if seen_ellipsis {
                    return Err(ParseError::MultipleEllipses.into());
                }
                seen_ellipsis = true;
                spec.push(AxisSpec::ellipsis());
            }
            Token::Ident(_) | Token::One => {
                let name = match token {
                    Token::Ident(name) => name.as_str(),
                    _ => SINGLETON,
                };
                match pending.as_mut() {
                    Some(members) => members.push(name.to_string()),
                    None => spec.push(AxisSpec::plain(name)),
                }
            }
            Token::Arrow => return Err(ParseError::UnexpectedArrow.into()),
        }
    }

    if pending.is_some() {
        return Err(ParseError::UnclosedParenthesis.into());
    }
    Ok(spec)
}

/// Tokenize and build one side.
pub fn parse_side(s: &str) -> crate::Result<Vec<AxisSpec>> {
    let tokens = tokenize(s)?;
    build_spec(&tokens)
}

/// Split `"input -> output"` at its single arrow.
pub fn split_pattern(pattern: &str) -> crate::Result<(&str, &str)> {
    let found = pattern.matches("->").count();
    if found != 1 {
        return Err(ParseError::ArrowCount { found }.into());
    }
    pattern
        .split_once("->")
        .ok_or_else(|| ParseError::ArrowCount { found: 0 }.into())
}

/// Parse a combined pattern like `"b (h w) c -> b h w c"` into both sides.
pub fn parse_pattern(pattern: &str) -> crate::Result<(Vec<AxisSpec>, Vec<AxisSpec>)> {
    let (lhs, rhs) = split_pattern(pattern)?;
    Ok((parse_side(lhs)?, parse_side(rhs)?))
}
