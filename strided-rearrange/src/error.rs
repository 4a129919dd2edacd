use std::fmt;

/// Malformed pattern text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid token '{token}' at offset {offset}")]
    InvalidToken { token: String, offset: usize },

    #[error("empty pattern")]
    EmptyPattern,

    #[error("nested parentheses are not supported")]
    NestedParentheses,

    #[error("unmatched closing parenthesis")]
    UnmatchedClosingParenthesis,

    #[error("unclosed parenthesis")]
    UnclosedParenthesis,

    #[error("empty group '()'")]
    EmptyGroup,

    #[error("multiple ellipses")]
    MultipleEllipses,

    #[error("ellipsis inside a group")]
    EllipsisInGroup,

    #[error("unexpected '->' in a single side of the pattern")]
    UnexpectedArrow,

    #[error("pattern must contain exactly one '->', found {found}")]
    ArrowCount { found: usize },
}

/// Which side of the pattern an axis belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Input,
    Output,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Input => f.write_str("input"),
            Side::Output => f.write_str("output"),
        }
    }
}

/// Structurally valid but semantically inconsistent patterns.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("ellipsis must be present on both sides or neither (input: {input}, output: {output})")]
    EllipsisAsymmetry { input: bool, output: bool },

    #[error("output axes not in input and no '1' on the input side: {}", .0.join(", "))]
    UnresolvableOutputAxes(Vec<String>),

    #[error("output axis '{0}' is not paired with an input '1' at the same position")]
    UnpairedBroadcastAxis(String),

    #[error("repeated axis name '{axis}' on the {side} side")]
    DuplicateAxis { axis: String, side: Side },
}

/// Pattern valid, but incompatible with the runtime shape or supplied lengths.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("rank {rank} exceeds maximum of {max}")]
    RankExceedsMaximum { rank: usize, max: usize },

    #[error("rank mismatch: ellipsis pattern needs at least {required} dimensions, input has {rank}")]
    RankMismatch { rank: usize, required: usize },

    #[error("too few input dimensions: pattern needs {required}, input has {rank}")]
    TooFewDimensions { rank: usize, required: usize },

    #[error("too many input dimensions: pattern uses {required}, input has {rank}")]
    TooManyDimensions { rank: usize, required: usize },

    #[error("expected singleton axis at position {position}, got {size}")]
    ExpectedSingleton { position: usize, size: usize },

    #[error("missing axis length for broadcast axis '{0}'")]
    MissingBroadcastLength(String),

    #[error("too many unknown sizes in group ({})", .0.join(" "))]
    TooManyUnknownSizes(Vec<String>),

    #[error("group size mismatch for ({}): lengths multiply to {known}, dimension is {actual}", .group.join(" "))]
    GroupSizeMismatch {
        group: Vec<String>,
        known: usize,
        actual: usize,
    },

    #[error("group dimension {actual} is not divisible by {known} when inferring '{axis}'")]
    NonDivisibleGroup {
        axis: String,
        known: usize,
        actual: usize,
    },

    #[error("axis '{axis}' has length {supplied} in axis_lengths but {actual} in the input shape")]
    AxisLengthConflict {
        axis: String,
        supplied: usize,
        actual: usize,
    },

    #[error("axis length for '{0}' must be positive")]
    InvalidAxisLength(String),

    #[error("input axis '{axis}' of size {size} does not appear in the output")]
    DroppedAxis { axis: String, size: usize },

    #[error("buffer holds {actual} elements but shape {shape:?} needs {expected}")]
    BufferLength {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("size overflow while computing {0}")]
    SizeOverflow(&'static str),
}

/// Failure category of a [`RearrangeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Validation,
    Shape,
    Internal,
}

/// Errors that can occur during rearrange parsing, planning or execution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RearrangeError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("shape error: {0}")]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Strided(#[from] strided_view::StridedError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RearrangeError {
    /// Category of this error. Array-layer failures count as internal.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RearrangeError::Parse(_) => ErrorKind::Parse,
            RearrangeError::Validation(_) => ErrorKind::Validation,
            RearrangeError::Shape(_) => ErrorKind::Shape,
            RearrangeError::Strided(_) | RearrangeError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Convenience alias for `Result<T, RearrangeError>`.
pub type Result<T> = std::result::Result<T, RearrangeError>;
