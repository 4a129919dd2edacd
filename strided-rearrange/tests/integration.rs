use std::collections::HashMap;

use approx::assert_abs_diff_eq;
use rand::{rngs::StdRng, Rng, SeedableRng};
use strided_rearrange::{
    rearrange, rearrange_array, rearrange_pattern, ErrorKind, ParseError, Rearrange,
    RearrangeError, ShapeError, ValidationError,
};
use strided_view::StridedArray;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn random_buffer(len: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen::<f64>()).collect()
}

fn lengths(pairs: &[(&str, usize)]) -> HashMap<String, usize> {
    pairs.iter().map(|&(k, v)| (k.to_string(), v)).collect()
}

fn assert_same(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert_abs_diff_eq!(*a, *e);
    }
}

fn run(x: &[f64], shape: &[usize], pattern: &str, pairs: &[(&str, usize)]) -> (Vec<f64>, Vec<usize>) {
    rearrange_pattern(x, shape, pattern, &lengths(pairs)).unwrap()
}

fn err(shape: &[usize], pattern: &str, pairs: &[(&str, usize)]) -> RearrangeError {
    let len = shape.iter().product();
    rearrange_pattern(&vec![0.0f64; len], shape, pattern, &lengths(pairs)).unwrap_err()
}

/// Reference transpose: `out[idx[perm[k]]...] = x[idx]` for a row-major `x`.
fn permute_reference(x: &[f64], shape: &[usize], perm: &[usize]) -> Vec<f64> {
    let src = StridedArray::from_vec(x.to_vec(), shape).unwrap();
    let out_dims: Vec<usize> = perm.iter().map(|&p| shape[p]).collect();
    StridedArray::from_fn_row_major(&out_dims, |idx| {
        let mut src_idx = vec![0; shape.len()];
        for (k, &p) in perm.iter().enumerate() {
            src_idx[p] = idx[k];
        }
        src.get(&src_idx)
    })
    .into_vec()
}

#[test]
fn test_identity() {
    init_logger();
    for (seed, shape) in [[2usize, 3, 4], [1, 5, 1], [4, 1, 7]].iter().enumerate() {
        let x = random_buffer(shape.iter().product(), seed as u64);
        let (out, out_shape) = rearrange(&x, shape, "a b c", "a b c", &HashMap::new()).unwrap();
        assert_eq!(out_shape, shape.to_vec());
        assert_eq!(out, x);
    }
}

#[test]
fn test_transpose_round_trip() {
    init_logger();
    let x = random_buffer(6, 1);
    let (t, t_shape) = rearrange(&x, &[2, 3], "a b", "b a", &HashMap::new()).unwrap();
    assert_eq!(t_shape, vec![3, 2]);
    assert_same(&t, &permute_reference(&x, &[2, 3], &[1, 0]));
    let (back, back_shape) = rearrange(&t, &t_shape, "b a", "a b", &HashMap::new()).unwrap();
    assert_eq!(back_shape, vec![2, 3]);
    assert_eq!(back, x);
}

#[test]
fn test_group_ungroup_inverse() {
    init_logger();
    let x = random_buffer(24, 2);
    let (split, split_shape) = rearrange(&x, &[6, 4], "(h w) c", "h w c", &lengths(&[("h", 2)])).unwrap();
    assert_eq!(split_shape, vec![2, 3, 4]);
    let (merged, merged_shape) =
        rearrange(&split, &split_shape, "h w c", "(h w) c", &HashMap::new()).unwrap();
    assert_eq!(merged_shape, vec![6, 4]);
    assert_eq!(merged, x);
}

#[test]
fn test_ellipsis_passthrough() {
    init_logger();
    let x = random_buffer(30, 3);
    let (out, shape) = run(&x, &[5, 2, 3], "... a -> a ...", &[]);
    assert_eq!(shape, vec![3, 5, 2]);
    assert_same(&out, &permute_reference(&x, &[5, 2, 3], &[2, 0, 1]));
}

#[test]
fn test_broadcast() {
    init_logger();
    let x = vec![1.5, -2.0, 3.25];
    let (out, shape) = rearrange(&x, &[1, 3], "1 c", "r c", &lengths(&[("r", 5)])).unwrap();
    assert_eq!(shape, vec![5, 3]);
    for row in out.chunks(3) {
        assert_eq!(row, x.as_slice());
    }
}

#[test]
fn test_broadcast_inner_and_grouped() {
    let x: Vec<i32> = vec![1, 2];
    let (out, shape) = rearrange(&x, &[2, 1], "c 1", "c r", &lengths(&[("r", 3)])).unwrap();
    assert_eq!(shape, vec![2, 3]);
    assert_eq!(out, vec![1, 1, 1, 2, 2, 2]);

    // the new axis can land inside a merged output group
    let (out, shape) = rearrange(&x, &[1, 2], "1 c", "(r c)", &lengths(&[("r", 2)])).unwrap();
    assert_eq!(shape, vec![4]);
    assert_eq!(out, vec![1, 2, 1, 2]);
}

#[test]
fn test_missing_axis_rejected() {
    let e = err(&[2, 3], "a b -> a b c", &[]);
    assert_eq!(
        e,
        RearrangeError::Validation(ValidationError::UnresolvableOutputAxes(vec!["c".into()]))
    );
    assert_eq!(e.kind(), ErrorKind::Validation);
    assert!(e.to_string().contains('c'));
}

#[test]
fn test_group_mismatch_rejected() {
    let e = err(&[6, 4], "(h w) c -> h w c", &[("h", 4)]);
    assert_eq!(e.kind(), ErrorKind::Shape);
    assert!(matches!(
        e,
        RearrangeError::Shape(ShapeError::NonDivisibleGroup { known: 4, actual: 6, .. })
    ));
    // 7 is not split by a known factor of 2 into a truncated 3
    assert!(matches!(
        err(&[7], "(h w) -> h w", &[("h", 2)]),
        RearrangeError::Shape(ShapeError::NonDivisibleGroup { .. })
    ));
}

#[test]
fn test_rank_bound() {
    let shape = [1usize; 11];
    for pattern in [
        "... -> ...",
        "a b c d e f g h i j k -> a b c d e f g h i j k",
    ] {
        assert_eq!(
            err(&shape, pattern, &[]),
            RearrangeError::Shape(ShapeError::RankExceedsMaximum { rank: 11, max: 10 })
        );
    }
    // the rank is checked before the pattern is looked at
    let rank_err = RearrangeError::Shape(ShapeError::RankExceedsMaximum { rank: 11, max: 10 });
    for (lhs, rhs) in [("a b", "a b c"), ("... a", "a"), ("a a", "a"), ("(a", "a")] {
        assert_eq!(
            rearrange(&[0.0], &shape, lhs, rhs, &HashMap::new()).unwrap_err(),
            rank_err
        );
    }
    assert_eq!(err(&shape, "a b -> a -> b", &[]), rank_err);
    let a = StridedArray::from_vec(vec![0.0f64], &shape).unwrap();
    assert_eq!(
        rearrange_array(&a, "a b", "a b c", &HashMap::new()).unwrap_err(),
        rank_err
    );
    let plan = Rearrange::new("a b", "b a").unwrap().plan(&shape, &HashMap::new());
    assert_eq!(plan.unwrap_err(), rank_err);

    // rank 10 itself is fine
    let (_, out_shape) = run(&[0.0], &[1; 10], "... -> ...", &[]);
    assert_eq!(out_shape, vec![1; 10]);
}

#[test]
fn test_group_split() {
    let x = random_buffer(120, 4);
    let (out, shape) = run(&x, &[12, 10], "(h w) c -> h w c", &[("h", 3)]);
    assert_eq!(shape, vec![3, 4, 10]);
    assert_eq!(out, x);

    let (out, shape) = run(&x, &[12, 10], "(h w) c -> h w c", &[("h", 3), ("w", 4)]);
    assert_eq!(shape, vec![3, 4, 10]);
    assert_eq!(out, x);
}

#[test]
fn test_group_errors() {
    assert!(matches!(
        err(&[12, 10], "(h w) c -> h w c", &[("h", 5), ("w", 3)]),
        RearrangeError::Shape(ShapeError::GroupSizeMismatch { known: 15, actual: 12, .. })
    ));
    assert!(matches!(
        err(&[12, 10], "(h w x) c -> h w x c", &[]),
        RearrangeError::Shape(ShapeError::TooManyUnknownSizes(_))
    ));
}

#[test]
fn test_ellipsis_variants() {
    let x = random_buffer(24, 5);
    let (out, shape) = run(&x, &[2, 3, 4], "... c -> c ...", &[]);
    assert_eq!(shape, vec![4, 2, 3]);
    assert_same(&out, &permute_reference(&x, &[2, 3, 4], &[2, 0, 1]));

    let (out, shape) = run(&x, &[4, 2, 3], "c ... -> ... c", &[]);
    assert_eq!(shape, vec![2, 3, 4]);
    assert_same(&out, &permute_reference(&x, &[4, 2, 3], &[1, 2, 0]));

    let y = random_buffer(240, 6);
    let (out, shape) = run(&y, &[2, 12, 10], "b (h w) c -> b h w c", &[("h", 3)]);
    assert_eq!(shape, vec![2, 3, 4, 10]);
    assert_eq!(out, y);
}

#[test]
fn test_ellipsis_swap_ends() {
    let shape = [2usize, 3, 4, 5, 6, 7];
    let x = random_buffer(shape.iter().product(), 7);
    let (out, out_shape) = run(&x, &shape, "a ... b -> b ... a", &[]);
    assert_eq!(out_shape, vec![7, 3, 4, 5, 6, 2]);
    assert_same(&out, &permute_reference(&x, &shape, &[5, 1, 2, 3, 4, 0]));
}

#[test]
fn test_ellipsis_between_singletons() {
    let x = random_buffer(6, 8);
    let (out, shape) = run(&x, &[1, 2, 1, 3, 1], "1 ... 1 -> ...", &[]);
    assert_eq!(shape, vec![2, 1, 3]);
    assert_eq!(out, x);
}

#[test]
fn test_singleton_squeeze() {
    let x = vec![1.0; 5];
    let (out, shape) = run(&x, &[1, 5, 1], "1 h 1 -> h", &[]);
    assert_eq!(shape, vec![5]);
    assert_eq!(out, x);

    let x = random_buffer(10, 9);
    let (out, shape) = run(&x, &[1, 5, 1, 2], "1 h 1 c -> h c", &[]);
    assert_eq!(shape, vec![5, 2]);
    assert_eq!(out, x);

    let (out, shape) = run(&[1.0, 2.0, 3.0], &[1, 1, 3], "1 1 c -> c", &[]);
    assert_eq!(shape, vec![3]);
    assert_eq!(out, vec![1.0, 2.0, 3.0]);

    let x = vec![1.0; 1000];
    let (out, shape) = run(&x, &[1, 1000, 1], "1 h 1 -> h", &[]);
    assert_eq!(shape, vec![1000]);
    assert!(out.iter().all(|&v| v == 1.0));
}

#[test]
fn test_singleton_expected() {
    assert_eq!(
        err(&[2, 5, 3], "1 h c -> h c", &[]),
        RearrangeError::Shape(ShapeError::ExpectedSingleton {
            position: 0,
            size: 2
        })
    );
}

#[test]
fn test_missing_broadcast_length() {
    assert_eq!(
        err(&[1, 3], "1 c -> r c", &[]),
        RearrangeError::Shape(ShapeError::MissingBroadcastLength("r".into()))
    );
}

#[test]
fn test_add_singleton() {
    let x = random_buffer(6, 10);
    let (out, shape) = run(&x, &[2, 3], "h w -> h w 1", &[]);
    assert_eq!(shape, vec![2, 3, 1]);
    assert_eq!(out, x);
}

#[test]
fn test_empty_tensor() {
    let x: Vec<f64> = Vec::new();
    let (out, shape) = run(&x, &[0, 3, 4], "b h w -> w (h b)", &[]);
    assert_eq!(shape, vec![4, 0]);
    assert!(out.is_empty());
}

#[test]
fn test_flatten() {
    let x = random_buffer(6000, 11);
    let (out, shape) = run(&x, &[10, 20, 30], "a b c -> (a b) c", &[]);
    assert_eq!(shape, vec![200, 30]);
    assert_eq!(out, x);

    let x = random_buffer(24, 12);
    let (out, shape) = run(&x, &[2, 3, 4], "a b c -> (a b c)", &[]);
    assert_eq!(shape, vec![24]);
    assert_eq!(out, x);

    let x = random_buffer(105, 13);
    let (out, shape) = run(&x, &[3, 5, 7], "a b c -> a (b c)", &[]);
    assert_eq!(shape, vec![3, 35]);
    assert_eq!(out, x);
}

#[test]
fn test_high_dimensional_merge() {
    let shape = [2usize, 3, 4, 5, 6];
    let x = random_buffer(shape.iter().product(), 14);
    let (out, out_shape) = run(&x, &shape, "a b c d e -> e (d c b a)", &[]);
    assert_eq!(out_shape, vec![6, 120]);
    assert_same(&out, &permute_reference(&x, &shape, &[4, 3, 2, 1, 0]));
}

#[test]
fn test_transpose_high_dim() {
    let shape = [2usize, 3, 4, 5];
    let x = random_buffer(shape.iter().product(), 15);
    let (out, out_shape) = run(&x, &shape, "a b c d -> d c b a", &[]);
    assert_eq!(out_shape, vec![5, 4, 3, 2]);
    assert_same(&out, &permute_reference(&x, &shape, &[3, 2, 1, 0]));
}

#[test]
fn test_unflatten_three_members() {
    let x = random_buffer(120, 16);
    let (out, shape) = run(&x, &[24, 5], "(a b c) d -> a b c d", &[("a", 2), ("b", 3), ("c", 4)]);
    assert_eq!(shape, vec![2, 3, 4, 5]);
    assert_eq!(out, x);
}

#[test]
fn test_flatten_unflatten_mixed_order() {
    let x = random_buffer(60, 17);
    let (flat, flat_shape) = run(&x, &[3, 4, 5], "a b c -> (c a b)", &[]);
    assert_eq!(flat_shape, vec![60]);
    let (out, shape) = run(&flat, &flat_shape, "(c a b) -> a b c", &[("a", 3), ("b", 4)]);
    assert_eq!(shape, vec![3, 4, 5]);
    assert_eq!(out, x);
}

#[test]
fn test_integer_elements() {
    let x = vec![1i32; 6];
    let (out, shape) = rearrange_pattern(&x, &[2, 3], "h w -> (h w)", &HashMap::new()).unwrap();
    assert_eq!(shape, vec![6]);
    assert_eq!(out, vec![1i32; 6]);

    let x: Vec<u8> = (0..6).collect();
    let (out, shape) = rearrange_pattern(&x, &[2, 3], "h w -> w h", &HashMap::new()).unwrap();
    assert_eq!(shape, vec![3, 2]);
    assert_eq!(out, vec![0, 3, 1, 4, 2, 5]);
}

#[test]
fn test_pair_elements() {
    // any Copy + Default value moves through unchanged
    let x: Vec<(f64, f64)> = (0..6).map(|i| (i as f64, -(i as f64))).collect();
    let (out, shape) = rearrange_pattern(&x, &[2, 3], "h w -> w h", &HashMap::new()).unwrap();
    assert_eq!(shape, vec![3, 2]);
    assert_eq!(out[1], (3.0, -3.0));
}

#[test]
fn test_parse_errors() {
    assert_eq!(
        err(&[3, 4, 5], "a b c -> (a b) c -> a b c", &[("a", 3), ("b", 4)]),
        RearrangeError::Parse(ParseError::ArrowCount { found: 2 })
    );
    assert_eq!(
        err(&[2, 3, 4], "... a ... -> a ...", &[]),
        RearrangeError::Parse(ParseError::MultipleEllipses)
    );
    assert_eq!(
        err(&[120, 6], "((a b) c d) e -> a b c d e", &[("a", 2), ("b", 3)]),
        RearrangeError::Parse(ParseError::NestedParentheses)
    );
    assert_eq!(
        err(&[2, 3], "a $ -> a", &[]).kind(),
        ErrorKind::Parse
    );
}

#[test]
fn test_repeated_names_rejected() {
    assert!(matches!(
        err(&[2, 2, 3], "a a b -> b (a a)", &[]),
        RearrangeError::Validation(ValidationError::DuplicateAxis { .. })
    ));
    assert!(matches!(
        err(&[6, 10], "(a b) (b c) -> a b c", &[]),
        RearrangeError::Validation(ValidationError::DuplicateAxis { .. })
    ));
}

#[test]
fn test_dropped_axis_rejected() {
    // "2" is an ordinary axis name here, and it is absent from the output
    assert_eq!(
        err(&[2, 3, 4], "2 b c -> b c", &[("b", 3)]),
        RearrangeError::Shape(ShapeError::DroppedAxis {
            axis: "2".into(),
            size: 2
        })
    );
}

#[test]
fn test_dimension_count() {
    assert!(matches!(
        err(&[2, 3], "a b c -> c b a", &[]),
        RearrangeError::Shape(ShapeError::TooFewDimensions { .. })
    ));
    assert!(matches!(
        err(&[2, 3, 4], "a b -> b a", &[]),
        RearrangeError::Shape(ShapeError::TooManyDimensions { .. })
    ));
}

#[test]
fn test_buffer_length_checked() {
    let e = rearrange(&[0.0; 5], &[2, 3], "a b", "b a", &HashMap::new()).unwrap_err();
    assert!(matches!(e, RearrangeError::Shape(ShapeError::BufferLength { .. })));
}

#[test]
fn test_compiled_rearrange_reuse() {
    init_logger();
    let r = Rearrange::from_pattern("b (h w) -> b w h").unwrap();
    let lens = lengths(&[("h", 2)]);
    for (seed, b) in [1usize, 3, 5].iter().enumerate() {
        let x = random_buffer(b * 8, 100 + seed as u64);
        let (out, shape) = r.apply(&x, &[*b, 8], &lens).unwrap();
        assert_eq!(shape, vec![*b, 4, 2]);
        assert_same(&out, &permute_reference(&x, &[*b, 2, 4], &[0, 2, 1]));
    }
}

#[test]
fn test_rearrange_array_matches_buffer_api() {
    let a = StridedArray::from_fn_row_major(&[2, 3, 4], |idx| (idx[0] * 12 + idx[1] * 4 + idx[2]) as f64);
    let out = rearrange_array(&a, "a b c", "c (a b)", &HashMap::new()).unwrap();
    let (buf, shape) = rearrange(a.data(), a.dims(), "a b c", "c (a b)", &HashMap::new()).unwrap();
    assert_eq!(out.dims(), shape.as_slice());
    assert_eq!(out.data(), buf.as_slice());
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_matches_sequential() {
    use strided_rearrange::RearrangeOptions;

    let shape = [64usize, 32, 24];
    let x = random_buffer(shape.iter().product(), 42);
    let seq = Rearrange::new("a b c", "c (a b)").unwrap();
    let par = seq.clone().with_options(RearrangeOptions { parallel: true });
    let (s, s_shape) = seq.apply(&x, &shape, &HashMap::new()).unwrap();
    let (p, p_shape) = par.apply(&x, &shape, &HashMap::new()).unwrap();
    assert_eq!(s_shape, p_shape);
    assert_eq!(s, p);
}
