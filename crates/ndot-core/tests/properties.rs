//! Property-based tests for the generalized dot product.

use ndot_core::prelude::*;
use proptest::prelude::*;

/// Shapes `(a, b)` whose contracted axes agree. `b` is rank 1 or has up to
/// two batch axes.
fn aligned_shapes() -> impl Strategy<Value = (Vec<usize>, Vec<usize>)> {
    (
        prop::collection::vec(1usize..4, 0..3),
        0usize..4,
        prop::collection::vec(1usize..3, 0..3),
        1usize..4,
        any::<bool>(),
    )
        .prop_map(|(lead, k, batch, cols, rhs_vector)| {
            let mut a = lead;
            a.push(k);
            let b = if rhs_vector {
                vec![k]
            } else {
                let mut b = batch;
                b.extend([k, cols]);
                b
            };
            (a, b)
        })
}

fn tensor_of(shape: Vec<usize>) -> impl Strategy<Value = Tensor> {
    let numel: usize = shape.iter().product();
    prop::collection::vec(-20i64..20, numel)
        .prop_map(move |data| Tensor::from_vec(data, &shape).unwrap())
}

fn aligned_operands() -> impl Strategy<Value = (Tensor, Tensor)> {
    aligned_shapes().prop_flat_map(|(a, b)| (tensor_of(a), tensor_of(b)))
}

/// Row-major multi-index of `flat` within `dims`.
fn unravel(mut flat: usize, dims: &[usize]) -> Vec<usize> {
    let mut index = vec![0; dims.len()];
    for (slot, &d) in index.iter_mut().zip(dims).rev() {
        *slot = flat % d;
        flat /= d;
    }
    index
}

proptest! {
    #[test]
    fn prop_output_shape((a, b) in aligned_operands()) {
        let c = a.dot(&b).unwrap();
        let (ad, bd) = (a.shape().dims(), b.shape().dims());
        let mut expected = ad[..ad.len() - 1].to_vec();
        if bd.len() >= 2 {
            expected.extend_from_slice(&bd[..bd.len() - 2]);
            expected.push(bd[bd.len() - 1]);
        }
        prop_assert_eq!(c.shape().dims(), expected.as_slice());
        prop_assert_eq!(c.dtype(), DType::I64);
    }

    #[test]
    fn prop_every_output_is_a_sum_of_products((a, b) in aligned_operands()) {
        let c = a.dot(&b).unwrap();
        let lead = a.ndim() - 1;
        let k = a.shape().dims()[lead];

        for flat in 0..c.numel() {
            let index = unravel(flat, c.shape().dims());
            let (i, rest) = index.split_at(lead);
            let mut expected = 0i64;
            for p in 0..k {
                let mut ai = i.to_vec();
                ai.push(p);
                let bi = match rest.split_last() {
                    Some((&l, j)) if b.ndim() >= 2 => {
                        let mut bi = j.to_vec();
                        bi.extend([p, l]);
                        bi
                    }
                    _ => vec![p],
                };
                expected += a.get::<i64>(&ai).unwrap() * b.get::<i64>(&bi).unwrap();
            }
            prop_assert_eq!(c.get::<i64>(&index).unwrap(), expected);
        }
    }

    #[test]
    fn prop_matrix_product_matches_triple_loop(
        (m, k, n, a, b) in (1usize..6, 0usize..6, 1usize..6).prop_flat_map(|(m, k, n)| (
            Just(m),
            Just(k),
            Just(n),
            prop::collection::vec(-50i64..50, m * k),
            prop::collection::vec(-50i64..50, k * n),
        ))
    ) {
        let mut expected = vec![0i64; m * n];
        for i in 0..m {
            for j in 0..n {
                for p in 0..k {
                    expected[i * n + j] += a[i * k + p] * b[p * n + j];
                }
            }
        }
        let ta = Tensor::from_vec(a, &[m, k]).unwrap();
        let tb = Tensor::from_vec(b, &[k, n]).unwrap();
        prop_assert_eq!(ta.dot(&tb).unwrap().to_vec::<i64>().unwrap(), expected.clone());
        prop_assert_eq!(ta.matmul(&tb).unwrap().to_vec::<i64>().unwrap(), expected);
    }

    #[test]
    fn prop_mismatched_lengths_are_rejected(
        lead in prop::collection::vec(1usize..3, 0..3),
        k in 1usize..5,
        delta in 1usize..3,
        rhs_vector in any::<bool>(),
    ) {
        let mut a_dims = lead;
        a_dims.push(k);
        let b_dims = if rhs_vector { vec![k + delta] } else { vec![k + delta, 2] };
        let a = Tensor::zeros(&a_dims, DType::I32);
        let b = Tensor::zeros(&b_dims, DType::I32);

        let err = a.dot(&b).unwrap_err();
        prop_assert!(
            matches!(err, NdotError::ShapeMismatch { ref lhs, ref rhs, .. } if *lhs == a_dims && *rhs == b_dims),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn prop_scalars_are_rejected(value in -100i64..100, len in 1usize..5) {
        let s = Tensor::scalar(value);
        let v = Tensor::arange(len);
        let lhs_rejected = matches!(s.dot(&v), Err(NdotError::RankError { .. }));
        let rhs_rejected = matches!(v.dot(&s), Err(NdotError::RankError { .. }));
        prop_assert!(lhs_rejected);
        prop_assert!(rhs_rejected);
    }

    #[test]
    fn prop_float_result_matches_cast_integer_result((a, b) in aligned_operands()) {
        let exact = a.dot(&b).unwrap().to_dtype(DType::F64);
        let promoted = a.to_dtype(DType::F64).dot(&b).unwrap();
        prop_assert_eq!(promoted.dtype(), DType::F64);
        prop_assert_eq!(exact, promoted);
    }

    #[test]
    fn prop_matrix_vector_dot_is_broadcast_mul_then_sum(
        (a, v) in (1usize..5, 0usize..5).prop_flat_map(|(m, k)| {
            (tensor_of(vec![m, k]), tensor_of(vec![k]))
        })
    ) {
        let expected = a.dot(&v).unwrap();
        let summed = a.mul(&v).unwrap().sum_axis(1).unwrap();
        prop_assert_eq!(expected, summed);
    }
}

#[test]
fn large_outputs_match_between_dtypes() {
    // 96 x 96 output crosses the parallel threshold.
    let a = Tensor::rand_int(&[96, 7], -5, 5).unwrap();
    let b = Tensor::rand_int(&[7, 96], -5, 5).unwrap();
    let ints = a.dot(&b).unwrap();
    assert!(ints.numel() >= ndot_core::contraction::PAR_THRESHOLD);
    let floats = a.to_dtype(DType::F64).dot(&b.to_dtype(DType::F64)).unwrap();
    assert_eq!(ints.to_dtype(DType::F64), floats);
}
