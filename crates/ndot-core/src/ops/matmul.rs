//! Broadcasting matrix multiplication.

use tracing::debug;

use crate::contraction::{contract, ContractionPlan};
use crate::dtype::with_dtype;
use crate::error::{NdotError, Operand};
use crate::ops::arithmetic::broadcast_index;
use crate::shape::{checked_numel, Shape};
use crate::tensor::Tensor;
use crate::Result;

impl Tensor {
    /// Matrix product with broadcast batch axes.
    ///
    /// - `[.., M, K] @ [.., K, N] -> [broadcast(..), M, N]`
    /// - `[M, K] @ [K] -> [M]`
    /// - `[K] @ [K, N] -> [N]`
    /// - `[K] @ [K] -> []`
    ///
    /// Unlike [`dot`](Tensor::dot), batch axes of both operands are paired
    /// up rather than concatenated.
    pub fn matmul(&self, other: &Tensor) -> Result<Tensor> {
        if self.ndim() == 0 {
            return Err(NdotError::RankError { operand: Operand::Lhs });
        }
        if other.ndim() == 0 {
            return Err(NdotError::RankError { operand: Operand::Rhs });
        }

        // Vectors become a single row (left) or column (right).
        let (lhs_vec, rhs_vec) = (self.ndim() == 1, other.ndim() == 1);
        let a_dims = matrix_dims(self.shape().dims(), true);
        let b_dims = matrix_dims(other.shape().dims(), false);

        let (a_batch, [m, k]) = split_matrix(&a_dims);
        let (b_batch, [k2, n]) = split_matrix(&b_dims);
        if k != k2 {
            return Err(NdotError::ShapeMismatch {
                lhs: self.shape().dims().to_vec(),
                rhs: other.shape().dims().to_vec(),
                lhs_axis: self.ndim() - 1,
                rhs_axis: other.ndim().saturating_sub(2),
            });
        }

        let batch = a_batch.broadcast_with(&b_batch).ok_or_else(|| NdotError::BroadcastError {
            a: self.shape().dims().to_vec(),
            b: other.shape().dims().to_vec(),
        })?;

        let mut out_dims = batch.dims().to_vec();
        if !lhs_vec {
            out_dims.push(m);
        }
        if !rhs_vec {
            out_dims.push(n);
        }
        let out_len = checked_numel(&out_dims).ok_or_else(|| {
            NdotError::StorageError(format!(
                "output shape {out_dims:?} has more elements than fit in usize"
            ))
        })?;

        let dtype = self.dtype().promote(other.dtype());
        debug!(
            lhs = %self.shape(),
            rhs = %other.shape(),
            batch = %batch,
            m, k, n,
            %dtype,
            "matmul"
        );

        let plan = ContractionPlan::matrix(m, k, n);
        with_dtype!(dtype, T => {
            let a = self.elements_as::<T>();
            let b = other.elements_as::<T>();
            let (a_len, b_len) = (m * k, k * n);
            let mut out = Vec::with_capacity(out_len);
            let batches = if out_len == 0 { 0 } else { batch.numel() };
            for bi in 0..batches {
                let ai = broadcast_index(bi, &batch, &a_batch);
                let bj = broadcast_index(bi, &batch, &b_batch);
                out.extend(contract::<T>(
                    &a[ai * a_len..(ai + 1) * a_len],
                    &b[bj * b_len..(bj + 1) * b_len],
                    &plan,
                ));
            }
            Tensor::from_vec(out, &out_dims)
        })
    }
}

/// Promote a vector operand to a matrix: `[K]` becomes `[1, K]` when
/// `as_row`, otherwise `[K, 1]`.
fn matrix_dims(dims: &[usize], as_row: bool) -> Vec<usize> {
    match dims {
        [k] if as_row => vec![1, *k],
        [k] => vec![*k, 1],
        _ => dims.to_vec(),
    }
}

/// Split `[.., R, C]` into the batch shape and `[R, C]`. Rank ≥ 2.
fn split_matrix(dims: &[usize]) -> (Shape, [usize; 2]) {
    let n = dims.len();
    (Shape::new(&dims[..n - 2]), [dims[n - 2], dims[n - 1]])
}
