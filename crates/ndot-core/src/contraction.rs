//! The generalized dot-product contraction, split into a shape rule and a
//! reduction kernel.
//!
//! [`ContractionPlan::for_dot`] works purely on shapes: it validates the
//! operands and flattens them into `outer × k` (left) and
//! `batch × k × cols` (right) views. [`contract`] then runs over flat,
//! row-major buffers and never looks at a [`Shape`] again.

use rayon::prelude::*;

use crate::dtype::Element;
use crate::error::{NdotError, Operand};
use crate::shape::{checked_numel, Shape};
use crate::Result;

/// Output sizes at or above this run the kernel on the rayon pool.
pub const PAR_THRESHOLD: usize = 8192;

/// A validated contraction `C[i, j, l] = Σ_p A[i, p] · B[j, p, l]`.
///
/// `i` ranges over the flattened leading axes of the left operand, `j` over
/// the flattened batch axes of the right operand, `l` over its last axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractionPlan {
    /// Product of the left operand's leading axes.
    pub outer: usize,
    /// Length of the contracted axis.
    pub k: usize,
    /// Product of the right operand's axes before the contracted one.
    pub batch: usize,
    /// Length of the right operand's last axis (1 for a vector).
    pub cols: usize,
    pub out_shape: Shape,
}

impl ContractionPlan {
    /// Plan `dot(A, B)`.
    ///
    /// For a rank-1 `B` the contracted axis is its only axis and the output
    /// shape is `A.shape[:-1]`. Otherwise the contracted axis is `B`'s
    /// second-to-last and the output shape is
    /// `A.shape[:-1] + B.shape[:-2] + B.shape[-1:]`.
    pub fn for_dot(a: &Shape, b: &Shape) -> Result<Self> {
        let (a_dims, b_dims) = (a.dims(), b.dims());
        let (&k, a_lead) = a_dims
            .split_last()
            .ok_or(NdotError::RankError { operand: Operand::Lhs })?;
        let outer = saturating_numel(a_lead);

        let (rhs_axis, batch_dims, col_dims) = match b_dims.len() {
            0 => return Err(NdotError::RankError { operand: Operand::Rhs }),
            1 => (0, &b_dims[..0], &b_dims[1..]),
            n => (n - 2, &b_dims[..n - 2], &b_dims[n - 1..]),
        };

        if b_dims[rhs_axis] != k {
            return Err(NdotError::ShapeMismatch {
                lhs: a_dims.to_vec(),
                rhs: b_dims.to_vec(),
                lhs_axis: a_dims.len() - 1,
                rhs_axis,
            });
        }

        let out_shape = Shape::concat(&[a_lead, batch_dims, col_dims]);
        if checked_numel(out_shape.dims()).is_none() {
            return Err(NdotError::StorageError(format!(
                "output shape {out_shape} has more elements than fit in usize"
            )));
        }

        Ok(Self {
            outer,
            k,
            batch: saturating_numel(batch_dims),
            cols: saturating_numel(col_dims),
            out_shape,
        })
    }

    /// Plan a plain `[m, k] @ [k, n]` matrix product.
    pub fn matrix(m: usize, k: usize, n: usize) -> Self {
        Self {
            outer: m,
            k,
            batch: 1,
            cols: n,
            out_shape: Shape::new(&[m, n]),
        }
    }

    /// Number of output elements.
    pub fn output_len(&self) -> usize {
        self.outer.saturating_mul(self.batch).saturating_mul(self.cols)
    }

    /// Elements the left operand must supply.
    pub fn lhs_len(&self) -> usize {
        self.outer.saturating_mul(self.k)
    }

    /// Elements the right operand must supply.
    pub fn rhs_len(&self) -> usize {
        self.batch.saturating_mul(self.k).saturating_mul(self.cols)
    }
}

/// Product of `dims`, 0 if any axis is empty, saturating otherwise.
fn saturating_numel(dims: &[usize]) -> usize {
    checked_numel(dims).unwrap_or(usize::MAX)
}

/// Run a planned contraction over row-major buffers.
///
/// Each output element is accumulated from zero in increasing `p`, so the
/// serial and parallel paths produce identical results, floats included.
///
/// # Panics
/// Panics if the buffers are shorter than the plan requires.
pub fn contract<T: Element>(a: &[T], b: &[T], plan: &ContractionPlan) -> Vec<T> {
    assert!(
        a.len() >= plan.lhs_len() && b.len() >= plan.rhs_len(),
        "contract: operand buffers ({}, {}) smaller than plan ({}, {})",
        a.len(),
        b.len(),
        plan.lhs_len(),
        plan.rhs_len()
    );

    let ContractionPlan { k, batch, cols, .. } = *plan;
    let row_len = batch * cols;
    let mut out = vec![T::zero(); plan.output_len()];
    if row_len == 0 {
        return out;
    }

    // One output row per left-operand row `i`: `batch` blocks of `cols`.
    let fill_row = |i: usize, row: &mut [T]| {
        let a_row = &a[i * k..(i + 1) * k];
        for (j, block) in row.chunks_mut(cols).enumerate() {
            let b_mat = &b[j * k * cols..(j + 1) * k * cols];
            for (&av, b_row) in a_row.iter().zip(b_mat.chunks(cols)) {
                for (o, &bv) in block.iter_mut().zip(b_row) {
                    *o = T::mul_add(*o, av, bv);
                }
            }
        }
    };

    let parallel = out.len() >= PAR_THRESHOLD;
    tracing::trace!(outputs = out.len(), k, parallel, "contract");
    if parallel {
        out.par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(i, row)| fill_row(i, row));
    } else {
        out.chunks_mut(row_len)
            .enumerate()
            .for_each(|(i, row)| fill_row(i, row));
    }
    out
}
