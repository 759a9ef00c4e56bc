//! The generalized N-dimensional dot product.

use tracing::debug;

use crate::contraction::{contract, ContractionPlan};
use crate::dtype::with_dtype;
use crate::tensor::Tensor;
use crate::Result;

impl Tensor {
    /// Generalized dot product, contracting the last axis of `self` with
    /// the second-to-last axis of `other` (or its only axis when rank 1).
    ///
    /// The result has shape `self[:-1] + other[:-2] + other[-1:]` and the
    /// promoted dtype of the two operands. It owns fresh storage.
    ///
    /// # Errors
    /// - [`RankError`](crate::NdotError::RankError) if either operand is a scalar.
    /// - [`ShapeMismatch`](crate::NdotError::ShapeMismatch) if the contracted
    ///   lengths differ.
    ///
    /// # Examples
    ///
    /// ```
    /// use ndot_core::Tensor;
    ///
    /// let a = Tensor::from_nested([[[1, 2], [3, 4]], [[4, 5], [5, 4]]]).unwrap();
    /// let b = Tensor::from_nested([[1, 2], [3, 4]]).unwrap();
    /// let c = a.dot(&b).unwrap();
    /// assert_eq!(c, Tensor::from_nested([[[7, 10], [15, 22]], [[19, 28], [17, 26]]]).unwrap());
    /// ```
    pub fn dot(&self, other: &Tensor) -> Result<Tensor> {
        let plan = ContractionPlan::for_dot(self.shape(), other.shape())?;
        let dtype = self.dtype().promote(other.dtype());
        debug!(
            lhs = %self.shape(),
            rhs = %other.shape(),
            out = %plan.out_shape,
            %dtype,
            "dot"
        );

        with_dtype!(dtype, T => {
            let a = self.elements_as::<T>();
            let b = other.elements_as::<T>();
            Tensor::from_vec(contract::<T>(&a, &b, &plan), plan.out_shape.dims())
        })
    }
}
