//! Element-wise arithmetic with NumPy broadcasting.

use tracing::trace;

use crate::dtype::{with_dtype, Element};
use crate::error::NdotError;
use crate::shape::Shape;
use crate::tensor::Tensor;
use crate::Result;

/// The element-wise operations `add`, `sub`, `mul` and `div` share.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl Tensor {
    /// Element-wise `self + other`.
    ///
    /// Shapes broadcast NumPy-style, so a rank-0 operand acts as a scalar
    /// and a row vector is added to every row. The result has the promoted
    /// dtype of the operands; integers wrap on overflow.
    ///
    /// ```
    /// use ndot_core::Tensor;
    ///
    /// let m = Tensor::from_nested([[1, 2], [3, 4]]).unwrap();
    /// let row = Tensor::from_nested([10, 20]).unwrap();
    /// assert_eq!(m.add(&row).unwrap(), Tensor::from_nested([[11, 22], [13, 24]]).unwrap());
    /// ```
    pub fn add(&self, other: &Tensor) -> Result<Tensor> {
        binary_op(self, other, BinaryOp::Add)
    }

    /// Element-wise `self - other`, broadcasting like [`add`](Tensor::add).
    pub fn sub(&self, other: &Tensor) -> Result<Tensor> {
        binary_op(self, other, BinaryOp::Sub)
    }

    /// Element-wise `self * other`, broadcasting like [`add`](Tensor::add).
    pub fn mul(&self, other: &Tensor) -> Result<Tensor> {
        binary_op(self, other, BinaryOp::Mul)
    }

    /// Element-wise `self / other`, broadcasting like [`add`](Tensor::add).
    ///
    /// Integer division truncates toward zero and a zero divisor fails with
    /// [`DivisionByZero`](NdotError::DivisionByZero). Float division follows
    /// IEEE 754.
    pub fn div(&self, other: &Tensor) -> Result<Tensor> {
        binary_op(self, other, BinaryOp::Div)
    }
}

fn binary_op(a: &Tensor, b: &Tensor, op: BinaryOp) -> Result<Tensor> {
    let out_shape = a.shape().broadcast_with(b.shape()).ok_or_else(|| {
        NdotError::BroadcastError {
            a: a.shape().dims().to_vec(),
            b: b.shape().dims().to_vec(),
        }
    })?;
    let dtype = a.dtype().promote(b.dtype());
    trace!(?op, lhs = %a.shape(), rhs = %b.shape(), %dtype, "binary op");

    with_dtype!(dtype, T => {
        let x = a.elements_as::<T>();
        let y = b.elements_as::<T>();

        let result: Option<Vec<T>> = if a.shape() == b.shape() {
            x.iter().zip(y.iter()).map(|(&p, &q)| T::apply(op, p, q)).collect()
        } else {
            (0..out_shape.numel())
                .map(|i| {
                    let p = x[broadcast_index(i, &out_shape, a.shape())];
                    let q = y[broadcast_index(i, &out_shape, b.shape())];
                    T::apply(op, p, q)
                })
                .collect()
        };
        Tensor::from_vec(result.ok_or(NdotError::DivisionByZero)?, out_shape.dims())
    })
}

/// Flat index into `src` of the element broadcast to flat position
/// `flat` of `out`. `src` is right-aligned against `out`; its size-1 axes
/// always map to 0.
pub(crate) fn broadcast_index(flat: usize, out: &Shape, src: &Shape) -> usize {
    let skip = out.ndim() - src.ndim();
    let out_strides = out.contiguous_strides();
    let src_strides = src.contiguous_strides();

    let mut remaining = flat;
    let mut index = 0;
    for (axis, &stride) in out_strides.iter().enumerate() {
        let coord = remaining / stride;
        remaining %= stride;
        if axis >= skip {
            let s = axis - skip;
            if src.dims()[s] > 1 {
                index += coord * src_strides[s];
            }
        }
    }
    index
}
