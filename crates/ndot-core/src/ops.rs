//! Tensor operations: the generalized dot product, broadcasting matmul,
//! element-wise arithmetic, axis reductions, padding with im2col, and
//! element-type / layout conversions.
//!
//! All operations return new tensors; inputs are never modified.

pub mod arithmetic;
pub mod dot;
pub mod manipulation;
pub mod matmul;
pub mod reduction;
pub mod window;
