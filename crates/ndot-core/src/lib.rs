//! # ndot-core
//!
//! Rectangular N-dimensional tensors built around a generalized dot product.
//!
//! Provides the `Tensor` type with:
//! - Integer and float dtypes (I32, I64, F32, F64) with numeric promotion
//! - Zero-copy views (reshape, transpose, permute, axis-0 indexing)
//! - `dot` over operands of any rank ≥ 1, plus broadcasting `matmul`
//! - Broadcasting element-wise `add`/`sub`/`mul`/`div`
//! - `sum`, `mean`, `max` and `argmax` over one axis or all elements
//! - Zero padding and im2col, so convolution becomes a `dot`
//! - Construction from nested Rust arrays or JSON literals
//! - NumPy-style nested-bracket rendering
//!
//! ```
//! use ndot_core::Tensor;
//!
//! let a = Tensor::from_nested([[1, 2], [3, 4]]).unwrap();
//! let c = a.dot(&a).unwrap();
//! assert_eq!(c.to_string(), "[[ 7 10]\n [15 22]]");
//! ```

pub mod dtype;
pub mod storage;
pub mod shape;
pub mod tensor;
pub mod literal;
pub mod contraction;
pub mod format;
pub mod ops;
pub mod error;
pub mod prelude;

pub use dtype::{DType, Element};
pub use storage::Storage;
pub use shape::Shape;
pub use tensor::Tensor;
pub use contraction::ContractionPlan;
pub use ops::arithmetic::BinaryOp;
pub use error::{NdotError, Operand};

pub type Result<T> = std::result::Result<T, NdotError>;
