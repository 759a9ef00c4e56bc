//! Convenience re-exports for common ndot-core types.
//!
//! ```rust
//! use ndot_core::prelude::*;
//! ```

pub use crate::Tensor;
pub use crate::DType;
pub use crate::Element;
pub use crate::Shape;
pub use crate::NdotError;
pub use crate::Result;
