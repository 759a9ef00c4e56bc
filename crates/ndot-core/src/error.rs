use std::fmt;

use crate::dtype::DType;

/// Which side of a binary operation an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Lhs,
    Rhs,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Lhs => write!(f, "left"),
            Operand::Rhs => write!(f, "right"),
        }
    }
}

/// Errors produced by tensor construction, views and contractions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NdotError {
    /// The contracted axes of a dot/matmul have different lengths.
    #[error("{}", not_aligned(.lhs, .rhs, .lhs_axis, .rhs_axis))]
    ShapeMismatch {
        lhs: Vec<usize>,
        rhs: Vec<usize>,
        lhs_axis: usize,
        rhs_axis: usize,
    },

    #[error("{operand} operand of a contraction must have rank >= 1, got a scalar")]
    RankError { operand: Operand },

    #[error("cannot reshape {numel} elements into {shape:?}")]
    InvalidReshape { numel: usize, shape: Vec<isize> },

    #[error("axis {axis} is out of range for a {ndim}-d tensor")]
    InvalidAxis { axis: usize, ndim: usize },

    #[error("{axes:?} is not a permutation of the axes of a {ndim}-d tensor")]
    InvalidPermutation { axes: Vec<usize>, ndim: usize },

    #[error("index {index:?} is out of bounds for shape {shape:?}")]
    IndexOutOfBounds { index: Vec<usize>, shape: Vec<usize> },

    #[error("dtype mismatch: expected {expected}, got {got}")]
    DTypeMismatch { expected: DType, got: DType },

    #[error("shapes {a:?} and {b:?} cannot be broadcast together")]
    BroadcastError { a: Vec<usize>, b: Vec<usize> },

    #[error("integer division by zero")]
    DivisionByZero,

    #[error("cannot take the {op} of an empty axis")]
    EmptyReduction { op: &'static str },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid literal: {0}")]
    InvalidLiteral(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

fn not_aligned(lhs: &[usize], rhs: &[usize], lhs_axis: &usize, rhs_axis: &usize) -> String {
    let len = |dims: &[usize], axis: &usize| dims.get(*axis).copied().unwrap_or(0);
    format!(
        "shapes {} and {} not aligned: {} (dim {lhs_axis}) != {} (dim {rhs_axis})",
        fmt_dims(lhs),
        fmt_dims(rhs),
        len(lhs, lhs_axis),
        len(rhs, rhs_axis),
    )
}

/// NumPy-style tuple rendering used in shape errors: `(2,3)`, `(4,)`.
fn fmt_dims(dims: &[usize]) -> String {
    match dims {
        [d] => format!("({d},)"),
        _ => {
            let parts: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
            format!("({})", parts.join(","))
        }
    }
}
