use std::fmt;
use std::str::FromStr;

use num_traits::AsPrimitive;

use crate::error::NdotError;
use crate::ops::arithmetic::BinaryOp;

/// Element kinds supported by ndot tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
    /// 32-bit IEEE 754 single-precision float
    F32,
    /// 64-bit IEEE 754 double-precision float
    F64,
}

impl DType {
    /// Size in bytes of a single element.
    pub fn element_size(&self) -> usize {
        match self {
            DType::I32 | DType::F32 => 4,
            DType::I64 | DType::F64 => 8,
        }
    }

    /// Whether this dtype is a floating-point type.
    pub fn is_float(&self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }

    /// Whether this dtype is an integer type.
    pub fn is_integer(&self) -> bool {
        matches!(self, DType::I32 | DType::I64)
    }

    /// Result dtype of an operation mixing `self` and `other`.
    ///
    /// Integers widen to the larger integer; any integer mixed with a float
    /// goes to F64, as does F32 with F64. Only F32 with F32 stays F32.
    pub fn promote(self, other: DType) -> DType {
        use DType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (I32, I64) | (I64, I32) => I64,
            _ => F64,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::I32 => write!(f, "i32"),
            DType::I64 => write!(f, "i64"),
            DType::F32 => write!(f, "f32"),
            DType::F64 => write!(f, "f64"),
        }
    }
}

impl FromStr for DType {
    type Err = NdotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "i32" | "int32" => Ok(DType::I32),
            "i64" | "int64" => Ok(DType::I64),
            "f32" | "float32" => Ok(DType::F32),
            "f64" | "float64" => Ok(DType::F64),
            other => Err(NdotError::InvalidLiteral(format!("unknown dtype '{other}'"))),
        }
    }
}

/// A Rust primitive that can live in tensor storage.
///
/// The `AsPrimitive` supertraits let any element be cast to any other with
/// `as` semantics, which is what [`Tensor::to_dtype`](crate::Tensor::to_dtype)
/// relies on.
pub trait Element:
    bytemuck::Pod
    + PartialEq
    + PartialOrd
    + fmt::Debug
    + Send
    + Sync
    + AsPrimitive<i32>
    + AsPrimitive<i64>
    + AsPrimitive<f32>
    + AsPrimitive<f64>
{
    const DTYPE: DType;

    fn zero() -> Self;

    /// `acc + a * b`. Integers wrap on overflow.
    fn mul_add(acc: Self, a: Self, b: Self) -> Self;

    /// `acc + v`. Integers wrap on overflow.
    fn accumulate(acc: Self, v: Self) -> Self;

    /// One element-wise arithmetic step. Integer results wrap and integer
    /// division truncates toward zero; None only for an integer divided by
    /// zero.
    fn apply(op: BinaryOp, a: Self, b: Self) -> Option<Self>;

    /// Cast from any other element type.
    fn from_element<S: Element>(v: S) -> Self;

    /// Text used by the nested-bracket renderer.
    fn render(&self) -> String;
}

macro_rules! impl_int_element {
    ($($t:ty => $dtype:ident),*) => {
        $(
            impl Element for $t {
                const DTYPE: DType = DType::$dtype;

                fn zero() -> Self {
                    0
                }

                fn mul_add(acc: Self, a: Self, b: Self) -> Self {
                    acc.wrapping_add(a.wrapping_mul(b))
                }

                fn accumulate(acc: Self, v: Self) -> Self {
                    acc.wrapping_add(v)
                }

                fn apply(op: BinaryOp, a: Self, b: Self) -> Option<Self> {
                    Some(match op {
                        BinaryOp::Add => a.wrapping_add(b),
                        BinaryOp::Sub => a.wrapping_sub(b),
                        BinaryOp::Mul => a.wrapping_mul(b),
                        BinaryOp::Div if b == 0 => return None,
                        BinaryOp::Div => a.wrapping_div(b),
                    })
                }

                fn from_element<S: Element>(v: S) -> Self {
                    AsPrimitive::<$t>::as_(v)
                }

                fn render(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

macro_rules! impl_float_element {
    ($($t:ty => $dtype:ident),*) => {
        $(
            impl Element for $t {
                const DTYPE: DType = DType::$dtype;

                fn zero() -> Self {
                    0.0
                }

                fn mul_add(acc: Self, a: Self, b: Self) -> Self {
                    acc + a * b
                }

                fn accumulate(acc: Self, v: Self) -> Self {
                    acc + v
                }

                fn apply(op: BinaryOp, a: Self, b: Self) -> Option<Self> {
                    Some(match op {
                        BinaryOp::Add => a + b,
                        BinaryOp::Sub => a - b,
                        BinaryOp::Mul => a * b,
                        BinaryOp::Div => a / b,
                    })
                }

                fn from_element<S: Element>(v: S) -> Self {
                    AsPrimitive::<$t>::as_(v)
                }

                fn render(&self) -> String {
                    format!("{:?}", self)
                }
            }
        )*
    };
}

impl_int_element!(i32 => I32, i64 => I64);
impl_float_element!(f32 => F32, f64 => F64);

/// Run `$body` with `$T` bound to the Rust element type of `$dtype`.
macro_rules! with_dtype {
    ($dtype:expr, $T:ident => $body:expr) => {
        match $dtype {
            $crate::DType::I32 => {
                type $T = i32;
                $body
            }
            $crate::DType::I64 => {
                type $T = i64;
                $body
            }
            $crate::DType::F32 => {
                type $T = f32;
                $body
            }
            $crate::DType::F64 => {
                type $T = f64;
                $body
            }
        }
    };
}

pub(crate) use with_dtype;
