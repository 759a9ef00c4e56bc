//! Tensor construction from nested literals.
//!
//! Two sources are supported: nested Rust arrays / `Vec`s / slices (typed,
//! so every leaf has the same depth) and nested JSON arrays (untyped, so
//! depth and leaf kind are checked while walking).

use serde_json::Value;

use crate::dtype::Element;
use crate::error::NdotError;
use crate::tensor::Tensor;
use crate::Result;

/// A nested sequence of elements that can be flattened into a tensor.
pub trait NestedLiteral {
    type Elem: Element;

    /// Nesting depth, i.e. the rank of the resulting tensor.
    const DEPTH: usize;

    /// Record the axis lengths seen along the first element of every level.
    fn infer_shape(&self, dims: &mut Vec<usize>);

    /// Append leaves in row-major order, checking every level has `dims[0]`
    /// entries.
    fn flatten_into(&self, dims: &[usize], out: &mut Vec<Self::Elem>) -> Result<()>;
}

macro_rules! impl_scalar_literal {
    ($($t:ty),*) => {
        $(
            impl NestedLiteral for $t {
                type Elem = $t;
                const DEPTH: usize = 0;

                fn infer_shape(&self, _dims: &mut Vec<usize>) {}

                fn flatten_into(&self, _dims: &[usize], out: &mut Vec<$t>) -> Result<()> {
                    out.push(*self);
                    Ok(())
                }
            }
        )*
    };
}

impl_scalar_literal!(i32, i64, f32, f64);

fn infer_items<U: NestedLiteral>(items: &[U], dims: &mut Vec<usize>) {
    dims.push(items.len());
    match items.first() {
        Some(first) => first.infer_shape(dims),
        None => dims.extend(std::iter::repeat(0).take(U::DEPTH)),
    }
}

fn flatten_items<U: NestedLiteral>(
    items: &[U],
    dims: &[usize],
    out: &mut Vec<U::Elem>,
) -> Result<()> {
    let expected = dims[0];
    if items.len() != expected {
        return Err(NdotError::InvalidLiteral(format!(
            "ragged nested sequence: expected {} entries at depth {}, got {}",
            expected,
            U::DEPTH,
            items.len()
        )));
    }
    items.iter().try_for_each(|item| item.flatten_into(&dims[1..], out))
}

impl<U: NestedLiteral, const N: usize> NestedLiteral for [U; N] {
    type Elem = U::Elem;
    const DEPTH: usize = U::DEPTH + 1;

    fn infer_shape(&self, dims: &mut Vec<usize>) {
        infer_items(self.as_slice(), dims)
    }

    fn flatten_into(&self, dims: &[usize], out: &mut Vec<U::Elem>) -> Result<()> {
        flatten_items(self.as_slice(), dims, out)
    }
}

impl<U: NestedLiteral> NestedLiteral for Vec<U> {
    type Elem = U::Elem;
    const DEPTH: usize = U::DEPTH + 1;

    fn infer_shape(&self, dims: &mut Vec<usize>) {
        infer_items(self, dims)
    }

    fn flatten_into(&self, dims: &[usize], out: &mut Vec<U::Elem>) -> Result<()> {
        flatten_items(self, dims, out)
    }
}

impl<U: NestedLiteral> NestedLiteral for &[U] {
    type Elem = U::Elem;
    const DEPTH: usize = U::DEPTH + 1;

    fn infer_shape(&self, dims: &mut Vec<usize>) {
        infer_items(self, dims)
    }

    fn flatten_into(&self, dims: &[usize], out: &mut Vec<U::Elem>) -> Result<()> {
        flatten_items(self, dims, out)
    }
}

/// A JSON leaf. Integers stay exact until a float forces F64.
#[derive(Clone, Copy)]
enum JsonNumber {
    Int(i64),
    Float(f64),
}

impl Tensor {
    /// Build a tensor from nested arrays, `Vec`s or slices.
    ///
    /// ```
    /// use ndot_core::{DType, Tensor};
    ///
    /// let t = Tensor::from_nested([[[1, 2], [3, 4]], [[4, 5], [5, 4]]]).unwrap();
    /// assert_eq!(t.shape().dims(), &[2, 2, 2]);
    /// assert_eq!(t.dtype(), DType::I32);
    /// ```
    pub fn from_nested<L: NestedLiteral>(literal: L) -> Result<Tensor> {
        let mut dims = Vec::with_capacity(L::DEPTH);
        literal.infer_shape(&mut dims);
        let mut data = Vec::with_capacity(dims.iter().product());
        literal.flatten_into(&dims, &mut data)?;
        Tensor::from_vec(data, &dims)
    }

    /// Parse a JSON literal such as `[[1, 2], [3, 4]]`.
    pub fn parse_json(text: &str) -> Result<Tensor> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| NdotError::InvalidLiteral(format!("malformed JSON: {e}")))?;
        Tensor::from_json(&value)
    }

    /// Build a tensor from a nested JSON array of numbers.
    ///
    /// All-integer input yields I64; a single float anywhere yields F64.
    /// A bare number is a rank-0 tensor.
    pub fn from_json(value: &Value) -> Result<Tensor> {
        let mut dims = Vec::new();
        let mut cursor = value;
        while let Value::Array(items) = cursor {
            dims.push(items.len());
            match items.first() {
                Some(first) => cursor = first,
                None => break,
            }
        }

        let mut leaves = Vec::with_capacity(dims.iter().product());
        walk_json(value, &dims, 0, &mut leaves)?;

        if leaves.iter().all(|n| matches!(n, JsonNumber::Int(_))) {
            let data: Vec<i64> = leaves
                .iter()
                .map(|n| match *n {
                    JsonNumber::Int(v) => v,
                    JsonNumber::Float(v) => v as i64,
                })
                .collect();
            Tensor::from_vec(data, &dims)
        } else {
            let data: Vec<f64> = leaves
                .iter()
                .map(|n| match *n {
                    JsonNumber::Int(v) => v as f64,
                    JsonNumber::Float(v) => v,
                })
                .collect();
            Tensor::from_vec(data, &dims)
        }
    }
}

fn walk_json(value: &Value, dims: &[usize], depth: usize, out: &mut Vec<JsonNumber>) -> Result<()> {
    if depth == dims.len() {
        let number = match value {
            Value::Number(n) => n,
            Value::Array(_) => {
                return Err(NdotError::InvalidLiteral(format!(
                    "ragged nested sequence: unexpected array at depth {depth}"
                )))
            }
            other => {
                return Err(NdotError::InvalidLiteral(format!(
                    "expected a number at depth {depth}, got {other}"
                )))
            }
        };
        let leaf = match number.as_i64() {
            Some(v) => JsonNumber::Int(v),
            None => JsonNumber::Float(number.as_f64().unwrap_or(f64::NAN)),
        };
        out.push(leaf);
        return Ok(());
    }

    let items = match value {
        Value::Array(items) => items,
        _ => {
            return Err(NdotError::InvalidLiteral(format!(
                "ragged nested sequence: expected an array at depth {depth}"
            )))
        }
    };
    if items.len() != dims[depth] {
        return Err(NdotError::InvalidLiteral(format!(
            "ragged nested sequence: expected {} entries at depth {depth}, got {}",
            dims[depth],
            items.len()
        )));
    }
    items
        .iter()
        .try_for_each(|item| walk_json(item, dims, depth + 1, out))
}
