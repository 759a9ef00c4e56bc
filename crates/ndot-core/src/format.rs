//! NumPy-style text rendering.
//!
//! ```text
//! [[[ 7 10]
//!   [15 22]]
//!
//!  [[19 28]
//!   [17 26]]]
//! ```
//!
//! Every element is right-aligned to the widest one. Sub-arrays of axis `d`
//! are separated by `ndim - d - 1` newlines followed by `d + 1` spaces.

use std::fmt;

use crate::dtype::{with_dtype, Element};
use crate::tensor::Tensor;

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells = with_dtype!(self.dtype(), T => {
            let data = self.to_vec::<T>().map_err(|_| fmt::Error)?;
            data.iter().map(Element::render).collect::<Vec<_>>()
        });
        f.write_str(&render_nested(&cells, self.shape().dims()))
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor(shape={}, dtype={})", self.shape(), self.dtype())
    }
}

/// Lay out pre-rendered elements (row-major) as nested brackets.
pub fn render_nested(cells: &[String], dims: &[usize]) -> String {
    if dims.is_empty() {
        return cells.first().cloned().unwrap_or_default();
    }
    let width = cells.iter().map(String::len).max().unwrap_or(0);
    let mut out = String::new();
    write_axis(&mut out, cells, dims, 0, width);
    out
}

fn write_axis(out: &mut String, cells: &[String], dims: &[usize], depth: usize, width: usize) {
    let ndim = dims.len();
    out.push('[');
    if depth + 1 == ndim {
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&format!("{cell:>width$}"));
        }
    } else {
        let len = dims[depth];
        let chunk = if len == 0 { 0 } else { cells.len() / len };
        let sep = "\n".repeat(ndim - depth - 1) + &" ".repeat(depth + 1);
        for i in 0..len {
            if i > 0 {
                out.push_str(&sep);
            }
            write_axis(out, &cells[i * chunk..(i + 1) * chunk], dims, depth + 1, width);
        }
    }
    out.push(']');
}
