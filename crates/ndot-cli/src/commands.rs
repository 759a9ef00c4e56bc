//! Subcommand bodies. Each writes to a caller-supplied sink so it can run
//! against stdout or a test buffer.

use std::io::Write;
use std::path::{Path, PathBuf};

use ndot_core::contraction::PAR_THRESHOLD;
use ndot_core::{DType, NdotError, Tensor};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Tensor(#[from] NdotError),

    #[error("cannot read {}: {source}", path.display())]
    ReadInput {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid request: {0}")]
    Request(String),

    #[error(transparent)]
    Output(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Operands for `ndot dot`, either from flags or a JSON file of this shape.
#[derive(Debug, Deserialize)]
pub struct DotRequest {
    pub lhs: Value,
    pub rhs: Value,
}

impl DotRequest {
    /// Parse `--lhs` / `--rhs` literals.
    pub fn from_literals(lhs: &str, rhs: &str) -> Result<Self> {
        let parse = |name: &str, text: &str| {
            serde_json::from_str(text)
                .map_err(|e| CliError::Request(format!("--{name} is not valid JSON: {e}")))
        };
        Ok(Self {
            lhs: parse("lhs", lhs)?,
            rhs: parse("rhs", rhs)?,
        })
    }

    /// Load `{ "lhs": ..., "rhs": ... }` from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| CliError::ReadInput {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text)
            .map_err(|e| CliError::Request(format!("{}: {e}", path.display())))
    }
}

/// The 2x2x2x2 demo operand.
pub fn demo_x() -> ndot_core::Result<Tensor> {
    Tensor::from_nested([
        [[[1i64, 2], [3, 4]], [[4, 5], [5, 4]]],
        [[[5, 6], [8, 9]], [[4, 3], [2, 1]]],
    ])
}

/// The 2x2 demo operand.
pub fn demo_y() -> ndot_core::Result<Tensor> {
    Tensor::from_nested([[1i64, 2], [3, 4]])
}

/// Print `dot(x, y)`, `dot(x[0], y)` and `dot(x[0][0], y)`, then
/// optionally `dot(x, x)`.
pub fn demo(out: &mut impl Write, self_dot: bool) -> Result<()> {
    let (x, y) = (demo_x()?, demo_y()?);
    let x0 = x.index_axis0(0)?;
    let x00 = x0.index_axis0(0)?;

    let mut cases = vec![
        ("dot(x, y)", x.dot(&y)?),
        ("dot(x[0], y)", x0.dot(&y)?),
        ("dot(x[0][0], y)", x00.dot(&y)?),
    ];
    if self_dot {
        cases.push(("dot(x, x)", x.dot(&x)?));
    }

    for (i, (label, result)) in cases.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "{label}")?;
        writeln!(out, "{result}")?;
    }
    Ok(())
}

/// Evaluate a dot request, optionally casting both operands first.
pub fn dot(
    out: &mut impl Write,
    request: &DotRequest,
    dtype: Option<DType>,
    shape_only: bool,
) -> Result<()> {
    let mut lhs = Tensor::from_json(&request.lhs)?;
    let mut rhs = Tensor::from_json(&request.rhs)?;
    if let Some(dtype) = dtype {
        lhs = lhs.to_dtype(dtype);
        rhs = rhs.to_dtype(dtype);
    }
    debug!(lhs = ?lhs, rhs = ?rhs, "parsed operands");

    let result = lhs.dot(&rhs)?;
    info!(shape = %result.shape(), dtype = %result.dtype(), "dot complete");
    if shape_only {
        writeln!(out, "{}", result.shape())?;
    } else {
        writeln!(out, "{result}")?;
    }
    Ok(())
}

pub fn info(out: &mut impl Write) -> Result<()> {
    writeln!(out, "ndot {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(out)?;
    writeln!(out, "DTypes")?;
    for dtype in [DType::I32, DType::I64, DType::F32, DType::F64] {
        let kind = if dtype.is_float() { "float" } else { "int" };
        let name = dtype.to_string();
        writeln!(out, "  {:<4} {:<6} {} bytes", name, kind, dtype.element_size())?;
    }
    writeln!(out)?;
    writeln!(out, "Parallelism")?;
    writeln!(out, "  rayon threads:      {}", rayon::current_num_threads())?;
    writeln!(out, "  parallel threshold: {} outputs", PAR_THRESHOLD)?;
    Ok(())
}
