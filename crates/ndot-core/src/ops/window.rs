//! Sliding-window layout for convolution as a dot product: zero padding of
//! the two trailing (spatial) axes and im2col unfolding.

use tracing::debug;

use crate::dtype::{with_dtype, Element};
use crate::error::NdotError;
use crate::shape::checked_numel;
use crate::tensor::Tensor;
use crate::Result;

impl Tensor {
    /// Surround every trailing `[H, W]` plane with `width` zeros on each
    /// side, giving `[.., H + 2 * width, W + 2 * width]`.
    ///
    /// # Errors
    /// [`InvalidAxis`](NdotError::InvalidAxis) below rank 2.
    pub fn pad(&self, width: usize) -> Result<Tensor> {
        let ndim = self.ndim();
        if ndim < 2 {
            return Err(NdotError::InvalidAxis { axis: 1, ndim });
        }
        let dims = self.shape().dims();
        let (h, w) = (dims[ndim - 2], dims[ndim - 1]);
        let grow = |d: usize| {
            width
                .checked_mul(2)
                .and_then(|p| d.checked_add(p))
                .ok_or_else(|| NdotError::InvalidArgument(format!("padding {width} is too large")))
        };
        let (ph, pw) = (grow(h)?, grow(w)?);

        let mut out_dims = dims.to_vec();
        out_dims[ndim - 2] = ph;
        out_dims[ndim - 1] = pw;
        let out_len = checked_numel(&out_dims).ok_or_else(|| {
            NdotError::StorageError(format!("padded shape {out_dims:?} is too large"))
        })?;

        with_dtype!(self.dtype(), T => {
            let src = self.elements_as::<T>();
            let mut out = vec![T::zero(); out_len];
            if !src.is_empty() {
                for (plane, block) in src.chunks(h * w).enumerate() {
                    let base = plane * ph * pw;
                    for (r, row) in block.chunks(w).enumerate() {
                        let start = base + (r + width) * pw + width;
                        out[start..start + w].copy_from_slice(row);
                    }
                }
            }
            Tensor::from_vec(out, &out_dims)
        })
    }

    /// Unfold an `[N, C, H, W]` batch into one row per filter position.
    ///
    /// The input is zero-padded by `pad`, then an `fh x fw` window slides
    /// over it with step `stride`. The result is
    /// `[N * OH * OW, C * fh * fw]` with `OH = (H + 2 * pad - fh) / stride + 1`
    /// (likewise `OW`). Rows run over `(n, oy, ox)` and columns over
    /// `(c, ky, kx)`, so `x.im2col(..)?.dot(&w)?` with `w` shaped
    /// `[C * fh * fw, filters]` is a convolution.
    pub fn im2col(&self, fh: usize, fw: usize, stride: usize, pad: usize) -> Result<Tensor> {
        let (n, c) = match *self.shape().dims() {
            [n, c, _, _] => (n, c),
            _ => {
                return Err(NdotError::InvalidArgument(format!(
                    "im2col expects an [N, C, H, W] tensor, got shape {}",
                    self.shape()
                )))
            }
        };
        if fh == 0 || fw == 0 || stride == 0 {
            return Err(NdotError::InvalidArgument(format!(
                "im2col needs a non-empty filter and stride, got {fh}x{fw} stride {stride}"
            )));
        }

        let padded = self.pad(pad)?;
        let (ph, pw) = (padded.shape().dims()[2], padded.shape().dims()[3]);
        if fh > ph || fw > pw {
            return Err(NdotError::InvalidArgument(format!(
                "filter {fh}x{fw} does not fit the padded {ph}x{pw} input"
            )));
        }
        let (oh, ow) = ((ph - fh) / stride + 1, (pw - fw) / stride + 1);
        let (rows, cols) = match (checked_numel(&[n, oh, ow]), checked_numel(&[c, fh, fw])) {
            (Some(rows), Some(cols)) if rows.checked_mul(cols).is_some() => (rows, cols),
            _ => {
                return Err(NdotError::StorageError(format!(
                    "im2col of {} with a {fh}x{fw} filter is too large",
                    self.shape()
                )))
            }
        };
        debug!(input = %self.shape(), fh, fw, stride, pad, rows, cols, "im2col");

        with_dtype!(padded.dtype(), T => {
            let src = padded.elements_as::<T>();
            let mut out: Vec<T> = Vec::with_capacity(rows * cols);
            for ni in 0..n {
                for oy in 0..oh {
                    for ox in 0..ow {
                        for ci in 0..c {
                            let plane = (ni * c + ci) * ph * pw;
                            for ky in 0..fh {
                                let start = plane + (oy * stride + ky) * pw + ox * stride;
                                out.extend_from_slice(&src[start..start + fw]);
                            }
                        }
                    }
                }
            }
            Tensor::from_vec(out, &[rows, cols])
        })
    }
}
