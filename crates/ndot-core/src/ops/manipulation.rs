//! Element-type and layout conversions: to_dtype, flatten.

use std::borrow::Cow;

use crate::dtype::{with_dtype, DType, Element};
use crate::shape::Shape;
use crate::storage::Storage;
use crate::tensor::Tensor;

impl Tensor {
    /// Cast every element to `dtype` with `as` semantics.
    ///
    /// Returns a cheap clone when the dtype already matches. Float to
    /// integer casts truncate toward zero and saturate; NaN becomes 0.
    pub fn to_dtype(&self, dtype: DType) -> Tensor {
        if dtype == self.dtype() {
            return self.clone();
        }
        let storage = with_dtype!(dtype, T => Storage::from_vec(self.elements_as::<T>().into_owned()));
        Tensor::contiguous_over(storage, self.shape().clone())
    }

    /// All elements as a rank-1 tensor. A view when already contiguous.
    pub fn flatten(&self) -> Tensor {
        let base = if self.is_contiguous() {
            self.clone()
        } else {
            self.contiguous()
        };
        let shape = Shape::new(&[self.numel()]);
        let strides = shape.contiguous_strides();
        base.view(shape, strides, base.offset())
    }

    /// Elements in row-major order as `T`, borrowed when the layout and
    /// dtype already match.
    pub(crate) fn elements_as<T: Element>(&self) -> Cow<'_, [T]> {
        if let Some(data) = self.as_slice::<T>() {
            return Cow::Borrowed(data);
        }
        with_dtype!(self.dtype(), S => {
            let data = self
                .to_vec::<S>()
                .expect("storage holds elements of the tensor's own dtype");
            Cow::Owned(data.into_iter().map(T::from_element).collect())
        })
    }
}
