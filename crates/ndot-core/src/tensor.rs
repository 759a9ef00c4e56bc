use crate::dtype::{with_dtype, DType, Element};
use crate::error::NdotError;
use crate::shape::{Dims, Shape};
use crate::storage::Storage;
use crate::Result;

/// An immutable, rectangular N-dimensional array.
///
/// A tensor is a window onto shared [`Storage`]: a shape, per-axis strides
/// (in elements) and a starting offset. Reshape, transpose, permute and
/// axis-0 indexing only rewrite that window; the elements are copied when an
/// operation needs them contiguous.
///
/// # Examples
///
/// ```
/// use ndot_core::Tensor;
///
/// let t = Tensor::from_vec(vec![1i64, 2, 3, 4, 5, 6], &[2, 3]).unwrap();
/// assert_eq!(t.shape().dims(), &[2, 3]);
///
/// let tr = t.transpose().unwrap();
/// assert_eq!(tr.get::<i64>(&[2, 1]).unwrap(), 6);
/// ```
#[derive(Clone)]
pub struct Tensor {
    storage: Storage,
    shape: Shape,
    strides: Dims,
    offset: usize,
}

impl Tensor {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Take ownership of `data` laid out row-major in `shape`.
    pub fn from_vec<T: Element>(data: Vec<T>, shape: &[usize]) -> Result<Self> {
        Self::from_storage(Storage::from_vec(data), shape)
    }

    /// Copy `data` laid out row-major in `shape`.
    pub fn from_slice<T: Element>(data: &[T], shape: &[usize]) -> Result<Self> {
        Self::from_vec(data.to_vec(), shape)
    }

    /// Wrap existing storage. Its element count must match `shape`.
    pub fn from_storage(storage: Storage, shape: &[usize]) -> Result<Self> {
        let shape = Shape::new(shape);
        if shape.numel() != storage.numel() {
            return Err(NdotError::StorageError(format!(
                "shape {} requires {} elements, got {}",
                shape,
                shape.numel(),
                storage.numel()
            )));
        }
        Ok(Self::contiguous_over(storage, shape))
    }

    pub(crate) fn contiguous_over(storage: Storage, shape: Shape) -> Self {
        let strides = shape.contiguous_strides();
        Self {
            storage,
            shape,
            strides,
            offset: 0,
        }
    }

    pub fn zeros(shape: &[usize], dtype: DType) -> Self {
        let shape = Shape::new(shape);
        Self::contiguous_over(Storage::zeros(dtype, shape.numel()), shape)
    }

    /// Zeros with the shape and dtype of `other`.
    pub fn zeros_like(other: &Tensor) -> Self {
        Self::zeros(other.shape.dims(), other.dtype())
    }

    /// A rank-0 tensor holding `value`.
    pub fn scalar<T: Element>(value: T) -> Self {
        Self::contiguous_over(Storage::from_vec(vec![value]), Shape::scalar())
    }

    /// `[0, 1, ..., n - 1]` as I64.
    pub fn arange(n: usize) -> Self {
        let data: Vec<i64> = (0..n as i64).collect();
        Self::contiguous_over(Storage::from_vec(data), Shape::new(&[n]))
    }

    /// I64 samples drawn uniformly from `low..high`.
    pub fn rand_int(shape: &[usize], low: i64, high: i64) -> Result<Self> {
        use rand::Rng;
        if low >= high {
            return Err(NdotError::InvalidArgument(format!(
                "rand_int range {low}..{high} is empty"
            )));
        }
        let shape = Shape::new(shape);
        let mut rng = rand::thread_rng();
        let data: Vec<i64> = (0..shape.numel()).map(|_| rng.gen_range(low..high)).collect();
        Ok(Self::contiguous_over(Storage::from_vec(data), shape))
    }

    // =========================================================================
    // Properties
    // =========================================================================

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Rank.
    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    /// Strides in elements, not bytes.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn storage_ref(&self) -> &Storage {
        &self.storage
    }

    /// Index of the first element within the storage.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether the elements are laid out row-major without gaps.
    pub fn is_contiguous(&self) -> bool {
        self.numel() <= 1 || self.strides == self.shape.contiguous_strides()
    }

    // =========================================================================
    // Data access
    // =========================================================================

    /// Element at a full multi-dimensional index.
    pub fn get<T: Element>(&self, index: &[usize]) -> Result<T> {
        let data = self.typed_storage::<T>()?;
        let in_bounds = index.len() == self.ndim()
            && index.iter().zip(self.shape.dims()).all(|(&i, &d)| i < d);
        if !in_bounds {
            return Err(NdotError::IndexOutOfBounds {
                index: index.to_vec(),
                shape: self.shape.dims().to_vec(),
            });
        }
        let physical = self.offset
            + index
                .iter()
                .zip(self.strides.iter())
                .map(|(i, s)| i * s)
                .sum::<usize>();
        Ok(data[physical])
    }

    /// Borrow the elements directly. None unless contiguous and of dtype `T`.
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        if !self.is_contiguous() {
            return None;
        }
        let data = self.storage.as_slice::<T>()?;
        data.get(self.offset..self.offset + self.numel())
    }

    /// All elements in logical row-major order.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        let data = self.typed_storage::<T>()?;
        Ok(self.gather(data))
    }

    fn typed_storage<T: Element>(&self) -> Result<&[T]> {
        self.storage
            .as_slice::<T>()
            .ok_or(NdotError::DTypeMismatch {
                expected: self.dtype(),
                got: T::DTYPE,
            })
    }

    fn gather<T: Element>(&self, data: &[T]) -> Vec<T> {
        if self.is_contiguous() {
            return data[self.offset..self.offset + self.numel()].to_vec();
        }
        self.physical_offsets().map(|p| data[p]).collect()
    }

    /// Storage offsets of every element, in logical row-major order.
    fn physical_offsets(&self) -> impl Iterator<Item = usize> + '_ {
        let logical = self.shape.contiguous_strides();
        (0..self.numel()).map(move |flat| {
            let mut remaining = flat;
            let mut physical = self.offset;
            for (ls, ps) in logical.iter().zip(self.strides.iter()) {
                physical += (remaining / ls) * ps;
                remaining %= ls;
            }
            physical
        })
    }

    /// A contiguous copy of this tensor, or a cheap clone if already contiguous.
    pub fn contiguous(&self) -> Tensor {
        if self.is_contiguous() && self.offset == 0 && self.storage.numel() == self.numel() {
            return self.clone();
        }
        let storage = with_dtype!(self.dtype(), T => {
            let data = self
                .storage
                .as_slice::<T>()
                .expect("storage holds elements of the tensor's own dtype");
            Storage::from_vec(self.gather(data))
        });
        Self::contiguous_over(storage, self.shape.clone())
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Reshape, with at most one `-1` axis inferred. Zero-copy when contiguous.
    pub fn reshape(&self, new_shape: &[isize]) -> Result<Tensor> {
        let resolved = self.shape.resolve_reshape(new_shape).ok_or_else(|| {
            NdotError::InvalidReshape {
                numel: self.numel(),
                shape: new_shape.to_vec(),
            }
        })?;
        let base = if self.is_contiguous() {
            self.clone()
        } else {
            self.contiguous()
        };
        Ok(Tensor {
            strides: resolved.contiguous_strides(),
            shape: resolved,
            storage: base.storage,
            offset: base.offset,
        })
    }

    /// Swap the last two axes.
    pub fn transpose(&self) -> Result<Tensor> {
        let ndim = self.ndim();
        let shape = self
            .shape
            .transpose()
            .ok_or(NdotError::InvalidAxis { axis: 1, ndim })?;
        let mut strides = self.strides.clone();
        strides.swap(ndim - 2, ndim - 1);
        Ok(self.view(shape, strides, self.offset))
    }

    /// Reorder axes: output axis `i` is input axis `axes[i]`.
    pub fn permute(&self, axes: &[usize]) -> Result<Tensor> {
        let shape = self
            .shape
            .permute(axes)
            .ok_or_else(|| NdotError::InvalidPermutation {
                axes: axes.to_vec(),
                ndim: self.ndim(),
            })?;
        let strides = axes.iter().map(|&a| self.strides[a]).collect();
        Ok(self.view(shape, strides, self.offset))
    }

    /// The sub-array `self[i]` along the first axis.
    pub fn index_axis0(&self, i: usize) -> Result<Tensor> {
        let len = self
            .shape
            .dim(0)
            .ok_or(NdotError::InvalidAxis { axis: 0, ndim: 0 })?;
        if i >= len {
            return Err(NdotError::IndexOutOfBounds {
                index: vec![i],
                shape: self.shape.dims().to_vec(),
            });
        }
        let shape = Shape::new(&self.shape.dims()[1..]);
        let strides = Dims::from_slice(&self.strides[1..]);
        Ok(self.view(shape, strides, self.offset + i * self.strides[0]))
    }

    pub(crate) fn view(&self, shape: Shape, strides: Dims, offset: usize) -> Tensor {
        Tensor {
            storage: self.storage.clone(),
            shape,
            strides,
            offset,
        }
    }
}

impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape
            && self.dtype() == other.dtype()
            && with_dtype!(self.dtype(), T => self.to_vec::<T>() == other.to_vec::<T>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_2x3() -> Tensor {
        Tensor::from_vec(vec![1i64, 2, 3, 4, 5, 6], &[2, 3]).unwrap()
    }

    #[test]
    fn test_from_vec() {
        let t = sample_2x3();
        assert_eq!(t.shape().dims(), &[2, 3]);
        assert_eq!(t.ndim(), 2);
        assert_eq!(t.numel(), 6);
        assert_eq!(t.dtype(), DType::I64);
        assert!(t.is_contiguous());
    }

    #[test]
    fn test_from_vec_length_mismatch() {
        let err = Tensor::from_vec(vec![1i32, 2, 3], &[2, 2]).unwrap_err();
        assert!(matches!(err, NdotError::StorageError(_)));
    }

    #[test]
    fn test_zeros() {
        let t = Tensor::zeros(&[3, 4], DType::F32);
        assert_eq!(t.numel(), 12);
        assert!(t.as_slice::<f32>().unwrap().iter().all(|&v| v == 0.0));

        let z = Tensor::zeros_like(&sample_2x3());
        assert_eq!(z.shape().dims(), &[2, 3]);
        assert_eq!(z.dtype(), DType::I64);
    }

    #[test]
    fn test_scalar() {
        let t = Tensor::scalar(3i64);
        assert!(t.shape().is_scalar());
        assert_eq!(t.numel(), 1);
        assert_eq!(t.get::<i64>(&[]).unwrap(), 3);
    }

    #[test]
    fn test_arange() {
        let t = Tensor::arange(5);
        assert_eq!(t.to_vec::<i64>().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_rand_int() {
        let t = Tensor::rand_int(&[3, 4], -2, 3).unwrap();
        assert_eq!(t.shape().dims(), &[3, 4]);
        assert_eq!(t.dtype(), DType::I64);
        assert!(t.to_vec::<i64>().unwrap().iter().all(|v| (-2..3).contains(v)));

        assert!(matches!(
            Tensor::rand_int(&[2], 3, 3),
            Err(NdotError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_get_errors() {
        let t = sample_2x3();
        assert_eq!(t.get::<i64>(&[1, 2]).unwrap(), 6);
        assert!(matches!(
            t.get::<i64>(&[2, 0]),
            Err(NdotError::IndexOutOfBounds { .. })
        ));
        assert!(matches!(
            t.get::<i64>(&[0]),
            Err(NdotError::IndexOutOfBounds { .. })
        ));
        assert!(matches!(
            t.get::<f64>(&[0, 0]),
            Err(NdotError::DTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_reshape() {
        let r = sample_2x3().reshape(&[3, 2]).unwrap();
        assert_eq!(r.shape().dims(), &[3, 2]);
        assert_eq!(r.as_slice::<i64>().unwrap(), &[1, 2, 3, 4, 5, 6]);

        let r = sample_2x3().reshape(&[-1, 2]).unwrap();
        assert_eq!(r.shape().dims(), &[3, 2]);

        assert!(matches!(
            sample_2x3().reshape(&[4, -1]),
            Err(NdotError::InvalidReshape { .. })
        ));
    }

    #[test]
    fn test_transpose() {
        let tr = sample_2x3().transpose().unwrap();
        assert_eq!(tr.shape().dims(), &[3, 2]);
        assert!(!tr.is_contiguous());
        assert!(tr.as_slice::<i64>().is_none());
        assert_eq!(tr.to_vec::<i64>().unwrap(), vec![1, 4, 2, 5, 3, 6]);

        assert!(Tensor::arange(3).transpose().is_err());
    }

    #[test]
    fn test_reshape_after_transpose_copies() {
        let tr = sample_2x3().transpose().unwrap();
        let flat = tr.reshape(&[6]).unwrap();
        assert_eq!(flat.as_slice::<i64>().unwrap(), &[1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn test_permute() {
        let t = Tensor::arange(24).reshape(&[2, 3, 4]).unwrap();
        let p = t.permute(&[2, 0, 1]).unwrap();
        assert_eq!(p.shape().dims(), &[4, 2, 3]);
        assert_eq!(p.get::<i64>(&[3, 1, 2]).unwrap(), t.get::<i64>(&[1, 2, 3]).unwrap());

        assert!(matches!(
            t.permute(&[0, 0, 1]),
            Err(NdotError::InvalidPermutation { .. })
        ));
    }

    #[test]
    fn test_index_axis0() {
        let t = Tensor::arange(8).reshape(&[2, 2, 2]).unwrap();
        let second = t.index_axis0(1).unwrap();
        assert_eq!(second.shape().dims(), &[2, 2]);
        assert!(second.is_contiguous());
        assert_eq!(second.as_slice::<i64>().unwrap(), &[4, 5, 6, 7]);
        assert_eq!(second.index_axis0(0).unwrap().to_vec::<i64>().unwrap(), vec![4, 5]);

        assert!(t.index_axis0(2).is_err());
        assert!(Tensor::scalar(1i64).index_axis0(0).is_err());
    }

    #[test]
    fn test_contiguous() {
        let tr = sample_2x3().transpose().unwrap();
        let c = tr.contiguous();
        assert!(c.is_contiguous());
        assert_eq!(c.shape().dims(), &[3, 2]);
        assert_eq!(c.as_slice::<i64>().unwrap(), &[1, 4, 2, 5, 3, 6]);

        let sub = Tensor::arange(4).reshape(&[2, 2]).unwrap().index_axis0(1).unwrap();
        assert_eq!(sub.contiguous().storage_ref().numel(), 2);
    }

    #[test]
    fn test_equality() {
        let a = sample_2x3();
        let b = sample_2x3().transpose().unwrap().contiguous().transpose().unwrap();
        assert!(!b.is_contiguous());
        assert_eq!(a, b);
        assert_ne!(a, a.reshape(&[3, 2]).unwrap());
        assert_ne!(a, Tensor::from_vec(vec![1i32, 2, 3, 4, 5, 6], &[2, 3]).unwrap());
    }
}
