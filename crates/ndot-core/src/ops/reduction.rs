//! Reductions: sum, mean, max, argmax, over all elements or along one axis.

use rayon::prelude::*;

use crate::contraction::PAR_THRESHOLD;
use crate::dtype::{with_dtype, Element};
use crate::error::NdotError;
use crate::shape::Shape;
use crate::tensor::Tensor;
use crate::Result;

/// The elements along one axis for a fixed position of all the others.
type Lane<'a, T> = std::iter::Take<std::iter::StepBy<std::slice::Iter<'a, T>>>;

impl Tensor {
    /// Sum of every element as a rank-0 tensor of the same dtype. Integers
    /// wrap on overflow.
    pub fn sum_all(&self) -> Tensor {
        with_dtype!(self.dtype(), T => {
            let data = self.elements_as::<T>();
            let sum = |chunk: &[T]| chunk.iter().fold(T::zero(), |acc, &v| T::accumulate(acc, v));
            // Fixed-size chunks keep float sums independent of the thread count.
            let total = if data.len() >= PAR_THRESHOLD {
                let partials: Vec<T> = data.par_chunks(PAR_THRESHOLD).map(sum).collect();
                sum(&partials[..])
            } else {
                sum(&data[..])
            };
            Tensor::scalar(total)
        })
    }

    /// Sum along `axis`, removing it.
    ///
    /// ```
    /// use ndot_core::Tensor;
    ///
    /// let t = Tensor::from_nested([[1, 2, 3], [4, 5, 6]]).unwrap();
    /// assert_eq!(t.sum_axis(0).unwrap(), Tensor::from_nested([5, 7, 9]).unwrap());
    /// assert_eq!(t.sum_axis(1).unwrap(), Tensor::from_nested([6, 15]).unwrap());
    /// ```
    pub fn sum_axis(&self, axis: usize) -> Result<Tensor> {
        let out_shape = self.reduced_shape(axis)?;
        with_dtype!(self.dtype(), T => {
            let data = self.elements_as::<T>();
            let out = reduce_lanes(&data[..], self.shape().dims(), axis, |lane| {
                lane.fold(T::zero(), |acc, &v| T::accumulate(acc, v))
            });
            Tensor::from_vec(out, out_shape.dims())
        })
    }

    /// Arithmetic mean of every element as a rank-0 F64 tensor. NaN when
    /// there are no elements.
    pub fn mean_all(&self) -> Tensor {
        let data = self.elements_as::<f64>();
        Tensor::scalar(data.iter().sum::<f64>() / data.len() as f64)
    }

    /// Mean along `axis` as F64, removing the axis. An empty axis gives NaN.
    pub fn mean_axis(&self, axis: usize) -> Result<Tensor> {
        let out_shape = self.reduced_shape(axis)?;
        let len = self.shape().dims()[axis] as f64;
        let data = self.elements_as::<f64>();
        let out = reduce_lanes(&data[..], self.shape().dims(), axis, |lane| {
            lane.sum::<f64>() / len
        });
        Tensor::from_vec(out, out_shape.dims())
    }

    /// Largest element as a rank-0 tensor of the same dtype.
    ///
    /// NaN never compares greater than anything, so it is only returned
    /// when it comes first.
    pub fn max_all(&self) -> Result<Tensor> {
        with_dtype!(self.dtype(), T => {
            let data = self.elements_as::<T>();
            let (_, max) = first_max(data.iter()).ok_or(NdotError::EmptyReduction { op: "max" })?;
            Ok(Tensor::scalar(max))
        })
    }

    /// Largest element along `axis`, removing it.
    pub fn max_axis(&self, axis: usize) -> Result<Tensor> {
        let out_shape = self.reduced_shape(axis)?;
        with_dtype!(self.dtype(), T => {
            let data = self.elements_as::<T>();
            let out: Option<Vec<T>> = reduce_lanes(&data[..], self.shape().dims(), axis, |lane| {
                first_max(lane).map(|(_, v)| v)
            })
            .into_iter()
            .collect();
            Tensor::from_vec(out.ok_or(NdotError::EmptyReduction { op: "max" })?, out_shape.dims())
        })
    }

    /// Row-major flat index of the first largest element.
    pub fn argmax_all(&self) -> Result<usize> {
        with_dtype!(self.dtype(), T => {
            let data = self.elements_as::<T>();
            let (index, _) = first_max(data.iter()).ok_or(NdotError::EmptyReduction { op: "argmax" })?;
            Ok(index)
        })
    }

    /// Position of the first largest element along `axis`, as I64, with the
    /// axis removed.
    pub fn argmax_axis(&self, axis: usize) -> Result<Tensor> {
        let out_shape = self.reduced_shape(axis)?;
        with_dtype!(self.dtype(), T => {
            let data = self.elements_as::<T>();
            let out: Option<Vec<i64>> = reduce_lanes(&data[..], self.shape().dims(), axis, |lane| {
                first_max(lane).map(|(i, _)| i as i64)
            })
            .into_iter()
            .collect();
            Tensor::from_vec(out.ok_or(NdotError::EmptyReduction { op: "argmax" })?, out_shape.dims())
        })
    }

    /// This tensor's shape without `axis`.
    fn reduced_shape(&self, axis: usize) -> Result<Shape> {
        let dims = self.shape().dims();
        if axis >= dims.len() {
            return Err(NdotError::InvalidAxis {
                axis,
                ndim: dims.len(),
            });
        }
        Ok(Shape::concat(&[&dims[..axis], &dims[axis + 1..]]))
    }
}

/// Index and value of the first maximum, None for an empty iterator.
fn first_max<'a, T: Element>(items: impl Iterator<Item = &'a T>) -> Option<(usize, T)> {
    items.enumerate().fold(None, |best, (i, &v)| match best {
        Some((_, b)) if v > b => Some((i, v)),
        Some(_) => best,
        None => Some((i, v)),
    })
}

/// Reduce every lane along `axis` of the row-major buffer `data` of shape
/// `dims`, returning one value per lane in row-major order of the
/// remaining axes. Large outputs are computed on the rayon pool.
fn reduce_lanes<T, R, F>(data: &[T], dims: &[usize], axis: usize, f: F) -> Vec<R>
where
    T: Element,
    R: Send,
    F: Fn(Lane<'_, T>) -> R + Sync,
{
    let len = dims[axis];
    let outer = Shape::new(&dims[..axis]).numel();
    let inner = Shape::new(&dims[axis + 1..]).numel();
    let lanes = outer.saturating_mul(inner);

    let lane = |o: usize| {
        let start = (o / inner) * len * inner + o % inner;
        data.get(start..).unwrap_or(&[]).iter().step_by(inner).take(len)
    };

    if lanes >= PAR_THRESHOLD {
        (0..lanes).into_par_iter().map(|o| f(lane(o))).collect()
    } else {
        (0..lanes).map(|o| f(lane(o))).collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::{DType, NdotError, Tensor};

    fn m() -> Tensor {
        Tensor::from_nested([[1i64, 3, 2], [5, 4, 6]]).unwrap()
    }

    #[test]
    fn test_sum_all() {
        let s = m().sum_all();
        assert!(s.shape().is_scalar());
        assert_eq!(s.dtype(), DType::I64);
        assert_eq!(s.get::<i64>(&[]).unwrap(), 21);

        let wrapped = Tensor::from_nested([i32::MAX, 1]).unwrap().sum_all();
        assert_eq!(wrapped.get::<i32>(&[]).unwrap(), i32::MIN);

        assert_eq!(Tensor::zeros(&[0], DType::F32).sum_all().get::<f32>(&[]).unwrap(), 0.0);
    }

    #[test]
    fn test_sum_all_parallel() {
        let n = 3 * crate::contraction::PAR_THRESHOLD + 5;
        let t = Tensor::arange(n);
        let expected = (n as i64 - 1) * n as i64 / 2;
        assert_eq!(t.sum_all().get::<i64>(&[]).unwrap(), expected);
    }

    #[test]
    fn test_sum_axis() {
        let s0 = m().sum_axis(0).unwrap();
        assert_eq!(s0.shape().dims(), &[3]);
        assert_eq!(s0.to_vec::<i64>().unwrap(), vec![6, 7, 8]);

        let s1 = m().sum_axis(1).unwrap();
        assert_eq!(s1.to_vec::<i64>().unwrap(), vec![6, 15]);

        let v = Tensor::arange(4).sum_axis(0).unwrap();
        assert!(v.shape().is_scalar());
        assert_eq!(v.get::<i64>(&[]).unwrap(), 6);
    }

    #[test]
    fn test_sum_axis_middle_of_rank3() {
        let t = Tensor::arange(24).reshape(&[2, 3, 4]).unwrap();
        let s = t.sum_axis(1).unwrap();
        assert_eq!(s.shape().dims(), &[2, 4]);
        assert_eq!(s.to_vec::<i64>().unwrap(), vec![12, 15, 18, 21, 48, 51, 54, 57]);

        // Same result through a permuted view.
        let p = t.permute(&[1, 0, 2]).unwrap().sum_axis(0).unwrap();
        assert_eq!(p, s);
    }

    #[test]
    fn test_sum_axis_parallel_lanes() {
        let t = Tensor::arange(3 * 9000).reshape(&[3, 9000]).unwrap();
        let s = t.sum_axis(0).unwrap();
        assert_eq!(s.numel(), 9000);
        let v = s.to_vec::<i64>().unwrap();
        assert_eq!(v[0], 9000 * 3);
        assert_eq!(v[8999], 8999 + 17999 + 26999);
    }

    #[test]
    fn test_sum_empty_axis() {
        let t = Tensor::zeros(&[3, 0], DType::I32);
        assert_eq!(t.sum_axis(1).unwrap().to_vec::<i32>().unwrap(), vec![0, 0, 0]);
        assert_eq!(t.sum_axis(0).unwrap().shape().dims(), &[0]);
    }

    #[test]
    fn test_mean() {
        let mean = m().mean_all();
        assert_eq!(mean.dtype(), DType::F64);
        assert_eq!(mean.get::<f64>(&[]).unwrap(), 3.5);

        let rows = m().mean_axis(1).unwrap();
        assert_eq!(rows.dtype(), DType::F64);
        assert_eq!(rows.to_vec::<f64>().unwrap(), vec![2.0, 5.0]);

        let cols = m().mean_axis(0).unwrap();
        assert_eq!(cols.to_vec::<f64>().unwrap(), vec![3.0, 3.5, 4.0]);

        assert!(Tensor::zeros(&[0], DType::F64).mean_all().get::<f64>(&[]).unwrap().is_nan());
    }

    #[test]
    fn test_max() {
        assert_eq!(m().max_all().unwrap().get::<i64>(&[]).unwrap(), 6);
        let cols = m().max_axis(0).unwrap();
        assert_eq!(cols.to_vec::<i64>().unwrap(), vec![5, 4, 6]);
        let rows = m().max_axis(1).unwrap();
        assert_eq!(rows.to_vec::<i64>().unwrap(), vec![3, 6]);

        let f = Tensor::from_nested([-1.5f32, -0.5, -2.0]).unwrap();
        assert_eq!(f.max_all().unwrap().get::<f32>(&[]).unwrap(), -0.5);
    }

    #[test]
    fn test_argmax() {
        assert_eq!(m().argmax_all().unwrap(), 5);
        let rows = m().argmax_axis(1).unwrap();
        assert_eq!(rows.dtype(), DType::I64);
        assert_eq!(rows.to_vec::<i64>().unwrap(), vec![1, 2]);
        let cols = m().argmax_axis(0).unwrap();
        assert_eq!(cols.to_vec::<i64>().unwrap(), vec![1, 1, 1]);

        // Ties resolve to the first occurrence.
        let ties = Tensor::from_nested([2, 7, 7, 1]).unwrap();
        assert_eq!(ties.argmax_all().unwrap(), 1);
    }

    #[test]
    fn test_reduction_errors() {
        assert!(matches!(
            m().sum_axis(2),
            Err(NdotError::InvalidAxis { axis: 2, ndim: 2 })
        ));
        assert!(matches!(
            Tensor::scalar(1i64).mean_axis(0),
            Err(NdotError::InvalidAxis { .. })
        ));

        let empty = Tensor::zeros(&[0, 3], DType::F64);
        assert_eq!(empty.max_all().unwrap_err(), NdotError::EmptyReduction { op: "max" });
        assert_eq!(empty.argmax_all().unwrap_err(), NdotError::EmptyReduction { op: "argmax" });
        assert!(matches!(empty.max_axis(0), Err(NdotError::EmptyReduction { .. })));
        // Reducing the non-empty axis just yields an empty result.
        assert_eq!(empty.max_axis(1).unwrap().shape().dims(), &[0]);
        assert_eq!(empty.argmax_axis(1).unwrap().shape().dims(), &[0]);
    }
}
