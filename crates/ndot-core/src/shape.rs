use smallvec::SmallVec;
use std::fmt;

/// Inline storage for up to six axes, heap beyond that.
pub type Dims = SmallVec<[usize; 6]>;

/// Ordered axis lengths of a tensor, stack-allocated for ≤6 dimensions.
///
/// A dot product of two rank-4 operands already yields rank 6, so the inline
/// capacity is sized for that rather than for plain matrices.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Dims,
}

impl Shape {
    pub fn new(dims: &[usize]) -> Self {
        Self {
            dims: SmallVec::from_slice(dims),
        }
    }

    /// Shape of a rank-0 tensor.
    pub fn scalar() -> Self {
        Self { dims: Dims::new() }
    }

    /// Concatenate axis lists, e.g. `A.shape[:-1] + B.shape[-1:]`.
    pub fn concat(parts: &[&[usize]]) -> Shape {
        Shape {
            dims: parts.iter().flat_map(|p| p.iter().copied()).collect(),
        }
    }

    /// Rank.
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements. A scalar holds one.
    ///
    /// Any zero-length axis makes the count 0, however long the other axes
    /// are. A count that does not fit in `usize` saturates.
    pub fn numel(&self) -> usize {
        checked_numel(&self.dims).unwrap_or(usize::MAX)
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Length of `axis`, if it exists.
    pub fn dim(&self, axis: usize) -> Option<usize> {
        self.dims.get(axis).copied()
    }

    /// Length of the last axis.
    pub fn last(&self) -> Option<usize> {
        self.dims.last().copied()
    }

    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    /// Whether any axis has length zero.
    pub fn is_empty(&self) -> bool {
        self.dims.contains(&0)
    }

    /// Row-major strides, in elements.
    pub fn contiguous_strides(&self) -> Dims {
        let mut strides = Dims::from_elem(1, self.ndim());
        let mut acc = 1;
        for (stride, &d) in strides.iter_mut().zip(self.dims.iter()).rev() {
            *stride = acc;
            acc = acc.saturating_mul(d);
        }
        strides
    }

    /// NumPy broadcasting: align trailing axes, a length of 1 stretches.
    /// Returns None when two aligned lengths differ and neither is 1.
    pub fn broadcast_with(&self, other: &Shape) -> Option<Shape> {
        let ndim = self.ndim().max(other.ndim());
        let padded = |s: &Shape, i: usize| {
            let pad = ndim - s.ndim();
            if i < pad {
                1
            } else {
                s.dims[i - pad]
            }
        };

        let mut dims = Dims::with_capacity(ndim);
        for i in 0..ndim {
            let (a, b) = (padded(self, i), padded(other, i));
            let d = match (a, b) {
                _ if a == b => a,
                (1, _) => b,
                (_, 1) => a,
                _ => return None,
            };
            dims.push(d);
        }
        Some(Shape { dims })
    }

    /// Resolve a reshape target against this shape's element count.
    /// At most one entry may be -1, and it is inferred.
    pub fn resolve_reshape(&self, target: &[isize]) -> Option<Shape> {
        let numel = self.numel();
        let mut inferred = None;
        let mut dims = Dims::with_capacity(target.len());

        for (i, &d) in target.iter().enumerate() {
            match d {
                -1 if inferred.is_none() => {
                    inferred = Some(i);
                    dims.push(1);
                }
                d if d >= 0 => dims.push(d as usize),
                _ => return None,
            }
        }

        let known = dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))?;
        if let Some(i) = inferred {
            if known == 0 || numel % known != 0 {
                return None;
            }
            dims[i] = numel / known;
        } else if known != numel {
            return None;
        }
        Some(Shape { dims })
    }

    /// Shape with the last two axes swapped. None below rank 2.
    pub fn transpose(&self) -> Option<Shape> {
        let n = self.ndim();
        if n < 2 {
            return None;
        }
        let mut dims = self.dims.clone();
        dims.swap(n - 2, n - 1);
        Some(Shape { dims })
    }

    /// Reorder axes so that output axis `i` is input axis `axes[i]`.
    /// Returns None unless `axes` is a permutation of `0..ndim`.
    pub fn permute(&self, axes: &[usize]) -> Option<Shape> {
        if !is_permutation(axes, self.ndim()) {
            return None;
        }
        Some(Shape {
            dims: axes.iter().map(|&a| self.dims[a]).collect(),
        })
    }
}

/// Element count of `dims`, or None if it overflows `usize`.
/// A zero-length axis anywhere gives `Some(0)`.
pub(crate) fn checked_numel(dims: &[usize]) -> Option<usize> {
    if dims.contains(&0) {
        return Some(0);
    }
    dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// Whether `axes` lists every index in `0..ndim` exactly once.
pub(crate) fn is_permutation(axes: &[usize], ndim: usize) -> bool {
    if axes.len() != ndim {
        return false;
    }
    let mut seen: SmallVec<[bool; 6]> = SmallVec::from_elem(false, ndim);
    for &a in axes {
        if a >= ndim || seen[a] {
            return false;
        }
        seen[a] = true;
    }
    true
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({:?})", self.dims.as_slice())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.dims.as_slice())
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::new(dims)
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape {
            dims: SmallVec::from_vec(dims),
        }
    }
}

macro_rules! impl_shape_from_array {
    ($($n:expr),*) => {
        $(
            impl From<[usize; $n]> for Shape {
                fn from(dims: [usize; $n]) -> Self {
                    Shape::new(&dims)
                }
            }
        )*
    };
}

impl_shape_from_array!(0, 1, 2, 3, 4, 5, 6);
