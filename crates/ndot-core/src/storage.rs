use std::sync::Arc;

use bytemuck::allocation::cast_vec;

use crate::{DType, Element};

/// Flat element buffer, one variant per dtype.
///
/// Keeping the buffers typed (rather than a raw `Vec<u8>`) guarantees the
/// alignment `bytemuck` needs when handing out `&[T]` views.
#[derive(Debug, Clone)]
enum StorageData {
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! with_buffer {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            StorageData::I32($v) => $body,
            StorageData::I64($v) => $body,
            StorageData::F32($v) => $body,
            StorageData::F64($v) => $body,
        }
    };
}

/// Shared, reference-counted tensor storage.
///
/// Views produced by reshape/transpose/permute clone the `Arc`, never the
/// elements.
#[derive(Debug, Clone)]
pub struct Storage {
    data: Arc<StorageData>,
}

impl Storage {
    /// Take ownership of a typed buffer without copying it.
    pub fn from_vec<T: Element>(data: Vec<T>) -> Self {
        // `T::DTYPE` names `T` itself, so each cast is an identity on the
        // same allocation and cannot fail.
        let data = match T::DTYPE {
            DType::I32 => StorageData::I32(cast_vec(data)),
            DType::I64 => StorageData::I64(cast_vec(data)),
            DType::F32 => StorageData::F32(cast_vec(data)),
            DType::F64 => StorageData::F64(cast_vec(data)),
        };
        Self {
            data: Arc::new(data),
        }
    }

    /// Zero-filled storage for `numel` elements of `dtype`.
    pub fn zeros(dtype: DType, numel: usize) -> Self {
        let data = match dtype {
            DType::I32 => StorageData::I32(vec![0; numel]),
            DType::I64 => StorageData::I64(vec![0; numel]),
            DType::F32 => StorageData::F32(vec![0.0; numel]),
            DType::F64 => StorageData::F64(vec![0.0; numel]),
        };
        Self {
            data: Arc::new(data),
        }
    }

    pub fn dtype(&self) -> DType {
        match self.data.as_ref() {
            StorageData::I32(_) => DType::I32,
            StorageData::I64(_) => DType::I64,
            StorageData::F32(_) => DType::F32,
            StorageData::F64(_) => DType::F64,
        }
    }

    /// Number of stored elements.
    pub fn numel(&self) -> usize {
        with_buffer!(self.data.as_ref(), v => v.len())
    }

    /// Typed view of the buffer. None if `T` is not this storage's dtype.
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        if T::DTYPE != self.dtype() {
            return None;
        }
        with_buffer!(self.data.as_ref(), v => bytemuck::try_cast_slice(v.as_slice()).ok())
    }

    /// Whether no other tensor shares this buffer.
    pub fn is_unique(&self) -> bool {
        Arc::strong_count(&self.data) == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_and_view() {
        let s = Storage::from_vec(vec![1i64, 2, 3]);
        assert_eq!(s.dtype(), DType::I64);
        assert_eq!(s.numel(), 3);
        assert_eq!(s.as_slice::<i64>(), Some(&[1i64, 2, 3][..]));
        assert!(s.as_slice::<i32>().is_none());
        assert!(s.as_slice::<f64>().is_none());
    }

    #[test]
    fn test_zeros() {
        let s = Storage::zeros(DType::F32, 4);
        assert_eq!(s.as_slice::<f32>().unwrap(), &[0.0; 4]);
    }

    #[test]
    fn test_from_vec_keeps_allocation() {
        let data = vec![1.5f32, -2.0, 4.0];
        let ptr = data.as_ptr();
        let s = Storage::from_vec(data);
        assert_eq!(s.dtype(), DType::F32);
        assert_eq!(s.as_slice::<f32>().unwrap().as_ptr(), ptr);
    }

    #[test]
    fn test_shared() {
        let s = Storage::from_vec(vec![1.0f64]);
        assert!(s.is_unique());
        let t = s.clone();
        assert!(!s.is_unique());
        drop(t);
        assert!(s.is_unique());
    }
}
