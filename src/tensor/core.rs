//! Core Tensor type

use super::{Layout, Storage};
use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::runtime::Runtime;
use std::fmt;

/// N-dimensional array stored on a compute device
///
/// `Tensor` consists of:
/// - **Storage**: Reference-counted device memory
/// - **Layout**: Row-major shape and strides
/// - **DType**: Element type (determined at runtime)
///
/// Tensors are always contiguous. Cloning a tensor shares its storage.
///
/// # Example
///
/// ```
/// use logcumsumexp::prelude::*;
///
/// let device = CpuDevice::new();
/// let t = Tensor::<CpuRuntime>::from_slice(&[1.0f32, 2.0, 3.0, 4.0], &[2, 2], &device);
/// assert_eq!(t.shape(), &[2, 2]);
/// ```
pub struct Tensor<R: Runtime> {
    storage: Storage<R>,
    layout: Layout,
}

impl<R: Runtime> Tensor<R> {
    /// Create a tensor from storage and layout
    pub fn from_parts(storage: Storage<R>, layout: Layout) -> Self {
        Self { storage, layout }
    }

    /// Create a tensor from a slice of data
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` does not equal the product of the `shape` dimensions.
    /// For a fallible alternative, use [`Self::try_from_slice`].
    pub fn from_slice<T: Element>(data: &[T], shape: &[usize], device: &R::Device) -> Self {
        Self::try_from_slice(data, shape, device).expect("Tensor::from_slice failed")
    }

    /// Create a tensor from a slice of data (fallible version)
    ///
    /// Returns an error if `data.len()` does not equal the product of the `shape` dimensions,
    /// or if memory allocation fails.
    pub fn try_from_slice<T: Element>(
        data: &[T],
        shape: &[usize],
        device: &R::Device,
    ) -> Result<Self> {
        let expected_len: usize = shape.iter().product();
        if data.len() != expected_len {
            return Err(Error::ShapeMismatch {
                expected: shape.to_vec(),
                got: vec![data.len()],
            });
        }

        let storage = Storage::from_slice(data, device)?;
        Ok(Self::from_parts(storage, Layout::contiguous(shape)))
    }

    /// Create a zero-filled tensor
    pub fn zeros(shape: &[usize], dtype: DType, device: &R::Device) -> Self {
        Self::try_zeros(shape, dtype, device).expect("Tensor::zeros failed")
    }

    /// Create a zero-filled tensor (fallible version)
    pub fn try_zeros(shape: &[usize], dtype: DType, device: &R::Device) -> Result<Self> {
        let len: usize = shape.iter().product();
        let storage = Storage::new(len, dtype, device)?;
        Ok(Self::from_parts(storage, Layout::contiguous(shape)))
    }

    /// Get the storage
    #[inline]
    pub fn storage(&self) -> &Storage<R> {
        &self.storage
    }

    /// Get the layout
    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Get the shape
    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.layout.shape()
    }

    /// Get the strides
    #[inline]
    pub fn strides(&self) -> &[usize] {
        self.layout.strides()
    }

    /// Get the number of dimensions (rank)
    #[inline]
    pub fn ndim(&self) -> usize {
        self.layout.ndim()
    }

    /// Get the total number of elements
    #[inline]
    pub fn numel(&self) -> usize {
        self.layout.elem_count()
    }

    /// Get the element type
    #[inline]
    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    /// Get the device
    #[inline]
    pub fn device(&self) -> &R::Device {
        self.storage.device()
    }

    /// Get size along a dimension (supports negative indexing)
    pub fn size(&self, dim: isize) -> Option<usize> {
        self.layout.dim(dim)
    }

    /// Copy tensor data to a Vec on the host
    ///
    /// # Panics
    ///
    /// Panics if `T` is not the tensor's dtype. See [`Self::try_to_vec`].
    pub fn to_vec<T: Element>(&self) -> Vec<T> {
        self.try_to_vec().expect("Tensor::to_vec failed")
    }

    /// Copy tensor data to a Vec on the host (fallible version)
    pub fn try_to_vec<T: Element>(&self) -> Result<Vec<T>> {
        if T::DTYPE != self.dtype() {
            return Err(Error::DTypeMismatch {
                lhs: self.dtype(),
                rhs: T::DTYPE,
            });
        }
        self.storage.to_vec()
    }
}

impl<R: Runtime> Clone for Tensor<R> {
    /// Clone shares storage (zero-copy)
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            layout: self.layout.clone(),
        }
    }
}

impl<R: Runtime> fmt::Debug for Tensor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape())
            .field("dtype", &self.dtype())
            .field("runtime", &R::name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::cpu::{CpuDevice, CpuRuntime};

    #[test]
    fn test_from_slice_round_trip() {
        let device = CpuDevice::new();
        let t = Tensor::<CpuRuntime>::from_slice(&[1.0f64, 2.0, 3.0], &[3, 1], &device);
        assert_eq!(t.dtype(), DType::F64);
        assert_eq!(t.to_vec::<f64>(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_from_slice_length_mismatch() {
        let device = CpuDevice::new();
        let result = Tensor::<CpuRuntime>::try_from_slice(&[1.0f32, 2.0], &[3], &device);
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_to_vec_wrong_type() {
        let device = CpuDevice::new();
        let t = Tensor::<CpuRuntime>::from_slice(&[1.0f32], &[1], &device);
        assert!(matches!(
            t.try_to_vec::<f64>(),
            Err(Error::DTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_tensor() {
        let device = CpuDevice::new();
        let t = Tensor::<CpuRuntime>::zeros(&[2, 0, 3], DType::F32, &device);
        assert_eq!(t.numel(), 0);
        assert!(t.to_vec::<f32>().is_empty());
    }
}
