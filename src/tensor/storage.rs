//! Storage: device memory management with Arc-based sharing

use crate::dtype::{DType, Element};
use crate::error::Result;
use crate::runtime::Runtime;
use std::sync::Arc;

/// Storage for tensor data on a device
///
/// Storage wraps device memory with reference counting. Memory is
/// deallocated when the last reference is dropped.
pub struct Storage<R: Runtime> {
    inner: Arc<StorageInner<R>>,
}

struct StorageInner<R: Runtime> {
    /// Raw device pointer (CPU ptr cast to u64)
    ptr: u64,
    /// Number of elements (not bytes)
    len: usize,
    dtype: DType,
    device: R::Device,
}

impl<R: Runtime> Storage<R> {
    /// Create new zero-initialised storage
    ///
    /// Allocates `len` elements of type `dtype` on the specified device.
    pub fn new(len: usize, dtype: DType, device: &R::Device) -> Result<Self> {
        let size_bytes = len * dtype.size_in_bytes();
        let ptr = R::allocate(size_bytes, device)?;

        Ok(Self {
            inner: Arc::new(StorageInner {
                ptr,
                len,
                dtype,
                device: device.clone(),
            }),
        })
    }

    /// Create storage from existing data with inferred dtype
    pub fn from_slice<T: Element>(data: &[T], device: &R::Device) -> Result<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let ptr = R::allocate(bytes.len(), device)?;

        R::copy_to_device(bytes, ptr, device)?;

        Ok(Self {
            inner: Arc::new(StorageInner {
                ptr,
                len: data.len(),
                dtype: T::DTYPE,
                device: device.clone(),
            }),
        })
    }

    /// Get the raw device pointer
    #[inline]
    pub fn ptr(&self) -> u64 {
        self.inner.ptr
    }

    /// Get the number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len
    }

    /// Check if storage is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.len == 0
    }

    /// Get the element type
    #[inline]
    pub fn dtype(&self) -> DType {
        self.inner.dtype
    }

    /// Get the device
    #[inline]
    pub fn device(&self) -> &R::Device {
        &self.inner.device
    }

    /// Get size in bytes
    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.inner.len * self.inner.dtype.size_in_bytes()
    }

    /// Copy data from device to host
    pub fn to_vec<T: bytemuck::Pod>(&self) -> Result<Vec<T>> {
        // Allocate with T's alignment, then view as bytes for the copy.
        let mut result = vec![T::zeroed(); self.size_in_bytes() / std::mem::size_of::<T>()];
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut result);
        R::copy_from_device(self.inner.ptr, bytes, &self.inner.device)?;
        Ok(result)
    }
}

impl<R: Runtime> Clone for Storage<R> {
    /// Clone increments the reference count (zero-copy)
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Runtime> Drop for StorageInner<R> {
    fn drop(&mut self) {
        if self.ptr != 0 {
            R::deallocate(
                self.ptr,
                self.len * self.dtype.size_in_bytes(),
                &self.device,
            );
        }
    }
}

impl<R: Runtime> std::fmt::Debug for Storage<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("ptr", &format!("0x{:x}", self.inner.ptr))
            .field("len", &self.inner.len)
            .field("dtype", &self.inner.dtype)
            .field("refs", &Arc::strong_count(&self.inner))
            .finish()
    }
}
