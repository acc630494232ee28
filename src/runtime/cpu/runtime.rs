//! CPU runtime implementation

use super::client::CpuClient;
use crate::error::{Error, Result};
use crate::runtime::{Device, Runtime};
use std::alloc::{Layout as AllocLayout, alloc_zeroed, dealloc};

/// Alignment of every host allocation (one cache line, AVX-512 friendly)
const ALIGN: usize = 64;

/// The host CPU as a device
///
/// There is exactly one; parallelism inside it is configured on the client.
#[derive(Clone, Debug, Default)]
pub struct CpuDevice;

impl CpuDevice {
    /// Create a handle to the host CPU
    pub fn new() -> Self {
        Self
    }
}

impl Device for CpuDevice {
    fn id(&self) -> usize {
        0
    }

    fn name(&self) -> String {
        "cpu".to_string()
    }
}

/// CPU compute runtime
///
/// Memory is allocated on the heap using the system allocator.
#[derive(Clone, Debug, Default)]
pub struct CpuRuntime;

fn alloc_layout(size_bytes: usize) -> Result<AllocLayout> {
    AllocLayout::from_size_align(size_bytes, ALIGN).map_err(|_| Error::OutOfMemory {
        size: size_bytes,
    })
}

impl Runtime for CpuRuntime {
    type Device = CpuDevice;
    type Client = CpuClient;

    fn name() -> &'static str {
        "cpu"
    }

    fn allocate(size_bytes: usize, _device: &Self::Device) -> Result<u64> {
        if size_bytes == 0 {
            return Ok(0);
        }

        let layout = alloc_layout(size_bytes)?;
        let ptr = unsafe { alloc_zeroed(layout) };

        if ptr.is_null() {
            return Err(Error::OutOfMemory { size: size_bytes });
        }

        Ok(ptr as u64)
    }

    fn deallocate(ptr: u64, size_bytes: usize, _device: &Self::Device) {
        if ptr == 0 || size_bytes == 0 {
            return;
        }

        // Same size/align pair that `allocate` accepted, so this cannot fail.
        if let Ok(layout) = alloc_layout(size_bytes) {
            unsafe {
                dealloc(ptr as *mut u8, layout);
            }
        }
    }

    fn copy_to_device(src: &[u8], dst: u64, _device: &Self::Device) -> Result<()> {
        if src.is_empty() || dst == 0 {
            return Ok(());
        }

        unsafe {
            std::ptr::copy_nonoverlapping(src.as_ptr(), dst as *mut u8, src.len());
        }
        Ok(())
    }

    fn copy_from_device(src: u64, dst: &mut [u8], _device: &Self::Device) -> Result<()> {
        if dst.is_empty() || src == 0 {
            return Ok(());
        }

        unsafe {
            std::ptr::copy_nonoverlapping(src as *const u8, dst.as_mut_ptr(), dst.len());
        }
        Ok(())
    }

    fn default_device() -> Self::Device {
        CpuDevice::new()
    }

    fn default_client(device: &Self::Device) -> Self::Client {
        CpuClient::new(device.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_is_zeroed_and_aligned() {
        let device = CpuDevice::new();
        let ptr = CpuRuntime::allocate(256, &device).unwrap();
        assert_eq!(ptr as usize % ALIGN, 0);

        let mut host = [0xffu8; 256];
        CpuRuntime::copy_from_device(ptr, &mut host, &device).unwrap();
        assert!(host.iter().all(|&b| b == 0));

        CpuRuntime::deallocate(ptr, 256, &device);
    }

    #[test]
    fn test_zero_sized_allocation() {
        let device = CpuDevice::new();
        assert_eq!(CpuRuntime::allocate(0, &device).unwrap(), 0);
        CpuRuntime::deallocate(0, 0, &device);
    }
}
