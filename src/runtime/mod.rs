//! Runtime backends for tensor computation
//!
//! This module defines the `Runtime` trait and the CPU implementation.
//!
//! # Architecture
//!
//! ```text
//! Runtime (backend identity, memory primitives)
//! ├── Device (identifies a specific compute unit)
//! └── Client (dispatches operations, owns launch configuration)
//! ```

pub mod cpu;

/// Core trait for compute backends
///
/// `Runtime` abstracts over the memory of a compute device. It uses static
/// dispatch via generics, so kernels see raw device pointers with no
/// indirection.
///
/// # Example
///
/// ```ignore
/// let device = CpuRuntime::default_device();
/// let ptr = CpuRuntime::allocate(1024, &device)?;
/// // ... use memory ...
/// CpuRuntime::deallocate(ptr, 1024, &device);
/// ```
pub trait Runtime: Clone + Send + Sync + 'static {
    /// Device identifier type
    type Device: Device;

    /// Client for dispatching operations
    type Client: RuntimeClient<Self>;

    /// Human-readable name of this runtime
    fn name() -> &'static str;

    /// Allocate zero-initialised device memory
    ///
    /// Returns a device pointer (u64); zero-sized requests return the null handle `0`.
    fn allocate(size_bytes: usize, device: &Self::Device) -> crate::error::Result<u64>;

    /// Deallocate device memory
    fn deallocate(ptr: u64, size_bytes: usize, device: &Self::Device);

    /// Copy data from host to device
    fn copy_to_device(src: &[u8], dst: u64, device: &Self::Device) -> crate::error::Result<()>;

    /// Copy data from device to host
    fn copy_from_device(
        src: u64,
        dst: &mut [u8],
        device: &Self::Device,
    ) -> crate::error::Result<()>;

    /// Get the default device
    fn default_device() -> Self::Device;

    /// Get the default client for a device
    fn default_client(device: &Self::Device) -> Self::Client;
}

/// Trait for device identification
pub trait Device: Clone + Send + Sync + 'static {
    /// Unique identifier for this device
    fn id(&self) -> usize;

    /// Check if two devices are the same
    fn is_same(&self, other: &Self) -> bool {
        self.id() == other.id()
    }

    /// Human-readable name
    fn name(&self) -> String {
        format!("Device({})", self.id())
    }
}

/// Trait for runtime clients that handle operation dispatch
pub trait RuntimeClient<R: Runtime>: Clone + Send + Sync {
    /// Get the device this client operates on
    fn device(&self) -> &R::Device;

    /// Synchronize: wait for all pending operations to complete
    fn synchronize(&self);
}
