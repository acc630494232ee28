//! CPU runtime implementation
//!
//! The CPU runtime uses aligned heap allocation. Kernels run on rayon when the
//! `rayon` feature is enabled and serially otherwise, with identical results.

mod client;
pub(crate) mod helpers;
pub(crate) mod kernels;
mod runtime;

pub use crate::tensor::Tensor;
pub use client::{CpuClient, ParallelismConfig};
pub use runtime::{CpuDevice, CpuRuntime};
