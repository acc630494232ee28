//! # logcumsumexp
//!
//! **Streaming, numerically stable log-cumsum-exp over `[..., T, S]` tensors.**
//!
//! For every batch-head and feature column the crate computes the inclusive
//! prefix `z[t] = log(Σ_{τ ≤ t} exp(s[τ]))` without overflow, even for inputs
//! in the thousands. The time axis is processed in fixed-size blocks: inside a
//! block the prefix sum is a lower-triangular matrix product, across blocks a
//! running `(max, sum)` carry is rescaled whenever the max grows.
//!
//! ## Quick Start
//!
//! ```rust
//! use logcumsumexp::prelude::*;
//!
//! let device = CpuDevice::new();
//! let client = CpuRuntime::default_client(&device);
//!
//! let s = Tensor::<CpuRuntime>::from_slice(&[1000.0f32, 1000.0, 1000.0], &[3, 1], &device);
//! let z: Vec<f32> = client.logcumsumexp(&s)?.to_vec();
//! assert!((z[2] - (1000.0 + 3f32.ln())).abs() < 1e-3);
//! # Ok::<(), logcumsumexp::error::Error>(())
//! ```
//!
//! ## Launch configuration
//!
//! Block size and column-group parallelism come from a
//! [`KernelConfig`](autotune::KernelConfig). By default the client's
//! [`Autotuner`](autotune::Autotuner) benchmarks every candidate the first time
//! a `(S, dtype)` pair is seen; pin a config per call with
//! [`LogCumsumExpOptions`](ops::LogCumsumExpOptions) or install a
//! [`FixedConfig`](autotune::FixedConfig) on the client. None of this changes
//! the values computed.
//!
//! ## Feature Flags
//!
//! - `rayon` (default): Multi-threaded CPU kernels
//! - `f16`: Half-precision storage (F16, BF16), accumulated in f32

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod autotune;
pub mod dtype;
pub mod error;
pub mod ops;
pub mod runtime;
pub mod tensor;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::autotune::{Autotuner, BlockSize, ConfigSelector, FixedConfig, KernelConfig};
    pub use crate::dtype::DType;
    pub use crate::error::{Error, Result};
    pub use crate::ops::{AccessMode, CumulativeOps, LogCumsumExpOptions};
    pub use crate::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime, ParallelismConfig};
    pub use crate::runtime::{Device, Runtime, RuntimeClient};
    pub use crate::tensor::{Layout, Tensor};
}
