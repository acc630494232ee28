//! Cumulative operations trait.

use crate::autotune::KernelConfig;
use crate::error::{Error, Result};
use crate::runtime::Runtime;
use crate::tensor::Tensor;

/// How a kernel moves tiles between memory and its working buffer
///
/// Both strategies produce bit-identical outputs; they differ only in how
/// partial blocks at the tensor edge are bounds-checked.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Clip each block against a shape/stride descriptor once, then copy
    /// whole row segments
    #[default]
    Descriptor,
    /// Step a block pointer down the time axis, checking every element
    BlockPointer,
}

/// Per-call knobs for [`CumulativeOps::logcumsumexp_with`]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LogCumsumExpOptions {
    /// Launch config to use; `None` asks the client's config selector
    pub config: Option<KernelConfig>,
    /// Tile access strategy
    pub access: AccessMode,
}

impl LogCumsumExpOptions {
    /// Pin the launch config, bypassing the selector
    pub fn with_config(mut self, config: KernelConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Choose the tile access strategy
    pub fn with_access(mut self, access: AccessMode) -> Self {
        self.access = access;
        self
    }
}

/// Cumulative operations
pub trait CumulativeOps<R: Runtime> {
    /// Inclusive log-cumsum-exp along the time axis
    ///
    /// For an input of shape `[..., T, S]` computes
    /// `z[..., t, s] = log(Σ_{τ ≤ t} exp(s[..., τ, s]))` for every leading
    /// index and feature column, without overflow for large inputs. All
    /// leading dimensions are treated as independent batch-heads.
    ///
    /// Half-precision inputs are accumulated in `f32`; `f64` in `f64`.
    ///
    /// # Arguments
    ///
    /// * `s` - Input tensor of rank ≥ 2, float dtype, non-zero last dimension
    ///
    /// # Returns
    ///
    /// Tensor with the same shape and dtype as `s`
    ///
    /// # Example
    ///
    /// ```
    /// # use logcumsumexp::prelude::*;
    /// # let device = CpuDevice::new();
    /// # let client = CpuRuntime::default_client(&device);
    /// let s = Tensor::<CpuRuntime>::from_slice(&[0.0f32; 6], &[3, 2], &device);
    /// let z = client.logcumsumexp(&s)?; // [[0, 0], [ln 2, ln 2], [ln 3, ln 3]]
    /// # Ok::<(), logcumsumexp::error::Error>(())
    /// ```
    fn logcumsumexp(&self, s: &Tensor<R>) -> Result<Tensor<R>> {
        self.logcumsumexp_with(s, LogCumsumExpOptions::default())
    }

    /// [`logcumsumexp`](Self::logcumsumexp) with explicit launch options
    ///
    /// Options never change the values computed, only how the work is tiled
    /// and scheduled.
    fn logcumsumexp_with(&self, s: &Tensor<R>, options: LogCumsumExpOptions) -> Result<Tensor<R>> {
        let _ = (s, options);
        Err(Error::NotImplemented {
            feature: "CumulativeOps::logcumsumexp_with",
        })
    }

    /// [`logcumsumexp_with`](Self::logcumsumexp_with) into an existing tensor
    ///
    /// `z` must match `s` in shape and dtype and must not share its storage.
    /// Every element of `z` is overwritten.
    fn logcumsumexp_into(
        &self,
        s: &Tensor<R>,
        z: &Tensor<R>,
        options: LogCumsumExpOptions,
    ) -> Result<()> {
        let _ = (s, z, options);
        Err(Error::NotImplemented {
            feature: "CumulativeOps::logcumsumexp_into",
        })
    }
}
