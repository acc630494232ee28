//! CPU implementation of cumulative operations.

use crate::error::Result;
use crate::ops::{CumulativeOps, LogCumsumExpOptions};
use crate::runtime::cpu::{
    CpuClient, CpuRuntime,
    helpers::{logcumsumexp_impl, logcumsumexp_into_impl},
};
use crate::tensor::Tensor;

/// CumulativeOps implementation for CPU runtime.
impl CumulativeOps<CpuRuntime> for CpuClient {
    fn logcumsumexp_with(
        &self,
        s: &Tensor<CpuRuntime>,
        options: LogCumsumExpOptions,
    ) -> Result<Tensor<CpuRuntime>> {
        logcumsumexp_impl(self, s, options)
    }

    fn logcumsumexp_into(
        &self,
        s: &Tensor<CpuRuntime>,
        z: &Tensor<CpuRuntime>,
        options: LogCumsumExpOptions,
    ) -> Result<()> {
        logcumsumexp_into_impl(self, s, z, options)
    }
}
