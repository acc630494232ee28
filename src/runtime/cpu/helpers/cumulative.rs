//! Log-cumsum-exp launch helpers for CPU tensors

use super::super::kernels;
use super::super::{CpuClient, CpuRuntime};
use crate::autotune::{KernelConfig, TuneKey};
use crate::dispatch_float_dtype;
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::ops::{AccessMode, LogCumsumExpOptions};
use crate::tensor::Tensor;
use log::debug;
use std::ops::Range;
use std::time::{Duration, Instant};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

const OP: &str = "logcumsumexp";

/// `[BH, T, S]` view of a rank ≥ 2 input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ScanGeometry {
    pub batch_heads: usize,
    pub seq_len: usize,
    pub width: usize,
}

impl ScanGeometry {
    pub(crate) fn of(s: &Tensor<CpuRuntime>) -> Result<Self> {
        let (batch_heads, seq_len, width) = s.layout().as_batched_matrix().ok_or_else(|| {
            Error::invalid_argument(
                "s",
                format!("expected shape [..., T, S] of rank >= 2, got {:?}", s.shape()),
            )
        })?;
        if width == 0 {
            return Err(Error::invalid_argument("s", "feature width S must be non-zero"));
        }
        Ok(Self {
            batch_heads,
            seq_len,
            width,
        })
    }

    #[inline]
    fn head_len(&self) -> usize {
        self.seq_len * self.width
    }
}

/// Columns owned by `group` when `width` columns are split into `groups`
#[inline]
pub(crate) fn column_range(width: usize, groups: usize, group: usize) -> Range<usize> {
    (group * width / groups)..((group + 1) * width / groups)
}

/// Log-cumsum-exp into a freshly allocated output
pub fn logcumsumexp_impl(
    client: &CpuClient,
    s: &Tensor<CpuRuntime>,
    options: LogCumsumExpOptions,
) -> Result<Tensor<CpuRuntime>> {
    ScanGeometry::of(s)?;
    let dtype = s.dtype();
    if !dtype.is_float() {
        return Err(Error::unsupported_dtype(dtype, OP));
    }

    let z = Tensor::<CpuRuntime>::try_zeros(s.shape(), dtype, &client.device)?;
    logcumsumexp_into_impl(client, s, &z, options)?;
    Ok(z)
}

/// Log-cumsum-exp into a caller-provided output of the same shape and dtype
pub fn logcumsumexp_into_impl(
    client: &CpuClient,
    s: &Tensor<CpuRuntime>,
    z: &Tensor<CpuRuntime>,
    options: LogCumsumExpOptions,
) -> Result<()> {
    let geometry = ScanGeometry::of(s)?;
    if z.shape() != s.shape() {
        return Err(Error::shape_mismatch(s.shape(), z.shape()));
    }
    if z.dtype() != s.dtype() {
        return Err(Error::DTypeMismatch {
            lhs: s.dtype(),
            rhs: z.dtype(),
        });
    }
    if s.numel() > 0 && s.storage().ptr() == z.storage().ptr() {
        return Err(Error::invalid_argument("z", "output must not share storage with s"));
    }
    if let Some(config) = options.config {
        config.validate()?;
    }

    let dtype = s.dtype();
    dispatch_float_dtype!(dtype, T => {
        launch::<T>(client, s, z, geometry, options)?;
    }, OP);
    Ok(())
}

fn launch<T: Element>(
    client: &CpuClient,
    s: &Tensor<CpuRuntime>,
    z: &Tensor<CpuRuntime>,
    geometry: ScanGeometry,
    options: LogCumsumExpOptions,
) -> Result<()> {
    if geometry.seq_len == 0 || geometry.batch_heads == 0 {
        return Ok(());
    }

    let s_ptr = s.storage().ptr() as *const T;
    let z_ptr = z.storage().ptr() as *mut T;
    let access = options.access;

    let config = match options.config {
        Some(config) => config,
        None => {
            let key = TuneKey {
                width: geometry.width,
                dtype: T::DTYPE,
            };
            let mut bench = |config: KernelConfig| -> Result<Duration> {
                config.validate()?;
                let start = Instant::now();
                unsafe { logcumsumexp_runtime(client, s_ptr, z_ptr, geometry, config, access) };
                Ok(start.elapsed())
            };
            client.config_selector().select(key, &mut bench)?
        }
    };
    config.validate()?;

    debug!(
        "{OP} {}: [{}, {}, {}] {config}, {} column groups, {access:?}",
        T::DTYPE,
        geometry.batch_heads,
        geometry.seq_len,
        geometry.width,
        config.column_groups(geometry.width),
    );

    unsafe { logcumsumexp_runtime(client, s_ptr, z_ptr, geometry, config, access) };
    Ok(())
}

/// Run the grid of `BH × groups` tasks
///
/// # Safety
/// `s` and `z` must each point at `BH * T * S` elements and must not overlap.
unsafe fn logcumsumexp_runtime<T: Element>(
    client: &CpuClient,
    s: *const T,
    z: *mut T,
    geometry: ScanGeometry,
    config: KernelConfig,
    access: AccessMode,
) {
    let groups = config.column_groups(geometry.width);
    let tasks = geometry.batch_heads * groups;

    #[cfg(feature = "rayon")]
    {
        if tasks > 1 {
            return unsafe {
                logcumsumexp_parallel(client, s, z, geometry, config, access, groups)
            };
        }
    }

    #[cfg(not(feature = "rayon"))]
    let _ = client;

    for task in 0..tasks {
        unsafe { logcumsumexp_task(s, z, geometry, config, access, groups, task) };
    }
}

#[cfg(feature = "rayon")]
unsafe fn logcumsumexp_parallel<T: Element>(
    client: &CpuClient,
    s: *const T,
    z: *mut T,
    geometry: ScanGeometry,
    config: KernelConfig,
    access: AccessMode,
    groups: usize,
) {
    let min_len = client.rayon_min_len();
    let s_addr = s as usize;
    let z_addr = z as usize;
    client.install_parallelism(|| {
        (0..geometry.batch_heads * groups)
            .into_par_iter()
            .with_min_len(min_len)
            .for_each(|task| unsafe {
                logcumsumexp_task(
                    s_addr as *const T,
                    z_addr as *mut T,
                    geometry,
                    config,
                    access,
                    groups,
                    task,
                );
            });
    });
}

/// One `(batch-head, column group)` cell of the grid
#[inline]
unsafe fn logcumsumexp_task<T: Element>(
    s: *const T,
    z: *mut T,
    geometry: ScanGeometry,
    config: KernelConfig,
    access: AccessMode,
    groups: usize,
    task: usize,
) {
    let bh = task / groups;
    let cols = column_range(geometry.width, groups, task % groups);
    let offset = bh * geometry.head_len();
    unsafe {
        kernels::logcumsumexp_kernel(
            s.add(offset),
            z.add(offset),
            geometry.seq_len,
            geometry.width,
            cols,
            config.block_size,
            access,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_ranges_partition_width() {
        for width in 1..20 {
            for groups in 1..=width.min(8) {
                let mut next = 0;
                for g in 0..groups {
                    let r = column_range(width, groups, g);
                    assert_eq!(r.start, next);
                    assert!(!r.is_empty());
                    next = r.end;
                }
                assert_eq!(next, width);
            }
        }
    }

    #[test]
    fn test_geometry_folds_leading_dims() {
        let device = crate::runtime::cpu::CpuDevice::new();
        let s = Tensor::<CpuRuntime>::from_slice(&[0.0f32; 24], &[2, 3, 2, 2], &device);
        let g = ScanGeometry::of(&s).unwrap();
        assert_eq!(
            g,
            ScanGeometry {
                batch_heads: 6,
                seq_len: 2,
                width: 2
            }
        );
    }

    #[test]
    fn test_geometry_rejects_rank_one_and_zero_width() {
        let device = crate::runtime::cpu::CpuDevice::new();
        let v = Tensor::<CpuRuntime>::from_slice(&[0.0f32; 4], &[4], &device);
        assert!(matches!(
            ScanGeometry::of(&v),
            Err(Error::InvalidArgument { arg: "s", .. })
        ));
        let empty = Tensor::<CpuRuntime>::from_slice::<f32>(&[], &[3, 0], &device);
        assert!(ScanGeometry::of(&empty).is_err());
    }
}
