//! CPU client: operation dispatch and launch policy

use super::runtime::{CpuDevice, CpuRuntime};
use crate::autotune::{Autotuner, ConfigSelector};
#[cfg(feature = "rayon")]
use crate::error::Error;
use crate::error::Result;
use crate::runtime::RuntimeClient;
use std::sync::Arc;

/// Thread-pool settings for parallel kernels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParallelismConfig {
    /// Worker threads; `None` uses the global rayon pool
    pub num_threads: Option<usize>,
    /// Smallest number of tasks a rayon split may hold
    pub min_len: usize,
}

impl ParallelismConfig {
    /// Create settings; `None` keeps the default for that field
    pub fn new(num_threads: Option<usize>, min_len: Option<usize>) -> Self {
        Self {
            num_threads,
            min_len: min_len.unwrap_or(1),
        }
    }
}

impl Default for ParallelismConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            min_len: 1,
        }
    }
}

/// CPU client for operation dispatch
///
/// Cheap to clone; clones share the thread pool and the config selector,
/// so configs tuned through one clone are visible to all of them.
#[derive(Clone, Debug)]
pub struct CpuClient {
    pub(crate) device: CpuDevice,
    parallelism: ParallelismConfig,
    selector: Arc<dyn ConfigSelector>,
    #[cfg(feature = "rayon")]
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl CpuClient {
    /// Create a client using the global pool and a fresh [`Autotuner`]
    pub fn new(device: CpuDevice) -> Self {
        Self {
            device,
            parallelism: ParallelismConfig::default(),
            selector: Arc::new(Autotuner::new()),
            #[cfg(feature = "rayon")]
            pool: None,
        }
    }

    /// Replace the parallelism settings
    ///
    /// A dedicated pool is built when `num_threads` is set. Without the
    /// `rayon` feature the settings are stored but every kernel runs serially.
    pub fn with_parallelism(mut self, parallelism: ParallelismConfig) -> Result<Self> {
        #[cfg(feature = "rayon")]
        {
            self.pool = match parallelism.num_threads {
                Some(n) => {
                    let pool = rayon::ThreadPoolBuilder::new()
                        .num_threads(n)
                        .thread_name(|i| format!("logcumsumexp-{i}"))
                        .build()
                        .map_err(|e| Error::Backend(format!("thread pool: {e}")))?;
                    Some(Arc::new(pool))
                }
                None => None,
            };
        }
        self.parallelism = parallelism;
        Ok(self)
    }

    /// Replace the launch-config selector
    pub fn with_config_selector(mut self, selector: Arc<dyn ConfigSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Current parallelism settings
    pub fn parallelism(&self) -> ParallelismConfig {
        self.parallelism
    }

    /// Selector consulted when a call does not pin its own config
    pub fn config_selector(&self) -> &dyn ConfigSelector {
        self.selector.as_ref()
    }

    /// Minimum split length for `with_min_len`
    #[inline]
    #[cfg_attr(not(feature = "rayon"), allow(dead_code))]
    pub(crate) fn rayon_min_len(&self) -> usize {
        self.parallelism.min_len.max(1)
    }

    /// Run `f` inside this client's pool, or the global pool if none
    #[cfg(feature = "rayon")]
    pub(crate) fn install_parallelism<F, T>(&self, f: F) -> T
    where
        F: FnOnce() -> T + Send,
        T: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }
}

impl Default for CpuClient {
    fn default() -> Self {
        Self::new(CpuDevice::new())
    }
}

impl RuntimeClient<CpuRuntime> for CpuClient {
    fn device(&self) -> &CpuDevice {
        &self.device
    }

    fn synchronize(&self) {
        // CPU kernels return only after every task has joined
    }
}
