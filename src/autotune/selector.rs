//! Config selection strategies

use super::KernelConfig;
use crate::dtype::DType;
use crate::error::{Error, Result};
use log::{debug, trace};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Cache key for tuned configs
///
/// Only the feature width changes which config is fastest for a given dtype;
/// the sequence length is deliberately not part of the key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TuneKey {
    /// Feature width `S`
    pub width: usize,
    /// Storage dtype of the input
    pub dtype: DType,
}

/// Runs the kernel once with the given config and reports its wall time
pub type Benchmark<'a> = dyn FnMut(KernelConfig) -> Result<Duration> + 'a;

/// Strategy that picks a launch config for a shape
///
/// Implementations may call `bench` any number of times; each call launches
/// the real kernel on the real operands.
pub trait ConfigSelector: Send + Sync + fmt::Debug {
    /// Choose a config for `key`
    fn select(&self, key: TuneKey, bench: &mut Benchmark<'_>) -> Result<KernelConfig>;
}

/// Always returns the same config and never benchmarks
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FixedConfig(pub KernelConfig);

impl ConfigSelector for FixedConfig {
    fn select(&self, _key: TuneKey, _bench: &mut Benchmark<'_>) -> Result<KernelConfig> {
        Ok(self.0)
    }
}

/// Benchmarks every candidate on first use of a key and caches the winner
///
/// Each candidate runs `warmup` untimed launches, then `repeats` timed
/// launches; its score is the fastest timed launch. Ties keep the earlier
/// candidate.
pub struct Autotuner {
    candidates: Vec<KernelConfig>,
    warmup: usize,
    repeats: usize,
    cache: RwLock<HashMap<TuneKey, KernelConfig>>,
}

impl Autotuner {
    /// Autotuner over [`KernelConfig::candidates`]
    pub fn new() -> Self {
        Self {
            candidates: KernelConfig::candidates(),
            warmup: 1,
            repeats: 3,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Autotuner over a custom candidate list
    pub fn with_candidates(candidates: Vec<KernelConfig>) -> Result<Self> {
        if candidates.is_empty() {
            return Err(Error::invalid_argument(
                "candidates",
                "autotuner needs at least one config",
            ));
        }
        for config in &candidates {
            config.validate()?;
        }
        Ok(Self {
            candidates,
            ..Self::new()
        })
    }

    /// Set the untimed and timed launch counts per candidate
    ///
    /// `repeats` is raised to 1 if zero.
    pub fn with_repeats(mut self, warmup: usize, repeats: usize) -> Self {
        self.warmup = warmup;
        self.repeats = repeats.max(1);
        self
    }

    /// Candidates searched on a cache miss
    pub fn candidates(&self) -> &[KernelConfig] {
        &self.candidates
    }

    /// Previously selected config for `key`, if any
    pub fn cached(&self, key: TuneKey) -> Option<KernelConfig> {
        self.cache.read().get(&key).copied()
    }

    /// Number of cached keys
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    /// True if nothing has been tuned yet
    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    /// Forget every tuned config
    pub fn clear(&self) {
        self.cache.write().clear();
    }

    fn score(&self, config: KernelConfig, bench: &mut Benchmark<'_>) -> Result<Duration> {
        for _ in 0..self.warmup {
            bench(config)?;
        }
        let mut best = Duration::MAX;
        for _ in 0..self.repeats {
            best = best.min(bench(config)?);
        }
        Ok(best)
    }
}

impl Default for Autotuner {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigSelector for Autotuner {
    fn select(&self, key: TuneKey, bench: &mut Benchmark<'_>) -> Result<KernelConfig> {
        if let Some(config) = self.cached(key) {
            return Ok(config);
        }

        let mut best: Option<(KernelConfig, Duration)> = None;
        for &config in &self.candidates {
            let elapsed = self.score(config, bench)?;
            trace!("autotune {key:?}: {config} took {elapsed:?}");
            if best.is_none_or(|(_, fastest)| elapsed < fastest) {
                best = Some((config, elapsed));
            }
        }

        // `with_candidates` rejects empty lists, so this only guards `new`.
        let (config, elapsed) = best.ok_or_else(|| {
            Error::invalid_argument("candidates", "autotuner needs at least one config")
        })?;

        debug!(
            "autotune {}x{}: selected {config} ({elapsed:?})",
            key.dtype, key.width
        );

        // A concurrent tuner may have stored a result first; keep theirs.
        Ok(*self.cache.write().entry(key).or_insert(config))
    }
}

impl fmt::Debug for Autotuner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Autotuner")
            .field("candidates", &self.candidates().len())
            .field("warmup", &self.warmup)
            .field("repeats", &self.repeats)
            .field("cached", &self.len())
            .finish()
    }
}
