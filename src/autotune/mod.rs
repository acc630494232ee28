//! Launch-configuration selection
//!
//! Kernels take their tiling from a [`KernelConfig`]. Which config a call uses
//! is decided by a [`ConfigSelector`] held by the client, kept apart from the
//! kernels so the choice never changes what they compute.
//!
//! | Selector        | Behaviour                                              |
//! |-----------------|--------------------------------------------------------|
//! | [`Autotuner`]   | Times every candidate once per [`TuneKey`], caches best |
//! | [`FixedConfig`] | Always the same config, no timing                      |

mod config;
mod selector;

pub use config::{BlockSize, KernelConfig};
pub use selector::{Autotuner, Benchmark, ConfigSelector, FixedConfig, TuneKey};
