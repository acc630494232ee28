//! Tensor operations
//!
//! Operations are defined as traits implemented by each runtime's client, so
//! the client's device, thread pool and launch-config selector are at hand
//! when an output tensor is allocated and a kernel is dispatched.
//!
//! ```text
//! RuntimeClient<R>
//!   └── implements CumulativeOps<R>
//!         ├── logcumsumexp        (default options)
//!         ├── logcumsumexp_with   (pinned config / access mode)
//!         └── logcumsumexp_into   (caller-provided output)
//! ```
//!
//! A new backend implements `CumulativeOps<YourRuntime>` for its client type;
//! any method it leaves out reports `Error::NotImplemented`.

mod cpu;
mod dispatch;
mod traits;

pub use traits::{AccessMode, CumulativeOps, LogCumsumExpOptions};
