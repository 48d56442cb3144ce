//! Fixed-size work-stealing thread pool for synchronous tasks
//!
//! # Features
//! - One task queue per worker, work stealing for load balancing
//! - Contention-aware round-robin submission (`spawn`)
//! - Bulk parallel iteration with join semantics (`split`)
//! - Panic isolation with pool-wide failure accounting
//! - Lightweight metrics snapshots

pub mod errors;
pub mod handle;
pub mod model;
pub mod pool;
pub mod queue;
pub mod result;

pub use handle::JoinHandle;
pub use pool::{Config, ThreadPool};
pub use result::SplitResult;
