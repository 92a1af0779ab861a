//! Bounded-buffer coordination between producer and consumer threads.
//!
//! A [`Controller`] runs a fixed number of producer and consumer threads
//! against one buffer of limited capacity. Producers call a user function to
//! make items and consumers hand each item to another user function. The run
//! ends once `max_items` items have gone through the buffer and every thread
//! has exited.
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let next = AtomicUsize::new(0);
//! let sum = AtomicUsize::new(0);
//! let report = prodcon::run(
//!     || next.fetch_add(1, Ordering::Relaxed),
//!     |n: usize| {
//!         sum.fetch_add(n, Ordering::Relaxed);
//!     },
//!     2,
//!     2,
//!     10,
//!     4,
//! )
//! .unwrap();
//! assert_eq!(report.consumed, 10);
//! ```

pub mod bounded_queue;
pub mod config;
pub mod controller;
pub mod error;
pub mod mutex;
pub mod semaphore;
mod state;
pub mod trace;
pub mod worker;

pub use config::Config;
pub use controller::{run, Controller, ControllerBuilder, RunReport, WorkerReport};
pub use error::{ConfigError, Fault, RunError};
pub use worker::{Role, WorkerId, WorkerStats};
