//! taskpool - bounded in-process task execution
//!
//! Runs named units of work on a fixed set of worker threads, records the
//! outcome of every execution per task id, and offers a supervised
//! background worker with a fail-fast intake queue in front of the pool.
//!
//! # Quick Start
//!
//! ```no_run
//! use taskpool::prelude::*;
//!
//! let worker = BackgroundWorker::new(4, 64).unwrap();
//! worker.start().unwrap();
//!
//! worker
//!     .submit_task(Task::new("order_1", "process order", |cancel| {
//!         if cancel.is_cancelled() {
//!             anyhow::bail!("shutting down");
//!         }
//!         Ok(())
//!     }))
//!     .unwrap();
//!
//! worker.stop();
//! println!("{:?}", worker.manager().get_all_stats());
//! ```
//!
//! # Admission
//!
//! - [`TaskManager::submit`] blocks while the pool's queue is full and fails
//!   once the manager shuts down.
//! - [`BackgroundWorker::submit_task`] never blocks; a full intake queue is
//!   reported as [`Rejection::QueueFull`].
//!
//! Task failures and panics are recorded in [`TaskStats`] and never surface
//! as submission errors.

#![warn(missing_debug_implementations)]

pub mod background;
pub mod cancel;
pub mod config;
pub mod error;
pub mod executor;
pub mod manager;
pub mod prelude;
pub mod samples;
pub mod stats;

// Re-export key types at crate root
pub use background::BackgroundWorker;
pub use cancel::CancellationToken;
pub use config::{Config, ConfigBuilder};
pub use error::{Error, Rejection, Result, TaskError};
pub use executor::{Task, TaskBody, TaskHandle};
pub use manager::TaskManager;
pub use stats::TaskStats;
