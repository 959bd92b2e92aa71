//! Task execution infrastructure.
//!
//! This module provides the execution primitives underneath
//! [`TaskManager`](crate::TaskManager): the task type, worker threads, the
//! bounded worker pool and the panic boundary around task bodies.

pub mod handle;
pub mod panic_handler;
pub mod pool;
pub mod task;
pub mod worker;

pub use handle::TaskHandle;
pub use panic_handler::{PanicHandler, PanicInfo, PanicStrategy};
pub use pool::WorkerPool;
pub use task::{Task, TaskBody};
