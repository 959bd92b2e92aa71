pub use crate::background::BackgroundWorker;
pub use crate::cancel::CancellationToken;
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{Error, Rejection, Result, TaskError};
pub use crate::executor::{PanicStrategy, Task, TaskBody, TaskHandle};
pub use crate::manager::TaskManager;
pub use crate::stats::TaskStats;
