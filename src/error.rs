pub type Result<T> = std::result::Result<T, Error>;

/// Why a submission was refused at admission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("manager shut down")]
    ShutDown,

    #[error("queue full")]
    QueueFull,

    #[error("not running")]
    NotRunning,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("admission rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("executor error: {0}")]
    Executor(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn executor<S: Into<String>>(msg: S) -> Self {
        Error::Executor(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// The admission rejection carried by this error, if any.
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Error::Rejected(r) => Some(*r),
            _ => None,
        }
    }
}

/// Failure of a task body, as recorded in stats and delivered through a
/// [`TaskHandle`](crate::executor::TaskHandle).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("task failed: {0}")]
    Failed(String),

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("task dropped before completion")]
    Abandoned,
}
