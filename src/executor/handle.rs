use crate::error::TaskError;
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

pub(crate) type Outcome = std::result::Result<(), TaskError>;

/// Completion handle returned by `TaskManager::submit_async`.
///
/// The outcome is delivered exactly once. If the task is dropped without
/// running, waiting yields [`TaskError::Abandoned`].
#[derive(Debug)]
pub struct TaskHandle {
    id: String,
    outcome: Receiver<Outcome>,
}

impl TaskHandle {
    pub(crate) fn new(id: String, outcome: Receiver<Outcome>) -> Self {
        Self { id, outcome }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Block until the task finishes.
    pub fn wait(self) -> Outcome {
        self.outcome.recv().unwrap_or(Err(TaskError::Abandoned))
    }

    /// `None` if the task is still queued or running after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Outcome> {
        match self.outcome.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(TaskError::Abandoned)),
        }
    }

    pub fn try_result(&self) -> Option<Outcome> {
        match self.outcome.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(TaskError::Abandoned)),
        }
    }
}
