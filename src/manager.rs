//! Bounded task manager: worker pool plus outcome statistics.

use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::error::{Error, Rejection, Result, TaskError};
use crate::executor::handle::Outcome;
use crate::executor::worker::Job;
use crate::executor::{PanicHandler, Task, TaskHandle, WorkerPool};
use crate::stats::{StatsTable, TaskStats};
use crossbeam_channel::{bounded, Sender};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Runs submitted tasks on a fixed number of worker threads and records the
/// outcome of each one under its task id.
///
/// Admission goes through a bounded queue of `queue_size` slots:
/// [`submit`](Self::submit) blocks while it is full and gives up as soon as
/// the manager shuts down. Execution errors and panics never reach the
/// submitter; they show up in [`get_stats`](Self::get_stats) or through a
/// [`TaskHandle`] from [`submit_async`](Self::submit_async).
///
/// ```no_run
/// use taskpool::{Task, TaskManager};
///
/// let manager = TaskManager::new(4, 16).unwrap();
/// manager
///     .submit(Task::new("order_1", "process order", |_cancel| Ok(())))
///     .unwrap();
/// manager.shutdown_and_wait();
/// assert_eq!(manager.get_stats("order_1").unwrap().success_count, 1);
/// ```
pub struct TaskManager {
    pool: WorkerPool,
    shared: Arc<Shared>,
}

// Everything a running job needs; jobs never hold the manager itself.
struct Shared {
    stats: StatsTable,
    cancel: CancellationToken,
    panics: PanicHandler,
}

impl TaskManager {
    pub fn new(max_workers: usize, queue_size: usize) -> Result<Self> {
        let config = Config::builder()
            .max_workers(max_workers)
            .queue_size(queue_size)
            .build()?;
        Self::with_config(&config)
    }

    pub fn with_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let pool = WorkerPool::new(config)?;
        tracing::info!(
            max_workers = config.max_workers,
            queue_size = config.queue_size,
            "task manager started"
        );

        Ok(Self {
            pool,
            shared: Arc::new(Shared {
                stats: StatsTable::new(),
                cancel: CancellationToken::new(),
                panics: PanicHandler::new(config.panic_strategy),
            }),
        })
    }

    /// Admit a task, blocking while the admission queue is full.
    pub fn submit(&self, task: Task) -> Result<()> {
        self.admit(task, None, None)
    }

    /// Admit a task and get a handle to its eventual outcome.
    pub fn submit_async(&self, task: Task) -> Result<TaskHandle> {
        let (tx, rx) = bounded(1);
        let id = task.id().to_string();
        self.admit(task, Some(tx), None)?;
        Ok(TaskHandle::new(id, rx))
    }

    /// Like [`submit`](Self::submit), but also gives up once `abort` fires.
    pub(crate) fn submit_until(&self, task: Task, abort: &CancellationToken) -> Result<()> {
        self.admit(task, None, Some(abort))
    }

    fn admit(
        &self,
        task: Task,
        notify: Option<Sender<Outcome>>,
        abort: Option<&CancellationToken>,
    ) -> Result<()> {
        if self.is_closed() {
            return Err(Rejection::ShutDown.into());
        }

        let id = task.id().to_string();
        let shared = self.shared.clone();
        let job: Job = Box::new(move || shared.run(task, notify));

        self.pool
            .push(job, self.shared.cancel.receiver(), abort.map(|t| t.receiver()))
            .map_err(|rejection| {
                tracing::debug!(task_id = %id, %rejection, "task not admitted");
                Error::from(rejection)
            })
    }

    pub fn get_stats(&self, id: &str) -> Option<TaskStats> {
        self.shared.stats.get(id)
    }

    pub fn get_all_stats(&self) -> HashMap<String, TaskStats> {
        self.shared.stats.snapshot()
    }

    /// Signal cancellation and stop admitting. Admitted tasks keep running.
    pub fn shutdown(&self) {
        if !self.shared.cancel.cancel() {
            return;
        }

        tracing::info!("shutting down task manager");
        self.pool.close();
        tracing::info!(
            pending = self.pool.pending_tasks(),
            "task manager shut down"
        );
    }

    /// Shut down and block until every admitted task has finished.
    pub fn shutdown_and_wait(&self) {
        self.shutdown();
        self.pool.join();
        tracing::debug!(
            executed = self.pool.tasks_executed(),
            "task manager drained"
        );
    }

    pub fn is_closed(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Tasks admitted but not finished yet.
    pub fn pending(&self) -> usize {
        self.pool.pending_tasks()
    }

    pub fn busy_workers(&self) -> usize {
        self.pool.busy_workers()
    }

    pub fn tracked_tasks(&self) -> usize {
        self.shared.stats.len()
    }

    pub fn panic_count(&self) -> usize {
        self.shared.panics.panic_count()
    }

    pub fn max_workers(&self) -> usize {
        self.pool.num_threads()
    }

    pub fn queue_size(&self) -> usize {
        self.pool.capacity()
    }
}

impl Shared {
    // the execution wrapper applied to every admitted task
    fn run(&self, task: Task, notify: Option<Sender<Outcome>>) {
        let (id, name, body) = task.into_parts();
        let span = tracing::info_span!("task", id = %id, name = %name);
        let _entered = span.enter();

        let start = Instant::now();
        tracing::info!("task started");

        let outcome = match self.panics.execute(|| body.execute(&self.cancel)) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TaskError::Failed(format!("{e:#}"))),
            Err(panic) => Err(TaskError::Panicked(panic.message)),
        };

        self.stats
            .record(&id, outcome.as_ref().err().map(ToString::to_string));

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &outcome {
            Ok(()) => tracing::info!(elapsed_ms, "task succeeded"),
            Err(e) => tracing::error!(elapsed_ms, error = %e, "task failed"),
        }

        if let Some(tx) = notify {
            let _ = tx.send(outcome);
        }
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.shutdown_and_wait();
    }
}

impl std::fmt::Debug for TaskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskManager")
            .field("pool", &self.pool)
            .field("closed", &self.is_closed())
            .finish()
    }
}
