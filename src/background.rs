//! Supervised background worker: a fail-fast intake queue in front of a
//! [`TaskManager`], drained by one dispatch thread.

use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::error::{Error, Rejection, Result};
use crate::executor::Task;
use crate::manager::TaskManager;
use crate::samples;
use crossbeam_channel::{bounded, select, tick, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Two-stage execution engine.
///
/// [`submit_task`](Self::submit_task) never blocks: it either places the task
/// in the intake queue or fails with [`Rejection::QueueFull`] /
/// [`Rejection::NotRunning`]. The dispatch thread moves intake items into the
/// manager, whose own admission queue applies blocking backpressure.
///
/// [`stop`](Self::stop) is synchronous: when it returns the dispatch thread
/// has exited and every task that reached the manager has finished.
/// A stopped worker can be started again; each run gets a fresh manager.
pub struct BackgroundWorker {
    inner: Arc<Inner>,
}

struct Inner {
    config: Config,
    lifecycle: Mutex<Lifecycle>,
    // held for a whole stop, so concurrent stops and starts wait for the drain
    transition: Mutex<()>,
}

struct Lifecycle {
    manager: Arc<TaskManager>,
    intake_tx: Option<Sender<Task>>,
    intake_rx: Receiver<Task>,
    cancel: CancellationToken,
    running: bool,
    dispatcher: Option<JoinHandle<()>>,
    producers: Vec<JoinHandle<()>>,
}

impl Lifecycle {
    fn fresh(config: &Config) -> Result<Self> {
        let (intake_tx, intake_rx) = bounded(config.queue_size);
        Ok(Self {
            manager: Arc::new(TaskManager::with_config(config)?),
            intake_tx: Some(intake_tx),
            intake_rx,
            cancel: CancellationToken::new(),
            running: false,
            dispatcher: None,
            producers: Vec::new(),
        })
    }
}

impl BackgroundWorker {
    pub fn new(max_workers: usize, queue_size: usize) -> Result<Self> {
        let config = Config::builder()
            .max_workers(max_workers)
            .queue_size(queue_size)
            .build()?;
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        let lifecycle = Lifecycle::fresh(&config)?;

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                lifecycle: Mutex::new(lifecycle),
                transition: Mutex::new(()),
            }),
        })
    }

    /// Launch the dispatch thread. No-op while already running.
    pub fn start(&self) -> Result<()> {
        let _transition = self.inner.transition.lock();
        let mut lc = self.inner.lifecycle.lock();
        if lc.running {
            return Ok(());
        }

        // a previous run consumed the manager and the intake queue
        if lc.cancel.is_cancelled() {
            *lc = Lifecycle::fresh(&self.inner.config)?;
        }

        let intake = lc.intake_rx.clone();
        let manager = lc.manager.clone();
        let cancel = lc.cancel.clone();

        let dispatcher = thread::Builder::new()
            .name(format!("{}-dispatch", self.inner.config.thread_name_prefix))
            .spawn(move || dispatch_loop(intake, manager, cancel))
            .map_err(|e| Error::executor(format!("spawn failed: {}", e)))?;

        lc.dispatcher = Some(dispatcher);
        lc.running = true;

        tracing::info!("background worker started");
        Ok(())
    }

    /// Stop dispatching, then shut down and drain the manager.
    ///
    /// Tasks still waiting in the intake queue are discarded.
    /// A caller racing an in-flight stop waits for it to finish.
    pub fn stop(&self) {
        let _transition = self.inner.transition.lock();
        let (manager, intake, dispatcher, producers) = {
            let mut lc = self.inner.lifecycle.lock();
            if !lc.running {
                return;
            }
            lc.running = false;
            lc.cancel.cancel();
            lc.intake_tx.take();
            (
                lc.manager.clone(),
                lc.intake_rx.clone(),
                lc.dispatcher.take(),
                std::mem::take(&mut lc.producers),
            )
        };

        // producers submit through the lifecycle lock, so join outside it
        if let Some(handle) = dispatcher {
            if handle.join().is_err() {
                tracing::error!("dispatch thread panicked");
            }
        }
        for handle in producers {
            let _ = handle.join();
        }

        let discarded = intake.try_iter().count();
        if discarded > 0 {
            tracing::warn!(discarded, "dropped tasks left in intake queue");
        }

        manager.shutdown_and_wait();
        tracing::info!("background worker stopped");
    }

    /// Enqueue without blocking.
    pub fn submit_task(&self, task: Task) -> Result<()> {
        self.inner.submit_task(task)
    }

    /// Submit a fixed batch of sample tasks, then keep producing one more
    /// every `sample_interval` until the worker stops.
    pub fn submit_sample_tasks(&self) -> Result<()> {
        let initial = [
            samples::process_order_task("bg-001"),
            samples::process_order_task("bg-002"),
            samples::process_refund_task("bg-refund-001"),
        ];

        for task in initial {
            let id = task.id().to_string();
            match self.submit_task(task) {
                Ok(()) => tracing::info!(task_id = %id, "sample task submitted"),
                Err(e) => tracing::warn!(task_id = %id, error = %e, "sample task rejected"),
            }
        }

        let mut lc = self.inner.lifecycle.lock();
        if !lc.running {
            return Err(Rejection::NotRunning.into());
        }

        let inner = self.inner.clone();
        let cancel = lc.cancel.clone();
        let initial_count = 3;

        let producer = thread::Builder::new()
            .name(format!("{}-samples", self.inner.config.thread_name_prefix))
            .spawn(move || {
                let ticker = tick(inner.config.sample_interval);
                let mut counter = initial_count;

                loop {
                    select! {
                        recv(ticker) -> _ => {
                            counter += 1;
                            let task = samples::process_order_task(&format!("bg-timed-{counter}"));
                            let id = task.id().to_string();
                            match inner.submit_task(task) {
                                Ok(()) => tracing::info!(task_id = %id, "timed task submitted"),
                                Err(e) => tracing::warn!(task_id = %id, error = %e, "timed task rejected"),
                            }
                        },
                        recv(cancel.receiver()) -> _ => return,
                    }
                }
            })
            .map_err(|e| Error::executor(format!("spawn failed: {}", e)))?;

        lc.producers.push(producer);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.inner.lifecycle.lock().running
    }

    /// Manager of the current (or most recent) run.
    pub fn manager(&self) -> Arc<TaskManager> {
        self.inner.lifecycle.lock().manager.clone()
    }

    /// Tasks waiting in the intake queue.
    pub fn queued(&self) -> usize {
        self.inner.lifecycle.lock().intake_rx.len()
    }
}

impl Inner {
    fn submit_task(&self, task: Task) -> Result<()> {
        let lc = self.lifecycle.lock();
        let intake = match (&lc.intake_tx, lc.running) {
            (Some(tx), true) => tx,
            _ => return Err(Rejection::NotRunning.into()),
        };

        match intake.try_send(task) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(Rejection::QueueFull.into()),
            Err(TrySendError::Disconnected(_)) => Err(Rejection::NotRunning.into()),
        }
    }
}

fn dispatch_loop(intake: Receiver<Task>, manager: Arc<TaskManager>, cancel: CancellationToken) {
    tracing::debug!("dispatch loop started");

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let next = select! {
            recv(intake) -> msg => msg.ok(),
            recv(cancel.receiver()) -> _ => None,
        };
        let task = match next {
            Some(task) => task,
            None => break,
        };

        let id = task.id().to_string();
        if let Err(e) = manager.submit_until(task, &cancel) {
            tracing::warn!(task_id = %id, error = %e, "failed to forward task");
        }
    }

    tracing::debug!("dispatch loop exited");
}

impl Drop for BackgroundWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for BackgroundWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundWorker")
            .field("running", &self.is_running())
            .field("queued", &self.queued())
            .finish()
    }
}
