use super::worker::{Job, Worker, WorkerId, WorkerState};
use crate::config::Config;
use crate::error::{Error, Rejection, Result};
use crossbeam_channel::{bounded, never, select, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Fixed set of worker threads fed by one bounded admission queue.
pub struct WorkerPool {
    workers: Mutex<Vec<WorkerHandle>>,
    sender: Mutex<Option<Sender<Job>>>,
    states: Vec<Arc<WorkerState>>,
    num_threads: usize,
    capacity: usize,
    pending_tasks: Arc<AtomicIsize>,
}

struct WorkerHandle {
    id: WorkerId,
    thread: Option<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(config: &Config) -> Result<Self> {
        let num_threads = config.max_workers;
        if num_threads == 0 {
            return Err(Error::config("need at least 1 worker"));
        }
        if config.queue_size == 0 {
            return Err(Error::config("need a queue of at least 1 slot"));
        }

        let (sender, queue) = bounded::<Job>(config.queue_size);
        let pending_tasks = Arc::new(AtomicIsize::new(0));

        let mut handles = Vec::with_capacity(num_threads);
        let mut states = Vec::with_capacity(num_threads);

        for id in 0..num_threads {
            let worker = Worker::new(id);
            states.push(worker.state.clone());

            let queue_clone = queue.clone();
            let pending_clone = pending_tasks.clone();
            let name = format!("{}-{}", config.thread_name_prefix, id);

            let mut builder = thread::Builder::new().name(name);

            if let Some(stack_size) = config.stack_size {
                builder = builder.stack_size(stack_size);
            }

            let spawned = builder.spawn(move || {
                worker.run(queue_clone, pending_clone);
            });

            let thread = match spawned {
                Ok(thread) => thread,
                Err(e) => {
                    // let the workers spawned so far exit before bailing
                    drop(sender);
                    for handle in handles {
                        let WorkerHandle { thread, .. } = handle;
                        if let Some(thread) = thread {
                            let _ = thread.join();
                        }
                    }
                    return Err(Error::executor(format!("spawn failed: {}", e)));
                }
            };

            handles.push(WorkerHandle {
                id,
                thread: Some(thread),
            });
        }

        Ok(Self {
            workers: Mutex::new(handles),
            sender: Mutex::new(Some(sender)),
            states,
            num_threads,
            capacity: config.queue_size,
            pending_tasks,
        })
    }

    /// Enqueue a job, blocking while the queue is full.
    ///
    /// Gives up with [`Rejection::ShutDown`] once `shutdown` disconnects and
    /// with [`Rejection::NotRunning`] once `abort` (if any) disconnects.
    pub fn push(
        &self,
        job: Job,
        shutdown: &Receiver<()>,
        abort: Option<&Receiver<()>>,
    ) -> std::result::Result<(), Rejection> {
        let sender = match self.sender.lock().as_ref() {
            Some(sender) => sender.clone(),
            None => return Err(Rejection::ShutDown),
        };
        let idle = never();
        let abort = abort.unwrap_or(&idle);

        let admitted = select! {
            send(sender, job) -> res => res.map_err(|_| Rejection::ShutDown),
            recv(shutdown) -> _ => Err(Rejection::ShutDown),
            recv(abort) -> _ => Err(Rejection::NotRunning),
        };

        // counted only once the job holds a slot; a blocked submitter is not pending
        if admitted.is_ok() {
            self.pending_tasks.fetch_add(1, Ordering::AcqRel);
        }
        admitted
    }

    /// Stop admitting. Workers finish whatever is already queued, then exit.
    pub fn close(&self) {
        self.sender.lock().take();
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Join every worker thread. Only returns once the pool is closed and
    /// drained. A worker calling this skips joining itself.
    pub fn join(&self) {
        let handles: Vec<WorkerHandle> = std::mem::take(&mut *self.workers.lock());
        let current = thread::current().id();

        for mut handle in handles {
            if let Some(thread) = handle.thread.take() {
                if thread.thread().id() == current {
                    continue;
                }
                if thread.join().is_err() {
                    tracing::error!(worker = handle.id, "worker thread panicked");
                }
            }
        }
    }

    /// Jobs admitted but not yet finished (queued or running).
    pub fn pending_tasks(&self) -> usize {
        // a worker can finish a job before its submitter counts it
        self.pending_tasks.load(Ordering::Acquire).max(0) as usize
    }

    pub fn busy_workers(&self) -> usize {
        self.states
            .iter()
            .filter(|s| s.busy.load(Ordering::Acquire))
            .count()
    }

    pub fn tasks_executed(&self) -> u64 {
        self.states
            .iter()
            .map(|s| s.tasks_executed.load(Ordering::Relaxed))
            .sum()
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close();
        self.join();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("num_threads", &self.num_threads)
            .field("capacity", &self.capacity)
            .field("pending_tasks", &self.pending_tasks())
            .finish()
    }
}
