// worker thread stuff
use crossbeam_channel::Receiver;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicU64, Ordering};
use std::sync::Arc;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub type WorkerId = usize;

// stats for each worker
#[derive(Debug)]
pub struct WorkerState {
    pub tasks_executed: AtomicU64,
    pub busy: AtomicBool,
}

impl WorkerState {
    fn new() -> Self {
        Self {
            tasks_executed: AtomicU64::new(0),
            busy: AtomicBool::new(false),
        }
    }
}

pub(crate) struct Worker {
    pub id: WorkerId,
    pub state: Arc<WorkerState>,
}

impl Worker {
    pub fn new(id: WorkerId) -> Self {
        Self {
            id,
            state: Arc::new(WorkerState::new()),
        }
    }

    // main loop, exits once every sender is gone and the queue is drained
    pub fn run(&self, queue: Receiver<Job>, pending: Arc<AtomicIsize>) {
        tracing::debug!(worker = self.id, "worker started");

        for job in queue.iter() {
            self.state.busy.store(true, Ordering::Release);
            self.execute_job(job);
            self.state.busy.store(false, Ordering::Release);
            pending.fetch_sub(1, Ordering::AcqRel);
        }

        tracing::debug!(worker = self.id, "worker exiting");
    }

    fn execute_job(&self, job: Job) {
        // jobs carry their own supervised frame; this one only keeps the
        // thread alive if the bookkeeping around a body panics
        if catch_unwind(AssertUnwindSafe(job)).is_err() {
            tracing::error!(worker = self.id, "job panicked outside task body");
        }

        self.state.tasks_executed.fetch_add(1, Ordering::Relaxed);
    }
}
