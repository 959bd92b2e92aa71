//! Sample order-processing tasks used by the CLI and by
//! [`BackgroundWorker::submit_sample_tasks`](crate::BackgroundWorker::submit_sample_tasks).

use crate::cancel::CancellationToken;
use crate::executor::Task;
use std::time::Duration;

pub const ORDER_PROCESSING_TIME: Duration = Duration::from_secs(2);
pub const REFUND_PROCESSING_TIME: Duration = Duration::from_secs(3);

/// Task with id `order_<order_id>`.
pub fn process_order_task(order_id: &str) -> Task {
    simulated("order", order_id, "process order", ORDER_PROCESSING_TIME)
}

/// Task with id `refund_<refund_id>`.
pub fn process_refund_task(refund_id: &str) -> Task {
    simulated("refund", refund_id, "process refund", REFUND_PROCESSING_TIME)
}

// Sleeps for `work`, bailing out early if the manager shuts down meanwhile.
pub(crate) fn simulated(kind: &'static str, key: &str, name: &str, work: Duration) -> Task {
    let key = key.to_string();
    let id = format!("{kind}_{key}");

    Task::new(id, name, move |cancel: &CancellationToken| {
        tracing::debug!(kind, key = %key, "processing started");

        if cancel.wait_timeout(work) {
            anyhow::bail!("{kind} {key} interrupted by shutdown");
        }

        tracing::debug!(kind, key = %key, "processing finished");
        Ok(())
    })
}
