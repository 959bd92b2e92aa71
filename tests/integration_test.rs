use taskpool::prelude::*;

use crossbeam_channel::{bounded, Receiver};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn sleepy(id: impl Into<String>, ms: u64) -> Task {
    Task::new(id, "sleepy", move |_: &CancellationToken| {
        thread::sleep(Duration::from_millis(ms));
        Ok(())
    })
}

// blocks until the gate sender is dropped; announces itself on `started`
fn gated(id: &str, gate: &Receiver<()>, started: Option<crossbeam_channel::Sender<()>>) -> Task {
    let gate = gate.clone();
    Task::new(id, "gated", move |_: &CancellationToken| {
        if let Some(started) = started {
            let _ = started.send(());
        }
        let _ = gate.recv();
        Ok(())
    })
}

fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn test_orders_all_succeed() {
    let manager = TaskManager::new(3, 10).unwrap();

    for i in 1..=5 {
        manager.submit(sleepy(format!("order_{i}"), 10)).unwrap();
    }
    manager.shutdown_and_wait();

    let stats = manager.get_all_stats();
    assert_eq!(stats.len(), 5);
    for i in 1..=5 {
        let s = &stats[&format!("order_{i}")];
        assert_eq!(s.total_executions, 1);
        assert_eq!(s.success_count, 1);
        assert_eq!(s.error_count, 0);
        assert!(s.last_execution.is_some());
    }
}

#[test]
fn test_failing_task_isolated() {
    let manager = TaskManager::new(4, 16).unwrap();

    let handles: Vec<_> = (0..6)
        .map(|i| manager.submit_async(sleepy(format!("ok_{i}"), 5)).unwrap())
        .collect();
    let failing = manager
        .submit_async(Task::new("refund_bad", "refund", |_: &CancellationToken| {
            anyhow::bail!("payment gateway unavailable")
        }))
        .unwrap();

    assert!(matches!(failing.wait(), Err(TaskError::Failed(_))));
    for h in handles {
        assert_eq!(h.wait(), Ok(()));
    }

    let bad = manager.get_stats("refund_bad").unwrap();
    assert_eq!(bad.error_count, 1);
    assert_eq!(bad.success_count, 0);
    for i in 0..6 {
        let ok = manager.get_stats(&format!("ok_{i}")).unwrap();
        assert_eq!((ok.success_count, ok.error_count), (1, 0));
    }
}

#[test]
fn test_intake_queue_full() {
    let worker = BackgroundWorker::new(1, 1).unwrap();
    let (gate_tx, gate_rx) = bounded::<()>(0);
    let (started_tx, started_rx) = bounded::<()>(1);
    let manager = worker.manager();

    worker.start().unwrap();

    // occupy the only worker thread
    worker
        .submit_task(gated("first", &gate_rx, Some(started_tx)))
        .unwrap();
    started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    // fills the manager's queue
    worker.submit_task(gated("second", &gate_rx, None)).unwrap();
    wait_until(|| worker.queued() == 0 && manager.pending() == 2);

    // held by the dispatcher, blocked in the manager's submit
    worker.submit_task(gated("third", &gate_rx, None)).unwrap();
    wait_until(|| worker.queued() == 0);
    thread::sleep(Duration::from_millis(20));
    assert_eq!(worker.queued(), 0);

    // consumption is stalled: one slot of intake, then fail fast
    worker.submit_task(gated("fourth", &gate_rx, None)).unwrap();
    let start = Instant::now();
    let err = worker.submit_task(gated("fifth", &gate_rx, None)).unwrap_err();
    assert_eq!(err.rejection(), Some(Rejection::QueueFull));
    assert!(start.elapsed() < Duration::from_secs(1));

    drop(gate_tx);
    wait_until(|| manager.get_stats("third").is_some());
    worker.stop();

    for id in ["first", "second", "third"] {
        assert_eq!(manager.get_stats(id).unwrap().success_count, 1, "{id}");
    }
    assert!(manager.get_stats("fifth").is_none());
}

#[test]
fn test_manager_submit_blocks_when_full() {
    let manager = Arc::new(TaskManager::new(1, 1).unwrap());
    let (gate_tx, gate_rx) = bounded::<()>(0);
    let (started_tx, started_rx) = bounded::<()>(1);

    manager.submit(gated("running", &gate_rx, Some(started_tx))).unwrap();
    started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    manager.submit(gated("queued", &gate_rx, None)).unwrap();

    let admitted = Arc::new(AtomicUsize::new(0));
    let submitter = {
        let manager = manager.clone();
        let admitted = admitted.clone();
        thread::spawn(move || {
            manager.submit(sleepy("late", 1)).unwrap();
            admitted.fetch_add(1, Ordering::SeqCst);
        })
    };

    thread::sleep(Duration::from_millis(50));
    assert_eq!(admitted.load(Ordering::SeqCst), 0, "submit should block");

    drop(gate_tx);
    submitter.join().unwrap();
    assert_eq!(admitted.load(Ordering::SeqCst), 1);

    manager.shutdown_and_wait();
    assert_eq!(manager.get_stats("late").unwrap().success_count, 1);
}

#[test]
fn test_idle_manager_admits_queue_size() {
    let manager = TaskManager::new(2, 8).unwrap();
    for i in 0..8 {
        assert!(manager.submit(sleepy(format!("t{i}"), 1)).is_ok());
    }
    manager.shutdown_and_wait();
    assert_eq!(manager.get_all_stats().len(), 8);
}

#[test]
fn test_post_shutdown_rejections() {
    let manager = TaskManager::new(2, 4).unwrap();
    manager.shutdown();

    for i in 0..3 {
        let err = manager.submit(sleepy(format!("x{i}"), 1)).unwrap_err();
        assert_eq!(err.rejection(), Some(Rejection::ShutDown));
    }
    assert!(manager.get_all_stats().is_empty());

    let worker = BackgroundWorker::new(2, 4).unwrap();
    worker.start().unwrap();
    worker.stop();
    let err = worker.submit_task(sleepy("y", 1)).unwrap_err();
    assert_eq!(err.rejection(), Some(Rejection::NotRunning));
    assert!(worker.manager().get_all_stats().is_empty());
}

#[test]
fn test_nothing_starts_after_stop() {
    let worker = BackgroundWorker::new(2, 16).unwrap();
    let started = Arc::new(Mutex::new(Vec::<Instant>::new()));

    worker.start().unwrap();
    for i in 0..16 {
        let started = started.clone();
        let _ = worker.submit_task(Task::new(
            format!("job{i}"),
            "timed",
            move |cancel: &CancellationToken| {
                started.lock().push(Instant::now());
                cancel.wait_timeout(Duration::from_millis(20));
                Ok(())
            },
        ));
    }

    worker.stop();
    let stopped_at = Instant::now();
    let seen = started.lock().len();

    thread::sleep(Duration::from_millis(100));
    assert_eq!(started.lock().len(), seen);
    assert!(started.lock().iter().all(|t| *t <= stopped_at));

    let stats = worker.manager().get_all_stats();
    assert_eq!(stats.len(), seen);
    assert_eq!(worker.manager().pending(), 0);
}

#[test]
fn test_concurrent_producers_keep_invariant() {
    let manager = Arc::new(TaskManager::new(4, 32).unwrap());

    let producers: Vec<_> = (0..4)
        .map(|p| {
            let manager = manager.clone();
            thread::spawn(move || {
                for i in 0..50 {
                    let fail = (i + p) % 4 == 0;
                    let task = Task::new(format!("key{}", i % 5), "mixed", move |_: &CancellationToken| {
                        if fail {
                            anyhow::bail!("planned failure");
                        }
                        Ok(())
                    });
                    manager.submit(task).unwrap();
                }
            })
        })
        .collect();

    for p in producers {
        p.join().unwrap();
    }
    manager.shutdown_and_wait();

    let stats = manager.get_all_stats();
    let total: u64 = stats.values().map(|s| s.total_executions).sum();
    assert_eq!(total, 200);
    for s in stats.values() {
        assert_eq!(s.total_executions, s.success_count + s.error_count);
    }
}

#[test]
fn test_panicking_tasks_do_not_shrink_pool() {
    let manager = TaskManager::new(2, 16).unwrap();

    for i in 0..6 {
        manager
            .submit(Task::new(format!("panic{i}"), "panics", |_: &CancellationToken| -> anyhow::Result<()> {
                panic!("broken task")
            }))
            .unwrap();
    }

    let handles: Vec<_> = (0..4)
        .map(|i| manager.submit_async(sleepy(format!("after{i}"), 1)).unwrap())
        .collect();
    for h in handles {
        assert_eq!(h.wait_timeout(Duration::from_secs(5)), Some(Ok(())));
    }

    assert_eq!(manager.panic_count(), 6);
    assert_eq!(manager.max_workers(), 2);
}

#[test]
fn test_custom_config() {
    let config = Config::builder()
        .max_workers(2)
        .queue_size(4)
        .thread_name_prefix("orders")
        .panic_strategy(PanicStrategy::Isolate)
        .build()
        .unwrap();

    let names = Arc::new(Mutex::new(Vec::new()));
    let manager = TaskManager::with_config(&config).unwrap();
    for i in 0..4 {
        let names = names.clone();
        manager
            .submit(Task::new(format!("n{i}"), "names", move |_: &CancellationToken| {
                names
                    .lock()
                    .push(thread::current().name().unwrap_or_default().to_string());
                Ok(())
            }))
            .unwrap();
    }
    manager.shutdown_and_wait();

    assert_eq!(manager.queue_size(), 4);
    assert!(names.lock().iter().all(|n| n.starts_with("orders-")));
}

#[test]
fn test_sample_producer_stops_with_worker() {
    let config = Config::builder()
        .max_workers(2)
        .queue_size(8)
        .sample_interval(Duration::from_millis(10))
        .build()
        .unwrap();
    let worker = BackgroundWorker::with_config(config).unwrap();
    worker.start().unwrap();
    worker.submit_sample_tasks().unwrap();

    let manager = worker.manager();
    wait_until(|| manager.get_stats("order_bg-timed-4").is_some() || manager.pending() > 0);

    let start = Instant::now();
    worker.stop();
    // sample bodies honour cancellation, so stopping does not wait out their sleep
    assert!(start.elapsed() < Duration::from_secs(2));

    let stats = manager.get_all_stats();
    assert!(stats.contains_key("order_bg-001"));
    for s in stats.values() {
        assert_eq!(s.total_executions, s.success_count + s.error_count);
    }
}
