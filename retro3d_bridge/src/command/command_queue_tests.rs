use super::*;
use crate::driver::{BufferId, DriverCall, DriverUsageHint, RecordingDriver};
use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::sync::Mutex;

// ============================================================================
// TEST HELPERS
// ============================================================================

fn spawn_queue() -> (CommandQueue, RecordingDriver) {
    let driver = RecordingDriver::new();
    let probe = driver.clone();
    let queue = CommandQueue::spawn(driver, &BridgeConfig::default()).unwrap();
    (queue, probe)
}

fn push_value(log: &Arc<Mutex<Vec<u32>>>, value: u32) -> FnCommand<impl FnOnce(&mut dyn Driver) + Send> {
    let log = Arc::clone(log);
    FnCommand::new("PushValue", move |_driver: &mut dyn Driver| {
        log.lock().unwrap().push(value);
    })
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

// ============================================================================
// ORDERING
// ============================================================================

#[test]
fn test_commands_execute_in_submission_order() {
    let (queue, _driver) = spawn_queue();
    let log = Arc::new(Mutex::new(Vec::new()));

    for i in 0..100 {
        queue.enqueue(push_value(&log, i)).unwrap();
    }
    queue.flush().unwrap();

    assert_eq!(*log.lock().unwrap(), (0..100).collect::<Vec<_>>());
}

#[test]
fn test_each_producer_keeps_its_own_order() {
    let (queue, _driver) = spawn_queue();
    let log = Arc::new(Mutex::new(Vec::new()));

    thread::scope(|scope| {
        for producer in 0..4u32 {
            let queue = &queue;
            let log = &log;
            scope.spawn(move || {
                for i in 0..50u32 {
                    queue.enqueue(push_value(log, producer * 1000 + i)).unwrap();
                }
            });
        }
    });
    queue.flush().unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 200);
    for producer in 0..4u32 {
        let seen: Vec<u32> = log.iter()
            .copied()
            .filter(|v| v / 1000 == producer)
            .collect();
        assert_eq!(seen, (0..50).map(|i| producer * 1000 + i).collect::<Vec<_>>());
    }
}

#[test]
fn test_driver_calls_follow_queue_order() {
    let (queue, driver) = spawn_queue();

    queue.enqueue(FnCommand::new("Create", |driver: &mut dyn Driver| {
        let id = driver.create_buffer().unwrap();
        driver.upload_full(id, 4, Some(&[1, 2, 3, 4]), DriverUsageHint::Stream).unwrap();
        driver.delete_buffer(id).unwrap();
    })).unwrap();
    queue.flush().unwrap();

    let calls = driver.calls();
    assert_eq!(calls.len(), 3);
    assert!(matches!(calls[0], DriverCall::CreateBuffer { .. }));
    assert!(matches!(calls[1], DriverCall::UploadFull { size: 4, with_data: true, .. }));
    assert!(matches!(calls[2], DriverCall::DeleteBuffer { .. }));
}

// ============================================================================
// BLOCKING SUBMISSION
// ============================================================================

#[test]
fn test_enqueue_blocking_returns_after_execution() {
    let (queue, _driver) = spawn_queue();
    let done = Arc::new(AtomicBool::new(false));

    let flag = Arc::clone(&done);
    queue.enqueue_blocking(FnCommand::new("Slow", move |_driver: &mut dyn Driver| {
        thread::sleep(Duration::from_millis(20));
        flag.store(true, Ordering::SeqCst);
    })).unwrap();

    assert!(done.load(Ordering::SeqCst));
}

#[test]
fn test_enqueue_blocking_from_worker_is_refused() {
    let (queue, _driver) = spawn_queue();
    let queue = Arc::new(queue);
    let outcome = Arc::new(Mutex::new(None));

    let inner_queue = Arc::clone(&queue);
    let inner_outcome = Arc::clone(&outcome);
    queue.enqueue(FnCommand::new("Nested", move |_driver: &mut dyn Driver| {
        let on_worker = inner_queue.is_worker_thread();
        let result = inner_queue.enqueue_blocking(FnCommand::new("Inner", |_: &mut dyn Driver| {}));
        *inner_outcome.lock().unwrap() = Some((on_worker, result));
    })).unwrap();
    queue.flush().unwrap();

    let (on_worker, result) = outcome.lock().unwrap().take().unwrap();
    assert!(on_worker);
    assert!(matches!(result, Err(Error::InvalidCall(_))));
    assert!(!queue.is_worker_thread());
}

#[test]
fn test_enqueue_blocking_reports_panicking_command() {
    let (queue, _driver) = spawn_queue();

    let result = queue.enqueue_blocking(FnCommand::new("Boom", |_: &mut dyn Driver| {
        panic!("command failure");
    }));

    assert!(matches!(result, Err(Error::BackendError(_))));
    assert!(queue.is_running());
}

// ============================================================================
// PRODUCER LOCK
// ============================================================================

#[test]
fn test_producer_lock_keeps_transaction_contiguous() {
    let (queue, _driver) = spawn_queue();
    let log = Arc::new(Mutex::new(Vec::new()));
    let other_started = Arc::new(AtomicBool::new(false));

    thread::scope(|scope| {
        let producer = queue.lock_producers();
        producer.enqueue(push_value(&log, 1)).unwrap();

        let queue = &queue;
        let log_b = Arc::clone(&log);
        let started = Arc::clone(&other_started);
        scope.spawn(move || {
            started.store(true, Ordering::SeqCst);
            queue.enqueue(push_value(&log_b, 99)).unwrap();
        });

        assert!(wait_until(|| other_started.load(Ordering::SeqCst)));
        thread::sleep(Duration::from_millis(30));
        producer.enqueue(push_value(&log, 2)).unwrap();
        producer.enqueue_and_unlock(push_value(&log, 3)).unwrap();
    });
    queue.flush().unwrap();

    assert_eq!(*log.lock().unwrap(), vec![1, 2, 3, 99]);
}

#[test]
fn test_producer_lock_is_reentrant() {
    let (queue, _driver) = spawn_queue();
    let log = Arc::new(Mutex::new(Vec::new()));

    let outer = queue.lock_producers();
    outer.enqueue(push_value(&log, 1)).unwrap();
    {
        let inner = queue.lock_producers();
        inner.enqueue(push_value(&log, 2)).unwrap();
        queue.enqueue(push_value(&log, 3)).unwrap();
    }
    outer.enqueue_and_unlock(push_value(&log, 4)).unwrap();
    queue.flush().unwrap();

    assert_eq!(*log.lock().unwrap(), vec![1, 2, 3, 4]);
}

#[test]
fn test_worker_drains_while_producers_are_locked() {
    let (queue, _driver) = spawn_queue();
    let ran = Arc::new(AtomicBool::new(false));

    let producer = queue.lock_producers();
    let flag = Arc::clone(&ran);
    producer.enqueue(FnCommand::new("Mark", move |_: &mut dyn Driver| {
        flag.store(true, Ordering::SeqCst);
    })).unwrap();

    assert!(wait_until(|| ran.load(Ordering::SeqCst)));
    drop(producer);
}

// ============================================================================
// SHUTDOWN
// ============================================================================

#[test]
fn test_shutdown_drains_pending_commands() {
    let (queue, _driver) = spawn_queue();
    let count = Arc::new(AtomicUsize::new(0));

    for _ in 0..10 {
        let count = Arc::clone(&count);
        queue.enqueue(FnCommand::new("Sleep", move |_: &mut dyn Driver| {
            thread::sleep(Duration::from_millis(2));
            count.fetch_add(1, Ordering::SeqCst);
        })).unwrap();
    }

    assert!(queue.shutdown());
    assert_eq!(count.load(Ordering::SeqCst), 10);
    assert!(!queue.is_running());
    assert_eq!(queue.pending_count(), 0);
}

#[test]
fn test_enqueue_after_shutdown_fails() {
    let (queue, _driver) = spawn_queue();
    assert!(queue.shutdown());

    let result = queue.enqueue(FnCommand::new("Late", |_: &mut dyn Driver| {}));
    assert_eq!(result, Err(Error::QueueClosed));

    let result = queue.enqueue_blocking(FnCommand::new("LateBlocking", |_: &mut dyn Driver| {}));
    assert_eq!(result, Err(Error::QueueClosed));
}

#[test]
fn test_shutdown_is_idempotent() {
    let (queue, _driver) = spawn_queue();
    assert!(queue.shutdown());
    assert!(queue.shutdown());
}

#[test]
fn test_shutdown_times_out_on_stuck_worker() {
    let driver = RecordingDriver::new();
    let probe = driver.clone();
    let config = BridgeConfig {
        shutdown_timeout: Duration::from_millis(50),
        ..BridgeConfig::default()
    };
    let queue = CommandQueue::spawn(driver, &config).unwrap();

    probe.pause();
    queue.enqueue(FnCommand::new("Stuck", |driver: &mut dyn Driver| {
        let _ = driver.create_buffer();
    })).unwrap();

    assert!(!queue.shutdown());
    assert!(queue.is_running());

    probe.resume();
    assert!(wait_until(|| !queue.is_running()));
    assert_eq!(probe.live_buffer_count(), 1);
}

#[test]
fn test_driver_is_dropped_on_shutdown() {
    struct DropProbe(Arc<AtomicBool>);

    impl Drop for DropProbe {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    struct ProbedDriver {
        inner: RecordingDriver,
        _probe: DropProbe,
    }

    impl Driver for ProbedDriver {
        fn name(&self) -> &str { "probed" }
        fn create_buffer(&mut self) -> Result<BufferId> { self.inner.create_buffer() }
        fn upload_full(&mut self, id: BufferId, size: usize, data: Option<&[u8]>, hint: DriverUsageHint) -> Result<()> {
            self.inner.upload_full(id, size, data, hint)
        }
        fn upload_sub_range(&mut self, id: BufferId, offset: usize, data: &[u8]) -> Result<()> {
            self.inner.upload_sub_range(id, offset, data)
        }
        fn delete_buffer(&mut self, id: BufferId) -> Result<()> { self.inner.delete_buffer(id) }
    }

    let dropped = Arc::new(AtomicBool::new(false));
    let driver = ProbedDriver {
        inner: RecordingDriver::new(),
        _probe: DropProbe(Arc::clone(&dropped)),
    };
    let queue = CommandQueue::spawn(driver, &BridgeConfig::default()).unwrap();
    assert!(!dropped.load(Ordering::SeqCst));

    drop(queue);
    assert!(dropped.load(Ordering::SeqCst));
}

// ============================================================================
// WORKER THREAD
// ============================================================================

#[test]
fn test_panicking_command_does_not_stop_worker() {
    let (queue, _driver) = spawn_queue();
    let log = Arc::new(Mutex::new(Vec::new()));

    queue.enqueue(FnCommand::new("Boom", |_: &mut dyn Driver| {
        panic!("command failure");
    })).unwrap();
    queue.enqueue(push_value(&log, 7)).unwrap();
    queue.flush().unwrap();

    assert_eq!(*log.lock().unwrap(), vec![7]);
    assert_eq!(queue.stats().commands_panicked, 1);
    assert!(queue.is_running());
}

#[test]
fn test_worker_thread_uses_configured_name() {
    let driver = RecordingDriver::new();
    let config = BridgeConfig {
        worker_thread_name: "retro3d-test-worker".to_string(),
        ..BridgeConfig::default()
    };
    let queue = CommandQueue::spawn(driver, &config).unwrap();
    let name = Arc::new(Mutex::new(None));

    let seen = Arc::clone(&name);
    queue.enqueue_blocking(FnCommand::new("Name", move |_: &mut dyn Driver| {
        *seen.lock().unwrap() = thread::current().name().map(str::to_string);
    })).unwrap();

    assert_eq!(name.lock().unwrap().as_deref(), Some("retro3d-test-worker"));
}

#[test]
fn test_pending_count_tracks_backlog() {
    let (queue, driver) = spawn_queue();
    driver.pause();

    queue.enqueue(FnCommand::new("Blocked", |driver: &mut dyn Driver| {
        let _ = driver.create_buffer();
    })).unwrap();
    for _ in 0..3 {
        queue.enqueue(FnCommand::new("Noop", |_: &mut dyn Driver| {})).unwrap();
    }

    assert!(wait_until(|| queue.pending_count() == 3));

    driver.resume();
    queue.flush().unwrap();
    assert_eq!(queue.pending_count(), 0);
}

#[test]
fn test_stats_count_executed_commands() {
    let (queue, _driver) = spawn_queue();

    for _ in 0..5 {
        queue.enqueue(FnCommand::new("Noop", |_: &mut dyn Driver| {})).unwrap();
    }
    queue.flush().unwrap();

    let stats = queue.stats();
    // Five no-ops plus the flush fence
    assert_eq!(stats.commands_executed, 6);
    assert!(stats.total_cost > 0);
    assert_eq!(stats.commands_panicked, 0);
}
