/// CommandQueue - ordered hand-off of commands to the driver thread
///
/// Any number of producer threads enqueue commands; exactly one worker thread,
/// which owns the `Driver`, executes them in submission order. The queue is
/// unbounded: producers never wait for the worker except through
/// `enqueue_blocking`.
///
/// Producers can bracket several enqueues with `lock_producers()` so that no
/// other producer interleaves commands between them. The worker never takes
/// that lock, so it keeps draining already-queued commands meanwhile.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};
use parking_lot::{Condvar, Mutex, MutexGuard, ReentrantMutex, ReentrantMutexGuard};

use crate::command::{Command, FnCommand};
use crate::config::BridgeConfig;
use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::{engine_debug, engine_error, engine_trace, engine_warn, engine_bail_warn};

const SOURCE: &str = "retro3d::CommandQueue";

// ===== STATISTICS =====

/// Counters maintained by the worker thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Commands that ran to completion
    pub commands_executed: u64,
    /// Sum of the costs reported by executed commands
    pub total_cost: u64,
    /// Commands that panicked (caught; the worker kept going)
    pub commands_panicked: u64,
}

// ===== SHARED STATE =====

struct QueueState {
    pending: VecDeque<Box<dyn Command>>,
    accepting: bool,
    quit: bool,
}

struct QueueShared {
    state: Mutex<QueueState>,
    work_available: Condvar,
    finished: Mutex<bool>,
    finished_cond: Condvar,
    producers: ReentrantMutex<()>,
    worker_thread: OnceLock<ThreadId>,
    executed: AtomicU64,
    total_cost: AtomicU64,
    panicked: AtomicU64,
}

impl QueueShared {
    fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                accepting: true,
                quit: false,
            }),
            work_available: Condvar::new(),
            finished: Mutex::new(false),
            finished_cond: Condvar::new(),
            producers: ReentrantMutex::new(()),
            worker_thread: OnceLock::new(),
            executed: AtomicU64::new(0),
            total_cost: AtomicU64::new(0),
            panicked: AtomicU64::new(0),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock()
    }

    /// Append a command at the tail and wake the worker
    fn push(&self, command: Box<dyn Command>) -> Result<()> {
        let mut state = self.lock_state();
        if !state.accepting {
            drop(state);
            engine_warn!(SOURCE, "Dropping '{}': queue no longer accepts commands", command.name());
            return Err(Error::QueueClosed);
        }
        state.pending.push_back(command);
        drop(state);

        self.work_available.notify_one();
        Ok(())
    }

    fn request_quit(&self) {
        let mut state = self.lock_state();
        state.accepting = false;
        state.quit = true;
        drop(state);
        self.work_available.notify_all();
    }

    /// Called when the worker loop exits, normally or not
    fn mark_finished(&self) {
        let abandoned: Vec<Box<dyn Command>> = {
            let mut state = self.lock_state();
            state.accepting = false;
            state.pending.drain(..).collect()
        };
        if !abandoned.is_empty() {
            engine_error!(SOURCE, "Worker exited with {} unexecuted command(s)", abandoned.len());
        }
        // Dropping outside the state lock releases blocked producers and
        // pending-update tokens held by the abandoned commands.
        drop(abandoned);

        *self.finished.lock() = true;
        self.finished_cond.notify_all();
    }

    fn is_finished(&self) -> bool {
        *self.finished.lock()
    }

    fn wait_finished(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut finished = self.finished.lock();
        while !*finished {
            if self.finished_cond.wait_until(&mut finished, deadline).timed_out() {
                return *finished;
            }
        }
        true
    }
}

/// Marks the queue finished when the worker loop unwinds or returns
struct WorkerExitGuard<'a>(&'a QueueShared);

impl Drop for WorkerExitGuard<'_> {
    fn drop(&mut self) {
        self.0.mark_finished();
    }
}

// ===== BLOCKING SUPPORT =====

/// One-shot completion flag: `Some(true)` executed, `Some(false)` dropped unexecuted
struct Completion {
    outcome: Mutex<Option<bool>>,
    signalled: Condvar,
}

impl Completion {
    fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            signalled: Condvar::new(),
        }
    }

    fn signal(&self, executed: bool) {
        *self.outcome.lock() = Some(executed);
        self.signalled.notify_all();
    }

    fn wait(&self) -> bool {
        let mut outcome = self.outcome.lock();
        loop {
            if let Some(executed) = *outcome {
                return executed;
            }
            self.signalled.wait(&mut outcome);
        }
    }
}

/// Wraps a command and signals its completion, even if it panics or is dropped
struct BlockingCommand {
    inner: Option<Box<dyn Command>>,
    name: &'static str,
    executed: bool,
    completion: Arc<Completion>,
}

impl Command for BlockingCommand {
    fn name(&self) -> &'static str {
        self.name
    }

    fn execute(mut self: Box<Self>, driver: &mut dyn Driver) -> usize {
        let cost = match self.inner.take() {
            Some(inner) => inner.execute(driver),
            None => 0,
        };
        self.executed = true;
        cost
    }
}

impl Drop for BlockingCommand {
    fn drop(&mut self) {
        self.completion.signal(self.executed);
    }
}

// ===== PRODUCER LOCK =====

/// Coarse producer-side lock, see [`CommandQueue::lock_producers`]
///
/// Reentrant: the owning thread may lock again (or call
/// `CommandQueue::enqueue`) while holding it. Released on drop.
pub struct ProducerLock<'a> {
    queue: &'a CommandQueue,
    _guard: ReentrantMutexGuard<'a, ()>,
}

impl ProducerLock<'_> {
    /// Enqueue while keeping the lock
    pub fn enqueue<C: Command + 'static>(&self, command: C) -> Result<()> {
        self.queue.shared.push(Box::new(command))
    }

    /// Enqueue the last command of the transaction and release the lock
    pub fn enqueue_and_unlock<C: Command + 'static>(self, command: C) -> Result<()> {
        let result = self.enqueue(command);
        drop(self);
        result
    }
}

// ===== COMMAND QUEUE =====

/// Multi-producer, single-consumer command queue bound to one worker thread
pub struct CommandQueue {
    shared: Arc<QueueShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    shutdown_timeout: Duration,
}

impl CommandQueue {
    /// Spawn the worker thread and move `driver` into it
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailed` if the thread cannot be created.
    pub fn spawn<D: Driver + 'static>(driver: D, config: &BridgeConfig) -> Result<Self> {
        let shared = Arc::new(QueueShared::new());
        let worker_shared = Arc::clone(&shared);

        let handle = thread::Builder::new()
            .name(config.worker_thread_name.clone())
            .stack_size(config.worker_stack_size)
            .spawn(move || {
                let mut driver = driver;
                Self::run(&worker_shared, &mut driver);
            })
            .map_err(|e| {
                engine_error!(SOURCE, "Failed to create worker thread '{}': {}", config.worker_thread_name, e);
                Error::InitializationFailed(format!("Failed to create worker thread: {}", e))
            })?;

        let _ = shared.worker_thread.set(handle.thread().id());
        engine_debug!(SOURCE, "Spawned worker thread '{}'", config.worker_thread_name);

        Ok(Self {
            shared,
            worker: Mutex::new(Some(handle)),
            shutdown_timeout: config.shutdown_timeout,
        })
    }

    /// Worker loop: pop the head, execute it, repeat until asked to quit
    /// and the queue is drained
    fn run(shared: &QueueShared, driver: &mut dyn Driver) {
        let _ = shared.worker_thread.set(thread::current().id());
        let _exit = WorkerExitGuard(shared);
        engine_debug!(SOURCE, "Worker started (driver: {})", driver.name());

        loop {
            let command = {
                let mut state = shared.lock_state();
                loop {
                    if let Some(command) = state.pending.pop_front() {
                        break Some(command);
                    }
                    if state.quit {
                        break None;
                    }
                    shared.work_available.wait(&mut state);
                }
            };
            let Some(command) = command else {
                break;
            };

            let name = command.name();
            match panic::catch_unwind(AssertUnwindSafe(|| command.execute(driver))) {
                Ok(cost) => {
                    shared.executed.fetch_add(1, Ordering::Relaxed);
                    shared.total_cost.fetch_add(cost as u64, Ordering::Relaxed);
                    engine_trace!(SOURCE, "Executed '{}' (cost {})", name, cost);
                }
                Err(_) => {
                    shared.panicked.fetch_add(1, Ordering::Relaxed);
                    engine_error!(SOURCE, "Command '{}' panicked; continuing with the next command", name);
                }
            }
        }

        engine_debug!(SOURCE, "Worker drained and stopped");
    }

    /// Append a command; returns without waiting for it to execute
    ///
    /// # Errors
    ///
    /// Returns `QueueClosed` after shutdown began; the command is dropped.
    pub fn enqueue<C: Command + 'static>(&self, command: C) -> Result<()> {
        let _producer = self.shared.producers.lock();
        self.shared.push(Box::new(command))
    }

    /// Append a command and block until it has executed
    ///
    /// # Errors
    ///
    /// - `InvalidCall` when called from the worker thread (it would wait on itself)
    /// - `QueueClosed` if the queue no longer accepts commands
    /// - `BackendError` if the command panicked or was dropped unexecuted
    pub fn enqueue_blocking<C: Command + 'static>(&self, command: C) -> Result<()> {
        let name = command.name();
        if self.is_worker_thread() {
            engine_bail_warn!(SOURCE, "enqueue_blocking('{}') called from the worker thread", name);
        }

        let completion = Arc::new(Completion::new());
        let blocking = BlockingCommand {
            inner: Some(Box::new(command)),
            name,
            executed: false,
            completion: Arc::clone(&completion),
        };

        {
            let _producer = self.shared.producers.lock();
            self.shared.push(Box::new(blocking))?;
        }

        if completion.wait() {
            Ok(())
        } else {
            engine_error!(SOURCE, "Blocking command '{}' did not complete", name);
            Err(Error::BackendError(format!("Command '{}' did not complete", name)))
        }
    }

    /// Block until every command enqueued so far has executed
    pub fn flush(&self) -> Result<()> {
        self.enqueue_blocking(FnCommand::new("Flush", |_driver: &mut dyn Driver| {}))
    }

    /// Take the producer lock to enqueue several commands as one transaction
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use retro3d_bridge::retro3d::command::{CommandQueue, FnCommand};
    /// # use retro3d_bridge::retro3d::driver::Driver;
    /// # fn demo(queue: &CommandQueue) -> retro3d_bridge::retro3d::Result<()> {
    /// let producer = queue.lock_producers();
    /// producer.enqueue(FnCommand::new("First", |_: &mut dyn Driver| {}))?;
    /// producer.enqueue_and_unlock(FnCommand::new("Second", |_: &mut dyn Driver| {}))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn lock_producers(&self) -> ProducerLock<'_> {
        ProducerLock {
            queue: self,
            _guard: self.shared.producers.lock(),
        }
    }

    /// Stop accepting commands, let the worker drain the queue, and join it
    ///
    /// Waits at most the configured shutdown timeout; on timeout the worker
    /// is detached and an error is logged. Returns whether the worker
    /// finished. Idempotent.
    pub fn shutdown(&self) -> bool {
        let handle = self.worker.lock().take();
        let Some(handle) = handle else {
            return self.shared.is_finished();
        };

        self.shared.request_quit();

        if handle.thread().id() == thread::current().id() {
            // Dropped from one of its own commands: the loop exits after
            // draining, nobody can join it here.
            engine_warn!(SOURCE, "Shutdown requested from the worker thread; detaching");
            return false;
        }

        if !self.shared.wait_finished(self.shutdown_timeout) {
            engine_error!(SOURCE, "Worker did not finish within {:?}; detaching", self.shutdown_timeout);
            return false;
        }

        if handle.join().is_err() {
            engine_error!(SOURCE, "Worker thread panicked while shutting down");
        }
        engine_debug!(SOURCE, "Queue shut down");
        true
    }

    /// Whether the worker thread is still consuming commands
    pub fn is_running(&self) -> bool {
        !self.shared.is_finished()
    }

    /// Whether the caller is the worker thread
    pub fn is_worker_thread(&self) -> bool {
        self.shared.worker_thread.get() == Some(&thread::current().id())
    }

    /// Number of commands waiting to be executed (excludes the running one)
    pub fn pending_count(&self) -> usize {
        self.shared.lock_state().pending.len()
    }

    /// Counters accumulated by the worker so far
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            commands_executed: self.shared.executed.load(Ordering::Relaxed),
            total_cost: self.shared.total_cost.load(Ordering::Relaxed),
            commands_panicked: self.shared.panicked.load(Ordering::Relaxed),
        }
    }
}

impl Drop for CommandQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "command_queue_tests.rs"]
mod tests;
