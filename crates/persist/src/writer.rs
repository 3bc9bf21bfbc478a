//! The asynchronous half of the store: command queue plus the single
//! persistence worker thread that drains it.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crate::command::Command;
use crate::error::{Result, StoreError};
use crate::queue::BoundedQueue;
use crate::store::Store;

/// Lifecycle of the persistence worker.
///
/// `Idle -> Applying -> Idle` per command; `Shutdown` moves it through
/// `Draining` to the terminal `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
    #[default]
    Idle,
    Applying,
    Draining,
    Stopped,
}

/// Counters maintained by the worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Commands taken off the queue and handled, successfully or not.
    pub applied: u64,
    /// Statements that failed and were skipped.
    pub failed: u64,
    /// Transactions committed by `Commit` or `Shutdown`.
    pub commits: u64,
}

#[derive(Debug, Default)]
struct ProgressInner {
    state: WorkerState,
    stats: WriterStats,
}

/// Worker progress shared with producers, so a caller can wait until a
/// given queue ticket has been handled.
#[derive(Debug, Default)]
struct Progress {
    inner: Mutex<ProgressInner>,
    changed: Condvar,
}

impl Progress {
    fn lock(&self) -> MutexGuard<'_, ProgressInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut ProgressInner)) {
        f(&mut self.lock());
        self.changed.notify_all();
    }

    fn set_state(&self, state: WorkerState) {
        self.update(|p| p.state = state);
    }

    /// Block until ticket `ticket` has been handled or the worker stopped.
    fn wait_for(&self, ticket: u64) -> Result<()> {
        let mut guard = self.lock();
        loop {
            if guard.stats.applied >= ticket {
                return Ok(());
            }
            if guard.state == WorkerState::Stopped {
                return Err(StoreError::WorkerStopped);
            }
            guard = self
                .changed
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Marks the worker stopped however its thread exits, so waiters never
/// hang on a dead worker.
struct StopGuard(Arc<Progress>);

impl Drop for StopGuard {
    fn drop(&mut self) {
        self.0.set_state(WorkerState::Stopped);
    }
}

/// Producer-facing handle to the command queue and its worker thread.
#[derive(Debug)]
pub struct AsyncWriter {
    queue: Arc<BoundedQueue<Command>>,
    progress: Arc<Progress>,
    join: Option<JoinHandle<()>>,
}

impl AsyncWriter {
    /// Start the worker. It shares `store` with the synchronous side and
    /// takes its lock once per command, never while holding the queue lock.
    pub fn spawn(store: Arc<Mutex<Store>>, capacity: usize) -> Result<Self> {
        let queue = Arc::new(BoundedQueue::new(capacity));
        let progress = Arc::new(Progress::default());

        let worker_queue = queue.clone();
        let worker_progress = progress.clone();
        let join = thread::Builder::new()
            .name("worldstore-writer".into())
            .spawn(move || {
                let _guard = StopGuard(worker_progress.clone());
                worker_loop(&worker_queue, &store, &worker_progress);
            })
            .map_err(StoreError::WorkerSpawn)?;

        tracing::debug!(capacity = queue.capacity(), "persistence worker started");
        Ok(Self {
            queue,
            progress,
            join: Some(join),
        })
    }

    /// Queue a command, blocking only while the queue is full. Returns the
    /// command's ticket.
    pub fn enqueue(&self, command: Command) -> u64 {
        self.queue.push(command)
    }

    /// Queue a `Commit` and wait until the worker has carried it out.
    pub fn flush(&self) -> Result<()> {
        if self.join.is_none() {
            return Err(StoreError::WorkerStopped);
        }
        let ticket = self.enqueue(Command::Commit);
        self.progress.wait_for(ticket)
    }

    pub fn stats(&self) -> WriterStats {
        self.progress.lock().stats
    }

    pub fn state(&self) -> WorkerState {
        self.progress.lock().state
    }

    /// Commands queued but not yet taken by the worker.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Send `Shutdown` and join the worker. Idempotent.
    pub fn shutdown(&mut self) -> Result<()> {
        let Some(join) = self.join.take() else {
            return Ok(());
        };
        self.queue.push(Command::Shutdown);
        join.join().map_err(|_| StoreError::WorkerPanicked)?;
        tracing::debug!(stats = ?self.stats(), "persistence worker joined");
        Ok(())
    }
}

impl Drop for AsyncWriter {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            tracing::error!(%err, "persistence worker did not shut down cleanly");
        }
    }
}

fn lock_store(store: &Mutex<Store>) -> MutexGuard<'_, Store> {
    // A panic on the synchronous side leaves the connection usable.
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

fn worker_loop(queue: &BoundedQueue<Command>, store: &Mutex<Store>, progress: &Progress) {
    let _span = tracing::info_span!("persistence_worker").entered();
    loop {
        let command = queue.pop();
        if command == Command::Shutdown {
            progress.set_state(WorkerState::Draining);
            // Anything queued behind the shutdown still gets written.
            while let Some(late) = queue.try_pop() {
                if late != Command::Shutdown {
                    handle(&late, store, progress);
                }
            }
            handle(&command, store, progress);
            tracing::info!(stats = ?progress.lock().stats, "persistence worker stopped");
            return;
        }
        progress.set_state(WorkerState::Applying);
        handle(&command, store, progress);
        progress.set_state(WorkerState::Idle);
    }
}

/// Apply one command. Failures are logged and counted, never propagated:
/// losing a single world edit must not stop the writer.
fn handle(command: &Command, store: &Mutex<Store>, progress: &Progress) {
    let outcome = lock_store(store).apply(command);
    let is_boundary = matches!(command, Command::Commit | Command::Shutdown);
    match &outcome {
        Ok(()) if is_boundary => tracing::debug!(kind = command.kind(), "transaction committed"),
        Ok(()) => tracing::trace!(kind = command.kind(), "command applied"),
        Err(err) if is_boundary => {
            tracing::error!(kind = command.kind(), %err, "commit failed")
        }
        Err(err) => tracing::warn!(?command, %err, "queued write failed, skipping"),
    }
    progress.update(|p| {
        p.stats.applied += 1;
        match (&outcome, is_boundary) {
            (Err(_), _) => p.stats.failed += 1,
            (Ok(()), true) => p.stats.commits += 1,
            (Ok(()), false) => {}
        }
    });
}
