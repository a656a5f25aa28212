//! Bounded worker pool for batches of independent blocking tasks.
//!
//! A batch runs on a dedicated manager thread which spawns at most
//! `max_workers` worker threads. Workers drain a shared task channel until
//! it is empty, so no more than `max_workers` tasks ever run at once. Once
//! every worker has exited the optional completion callback runs on the
//! manager thread, and only then is the batch marked drained; [`WorkerPool::join`]
//! therefore returns after the callback has finished.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;

use thiserror::Error;
use tracing::{debug, warn};

pub type Task = Box<dyn FnOnce() + Send + 'static>;
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("task batch must not be empty")]
    EmptyBatch,
    #[error("max_workers must be greater than 0")]
    NoWorkers,
    #[error("previous batch is still running")]
    Busy,
    #[error("failed to spawn pool manager: {0}")]
    Spawn(#[from] io::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_workers: usize,
    /// Accept empty batches as no-ops instead of rejecting them.
    pub allow_empty: bool,
}

impl PoolConfig {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers,
            allow_empty: false,
        }
    }

    pub fn allow_empty(mut self, allow: bool) -> Self {
        self.allow_empty = allow;
        self
    }
}

#[derive(Default)]
struct BatchState {
    active: Mutex<bool>,
    drained: Condvar,
}

impl BatchState {
    /// Mark the batch running; fails if one is already in flight.
    fn try_activate(&self) -> bool {
        let mut guard = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if *guard {
            return false;
        }
        *guard = true;
        true
    }

    fn set_active(&self, active: bool) {
        let mut guard = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = active;
        if !active {
            self.drained.notify_all();
        }
    }
}

/// Handle on a running (or drained) batch.
pub struct WorkerPool {
    config: PoolConfig,
    state: Arc<BatchState>,
}

impl WorkerPool {
    /// Start running `tasks` immediately.
    ///
    /// An empty batch is accepted only when `config.allow_empty` is set; the
    /// returned pool is then already drained.
    pub fn start(
        tasks: Vec<Task>,
        config: PoolConfig,
        on_finish: Option<Callback>,
    ) -> Result<Self, PoolError> {
        let pool = Self {
            config,
            state: Arc::new(BatchState::default()),
        };
        pool.launch(tasks, on_finish)?;
        Ok(pool)
    }

    /// Run a new batch on a drained pool.
    pub fn restart(&self, tasks: Vec<Task>, on_finish: Option<Callback>) -> Result<(), PoolError> {
        if self.is_active() {
            return Err(PoolError::Busy);
        }
        self.launch(tasks, on_finish)
    }

    pub fn is_active(&self) -> bool {
        *self
            .state
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the current batch has been drained.
    pub fn join(&self) {
        let mut active = self
            .state
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while *active {
            active = self
                .state
                .drained
                .wait(active)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn launch(&self, tasks: Vec<Task>, on_finish: Option<Callback>) -> Result<(), PoolError> {
        if tasks.is_empty() {
            return if self.config.allow_empty {
                Ok(())
            } else {
                Err(PoolError::EmptyBatch)
            };
        }
        if self.config.max_workers == 0 {
            return Err(PoolError::NoWorkers);
        }

        if !self.state.try_activate() {
            return Err(PoolError::Busy);
        }
        let state = Arc::clone(&self.state);
        let max_workers = self.config.max_workers;
        let spawned = thread::Builder::new()
            .name("pool-manager".into())
            .spawn(move || {
                manage(tasks, max_workers, on_finish);
                state.set_active(false);
            });
        if let Err(err) = spawned {
            self.state.set_active(false);
            return Err(PoolError::Spawn(err));
        }
        Ok(())
    }
}

fn manage(tasks: Vec<Task>, max_workers: usize, on_finish: Option<Callback>) {
    let total = tasks.len();
    let (sender, receiver) = mpsc::channel::<Task>();
    for task in tasks {
        // The receiver is alive until the workers below exit.
        let _ = sender.send(task);
    }
    drop(sender);
    let receiver = Arc::new(Mutex::new(receiver));

    let workers: Vec<_> = (0..max_workers.min(total))
        .filter_map(|id| {
            let receiver = Arc::clone(&receiver);
            thread::Builder::new()
                .name(format!("pool-worker-{id}"))
                .spawn(move || work(&receiver))
                .map_err(|err| warn!("failed to spawn worker {id}: {err}"))
                .ok()
        })
        .collect();
    debug!("running {total} tasks on {} workers", workers.len());

    if workers.is_empty() {
        work(&receiver);
    }
    for worker in workers {
        if worker.join().is_err() {
            warn!("pool worker exited abnormally");
        }
    }

    if let Some(callback) = on_finish {
        if panic::catch_unwind(AssertUnwindSafe(callback)).is_err() {
            warn!("batch completion callback panicked");
        }
    }
}

fn work(receiver: &Mutex<Receiver<Task>>) {
    loop {
        let next = receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recv();
        let Ok(task) = next else {
            break;
        };
        if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
            warn!("pool task panicked");
        }
    }
}
