//! Batch acquisition of headwords into the shared store.
//!
//! Every headword becomes one pool task: retrieve the page, extract the
//! paradigm, merge it into the [`SharedStore`]. Per-word problems are folded
//! into the batch's [`BatchReport`] and never abort the batch.

use std::fmt;
use std::mem;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use latin_paradigm::SharedStore;
use tracing::{debug, info, warn};

use crate::extract::{ExtractOptions, Extraction, extract};
use crate::pool::{Callback, PoolConfig, PoolError, Task, WorkerPool};
use crate::retrieve::{Retrieval, retrieve};
use crate::source::LexiconSource;

pub const DEFAULT_MAX_WORKERS: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// Transport error or unexpected HTTP response.
    Fetch,
    /// Listed by the source, but not as a verb.
    NoVerbEntry,
    /// The page did not have the expected structure.
    Extraction,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Fetch => "fetch",
            FailureKind::NoVerbEntry => "no_verb_entry",
            FailureKind::Extraction => "extraction",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    pub query: String,
    pub kind: FailureKind,
    pub reason: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}: {})", self.query, self.kind.as_str(), self.reason)
    }
}

/// What one batch achieved; `succeeded` holds the stored citation forms.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<Failure>,
}

#[derive(Debug)]
pub enum Outcome {
    Found(Extraction),
    NotFound,
    Failed(FailureKind, String),
}

/// Retrieve and extract one headword.
pub fn acquire<S>(source: &S, headword: &str, options: ExtractOptions) -> Outcome
where
    S: LexiconSource + ?Sized,
{
    let markup = match retrieve(source, headword) {
        Ok(Retrieval::Document(markup)) => markup,
        Ok(Retrieval::NotFound) => return Outcome::NotFound,
        Err(err) => return Outcome::Failed(FailureKind::Fetch, err.to_string()),
    };
    match extract(&markup, options) {
        Ok(extraction) => Outcome::Found(extraction),
        Err(err) => Outcome::Failed(FailureKind::Extraction, err.to_string()),
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BatchOptions {
    pub exclude_supina: bool,
    /// Persist the store once the batch has drained.
    pub save: bool,
}

/// A running batch. Dropping it detaches; the work still completes.
pub struct Batch {
    pool: WorkerPool,
    report: Arc<Mutex<BatchReport>>,
}

impl Batch {
    pub fn is_active(&self) -> bool {
        self.pool.is_active()
    }

    /// Wait for the batch (and its completion callback) to finish.
    pub fn join(self) -> BatchReport {
        self.pool.join();
        mem::take(&mut *self.report.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[derive(Clone)]
pub struct Harvester {
    source: Arc<dyn LexiconSource>,
    store: SharedStore,
    store_path: Option<PathBuf>,
    max_workers: usize,
}

impl Harvester {
    pub fn new(source: Arc<dyn LexiconSource>, store: SharedStore) -> Self {
        Self {
            source,
            store,
            store_path: None,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }

    /// File written by batches run with [`BatchOptions::save`].
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(path.into());
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Fetch every headword, replacing stored paradigms.
    ///
    /// `on_finish` runs once, after every outcome is recorded and after the
    /// optional save.
    pub fn update<F>(
        &self,
        headwords: &[String],
        options: BatchOptions,
        on_finish: F,
    ) -> Result<Batch, PoolError>
    where
        F: FnOnce(&BatchReport) + Send + 'static,
    {
        self.run(headwords, options, PoolConfig::new(self.max_workers), on_finish)
    }

    /// Fetch only the headwords not stored yet.
    ///
    /// When nothing is missing the returned batch is already drained and
    /// `on_finish` is not called.
    pub fn ensure_contains<F>(
        &self,
        headwords: &[String],
        options: BatchOptions,
        on_finish: F,
    ) -> Result<Batch, PoolError>
    where
        F: FnOnce(&BatchReport) + Send + 'static,
    {
        let missing: Vec<String> = {
            let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
            headwords
                .iter()
                .map(|word| word.trim())
                .filter(|word| !store.contains(word))
                .map(str::to_string)
                .collect()
        };
        let config = PoolConfig::new(self.max_workers).allow_empty(true);
        self.run(&missing, options, config, on_finish)
    }

    /// Re-fetch every stored headword.
    pub fn refresh_all<F>(&self, options: BatchOptions, on_finish: F) -> Result<Batch, PoolError>
    where
        F: FnOnce(&BatchReport) + Send + 'static,
    {
        let stored: Vec<String> = self
            .store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .headwords()
            .map(str::to_string)
            .collect();
        let config = PoolConfig::new(self.max_workers).allow_empty(true);
        self.run(&stored, options, config, on_finish)
    }

    fn run<F>(
        &self,
        headwords: &[String],
        options: BatchOptions,
        config: PoolConfig,
        on_finish: F,
    ) -> Result<Batch, PoolError>
    where
        F: FnOnce(&BatchReport) + Send + 'static,
    {
        let report = Arc::new(Mutex::new(BatchReport::default()));
        let extract_options = ExtractOptions {
            exclude_supina: options.exclude_supina,
        };
        let tasks: Vec<Task> = headwords
            .iter()
            .map(|word| {
                let query = word.trim().to_string();
                let source = Arc::clone(&self.source);
                let store = Arc::clone(&self.store);
                let report = Arc::clone(&report);
                Box::new(move || {
                    let outcome = acquire(source.as_ref(), &query, extract_options);
                    record(&store, &report, query, outcome);
                }) as Task
            })
            .collect();

        let callback: Callback = {
            let report = Arc::clone(&report);
            let store = Arc::clone(&self.store);
            let save_to = self.store_path.clone().filter(|_| options.save);
            Box::new(move || {
                if let Some(path) = save_to {
                    let store = store.read().unwrap_or_else(PoisonError::into_inner);
                    if let Err(err) = store.save(&path) {
                        warn!("failed to save store after batch: {err}");
                    }
                }
                let report = report.lock().unwrap_or_else(PoisonError::into_inner);
                info!(
                    "batch finished: {} succeeded, {} failed",
                    report.succeeded.len(),
                    report.failed.len()
                );
                on_finish(&report);
            })
        };

        let pool = WorkerPool::start(tasks, config, Some(callback))?;
        Ok(Batch { pool, report })
    }
}

fn record(store: &SharedStore, report: &Mutex<BatchReport>, query: String, outcome: Outcome) {
    let failure = |kind, reason: String| Failure {
        query: query.clone(),
        kind,
        reason,
    };
    let entry = match outcome {
        Outcome::Found(Extraction { headword, paradigm }) => {
            debug!("{query}: stored as {headword}");
            store
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(headword.clone(), paradigm);
            Ok(headword)
        }
        Outcome::NotFound => Err(failure(
            FailureKind::NoVerbEntry,
            "no verb entry on the disambiguation page".into(),
        )),
        Outcome::Failed(kind, reason) => Err(failure(kind, reason)),
    };

    let mut report = report.lock().unwrap_or_else(PoisonError::into_inner);
    match entry {
        Ok(headword) => report.succeeded.push(headword),
        Err(failure) => {
            debug!("{failure}");
            report.failed.push(failure);
        }
    }
}
