//! Fetching Latin verb paradigms from frag-caesar.de.
//!
//! [`Harvester`] fans a batch of headwords out over a bounded [`WorkerPool`];
//! each task runs [`retrieve`] against a [`LexiconSource`], [`extract`]s the
//! paradigm and merges it into the shared store.

pub mod extract;
pub mod harvest;
pub mod pool;
pub mod retrieve;
pub mod source;

pub use extract::{ExtractError, ExtractOptions, Extraction, extract};
pub use harvest::{
    Batch, BatchOptions, BatchReport, DEFAULT_MAX_WORKERS, Failure, FailureKind, Harvester,
    Outcome, acquire,
};
pub use pool::{PoolConfig, PoolError, WorkerPool};
pub use retrieve::{Candidate, Retrieval, disambiguation_candidates, retrieve};
pub use source::{DEFAULT_BASE_URL, FetchError, HttpLexicon, LexiconSource};
