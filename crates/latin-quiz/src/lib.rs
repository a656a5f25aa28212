//! Quizzing and direct lookups over a [`latin_paradigm::ParadigmStore`].

pub mod query;
pub mod sampler;
pub mod weights;

pub use query::{LookupPath, lookup, parse_query, search};
pub use sampler::{Answer, DEFAULT_MAX_ATTEMPTS, Question, QuizOptions, SampleError, draw_question};
pub use weights::{ConfigError, DEFAULT_PRESET, WeightSpec, Weights};
