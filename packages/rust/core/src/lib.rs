//! Course recommendation pipelines for CoursePilot.
//!
//! This crate ties together the corpus builder, the vector store, and the
//! generation client into end-to-end workflows:
//! - [`ingest::ingest`]: offline batch load of a course catalog
//! - [`recommend::recommend`]: profile → candidates → prompt → model answer

pub mod ingest;
pub mod prompt;
pub mod query;
pub mod recommend;

pub use ingest::{DocumentOutcome, IngestProgress, IngestReport, SilentProgress, ingest};
pub use prompt::PromptTemplate;
pub use query::{recommend_candidates, search_courses, search_phrase};
pub use recommend::{PreparedPrompt, Recommendation, prepare, recommend};
