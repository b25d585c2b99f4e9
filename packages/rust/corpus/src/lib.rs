//! Course corpus: raw catalog rows in, content-addressed documents out.
//!
//! This crate provides:
//! - [`read_records`] / [`parse_records`]: Windows-1252 tolerant CSV reading
//! - [`build`]: display text, searchable fields, and embedding text per course
//! - [`document_id`]: the content address used to de-duplicate ingestion

mod builder;
mod identity;
pub mod reader;

pub use builder::{build, build_document};
pub use identity::document_id;
pub use reader::{parse_records, read_records};
