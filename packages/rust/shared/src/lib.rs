//! Shared types, error model, and configuration for CoursePilot.
//!
//! This crate is the foundation depended on by all other CoursePilot crates.
//! It provides:
//! - [`CoursePilotError`]: the unified error type
//! - Domain types ([`CourseRecord`], [`CourseDocument`], [`Profile`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, EmbeddingConfig, EmbeddingProvider, GEMINI_BASE_URL, GenerationConfig,
    PromptConfig, RetrievalConfig, VectorStoreConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, read_api_key, validate_config,
};
pub use error::{CoursePilotError, ErrorClass, Result};
pub use types::{
    CourseDocument, CourseRecord, DISPLAY_TEXT_KEY, NO_PREREQUISITES, Profile, SearchableFields,
};
