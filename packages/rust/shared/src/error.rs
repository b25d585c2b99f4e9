//! Error types for CoursePilot.
//!
//! Library crates use [`CoursePilotError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all CoursePilot operations.
#[derive(Debug, thiserror::Error)]
pub enum CoursePilotError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Corpus or payload parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Input validation error (malformed profile, bad argument, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Prompt template is missing a required placeholder or cannot be loaded.
    #[error("template error: {message}")]
    Template { message: String },

    /// Vector store unreachable, misconfigured, or returned an unusable response.
    #[error("vector store unavailable: {0}")]
    StoreUnavailable(String),

    /// A document with this id is already present in the collection.
    #[error("duplicate document: {id}")]
    DuplicateDocument { id: String },

    /// Embedding provider failure.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Generative model unreachable or produced no text.
    #[error("generation unavailable: {0}")]
    GenerationUnavailable(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CoursePilotError>;

/// Coarse, user-facing classification of a [`CoursePilotError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A remote dependency (vector store, embedder, model) failed.
    UnavailableDependency,
    /// The caller supplied input that could not be used.
    MalformedInput,
    /// Local configuration or filesystem problem.
    Configuration,
    /// Content already ingested; recoverable.
    Duplicate,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::UnavailableDependency => "unavailable dependency",
            Self::MalformedInput => "malformed input",
            Self::Configuration => "configuration",
            Self::Duplicate => "duplicate",
        };
        f.write_str(label)
    }
}

impl CoursePilotError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a template error from any displayable message.
    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template {
            message: msg.into(),
        }
    }

    /// Create a duplicate-document error for `id`.
    pub fn duplicate(id: impl Into<String>) -> Self {
        Self::DuplicateDocument { id: id.into() }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Classify this error for user-facing reporting.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::StoreUnavailable(_) | Self::Embedding(_) | Self::GenerationUnavailable(_) => {
                ErrorClass::UnavailableDependency
            }
            Self::Parse { .. } | Self::Validation { .. } => ErrorClass::MalformedInput,
            Self::Config { .. } | Self::Io { .. } | Self::Template { .. } => {
                ErrorClass::Configuration
            }
            Self::DuplicateDocument { .. } => ErrorClass::Duplicate,
        }
    }

    /// Whether a batch job may log this error and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::DuplicateDocument { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = CoursePilotError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = CoursePilotError::duplicate("abc123");
        assert_eq!(err.to_string(), "duplicate document: abc123");
    }

    #[test]
    fn classification() {
        assert_eq!(
            CoursePilotError::StoreUnavailable("down".into()).class(),
            ErrorClass::UnavailableDependency
        );
        assert_eq!(
            CoursePilotError::GenerationUnavailable("no text".into()).class(),
            ErrorClass::UnavailableDependency
        );
        assert_eq!(
            CoursePilotError::validation("nested value").class(),
            ErrorClass::MalformedInput
        );
        assert_eq!(
            CoursePilotError::template("missing placeholder").class(),
            ErrorClass::Configuration
        );
        assert!(CoursePilotError::duplicate("x").is_recoverable());
        assert!(!CoursePilotError::StoreUnavailable("x".into()).is_recoverable());
    }
}
