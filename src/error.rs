//! Error handling for the vitalvis engine
//!
//! This module defines custom error types and a Result alias for use
//! throughout the crate.

use thiserror::Error;

use crate::types::SeriesId;

/// Main error type for vitalvis operations
#[derive(Error, Debug)]
pub enum VitalVisError {
    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// A fetch payload failed schema validation at the boundary
    #[error("Payload error: {0}")]
    Payload(String),

    /// Mesh inputs with differing row widths
    #[error("Width mismatch for series '{series}': superset has {superset} columns, subset has {subset}")]
    WidthMismatch {
        series: SeriesId,
        superset: usize,
        subset: usize,
    },

    /// A group member's rows lack the expected value-column structure
    #[error("Malformed member '{series}' in group '{group}': {message}")]
    MalformedMember {
        group: String,
        series: SeriesId,
        message: String,
    },

    /// Referenced group is not defined
    #[error("Unknown group: {0}")]
    UnknownGroup(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<VitalVisError>,
    },
}

impl VitalVisError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        VitalVisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for vitalvis operations
pub type Result<T> = std::result::Result<T, VitalVisError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
