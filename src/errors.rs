//! # Error Handling Module
//!
//! ## Purpose
//! Centralized error handling for the legal graph ingestion pipeline, providing
//! structured error types for every stage boundary and conversion utilities for
//! the underlying I/O, HTTP, and graph store crates.
//!
//! ## Input/Output Specification
//! - **Input**: Error conditions from adapters, validation, and graph writes
//! - **Output**: Structured error types with context and error chains
//! - **Error Categories**: Configuration, Fetch, Parse, Validation, Graph
//!
//! ## Failure Policy
//! Every pipeline failure is local to the smallest unit that caused it (one
//! record, one document, one batch) and is tallied into the run summary rather
//! than escalated. The only fatal errors are configuration-level ones raised
//! before any stage runs (`Config`, `GraphUnavailable`).

use thiserror::Error;

/// Result type used throughout the application
pub type Result<T> = std::result::Result<T, IngestError>;

/// Error types for the legal graph ingestion pipeline
#[derive(Debug, Error)]
pub enum IngestError {
    // Fatal, pre-stage errors
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Graph store unreachable at startup
    #[error("Graph store at '{uri}' is unavailable: {details}")]
    GraphUnavailable { uri: String, details: String },

    // Fetch stage
    /// A source adapter could not be reached; the stage continues with zero
    /// records from that adapter
    #[error("Source '{source_name}' is unavailable: {details}")]
    SourceUnavailable { source_name: String, details: String },

    /// Rate limiting errors
    #[error("Rate limit exceeded for {source_name}")]
    RateLimitExceeded {
        source_name: String,
        retry_after_seconds: Option<u64>,
    },

    // Parse stage
    /// One raw record was malformed; skipped and counted
    #[error("Failed to parse record '{record_id}' from {source_name}: {details}")]
    ParseFailure {
        source_name: String,
        record_id: String,
        details: String,
    },

    // Validate stage
    /// One document failed the source-type rules; excluded from ingest but
    /// retained in the run report with its issues
    #[error("Validation failed for '{eli_uri}': {issue_count} issue(s)")]
    ValidationFailure { eli_uri: String, issue_count: usize },

    // Ingest stage
    /// An edge write referenced a node that does not exist in the store
    #[error("Relationship {rel_type} from '{from_uri}' to '{to_uri}' references a missing endpoint")]
    RelationshipEndpointMissing {
        from_uri: String,
        to_uri: String,
        rel_type: String,
    },

    /// Store-level error inside a batch; per-document isolation, tally incremented
    #[error("Batch {batch_index} write failed: {details}")]
    BatchWriteFailure { batch_index: usize, details: String },

    /// A version write would regress the CURRENT_VERSION pointer
    #[error(
        "Out-of-order version write for article '{article_key}': \
         attempted {attempted_date} behind current {current_date}"
    )]
    OutOfOrderVersionWrite {
        article_key: String,
        attempted_date: String,
        current_date: String,
    },

    // Wrapped errors from underlying crates
    /// Graph store driver errors
    #[error("Graph error: {0}")]
    Graph(#[from] neo4rs::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal system errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl IngestError {
    /// Check if the error is recoverable (fetch may be retried)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            IngestError::SourceUnavailable { .. }
                | IngestError::RateLimitExceeded { .. }
                | IngestError::Http(_)
        )
    }

    /// Check if the error is fatal and must abort before any stage runs
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IngestError::Config { .. } | IngestError::GraphUnavailable { .. }
        )
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            IngestError::Config { .. } | IngestError::Toml(_) => "configuration",
            IngestError::SourceUnavailable { .. }
            | IngestError::RateLimitExceeded { .. }
            | IngestError::Http(_) => "fetch",
            IngestError::ParseFailure { .. } | IngestError::Json(_) => "parse",
            IngestError::ValidationFailure { .. } => "validation",
            IngestError::GraphUnavailable { .. }
            | IngestError::RelationshipEndpointMissing { .. }
            | IngestError::BatchWriteFailure { .. }
            | IngestError::OutOfOrderVersionWrite { .. }
            | IngestError::Graph(_) => "graph",
            IngestError::Io(_) | IngestError::Internal { .. } => "system",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_covers_fetch_failures_only() {
        let unavailable = IngestError::SourceUnavailable {
            source_name: "EUR-Lex".to_string(),
            details: "timeout".to_string(),
        };
        assert!(unavailable.is_recoverable());

        let out_of_order = IngestError::OutOfOrderVersionWrite {
            article_key: "eli:de:sgb:6:43".to_string(),
            attempted_date: "2020-01-01".to_string(),
            current_date: "2023-03-01".to_string(),
        };
        assert!(!out_of_order.is_recoverable());
    }

    #[test]
    fn fatal_errors_are_configuration_level() {
        let config = IngestError::Config {
            message: "missing password".to_string(),
        };
        assert!(config.is_fatal());
        assert_eq!(config.category(), "configuration");

        let batch = IngestError::BatchWriteFailure {
            batch_index: 3,
            details: "connection reset".to_string(),
        };
        assert!(!batch.is_fatal());
        assert_eq!(batch.category(), "graph");
    }
}
