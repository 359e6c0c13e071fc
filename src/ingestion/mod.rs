//! # Ingestion Module
//!
//! ## Purpose
//! Staged ingestion of heterogeneous legal-document sources into the graph
//! store: fetch raw records from registered adapters, parse them into the
//! unified document model, validate against source-type rules, and hand
//! passing documents to the graph writer.
//!
//! ## Input/Output Specification
//! - **Input**: Registered source adapters and fetch parameters
//! - **Output**: A `RunSummary` with per-stage counters, always produced
//! - **Stages**: Fetch → Parse → Validate → Ingest, with a stage barrier
//!   between them
//!
//! ## Architecture
//! - `sources/`: the adapter contract and the concrete source adapters
//! - `pipeline.rs`: the four-stage orchestrator
//! - `validation.rs`: per-source-type document validation

pub mod pipeline;
pub mod sources;
pub mod validation;

pub use pipeline::IngestionPipeline;
pub use sources::{FetchParams, RawRecord, SourceAdapter};
pub use validation::DocumentValidator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Structured summary of one pipeline run, consumable by any caller (CLI,
/// scheduler, dashboard) without the core depending on how it is displayed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique run identifier
    pub run_id: Uuid,
    /// Raw records fetched across all adapters
    pub fetched: usize,
    /// Records successfully parsed into documents
    pub parsed: usize,
    /// Documents that passed validation
    pub validated: usize,
    /// Documents written to the graph store
    pub ingested: usize,
    /// Documents skipped because their content hash was unchanged
    pub unchanged: usize,
    /// Failures across all stages (parse, validation, write, relationships)
    pub failed: usize,
    /// Non-fatal anomalies (degraded adapters, concept link failures)
    pub warnings: usize,
    /// Whether the run was cancelled at a stage boundary
    pub cancelled: bool,
    /// Run start time
    pub started_at: DateTime<Utc>,
    /// Run end time
    pub finished_at: Option<DateTime<Utc>>,
    /// Wall-clock duration in seconds
    pub duration_seconds: f64,
    /// Per-adapter counters
    pub source_stats: HashMap<String, SourceRunStats>,
    /// Documents that failed validation, retained with their issues for
    /// diagnostic inspection
    pub validation_failures: Vec<DocumentIssues>,
}

/// Per-adapter counters for one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceRunStats {
    /// Records fetched from this adapter
    pub fetched: usize,
    /// Errors while draining this adapter's record stream
    pub fetch_errors: usize,
    /// Records that failed to parse
    pub parse_failures: usize,
}

/// Validation issues retained for one failing document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentIssues {
    pub eli_uri: String,
    pub issues: Vec<String>,
}

impl RunSummary {
    pub(crate) fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            fetched: 0,
            parsed: 0,
            validated: 0,
            ingested: 0,
            unchanged: 0,
            failed: 0,
            warnings: 0,
            cancelled: false,
            started_at: Utc::now(),
            finished_at: None,
            duration_seconds: 0.0,
            source_stats: HashMap::new(),
            validation_failures: Vec::new(),
        }
    }

    pub(crate) fn finalize(&mut self, started: std::time::Instant) {
        if self.finished_at.is_none() {
            self.finished_at = Some(Utc::now());
            self.duration_seconds = started.elapsed().as_secs_f64();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_summary_serializes_for_external_consumers() {
        let mut summary = RunSummary::new(Uuid::new_v4());
        summary.fetched = 10;
        summary.validated = 8;
        summary.failed = 2;
        summary.validation_failures.push(DocumentIssues {
            eli_uri: "eli:de:sgb:6:43:oj".to_string(),
            issues: vec!["missing mandatory field: bgbl_reference".to_string()],
        });

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["fetched"], 10);
        assert_eq!(json["validation_failures"][0]["eli_uri"], "eli:de:sgb:6:43:oj");
    }
}
