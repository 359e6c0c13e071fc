//! # Data Sources Module
//!
//! ## Purpose
//! Defines the common capability interface for external legal data sources and
//! provides the concrete adapters for gesetze-im-internet.de (German statutes)
//! and the EUR-Lex SPARQL endpoint (EU regulations and directives).
//!
//! ## Input/Output Specification
//! - **Input**: Fetch parameters (limit, incremental timestamp, query)
//! - **Output**: Lazy streams of `RawRecord`s and parsed `LegalDocument`s
//! - **Failure Mode**: An unreachable source surfaces as
//!   `IngestError::SourceUnavailable`, never as a partial silent result
//!
//! ## Architecture
//! - `SourceAdapter` trait: the two-operation contract {fetch, parse} the
//!   pipeline consumes; new sources implement the trait without core changes
//! - `gesetze.rs`: gesetze-im-internet.de statute index
//! - `eurlex.rs`: EUR-Lex SPARQL endpoint with offset pagination
//!
//! Thesaurus concepts are not a standalone document source: adapters attach
//! them to documents as `eurovoc_descriptors`, and the graph writer turns them
//! into `LegalConcept` nodes and `CONCERNS` edges.

pub mod eurlex;
pub mod gesetze;

pub use eurlex::EurLexAdapter;
pub use gesetze::GesetzeImInternetAdapter;

use crate::errors::Result;
use crate::model::LegalDocument;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Duration, Instant};

/// One raw record fetched from an external source, prior to parsing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    /// Name of the source adapter that produced this record
    pub source: String,
    /// Source-local record identifier, used in parse failure reports
    pub record_id: String,
    /// Raw payload as returned by the source
    pub payload: serde_json::Value,
    /// Fetch timestamp
    pub fetched_at: DateTime<Utc>,
}

/// Parameters for one fetch pass over a source
#[derive(Debug, Clone, Default)]
pub struct FetchParams {
    /// Maximum records to fetch from this source (None = source default)
    pub limit: Option<usize>,
    /// Only records changed since this instant (incremental runs)
    pub since: Option<DateTime<Utc>>,
    /// Free-form source-specific filter
    pub query: Option<String>,
}

/// Lazy, finite sequence of raw records from one source
pub type RecordStream<'a> = BoxStream<'a, Result<RawRecord>>;

/// Capability contract for external legal data sources.
///
/// Implemented once per source; the pipeline core consumes only this trait and
/// never a concrete adapter.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Registered name of this source
    fn name(&self) -> &str;

    /// Fetch raw records as a lazy, rate-limited stream. Failure to reach the
    /// source is a `SourceUnavailable` error.
    async fn fetch<'a>(&'a self, params: &FetchParams) -> Result<RecordStream<'a>>;

    /// Parse one raw record into the unified document model
    fn parse(&self, record: &RawRecord) -> Result<LegalDocument>;
}

/// Simple per-source rate limiter
pub(crate) struct RateLimiter {
    requests_per_minute: u32,
    last_request_time: Option<Instant>,
}

impl RateLimiter {
    pub(crate) fn new(requests_per_minute: u32) -> Self {
        Self {
            requests_per_minute: requests_per_minute.max(1),
            last_request_time: None,
        }
    }

    pub(crate) async fn enforce(&mut self) {
        if let Some(last_time) = self.last_request_time {
            let min_interval = Duration::from_secs(60) / self.requests_per_minute;
            let elapsed = last_time.elapsed();

            if elapsed < min_interval {
                sleep(min_interval - elapsed).await;
            }
        }

        self.last_request_time = Some(Instant::now());
    }
}

/// Read a required string field from a JSON payload
pub(crate) fn str_field(payload: &serde_json::Value, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Read an ISO date field (`YYYY-MM-DD`) from a JSON payload
pub(crate) fn date_field(payload: &serde_json::Value, key: &str) -> Option<chrono::NaiveDate> {
    payload
        .get(key)
        .and_then(|v| v.as_str())
        .and_then(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_field_helpers_handle_missing_and_empty_values() {
        let payload = json!({
            "title": "Sechstes Buch Sozialgesetzbuch",
            "empty": "",
            "date": "1992-01-01",
            "bad_date": "01.01.1992"
        });

        assert_eq!(
            str_field(&payload, "title").as_deref(),
            Some("Sechstes Buch Sozialgesetzbuch")
        );
        assert_eq!(str_field(&payload, "empty"), None);
        assert_eq!(str_field(&payload, "missing"), None);

        assert_eq!(
            date_field(&payload, "date"),
            chrono::NaiveDate::from_ymd_opt(1992, 1, 1)
        );
        assert_eq!(date_field(&payload, "bad_date"), None);
    }
}
