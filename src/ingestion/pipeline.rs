//! # Ingestion Pipeline Orchestrator
//!
//! ## Purpose
//! Sequences the four ingestion stages (Fetch, Parse, Validate, Ingest)
//! across all registered source adapters, aggregates per-stage counters, and
//! isolates every failure to the smallest unit that caused it. A run always
//! terminates with a summary; no stage failure escalates to abort the run.
//!
//! ## Input/Output Specification
//! - **Input**: Registered adapters, fetch parameters, a graph sink
//! - **Output**: `RunSummary` with counts and duration, always produced
//! - **Stage Barrier**: Each stage completes across all adapters before the
//!   next begins, so aggregate counts are inspectable per stage and one
//!   adapter's failures never block another's batch
//!
//! ## Concurrency
//! Adapters fetch concurrently under a semaphore; none of the pipeline's own
//! logic blocks. Cancellation is cooperative and only takes effect at stage
//! boundaries; an in-flight batch always completes or fails atomically per
//! document.

use crate::config::IngestionConfig;
use crate::errors::IngestError;
use crate::graph::GraphSink;
use crate::ingestion::sources::{FetchParams, RawRecord, SourceAdapter};
use crate::ingestion::validation::DocumentValidator;
use crate::ingestion::{DocumentIssues, RunSummary};
use crate::model::LegalDocument;
use futures::future::join_all;
use futures::StreamExt;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Four-stage ingestion orchestrator
pub struct IngestionPipeline {
    config: IngestionConfig,
    sink: Arc<dyn GraphSink>,
    validator: DocumentValidator,
    adapters: Vec<Arc<dyn SourceAdapter>>,
    fetch_semaphore: Arc<Semaphore>,
    cancelled: Arc<AtomicBool>,
}

impl IngestionPipeline {
    /// Create a pipeline over already-configured collaborators
    pub fn new(config: IngestionConfig, sink: Arc<dyn GraphSink>) -> Self {
        let permits = config.max_concurrent_fetches.max(1);
        Self {
            config,
            sink,
            validator: DocumentValidator::new(),
            adapters: Vec::new(),
            fetch_semaphore: Arc::new(Semaphore::new(permits)),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Register a source adapter by name before a run
    pub fn register_adapter(&mut self, adapter: Arc<dyn SourceAdapter>) {
        info!("Registered adapter: {}", adapter.name());
        self.adapters.push(adapter);
    }

    /// Handle for cooperative cancellation; takes effect at stage boundaries
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Execute the full pipeline. Always returns a summary, even if every
    /// stage degraded.
    pub async fn run(&self, params: &FetchParams) -> RunSummary {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let mut summary = RunSummary::new(run_id);
        info!(
            "Starting ingestion run {} with {} adapter(s)",
            run_id,
            self.adapters.len()
        );

        let fetched = self.fetch_stage(params, &mut summary).await;
        if self.checkpoint(&mut summary, started, "fetch") {
            return summary;
        }

        let documents = self.parse_stage(fetched, &mut summary);
        if self.checkpoint(&mut summary, started, "parse") {
            return summary;
        }

        let passing = self.validate_stage(documents, &mut summary);
        if self.checkpoint(&mut summary, started, "validate") {
            return summary;
        }

        self.ingest_stage(passing, &mut summary).await;

        summary.finalize(started);
        info!(
            "Run {} finished in {:.2}s: {} fetched, {} parsed, {} validated, \
             {} ingested, {} unchanged, {} failed, {} warning(s)",
            run_id,
            summary.duration_seconds,
            summary.fetched,
            summary.parsed,
            summary.validated,
            summary.ingested,
            summary.unchanged,
            summary.failed,
            summary.warnings
        );
        summary
    }

    /// Cooperative cancellation checkpoint between stages
    fn checkpoint(&self, summary: &mut RunSummary, started: Instant, stage: &str) -> bool {
        if self.is_cancelled() {
            warn!("Run cancelled after {} stage", stage);
            summary.cancelled = true;
            summary.finalize(started);
            return true;
        }
        false
    }

    /// Stage 1: fetch from all adapters concurrently. An adapter error is
    /// logged and contributes zero records; it never aborts the run.
    async fn fetch_stage(
        &self,
        params: &FetchParams,
        summary: &mut RunSummary,
    ) -> Vec<(Arc<dyn SourceAdapter>, Vec<RawRecord>)> {
        info!("Stage 1/4: fetch across {} adapter(s)", self.adapters.len());

        let effective = FetchParams {
            limit: params.limit.or(self.config.fetch_limit),
            ..params.clone()
        };

        let futures = self.adapters.iter().map(|adapter| {
            let semaphore = self.fetch_semaphore.clone();
            let adapter = adapter.clone();
            let params = effective.clone();
            let attempts = self.config.retry_attempts;
            let delay = Duration::from_secs(self.config.retry_delay_seconds);
            async move {
                let _permit = semaphore.acquire().await.expect("fetch semaphore closed");
                let outcome = fetch_with_retry(&*adapter, &params, attempts, delay).await;
                (adapter, outcome)
            }
        });

        let mut fetched = Vec::new();
        for (adapter, outcome) in join_all(futures).await {
            let name = adapter.name().to_string();
            let stats = summary.source_stats.entry(name.clone()).or_default();
            match outcome {
                Ok((records, stream_errors)) => {
                    stats.fetched = records.len();
                    stats.fetch_errors = stream_errors;
                    summary.fetched += records.len();
                    summary.warnings += stream_errors;
                    fetched.push((adapter, records));
                }
                Err(e) => {
                    error!("Fetch failed for {}: {}", name, e);
                    stats.fetch_errors += 1;
                    summary.warnings += 1;
                }
            }
        }
        fetched
    }

    /// Stage 2: parse every record into the unified model. One malformed
    /// record is recorded as a failure and skipped.
    fn parse_stage(
        &self,
        fetched: Vec<(Arc<dyn SourceAdapter>, Vec<RawRecord>)>,
        summary: &mut RunSummary,
    ) -> Vec<LegalDocument> {
        info!("Stage 2/4: parse");

        let mut documents = Vec::new();
        for (adapter, records) in fetched {
            let name = adapter.name().to_string();
            for record in records {
                match adapter.parse(&record) {
                    Ok(doc) => {
                        documents.push(doc);
                        summary.parsed += 1;
                    }
                    Err(e) => {
                        warn!("Parse failure from {}: {}", name, e);
                        summary.failed += 1;
                        if let Some(stats) = summary.source_stats.get_mut(&name) {
                            stats.parse_failures += 1;
                        }
                    }
                }
            }
        }
        documents
    }

    /// Stage 3: validate every parsed document. Failing documents are counted
    /// and excluded from ingestion but retained in the report with their
    /// issues. The content hash is stamped here, after the fields settle.
    fn validate_stage(
        &self,
        documents: Vec<LegalDocument>,
        summary: &mut RunSummary,
    ) -> Vec<LegalDocument> {
        info!("Stage 3/4: validate ({} document(s))", documents.len());

        let mut passing = Vec::new();
        for mut doc in documents {
            let (ok, issues) = self.validator.validate(&mut doc);
            doc.compute_content_hash();
            if ok {
                summary.validated += 1;
                passing.push(doc);
            } else {
                warn!("Validation failed for {}: {:?}", doc.eli_uri, issues);
                summary.failed += 1;
                summary.validation_failures.push(DocumentIssues {
                    eli_uri: doc.eli_uri.clone(),
                    issues,
                });
            }
        }
        passing
    }

    /// Stage 4: write passing documents in batches, then their version chains,
    /// thesaurus concepts, and declared relationships. Batch failures are
    /// tallied and never abort subsequent writes.
    async fn ingest_stage(&self, mut documents: Vec<LegalDocument>, summary: &mut RunSummary) {
        info!("Stage 4/4: ingest ({} document(s))", documents.len());
        if documents.is_empty() {
            return;
        }

        // Same-article versions must apply in increasing effective-date order
        documents.sort_by_key(|d| d.effective_date());

        let outcome = match self
            .sink
            .upsert_batch(&documents, self.config.batch_size)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Ingest stage failed: {}", e);
                summary.failed += documents.len();
                return;
            }
        };
        summary.ingested += outcome.succeeded;
        summary.unchanged += outcome.unchanged;
        summary.failed += outcome.failed;

        let failed_uris: HashSet<&str> = outcome.failed_uris.iter().map(String::as_str).collect();

        for doc in &documents {
            if failed_uris.contains(doc.eli_uri.as_str()) {
                continue;
            }

            match self.sink.ingest_version(doc).await {
                Ok(outcome) => debug!("Version chain for {}: {:?}", doc.eli_uri, outcome),
                Err(e @ IngestError::OutOfOrderVersionWrite { .. }) => {
                    warn!("{}", e);
                    summary.failed += 1;
                }
                Err(e) => {
                    warn!("Version maintenance failed for {}: {}", doc.eli_uri, e);
                    summary.failed += 1;
                }
            }

            for concept in &doc.eurovoc_descriptors {
                if let Err(e) = self.sink.upsert_concept(concept).await {
                    warn!("Concept upsert failed for {}: {}", concept.eurovoc_id, e);
                    summary.warnings += 1;
                    continue;
                }
                if let Err(e) = self
                    .sink
                    .link_concept(&doc.eli_uri, doc.source_type.node_label(), concept)
                    .await
                {
                    warn!("Concept link failed for {}: {}", doc.eli_uri, e);
                    summary.warnings += 1;
                }
            }

            for rel in &doc.relationships {
                if let Err(e) = self
                    .sink
                    .upsert_relationship(
                        &doc.eli_uri,
                        &rel.target_uri,
                        rel.rel_type,
                        doc.source_type.node_label(),
                        rel.target_label,
                        &rel.properties,
                    )
                    .await
                {
                    warn!("Relationship write failed: {}", e);
                    summary.failed += 1;
                }
            }
        }
    }
}

/// Drain one adapter's record stream, retrying the initial fetch on
/// recoverable errors. Returns the records plus the count of mid-stream item
/// errors (skipped, reported).
async fn fetch_with_retry(
    adapter: &dyn SourceAdapter,
    params: &FetchParams,
    attempts: u32,
    delay: Duration,
) -> crate::errors::Result<(Vec<RawRecord>, usize)> {
    let mut attempt = 0;
    loop {
        match adapter.fetch(params).await {
            Ok(mut stream) => {
                let mut records = Vec::new();
                let mut stream_errors = 0;
                while let Some(item) = stream.next().await {
                    match item {
                        Ok(record) => records.push(record),
                        Err(e) => {
                            warn!("Record stream error from {}: {}", adapter.name(), e);
                            stream_errors += 1;
                        }
                    }
                }
                return Ok((records, stream_errors));
            }
            Err(e) if e.is_recoverable() && attempt < attempts => {
                attempt += 1;
                warn!(
                    "Fetch attempt {}/{} failed for {}: {}; retrying",
                    attempt,
                    attempts,
                    adapter.name(),
                    e
                );
                sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
