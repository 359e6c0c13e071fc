//! # Legal Graph Ingestion Pipeline
//!
//! ## Overview
//! This library ingests heterogeneous legal-document sources (German federal
//! statutes, EU regulations and directives, court decisions, thesaurus
//! concepts), normalizes them into a unified document model, validates them
//! against source-specific completeness rules, and writes them into a
//! property-graph store with typed relationships and amendment version
//! chains, without creating duplicates and without losing prior versions.
//!
//! ## Architecture
//! The system is composed of several key modules:
//! - `model`: the unified `LegalDocument` model with completeness scoring
//! - `ingestion`: staged pipeline (fetch → parse → validate → ingest), the
//!   source adapter contract, and the document validator
//! - `graph`: the store client and the idempotent graph writer with
//!   `SUPERSEDES`/`CURRENT_VERSION` version-chain maintenance
//! - `config`: configuration management and settings
//! - `errors`: centralized error handling and types
//!
//! ## Input/Output Specification
//! - **Input**: Source adapter streams (statute indexes, SPARQL results)
//! - **Output**: Merged graph nodes, edges, and a structured run summary
//! - **Guarantees**: Idempotent re-ingestion, monotonic version chains,
//!   per-unit failure isolation
//!
//! ## Usage
//! ```rust,no_run
//! use std::sync::Arc;
//! use legal_graph_ingest::{
//!     Config, FetchParams, GesetzeImInternetAdapter, GraphClient, GraphWriter,
//!     IngestionPipeline,
//! };
//!
//! #[tokio::main]
//! async fn main() -> legal_graph_ingest::Result<()> {
//!     let config = Config::from_file("config.toml")?;
//!     let client = Arc::new(GraphClient::connect(&config.graph).await?);
//!     let writer = Arc::new(GraphWriter::new(client));
//!
//!     let mut pipeline = IngestionPipeline::new(config.ingestion.clone(), writer);
//!     pipeline.register_adapter(Arc::new(GesetzeImInternetAdapter::new(
//!         config.sources.gesetze.clone(),
//!     )?));
//!
//!     let summary = pipeline.run(&FetchParams::default()).await;
//!     println!("Ingested {} document(s)", summary.ingested);
//!     Ok(())
//! }
//! ```

// Core modules
pub mod config;
pub mod errors;
pub mod graph;
pub mod ingestion;
pub mod model;

// Re-exports for convenience
pub use config::Config;
pub use errors::{IngestError, Result};
pub use graph::{GraphClient, GraphSink, GraphWriter, NodeLabel, RelationshipType};
pub use ingestion::sources::{EurLexAdapter, GesetzeImInternetAdapter};
pub use ingestion::{
    DocumentValidator, FetchParams, IngestionPipeline, RawRecord, RunSummary, SourceAdapter,
};
pub use model::{LawSourceType, LegalDocument, ThesaurusConcept, ValidationStatus};
