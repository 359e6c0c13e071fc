//! # Graph Store Module
//!
//! ## Purpose
//! Boundary to the labeled-property-graph store. All mutations are expressed
//! as declarative match/merge statements; the store engine itself is opaque
//! and reached through a pooled client.
//!
//! ## Architecture
//! - `client.rs`: connection pool, startup connectivity check, schema bootstrap
//! - `writer.rs`: idempotent document/relationship upserts and version-chain
//!   maintenance; the only component that touches persistent state
//!
//! ## Input/Output Specification
//! - **Input**: Validated `LegalDocument` instances and declared relationships
//! - **Output**: Merged nodes and edges, amendment version chains
//! - **Labels**: per-source-type document labels plus `Article`,
//!   `TemporalVersion`, `LegalConcept`, `BusinessProcess`

pub mod client;
pub mod writer;

pub use client::GraphClient;
pub use writer::{BatchOutcome, GraphSink, GraphWriter, UpsertOutcome, VersionOutcome};

use serde::{Deserialize, Serialize};

/// Node labels used in the store schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeLabel {
    GermanLaw,
    EuRegulation,
    EuDirective,
    CourtDecision,
    Article,
    TemporalVersion,
    LegalConcept,
    BusinessProcess,
}

impl NodeLabel {
    /// Label text as it appears in Cypher statements
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::GermanLaw => "GermanLaw",
            NodeLabel::EuRegulation => "EURegulation",
            NodeLabel::EuDirective => "EUDirective",
            NodeLabel::CourtDecision => "CourtDecision",
            NodeLabel::Article => "Article",
            NodeLabel::TemporalVersion => "TemporalVersion",
            NodeLabel::LegalConcept => "LegalConcept",
            NodeLabel::BusinessProcess => "BusinessProcess",
        }
    }
}

/// Typed, directed relationship kinds written by the graph writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipType {
    /// Version chain: newer version → older version
    Supersedes,
    /// Pointer from an article to its single current version
    CurrentVersion,
    /// Membership of a version in an article's history
    HasVersion,
    /// EU directive → implementing national law
    Implements,
    /// Document → thesaurus concept
    Concerns,
    /// National law ↔ EU regulation coordination
    CoordinatesWith,
    /// Article → affected business process
    Impacts,
}

impl RelationshipType {
    /// Relationship type text as it appears in Cypher statements
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::Supersedes => "SUPERSEDES",
            RelationshipType::CurrentVersion => "CURRENT_VERSION",
            RelationshipType::HasVersion => "HAS_VERSION",
            RelationshipType::Implements => "IMPLEMENTS",
            RelationshipType::Concerns => "CONCERNS",
            RelationshipType::CoordinatesWith => "COORDINATES_WITH",
            RelationshipType::Impacts => "IMPACTS",
        }
    }
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_match_store_schema() {
        assert_eq!(NodeLabel::GermanLaw.as_str(), "GermanLaw");
        assert_eq!(NodeLabel::EuRegulation.as_str(), "EURegulation");
        assert_eq!(NodeLabel::TemporalVersion.as_str(), "TemporalVersion");
    }

    #[test]
    fn relationship_types_render_as_cypher_identifiers() {
        assert_eq!(RelationshipType::Supersedes.to_string(), "SUPERSEDES");
        assert_eq!(RelationshipType::CurrentVersion.as_str(), "CURRENT_VERSION");
        assert_eq!(RelationshipType::CoordinatesWith.as_str(), "COORDINATES_WITH");
    }
}
