//! # Unified Document Model
//!
//! ## Purpose
//! Canonical in-memory representation of a legal resource (German statutes, EU
//! regulations and directives, court decisions) together with its
//! metadata-quality metrics. Every source adapter parses into this model and
//! every downstream component (validator, graph writer) consumes it.
//!
//! ## Input/Output Specification
//! - **Input**: Parsed fields from heterogeneous sources
//! - **Output**: `LegalDocument` instances with derived quality metrics
//! - **Natural Key**: the ELI URI (`eli:<jurisdiction>:<type>:...`)
//!
//! ## Key Features
//! - Source-type-aware completeness scoring over mandatory metadata fields
//! - Deterministic content hash for no-op re-ingestion detection
//! - Stable article identity (`article_key`) for version-chain locking
//! - Serde-serializable for run reports and diagnostics

use crate::graph::{NodeLabel, RelationshipType};
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Supported law source types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LawSourceType {
    GermanLaw,
    EuRegulation,
    EuDirective,
    CaseLaw,
}

impl LawSourceType {
    /// Stable string tag used in store properties and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            LawSourceType::GermanLaw => "german_law",
            LawSourceType::EuRegulation => "eu_regulation",
            LawSourceType::EuDirective => "eu_directive",
            LawSourceType::CaseLaw => "case_law",
        }
    }

    /// Whether this type originates from EU legislation
    pub fn is_eu(&self) -> bool {
        matches!(self, LawSourceType::EuRegulation | LawSourceType::EuDirective)
    }

    /// Store node label for documents of this type
    pub fn node_label(&self) -> NodeLabel {
        match self {
            LawSourceType::GermanLaw => NodeLabel::GermanLaw,
            LawSourceType::EuRegulation => NodeLabel::EuRegulation,
            LawSourceType::EuDirective => NodeLabel::EuDirective,
            LawSourceType::CaseLaw => NodeLabel::CourtDecision,
        }
    }
}

/// Data quality validation status, derived by the validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Pending,
    Passed,
    Failed,
    Warning,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Pending => "pending",
            ValidationStatus::Passed => "passed",
            ValidationStatus::Failed => "failed",
            ValidationStatus::Warning => "warning",
        }
    }
}

/// EuroVoc thesaurus descriptor attached to a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThesaurusConcept {
    /// EuroVoc concept identifier
    pub eurovoc_id: String,
    /// German preferred label
    pub pref_label_de: String,
    /// English preferred label
    pub pref_label_en: Option<String>,
    /// Relevance of the concept to the tagged document (0.0-1.0)
    pub relevance: Option<f64>,
}

/// A typed, directed relationship declared during parsing, written to the
/// store by the graph writer once both endpoints exist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRelationship {
    /// ELI URI of the target document
    pub target_uri: String,
    /// Relationship type (IMPLEMENTS, CONCERNS, ...)
    pub rel_type: RelationshipType,
    /// Store label of the target node
    pub target_label: NodeLabel,
    /// Optional edge properties (relevance score, impact type, ...)
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// Unified legal document representation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegalDocument {
    // Identification
    /// ELI URI, the natural key for idempotent writes
    pub eli_uri: String,
    pub celex_number: Option<String>,
    pub ecli: Option<String>,
    pub bgbl_reference: Option<String>,
    pub ojeu_reference: Option<String>,

    // Core metadata
    pub source_type: LawSourceType,
    pub title_de: String,
    pub title_en: Option<String>,
    pub title_fr: Option<String>,

    // Temporal
    pub date_document: Option<NaiveDate>,
    pub first_date_entry_in_force: Option<NaiveDate>,
    pub last_amended: Option<NaiveDate>,
    /// Reason for the amendment this version introduces, carried onto the
    /// SUPERSEDES edge by the graph writer
    pub change_reason: Option<String>,
    pub transposition_deadline: Option<NaiveDate>,
    pub transposition_status: Option<String>,

    // Classification
    pub policy_area: String,
    #[serde(default)]
    pub subject_matter: HashMap<String, String>,
    #[serde(default)]
    pub eurovoc_descriptors: Vec<ThesaurusConcept>,

    // Authority
    pub responsible_authority: Option<String>,
    pub sponsoring_ministry: Option<String>,

    // Structure
    pub article_count: u32,
    pub amendment_count: u32,

    // Quality (derived, never externally set)
    pub completeness_score: f64,
    pub validation_status: ValidationStatus,
    #[serde(default)]
    pub data_quality_issues: Vec<String>,
    pub source_reliability: String,

    // Bookkeeping
    pub ingestion_source: String,
    pub document_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,

    // Declared graph edges, written after the document itself
    #[serde(default)]
    pub relationships: Vec<DocumentRelationship>,
}

fn date_segment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"))
}

fn filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

impl LegalDocument {
    /// Create a new document in the pre-validation state
    pub fn new(
        eli_uri: impl Into<String>,
        source_type: LawSourceType,
        ingestion_source: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            eli_uri: eli_uri.into(),
            celex_number: None,
            ecli: None,
            bgbl_reference: None,
            ojeu_reference: None,
            source_type,
            title_de: String::new(),
            title_en: None,
            title_fr: None,
            date_document: None,
            first_date_entry_in_force: None,
            last_amended: None,
            change_reason: None,
            transposition_deadline: None,
            transposition_status: None,
            policy_area: String::new(),
            subject_matter: HashMap::new(),
            eurovoc_descriptors: Vec::new(),
            responsible_authority: None,
            sponsoring_ministry: None,
            article_count: 0,
            amendment_count: 0,
            completeness_score: 0.0,
            validation_status: ValidationStatus::Pending,
            data_quality_issues: Vec::new(),
            source_reliability: "high".to_string(),
            ingestion_source: ingestion_source.into(),
            document_hash: None,
            created_at: now,
            last_updated: now,
            relationships: Vec::new(),
        }
    }

    /// Calculate metadata completeness (0.0-1.0) over the mandatory field set
    /// for this document's source type, and store it on the document.
    ///
    /// Empty strings count as unfilled. The mandatory set is never empty, so
    /// the result is always well-defined.
    pub fn compute_completeness(&mut self) -> f64 {
        let mut checks: Vec<bool> = vec![
            !self.eli_uri.is_empty(),
            !self.title_de.is_empty(),
            self.date_document.is_some(),
            self.first_date_entry_in_force.is_some(),
            !self.policy_area.is_empty(),
        ];

        match self.source_type {
            LawSourceType::EuRegulation | LawSourceType::EuDirective => {
                checks.push(filled(&self.celex_number));
                checks.push(filled(&self.ojeu_reference));
            }
            LawSourceType::GermanLaw => {
                checks.push(filled(&self.bgbl_reference));
                checks.push(filled(&self.responsible_authority));
            }
            LawSourceType::CaseLaw => {}
        }

        let total = checks.len();
        let filled_count = checks.iter().filter(|c| **c).count();
        self.completeness_score = filled_count as f64 / total as f64;
        self.completeness_score
    }

    /// Deterministic SHA-256 content hash over (eli_uri, title, document date).
    /// Stable for identical content; the graph writer uses it to short-circuit
    /// no-op re-ingestion.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.eli_uri.as_bytes());
        hasher.update(self.title_de.as_bytes());
        if let Some(date) = self.date_document {
            hasher.update(date.to_string().as_bytes());
        }
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Compute the content hash and stamp it on the document
    pub fn compute_content_hash(&mut self) -> String {
        let hash = self.content_hash();
        self.document_hash = Some(hash.clone());
        hash
    }

    /// Structural ELI URI check: at least 4 colon-separated segments, the
    /// first of which is literally `eli`.
    pub fn has_valid_eli_uri(&self) -> bool {
        let parts: Vec<&str> = self.eli_uri.split(':').collect();
        parts.len() >= 4 && parts[0] == "eli"
    }

    /// Stable identity of the logical article this document is a version of:
    /// the ELI URI minus a trailing version segment (a `YYYY-MM-DD` date or
    /// the `oj` consolidated marker). Used as the version-chain lock key and
    /// as the parent `Article` node identity.
    pub fn article_key(&self) -> String {
        let parts: Vec<&str> = self.eli_uri.split(':').collect();
        match parts.last() {
            Some(&last) if last == "oj" || date_segment_re().is_match(last) => {
                parts[..parts.len() - 1].join(":")
            }
            _ => self.eli_uri.clone(),
        }
    }

    /// Effective date used for version ordering: entry into force, falling
    /// back to the document date.
    pub fn effective_date(&self) -> Option<NaiveDate> {
        self.first_date_entry_in_force.or(self.date_document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sgb_document() -> LegalDocument {
        let mut doc = LegalDocument::new(
            "eli:de:sgb:6:43:oj",
            LawSourceType::GermanLaw,
            "gesetze-im-internet.de",
        );
        doc.title_de = "Anspruch auf Rente wegen Erwerbsminderung".to_string();
        doc.date_document = NaiveDate::from_ymd_opt(1992, 1, 1);
        doc.first_date_entry_in_force = NaiveDate::from_ymd_opt(1992, 1, 1);
        doc.policy_area = "social_security".to_string();
        doc.bgbl_reference = Some("BGBl. I 1989 S. 2261".to_string());
        doc.responsible_authority = Some("Deutsche Rentenversicherung".to_string());
        doc
    }

    #[test]
    fn completeness_is_one_for_fully_populated_german_law() {
        let mut doc = sgb_document();
        assert_eq!(doc.compute_completeness(), 1.0);
    }

    #[test]
    fn completeness_counts_type_specific_fields() {
        let mut doc = sgb_document();
        doc.bgbl_reference = None;
        // 6 of 7 mandatory fields present for a German law
        let score = doc.compute_completeness();
        assert!((score - 6.0 / 7.0).abs() < 1e-9);
        assert_eq!(score, doc.completeness_score);
    }

    #[test]
    fn completeness_treats_empty_strings_as_unfilled() {
        let mut doc = sgb_document();
        doc.responsible_authority = Some(String::new());
        let score = doc.compute_completeness();
        assert!((score - 6.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn completeness_is_deterministic_and_bounded() {
        let mut doc = sgb_document();
        let first = doc.compute_completeness();
        let second = doc.compute_completeness();
        assert_eq!(first, second);
        assert!((0.0..=1.0).contains(&first));

        let mut empty = LegalDocument::new("", LawSourceType::CaseLaw, "test");
        let score = empty.compute_completeness();
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn content_hash_is_stable_for_identical_content() {
        let mut a = sgb_document();
        let mut b = sgb_document();
        assert_eq!(a.compute_content_hash(), b.compute_content_hash());

        b.title_de = "Anspruch auf Rente wegen voller Erwerbsminderung".to_string();
        assert_ne!(a.compute_content_hash(), b.compute_content_hash());
    }

    #[test]
    fn eli_uri_structure_is_enforced() {
        let doc = sgb_document();
        assert!(doc.has_valid_eli_uri());

        let mut bad = sgb_document();
        bad.eli_uri = "eli:de:sgb".to_string();
        assert!(!bad.has_valid_eli_uri());

        bad.eli_uri = "urn:de:sgb:6:43".to_string();
        assert!(!bad.has_valid_eli_uri());
    }

    #[test]
    fn article_key_strips_version_suffixes() {
        let doc = sgb_document();
        assert_eq!(doc.article_key(), "eli:de:sgb:6:43");

        let mut dated = sgb_document();
        dated.eli_uri = "eli:de:sgb:6:43:2023-03-01".to_string();
        assert_eq!(dated.article_key(), "eli:de:sgb:6:43");

        let mut bare = sgb_document();
        bare.eli_uri = "eli:de:sgb:6:43".to_string();
        assert_eq!(bare.article_key(), "eli:de:sgb:6:43");
    }

    #[test]
    fn source_type_tags_round_trip_through_serde() {
        let json = serde_json::to_string(&LawSourceType::EuDirective).unwrap();
        assert_eq!(json, "\"eu_directive\"");
        let back: LawSourceType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, LawSourceType::EuDirective);
        assert_eq!(back.as_str(), "eu_directive");
    }
}
