//! # Document Validation Module
//!
//! ## Purpose
//! Validates unified legal documents against source-type-specific completeness
//! rules before they are written to the graph, ensuring mandatory metadata is
//! present and structurally sound.
//!
//! ## Input/Output Specification
//! - **Input**: Parsed `LegalDocument` instances
//! - **Output**: Pass/fail verdict plus human-readable issue strings
//! - **Side Effects**: Only the two derived fields on the document itself
//!   (`validation_status`, `data_quality_issues`); no I/O, idempotent
//!
//! ## Rule Sets
//! Each source type carries a mandatory-field list and a minimum completeness
//! threshold. Court decisions have no dedicated rule set and fall back to the
//! default threshold with only the common structural checks.

use crate::model::{LawSourceType, LegalDocument, ValidationStatus};

/// Default minimum completeness for source types without a dedicated rule set
pub const DEFAULT_MIN_COMPLETENESS: f64 = 0.80;

/// Mandatory-field list and completeness threshold for one source type
#[derive(Debug, Clone, Copy)]
pub struct ValidationRules {
    pub mandatory: &'static [&'static str],
    pub min_completeness: f64,
}

/// Validates legal documents against per-source-type rule sets
#[derive(Debug, Default)]
pub struct DocumentValidator;

impl DocumentValidator {
    pub fn new() -> Self {
        Self
    }

    /// Rule set for a source type. The match is exhaustive: a missing rule set
    /// is an explicit `None`, never a silently skipped case.
    pub fn rules_for(source_type: LawSourceType) -> Option<ValidationRules> {
        match source_type {
            LawSourceType::GermanLaw => Some(ValidationRules {
                mandatory: &["eli_uri", "title_de", "bgbl_reference", "responsible_authority"],
                min_completeness: 0.80,
            }),
            LawSourceType::EuRegulation => Some(ValidationRules {
                mandatory: &["eli_uri", "celex_number", "ojeu_reference"],
                min_completeness: 0.85,
            }),
            LawSourceType::EuDirective => Some(ValidationRules {
                mandatory: &["eli_uri", "celex_number", "transposition_deadline"],
                min_completeness: 0.85,
            }),
            LawSourceType::CaseLaw => None,
        }
    }

    /// Validate a document. Returns `(is_valid, issues)` and stores the
    /// derived status and issue list on the document. Safe to call repeatedly.
    pub fn validate(&self, document: &mut LegalDocument) -> (bool, Vec<String>) {
        let mut issues = Vec::new();

        // Mandatory fields for the document's source type
        let rules = Self::rules_for(document.source_type);
        if let Some(rules) = rules {
            for field in rules.mandatory {
                if !field_is_filled(document, field) {
                    issues.push(format!("missing mandatory field: {}", field));
                }
            }
        }

        // Completeness against the type's threshold
        let score = document.compute_completeness();
        let min_completeness = rules
            .map(|r| r.min_completeness)
            .unwrap_or(DEFAULT_MIN_COMPLETENESS);
        if score < min_completeness {
            issues.push(format!(
                "completeness score {:.1}% below required {:.1}%",
                score * 100.0,
                min_completeness * 100.0
            ));
        }

        // Structural ELI URI rule
        if !document.has_valid_eli_uri() {
            issues.push(format!("invalid ELI URI format: {}", document.eli_uri));
        }

        // Temporal ordering
        if let (Some(date_document), Some(in_force)) =
            (document.date_document, document.first_date_entry_in_force)
        {
            if date_document > in_force {
                issues.push(
                    "date_document cannot be after first_date_entry_in_force".to_string(),
                );
            }
        }

        document.validation_status = if issues.is_empty() {
            ValidationStatus::Passed
        } else {
            ValidationStatus::Failed
        };
        document.data_quality_issues = issues.clone();

        (issues.is_empty(), issues)
    }
}

/// Check whether a mandatory field carries a usable value. Empty strings count
/// as unfilled.
fn field_is_filled(document: &LegalDocument, field: &str) -> bool {
    fn opt(value: &Option<String>) -> bool {
        value.as_deref().is_some_and(|v| !v.is_empty())
    }

    match field {
        "eli_uri" => !document.eli_uri.is_empty(),
        "title_de" => !document.title_de.is_empty(),
        "policy_area" => !document.policy_area.is_empty(),
        "celex_number" => opt(&document.celex_number),
        "ecli" => opt(&document.ecli),
        "bgbl_reference" => opt(&document.bgbl_reference),
        "ojeu_reference" => opt(&document.ojeu_reference),
        "responsible_authority" => opt(&document.responsible_authority),
        "date_document" => document.date_document.is_some(),
        "first_date_entry_in_force" => document.first_date_entry_in_force.is_some(),
        "transposition_deadline" => document.transposition_deadline.is_some(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn german_law() -> LegalDocument {
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

    fn eu_directive() -> LegalDocument {
        let mut doc = LegalDocument::new(
            "eli:eu:dir:2019:1152:oj",
            LawSourceType::EuDirective,
            "EUR-Lex",
        );
        doc.title_de = "Richtlinie über transparente Arbeitsbedingungen".to_string();
        doc.celex_number = Some("32019L1152".to_string());
        doc.ojeu_reference = Some("OJ L 186".to_string());
        doc.date_document = NaiveDate::from_ymd_opt(2019, 6, 20);
        doc.first_date_entry_in_force = NaiveDate::from_ymd_opt(2019, 7, 31);
        doc.transposition_deadline = NaiveDate::from_ymd_opt(2022, 8, 1);
        doc.policy_area = "employment".to_string();
        doc
    }

    #[test]
    fn complete_german_law_passes() {
        let validator = DocumentValidator::new();
        let mut doc = german_law();
        let (ok, issues) = validator.validate(&mut doc);
        assert!(ok, "unexpected issues: {:?}", issues);
        assert_eq!(doc.validation_status, ValidationStatus::Passed);
        assert_eq!(doc.completeness_score, 1.0);
    }

    #[test]
    fn missing_mandatory_field_fails_with_named_issue() {
        let validator = DocumentValidator::new();
        let mut doc = german_law();
        doc.bgbl_reference = None;
        let (ok, issues) = validator.validate(&mut doc);
        assert!(!ok);
        assert!(issues
            .iter()
            .any(|i| i == "missing mandatory field: bgbl_reference"));
        assert_eq!(doc.validation_status, ValidationStatus::Failed);
    }

    #[test]
    fn every_mandatory_field_is_checked_per_type() {
        let validator = DocumentValidator::new();
        for source_type in [
            LawSourceType::GermanLaw,
            LawSourceType::EuRegulation,
            LawSourceType::EuDirective,
        ] {
            let rules = DocumentValidator::rules_for(source_type).unwrap();
            for field in rules.mandatory {
                let mut doc = match source_type {
                    LawSourceType::GermanLaw => german_law(),
                    _ => eu_directive(),
                };
                doc.source_type = source_type;
                clear_field(&mut doc, field);
                let (ok, issues) = validator.validate(&mut doc);
                assert!(!ok, "{:?} should fail without {}", source_type, field);
                assert!(
                    issues
                        .iter()
                        .any(|i| i == &format!("missing mandatory field: {}", field)),
                    "{:?} missing issue for {}: {:?}",
                    source_type,
                    field,
                    issues
                );
            }
        }
    }

    fn clear_field(doc: &mut LegalDocument, field: &str) {
        match field {
            "eli_uri" => doc.eli_uri = String::new(),
            "title_de" => doc.title_de = String::new(),
            "celex_number" => doc.celex_number = None,
            "bgbl_reference" => doc.bgbl_reference = None,
            "ojeu_reference" => doc.ojeu_reference = None,
            "responsible_authority" => doc.responsible_authority = None,
            "transposition_deadline" => doc.transposition_deadline = None,
            other => panic!("unhandled field {}", other),
        }
    }

    #[test]
    fn completeness_shortfall_is_reported_as_percentages() {
        let validator = DocumentValidator::new();
        let mut doc = eu_directive();
        doc.ojeu_reference = None;
        doc.policy_area = String::new();
        let (ok, issues) = validator.validate(&mut doc);
        assert!(!ok);
        assert!(
            issues.iter().any(|i| i.starts_with("completeness score")
                && i.contains("below required 85.0%")),
            "no shortfall issue in {:?}",
            issues
        );
    }

    #[test]
    fn case_law_falls_back_to_default_threshold() {
        let validator = DocumentValidator::new();
        let mut doc = LegalDocument::new(
            "eli:de:bgh:2023:0117",
            LawSourceType::CaseLaw,
            "courts",
        );
        doc.title_de = "Urteil zum Mietrecht".to_string();
        doc.ecli = Some("ECLI:DE:BGH:2023:170123".to_string());
        doc.date_document = NaiveDate::from_ymd_opt(2023, 1, 17);
        doc.first_date_entry_in_force = NaiveDate::from_ymd_opt(2023, 1, 17);
        doc.policy_area = "tenancy".to_string();

        let (ok, issues) = validator.validate(&mut doc);
        assert!(ok, "unexpected issues: {:?}", issues);
        assert_eq!(doc.completeness_score, 1.0);
    }

    #[test]
    fn invalid_eli_uri_is_flagged() {
        let validator = DocumentValidator::new();
        let mut doc = german_law();
        doc.eli_uri = "de:sgb:6:43".to_string();
        let (ok, issues) = validator.validate(&mut doc);
        assert!(!ok);
        assert!(issues
            .iter()
            .any(|i| i.starts_with("invalid ELI URI format")));
    }

    #[test]
    fn date_ordering_violation_is_flagged() {
        let validator = DocumentValidator::new();
        let mut doc = german_law();
        doc.date_document = NaiveDate::from_ymd_opt(1995, 1, 1);
        doc.first_date_entry_in_force = NaiveDate::from_ymd_opt(1992, 1, 1);
        let (ok, issues) = validator.validate(&mut doc);
        assert!(!ok);
        assert!(issues
            .iter()
            .any(|i| i == "date_document cannot be after first_date_entry_in_force"));
    }

    #[test]
    fn validation_is_idempotent() {
        let validator = DocumentValidator::new();
        let mut doc = german_law();
        doc.bgbl_reference = None;

        let (_, first) = validator.validate(&mut doc);
        let (_, second) = validator.validate(&mut doc);
        assert_eq!(first, second);
        assert_eq!(doc.data_quality_issues, second);
    }
}
