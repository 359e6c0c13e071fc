//! # gesetze-im-internet.de Data Source
//!
//! ## Purpose
//! Adapter for the federal statute index at gesetze-im-internet.de. Fetches
//! the published statute index and parses each entry into the unified
//! document model with German-law metadata (BGBl reference, responsible
//! authority, amendment history).
//!
//! ## Input/Output Specification
//! - **Input**: Index endpoint URL, optional fetch limit and incremental cutoff
//! - **Output**: `RawRecord`s carrying one statute entry each
//! - **Rate Limits**: Single index request per run, throttled per configuration

use super::{
    date_field, str_field, FetchParams, RateLimiter, RawRecord, RecordStream, SourceAdapter,
};
use crate::config::GesetzeConfig;
use crate::errors::{IngestError, Result};
use crate::graph::{NodeLabel, RelationshipType};
use crate::model::{DocumentRelationship, LawSourceType, LegalDocument, ThesaurusConcept};
use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Registered adapter name
pub const SOURCE_NAME: &str = "gesetze-im-internet.de";

/// Adapter for gesetze-im-internet.de (German federal statutes)
pub struct GesetzeImInternetAdapter {
    config: GesetzeConfig,
    client: Client,
    rate_limiter: Mutex<RateLimiter>,
}

/// Shape of the statute index document
#[derive(Debug, Deserialize)]
struct StatuteIndex {
    laws: Vec<serde_json::Value>,
}

impl GesetzeImInternetAdapter {
    pub fn new(config: GesetzeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("legal-graph-ingest/0.1")
            .build()?;
        let rate_limiter = Mutex::new(RateLimiter::new(config.rate_limit_rpm));

        Ok(Self {
            config,
            client,
            rate_limiter,
        })
    }

    async fn fetch_index(&self) -> Result<StatuteIndex> {
        self.rate_limiter.lock().await.enforce().await;

        let url = format!("{}/aktuell/index.json", self.config.base_url);
        debug!("Fetching statute index from {}", url);

        let response =
            self.client
                .get(&url)
                .send()
                .await
                .map_err(|e| IngestError::SourceUnavailable {
                    source_name: SOURCE_NAME.to_string(),
                    details: e.to_string(),
                })?;

        if !response.status().is_success() {
            return Err(IngestError::SourceUnavailable {
                source_name: SOURCE_NAME.to_string(),
                details: format!("HTTP {}", response.status()),
            });
        }

        response
            .json::<StatuteIndex>()
            .await
            .map_err(|e| IngestError::SourceUnavailable {
                source_name: SOURCE_NAME.to_string(),
                details: format!("malformed statute index: {}", e),
            })
    }
}

#[async_trait]
impl SourceAdapter for GesetzeImInternetAdapter {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch<'a>(&'a self, params: &FetchParams) -> Result<RecordStream<'a>> {
        let index = self.fetch_index().await?;
        let since = params.since;

        let mut records: Vec<RawRecord> = index
            .laws
            .into_iter()
            .filter(|payload| match (since, date_field(payload, "last_updated")) {
                (Some(cutoff), Some(updated)) => updated >= cutoff.date_naive(),
                _ => true,
            })
            .map(|payload| RawRecord {
                record_id: str_field(&payload, "eli_uri")
                    .unwrap_or_else(|| "unidentified".to_string()),
                source: SOURCE_NAME.to_string(),
                payload,
                fetched_at: Utc::now(),
            })
            .collect();

        if let Some(limit) = params.limit {
            records.truncate(limit);
        }

        info!("Fetched {} statute records from {}", records.len(), SOURCE_NAME);
        Ok(stream::iter(records.into_iter().map(Ok)).boxed())
    }

    fn parse(&self, record: &RawRecord) -> Result<LegalDocument> {
        let payload = &record.payload;
        let parse_failure = |details: String| IngestError::ParseFailure {
            source_name: SOURCE_NAME.to_string(),
            record_id: record.record_id.clone(),
            details,
        };

        let eli_uri = str_field(payload, "eli_uri")
            .ok_or_else(|| parse_failure("missing eli_uri".to_string()))?;
        let title_de = str_field(payload, "title")
            .ok_or_else(|| parse_failure("missing title".to_string()))?;

        let mut doc = LegalDocument::new(eli_uri, LawSourceType::GermanLaw, SOURCE_NAME);
        doc.title_de = title_de;
        doc.title_en = str_field(payload, "title_en");
        doc.date_document = date_field(payload, "date_document");
        doc.first_date_entry_in_force = date_field(payload, "entry_into_force");
        doc.last_amended = date_field(payload, "last_amended");
        doc.change_reason = str_field(payload, "change_reason");
        doc.bgbl_reference = str_field(payload, "bgbl_reference");
        doc.responsible_authority = str_field(payload, "responsible_authority");
        doc.sponsoring_ministry = str_field(payload, "sponsoring_ministry");
        doc.policy_area = str_field(payload, "policy_area").unwrap_or_default();
        doc.article_count = payload
            .get("article_count")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32;
        doc.amendment_count = payload
            .get("amendment_count")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32;

        if let Some(concepts) = payload.get("eurovoc").and_then(|v| v.as_array()) {
            for concept in concepts {
                if let Some(eurovoc_id) = str_field(concept, "id") {
                    doc.eurovoc_descriptors.push(ThesaurusConcept {
                        eurovoc_id,
                        pref_label_de: str_field(concept, "label_de").unwrap_or_default(),
                        pref_label_en: str_field(concept, "label_en"),
                        relevance: concept.get("relevance").and_then(|v| v.as_f64()),
                    });
                }
            }
        }

        // Statutes coordinating with an EU regulation declare the edge here;
        // the writer checks both endpoints before creating it.
        if let Some(target_uri) = str_field(payload, "coordinates_with") {
            doc.relationships.push(DocumentRelationship {
                target_uri,
                rel_type: RelationshipType::CoordinatesWith,
                target_label: NodeLabel::EuRegulation,
                properties: serde_json::Map::new(),
            });
        }

        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> GesetzeConfig {
        GesetzeConfig {
            enabled: true,
            base_url,
            rate_limit_rpm: 600,
            timeout_seconds: 5,
        }
    }

    fn statute_payload() -> serde_json::Value {
        json!({
            "eli_uri": "eli:de:sgb:6:43:oj",
            "title": "Anspruch auf Rente wegen Erwerbsminderung",
            "date_document": "1992-01-01",
            "entry_into_force": "1992-01-01",
            "bgbl_reference": "BGBl. I 1989 S. 2261",
            "responsible_authority": "Deutsche Rentenversicherung",
            "policy_area": "social_security",
            "article_count": 1,
            "eurovoc": [
                {"id": "2133", "label_de": "Rentenversicherung", "label_en": "pension scheme", "relevance": 0.95}
            ],
            "coordinates_with": "eli:eu:reg:2004:883:oj"
        })
    }

    #[tokio::test]
    async fn fetch_streams_records_from_the_index() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/aktuell/index.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "laws": [statute_payload(), statute_payload()]
            })))
            .mount(&server)
            .await;

        let adapter = GesetzeImInternetAdapter::new(test_config(server.uri())).unwrap();
        let stream = adapter
            .fetch(&FetchParams {
                limit: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();

        let records: Vec<_> = stream.collect().await;
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].as_ref().unwrap().record_id,
            "eli:de:sgb:6:43:oj"
        );
    }

    #[tokio::test]
    async fn unreachable_source_surfaces_as_source_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/aktuell/index.json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let adapter = GesetzeImInternetAdapter::new(test_config(server.uri())).unwrap();
        let err = adapter.fetch(&FetchParams::default()).await.err().unwrap();
        assert!(matches!(err, IngestError::SourceUnavailable { .. }));
    }

    #[test]
    fn parse_maps_statute_fields_into_the_unified_model() {
        let adapter = GesetzeImInternetAdapter::new(test_config(
            "https://www.gesetze-im-internet.de".to_string(),
        ))
        .unwrap();
        let record = RawRecord {
            source: SOURCE_NAME.to_string(),
            record_id: "eli:de:sgb:6:43:oj".to_string(),
            payload: statute_payload(),
            fetched_at: Utc::now(),
        };

        let doc = adapter.parse(&record).unwrap();
        assert_eq!(doc.eli_uri, "eli:de:sgb:6:43:oj");
        assert_eq!(doc.source_type, LawSourceType::GermanLaw);
        assert_eq!(doc.bgbl_reference.as_deref(), Some("BGBl. I 1989 S. 2261"));
        assert_eq!(doc.eurovoc_descriptors.len(), 1);
        assert_eq!(doc.eurovoc_descriptors[0].eurovoc_id, "2133");
        assert_eq!(doc.relationships.len(), 1);
        assert_eq!(
            doc.relationships[0].rel_type,
            RelationshipType::CoordinatesWith
        );
    }

    #[test]
    fn parse_without_title_is_a_parse_failure() {
        let adapter = GesetzeImInternetAdapter::new(test_config(
            "https://www.gesetze-im-internet.de".to_string(),
        ))
        .unwrap();
        let record = RawRecord {
            source: SOURCE_NAME.to_string(),
            record_id: "broken".to_string(),
            payload: json!({"eli_uri": "eli:de:bgb:1:1:oj"}),
            fetched_at: Utc::now(),
        };

        let err = adapter.parse(&record).unwrap_err();
        assert!(matches!(err, IngestError::ParseFailure { .. }));
    }
}
