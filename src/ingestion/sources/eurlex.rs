//! # EUR-Lex SPARQL Data Source
//!
//! ## Purpose
//! Adapter for the EUR-Lex/Cellar SPARQL endpoint. Streams EU regulations and
//! directives page by page and parses each result binding into the unified
//! document model with EU metadata (CELEX number, OJ reference, transposition
//! deadline, EuroVoc descriptors).
//!
//! ## Input/Output Specification
//! - **Input**: SPARQL endpoint URL, page size, optional filter and fetch limit
//! - **Output**: Lazily paginated `RawRecord` stream of result bindings
//! - **Rate Limits**: One request per page, throttled per configuration

use super::{FetchParams, RateLimiter, RawRecord, RecordStream, SourceAdapter};
use crate::config::EurLexConfig;
use crate::errors::{IngestError, Result};
use crate::graph::{NodeLabel, RelationshipType};
use crate::model::{DocumentRelationship, LawSourceType, LegalDocument, ThesaurusConcept};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Registered adapter name
pub const SOURCE_NAME: &str = "EUR-Lex SPARQL";

/// Adapter for EU legislation via the EUR-Lex SPARQL endpoint
pub struct EurLexAdapter {
    config: EurLexConfig,
    client: Client,
    rate_limiter: Mutex<RateLimiter>,
}

/// SPARQL JSON results envelope
#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    bindings: Vec<serde_json::Value>,
}

/// Pagination state threaded through the record stream
struct PageState {
    offset: usize,
    yielded: usize,
    limit: Option<usize>,
    page_size: usize,
    filter: Option<String>,
    done: bool,
}

impl EurLexAdapter {
    pub fn new(config: EurLexConfig) -> Result<Self> {
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

    /// Fetch one page of SPARQL result bindings
    async fn fetch_page(
        &self,
        offset: usize,
        page_size: usize,
        filter: Option<&str>,
    ) -> Result<Vec<serde_json::Value>> {
        self.rate_limiter.lock().await.enforce().await;

        let sparql = build_legislation_query(page_size, offset, filter);
        debug!("Querying {} (offset {})", self.config.sparql_endpoint, offset);

        let response = self
            .client
            .get(&self.config.sparql_endpoint)
            .query(&[
                ("query", sparql.as_str()),
                ("format", "application/sparql-results+json"),
            ])
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

        let body: SparqlResponse =
            response
                .json()
                .await
                .map_err(|e| IngestError::SourceUnavailable {
                    source_name: SOURCE_NAME.to_string(),
                    details: format!("malformed SPARQL response: {}", e),
                })?;

        Ok(body.results.bindings)
    }

    fn binding_to_record(binding: serde_json::Value) -> RawRecord {
        let record_id = binding_value(&binding, "celex")
            .or_else(|| binding_value(&binding, "work"))
            .unwrap_or_else(|| "unidentified".to_string());
        RawRecord {
            source: SOURCE_NAME.to_string(),
            record_id,
            payload: binding,
            fetched_at: Utc::now(),
        }
    }
}

#[async_trait]
impl SourceAdapter for EurLexAdapter {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch<'a>(&'a self, params: &FetchParams) -> Result<RecordStream<'a>> {
        let page_size = self.config.page_size.max(1);
        let filter = params.query.clone();

        // First page is fetched eagerly so an unreachable endpoint fails the
        // fetch itself rather than the first stream poll.
        let first_page = self.fetch_page(0, page_size, filter.as_deref()).await?;
        info!(
            "Fetched first page of {} bindings from {}",
            first_page.len(),
            SOURCE_NAME
        );

        let mut state = PageState {
            offset: first_page.len(),
            yielded: 0,
            limit: params.limit,
            page_size,
            filter,
            done: first_page.len() < page_size,
        };

        let mut first_page = first_page;
        if let Some(limit) = state.limit {
            if first_page.len() >= limit {
                first_page.truncate(limit);
                state.done = true;
            }
        }
        state.yielded = first_page.len();

        let rest = stream::try_unfold(state, move |mut st| async move {
            if st.done {
                return Ok::<_, IngestError>(None);
            }

            let page = self
                .fetch_page(st.offset, st.page_size, st.filter.as_deref())
                .await?;
            st.offset += page.len();
            if page.len() < st.page_size {
                st.done = true;
            }

            let mut page = page;
            if let Some(limit) = st.limit {
                let remaining = limit.saturating_sub(st.yielded);
                if page.len() >= remaining {
                    page.truncate(remaining);
                    st.done = true;
                }
            }
            st.yielded += page.len();

            Ok(Some((page, st)))
        });

        let stream = stream::iter(vec![Ok::<_, IngestError>(first_page)])
            .chain(rest)
            .map_ok(|page| {
                stream::iter(
                    page.into_iter()
                        .map(Self::binding_to_record)
                        .map(Ok::<RawRecord, IngestError>),
                )
            })
            .try_flatten()
            .boxed();

        Ok(stream)
    }

    fn parse(&self, record: &RawRecord) -> Result<LegalDocument> {
        let payload = &record.payload;
        let parse_failure = |details: String| IngestError::ParseFailure {
            source_name: SOURCE_NAME.to_string(),
            record_id: record.record_id.clone(),
            details,
        };

        let eli_uri = binding_value(payload, "eli")
            .ok_or_else(|| parse_failure("missing eli binding".to_string()))?;
        let title_de = binding_value(payload, "title_de")
            .or_else(|| binding_value(payload, "title"))
            .ok_or_else(|| parse_failure("missing title binding".to_string()))?;

        let resource_type = binding_value(payload, "resource_type").unwrap_or_default();
        let source_type = if resource_type.contains("DIR") {
            LawSourceType::EuDirective
        } else {
            LawSourceType::EuRegulation
        };

        let mut doc = LegalDocument::new(eli_uri, source_type, SOURCE_NAME);
        doc.title_de = title_de;
        doc.title_en = binding_value(payload, "title_en");
        doc.celex_number = binding_value(payload, "celex");
        doc.ojeu_reference = binding_value(payload, "oj_reference");
        doc.date_document = binding_date(payload, "date_document");
        doc.first_date_entry_in_force = binding_date(payload, "entry_into_force");
        doc.transposition_deadline = binding_date(payload, "transposition_deadline");
        doc.policy_area = binding_value(payload, "policy_area").unwrap_or_default();

        if let Some(concepts) = binding_value(payload, "concepts") {
            doc.eurovoc_descriptors = parse_concept_list(&concepts);
        }

        // Directives with a notified national implementation declare the
        // IMPLEMENTS edge; endpoint existence is checked by the writer.
        if source_type == LawSourceType::EuDirective {
            if let Some(target_uri) = binding_value(payload, "implemented_by") {
                doc.relationships.push(DocumentRelationship {
                    target_uri,
                    rel_type: RelationshipType::Implements,
                    target_label: NodeLabel::GermanLaw,
                    properties: serde_json::Map::new(),
                });
            }
        }

        Ok(doc)
    }
}

/// Extract the `value` of one SPARQL binding variable
fn binding_value(payload: &serde_json::Value, var: &str) -> Option<String> {
    payload
        .get(var)
        .and_then(|b| b.get("value"))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Extract a binding variable as an ISO date
fn binding_date(payload: &serde_json::Value, var: &str) -> Option<NaiveDate> {
    binding_value(payload, var).and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
}

/// Parse a `GROUP_CONCAT` concept list of the form
/// `id|label_de|label_en;id|label_de|label_en`
fn parse_concept_list(raw: &str) -> Vec<ThesaurusConcept> {
    raw.split(';')
        .filter(|entry| !entry.trim().is_empty())
        .filter_map(|entry| {
            let mut parts = entry.splitn(3, '|');
            let eurovoc_id = parts.next()?.trim();
            if eurovoc_id.is_empty() {
                return None;
            }
            Some(ThesaurusConcept {
                eurovoc_id: eurovoc_id.to_string(),
                pref_label_de: parts.next().unwrap_or("").trim().to_string(),
                pref_label_en: parts
                    .next()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
                relevance: None,
            })
        })
        .collect()
}

/// Build the paged legislation query against the Cellar CDM vocabulary
fn build_legislation_query(page_size: usize, offset: usize, filter: Option<&str>) -> String {
    let filter_clause = filter
        .map(|f| format!("  FILTER(CONTAINS(LCASE(?title), LCASE(\"{}\")))\n", f))
        .unwrap_or_default();

    format!(
        "PREFIX cdm: <http://publications.europa.eu/ontology/cdm#>\n\
         SELECT ?work ?eli ?celex ?title ?title_de ?title_en ?resource_type \
         ?date_document ?entry_into_force ?transposition_deadline ?oj_reference \
         ?policy_area ?concepts\n\
         WHERE {{\n\
         \x20 ?work cdm:resource_legal_eli ?eli ;\n\
         \x20       cdm:resource_legal_id_celex ?celex ;\n\
         \x20       cdm:work_has_resource-type ?resource_type .\n\
         \x20 OPTIONAL {{ ?work cdm:work_date_document ?date_document }}\n\
         \x20 OPTIONAL {{ ?work cdm:resource_legal_date_entry-into-force ?entry_into_force }}\n\
         \x20 OPTIONAL {{ ?work cdm:directive_date_transposition ?transposition_deadline }}\n\
         {}\
         }}\n\
         ORDER BY ?celex\n\
         LIMIT {} OFFSET {}",
        filter_clause, page_size, offset
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(endpoint: String, page_size: usize) -> EurLexConfig {
        EurLexConfig {
            enabled: true,
            sparql_endpoint: endpoint,
            page_size,
            rate_limit_rpm: 600,
            timeout_seconds: 5,
        }
    }

    fn regulation_binding() -> serde_json::Value {
        json!({
            "work": {"type": "uri", "value": "http://publications.europa.eu/resource/cellar/abc"},
            "eli": {"type": "literal", "value": "eli:eu:reg:2004:883:oj"},
            "celex": {"type": "literal", "value": "32004R0883"},
            "title": {"type": "literal", "value": "Regulation on the coordination of social security systems"},
            "title_de": {"type": "literal", "value": "Verordnung zur Koordinierung der Systeme der sozialen Sicherheit"},
            "resource_type": {"type": "uri", "value": "http://publications.europa.eu/resource/authority/resource-type/REG"},
            "date_document": {"type": "literal", "value": "2004-04-29"},
            "entry_into_force": {"type": "literal", "value": "2010-05-01"},
            "oj_reference": {"type": "literal", "value": "OJ L 166"},
            "policy_area": {"type": "literal", "value": "social_security"},
            "concepts": {"type": "literal", "value": "2133|Rentenversicherung|pension scheme;1052|soziale Sicherheit|social security"}
        })
    }

    fn directive_binding() -> serde_json::Value {
        json!({
            "eli": {"type": "literal", "value": "eli:eu:dir:2019:1152:oj"},
            "celex": {"type": "literal", "value": "32019L1152"},
            "title_en": {"type": "literal", "value": "Directive on transparent and predictable working conditions"},
            "title_de": {"type": "literal", "value": "Richtlinie über transparente Arbeitsbedingungen"},
            "resource_type": {"type": "uri", "value": "http://publications.europa.eu/resource/authority/resource-type/DIR"},
            "date_document": {"type": "literal", "value": "2019-06-20"},
            "transposition_deadline": {"type": "literal", "value": "2022-08-01"},
            "implemented_by": {"type": "literal", "value": "eli:de:nachwg:2022:1:oj"}
        })
    }

    fn sparql_body(bindings: Vec<serde_json::Value>) -> serde_json::Value {
        json!({"head": {"vars": []}, "results": {"bindings": bindings}})
    }

    #[tokio::test]
    async fn fetch_collects_a_short_final_page_and_stops() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(sparql_body(vec![regulation_binding(), directive_binding()])),
            )
            .mount(&server)
            .await;

        let adapter = EurLexAdapter::new(test_config(server.uri(), 10)).unwrap();
        let stream = adapter.fetch(&FetchParams::default()).await.unwrap();
        let records: Vec<_> = stream.try_collect::<Vec<_>>().await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record_id, "32004R0883");
    }

    #[tokio::test]
    async fn fetch_limit_truncates_the_stream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(sparql_body(vec![regulation_binding(), directive_binding()])),
            )
            .mount(&server)
            .await;

        let adapter = EurLexAdapter::new(test_config(server.uri(), 2)).unwrap();
        let stream = adapter
            .fetch(&FetchParams {
                limit: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        let records: Vec<_> = stream.try_collect::<Vec<_>>().await.unwrap();

        assert_eq!(records.len(), 1);
    }

    #[test]
    fn parse_maps_a_regulation_binding() {
        let adapter =
            EurLexAdapter::new(test_config("https://example.invalid/sparql".to_string(), 10))
                .unwrap();
        let record = RawRecord {
            source: SOURCE_NAME.to_string(),
            record_id: "32004R0883".to_string(),
            payload: regulation_binding(),
            fetched_at: Utc::now(),
        };

        let doc = adapter.parse(&record).unwrap();
        assert_eq!(doc.source_type, LawSourceType::EuRegulation);
        assert_eq!(doc.celex_number.as_deref(), Some("32004R0883"));
        assert_eq!(doc.ojeu_reference.as_deref(), Some("OJ L 166"));
        assert_eq!(doc.eurovoc_descriptors.len(), 2);
        assert_eq!(doc.eurovoc_descriptors[1].eurovoc_id, "1052");
    }

    #[test]
    fn parse_maps_a_directive_with_an_implements_edge() {
        let adapter =
            EurLexAdapter::new(test_config("https://example.invalid/sparql".to_string(), 10))
                .unwrap();
        let record = RawRecord {
            source: SOURCE_NAME.to_string(),
            record_id: "32019L1152".to_string(),
            payload: directive_binding(),
            fetched_at: Utc::now(),
        };

        let doc = adapter.parse(&record).unwrap();
        assert_eq!(doc.source_type, LawSourceType::EuDirective);
        assert_eq!(
            doc.transposition_deadline,
            NaiveDate::from_ymd_opt(2022, 8, 1)
        );
        assert_eq!(doc.relationships.len(), 1);
        assert_eq!(doc.relationships[0].rel_type, RelationshipType::Implements);
        assert_eq!(doc.relationships[0].target_uri, "eli:de:nachwg:2022:1:oj");
    }

    #[test]
    fn concept_list_parsing_skips_malformed_entries() {
        let concepts = parse_concept_list("2133|Rentenversicherung|pension scheme;;|missing id|x");
        assert_eq!(concepts.len(), 1);
        assert_eq!(concepts[0].pref_label_de, "Rentenversicherung");
        assert_eq!(concepts[0].pref_label_en.as_deref(), Some("pension scheme"));
    }

    #[test]
    fn legislation_query_pages_with_limit_and_offset() {
        let query = build_legislation_query(50, 100, None);
        assert!(query.contains("LIMIT 50 OFFSET 100"));
        assert!(query.contains("resource_legal_eli"));

        let filtered = build_legislation_query(10, 0, Some("Rente"));
        assert!(filtered.contains("FILTER(CONTAINS"));
    }
}
