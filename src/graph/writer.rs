//! # Graph Writer
//!
//! ## Purpose
//! Translates validated documents and their declared relationships into
//! idempotent store mutations: merge-by-`eli_uri` upserts with full property
//! overwrite, endpoint-checked relationship merges, and amendment version
//! chains with a single unambiguous `CURRENT_VERSION` pointer.
//!
//! ## Input/Output Specification
//! - **Input**: Validated `LegalDocument` batches and `DocumentRelationship`s
//! - **Output**: Merged nodes/edges; `(succeeded, failed)` tallies per batch
//! - **Idempotence**: Re-ingesting the same `eli_uri` converges to the latest
//!   field values; an unchanged content hash short-circuits the write entirely
//!
//! ## Version Chains
//! A new version of a known article gets its own `TemporalVersion` node,
//! a `SUPERSEDES` edge (with change date and reason) to the previous current
//! version, the `CURRENT_VERSION` pointer, and `HAS_VERSION` membership. Old
//! versions are never deleted. Writes for the same logical article serialize
//! on a per-article lock; an incoming effective date behind the current one is
//! rejected as `OutOfOrderVersionWrite`. Equal effective dates: the later
//! ingestion wins as current.

use crate::errors::{IngestError, Result};
use crate::graph::client::GraphClient;
use crate::graph::{NodeLabel, RelationshipType};
use crate::model::{LegalDocument, ThesaurusConcept};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use neo4rs::{query, Query};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Result of a single document upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Node was created or its properties overwritten
    Written,
    /// Stored content hash matched; no write issued
    Unchanged,
}

/// Tallies from a batched write
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub failed: usize,
    pub unchanged: usize,
    /// URIs of documents that could not be written, so callers skip their
    /// relationship and version writes
    pub failed_uris: Vec<String>,
}

/// Result of version-chain maintenance for one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionOutcome {
    /// Document carries no effective date; no chain maintained
    Skipped,
    /// First version of this article
    Initial { version_uri: String },
    /// Same effective date re-ingested; node refreshed, pointer unchanged
    Refreshed { version_uri: String },
    /// New current version superseding the previous one
    Superseded {
        version_uri: String,
        previous_uri: String,
    },
}

/// Store mutation seam consumed by the pipeline. `GraphWriter` is the
/// production implementation; tests substitute an in-memory sink.
#[async_trait]
pub trait GraphSink: Send + Sync {
    /// Merge-by-`eli_uri` upsert with full property overwrite
    async fn upsert_document(&self, doc: &LegalDocument) -> Result<UpsertOutcome>;

    /// Partition into fixed-size batches, one transaction each, per-document
    /// error isolation inside a batch
    async fn upsert_batch(&self, docs: &[LegalDocument], batch_size: usize)
        -> Result<BatchOutcome>;

    /// Merge-on-type edge between two pre-existing nodes; fails with
    /// `RelationshipEndpointMissing` when either endpoint is absent
    async fn upsert_relationship(
        &self,
        from_uri: &str,
        to_uri: &str,
        rel_type: RelationshipType,
        from_label: NodeLabel,
        to_label: NodeLabel,
        properties: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<()>;

    /// Maintain the amendment version chain for one document
    async fn ingest_version(&self, doc: &LegalDocument) -> Result<VersionOutcome>;

    /// Merge a thesaurus concept node
    async fn upsert_concept(&self, concept: &ThesaurusConcept) -> Result<()>;

    /// CONCERNS edge from a document to a concept
    async fn link_concept(
        &self,
        doc_uri: &str,
        doc_label: NodeLabel,
        concept: &ThesaurusConcept,
    ) -> Result<()>;
}

/// Production graph writer backed by the pooled store client
pub struct GraphWriter {
    client: Arc<GraphClient>,
    /// Per-logical-article mutexes; unrelated articles write concurrently
    article_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl GraphWriter {
    pub fn new(client: Arc<GraphClient>) -> Self {
        Self {
            client,
            article_locks: DashMap::new(),
        }
    }

    fn article_lock(&self, article_key: &str) -> Arc<Mutex<()>> {
        self.article_locks
            .entry(article_key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Read the stored content hash for a document, if the node exists
    async fn stored_hash(&self, doc: &LegalDocument) -> Result<Option<String>> {
        let label = doc.source_type.node_label();
        let cypher = format!(
            "MATCH (d:{} {{eli_uri: $eli_uri}}) RETURN d.document_hash AS hash",
            label.as_str()
        );
        let mut rows = self
            .client
            .graph
            .execute(query(&cypher).param("eli_uri", doc.eli_uri.as_str()))
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<String>("hash").ok()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl GraphSink for GraphWriter {
    async fn upsert_document(&self, doc: &LegalDocument) -> Result<UpsertOutcome> {
        if !doc.has_valid_eli_uri() {
            return Err(IngestError::ValidationFailure {
                eli_uri: doc.eli_uri.clone(),
                issue_count: 1,
            });
        }

        let hash = doc
            .document_hash
            .clone()
            .unwrap_or_else(|| doc.content_hash());
        if let Some(existing) = self.stored_hash(doc).await? {
            if existing == hash {
                debug!("Unchanged content hash for {}, skipping write", doc.eli_uri);
                return Ok(UpsertOutcome::Unchanged);
            }
        }

        self.client
            .graph
            .run(build_document_upsert(doc, &hash))
            .await?;
        debug!("Upserted document {}", doc.eli_uri);
        Ok(UpsertOutcome::Written)
    }

    async fn upsert_batch(
        &self,
        docs: &[LegalDocument],
        batch_size: usize,
    ) -> Result<BatchOutcome> {
        let batch_size = batch_size.max(1);
        let mut outcome = BatchOutcome::default();

        for (batch_index, batch) in docs.chunks(batch_size).enumerate() {
            // Pre-pass: reject structurally unkeyed documents and skip
            // unchanged ones, so one bad document never poisons its siblings.
            let mut to_write: Vec<(&LegalDocument, String)> = Vec::new();
            for doc in batch {
                if !doc.has_valid_eli_uri() {
                    warn!("Rejecting document with invalid ELI URI: '{}'", doc.eli_uri);
                    outcome.failed += 1;
                    outcome.failed_uris.push(doc.eli_uri.clone());
                    continue;
                }
                let hash = doc
                    .document_hash
                    .clone()
                    .unwrap_or_else(|| doc.content_hash());
                match self.stored_hash(doc).await {
                    Ok(Some(existing)) if existing == hash => {
                        debug!("Unchanged content hash for {}", doc.eli_uri);
                        outcome.unchanged += 1;
                    }
                    Ok(_) => to_write.push((doc, hash)),
                    Err(e) => {
                        warn!("Hash lookup failed for {}: {}", doc.eli_uri, e);
                        outcome.failed += 1;
                        outcome.failed_uris.push(doc.eli_uri.clone());
                    }
                }
            }

            if to_write.is_empty() {
                continue;
            }

            let mut txn = match self.client.graph.start_txn().await {
                Ok(txn) => txn,
                Err(e) => {
                    warn!("Batch {} could not open a transaction: {}", batch_index, e);
                    outcome.failed += to_write.len();
                    outcome
                        .failed_uris
                        .extend(to_write.iter().map(|(d, _)| d.eli_uri.clone()));
                    continue;
                }
            };

            let mut written = 0usize;
            let mut batch_failed: Vec<String> = Vec::new();
            for (doc, hash) in &to_write {
                match txn.run(build_document_upsert(doc, hash)).await {
                    Ok(()) => written += 1,
                    Err(e) => {
                        warn!("Write failed for {} in batch {}: {}", doc.eli_uri, batch_index, e);
                        batch_failed.push(doc.eli_uri.clone());
                    }
                }
            }

            match txn.commit().await {
                Ok(()) => {
                    outcome.succeeded += written;
                    outcome.failed += batch_failed.len();
                    outcome.failed_uris.extend(batch_failed);
                }
                Err(e) => {
                    warn!("Batch {} commit failed: {}", batch_index, e);
                    outcome.failed += to_write.len();
                    outcome
                        .failed_uris
                        .extend(to_write.iter().map(|(d, _)| d.eli_uri.clone()));
                }
            }
        }

        info!(
            "Batch upsert complete: {} written, {} unchanged, {} failed",
            outcome.succeeded, outcome.unchanged, outcome.failed
        );
        Ok(outcome)
    }

    async fn upsert_relationship(
        &self,
        from_uri: &str,
        to_uri: &str,
        rel_type: RelationshipType,
        from_label: NodeLabel,
        to_label: NodeLabel,
        properties: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<()> {
        let keys: Vec<String> = properties
            .keys()
            .filter(|k| is_valid_property_key(k))
            .cloned()
            .collect();
        let cypher = relationship_merge_cypher(from_label, to_label, rel_type, &keys);

        let mut q = query(&cypher)
            .param("from_uri", from_uri)
            .param("to_uri", to_uri);
        for key in &keys {
            q = bind_json_param(q, &format!("p_{}", key), &properties[key]);
        }

        let mut rows = self.client.graph.execute(q).await?;
        match rows.next().await? {
            Some(_) => {
                debug!("Merged {} edge {} -> {}", rel_type, from_uri, to_uri);
                Ok(())
            }
            None => Err(IngestError::RelationshipEndpointMissing {
                from_uri: from_uri.to_string(),
                to_uri: to_uri.to_string(),
                rel_type: rel_type.as_str().to_string(),
            }),
        }
    }

    async fn ingest_version(&self, doc: &LegalDocument) -> Result<VersionOutcome> {
        let Some(effective) = doc.effective_date() else {
            debug!("No effective date on {}, skipping version chain", doc.eli_uri);
            return Ok(VersionOutcome::Skipped);
        };

        let article_key = doc.article_key();
        let lock = self.article_lock(&article_key);
        let _guard = lock.lock().await;
        let now = Utc::now().to_rfc3339();

        // Parent article node
        self.client
            .graph
            .run(
                query(
                    "MERGE (a:Article {eli_uri: $article_uri}) \
                     ON CREATE SET a.created_at = datetime($now) \
                     SET a.title = $title, a.last_updated = datetime($now)",
                )
                .param("article_uri", article_key.as_str())
                .param("title", doc.title_de.as_str())
                .param("now", now.as_str()),
            )
            .await?;

        // Current version, if any
        let mut rows = self
            .client
            .graph
            .execute(
                query(
                    "MATCH (a:Article {eli_uri: $article_uri})-[:CURRENT_VERSION]->(v:TemporalVersion) \
                     RETURN v.eli_uri AS uri, v.version_date AS version_date",
                )
                .param("article_uri", article_key.as_str()),
            )
            .await?;
        let current: Option<(String, Option<NaiveDate>)> = match rows.next().await? {
            Some(row) => {
                let uri: String = row.get("uri").unwrap_or_default();
                let date = row
                    .get::<String>("version_date")
                    .ok()
                    .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok());
                Some((uri, date))
            }
            None => None,
        };

        if let Some((_, Some(current_date))) = &current {
            if version_regresses(*current_date, effective) {
                return Err(IngestError::OutOfOrderVersionWrite {
                    article_key,
                    attempted_date: effective.to_string(),
                    current_date: current_date.to_string(),
                });
            }
        }

        let version_uri = version_uri(&article_key, effective);

        // Version node; merging by the date-derived URI makes a same-date
        // re-ingest refresh the node in place (later ingestion wins)
        self.client
            .graph
            .run(
                query(
                    "MERGE (v:TemporalVersion {eli_uri: $version_uri}) \
                     ON CREATE SET v.created_at = datetime($now) \
                     SET v.version_date = $version_date, \
                         v.title = $title, \
                         v.document_uri = $document_uri, \
                         v.document_hash = $document_hash, \
                         v.bgbl_reference = $bgbl_reference, \
                         v.last_updated = datetime($now)",
                )
                .param("version_uri", version_uri.as_str())
                .param("version_date", effective.to_string())
                .param("title", doc.title_de.as_str())
                .param("document_uri", doc.eli_uri.as_str())
                .param(
                    "document_hash",
                    doc.document_hash
                        .clone()
                        .unwrap_or_else(|| doc.content_hash()),
                )
                .param(
                    "bgbl_reference",
                    doc.bgbl_reference.clone().unwrap_or_default(),
                )
                .param("now", now.as_str()),
            )
            .await?;

        // Membership edge is never removed; the full chain stays traversable
        self.client
            .graph
            .run(
                query(
                    "MATCH (a:Article {eli_uri: $article_uri}) \
                     MATCH (v:TemporalVersion {eli_uri: $version_uri}) \
                     MERGE (a)-[:HAS_VERSION]->(v)",
                )
                .param("article_uri", article_key.as_str())
                .param("version_uri", version_uri.as_str()),
            )
            .await?;

        match current {
            Some((previous_uri, _)) if previous_uri != version_uri => {
                self.client
                    .graph
                    .run(
                        query(
                            "MATCH (new:TemporalVersion {eli_uri: $new_uri}) \
                             MATCH (old:TemporalVersion {eli_uri: $old_uri}) \
                             MERGE (new)-[s:SUPERSEDES]->(old) \
                             SET s.change_date = $change_date, s.change_reason = $change_reason",
                        )
                        .param("new_uri", version_uri.as_str())
                        .param("old_uri", previous_uri.as_str())
                        .param("change_date", effective.to_string())
                        .param(
                            "change_reason",
                            doc.change_reason.clone().unwrap_or_default(),
                        ),
                    )
                    .await?;

                self.client
                    .graph
                    .run(
                        query(
                            "MATCH (a:Article {eli_uri: $article_uri})-[c:CURRENT_VERSION]->(:TemporalVersion) \
                             DELETE c",
                        )
                        .param("article_uri", article_key.as_str()),
                    )
                    .await?;
                self.client
                    .graph
                    .run(
                        query(
                            "MATCH (a:Article {eli_uri: $article_uri}) \
                             MATCH (v:TemporalVersion {eli_uri: $version_uri}) \
                             MERGE (a)-[:CURRENT_VERSION]->(v)",
                        )
                        .param("article_uri", article_key.as_str())
                        .param("version_uri", version_uri.as_str()),
                    )
                    .await?;

                info!(
                    "Version chain advanced for {}: {} supersedes {}",
                    article_key, version_uri, previous_uri
                );
                Ok(VersionOutcome::Superseded {
                    version_uri,
                    previous_uri,
                })
            }
            Some(_) => Ok(VersionOutcome::Refreshed { version_uri }),
            None => {
                self.client
                    .graph
                    .run(
                        query(
                            "MATCH (a:Article {eli_uri: $article_uri}) \
                             MATCH (v:TemporalVersion {eli_uri: $version_uri}) \
                             MERGE (a)-[:CURRENT_VERSION]->(v)",
                        )
                        .param("article_uri", article_key.as_str())
                        .param("version_uri", version_uri.as_str()),
                    )
                    .await?;
                Ok(VersionOutcome::Initial { version_uri })
            }
        }
    }

    async fn upsert_concept(&self, concept: &ThesaurusConcept) -> Result<()> {
        self.client
            .graph
            .run(
                query(
                    "MERGE (c:LegalConcept {eurovoc_id: $eurovoc_id}) \
                     SET c.pref_label_de = $pref_label_de, \
                         c.pref_label_en = $pref_label_en",
                )
                .param("eurovoc_id", concept.eurovoc_id.as_str())
                .param("pref_label_de", concept.pref_label_de.as_str())
                .param(
                    "pref_label_en",
                    concept.pref_label_en.clone().unwrap_or_default(),
                ),
            )
            .await?;
        Ok(())
    }

    async fn link_concept(
        &self,
        doc_uri: &str,
        doc_label: NodeLabel,
        concept: &ThesaurusConcept,
    ) -> Result<()> {
        let cypher = format!(
            "MATCH (d:{} {{eli_uri: $eli_uri}}) \
             MATCH (c:LegalConcept {{eurovoc_id: $eurovoc_id}}) \
             MERGE (d)-[r:CONCERNS]->(c) \
             SET r.relevance_score = $relevance \
             RETURN type(r) AS rel_type",
            doc_label.as_str()
        );

        let mut rows = self
            .client
            .graph
            .execute(
                query(&cypher)
                    .param("eli_uri", doc_uri)
                    .param("eurovoc_id", concept.eurovoc_id.as_str())
                    .param("relevance", concept.relevance.unwrap_or(1.0)),
            )
            .await?;

        match rows.next().await? {
            Some(_) => Ok(()),
            None => Err(IngestError::RelationshipEndpointMissing {
                from_uri: doc_uri.to_string(),
                to_uri: concept.eurovoc_id.clone(),
                rel_type: RelationshipType::Concerns.as_str().to_string(),
            }),
        }
    }
}

/// Property keys must already be plain identifiers; anything else is skipped
/// rather than interpolated into Cypher.
fn is_valid_property_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// URI of the `TemporalVersion` node for one article version
fn version_uri(article_key: &str, effective: NaiveDate) -> String {
    format!("{}:{}", article_key, effective)
}

/// Whether writing `attempted` as current would move the pointer backwards
fn version_regresses(current: NaiveDate, attempted: NaiveDate) -> bool {
    attempted < current
}

/// Cypher for the merge-by-`eli_uri` document upsert with full property
/// overwrite
fn document_upsert_cypher(label: NodeLabel) -> String {
    format!(
        "MERGE (d:{} {{eli_uri: $eli_uri}}) \
         ON CREATE SET d.created_at = datetime($now) \
         SET d.source_type = $source_type, \
             d.title_de = $title_de, \
             d.title_en = CASE WHEN $title_en = '' THEN null ELSE $title_en END, \
             d.title_fr = CASE WHEN $title_fr = '' THEN null ELSE $title_fr END, \
             d.celex_number = CASE WHEN $celex_number = '' THEN null ELSE $celex_number END, \
             d.ecli = CASE WHEN $ecli = '' THEN null ELSE $ecli END, \
             d.bgbl_reference = CASE WHEN $bgbl_reference = '' THEN null ELSE $bgbl_reference END, \
             d.ojeu_reference = CASE WHEN $ojeu_reference = '' THEN null ELSE $ojeu_reference END, \
             d.date_document = CASE WHEN $date_document = '' THEN null ELSE date($date_document) END, \
             d.first_date_entry_in_force = CASE WHEN $first_date_entry_in_force = '' THEN null ELSE date($first_date_entry_in_force) END, \
             d.last_amended = CASE WHEN $last_amended = '' THEN null ELSE date($last_amended) END, \
             d.transposition_deadline = CASE WHEN $transposition_deadline = '' THEN null ELSE date($transposition_deadline) END, \
             d.policy_area = $policy_area, \
             d.subject_matter = $subject_matter, \
             d.responsible_authority = CASE WHEN $responsible_authority = '' THEN null ELSE $responsible_authority END, \
             d.sponsoring_ministry = CASE WHEN $sponsoring_ministry = '' THEN null ELSE $sponsoring_ministry END, \
             d.article_count = $article_count, \
             d.amendment_count = $amendment_count, \
             d.completeness_score = $completeness_score, \
             d.validation_status = $validation_status, \
             d.data_quality_issues = $data_quality_issues, \
             d.source_reliability = $source_reliability, \
             d.ingestion_source = $ingestion_source, \
             d.document_hash = $document_hash, \
             d.last_updated = datetime($now)",
        label.as_str()
    )
}

/// Bind the full parameter set for a document upsert
fn build_document_upsert(doc: &LegalDocument, hash: &str) -> Query {
    fn opt(value: &Option<String>) -> String {
        value.clone().unwrap_or_default()
    }
    fn opt_date(value: &Option<NaiveDate>) -> String {
        value.map(|d| d.to_string()).unwrap_or_default()
    }

    query(&document_upsert_cypher(doc.source_type.node_label()))
        .param("eli_uri", doc.eli_uri.as_str())
        .param("now", Utc::now().to_rfc3339())
        .param("source_type", doc.source_type.as_str())
        .param("title_de", doc.title_de.as_str())
        .param("title_en", opt(&doc.title_en))
        .param("title_fr", opt(&doc.title_fr))
        .param("celex_number", opt(&doc.celex_number))
        .param("ecli", opt(&doc.ecli))
        .param("bgbl_reference", opt(&doc.bgbl_reference))
        .param("ojeu_reference", opt(&doc.ojeu_reference))
        .param("date_document", opt_date(&doc.date_document))
        .param(
            "first_date_entry_in_force",
            opt_date(&doc.first_date_entry_in_force),
        )
        .param("last_amended", opt_date(&doc.last_amended))
        .param(
            "transposition_deadline",
            opt_date(&doc.transposition_deadline),
        )
        .param("policy_area", doc.policy_area.as_str())
        .param(
            "subject_matter",
            serde_json::to_string(&doc.subject_matter).unwrap_or_default(),
        )
        .param("responsible_authority", opt(&doc.responsible_authority))
        .param("sponsoring_ministry", opt(&doc.sponsoring_ministry))
        .param("article_count", doc.article_count as i64)
        .param("amendment_count", doc.amendment_count as i64)
        .param("completeness_score", doc.completeness_score)
        .param("validation_status", doc.validation_status.as_str())
        .param("data_quality_issues", doc.data_quality_issues.clone())
        .param("source_reliability", doc.source_reliability.as_str())
        .param("ingestion_source", doc.ingestion_source.as_str())
        .param("document_hash", hash)
}

/// Cypher for an endpoint-checked, merge-on-type relationship upsert
fn relationship_merge_cypher(
    from_label: NodeLabel,
    to_label: NodeLabel,
    rel_type: RelationshipType,
    property_keys: &[String],
) -> String {
    let set_clause = if property_keys.is_empty() {
        String::new()
    } else {
        let assignments: Vec<String> = property_keys
            .iter()
            .map(|k| format!("r.{} = $p_{}", k, k))
            .collect();
        format!(" SET {}", assignments.join(", "))
    };

    format!(
        "MATCH (from:{} {{eli_uri: $from_uri}}) \
         MATCH (to:{} {{eli_uri: $to_uri}}) \
         MERGE (from)-[r:{}]->(to)\
         {} \
         RETURN type(r) AS rel_type",
        from_label.as_str(),
        to_label.as_str(),
        rel_type.as_str(),
        set_clause
    )
}

/// Bind one JSON property value as a typed query parameter
fn bind_json_param(q: Query, name: &str, value: &serde_json::Value) -> Query {
    match value {
        serde_json::Value::String(s) => q.param(name, s.as_str()),
        serde_json::Value::Number(n) if n.is_i64() => q.param(name, n.as_i64().unwrap_or(0)),
        serde_json::Value::Number(n) => q.param(name, n.as_f64().unwrap_or(0.0)),
        serde_json::Value::Bool(b) => q.param(name, *b),
        other => q.param(name, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LawSourceType;

    #[test]
    fn document_upsert_merges_on_eli_uri_per_label() {
        let cypher = document_upsert_cypher(LawSourceType::GermanLaw.node_label());
        assert!(cypher.starts_with("MERGE (d:GermanLaw {eli_uri: $eli_uri})"));
        assert!(cypher.contains("d.completeness_score = $completeness_score"));
        assert!(cypher.contains("d.document_hash = $document_hash"));

        let eu = document_upsert_cypher(LawSourceType::EuDirective.node_label());
        assert!(eu.starts_with("MERGE (d:EUDirective"));
    }

    #[test]
    fn relationship_merge_checks_both_endpoints_before_the_edge() {
        let cypher = relationship_merge_cypher(
            NodeLabel::EuDirective,
            NodeLabel::GermanLaw,
            RelationshipType::Implements,
            &["status".to_string()],
        );
        assert!(cypher.starts_with("MATCH (from:EUDirective {eli_uri: $from_uri})"));
        assert!(cypher.contains("MATCH (to:GermanLaw {eli_uri: $to_uri})"));
        assert!(cypher.contains("MERGE (from)-[r:IMPLEMENTS]->(to)"));
        assert!(cypher.contains("SET r.status = $p_status"));
        assert!(cypher.ends_with("RETURN type(r) AS rel_type"));
    }

    #[test]
    fn relationship_merge_without_properties_has_no_set_clause() {
        let cypher = relationship_merge_cypher(
            NodeLabel::GermanLaw,
            NodeLabel::EuRegulation,
            RelationshipType::CoordinatesWith,
            &[],
        );
        assert!(!cypher.contains(" SET "));
    }

    #[test]
    fn property_keys_must_be_plain_identifiers() {
        assert!(is_valid_property_key("relevance_score"));
        assert!(is_valid_property_key("_internal"));
        assert!(!is_valid_property_key("1weird"));
        assert!(!is_valid_property_key("drop;match"));
        assert!(!is_valid_property_key(""));
    }

    #[test]
    fn version_uris_append_the_effective_date_to_the_article_key() {
        let date = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
        assert_eq!(
            version_uri("eli:de:sgb:6:43", date),
            "eli:de:sgb:6:43:2023-03-01"
        );
    }

    #[test]
    fn version_ordering_rejects_regressions_and_allows_ties() {
        let older = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let newer = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
        assert!(version_regresses(newer, older));
        assert!(!version_regresses(older, newer));
        // Equal dates: later ingestion wins, not an error
        assert!(!version_regresses(newer, newer));
    }
}
