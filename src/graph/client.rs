//! # Graph Store Client
//!
//! ## Purpose
//! Pooled connection to the property-graph store. Verifies connectivity at
//! startup (an unreachable store is fatal before any pipeline stage runs) and
//! applies the declarative schema bootstrap file of constraints and indexes
//! that idempotent merge correctness relies on.
//!
//! ## Input/Output Specification
//! - **Input**: Connection settings, Cypher schema bootstrap file
//! - **Output**: A verified `neo4rs::Graph` pool shared by the writer
//! - **Sessions**: One scoped session/transaction per batch, released
//!   unconditionally by the driver pool

use crate::config::GraphConfig;
use crate::errors::{IngestError, Result};
use neo4rs::{query, ConfigBuilder, Graph};
use std::path::Path;
use tracing::{debug, info, warn};

/// Client wrapper around the store connection pool
pub struct GraphClient {
    /// Underlying driver pool; the writer issues statements through this
    pub graph: Graph,
    uri: String,
}

impl GraphClient {
    /// Connect to the store and verify connectivity.
    ///
    /// Fails with `GraphUnavailable` before any pipeline stage runs if the
    /// store cannot be reached or authentication fails.
    pub async fn connect(config: &GraphConfig) -> Result<Self> {
        info!("Connecting to graph store at {}", config.uri);

        let driver_config = ConfigBuilder::default()
            .uri(config.uri.as_str())
            .user(config.user.as_str())
            .password(config.password.as_str())
            .db(config.database.as_str())
            .max_connections(config.max_connections)
            .build()
            .map_err(|e| IngestError::GraphUnavailable {
                uri: config.uri.clone(),
                details: e.to_string(),
            })?;

        let graph =
            Graph::connect(driver_config)
                .await
                .map_err(|e| IngestError::GraphUnavailable {
                    uri: config.uri.clone(),
                    details: e.to_string(),
                })?;

        let client = Self {
            graph,
            uri: config.uri.clone(),
        };
        client.verify_connectivity().await?;
        info!("Connected to graph store at {}", config.uri);

        Ok(client)
    }

    /// Round-trip a trivial statement to prove the store is reachable
    async fn verify_connectivity(&self) -> Result<()> {
        let mut rows = self.graph.execute(query("RETURN 1 AS ok")).await.map_err(|e| {
            IngestError::GraphUnavailable {
                uri: self.uri.clone(),
                details: e.to_string(),
            }
        })?;
        rows.next()
            .await
            .map_err(|e| IngestError::GraphUnavailable {
                uri: self.uri.clone(),
                details: e.to_string(),
            })?;
        Ok(())
    }

    /// Bolt URI this client is connected to
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Apply the schema bootstrap file: one Cypher statement per `;`-separated
    /// block, `//` comment lines stripped. Statements that fail because the
    /// constraint or index already exists are logged and skipped.
    pub async fn apply_schema<P: AsRef<Path>>(&self, schema_file: P) -> Result<usize> {
        let path = schema_file.as_ref();
        info!("Applying graph schema from {:?}", path);

        let content = std::fs::read_to_string(path).map_err(|e| IngestError::Config {
            message: format!("Failed to read schema file {:?}: {}", path, e),
        })?;

        let mut applied = 0;
        for block in content.split(';') {
            let statement: String = block
                .lines()
                .filter(|line| !line.trim_start().starts_with("//"))
                .collect::<Vec<_>>()
                .join("\n");
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }

            match self.graph.run(query(statement)).await {
                Ok(()) => {
                    applied += 1;
                    debug!("Applied schema statement: {:.60}", statement);
                }
                Err(e) => {
                    warn!("Schema statement skipped (may already exist): {}", e);
                }
            }
        }

        info!("Schema applied: {} statement(s)", applied);
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    // Statement splitting is exercised without a live store by reusing the
    // same parsing the client applies.
    fn split_statements(content: &str) -> Vec<String> {
        content
            .split(';')
            .map(|block| {
                block
                    .lines()
                    .filter(|line| !line.trim_start().starts_with("//"))
                    .collect::<Vec<_>>()
                    .join("\n")
                    .trim()
                    .to_string()
            })
            .filter(|s| !s.is_empty())
            .collect()
    }

    #[test]
    fn schema_files_split_on_semicolons_and_drop_comments() {
        let content = "\
// Uniqueness constraints
CREATE CONSTRAINT article_eli_uri IF NOT EXISTS
FOR (a:Article) REQUIRE a.eli_uri IS UNIQUE;

// Indexes
CREATE INDEX article_date IF NOT EXISTS
FOR (a:Article) ON (a.effective_date);
";
        let statements = split_statements(content);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE CONSTRAINT article_eli_uri"));
        assert!(statements[1].contains("article_date"));
    }
}
