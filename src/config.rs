//! # Configuration Management Module
//!
//! ## Purpose
//! Centralized configuration for the ingestion pipeline: graph store
//! connection, per-source adapter settings, batching and retry tuning, and
//! logging. Supports TOML files with environment variable overrides and
//! validation before any component starts.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration files (TOML), environment variables
//! - **Output**: Validated configuration structs with defaults and overrides
//! - **Validation**: Non-empty connection settings, sane batch/concurrency values
//!
//! ## Configuration Sources (in order of precedence)
//! 1. Environment variables (`LEGAL_GRAPH_*`)
//! 2. Configuration file
//! 3. Default values

use crate::errors::{IngestError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure containing all system settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Graph store connection settings
    pub graph: GraphConfig,
    /// Pipeline batching, concurrency, and retry settings
    pub ingestion: IngestionConfig,
    /// Per-source adapter settings
    pub sources: SourcesConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Graph store (Neo4j) connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Bolt URI of the store (bolt://host:port)
    pub uri: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Database name
    pub database: String,
    /// Maximum connection pool size
    pub max_connections: usize,
    /// Path to the Cypher schema bootstrap file (constraints + indexes)
    pub schema_file: PathBuf,
}

/// Pipeline tuning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Documents per write batch
    pub batch_size: usize,
    /// Maximum adapters fetching concurrently
    pub max_concurrent_fetches: usize,
    /// Optional cap on records fetched per adapter per run
    pub fetch_limit: Option<usize>,
    /// Fetch retry attempts for recoverable source errors
    pub retry_attempts: u32,
    /// Delay between fetch retries in seconds
    pub retry_delay_seconds: u64,
}

/// Per-source adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// gesetze-im-internet.de (German statutes)
    pub gesetze: GesetzeConfig,
    /// EUR-Lex SPARQL endpoint (EU regulations and directives)
    pub eurlex: EurLexConfig,
}

/// gesetze-im-internet.de adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GesetzeConfig {
    /// Enable this source for pipeline runs
    pub enabled: bool,
    /// Base URL of the statute index
    pub base_url: String,
    /// Rate limit: requests per minute
    pub rate_limit_rpm: u32,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

/// EUR-Lex SPARQL adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EurLexConfig {
    /// Enable this source for pipeline runs
    pub enabled: bool,
    /// SPARQL endpoint URL
    pub sparql_endpoint: String,
    /// Results per SPARQL page
    pub page_size: usize,
    /// Rate limit: requests per minute
    pub rate_limit_rpm: u32,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable structured JSON logging
    pub json_format: bool,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::from_file("config.toml")
    }

    /// Load configuration from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!("Configuration file not found: {:?}, using defaults", path);
            let mut config = Self::default();
            config.apply_env_overrides()?;
            config.validate()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path).map_err(|e| IngestError::Config {
            message: format!("Failed to read config file {:?}: {}", path, e),
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| IngestError::Config {
            message: format!("Failed to parse config file {:?}: {}", path, e),
        })?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(uri) = std::env::var("LEGAL_GRAPH_NEO4J_URI") {
            self.graph.uri = uri;
        }
        if let Ok(user) = std::env::var("LEGAL_GRAPH_NEO4J_USER") {
            self.graph.user = user;
        }
        if let Ok(password) = std::env::var("LEGAL_GRAPH_NEO4J_PASSWORD") {
            self.graph.password = password;
        }
        if let Ok(database) = std::env::var("LEGAL_GRAPH_NEO4J_DATABASE") {
            self.graph.database = database;
        }
        if let Ok(level) = std::env::var("LEGAL_GRAPH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(batch_size) = std::env::var("LEGAL_GRAPH_BATCH_SIZE") {
            self.ingestion.batch_size =
                batch_size.parse().map_err(|_| IngestError::Config {
                    message: "Invalid batch size in LEGAL_GRAPH_BATCH_SIZE".to_string(),
                })?;
        }
        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.graph.uri.is_empty() {
            return Err(IngestError::Config {
                message: "graph.uri must not be empty".to_string(),
            });
        }
        if self.graph.max_connections == 0 {
            return Err(IngestError::Config {
                message: "graph.max_connections must be greater than zero".to_string(),
            });
        }
        if self.ingestion.batch_size == 0 {
            return Err(IngestError::Config {
                message: "ingestion.batch_size must be greater than zero".to_string(),
            });
        }
        if self.ingestion.max_concurrent_fetches == 0 {
            return Err(IngestError::Config {
                message: "ingestion.max_concurrent_fetches must be greater than zero".to_string(),
            });
        }
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(IngestError::Config {
                    message: format!("Invalid log level: {}", other),
                });
            }
        }
        Ok(())
    }

    /// Get configuration as TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| IngestError::Config {
            message: format!("Failed to serialize config to TOML: {}", e),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            graph: GraphConfig {
                uri: "bolt://localhost:7687".to_string(),
                user: "neo4j".to_string(),
                password: "password".to_string(),
                database: "neo4j".to_string(),
                max_connections: 16,
                schema_file: PathBuf::from("schema/legal_graph.cypher"),
            },
            ingestion: IngestionConfig {
                batch_size: 100,
                max_concurrent_fetches: num_cpus::get().min(4),
                fetch_limit: None,
                retry_attempts: 3,
                retry_delay_seconds: 5,
            },
            sources: SourcesConfig {
                gesetze: GesetzeConfig {
                    enabled: true,
                    base_url: "https://www.gesetze-im-internet.de".to_string(),
                    rate_limit_rpm: 60,
                    timeout_seconds: 30,
                },
                eurlex: EurLexConfig {
                    enabled: true,
                    sparql_endpoint: "https://publications.europa.eu/webapi/rdf/sparql"
                        .to_string(),
                    page_size: 100,
                    rate_limit_rpm: 30,
                    timeout_seconds: 60,
                },
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json_format: false,
            },
        }
    }
}
