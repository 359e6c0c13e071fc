//! # Legal Graph Ingestion Driver
//!
//! ## Purpose
//! Main entry point for the ingestion pipeline. Wires already-configured
//! collaborators together (graph client, writer, source adapters), runs the
//! staged pipeline, and reports the run summary.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration file, command line arguments, environment
//! - **Output**: Populated graph store and a JSON run summary on stdout
//! - **Exit Behavior**: Configuration-level errors (unreachable store,
//!   invalid settings) are fatal before any stage runs; stage-level failures
//!   are tallied in the summary instead
//!
//! ## Architecture Flow
//! 1. Parse command line arguments and load configuration
//! 2. Initialize logging and tracing
//! 3. Connect to the graph store (fatal if unreachable)
//! 4. Optionally apply the schema bootstrap file
//! 5. Register enabled source adapters and run the pipeline
//! 6. Emit the run summary

use clap::{Arg, ArgAction, Command};
use std::sync::Arc;
use tracing::{info, warn};

use legal_graph_ingest::{
    config::Config,
    errors::{IngestError, Result},
    graph::{GraphClient, GraphWriter},
    ingestion::{FetchParams, IngestionPipeline},
    EurLexAdapter, GesetzeImInternetAdapter,
};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("legal-graph-ingest")
        .version("0.1.0")
        .author("Legal Graph Team")
        .about("Legal document ingestion pipeline with graph-based amendment tracking")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("limit")
                .short('l')
                .long("limit")
                .value_name("N")
                .help("Maximum records to fetch per source")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("apply-schema")
                .long("apply-schema")
                .help("Apply the schema bootstrap file and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("check-health")
                .long("check-health")
                .help("Verify store connectivity and exit")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").expect("has default");
    let config = Config::from_file(config_path)?;

    init_logging(&config)?;
    info!("Starting legal graph ingestion v0.1.0");
    info!("Configuration loaded from: {}", config_path);

    // An unreachable store is fatal before any stage runs
    let client = Arc::new(GraphClient::connect(&config.graph).await?);

    if matches.get_flag("check-health") {
        info!("Graph store at {} is reachable", client.uri());
        return Ok(());
    }

    if matches.get_flag("apply-schema") {
        let applied = client.apply_schema(&config.graph.schema_file).await?;
        info!("Applied {} schema statement(s)", applied);
        return Ok(());
    }

    let writer = Arc::new(GraphWriter::new(client));
    let mut pipeline = IngestionPipeline::new(config.ingestion.clone(), writer);

    if config.sources.gesetze.enabled {
        pipeline.register_adapter(Arc::new(GesetzeImInternetAdapter::new(
            config.sources.gesetze.clone(),
        )?));
    }
    if config.sources.eurlex.enabled {
        pipeline.register_adapter(Arc::new(EurLexAdapter::new(
            config.sources.eurlex.clone(),
        )?));
    }

    let params = FetchParams {
        limit: matches.get_one::<usize>("limit").copied(),
        ..Default::default()
    };

    let summary = pipeline.run(&params).await;

    if summary.failed > 0 {
        warn!("{} failure(s) recorded during the run", summary.failed);
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

/// Initialize logging and tracing from the logging configuration
fn init_logging(config: &Config) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.logging.level))
        .map_err(|e| IngestError::Config {
            message: format!("Invalid log level '{}': {}", config.logging.level, e),
        })?;

    if config.logging.json_format {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    Ok(())
}
