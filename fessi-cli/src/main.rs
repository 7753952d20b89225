//! Command line for importing facilities and waste items into the Fessi graph.

mod cli;
mod report;

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use fessi_core::{FessiService, ImportError};
use fessi_neo4j::Neo4jStore;
use reqwest::Client;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, import_options};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Cli::parse();
    init_logging(args.verbose);

    // HTTP + service setup
    let client = Client::builder().user_agent("fessi/0.1").build()?;
    let store = Neo4jStore::new(client, args.connection.into());
    let service = FessiService::new(Arc::new(store));

    match args.command {
        Command::Facilities { file, dry_run } => {
            match service.import_facilities(&file, dry_run).await {
                Ok(stats) => report::print_facility_stats(&stats),
                Err(err) => return import_failed(&err),
            }
        }
        Command::WasteItems {
            file,
            dry_run,
            create_placeholders,
        } => {
            let options = import_options(dry_run, create_placeholders);
            match service.import_waste_items(&file, options).await {
                Ok(stats) => report::print_waste_item_stats(&stats),
                Err(err) => return import_failed(&err),
            }
        }
        Command::Db { reset, yes, stats } => {
            service
                .verify_connectivity()
                .await
                .context("failed to connect to Neo4j")?;
            info!("successfully connected to Neo4j");

            if reset {
                if yes || confirm_reset()? {
                    service.clear_all().await?;
                    info!("database cleared");
                } else {
                    info!("reset cancelled");
                }
            }
            if stats || !reset {
                report::print_graph_stats(&service.stats().await?);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn import_failed(err: &ImportError) -> Result<ExitCode> {
    if err.is_not_found() {
        error!("{err}");
    } else {
        error!("import failed: {err}");
    }
    Ok(ExitCode::FAILURE)
}

fn confirm_reset() -> Result<bool> {
    let mut stderr = io::stderr();
    write!(stderr, "Are you sure you want to delete all data? (yes/no): ")?;
    stderr.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("yes"))
}
