use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use fessi_core::{ImportOptions, PlaceholderPolicy};
use fessi_neo4j::Neo4jConfig;

const DEFAULT_DIRECTORY: &str = "data/disposal_map_db.json";
const DEFAULT_CATALOG: &str = "data/Abfall-ABC_new.csv";

#[derive(Debug, Parser)]
#[command(name = "fessi")]
#[command(about = "Build the Fessi waste-disposal knowledge graph in Neo4j")]
#[command(version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Enable debug output (`RUST_LOG` takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Import disposal facilities from the facility directory JSON
    Facilities {
        /// Path to disposal_map_db.json
        #[arg(short, long, default_value = DEFAULT_DIRECTORY)]
        file: PathBuf,

        /// Show what would be imported without making changes
        #[arg(short = 'n', long)]
        dry_run: bool,
    },
    /// Import waste items and their disposal targets from the catalog CSV
    WasteItems {
        /// Path to Abfall-ABC_new.csv
        #[arg(short, long, default_value = DEFAULT_CATALOG)]
        file: PathBuf,

        /// Show what would be imported without making changes
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Create placeholder facilities for targets missing from the directory
        #[arg(long)]
        create_placeholders: bool,
    },
    /// Check the database connection, show statistics, or reset the graph
    Db {
        /// Delete all nodes and relationships
        #[arg(long)]
        reset: bool,

        /// Skip the confirmation prompt for --reset
        #[arg(long, requires = "reset")]
        yes: bool,

        /// Show node and relationship counts (default unless --reset is given)
        #[arg(long)]
        stats: bool,
    },
}

#[derive(Debug, Args)]
pub(crate) struct ConnectionArgs {
    /// Neo4j HTTP URI
    #[arg(long, env = "NEO4J_URI", default_value = "http://localhost:7474", global = true)]
    pub uri: String,

    /// Neo4j user name
    #[arg(long, env = "NEO4J_USER", default_value = "neo4j", global = true)]
    pub user: String,

    /// Neo4j password
    #[arg(
        long,
        env = "NEO4J_PASSWORD",
        default_value = "neo4j_dev",
        hide_env_values = true,
        global = true
    )]
    pub password: String,

    /// Neo4j database name
    #[arg(long, env = "NEO4J_DATABASE", default_value = "neo4j", global = true)]
    pub database: String,
}

impl From<ConnectionArgs> for Neo4jConfig {
    fn from(args: ConnectionArgs) -> Self {
        Neo4jConfig {
            uri: args.uri,
            user: args.user,
            password: args.password,
            database: args.database,
        }
    }
}

pub(crate) fn import_options(dry_run: bool, create_placeholders: bool) -> ImportOptions {
    ImportOptions {
        dry_run,
        placeholders: if create_placeholders {
            PlaceholderPolicy::Create
        } else {
            PlaceholderPolicy::Skip
        },
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_waste_item_import() {
        let cli = Cli::try_parse_from([
            "fessi",
            "waste-items",
            "--dry-run",
            "--create-placeholders",
            "-f",
            "abc.csv",
        ])
        .expect("valid arguments");
        match cli.command {
            Command::WasteItems {
                file,
                dry_run,
                create_placeholders,
            } => {
                assert_eq!(file, PathBuf::from("abc.csv"));
                assert!(dry_run);
                assert!(create_placeholders);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn yes_requires_reset() {
        assert!(Cli::try_parse_from(["fessi", "db", "--yes"]).is_err());
    }

    #[test]
    fn placeholder_flag_selects_policy() {
        assert_eq!(import_options(false, true).placeholders, PlaceholderPolicy::Create);
        assert_eq!(import_options(true, false).placeholders, PlaceholderPolicy::Skip);
    }
}
