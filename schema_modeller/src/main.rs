//! schema_modeller CLI - inspect, diff and synchronize database schemas.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use schema_modeller::{config, manifest, utils, Database, SchemaSyncClient};

#[derive(Parser)]
#[command(name = "schema_modeller")]
#[command(about = "Reconcile a live database schema with a desired-schema manifest")]
#[command(version)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "schema_modeller.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the live schema as JSON
    Inspect {
        /// Only print this table
        #[arg(long)]
        table: Option<String>,
    },

    /// Print the differences between the live schema and a manifest
    Diff {
        #[arg(long)]
        manifest: PathBuf,
    },

    /// Change the live schema to match a manifest
    Sync {
        #[arg(long)]
        manifest: PathBuf,

        /// Drop columns the manifest does not list
        #[arg(long)]
        delete_missing_columns: bool,

        /// Drop indexes the manifest does not list
        #[arg(long)]
        delete_missing_indexes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.to_string_lossy();
    let config = config::load_from_file(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;
    utils::init_logging(&config.logging)?;

    let client = SchemaSyncClient::new(config).await?;
    let result = run(&client, cli.command).await;
    client.close().await;
    result
}

async fn run(client: &SchemaSyncClient, command: Commands) -> Result<()> {
    match command {
        Commands::Inspect { table } => match table {
            Some(name) => {
                let database = &client.config().database.name;
                let table = client.modeller().read_table(database, &name).await?;
                println!("{}", serde_json::to_string_pretty(&table)?);
            }
            None => {
                let database = client.read_database().await?;
                println!("{}", serde_json::to_string_pretty(&database)?);
            }
        },
        Commands::Diff { manifest } => {
            let want = load_manifest(&manifest)?;
            for (table, diffs) in client.plan_database(&want).await? {
                if diffs.is_empty() {
                    println!("{}: in sync", table);
                    continue;
                }
                println!("{}:", table);
                for diff in diffs {
                    println!("  {}", diff);
                }
            }
        }
        Commands::Sync {
            manifest,
            delete_missing_columns,
            delete_missing_indexes,
        } => {
            let want = load_manifest(&manifest)?;
            let sync = &client.config().sync;
            let synchronizer = client
                .synchronizer()
                .delete_missing_columns(sync.delete_missing_columns || delete_missing_columns)
                .delete_missing_indexes(sync.delete_missing_indexes || delete_missing_indexes);

            let actions = client.sync_database(&want, &synchronizer).await?;
            println!("{}", serde_json::to_string_pretty(&actions)?);
        }
    }

    Ok(())
}

fn load_manifest(path: &Path) -> Result<Database> {
    manifest::load_from_file(path)
        .with_context(|| format!("Failed to load manifest from {}", path.display()))
}
