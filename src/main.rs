use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use private_banking::{table_counts, Catalog, Config, SchemaVariant, Store};

/// Admin tool for the private banking database
#[derive(Parser)]
#[command(name = "private-banking", version)]
struct Cli {
    /// SQLite file (overrides BANKING_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Schema variant, a or b (overrides BANKING_SCHEMA_VARIANT)
    #[arg(long, global = true)]
    variant: Option<SchemaVariant>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the variant's tables if they do not exist
    Init,
    /// Print the entity descriptors as JSON
    Schema,
    /// Row count per table
    Stats,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(variant) = cli.variant {
        config.schema_variant = variant;
    }
    let catalog = Catalog::new(config.schema_variant);

    match cli.command {
        Commands::Init => run_init(&config, &catalog),
        Commands::Schema => run_schema(&catalog),
        Commands::Stats => run_stats(&config, &catalog),
    }
}

fn run_init(config: &Config, catalog: &Catalog) -> Result<()> {
    let store = Store::open(&config.db_path, config.busy_timeout())?;
    store.setup(catalog)?;

    println!(
        "✓ Schema variant {} ready in {}",
        catalog.variant(),
        config.db_path.display()
    );
    for descriptor in catalog.descriptors() {
        println!("  {} -> /{}", descriptor.table, descriptor.path);
    }
    Ok(())
}

fn run_schema(catalog: &Catalog) -> Result<()> {
    let json = serde_json::to_string_pretty(catalog.descriptors())?;
    println!("{}", json);
    Ok(())
}

fn run_stats(config: &Config, catalog: &Catalog) -> Result<()> {
    if !config.db_path.exists() {
        anyhow::bail!(
            "Database not found at {} (run `private-banking init` first)",
            config.db_path.display()
        );
    }

    let conn = rusqlite::Connection::open(&config.db_path)?;

    for (table, count) in table_counts(&conn, catalog)? {
        println!("{:<14} {:>8}", table, count);
    }
    Ok(())
}
