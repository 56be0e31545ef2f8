use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use st_cli::commands::{clear, list, rate, start, status, stop, util};
use st_cli::{Cli, Commands, Config};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(Arc<st_db::Database>, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = st_db::Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    Ok((Arc::new(db), config))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (db, config) = open_database(cli.config.as_deref())?;
    let labels = util::local_labels();
    let mut stdout = std::io::stdout().lock();

    match command {
        Commands::Status => status::run(&mut stdout, db, &config.database_path, labels).await?,
        Commands::Start => start::run(&mut stdout, db, labels).await?,
        Commands::Stop { quality } => stop::run(&mut stdout, db, labels, *quality).await?,
        Commands::Rate { night, quality } => rate::run(&mut stdout, db, *night, *quality).await?,
        Commands::List { json } => list::run(&mut stdout, db, labels, *json).await?,
        Commands::Clear => clear::run(&mut stdout, db, labels).await?,
    }

    Ok(())
}
