use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stepwise::{MigratorConfig, Version};

mod commands;

#[derive(Parser)]
#[command(name = "stepwise-cli")]
#[command(about = "Run, roll back and inspect versioned data migrations")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./stepwise.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every registered job up to a version
    Migrate {
        /// Highest version to migrate to (all versions when omitted)
        #[arg(long)]
        to: Option<Version>,

        /// Source rows per page (overrides migration.page_size)
        #[arg(long)]
        page_size: Option<u64>,
    },

    /// Undo every job newer than a version, newest first
    Rollback {
        /// Version to roll back to (0.0.0 undoes everything)
        #[arg(long)]
        to: Version,
    },

    /// List the jobs a migration would run, without touching any store
    Plan {
        /// Highest version to include
        #[arg(long)]
        to: Option<Version>,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show target rows per version tag for every entity
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => MigratorConfig::from_file(path)?,
        None => MigratorConfig::load()?,
    };

    // RUST_LOG wins over both --verbose and the configured level
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Migrate { to, page_size } => commands::migrate::run(&config, to, page_size).await,
        Commands::Rollback { to } => commands::rollback::run(&config, to).await,
        Commands::Plan { to, format } => commands::plan::run(to, &format),
        Commands::Status => commands::status::run(&config).await,
    }
}
