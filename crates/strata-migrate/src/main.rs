//! strata CLI
//!
//! Command-line tool for declarative MySQL migrations.

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use strata_core::datatype::registry;
use strata_migrate::prelude::*;

/// Declarative MySQL schema migrations.
#[derive(Parser)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project directory.
    #[arg(long, global = true, default_value = ".")]
    cwd: PathBuf,

    /// Configuration file (defaults to `<cwd>/strata.yml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Configuration environment.
    #[arg(long, global = true, env = "STRATA_ENV", default_value = "development")]
    env: String,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the project layout and a starter configuration.
    Init,

    /// Generate a migration file from model changes.
    #[command(name = "migrate:make")]
    Make {
        /// Show SQL without writing a file (dry run).
        #[arg(long)]
        dry_run: bool,
    },

    /// Apply every pending migration file.
    #[command(name = "migrate:latest")]
    Latest {
        /// Show SQL without executing (dry run).
        #[arg(long)]
        dry_run: bool,
    },

    /// Roll back the latest batch.
    #[command(name = "migrate:rollback")]
    Rollback {
        /// Show SQL without executing (dry run).
        #[arg(long)]
        dry_run: bool,
    },

    /// Create empty model files.
    #[command(name = "model:generate")]
    GenerateModels {
        /// Table names.
        #[arg(required = true)]
        tables: Vec<String>,
    },

    /// Describe supported datatypes.
    Datatype {
        /// Datatype names.
        types: Vec<String>,

        /// List every supported datatype.
        #[arg(short, long)]
        all: bool,
    },
}

fn render(records: &[LogRecord]) {
    for record in records {
        match record.level {
            LogLevel::Info | LogLevel::Success => info!("{}", record.message),
            LogLevel::Warn => warn!("{}", record.message),
            LogLevel::Error => error!("{}", record.message),
        }
    }
}

fn datatype(types: &[String], all: bool) -> anyhow::Result<()> {
    if all {
        info!("Supported datatypes:");
        for name in registry().names() {
            println!("  {name}");
        }
        return Ok(());
    }
    if types.is_empty() {
        let mut command = Cli::command();
        if let Some(subcommand) = command.find_subcommand_mut("datatype") {
            subcommand.print_help()?;
        }
        return Ok(());
    }
    for name in types {
        match registry().get(name) {
            Some(descriptor) => {
                println!("{name}: {}", serde_json::to_string_pretty(&descriptor.describe())?);
            }
            None => warn!("Unknown datatype \"{name}\"."),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let load_config = || {
        let path = cli.config.clone().unwrap_or_else(|| cli.cwd.join(CONFIG_FILE));
        Config::load(&path, cli.cwd.clone(), &cli.env)
    };

    let records = match cli.command {
        Commands::Init => init(&cli.cwd).await?,

        Commands::GenerateModels { ref tables } => {
            let models_dir = load_config()
                .map_or_else(|_| cli.cwd.join("models"), |config| config.models_dir());
            generate_models(&models_dir, tables, cli.verbose).await?
        }

        Commands::Datatype { ref types, all } => {
            datatype(types, all)?;
            Vec::new()
        }

        Commands::Make { dry_run } => {
            let migrator = Migrator::new(load_config()?).dry_run(dry_run).verbose(cli.verbose);
            migrator.run(Command::Make).await?
        }

        Commands::Latest { dry_run } => {
            let migrator = Migrator::new(load_config()?).dry_run(dry_run).verbose(cli.verbose);
            migrator.run(Command::Latest).await?
        }

        Commands::Rollback { dry_run } => {
            let migrator = Migrator::new(load_config()?).dry_run(dry_run).verbose(cli.verbose);
            migrator.run(Command::Rollback).await?
        }
    };
    render(&records);

    Ok(())
}
