//! CLI binary entry point for reference-data-loader

#[cfg(feature = "cli")]
mod commands;
#[cfg(feature = "cli")]
mod logging;

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use commands::GlobalArgs;
#[cfg(feature = "cli")]
use commands::load::LoadArgs;
#[cfg(feature = "cli")]
use logging::{LogConfig, LogFormat};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "reference-data-loader")]
#[command(about = "Load CSV reference datasets into a relational database")]
#[command(version)]
struct Cli {
    /// Directory holding .reference-data.toml
    #[arg(short = 'C', long, global = true, default_value = ".")]
    workdir: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Omit timestamps from log lines
    #[arg(long, global = true)]
    no_timestamps: bool,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Load datasets in a single transaction
    Load {
        /// Datasets to load (defaults to every configured dataset)
        datasets: Vec<String>,
        /// Rows per insert batch
        #[arg(short, long)]
        batch_size: Option<usize>,
        /// Print the load report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the configuration checksum of datasets
    Checksum {
        /// Datasets to include (defaults to every configured dataset)
        datasets: Vec<String>,
    },
    /// Create tables from the package descriptor (development only)
    GenerateTables {
        /// Datasets whose tables to create (defaults to every resource)
        datasets: Vec<String>,
        /// Run even when table generation is disabled in the configuration
        #[arg(long)]
        force: bool,
    },
    /// Write a sample configuration file
    InitConfig {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_logging(
        &LogConfig::from_verbosity(cli.verbose)
            .with_format(cli.log_format)
            .with_timestamps(!cli.no_timestamps),
    );

    let result = match cli.command {
        Commands::Load {
            datasets,
            batch_size,
            json,
        } => {
            let global = GlobalArgs {
                workdir: cli.workdir,
                datasets,
            };
            commands::load::handle_load(&global, &LoadArgs { batch_size, json }).await
        }
        Commands::Checksum { datasets } => {
            let global = GlobalArgs {
                workdir: cli.workdir,
                datasets,
            };
            commands::checksum::handle_checksum(&global)
        }
        Commands::GenerateTables { datasets, force } => {
            let global = GlobalArgs {
                workdir: cli.workdir,
                datasets,
            };
            commands::tables::handle_generate_tables(&global, force).await
        }
        Commands::InitConfig { force } => commands::init::handle_init_config(&cli.workdir, force),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature is not enabled. Build with --features cli");
    std::process::exit(1);
}
