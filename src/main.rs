use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxseed::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Backfill the daily rate history for past days
    Backfill {
        /// Number of past days to fetch, ending yesterday (UTC)
        #[arg(short, long)]
        days: Option<u32>,
        /// Dates fetched concurrently per chunk
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Pause between chunks in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Treat this UTC date (YYYY-MM-DD) as today
        #[arg(long)]
        today: Option<chrono::NaiveDate>,
    },
    /// Refresh the latest-rates cache and today's history row
    Latest,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fxseed::cli::setup::setup(),
        Some(Commands::Backfill {
            days,
            chunk_size,
            delay_ms,
            today,
        }) => {
            let overrides = fxseed::BackfillOverrides {
                days,
                chunk_size,
                delay_ms,
                today,
            };
            fxseed::run_command(fxseed::AppCommand::Backfill(overrides), cli.config_path.as_deref())
                .await
        }
        Some(Commands::Latest) => {
            fxseed::run_command(fxseed::AppCommand::Latest, cli.config_path.as_deref()).await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
