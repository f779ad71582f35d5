//! migrateiq - Oracle to Snowflake DDL converter

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use migrateiq::cli::commands::convert::{ConvertArgs, handle_convert};
use migrateiq::cli::logging;

#[derive(Parser)]
#[command(name = "migrateiq")]
#[command(about = "Convert Oracle DDL to Snowflake DDL with a large language model", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert Oracle DDL into Snowflake DDL
    Convert(ConvertArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert(args) => {
            if let Err(e) = logging::init(args.verbose) {
                eprintln!("Warning: {e:#}");
            }

            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupt received, cancelling conversion");
                    trigger.cancel();
                }
            });

            match handle_convert(&args, cancel).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("Error: {}", e.user_message());
                    ExitCode::FAILURE
                }
            }
        }
    }
}
