//! Command line client for job lifecycle actions.
//!
//! Run with: cargo run --bin batchctl -- job resume -N <namespace> -n <job>

use anyhow::Result;
use batch_controller::cli::job::{self, JobCommand};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Manage batch jobs", long_about = None)]
struct Cli {
    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Job lifecycle operations
    #[command(subcommand)]
    Job(JobCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cli.log_level))
        .init();

    match cli.command {
        Commands::Job(command) => {
            job::execute(&command).await?;
            println!(
                "{} submitted for job {}/{}",
                command.action(),
                command.flags().namespace,
                command.flags().name
            );
        }
    }

    Ok(())
}
