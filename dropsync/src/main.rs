use std::process::ExitCode;

use clap::Parser;
use dropsync::cli::{run, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so they never interleave with prompts and outcome lines.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::info!("CLI arguments parsed, invoking run");

    match run(cli).await {
        Ok(report) if report.failed() == 0 => {
            tracing::info!("CLI completed successfully");
            ExitCode::SUCCESS
        }
        Ok(report) => {
            tracing::error!(failed = report.failed(), "Some pairs failed to sync");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("[ERROR] {e:#}");
            tracing::error!(error = %e, "CLI exited with error");
            ExitCode::FAILURE
        }
    }
}
