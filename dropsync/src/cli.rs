///
/// This module implements the CLI interface for dropsync: argument parsing,
/// pairing of path arguments, and the async entrypoint used by `main` and
/// integration tests.
///
/// All decision logic lives in the [`dropsync-core`] crate. This module only
/// wires the real collaborators (HTTP client, terminal, console) into it.
///
/// [`dropsync-core`]: ../../dropsync_core/
use anyhow::{bail, Context, Result};
use clap::Parser;

use dropsync_core::config::SyncOptions;
use dropsync_core::contract::SyncPair;
use dropsync_core::probe::BatchGate;
use dropsync_core::synchronise::{SynchroniseReport, Synchroniser};

use crate::client::DropboxClient;
use crate::load_config::load_config;
use crate::prompt::{ConsoleNotifier, TerminalGate};

/// CLI for dropsync: reconcile local files with their remote copies.
#[derive(Parser, Debug)]
#[clap(
    name = "dropsync",
    version,
    about = "Sync local files with a remote content store, using block-hash fingerprints to skip unchanged files"
)]
pub struct Cli {
    /// Do not report files that are already in sync
    #[clap(short, long)]
    pub quiet: bool,

    /// Transfer without asking for confirmation
    #[clap(short = 'y', long = "yes")]
    pub yes: bool,

    /// Alternating local and remote paths: LOCAL REMOTE [LOCAL REMOTE ...]
    #[clap(required = true, value_name = "PATH")]
    pub paths: Vec<String>,
}

impl Cli {
    pub fn options(&self) -> SyncOptions {
        SyncOptions {
            quiet: self.quiet,
            assume_yes: self.yes,
            default_answer: false,
        }
    }

    /// Groups the positional arguments into (local, remote) pairs, in order.
    pub fn pairs(&self) -> Result<Vec<SyncPair>> {
        if self.paths.is_empty() || self.paths.len() % 2 != 0 {
            bail!(
                "expected alternating LOCAL REMOTE paths, got {} argument(s)",
                self.paths.len()
            );
        }
        Ok(self
            .paths
            .chunks(2)
            .map(|pair| SyncPair::new(&pair[0], pair[1].clone()))
            .collect())
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main().
///
/// Errors returned here are setup failures; per-pair failures are inside the
/// returned report.
pub async fn run(cli: Cli) -> Result<SynchroniseReport> {
    tracing::info!("trace_initialised");

    let pairs = cli.pairs()?;
    let settings = load_config().context("setup failed")?;
    let client = DropboxClient::new(&settings).context("setup failed")?;

    let options = cli.options();
    options.trace_loaded();
    tracing::info!(pairs = pairs.len(), "Starting synchronisation");

    let notifier = ConsoleNotifier;
    let report = if options.assume_yes {
        let gate = BatchGate::always(true);
        Synchroniser::new(options, &client, &client, &gate, &notifier)
            .run(&pairs)
            .await
    } else {
        let gate = TerminalGate::stdio();
        Synchroniser::new(options, &client, &client, &gate, &notifier)
            .run(&pairs)
            .await
    };

    tracing::info!(
        transferred = report.transferred(),
        failed = report.failed(),
        conflicts = report.conflicts(),
        "Synchronisation complete"
    );
    Ok(report)
}
