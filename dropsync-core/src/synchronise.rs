//! High-level loop: reconciles every (local, remote) pair in order.
//!
//! For each pair the [`Synchroniser`]:
//!   - fetches fresh remote metadata
//!   - probes the local file
//!   - asks [`decide`] which way (if any) content should flow
//!   - passes any transfer through the [`ConfirmationGate`] unless
//!     `assume_yes` is set
//!   - performs the transfer with the [`TransferExecutor`]
//!
//! # Error Handling
//! Pairs are isolated. A remote or read failure is recorded as
//! [`PairOutcome::Failed`] for that pair only and the loop carries on.
//! Nothing is retried.
//!
//! # Reporting
//! Every outcome is handed to the [`Notifier`] as it happens, except
//! "unchanged" in quiet mode. [`Synchroniser::run`] also returns the full
//! [`SynchroniseReport`] for callers that need totals.

use std::fmt;
use std::io;

use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::SyncOptions;
use crate::contract::{
    ConfirmationGate, LocalFileProbe, Notifier, RemoteMetadataReader, SyncPair, TransferExecutor,
};
use crate::decide::{decide, Decision, SyncAction};
use crate::error::SyncError;
use crate::fingerprint::fingerprint;
use crate::probe::FsProbe;
use crate::timestamp::FileTimestamp;

#[derive(Debug)]
pub enum PairOutcome {
    Unchanged,
    /// Contents differ but both sides carry the same modification time.
    Conflict { modified_at: FileTimestamp },
    Transferred(Decision),
    Declined(Decision),
    Failed(SyncError),
}

#[derive(Debug)]
pub struct PairReport {
    pub pair: SyncPair,
    pub outcome: PairOutcome,
}

impl PairReport {
    /// Whether the user should see this report under the given quiet setting.
    pub fn is_visible(&self, quiet: bool) -> bool {
        !(quiet && matches!(self.outcome, PairOutcome::Unchanged))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, PairOutcome::Failed(_))
    }

    fn trace(&self) {
        match &self.outcome {
            PairOutcome::Unchanged => info!("[SYNC] Pair unchanged"),
            PairOutcome::Conflict { modified_at } => {
                warn!(%modified_at, "[SYNC][CONFLICT] Contents differ with equal modification times")
            }
            PairOutcome::Transferred(decision) => {
                info!(action = ?decision.action, reason = %decision.reason, "[SYNC] Transfer complete")
            }
            PairOutcome::Declined(decision) => {
                info!(action = ?decision.action, reason = %decision.reason, "[SYNC] Transfer declined")
            }
            PairOutcome::Failed(e) => error!(error = %e, "[SYNC][ERROR] Pair failed"),
        }
    }
}

impl fmt::Display for PairReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let local = self.pair.local.display();
        let remote = &self.pair.remote;
        match &self.outcome {
            PairOutcome::Unchanged => write!(f, "{local}: unchanged"),
            PairOutcome::Conflict { modified_at } => write!(
                f,
                "{local} <-> {remote}: conflict: contents differ but both were modified at {modified_at}; reconcile manually"
            ),
            PairOutcome::Transferred(d) => match d.action {
                SyncAction::Download => write!(f, "{remote} -> {local}: downloaded ({})", d.reason),
                _ => write!(f, "{local} -> {remote}: uploaded ({})", d.reason),
            },
            PairOutcome::Declined(d) => match d.action {
                SyncAction::Download => write!(f, "{local}: download skipped ({})", d.reason),
                _ => write!(f, "{local}: upload skipped ({})", d.reason),
            },
            PairOutcome::Failed(e) => write!(f, "{local} <-> {remote}: failed: {e}"),
        }
    }
}

/// Entrypoint output: one report per input pair, in input order.
#[derive(Debug, Default)]
pub struct SynchroniseReport {
    pub pairs: Vec<PairReport>,
}

impl SynchroniseReport {
    fn count(&self, pred: impl Fn(&PairOutcome) -> bool) -> usize {
        self.pairs.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn transferred(&self) -> usize {
        self.count(|o| matches!(o, PairOutcome::Transferred(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, PairOutcome::Failed(_)))
    }

    pub fn conflicts(&self) -> usize {
        self.count(|o| matches!(o, PairOutcome::Conflict { .. }))
    }
}

/// Text shown at the confirmation gate.
pub fn prompt_for(pair: &SyncPair, decision: &Decision) -> String {
    match decision.action {
        SyncAction::Download => format!(
            "{}: download {} to {}?",
            decision.reason,
            pair.remote,
            pair.local.display()
        ),
        _ => format!(
            "{}: upload {} to {}?",
            decision.reason,
            pair.local.display(),
            pair.remote
        ),
    }
}

pub struct Synchroniser<'a> {
    options: SyncOptions,
    remote: &'a dyn RemoteMetadataReader,
    transfer: &'a dyn TransferExecutor,
    probe: &'a dyn LocalFileProbe,
    gate: &'a dyn ConfirmationGate,
    notifier: &'a dyn Notifier,
}

impl<'a> Synchroniser<'a> {
    /// Local files are read from disk unless [`with_probe`](Self::with_probe) says otherwise.
    pub fn new(
        options: SyncOptions,
        remote: &'a dyn RemoteMetadataReader,
        transfer: &'a dyn TransferExecutor,
        gate: &'a dyn ConfirmationGate,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Synchroniser {
            options,
            remote,
            transfer,
            probe: &FsProbe,
            gate,
            notifier,
        }
    }

    pub fn with_probe(mut self, probe: &'a dyn LocalFileProbe) -> Self {
        self.probe = probe;
        self
    }

    pub async fn run(&self, pairs: &[SyncPair]) -> SynchroniseReport {
        info!(pairs = pairs.len(), "[SYNC] Starting synchronisation");
        let mut reports = Vec::with_capacity(pairs.len());

        for (index, pair) in pairs.iter().enumerate() {
            let span = info_span!(
                "pair",
                index,
                local = %pair.local.display(),
                remote = %pair.remote
            );
            let outcome = match self.sync_pair(pair).instrument(span.clone()).await {
                Ok(outcome) => outcome,
                Err(e) => PairOutcome::Failed(e),
            };

            let report = PairReport {
                pair: pair.clone(),
                outcome,
            };
            span.in_scope(|| report.trace());
            if report.is_visible(self.options.quiet) {
                self.notifier.notify(&report);
            }
            reports.push(report);
        }

        let report = SynchroniseReport { pairs: reports };
        info!(
            transferred = report.transferred(),
            failed = report.failed(),
            conflicts = report.conflicts(),
            "[SYNC] Synchronisation finished"
        );
        report
    }

    async fn sync_pair(&self, pair: &SyncPair) -> Result<PairOutcome, SyncError> {
        let remote = self
            .remote
            .get(&pair.remote)
            .await
            .map_err(SyncError::Remote)?;
        debug!(?remote, "[SYNC] Remote metadata");

        let local = self
            .probe
            .stat(&pair.local)
            .map_err(|e| SyncError::read_failure(&pair.local, e))?;
        debug!(?local, "[SYNC] Local state");

        let decision = decide(&local, &remote, || -> io::Result<_> {
            let reader = self.probe.open(&pair.local)?;
            fingerprint(reader)
        })
        .map_err(|e| SyncError::read_failure(&pair.local, e))?;
        info!(action = ?decision.action, reason = %decision.reason, "[SYNC] Decided");

        if decision.action == SyncAction::None {
            return Ok(if decision.is_conflict() {
                PairOutcome::Conflict {
                    modified_at: local.modified_at,
                }
            } else {
                PairOutcome::Unchanged
            });
        }

        if !self.confirm(pair, &decision) {
            return Ok(PairOutcome::Declined(decision));
        }

        let transferred = match decision.action {
            SyncAction::Upload => {
                self.transfer
                    .upload(&pair.local, &pair.remote, local.modified_at)
                    .await
            }
            SyncAction::Download => self.transfer.download(&pair.remote, &pair.local).await,
            SyncAction::None => Ok(()),
        };
        transferred.map_err(SyncError::Remote)?;

        Ok(PairOutcome::Transferred(decision))
    }

    fn confirm(&self, pair: &SyncPair, decision: &Decision) -> bool {
        if self.options.assume_yes {
            debug!("[SYNC] Assuming yes, not prompting");
            return true;
        }
        self.gate
            .ask(&prompt_for(pair, decision), self.options.default_answer)
    }
}
