use tracing::{debug, info};

/// Run-wide switches, fixed for the lifetime of a [`Synchroniser`](crate::synchronise::Synchroniser).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncOptions {
    /// Suppress the informational "unchanged" notice. Never hides errors,
    /// conflicts, or prompts.
    pub quiet: bool,
    /// Transfer without asking.
    pub assume_yes: bool,
    /// What an unanswered prompt resolves to.
    pub default_answer: bool,
}

impl SyncOptions {
    pub fn trace_loaded(&self) {
        info!(
            quiet = self.quiet,
            assume_yes = self.assume_yes,
            "Loaded sync options"
        );
        debug!(?self, "Sync options loaded (full debug)");
    }
}
