// Application-level sync errors and per-device outcomes
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("device discovery failed: {0:#}")]
    Discovery(anyhow::Error),

    #[error("scheduler is already running")]
    AlreadyRunning,
}

/// Result of syncing one device.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Both the recent array and the history record were written
    Synced,
    /// Realtime store had nothing for the device
    NoReading,
    /// No device document to write into
    MissingDocument,
    Failed(String),
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Synced)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, SyncOutcome::NoReading | SyncOutcome::MissingDocument)
    }
}

/// Tally of one sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl PassSummary {
    pub fn record(&mut self, outcome: &SyncOutcome) {
        self.total += 1;
        if outcome.is_success() {
            self.succeeded += 1;
        } else if outcome.is_skipped() {
            self.skipped += 1;
        } else {
            self.failed += 1;
        }
    }
}
