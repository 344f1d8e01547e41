//! Per-run stop signal
//!
//! Every start or resume of a transfer gets a fresh [`StopSignal`]. Triggering
//! it wakes whatever the worker is currently awaiting; the recorded reason lets
//! the worker tell a requested stop from a failure.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Why a run was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The controller paused the transfer
    Requested,
    /// The transfer was removed from the registry
    Deleted,
    /// The process is shutting down
    Shutdown,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::Requested => "stop requested",
            StopReason::Deleted => "transfer deleted",
            StopReason::Shutdown => "shutting down",
        };
        f.write_str(s)
    }
}

/// Cancellation handle for one run of a transfer
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    token: CancellationToken,
    reason: Arc<Mutex<Option<StopReason>>>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger the signal. The first reason wins; later calls are no-ops.
    pub fn trigger(&self, reason: StopReason) {
        {
            let mut slot = self.reason.lock();
            if slot.is_none() {
                *slot = Some(reason);
            }
        }
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn reason(&self) -> Option<StopReason> {
        *self.reason.lock()
    }

    /// Resolves once the signal has been triggered
    pub async fn triggered(&self) {
        self.token.cancelled().await
    }
}
