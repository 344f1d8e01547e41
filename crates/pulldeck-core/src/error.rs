//! Error types for PullDeck core

use crate::engine::StopReason;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in PullDeck core
#[derive(Debug, Error)]
pub enum PullDeckError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transfer not found: {0}")]
    NotFound(u64),

    #[error("Transfer {0} already has a running worker")]
    AlreadyRunning(u64),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid target directory {path}: {reason}")]
    InvalidTarget { path: PathBuf, reason: String },

    #[error("Could not access working directory: {0}")]
    WorkingDirectory(std::io::Error),

    #[error("Server error: HTTP {status}")]
    ServerError { status: u16 },

    #[error("Transfer stalled: no data received for {0:?}")]
    Stalled(Duration),

    #[error("Transfer was cancelled ({0})")]
    Cancelled(StopReason),
}

impl PullDeckError {
    /// Validation errors are raised before any transfer is registered
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PullDeckError::InvalidUrl(_) | PullDeckError::InvalidTarget { .. }
        )
    }

    /// Check if this error is an ordinary cancellation rather than a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, PullDeckError::Cancelled(_))
    }
}

pub type Result<T, E = PullDeckError> = std::result::Result<T, E>;
