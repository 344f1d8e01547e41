//! Shared types for PullDeck
//!
//! This crate contains the data structures exchanged between the download
//! engine and the HTTP control server.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Transfer Types
// ============================================================================

/// Lifecycle phase of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    #[default]
    Pending,
    Active,
    Completed,
    Stopped,
    Failed,
}

/// Read-only copy of a transfer's observable state at one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferSnapshot {
    pub id: u64,
    pub url: String,
    pub display_name: String,
    pub target_path: PathBuf,
    pub is_active: bool,
    pub is_completed: bool,
    pub downloaded_bytes: u64,
    pub total_bytes: u64,
    /// Empty when the transfer has not failed
    pub last_error: String,
    pub status: TransferStatus,
}

/// Result of toggling a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleOutcome {
    /// A stop was requested for a running transfer
    Stopped,
    /// A new worker was spawned for an idle transfer
    Resumed,
    /// Completed transfers are left alone
    Unchanged,
}

// ============================================================================
// Request/Response types
// ============================================================================

/// Request to add (and immediately start) a transfer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddTransferRequest {
    pub url: String,
    /// Empty means the process working directory
    pub target_directory: String,
    /// Empty means derive from the URL
    pub display_name: String,
}

/// Response after a transfer was added
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTransferResponse {
    pub id: u64,
    pub display_name: String,
}

/// Response for toggle requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleResponse {
    pub id: u64,
    pub outcome: ToggleOutcome,
}

/// Working directory and free space on its disk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirInfo {
    pub path: String,
    /// Human readable, or "unknown"
    pub free_space: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsgResponse {
    pub msg: String,
}

impl MsgResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

/// Error body returned by the HTTP API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub err: String,
}
