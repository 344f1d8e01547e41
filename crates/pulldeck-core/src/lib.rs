//! PullDeck Core - Download Engine
//!
//! This crate provides the resumable download engine for PullDeck.
//! It handles concurrent transfers, pause/resume through HTTP range
//! requests, and the session store used by the control server.

pub mod config;
pub mod engine;
mod error;
pub mod session;
pub mod target;

pub use config::{Config, EngineConfig, SessionConfig};
pub use engine::{Registry, StopReason, StopSignal, Transfer};
pub use error::*;
pub use session::{MemorySessionStore, Session, SessionStore};

use pulldeck_types::{
    AddTransferRequest, AddTransferResponse, DirInfo, ToggleOutcome, TransferSnapshot,
};
use std::sync::Arc;
use tracing::info;

/// The main PullDeck core instance
#[derive(Debug, Clone)]
pub struct PullDeckCore {
    registry: Arc<Registry>,
}

impl PullDeckCore {
    /// Create a new PullDeckCore instance
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Ok(Self::with_registry(Registry::new(config)?))
    }

    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // ========================================================================
    // Transfer Operations
    // ========================================================================

    /// Validate, resolve the destination, register and start a transfer
    pub async fn add_transfer(&self, request: &AddTransferRequest) -> Result<AddTransferResponse> {
        let url = target::validate_url(&request.url)?;
        let resolved =
            target::resolve_target(&url, &request.target_directory, &request.display_name)
                .await?;

        let transfer = self
            .registry
            .add(url.as_str(), resolved.path, resolved.display_name);
        self.registry.start(&transfer)?;

        info!(
            "Queued transfer {} -> {:?}",
            transfer.id(),
            transfer.target_path()
        );

        Ok(AddTransferResponse {
            id: transfer.id(),
            display_name: transfer.display_name().to_string(),
        })
    }

    pub fn list_transfers(&self) -> Vec<TransferSnapshot> {
        self.registry.list_all()
    }

    pub fn get_transfer(&self, id: u64) -> Result<TransferSnapshot> {
        self.registry
            .get_by_id(id)
            .map(|t| t.snapshot())
            .ok_or(PullDeckError::NotFound(id))
    }

    pub fn toggle_transfer(&self, id: u64) -> Result<ToggleOutcome> {
        self.registry.toggle(id)
    }

    pub fn delete_transfer(&self, id: u64) -> Result<()> {
        self.registry.delete(id)
    }

    /// Working directory and free space there
    pub async fn dir_info(&self) -> DirInfo {
        tokio::task::spawn_blocking(target::working_dir_info)
            .await
            .unwrap_or_else(|_| DirInfo {
                path: "unknown".to_string(),
                free_space: "unknown".to_string(),
            })
    }

    /// Cancel all running transfers
    pub fn shutdown(&self) {
        self.registry.shutdown();
    }
}
