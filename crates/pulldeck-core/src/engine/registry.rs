//! Registry - owns every transfer and coordinates their lifecycle
//!
//! Two lock tiers: the registry lock guards membership and id allocation, each
//! transfer's own lock guards its progress. Registry methods never await, so
//! listing or adding is never stuck behind a slow network read.

use crate::config::EngineConfig;
use crate::engine::signal::StopReason;
use crate::engine::transfer::{Transfer, WorkerContext};
use crate::error::{PullDeckError, Result};
use parking_lot::Mutex;
use pulldeck_types::{ToggleOutcome, TransferSnapshot};
use reqwest::Client;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct RegistryInner {
    transfers: BTreeMap<u64, Arc<Transfer>>,
    next_id: u64,
}

/// Collection of transfers plus identity allocation
#[derive(Debug)]
pub struct Registry {
    inner: Mutex<RegistryInner>,
    ctx: WorkerContext,
}

impl Registry {
    /// Create a registry with its own HTTP client
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let client = Client::builder().user_agent(&config.user_agent).build()?;
        Ok(Self::with_client(client, config))
    }

    /// Create a registry that shares an existing HTTP client
    pub fn with_client(client: Client, config: &EngineConfig) -> Self {
        let permits = config
            .max_concurrent
            .filter(|n| *n > 0)
            .map(|n| Arc::new(Semaphore::new(n)));

        Self {
            inner: Mutex::new(RegistryInner::default()),
            ctx: WorkerContext {
                client,
                chunk_size: config.chunk_size,
                stall_timeout: config.stall_timeout,
                permits,
            },
        }
    }

    /// Register a pending transfer. Does not start it.
    pub fn add(
        &self,
        url: impl Into<String>,
        target_path: impl Into<PathBuf>,
        display_name: impl Into<String>,
    ) -> Arc<Transfer> {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;

        let transfer = Arc::new(Transfer::new(
            id,
            url.into(),
            target_path.into(),
            display_name.into(),
        ));
        inner.transfers.insert(id, Arc::clone(&transfer));
        debug!("Added transfer {}: {}", id, transfer.url());
        transfer
    }

    /// Spawn the worker for a transfer returned by [`Registry::add`]
    pub fn start(&self, transfer: &Arc<Transfer>) -> Result<()> {
        self.spawn(transfer)
    }

    /// Spawn a new worker for a stopped or failed transfer
    pub fn resume(&self, id: u64) -> Result<()> {
        let inner = self.inner.lock();
        let transfer = inner.transfers.get(&id).ok_or(PullDeckError::NotFound(id))?;
        self.spawn(transfer)?;
        info!("Resumed transfer {}", id);
        Ok(())
    }

    /// Request a stop. Fire-and-forget; poll the snapshot to observe it.
    pub fn stop(&self, transfer: &Transfer) {
        transfer.request_stop();
        info!("Stop requested for transfer {}", transfer.id());
    }

    /// Remove a transfer, cancelling its worker first. Partial files stay on disk.
    pub fn delete(&self, id: u64) -> Result<()> {
        let mut inner = self.inner.lock();
        let transfer = inner.transfers.get(&id).ok_or(PullDeckError::NotFound(id))?;

        if transfer.is_running() || transfer.snapshot().is_active {
            transfer.cancel(StopReason::Deleted);
        }
        inner.transfers.remove(&id);
        info!("Deleted transfer {}", id);
        Ok(())
    }

    pub fn get_by_id(&self, id: u64) -> Option<Arc<Transfer>> {
        self.inner.lock().transfers.get(&id).cloned()
    }

    /// Snapshots of every transfer, ordered by id.
    ///
    /// Each entry is internally consistent; entries may come from slightly
    /// different instants.
    pub fn list_all(&self) -> Vec<TransferSnapshot> {
        let inner = self.inner.lock();
        inner.transfers.values().map(|t| t.snapshot()).collect()
    }

    /// Stop a running transfer, resume an idle unfinished one, leave completed ones
    pub fn toggle(&self, id: u64) -> Result<ToggleOutcome> {
        let transfer = self.get_by_id(id).ok_or(PullDeckError::NotFound(id))?;
        let (snapshot, running) = transfer.observe();

        if snapshot.is_active || running {
            self.stop(&transfer);
            Ok(ToggleOutcome::Stopped)
        } else if !snapshot.is_completed {
            self.resume(id)?;
            Ok(ToggleOutcome::Resumed)
        } else {
            debug!("Transfer {} already completed, toggle ignored", id);
            Ok(ToggleOutcome::Unchanged)
        }
    }

    /// Cancel every running transfer
    pub fn shutdown(&self) {
        let inner = self.inner.lock();
        let mut cancelled = 0;
        for transfer in inner.transfers.values().filter(|t| t.is_running()) {
            transfer.cancel(StopReason::Shutdown);
            cancelled += 1;
        }
        info!("Registry shutdown: cancelled {} running transfers", cancelled);
    }

    /// Transfers that still have a worker attached
    pub fn running_count(&self) -> usize {
        let inner = self.inner.lock();
        inner.transfers.values().filter(|t| t.is_running()).count()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().transfers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn spawn(&self, transfer: &Arc<Transfer>) -> Result<()> {
        let signal = transfer
            .claim_run()
            .ok_or(PullDeckError::AlreadyRunning(transfer.id()))?;
        tokio::spawn(Arc::clone(transfer).run(self.ctx.clone(), signal));
        Ok(())
    }
}
