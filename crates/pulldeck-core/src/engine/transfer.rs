//! Transfer - one resumable download and its worker
//!
//! A transfer owns its progress fields behind a private lock. The worker is the
//! only writer; everyone else observes the transfer through [`Transfer::snapshot`].
//! Resume works by treating whatever is already on disk at the target path as a
//! prefix of the final content and asking the server for the rest.

use crate::engine::signal::{StopReason, StopSignal};
use crate::error::{PullDeckError, Result};
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use pulldeck_types::{TransferSnapshot, TransferStatus};
use reqwest::{header, Client, StatusCode};
use std::future::Future;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Shared resources a worker borrows from the registry
#[derive(Debug, Clone)]
pub(crate) struct WorkerContext {
    pub client: Client,
    pub chunk_size: usize,
    pub stall_timeout: Option<Duration>,
    pub permits: Option<Arc<Semaphore>>,
}

/// Mutable progress fields, only touched under `Transfer::state`
#[derive(Debug, Default)]
struct TransferState {
    is_active: bool,
    is_completed: bool,
    downloaded: u64,
    total: u64,
    last_error: Option<String>,
    status: TransferStatus,
}

/// A single download task
#[derive(Debug)]
pub struct Transfer {
    id: u64,
    url: String,
    display_name: String,
    target_path: PathBuf,
    state: Mutex<TransferState>,
    /// Stop signal of the current (or most recent) run
    signal: Mutex<StopSignal>,
    /// Set while a worker task exists for this transfer
    attached: AtomicBool,
}

impl Transfer {
    pub(crate) fn new(id: u64, url: String, target_path: PathBuf, display_name: String) -> Self {
        Self {
            id,
            url,
            display_name,
            target_path,
            state: Mutex::new(TransferState::default()),
            signal: Mutex::new(StopSignal::new()),
            attached: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Consistent copy of the observable state
    pub fn snapshot(&self) -> TransferSnapshot {
        let state = self.state.lock();
        self.snapshot_of(&state)
    }

    /// Snapshot plus whether a worker is attached, read in one critical section
    pub(crate) fn observe(&self) -> (TransferSnapshot, bool) {
        let state = self.state.lock();
        (self.snapshot_of(&state), self.is_running())
    }

    fn snapshot_of(&self, state: &TransferState) -> TransferSnapshot {
        TransferSnapshot {
            id: self.id,
            url: self.url.clone(),
            display_name: self.display_name.clone(),
            target_path: self.target_path.clone(),
            is_active: state.is_active,
            is_completed: state.is_completed,
            downloaded_bytes: state.downloaded,
            total_bytes: state.total,
            last_error: state.last_error.clone().unwrap_or_default(),
            status: state.status,
        }
    }

    /// Ask the current run to stop. Does not wait for the worker.
    pub fn request_stop(&self) {
        self.cancel(StopReason::Requested);
    }

    /// Whether a worker task is currently attached (possibly still connecting)
    pub fn is_running(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    pub(crate) fn cancel(&self, reason: StopReason) {
        let signal = self.signal.lock();
        if !signal.is_triggered() {
            debug!("Transfer {}: cancelling ({})", self.id, reason);
        }
        signal.trigger(reason);
    }

    /// Claim the worker slot and issue a fresh stop signal for the new run.
    ///
    /// Returns `None` when a worker is already attached. Runs under the signal
    /// lock so a concurrent `request_stop` always targets the run it raced with.
    pub(crate) fn claim_run(&self) -> Option<StopSignal> {
        let mut signal = self.signal.lock();
        if self
            .attached
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        *signal = StopSignal::new();
        Some(signal.clone())
    }

    /// Worker body. Spawned by the registry after `claim_run` succeeded.
    ///
    /// The terminal transition releases the worker slot under the state lock,
    /// so no observer sees a finished state with a worker still attached.
    pub(crate) async fn run(self: Arc<Self>, ctx: WorkerContext, signal: StopSignal) {
        info!("Starting transfer {}: {}", self.id, self.url);

        match self.download(&ctx, &signal).await {
            Ok(()) => {
                self.set_done();
                info!("Transfer {} completed: {:?}", self.id, self.target_path);
            }
            Err(e) if e.is_cancellation() || signal.is_triggered() => {
                self.set_stopped();
                info!(
                    "Transfer {} stopped ({})",
                    self.id,
                    signal.reason().unwrap_or(StopReason::Requested)
                );
            }
            Err(e) => {
                warn!("Transfer {} failed: {}", self.id, e);
                self.set_error(e.to_string());
            }
        }
    }

    async fn download(&self, ctx: &WorkerContext, signal: &StopSignal) -> Result<()> {
        // Held until the run ends
        let _permit = match &ctx.permits {
            Some(permits) => tokio::select! {
                biased;
                _ = signal.triggered() => return Err(Self::stopped(signal)),
                permit = Arc::clone(permits).acquire_owned() => permit.ok(),
            },
            None => None,
        };

        let mut resume_offset = match tokio::fs::metadata(&self.target_path).await {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };

        let mut request = ctx.client.get(&self.url);
        if resume_offset > 0 {
            debug!("Transfer {}: requesting bytes={}-", self.id, resume_offset);
            request = request.header(header::RANGE, format!("bytes={}-", resume_offset));
        }
        let request = request.build()?;

        let response = tokio::select! {
            biased;
            _ = signal.triggered() => return Err(Self::stopped(signal)),
            response = ctx.client.execute(request) => response?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(PullDeckError::ServerError {
                status: status.as_u16(),
            });
        }

        // A plain 200 to a ranged request carries the whole body
        let restart = resume_offset > 0 && status != StatusCode::PARTIAL_CONTENT;
        if restart {
            warn!(
                "Transfer {}: server ignored range request, restarting from byte 0",
                self.id
            );
            resume_offset = 0;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(restart)
            .open(&self.target_path)
            .await?;
        if resume_offset > 0 {
            file.seek(SeekFrom::Start(resume_offset)).await?;
            info!("Resuming transfer {} from byte {}", self.id, resume_offset);
        }

        let total = response
            .content_length()
            .map(|len| len + resume_offset)
            .unwrap_or(0);
        self.mark_active(resume_offset, total);

        let mut stream = std::pin::pin!(response.bytes_stream());
        let streamed = self.pump(&mut stream, &mut file, ctx, signal).await;

        // Persist what we have even when stopping, the next resume reads the file size
        let flushed = file.flush().await;
        streamed?;
        flushed?;
        file.sync_all().await?;
        Ok(())
    }

    /// Copy the body to the file until end-of-stream, an error, or a stop.
    async fn pump<S, B>(
        &self,
        stream: &mut S,
        file: &mut File,
        ctx: &WorkerContext,
        signal: &StopSignal,
    ) -> Result<()>
    where
        S: Stream<Item = reqwest::Result<B>> + Unpin,
        B: AsRef<[u8]>,
    {
        loop {
            let next = tokio::select! {
                biased;
                _ = signal.triggered() => return Err(Self::stopped(signal)),
                next = with_stall_timeout(ctx.stall_timeout, stream.next()) => next?,
            };

            let Some(chunk) = next else {
                return Ok(());
            };
            let chunk = chunk?;

            for piece in chunk.as_ref().chunks(ctx.chunk_size.max(1)) {
                file.write_all(piece).await?;
                self.add_progress(piece.len() as u64);
            }
        }
    }

    fn stopped(signal: &StopSignal) -> PullDeckError {
        PullDeckError::Cancelled(signal.reason().unwrap_or(StopReason::Requested))
    }

    // ------------------------------------------------------------------------
    // State transitions
    // ------------------------------------------------------------------------

    fn mark_active(&self, downloaded: u64, total: u64) {
        let mut state = self.state.lock();
        state.total = total;
        state.downloaded = downloaded;
        state.is_active = true;
        state.last_error = None;
        state.is_completed = false;
        state.status = TransferStatus::Active;
    }

    fn add_progress(&self, bytes: u64) {
        self.state.lock().downloaded += bytes;
    }

    fn set_done(&self) {
        let mut state = self.state.lock();
        if state.total == 0 {
            state.total = state.downloaded;
        }
        state.is_completed = true;
        state.is_active = false;
        state.status = TransferStatus::Completed;
        self.detach();
    }

    fn set_stopped(&self) {
        let mut state = self.state.lock();
        state.is_active = false;
        state.last_error = None;
        state.status = TransferStatus::Stopped;
        self.detach();
    }

    fn set_error(&self, error: String) {
        let mut state = self.state.lock();
        state.is_completed = false;
        state.is_active = false;
        state.last_error = Some(error);
        state.status = TransferStatus::Failed;
        self.detach();
    }

    /// Release the worker slot. Callers hold the state lock.
    fn detach(&self) {
        self.attached.store(false, Ordering::Release);
    }
}

async fn with_stall_timeout<F: Future>(limit: Option<Duration>, fut: F) -> Result<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| PullDeckError::Stalled(limit)),
        None => Ok(fut.await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer() -> Transfer {
        Transfer::new(
            7,
            "http://example.test/a.bin".to_string(),
            PathBuf::from("/tmp/a.bin"),
            "a.bin".to_string(),
        )
    }

    #[test]
    fn new_transfer_is_pending() {
        let t = transfer();
        let snap = t.snapshot();
        assert_eq!(snap.id, 7);
        assert_eq!(snap.status, TransferStatus::Pending);
        assert!(!snap.is_active);
        assert!(!snap.is_completed);
        assert_eq!(snap.downloaded_bytes, 0);
        assert_eq!(snap.total_bytes, 0);
        assert_eq!(snap.last_error, "");
        assert!(!t.is_running());
    }

    #[test]
    fn completion_clears_active_flag() {
        let t = transfer();
        t.mark_active(100, 400);
        t.add_progress(300);
        t.set_done();

        let snap = t.snapshot();
        assert!(snap.is_completed);
        assert!(!snap.is_active);
        assert_eq!(snap.downloaded_bytes, 400);
        assert_eq!(snap.total_bytes, 400);
    }

    #[test]
    fn unknown_length_is_filled_in_on_completion() {
        let t = transfer();
        t.mark_active(0, 0);
        t.add_progress(1234);
        t.set_done();
        assert_eq!(t.snapshot().total_bytes, 1234);
    }

    #[test]
    fn failure_then_restart_clears_error() {
        let t = transfer();
        t.mark_active(0, 10);
        t.set_error("connection reset".to_string());

        let snap = t.snapshot();
        assert_eq!(snap.status, TransferStatus::Failed);
        assert_eq!(snap.last_error, "connection reset");
        assert!(!snap.is_active && !snap.is_completed);

        t.mark_active(5, 10);
        let snap = t.snapshot();
        assert!(snap.is_active);
        assert_eq!(snap.last_error, "");
    }

    #[test]
    fn stopping_is_not_an_error() {
        let t = transfer();
        t.mark_active(0, 10);
        t.add_progress(4);
        t.set_stopped();

        let snap = t.snapshot();
        assert_eq!(snap.status, TransferStatus::Stopped);
        assert!(!snap.is_active);
        assert!(!snap.is_completed);
        assert_eq!(snap.last_error, "");
        assert_eq!(snap.downloaded_bytes, 4);
    }

    #[test]
    fn only_one_run_can_be_claimed() {
        let t = transfer();
        let first = t.claim_run().expect("first claim");
        assert!(t.claim_run().is_none());
        assert!(t.is_running());

        t.request_stop();
        assert_eq!(first.reason(), Some(StopReason::Requested));

        t.attached.store(false, Ordering::Release);
        let second = t.claim_run().expect("claim after release");
        assert!(!second.is_triggered());
    }

    #[test]
    fn terminal_state_releases_worker_slot() {
        let t = transfer();
        t.claim_run().expect("claim");
        t.mark_active(0, 10);
        assert!(t.observe().1);

        t.set_stopped();
        let (snap, running) = t.observe();
        assert_eq!(snap.status, TransferStatus::Stopped);
        assert!(!running);
        assert!(t.claim_run().is_some());

        t.set_error("reset".to_string());
        assert!(!t.observe().1);
        assert!(t.claim_run().is_some());

        t.set_done();
        assert!(!t.observe().1);
    }

    #[tokio::test]
    async fn stall_timeout_fires() {
        let pending = std::future::pending::<()>();
        let result = with_stall_timeout(Some(Duration::from_millis(20)), pending).await;
        assert!(matches!(result, Err(PullDeckError::Stalled(_))));

        let ready = with_stall_timeout(None, async { 5 }).await.unwrap();
        assert_eq!(ready, 5);
    }
}
