//! Test helpers: a throttled HTTP source and snapshot polling

#![allow(dead_code)]

use pulldeck_core::{EngineConfig, Registry, Transfer};
use pulldeck_types::TransferSnapshot;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const WAIT_LIMIT: Duration = Duration::from_secs(10);

/// Deterministic payload of `len` bytes
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub fn registry() -> Registry {
    Registry::new(&EngineConfig::default()).unwrap()
}

pub fn registry_with(config: EngineConfig) -> Registry {
    Registry::new(&config).unwrap()
}

/// HTTP/1.1 source that dribbles its body out in small delayed pieces and
/// honours `Range: bytes=N-`
pub struct SlowServer {
    pub addr: SocketAddr,
    ranges: Arc<Mutex<Vec<Option<String>>>>,
}

impl SlowServer {
    pub async fn start(payload: Vec<u8>, piece: usize, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let payload = Arc::new(payload);
        let ranges = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&ranges);
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let payload = Arc::clone(&payload);
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let _ = serve(socket, payload, piece, delay, log).await;
                });
            }
        });

        Self { addr, ranges }
    }

    pub fn url(&self, name: &str) -> String {
        format!("http://{}/{}", self.addr, name)
    }

    /// Range header of every request received so far
    pub fn ranges(&self) -> Vec<Option<String>> {
        self.ranges.lock().unwrap().clone()
    }
}

async fn serve(
    mut socket: TcpStream,
    payload: Arc<Vec<u8>>,
    piece: usize,
    delay: Duration,
    log: Arc<Mutex<Vec<Option<String>>>>,
) -> std::io::Result<()> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        head.extend_from_slice(&buf[..n]);
    }

    let head = String::from_utf8_lossy(&head).to_string();
    let range = head.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case("range")
            .then(|| value.trim().to_string())
    });
    log.lock().unwrap().push(range.clone());

    let start = range
        .as_deref()
        .and_then(|r| r.strip_prefix("bytes="))
        .and_then(|r| r.strip_suffix('-'))
        .and_then(|n| n.parse::<usize>().ok())
        .unwrap_or(0)
        .min(payload.len());
    let body = &payload[start..];
    let status = if start > 0 {
        "206 Partial Content"
    } else {
        "200 OK"
    };

    let header = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nAccept-Ranges: bytes\r\nConnection: close\r\n\r\n",
        status,
        body.len()
    );
    socket.write_all(header.as_bytes()).await?;

    for chunk in body.chunks(piece) {
        socket.write_all(chunk).await?;
        socket.flush().await?;
        tokio::time::sleep(delay).await;
    }
    Ok(())
}

/// Poll the snapshot until `pred` holds
pub async fn wait_for<F>(transfer: &Transfer, what: &str, pred: F) -> TransferSnapshot
where
    F: Fn(&TransferSnapshot) -> bool,
{
    let deadline = Instant::now() + WAIT_LIMIT;
    loop {
        let snapshot = transfer.snapshot();
        if pred(&snapshot) {
            return snapshot;
        }
        if Instant::now() > deadline {
            panic!("timed out waiting for {}: {:?}", what, snapshot);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Wait until the worker task has detached
pub async fn wait_idle(transfer: &Transfer) {
    let deadline = Instant::now() + WAIT_LIMIT;
    while transfer.is_running() {
        if Instant::now() > deadline {
            panic!("worker for transfer {} never finished", transfer.id());
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
