//! Target resolution - URL validation, file naming, working directory info

use crate::error::{PullDeckError, Result};
use chrono::Local;
use pulldeck_types::DirInfo;
use std::path::{Path, PathBuf};
use sysinfo::Disks;
use url::Url;

/// Where a new transfer will write, and the name shown to clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub path: PathBuf,
    pub display_name: String,
}

/// Parse a URL and require an http(s) scheme with a host
pub fn validate_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|_| PullDeckError::InvalidUrl(raw.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(PullDeckError::InvalidUrl(raw.to_string()));
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(PullDeckError::InvalidUrl(raw.to_string())),
    }
}

/// Last path segment of the URL, percent-decoded. Falls back to a timestamp.
pub fn filename_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .map(|segment| {
            urlencoding::decode(segment)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| segment.to_string())
        })
        .map(|name| sanitize(&name))
        .filter(|name| !name.is_empty() && name != "." && name != "..")
        .unwrap_or_else(timestamp)
}

/// Local time as `YYYY-MM-DD-HH-MM-SS`
pub fn timestamp() -> String {
    Local::now().format("%Y-%m-%d-%H-%M-%S").to_string()
}

/// Resolve the destination of a new transfer.
///
/// An empty `directory` means the process working directory. An empty
/// `display_name` is derived from the URL. Existing files are never reused:
/// the name gets a timestamp prefix instead.
pub async fn resolve_target(url: &Url, directory: &str, display_name: &str) -> Result<ResolvedTarget> {
    let dir = if directory.trim().is_empty() {
        std::env::current_dir().map_err(PullDeckError::WorkingDirectory)?
    } else {
        let dir = PathBuf::from(directory.trim());
        let meta = tokio::fs::metadata(&dir)
            .await
            .map_err(|e| PullDeckError::InvalidTarget {
                path: dir.clone(),
                reason: format!("could not access directory: {}", e),
            })?;
        if !meta.is_dir() {
            return Err(PullDeckError::InvalidTarget {
                path: dir,
                reason: "not a directory".to_string(),
            });
        }
        dir
    };

    let name = match sanitize(display_name.trim()) {
        n if n.is_empty() || n == "." || n == ".." => filename_from_url(url),
        n => n,
    };

    disambiguate(&dir, name).await
}

async fn disambiguate(dir: &Path, name: String) -> Result<ResolvedTarget> {
    let path = dir.join(&name);
    if !exists(&path).await {
        return Ok(ResolvedTarget {
            path,
            display_name: name,
        });
    }

    let stamp = timestamp();
    let mut candidate = format!("{}-{}", stamp, name);
    let mut n = 1;
    while exists(&dir.join(&candidate)).await {
        candidate = format!("{}-{}-{}", stamp, n, name);
        n += 1;
    }

    Ok(ResolvedTarget {
        path: dir.join(&candidate),
        display_name: candidate,
    })
}

async fn exists(path: &Path) -> bool {
    // Treat "can't tell" as taken so we never clobber
    tokio::fs::try_exists(path).await.unwrap_or(true)
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect()
}

/// Working directory and approximate free space on the disk holding it
pub fn working_dir_info() -> DirInfo {
    let Ok(path) = std::env::current_dir() else {
        return DirInfo {
            path: "unknown".to_string(),
            free_space: "unknown".to_string(),
        };
    };

    let free_space = available_space(&path)
        .map(format_gigabytes)
        .unwrap_or_else(|| "unknown".to_string());

    DirInfo {
        path: path.display().to_string(),
        free_space,
    }
}

/// Free bytes on the disk whose mount point is the longest prefix of `path`
pub fn available_space(path: &Path) -> Option<u64> {
    let target = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let disks = Disks::new_with_refreshed_list();

    disks
        .list()
        .iter()
        .filter(|disk| target.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space())
}

/// Decimal gigabytes with two decimals, e.g. `12.35 GB`
pub fn format_gigabytes(bytes: u64) -> String {
    format!("{:.2} GB", bytes as f64 / 1_000_000_000.0)
}
