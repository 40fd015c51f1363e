//! Collection and environment source resolution.
//!
//! A source is either a remote URL (downloaded once at startup to a file in
//! the work directory) or a local file that must already exist. Resolution
//! failures are fatal to startup; a worker that cannot load its collection
//! is misconfiguration, not a transient condition.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Collection,
    Environment,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Collection => write!(f, "collection"),
            SourceKind::Environment => write!(f, "environment"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to download {kind} from {url}: {reason}")]
    Download {
        kind: SourceKind,
        url: String,
        reason: String,
    },
    #[error("failed to store downloaded {kind} at {}: {source}", path.display())]
    Store {
        kind: SourceKind,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{kind} file {} not found", path.display())]
    Missing { kind: SourceKind, path: PathBuf },
}

/// Resolve a source that must exist. URL takes priority over the local file.
pub async fn resolve_required(
    client: &reqwest::Client,
    kind: SourceKind,
    url: Option<&str>,
    file: &Path,
    download_target: PathBuf,
) -> Result<PathBuf, SourceError> {
    if let Some(url) = url {
        return download(client, kind, url, download_target).await;
    }
    if !file.is_file() {
        return Err(SourceError::Missing {
            kind,
            path: file.to_path_buf(),
        });
    }
    Ok(file.to_path_buf())
}

/// Resolve an optional source. `Ok(None)` means the worker simply runs
/// without one.
pub async fn resolve_optional(
    client: &reqwest::Client,
    kind: SourceKind,
    url: Option<&str>,
    file: Option<&Path>,
    download_target: PathBuf,
) -> Result<Option<PathBuf>, SourceError> {
    match (url, file) {
        (Some(url), _) => download(client, kind, url, download_target).await.map(Some),
        (None, Some(file)) => resolve_required(client, kind, None, file, download_target)
            .await
            .map(Some),
        (None, None) => Ok(None),
    }
}

async fn download(
    client: &reqwest::Client,
    kind: SourceKind,
    url: &str,
    target: PathBuf,
) -> Result<PathBuf, SourceError> {
    info!(url, "Remote {kind} will be downloaded and used");
    let body = client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| SourceError::Download {
            kind,
            url: url.to_string(),
            reason: e.to_string(),
        })?
        .bytes()
        .await
        .map_err(|e| SourceError::Download {
            kind,
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    tokio::fs::write(&target, &body)
        .await
        .map_err(|source| SourceError::Store {
            kind,
            path: target.clone(),
            source,
        })?;
    Ok(target)
}
