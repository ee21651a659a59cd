//! Asset sources for manifests, floor models, and room metadata
//!
//! A source resolves paths relative to a root (an HTTP base URL or a
//! directory) and returns raw bytes:
//! - [`HttpSource`]: fetches over HTTP(S)
//! - [`DirSource`]: reads from a local directory
//! - [`MemorySource`]: serves preloaded bytes and counts fetches

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Request to {url} failed: {message}")]
    Http { url: String, message: String },
    #[error("Request to {url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Future type for fetch operations.
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>, SourceError>> + Send + 'a>>;

/// Where viewer assets come from
pub trait AssetSource: Send + Sync {
    /// Fetch the bytes at `path`, relative to the source root
    fn fetch(&self, path: &str) -> FetchFuture<'_>;

    /// Full location of `path`, for logs
    fn locate(&self, path: &str) -> String;
}

/// HTTP source rooted at a base URL
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SourceError> {
        let base_url = base_url.into();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SourceError::Http {
                url: base_url.clone(),
                message: e.to_string(),
            })?;
        Ok(Self { client, base_url })
    }
}

impl AssetSource for HttpSource {
    fn fetch(&self, path: &str) -> FetchFuture<'_> {
        let url = self.locate(path);
        Box::pin(async move {
            debug!(url = %url, "Fetching asset");
            let response = self
                .client
                .get(&url)
                .header(reqwest::header::CACHE_CONTROL, "no-cache")
                .send()
                .await
                .map_err(|e| SourceError::Http {
                    url: url.clone(),
                    message: e.to_string(),
                })?;

            if !response.status().is_success() {
                return Err(SourceError::Status {
                    url,
                    status: response.status().as_u16(),
                });
            }

            let bytes = response.bytes().await.map_err(|e| SourceError::Http {
                url: url.clone(),
                message: e.to_string(),
            })?;
            Ok(bytes.to_vec())
        })
    }

    fn locate(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Local directory source
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for DirSource {
    fn fetch(&self, path: &str) -> FetchFuture<'_> {
        let full = self.root.join(path.trim_start_matches('/'));
        Box::pin(async move {
            match tokio::fs::read(&full).await {
                Ok(bytes) => Ok(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(SourceError::NotFound(full.display().to_string()))
                }
                Err(e) => Err(SourceError::Io {
                    path: full.display().to_string(),
                    source: e,
                }),
            }
        })
    }

    fn locate(&self, path: &str) -> String {
        self.root.join(path.trim_start_matches('/')).display().to_string()
    }
}

#[derive(Debug, Default)]
struct MemoryEntry {
    bytes: Vec<u8>,
    fetches: AtomicUsize,
    failures_left: AtomicUsize,
}

/// In-memory source with fetch counting.
///
/// Useful for embedding assets and for exercising the loaders without a
/// network. Files are registered up front with the builder methods.
#[derive(Debug, Default)]
pub struct MemorySource {
    files: HashMap<String, MemoryEntry>,
    latency: Option<Duration>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file
    pub fn with_file(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(
            path.into(),
            MemoryEntry {
                bytes: bytes.into(),
                ..Default::default()
            },
        );
        self
    }

    /// Make the next `count` fetches of `path` fail
    pub fn with_failures(mut self, path: &str, count: usize) -> Self {
        let entry = self.files.entry(path.to_string()).or_default();
        entry.failures_left = AtomicUsize::new(count);
        self
    }

    /// Delay every fetch
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of fetches issued for `path`, including failed ones
    pub fn fetch_count(&self, path: &str) -> usize {
        self.files
            .get(path)
            .map(|e| e.fetches.load(Ordering::SeqCst))
            .unwrap_or(0)
    }
}

impl AssetSource for MemorySource {
    fn fetch(&self, path: &str) -> FetchFuture<'_> {
        let path = path.trim_start_matches('/').to_string();
        Box::pin(async move {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            let entry = self
                .files
                .get(&path)
                .ok_or_else(|| SourceError::NotFound(path.clone()))?;
            entry.fetches.fetch_add(1, Ordering::SeqCst);

            let failing = entry
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(SourceError::Status { url: path, status: 503 });
            }
            Ok(entry.bytes.clone())
        })
    }

    fn locate(&self, path: &str) -> String {
        format!("memory:{}", path.trim_start_matches('/'))
    }
}
