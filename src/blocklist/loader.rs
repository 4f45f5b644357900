//! List source loaders.
//!
//! A source identifier is either a local file path or an `http://` /
//! `https://` URL. [`DefaultSourceLoader`] dispatches on that prefix.

use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use super::{ListParser, ParseError};

/// Default timeout for HTTP requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User-Agent header value for HTTP requests.
const USER_AGENT: &str = concat!("groupwall/", env!("CARGO_PKG_VERSION"));

/// Error type for list loading operations.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// File was not found at the specified path.
    #[error("file not found: {0:?}")]
    NotFound(PathBuf),

    /// Permission denied when accessing the file.
    #[error("permission denied: {0:?}")]
    PermissionDenied(PathBuf),

    /// I/O error while reading the file.
    #[error("I/O error reading {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// HTTP request failed with a non-success status code.
    #[error("HTTP request failed for {url}: status {status}")]
    HttpStatus { url: String, status: u16 },

    /// Network error during HTTP request.
    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Timeout fetching the remote URL.
    #[error("timeout fetching {url}")]
    Timeout { url: String },

    /// Failed to create HTTP client.
    #[error("failed to create HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// Error parsing the list content.
    #[error("parse error")]
    Parse(#[from] ParseError),

    /// Task join error from spawning a blocking task.
    #[error("task join error")]
    Join(#[from] tokio::task::JoinError),
}

/// Loads the entries of one list source.
#[async_trait]
pub trait SourceLoader: Send + Sync {
    /// Load and parse the source identified by `source`.
    async fn load(&self, source: &str) -> Result<Vec<String>, LoadError>;
}

/// Parse list content on a blocking task.
async fn parse_content(content: String) -> Result<Vec<String>, LoadError> {
    let domains = tokio::task::spawn_blocking(move || {
        let mut reader = BufReader::new(content.as_bytes());
        ListParser.parse(&mut reader)
    })
    .await??;
    Ok(domains)
}

/// Loads lists from local files.
pub struct FileLoader;

impl FileLoader {
    /// Load a list from a local file.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] if:
    /// - The file does not exist ([`LoadError::NotFound`])
    /// - Permission is denied ([`LoadError::PermissionDenied`])
    /// - An I/O error occurs ([`LoadError::Io`])
    pub async fn load(path: &Path) -> Result<Vec<String>, LoadError> {
        let mut file = File::open(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => LoadError::PermissionDenied(path.to_path_buf()),
            _ => LoadError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .await
            .map_err(|e| LoadError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        parse_content(content).await
    }
}

/// Loads lists from remote URLs.
#[derive(Clone)]
pub struct RemoteLoader {
    client: Client,
}

impl RemoteLoader {
    /// Create a new remote loader.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, LoadError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(LoadError::ClientBuild)?;

        Ok(Self { client })
    }

    /// Fetch and parse a list from `url`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Network`], [`LoadError::Timeout`] or
    /// [`LoadError::HttpStatus`] when the fetch fails.
    pub async fn load(&self, url: &str) -> Result<Vec<String>, LoadError> {
        let response = self.client.get(url).send().await.map_err(|err| {
            if err.is_timeout() {
                LoadError::Timeout {
                    url: url.to_string(),
                }
            } else {
                LoadError::Network {
                    url: url.to_string(),
                    source: err,
                }
            }
        })?;

        if !response.status().is_success() {
            return Err(LoadError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let content = response.text().await.map_err(|err| LoadError::Network {
            url: url.to_string(),
            source: err,
        })?;

        parse_content(content).await
    }
}

/// Loads URLs with a [`RemoteLoader`] and everything else as a file path.
#[derive(Clone)]
pub struct DefaultSourceLoader {
    remote: RemoteLoader,
}

impl DefaultSourceLoader {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, LoadError> {
        Ok(Self {
            remote: RemoteLoader::new()?,
        })
    }
}

/// Returns `true` for sources fetched over HTTP.
#[must_use]
pub fn is_remote_source(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

#[async_trait]
impl SourceLoader for DefaultSourceLoader {
    async fn load(&self, source: &str) -> Result<Vec<String>, LoadError> {
        if is_remote_source(source) {
            tracing::debug!(url = %source, "loading remote list");
            self.remote.load(source).await
        } else {
            tracing::debug!(path = %source, "loading file list");
            FileLoader::load(Path::new(source)).await
        }
    }
}
