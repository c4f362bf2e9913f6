use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::error::FetchError;

/// Where the raw playlist text comes from
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    /// Retrieves the full playlist text
    ///
    /// # Errors
    /// Errors when the source is unreachable or answers with a failure
    async fn fetch_playlist_text(&self) -> Result<String, FetchError>;

    /// Human readable location, used in logs
    fn location(&self) -> String;
}

/// Fetches the playlist with a plain `GET`
#[derive(Debug, Clone)]
pub struct HttpPlaylistSource {
    client: reqwest::Client,
    url: String,
}

impl HttpPlaylistSource {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl PlaylistSource for HttpPlaylistSource {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_playlist_text(&self) -> Result<String, FetchError> {
        let res = self.client.get(&self.url).send().await?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = res.text().await?;
        debug!("Fetched {} bytes of playlist", body.len());
        Ok(body)
    }

    fn location(&self) -> String {
        self.url.clone()
    }
}

/// Reads the playlist from a local file on every refresh
#[derive(Debug, Clone)]
pub struct FilePlaylistSource {
    path: PathBuf,
}

impl FilePlaylistSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PlaylistSource for FilePlaylistSource {
    #[instrument(skip(self), fields(path = ?self.path))]
    async fn fetch_playlist_text(&self) -> Result<String, FetchError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| FetchError::File {
                path: self.path.clone(),
                source,
            })
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
