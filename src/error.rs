use std::path::PathBuf;

use reqwest::StatusCode;

/// Failure to retrieve the raw playlist text
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The source could not be reached or the body could not be read
    #[error("Playlist request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The source answered with a non-success status
    #[error("Playlist source returned HTTP {0}")]
    Status(StatusCode),

    #[error("Reading playlist file {path:?}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
