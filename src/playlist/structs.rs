use serde::Serialize;

/// A single playable channel taken from the playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRecord {
    /// Slug of `name`, unique within a snapshot
    pub id: String,
    pub name: String,
    /// Empty when the entry carries no `tvg-logo`
    pub logo_url: String,
    pub group: String,
    pub stream_url: String,
}
