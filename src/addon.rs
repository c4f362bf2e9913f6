//! Payloads of the addon protocol spoken to media-player clients

use serde::Serialize;

use crate::playlist::ChannelRecord;

pub const ADDON_ID: &str = "com.bellaiptv";
pub const ADDON_LOGO: &str = "https://i.imgur.com/5qYNd6Q.png";
pub const BINGE_GROUP_PREFIX: &str = "BellaIPTV";

/// The only resource type this addon serves streams for
pub const TV_TYPE: &str = "tv";

/// Describes the addon to clients at `/manifest.json`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonManifest {
    pub id: String,
    pub version: String,
    pub name: String,
    pub description: String,
    pub catalogs: Vec<serde_json::Value>,
    pub resources: Vec<String>,
    pub types: Vec<String>,
    pub id_prefixes: Vec<String>,
    pub logo: String,
    pub background: String,
}

impl AddonManifest {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: ADDON_ID.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: format!("Addon for the {name} list with group filters"),
            name,
            catalogs: Vec::new(),
            resources: vec!["stream".to_string()],
            types: vec![TV_TYPE.to_string()],
            id_prefixes: vec!["br".to_string()],
            logo: ADDON_LOGO.to_string(),
            background: ADDON_LOGO.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorHints {
    pub not_web_ready: bool,
    pub binge_group: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    pub url: String,
    pub name: String,
    pub title: String,
    pub behavior_hints: BehaviorHints,
}

impl From<&ChannelRecord> for Stream {
    fn from(channel: &ChannelRecord) -> Self {
        Self {
            url: channel.stream_url.clone(),
            name: channel.name.clone(),
            title: channel.name.clone(),
            behavior_hints: BehaviorHints {
                not_web_ready: true,
                binge_group: format!("{BINGE_GROUP_PREFIX}-{}", channel.group),
            },
        }
    }
}

/// Body of `/stream/{type}/{id}.json`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamResponse {
    pub streams: Vec<Stream>,
    /// Seconds a client may cache the answer, only sent with a match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_max_age: Option<u64>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn stream_carries_binge_group_of_channel() {
        let channel = ChannelRecord {
            id: "espn".to_string(),
            name: "ESPN".to_string(),
            logo_url: String::new(),
            group: "Sports".to_string(),
            stream_url: "http://x/espn".to_string(),
        };

        let response = StreamResponse {
            streams: vec![Stream::from(&channel)],
            cache_max_age: Some(14_400),
        };

        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({
                "streams": [{
                    "url": "http://x/espn",
                    "name": "ESPN",
                    "title": "ESPN",
                    "behaviorHints": { "notWebReady": true, "bingeGroup": "BellaIPTV-Sports" }
                }],
                "cacheMaxAge": 14400
            })
        );
    }

    #[test]
    fn empty_response_omits_cache_max_age() {
        assert_eq!(
            serde_json::to_value(StreamResponse::default()).unwrap(),
            json!({ "streams": [] })
        );
    }

    #[test]
    fn manifest_uses_camel_case_keys() {
        let manifest = serde_json::to_value(AddonManifest::new("Bella IPTV")).unwrap();

        assert_eq!(manifest["id"], ADDON_ID);
        assert_eq!(manifest["idPrefixes"], json!(["br"]));
        assert_eq!(manifest["types"], json!(["tv"]));
        assert_eq!(manifest["catalogs"], json!([]));
    }
}
