use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use clap::Parser;

use crate::{
    addon::AddonManifest,
    cache::CacheConfig,
    playlist::ParseOptions,
    source::{FilePlaylistSource, HttpPlaylistSource, PlaylistSource},
};

pub const DEFAULT_PLAYLIST_URL: &str =
    "https://raw.githubusercontent.com/mickaelfullStack/BellaIptv/refs/heads/main/BellaIptv.m3u";

/// Serves channels of an M3U playlist as a TV addon
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Playlist to serve channels from
    #[arg(long, env = "M3U_URL", default_value = DEFAULT_PLAYLIST_URL)]
    pub playlist_url: String,

    /// Read the playlist from a local file instead of `--playlist-url`
    #[arg(long, env = "M3U_FILE")]
    pub playlist_file: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 7000)]
    pub port: u16,

    /// Seconds a parsed playlist is served before being fetched again
    #[arg(long, env = "CACHE_TTL_SECS", default_value_t = 4 * 60 * 60)]
    pub cache_ttl: u64,

    /// Seconds to wait after a failed fetch before trying again
    #[arg(long, env = "RETRY_BACKOFF_SECS", default_value_t = 60)]
    pub retry_backoff: u64,

    /// Also refresh the playlist in the background every N seconds
    #[arg(long, env = "REFRESH_INTERVAL_SECS")]
    pub refresh_interval: Option<u64>,

    /// Connect timeout for the playlist request, in seconds
    #[arg(long, default_value_t = 10)]
    pub connect_timeout: u64,

    /// Timeout for the whole playlist request, body included, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout: u64,

    /// Tag stripped from the start of channel names (repeatable)
    #[arg(long = "strip-prefix", default_value = "BR|")]
    pub strip_prefixes: Vec<String>,

    /// Name advertised in the addon manifest
    #[arg(long, default_value = "Bella IPTV")]
    pub addon_name: String,
}

impl Args {
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    #[must_use]
    pub const fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_secs(self.cache_ttl),
            retry_backoff: Duration::from_secs(self.retry_backoff),
        }
    }

    #[must_use]
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            strip_prefixes: self.strip_prefixes.clone(),
            ..ParseOptions::default()
        }
    }

    #[must_use]
    pub fn manifest(&self) -> AddonManifest {
        AddonManifest::new(&self.addon_name)
    }

    /// Background refresh period, `None` when disabled or set to zero
    #[must_use]
    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_interval
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    #[must_use]
    pub fn playlist_source(&self, client: reqwest::Client) -> Arc<dyn PlaylistSource> {
        match &self.playlist_file {
            Some(path) => Arc::new(FilePlaylistSource::new(path)),
            None => Arc::new(HttpPlaylistSource::new(client, &self.playlist_url)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let base = [
            "bella-iptv",
            "--playlist-url",
            "http://example.com/list.m3u",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--cache-ttl",
            "600",
            "--retry-backoff",
            "5",
        ];
        Args::try_parse_from(base.iter().chain(extra)).unwrap()
    }

    #[test]
    fn converts_into_component_settings() {
        let args = parse(&[]);

        assert_eq!(args.socket_addr(), "127.0.0.1:9000".parse().unwrap());
        let cache = args.cache_config();
        assert_eq!(cache.ttl, Duration::from_secs(600));
        assert_eq!(cache.retry_backoff, Duration::from_secs(5));
        assert_eq!(args.parse_options().strip_prefixes, ["BR|"]);
        assert_eq!(args.manifest().name, args.addon_name);
        assert_eq!(
            args.playlist_source(reqwest::Client::new()).location(),
            "http://example.com/list.m3u"
        );
    }

    #[test]
    fn request_timeout_defaults_to_thirty_seconds() {
        assert_eq!(parse(&[]).request_timeout(), Duration::from_secs(30));
        assert_eq!(
            parse(&["--request-timeout", "5"]).request_timeout(),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn strip_prefixes_are_repeatable() {
        let args = parse(&["--strip-prefix", "PT|", "--strip-prefix", "US|"]);

        assert_eq!(args.parse_options().strip_prefixes, ["PT|", "US|"]);
    }

    #[test]
    fn zero_refresh_interval_disables_background_refresh() {
        assert_eq!(parse(&["--refresh-interval", "0"]).refresh_interval(), None);
        assert_eq!(
            parse(&["--refresh-interval", "120"]).refresh_interval(),
            Some(Duration::from_secs(120))
        );
    }

    #[test]
    fn playlist_file_takes_precedence() {
        let args = parse(&["--playlist-file", "/tmp/list.m3u"]);

        assert_eq!(
            args.playlist_source(reqwest::Client::new()).location(),
            "/tmp/list.m3u"
        );
    }
}
