use std::time::Duration;

use bella_iptv::{
    error::FetchError,
    source::{FilePlaylistSource, HttpPlaylistSource, PlaylistSource},
    util::init_http_client,
};
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PLAYLIST: &str = "#EXTM3U\n#EXTINF:-1,Channel Two\nhttp://x/stream2.m3u8\n";

#[tokio::test]
async fn fetches_playlist_body() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list.m3u"))
        .and(header_exists("user-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PLAYLIST))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = init_http_client(Duration::from_secs(5), Duration::from_secs(30)).unwrap();
    let source = HttpPlaylistSource::new(client, format!("{}/list.m3u", mock_server.uri()));

    assert_eq!(source.fetch_playlist_text().await.unwrap(), PLAYLIST);
}

#[tokio::test]
async fn error_status_is_a_fetch_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list.m3u"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    let source = HttpPlaylistSource::new(
        reqwest::Client::new(),
        format!("{}/list.m3u", mock_server.uri()),
    );

    let err = source.fetch_playlist_text().await.unwrap_err();
    assert!(
        matches!(err, FetchError::Status(status) if status.as_u16() == 502),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn stalled_upstream_times_out() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list.m3u"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(PLAYLIST)
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&mock_server)
        .await;

    let client = init_http_client(Duration::from_secs(1), Duration::from_millis(500)).unwrap();
    let source = HttpPlaylistSource::new(client, format!("{}/list.m3u", mock_server.uri()));

    let result = tokio::time::timeout(Duration::from_secs(10), source.fetch_playlist_text())
        .await
        .expect("request timeout did not fire");
    assert!(
        matches!(&result, Err(FetchError::Request(e)) if e.is_timeout()),
        "unexpected result: {result:?}"
    );
}

#[tokio::test]
async fn unreachable_host_is_a_fetch_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let uri = format!("http://{}/list.m3u", listener.local_addr().unwrap());
    drop(listener);

    let source = HttpPlaylistSource::new(reqwest::Client::new(), uri);

    assert!(matches!(
        source.fetch_playlist_text().await,
        Err(FetchError::Request(_))
    ));
}

#[tokio::test]
async fn reads_local_playlist_file() {
    let path = std::env::temp_dir().join(format!("bella-iptv-{}.m3u", std::process::id()));
    tokio::fs::write(&path, PLAYLIST).await.unwrap();

    let text = FilePlaylistSource::new(&path).fetch_playlist_text().await;
    tokio::fs::remove_file(&path).await.ok();

    assert_eq!(text.unwrap(), PLAYLIST);
}

#[tokio::test]
async fn missing_local_file_is_a_fetch_error() {
    let source = FilePlaylistSource::new("/definitely/not/here.m3u");

    assert!(matches!(
        source.fetch_playlist_text().await,
        Err(FetchError::File { .. })
    ));
}
