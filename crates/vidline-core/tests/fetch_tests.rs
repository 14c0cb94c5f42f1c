//! Manifest fetch tests against a mock HTTP server

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use vidline_core::{Error, ManifestFetcher, ManifestFormat, PlayerConfig};
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MEDIA_PLAYLIST: &str = "#EXTM3U
#EXT-X-VERSION:3
#EXT-X-TARGETDURATION:6
#EXTINF:6.0,
seg0.ts
#EXTINF:6.0,
seg1.ts
#EXTINF:4.5,
seg2.ts
#EXT-X-ENDLIST
";

const MPD: &str = r#"<?xml version="1.0"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" type="static">
  <Period>
    <AdaptationSet mimeType="video/mp4">
      <Representation id="v0" bandwidth="1000000">
        <SegmentTemplate media="chunk_$Number$.m4s" timescale="1000" duration="2000" startNumber="5"/>
      </Representation>
    </AdaptationSet>
  </Period>
</MPD>"#;

fn fetcher(timeout_ms: u64, proxy_prefix: Option<String>) -> ManifestFetcher {
    let config = PlayerConfig {
        manifest_timeout_ms: timeout_ms,
        proxy_prefix,
        ..Default::default()
    };
    ManifestFetcher::new(&config).unwrap()
}

#[tokio::test]
async fn test_hls_manifest_becomes_timeline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/live/index.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MEDIA_PLAYLIST))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/live/index.m3u8", server.uri());
    let timeline = fetcher(2000, None)
        .fetch_timeline(&url, ManifestFormat::Hls, &CancellationToken::new())
        .await;

    assert_eq!(timeline.len(), 3);
    assert_eq!(timeline.total_duration(), 16.5);
    assert_eq!(timeline.segments()[2].start_time, 12.0);
}

#[tokio::test]
async fn test_dash_manifest_sends_dash_accept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vod/manifest.mpd"))
        .and(header("accept", "application/dash+xml, */*"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MPD))
        .mount(&server)
        .await;

    let url = format!("{}/vod/manifest.mpd", server.uri());
    let text = fetcher(2000, None)
        .fetch_text(&url, ManifestFormat::Dash, &CancellationToken::new())
        .await
        .unwrap();
    assert!(text.contains("chunk_$Number$"));

    let timeline = vidline_core::manifest::parse(&text, ManifestFormat::Dash);
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline.segments()[0].url, "chunk_5.m4s");
}

#[tokio::test]
async fn test_http_error_is_structured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = format!("{}/missing.m3u8", server.uri());
    let fetcher = fetcher(2000, None);
    let err = fetcher
        .fetch_text(&url, ManifestFormat::Hls, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ManifestStatus { status: 404, .. }));
    assert!(err.is_manifest_unavailable());

    let timeline = fetcher
        .fetch_timeline(&url, ManifestFormat::Hls, &CancellationToken::new())
        .await;
    assert!(timeline.is_empty());
}

#[tokio::test]
async fn test_slow_manifest_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(MEDIA_PLAYLIST)
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let url = format!("{}/slow.m3u8", server.uri());
    let err = fetcher(50, None)
        .fetch_text(&url, ManifestFormat::Hls, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ManifestTimeout { timeout_ms: 50, .. }));
}

#[tokio::test]
async fn test_cancelled_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(MEDIA_PLAYLIST)
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let url = format!("{}/slow.m3u8", server.uri());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = fetcher(5000, None)
        .fetch_text(&url, ManifestFormat::Hls, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

#[tokio::test]
async fn test_absolute_urls_go_through_proxy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex("^/proxy/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MEDIA_PLAYLIST))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher(2000, Some(format!("{}/proxy", server.uri())));
    let timeline = fetcher
        .fetch_timeline(
            "https://cdn.example.com/live/index.m3u8",
            ManifestFormat::Hls,
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(timeline.len(), 3);
}

#[tokio::test]
async fn test_body_without_segments_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not a manifest</html>"))
        .mount(&server)
        .await;

    let url = format!("{}/index.m3u8", server.uri());
    let timeline = fetcher(2000, None)
        .fetch_timeline(&url, ManifestFormat::Hls, &CancellationToken::new())
        .await;
    assert!(timeline.is_empty());
}

#[tokio::test]
async fn test_unreachable_host_is_fetch_error() {
    let err = fetcher(2000, None)
        .fetch_text("http://127.0.0.1:9/index.m3u8", ManifestFormat::Hls, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ManifestFetch(_)), "got {err:?}");
    assert_eq!(err.error_code(), "MANIFEST_FETCH");
    assert!(err.is_manifest_unavailable());
}
