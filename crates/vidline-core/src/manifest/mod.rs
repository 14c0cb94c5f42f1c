//! Manifest parsing for HLS and DASH
//!
//! Parsing is pure: text in, segments out. Fetching lives in [`ManifestFetcher`]
//! and degrades every failure to an empty timeline.

mod dash;
mod fetch;
mod hls;

pub use dash::DashParser;
pub use fetch::ManifestFetcher;
pub use hls::HlsParser;

use crate::{Rendition, Segment, SegmentTimeline, StreamType};
use serde::{Deserialize, Serialize};
use url::Url;

/// Manifest formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestFormat {
    Hls,
    Dash,
}

impl ManifestFormat {
    /// Manifest format carried by a stream type, if any
    pub fn for_stream(stream_type: StreamType) -> Option<Self> {
        match stream_type {
            StreamType::Hls => Some(ManifestFormat::Hls),
            StreamType::Dash => Some(ManifestFormat::Dash),
            _ => None,
        }
    }
}

impl std::fmt::Display for ManifestFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManifestFormat::Hls => write!(f, "hls"),
            ManifestFormat::Dash => write!(f, "dash"),
        }
    }
}

/// Trait for manifest parsers
pub trait ManifestParser: Send + Sync {
    /// Segments with absolute timing, in playback order
    fn segments(&self, content: &str) -> Vec<Segment>;

    /// Quality levels declared by a multivariant playlist or MPD
    fn renditions(&self, content: &str) -> Vec<Rendition>;
}

/// Create the parser for a manifest format
pub fn create_parser(format: ManifestFormat) -> Box<dyn ManifestParser> {
    match format {
        ManifestFormat::Hls => Box::new(HlsParser::new()),
        ManifestFormat::Dash => Box::new(DashParser::new()),
    }
}

/// Parse manifest text into a segment timeline; never fails
pub fn parse(content: &str, format: ManifestFormat) -> SegmentTimeline {
    SegmentTimeline::new(create_parser(format).segments(content))
}

/// Quality levels declared in the manifest, sorted by bandwidth
pub fn renditions(content: &str, format: ManifestFormat) -> Vec<Rendition> {
    create_parser(format).renditions(content)
}

/// Lowercased URL path without query or fragment
fn url_path(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().to_lowercase(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_lowercase(),
    }
}

/// Detect stream type from URL or content
pub fn detect_stream_type(url: &str, content: Option<&str>) -> StreamType {
    // Check URL extension first
    let path = url_path(url);
    if path.ends_with(".m3u8") || path.ends_with(".m3u") {
        return StreamType::Hls;
    }
    if path.ends_with(".mpd") {
        return StreamType::Dash;
    }
    if path.ends_with(".mp4") || path.ends_with(".m4v") {
        return StreamType::Mp4;
    }
    if path.ends_with(".webm") {
        return StreamType::Webm;
    }

    // Check content if available
    if let Some(content) = content {
        if content.trim_start().starts_with("#EXTM3U") {
            return StreamType::Hls;
        }
        if content.contains("<MPD") || content.contains("urn:mpeg:dash") {
            return StreamType::Dash;
        }
    }

    StreamType::Progressive
}

/// Container name from the URL extension
pub fn detect_container(url: &str) -> &'static str {
    let path = url_path(url);
    let ext = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or_default();
    match ext {
        "m3u8" => "hls",
        "mpd" => "dash",
        "mp4" => "mp4",
        "webm" => "webm",
        "mkv" => "matroska",
        "mov" => "quicktime",
        "ts" => "mpegts",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_hls() {
        assert_eq!(detect_stream_type("https://example.com/master.m3u8", None), StreamType::Hls);
        assert_eq!(
            detect_stream_type("https://example.com/master.m3u8?token=abc", None),
            StreamType::Hls
        );
    }

    #[test]
    fn test_detect_dash() {
        assert_eq!(detect_stream_type("https://example.com/manifest.mpd", None), StreamType::Dash);
        assert_eq!(detect_stream_type("/local/manifest.MPD", None), StreamType::Dash);
    }

    #[test]
    fn test_detect_by_content() {
        assert_eq!(
            detect_stream_type("https://example.com/play", Some("#EXTM3U\n#EXT-X-VERSION:3")),
            StreamType::Hls
        );
        assert_eq!(
            detect_stream_type("https://example.com/play", Some("<?xml version=\"1.0\"?><MPD>")),
            StreamType::Dash
        );
        assert_eq!(detect_stream_type("https://example.com/play", None), StreamType::Progressive);
    }

    #[test]
    fn test_detect_container() {
        assert_eq!(detect_container("https://example.com/a.mkv"), "matroska");
        assert_eq!(detect_container("https://example.com/a.ts?x=1"), "mpegts");
        assert_eq!(detect_container("https://example.com/a"), "unknown");
    }

    #[test]
    fn test_parse_dispatch() {
        let timeline = parse("#EXTM3U\n#EXTINF:4.0,\nseg0.ts\n", ManifestFormat::Hls);
        assert_eq!(timeline.len(), 1);

        let timeline = parse("#EXTM3U\n#EXTINF:4.0,\nseg0.ts\n", ManifestFormat::Dash);
        assert!(timeline.is_empty());
    }
}
