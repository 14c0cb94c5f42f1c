//! Core types for vidline

use crate::{manifest::detect_stream_type, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A time-bounded, independently fetchable chunk of media
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// URI of the segment as written in the manifest
    pub url: String,
    /// Absolute start time in seconds
    pub start_time: f64,
    /// Absolute end time in seconds
    pub end_time: f64,
    /// `end_time - start_time`
    pub duration: f64,
    /// Size in bytes (0 = unknown)
    pub size_bytes: u64,
    /// Bitrate in bits per second (0 = unknown)
    pub bitrate_bps: u64,
}

impl Segment {
    pub fn new(url: impl Into<String>, start_time: f64, duration: f64) -> Self {
        Self {
            url: url.into(),
            start_time,
            end_time: start_time + duration,
            duration,
            size_bytes: 0,
            bitrate_bps: 0,
        }
    }

    pub fn with_size(mut self, size_bytes: u64, bitrate_bps: u64) -> Self {
        self.size_bytes = size_bytes;
        self.bitrate_bps = bitrate_bps;
        self
    }

    /// Half-open containment: `[start, end)`
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start_time && time < self.end_time
    }
}

/// A contiguous interval of media time that is ready for playback
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BufferedRange {
    pub start: f64,
    pub end: f64,
}

impl BufferedRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Length of the range in seconds
    pub fn len(&self) -> f64 {
        self.end - self.start
    }

    /// True for zero-length, inverted or non-finite ranges
    pub fn is_empty(&self) -> bool {
        !(self.start.is_finite() && self.end.is_finite() && self.end > self.start)
    }

    /// Closed containment: `[start, end]`
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }
}

impl From<(f64, f64)> for BufferedRange {
    fn from((start, end): (f64, f64)) -> Self {
        Self { start, end }
    }
}

/// Concrete stream type after detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    Hls,
    Dash,
    Mp4,
    Webm,
    /// Anything else, handed to the media element as-is
    Progressive,
}

impl StreamType {
    /// Only adaptive streams carry a manifest worth fetching
    pub fn has_manifest(&self) -> bool {
        matches!(self, StreamType::Hls | StreamType::Dash)
    }
}

impl std::fmt::Display for StreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamType::Hls => write!(f, "hls"),
            StreamType::Dash => write!(f, "dash"),
            StreamType::Mp4 => write!(f, "mp4"),
            StreamType::Webm => write!(f, "webm"),
            StreamType::Progressive => write!(f, "progressive"),
        }
    }
}

/// Declared type of a source; `Auto` is resolved from the URL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    #[default]
    Auto,
    Hls,
    Dash,
    Mp4,
    Webm,
}

impl SourceType {
    /// Resolve to a concrete stream type
    pub fn resolve(&self, url: &str) -> StreamType {
        match self {
            SourceType::Auto => detect_stream_type(url, None),
            SourceType::Hls => StreamType::Hls,
            SourceType::Dash => StreamType::Dash,
            SourceType::Mp4 => StreamType::Mp4,
            SourceType::Webm => StreamType::Webm,
        }
    }
}

impl std::str::FromStr for SourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(SourceType::Auto),
            "hls" => Ok(SourceType::Hls),
            "dash" => Ok(SourceType::Dash),
            "mp4" => Ok(SourceType::Mp4),
            "webm" => Ok(SourceType::Webm),
            other => Err(Error::UnsupportedStream(other.to_string())),
        }
    }
}

/// A source handed to the switch coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSource {
    pub url: String,
    #[serde(default)]
    pub kind: SourceType,
}

impl MediaSource {
    pub fn new(url: impl Into<String>, kind: SourceType) -> Self {
        Self {
            url: url.into(),
            kind,
        }
    }

    pub fn auto(url: impl Into<String>) -> Self {
        Self::new(url, SourceType::Auto)
    }

    pub fn stream_type(&self) -> StreamType {
        self.kind.resolve(&self.url)
    }
}

/// One entry of a playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default, rename = "type")]
    pub kind: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Duration hint in seconds, shown before metadata is known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_hint: Option<f64>,
}

impl PlaylistItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            kind: SourceType::Auto,
            thumbnail_url: None,
            duration_hint: None,
        }
    }

    pub fn with_kind(mut self, kind: SourceType) -> Self {
        self.kind = kind;
        self
    }

    pub fn source(&self) -> MediaSource {
        MediaSource::new(self.url.clone(), self.kind)
    }
}

/// Video resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Get quality name (e.g., "1080p", "4K")
    pub fn quality_name(&self) -> &'static str {
        match self.height {
            0..=240 => "240p",
            241..=360 => "360p",
            361..=480 => "480p",
            481..=720 => "720p",
            721..=1080 => "1080p",
            1081..=1440 => "1440p",
            _ => "4K",
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A quality level (rendition/variant) of the same content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rendition {
    pub id: String,
    /// Declared bandwidth in bits per second
    pub bandwidth: u64,
    pub resolution: Option<Resolution>,
    pub codecs: Option<String>,
    pub frame_rate: Option<f64>,
    pub url: String,
}

/// Player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Manifest fetch timeout in milliseconds
    pub manifest_timeout_ms: u64,
    /// Same-origin proxy path prefix for absolute manifest URLs
    pub proxy_prefix: Option<String>,
    /// Buffer ahead (seconds) below which playback is considered unhealthy
    pub rebuffer_threshold: f64,
    /// Short seek step in seconds (arrow keys)
    pub seek_step: f64,
    /// Long seek step in seconds (j/l keys)
    pub long_seek_step: f64,
    /// Volume step for keyboard adjustments
    pub volume_step: f64,
    /// Lowest accepted playback rate
    pub min_playback_rate: f64,
    /// Highest accepted playback rate
    pub max_playback_rate: f64,
    /// Resume playback after the playlist advances
    pub autoplay_next: bool,
    /// Enable analytics
    pub analytics_enabled: bool,
    /// Maximum number of analytics events kept in memory
    pub analytics_max_events: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            manifest_timeout_ms: 5000,
            proxy_prefix: None,
            rebuffer_threshold: 2.0,
            seek_step: 5.0,
            long_seek_step: 10.0,
            volume_step: 0.1,
            min_playback_rate: 0.0625,
            max_playback_rate: 16.0,
            autoplay_next: true,
            analytics_enabled: true,
            analytics_max_events: 1000,
        }
    }
}

impl PlayerConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PlayerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.manifest_timeout_ms == 0 {
            return Err(Error::InvalidConfig("manifest_timeout_ms must be positive".to_string()));
        }
        if !(self.min_playback_rate > 0.0 && self.min_playback_rate <= self.max_playback_rate) {
            return Err(Error::InvalidConfig(format!(
                "invalid playback rate bounds {}..{}",
                self.min_playback_rate, self.max_playback_rate
            )));
        }
        if !(self.volume_step > 0.0 && self.volume_step <= 1.0) {
            return Err(Error::InvalidConfig("volume_step must be in (0, 1]".to_string()));
        }
        if self.seek_step <= 0.0 || self.long_seek_step <= 0.0 {
            return Err(Error::InvalidConfig("seek steps must be positive".to_string()));
        }
        if self.rebuffer_threshold < 0.0 {
            return Err(Error::InvalidConfig("rebuffer_threshold must not be negative".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_segment_half_open() {
        let seg = Segment::new("seg0.ts", 0.0, 10.0);
        assert!(seg.contains(0.0));
        assert!(seg.contains(9.999));
        assert!(!seg.contains(10.0));
    }

    #[test]
    fn test_buffered_range_empty() {
        assert!(BufferedRange::new(3.0, 3.0).is_empty());
        assert!(BufferedRange::new(5.0, 3.0).is_empty());
        assert!(BufferedRange::new(f64::NAN, 3.0).is_empty());
        assert!(!BufferedRange::new(0.0, 0.5).is_empty());
    }

    #[test]
    fn test_source_type_resolve() {
        assert_eq!(SourceType::Auto.resolve("https://cdn.example.com/live.m3u8"), StreamType::Hls);
        assert_eq!(SourceType::Auto.resolve("https://cdn.example.com/vod.mpd"), StreamType::Dash);
        assert_eq!(SourceType::Dash.resolve("https://cdn.example.com/vod.m3u8"), StreamType::Dash);
        assert_eq!("WEBM".parse::<SourceType>().unwrap(), SourceType::Webm);
        assert!("flv".parse::<SourceType>().is_err());
    }

    #[test]
    fn test_playlist_item_json() {
        let json = r#"{"id":"1","title":"Intro","url":"https://cdn.example.com/a.mpd","type":"dash"}"#;
        let item: PlaylistItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.kind, SourceType::Dash);
        assert!(item.thumbnail_url.is_none());
    }

    #[test]
    fn test_config_defaults() {
        let config = PlayerConfig::default();
        assert_eq!(config.manifest_timeout_ms, 5000);
        assert_eq!(config.rebuffer_threshold, 2.0);
        assert!(config.autoplay_next);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_partial_json() {
        let config = PlayerConfig::from_json_str(r#"{"manifest_timeout_ms": 2500}"#).unwrap();
        assert_eq!(config.manifest_timeout_ms, 2500);
        assert_eq!(config.seek_step, 5.0);

        assert!(PlayerConfig::from_json_str(r#"{"manifest_timeout_ms": 0}"#).is_err());
        assert!(PlayerConfig::from_json_str(r#"{"min_playback_rate": 4.0, "max_playback_rate": 2.0}"#).is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"proxy_prefix": "/proxy", "autoplay_next": false}}"#).unwrap();

        let config = PlayerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.proxy_prefix.as_deref(), Some("/proxy"));
        assert!(!config.autoplay_next);
    }
}
