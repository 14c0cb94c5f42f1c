//! HLS (HTTP Live Streaming) manifest parser
//!
//! Implements parsing for:
//! - Media playlists (`#EXTINF` segments, `#EXT-X-BYTERANGE` sizes)
//! - Master playlists (multivariant `#EXT-X-STREAM-INF` renditions)
//!
//! Media playlists are scanned line by line rather than handed to a strict
//! parser, so a broken entry costs one segment instead of the whole timeline.

use super::ManifestParser;
use crate::{bitrate::measure_bitrate, Rendition, Resolution, Segment};
use m3u8_rs::MasterPlaylist;
use tracing::{debug, warn};

const EXTINF: &str = "#EXTINF:";
const BYTERANGE: &str = "#EXT-X-BYTERANGE:";
const STREAM_INF: &str = "#EXT-X-STREAM-INF";

/// HLS manifest parser
#[derive(Debug, Default, Clone, Copy)]
pub struct HlsParser;

impl HlsParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse media playlist
    fn parse_media(&self, content: &str) -> Vec<Segment> {
        let lines: Vec<&str> = content.lines().map(str::trim).collect();
        let mut segments = Vec::new();
        let mut current_start = 0.0;
        let mut skipped = 0usize;

        let mut i = 0;
        while i < lines.len() {
            let Some(value) = lines[i].strip_prefix(EXTINF) else {
                i += 1;
                continue;
            };

            let duration = parse_extinf_duration(value);
            let mut size_bytes = 0u64;

            // Segment tags may sit between #EXTINF and its URI
            let mut j = i + 1;
            let mut uri = None;
            while j < lines.len() {
                let line = lines[j];
                if line.starts_with(EXTINF) {
                    break;
                }
                if let Some(range) = line.strip_prefix(BYTERANGE) {
                    size_bytes = parse_byterange_length(range).unwrap_or(0);
                } else if !line.is_empty() && !line.starts_with('#') {
                    uri = Some(line);
                    break;
                }
                j += 1;
            }

            match uri {
                Some(uri) => {
                    let bitrate = if size_bytes > 0 {
                        measure_bitrate(size_bytes, duration)
                    } else {
                        0
                    };
                    segments.push(
                        Segment::new(uri, current_start, duration).with_size(size_bytes, bitrate),
                    );
                    current_start += duration;
                    i = j + 1;
                }
                None => {
                    skipped += 1;
                    i = j;
                }
            }
        }

        if skipped > 0 {
            debug!(skipped, "Skipped #EXTINF entries without a segment URI");
        }
        debug!(
            segments = segments.len(),
            total_duration = current_start,
            "Parsed HLS media playlist"
        );

        segments
    }

    /// Parse master playlist
    fn parse_master(&self, content: &str) -> Vec<Rendition> {
        match m3u8_rs::parse_master_playlist_res(content.as_bytes()) {
            Ok(master) => self.extract_renditions(&master),
            Err(e) => {
                warn!("Failed to parse HLS master playlist: {:?}", e);
                Vec::new()
            }
        }
    }

    /// Extract renditions from master playlist
    fn extract_renditions(&self, master: &MasterPlaylist) -> Vec<Rendition> {
        let mut renditions: Vec<Rendition> = master
            .variants
            .iter()
            .filter(|variant| !variant.is_i_frame)
            .enumerate()
            .map(|(idx, variant)| Rendition {
                id: format!("variant_{}", idx),
                bandwidth: variant.bandwidth,
                resolution: variant
                    .resolution
                    .map(|r| Resolution::new(r.width as u32, r.height as u32)),
                codecs: variant.codecs.clone(),
                frame_rate: variant.frame_rate,
                url: variant.uri.clone(),
            })
            .collect();

        // Sort by bandwidth
        renditions.sort_by_key(|r| r.bandwidth);
        renditions
    }
}

impl ManifestParser for HlsParser {
    fn segments(&self, content: &str) -> Vec<Segment> {
        self.parse_media(content)
    }

    fn renditions(&self, content: &str) -> Vec<Rendition> {
        if content.contains(STREAM_INF) {
            self.parse_master(content)
        } else {
            Vec::new()
        }
    }
}

/// Duration from the value of an `#EXTINF:` tag (`<duration>,[<title>]`)
///
/// Reads the leading number the way `parseFloat` would; anything that is not
/// a finite, non-negative number becomes 0.
fn parse_extinf_duration(value: &str) -> f64 {
    let raw = value.split(',').next().unwrap_or_default().trim();
    let parsed = raw
        .parse::<f64>()
        .ok()
        .or_else(|| raw[..numeric_prefix_len(raw)].parse::<f64>().ok());

    match parsed {
        Some(duration) if duration.is_finite() && duration >= 0.0 => duration,
        _ => 0.0,
    }
}

/// Length of the leading `[+-]digits[.digits]` run
fn numeric_prefix_len(raw: &str) -> usize {
    let bytes = raw.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let mut seen_dot = false;
    while let Some(&b) = bytes.get(end) {
        match b {
            b'0'..=b'9' => {}
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    end
}

/// Length from an `#EXT-X-BYTERANGE:<n>[@<o>]` value
fn parse_byterange_length(value: &str) -> Option<u64> {
    value.split('@').next()?.trim().parse().ok()
}
