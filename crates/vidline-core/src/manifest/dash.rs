//! DASH (Dynamic Adaptive Streaming over HTTP) manifest parser
//!
//! Implements parsing for:
//! - SegmentTemplate declarations (one synthetic segment per template)
//! - Representation elements (renditions)

use super::ManifestParser;
use crate::{Rendition, Resolution, Segment};
use tracing::debug;

const SEGMENT_TEMPLATE: &str = "<SegmentTemplate";
const REPRESENTATION: &str = "<Representation";
const REPRESENTATION_END: &str = "</Representation";

/// DASH MPD parser
#[derive(Debug, Default, Clone, Copy)]
pub struct DashParser;

impl DashParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse segments from MPD content
    fn parse_segments(&self, content: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut current_start = 0.0;

        for (index, (position, _)) in element_starts(content, SEGMENT_TEMPLATE).enumerate() {
            let Some(attrs) = element_attrs(&content[position + SEGMENT_TEMPLATE.len()..]) else {
                continue;
            };

            let duration = extract_attr(attrs, "duration").and_then(|s| s.parse::<u64>().ok());
            let timescale = extract_attr(attrs, "timescale").and_then(|s| s.parse::<u64>().ok());

            let (duration, timescale) = match (duration, timescale) {
                (Some(d), Some(t)) if d > 0 && t > 0 => (d, t),
                _ => {
                    debug!(index, "Skipping SegmentTemplate without duration/timescale");
                    continue;
                }
            };

            let segment_duration = duration as f64 / timescale as f64;
            let representation = enclosing_representation(content, position);
            let representation_id = representation
                .and_then(|attrs| extract_attr(attrs, "id"))
                .unwrap_or_default();
            let bandwidth = representation
                .and_then(|attrs| extract_attr(attrs, "bandwidth"))
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(0);

            let url = match extract_attr(attrs, "media") {
                Some(template) => {
                    let start_number = extract_attr(attrs, "startNumber")
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(1);
                    template
                        .replace("$RepresentationID$", &representation_id)
                        .replace("$Bandwidth$", &bandwidth.to_string())
                        .replace("$Number$", &start_number.to_string())
                        .replace("$Time$", "0")
                }
                None => format!("segment-{}.m4s", index),
            };

            let mut segment = Segment::new(url, current_start, segment_duration);
            segment.bitrate_bps = bandwidth;
            segments.push(segment);
            current_start += segment_duration;
        }

        debug!(
            segments = segments.len(),
            total_duration = current_start,
            "Parsed DASH segment templates"
        );

        segments
    }

    /// Extract representations from MPD
    fn extract_representations(&self, content: &str) -> Vec<Rendition> {
        let mut renditions = Vec::new();

        for (idx, (position, _)) in element_starts(content, REPRESENTATION).enumerate() {
            let body = &content[position + REPRESENTATION.len()..];
            let Some(attrs) = element_attrs(body) else {
                continue;
            };

            let bandwidth = extract_attr(attrs, "bandwidth")
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(0);

            let width = extract_attr(attrs, "width").and_then(|s| s.parse::<u32>().ok());
            let height = extract_attr(attrs, "height").and_then(|s| s.parse::<u32>().ok());
            let resolution = match (width, height) {
                (Some(w), Some(h)) => Some(Resolution::new(w, h)),
                _ => None,
            };

            let frame_rate = extract_attr(attrs, "frameRate").and_then(|s| parse_frame_rate(&s));

            renditions.push(Rendition {
                id: extract_attr(attrs, "id").unwrap_or_else(|| format!("rep_{}", idx)),
                bandwidth,
                resolution,
                codecs: extract_attr(attrs, "codecs"),
                frame_rate,
                url: extract_base_url(body).unwrap_or_default(),
            });
        }

        // Sort by bandwidth
        renditions.sort_by_key(|r| r.bandwidth);
        renditions
    }
}

impl ManifestParser for DashParser {
    fn segments(&self, content: &str) -> Vec<Segment> {
        self.parse_segments(content)
    }

    fn renditions(&self, content: &str) -> Vec<Rendition> {
        self.extract_representations(content)
    }
}

/// Positions of `<Name` opening tags, excluding longer names such as
/// `<RepresentationIndex`
fn element_starts<'a>(content: &'a str, tag: &'a str) -> impl Iterator<Item = (usize, &'a str)> + 'a {
    content.match_indices(tag).filter(move |(position, _)| {
        content[position + tag.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_whitespace() || c == '>' || c == '/')
    })
}

/// Attribute section of an element, up to its closing `>`
fn element_attrs(body: &str) -> Option<&str> {
    body.find('>').map(|end| body[..end].trim_end_matches('/'))
}

/// Attributes of the `<Representation>` still open at `position`
fn enclosing_representation(content: &str, position: usize) -> Option<&str> {
    let before = &content[..position];
    let open = element_starts(before, REPRESENTATION).last()?.0;
    let tail = &before[open + REPRESENTATION.len()..];
    let tag_end = tail.find('>')?;
    if tail[..tag_end].ends_with('/') || tail.contains(REPRESENTATION_END) {
        return None;
    }
    Some(&tail[..tag_end])
}

/// Extract attribute value from XML attributes string
fn extract_attr(attrs: &str, name: &str) -> Option<String> {
    let pattern = format!("{}=", name);
    let mut search = 0;

    while let Some(found) = attrs[search..].find(&pattern) {
        let start = search + found;
        let value_start = start + pattern.len();
        let on_boundary = attrs[..start].ends_with(char::is_whitespace) || start == 0;

        if on_boundary {
            let rest = &attrs[value_start..];
            let quote = rest.chars().next()?;
            if quote == '"' || quote == '\'' {
                let end = rest[1..].find(quote)?;
                return Some(rest[1..1 + end].to_string());
            }
        }
        search = value_start;
    }
    None
}

/// Extract BaseURL text inside an element body
fn extract_base_url(body: &str) -> Option<String> {
    let end_of_element = body.find(REPRESENTATION_END).unwrap_or(body.len());
    let body = &body[..end_of_element];
    let start = body.find("<BaseURL>")? + "<BaseURL>".len();
    let end = body[start..].find("</BaseURL>")?;
    Some(body[start..start + end].trim().to_string())
}

/// Parse `30`, `29.97` or `30000/1001`
fn parse_frame_rate(value: &str) -> Option<f64> {
    match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            (den != 0.0).then(|| num / den)
        }
        None => value.parse().ok(),
    }
}
