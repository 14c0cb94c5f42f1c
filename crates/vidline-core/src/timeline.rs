//! Segment timeline of the current source
//!
//! Owns the parsed segments and answers position, bitrate-class and
//! buffering queries for the segment visualization.

use crate::{bitrate::BitrateClass, buffer::BufferedRangeSet, BufferedRange, Segment};
use serde::{Deserialize, Serialize};

/// Ordered, contiguous segments of one source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentTimeline {
    segments: Vec<Segment>,
    total_duration: f64,
}

impl SegmentTimeline {
    pub fn new(segments: Vec<Segment>) -> Self {
        let total_duration = segments.last().map(|s| s.end_time).unwrap_or(0.0);
        Self {
            segments,
            total_duration,
        }
    }

    /// A timeline without segments; valid, never an error
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// End time of the last segment, or 0 when empty
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    /// Segment whose `[start, end)` contains `time`
    ///
    /// The exact end of the timeline maps to the last segment so that a
    /// finished playback still highlights something.
    pub fn segment_at(&self, time: f64) -> Option<&Segment> {
        if !time.is_finite() {
            return None;
        }

        let idx = self.segments.partition_point(|s| s.end_time <= time);
        if let Some(segment) = self.segments.get(idx).filter(|s| s.contains(time)) {
            return Some(segment);
        }

        match self.segments.last() {
            Some(last) if time == self.total_duration && last.duration > 0.0 => Some(last),
            _ => None,
        }
    }

    /// Index of the segment at `time`
    pub fn index_at(&self, time: f64) -> Option<usize> {
        let segment = self.segment_at(time)?;
        self.segments.iter().position(|s| std::ptr::eq(s, segment))
    }

    /// Presentation band of a bitrate
    pub fn classify(bitrate_bps: u64) -> BitrateClass {
        BitrateClass::from_bps(bitrate_bps)
    }

    /// True only when the whole segment lies inside a single range
    pub fn is_buffered(segment: &Segment, ranges: &[BufferedRange]) -> bool {
        ranges
            .iter()
            .any(|r| r.start <= segment.start_time && segment.end_time <= r.end)
    }

    /// Seek target snapped to the start of the segment containing `time`
    pub fn snap(&self, time: f64) -> f64 {
        match self.segment_at(time) {
            Some(segment) => segment.start_time,
            None if time.is_finite() => time.clamp(0.0, self.total_duration.max(0.0)),
            None => 0.0,
        }
    }

    /// Geometry of every segment relative to the media duration
    pub fn layout(&self, duration: f64, current_time: f64, ranges: &BufferedRangeSet) -> Vec<SegmentView> {
        if self.segments.is_empty() || duration <= 0.0 || !duration.is_finite() {
            return Vec::new();
        }

        self.segments
            .iter()
            .enumerate()
            .map(|(index, segment)| SegmentView {
                index,
                left_percent: segment.start_time / duration * 100.0,
                width_percent: segment.duration / duration * 100.0,
                class: Self::classify(segment.bitrate_bps),
                is_current: current_time >= segment.start_time && current_time <= segment.end_time,
                is_buffered: Self::is_buffered(segment, ranges.as_slice()),
            })
            .collect()
    }
}

/// One segment as drawn on the progress bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentView {
    pub index: usize,
    pub left_percent: f64,
    pub width_percent: f64,
    pub class: BitrateClass,
    pub is_current: bool,
    pub is_buffered: bool,
}
