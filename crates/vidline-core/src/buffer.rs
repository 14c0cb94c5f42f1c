//! Buffered range tracking for video playback
//!
//! Handles:
//! - Normalizing raw buffered-interval reports from the media element
//! - Buffer-ahead measurement at the playhead
//! - Buffer health for rebuffer detection

use crate::BufferedRange;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Canonical buffered ranges: sorted by start, non-overlapping, non-touching
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BufferedRangeSet {
    ranges: Vec<BufferedRange>,
}

impl BufferedRangeSet {
    /// Build the canonical set from an arbitrary snapshot
    ///
    /// Non-finite, zero-length and inverted ranges are dropped; ranges whose
    /// start is at or before the running end are merged. Applying this to
    /// its own output changes nothing.
    pub fn from_raw(raw: &[BufferedRange]) -> Self {
        let mut valid: Vec<BufferedRange> = raw.iter().copied().filter(|r| !r.is_empty()).collect();
        valid.sort_by(|a, b| a.start.total_cmp(&b.start));

        let mut ranges: Vec<BufferedRange> = Vec::with_capacity(valid.len());
        for range in valid {
            match ranges.last_mut() {
                Some(current) if range.start <= current.end => {
                    current.end = current.end.max(range.end);
                }
                _ => ranges.push(range),
            }
        }

        Self { ranges }
    }

    pub fn as_slice(&self) -> &[BufferedRange] {
        &self.ranges
    }

    pub fn iter(&self) -> impl Iterator<Item = &BufferedRange> {
        self.ranges.iter()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Range containing `time`, closed at both ends
    pub fn range_at(&self, time: f64) -> Option<&BufferedRange> {
        self.ranges.iter().find(|r| r.contains(time))
    }

    /// Sum of all range lengths in seconds
    pub fn total_buffered(&self) -> f64 {
        self.ranges.iter().map(BufferedRange::len).sum()
    }

    /// Milliseconds buffered ahead of `time`
    pub fn buffered_ahead_ms(&self, time: f64) -> u64 {
        buffered_ahead_ms(&self.ranges, time)
    }
}

impl From<BufferedRangeSet> for Vec<BufferedRange> {
    fn from(set: BufferedRangeSet) -> Self {
        set.ranges
    }
}

/// Milliseconds between `time` and the end of the range containing it
///
/// Zero when no range contains `time`.
pub fn buffered_ahead_ms(ranges: &[BufferedRange], time: f64) -> u64 {
    if !time.is_finite() {
        return 0;
    }
    ranges
        .iter()
        .find(|r| r.contains(time))
        .map(|r| ((r.end - time) * 1000.0).round().max(0.0) as u64)
        .unwrap_or(0)
}

/// Buffer health at the playhead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferHealth {
    /// Milliseconds buffered ahead of the playhead
    pub ahead_ms: u64,
    /// Seconds buffered across all ranges
    pub total_buffered: f64,
    pub range_count: usize,
    /// Buffer ahead at or above the rebuffer threshold
    pub healthy: bool,
}

/// Keeps the canonical range set, recomputed from each raw snapshot
#[derive(Debug, Clone, Default)]
pub struct BufferedRangeTracker {
    ranges: BufferedRangeSet,
}

impl BufferedRangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the tracked set with the normalized `raw` snapshot
    pub fn update(&mut self, raw: &[BufferedRange]) -> &BufferedRangeSet {
        self.ranges = BufferedRangeSet::from_raw(raw);
        debug!(
            raw = raw.len(),
            ranges = self.ranges.len(),
            buffered = self.ranges.total_buffered(),
            "Buffered ranges updated"
        );
        &self.ranges
    }

    pub fn ranges(&self) -> &BufferedRangeSet {
        &self.ranges
    }

    pub fn buffered_ahead_ms(&self, time: f64) -> u64 {
        self.ranges.buffered_ahead_ms(time)
    }

    /// Health at `time` against a threshold in seconds
    pub fn health(&self, time: f64, rebuffer_threshold: f64) -> BufferHealth {
        let ahead_ms = self.buffered_ahead_ms(time);
        BufferHealth {
            ahead_ms,
            total_buffered: self.ranges.total_buffered(),
            range_count: self.ranges.len(),
            healthy: ahead_ms as f64 / 1000.0 >= rebuffer_threshold,
        }
    }

    /// Forget everything, e.g. on source change
    pub fn reset(&mut self) {
        self.ranges = BufferedRangeSet::default();
        debug!("Buffered ranges cleared");
    }
}
