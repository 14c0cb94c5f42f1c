//! Playback analytics
//!
//! Captures playback events for:
//! - Watch, pause and buffering time
//! - Interaction counts (seeks, volume, rate)
//! - Error tracking

use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info};
use uuid::Uuid;

/// Time updates are recorded once per this many seconds of media
const TIME_UPDATE_BUCKET: u64 = 10;

/// Analytics event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AnalyticsEvent {
    /// Source load started
    LoadStart { url: String },

    /// Metadata known
    LoadedMetadata { duration: f64 },

    /// Playback requested
    Play { position: f64 },

    /// Playback resumed after start or buffering
    Playing { position: f64 },

    /// Playback paused
    Pause { position: f64 },

    /// Stalled waiting for data
    Waiting { position: f64 },

    /// Seek performed
    Seeking { from: f64, to: f64 },

    VolumeChange { volume: f64, muted: bool },

    RateChange { rate: f64 },

    /// Quality pin changed (−1 = automatic)
    QualityChange { from: i32, to: i32 },

    FullscreenChange { active: bool },

    /// Periodic position sample
    TimeUpdate { position: f64, duration: f64 },

    /// Playback ended
    Ended { duration: f64 },

    /// Error occurred
    Error {
        code: String,
        message: String,
        fatal: bool,
    },
}

/// Analytics event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsEventRecord {
    /// Unique event ID
    pub id: Uuid,
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Sequence number within the session
    pub sequence: u64,
    #[serde(flatten)]
    pub event: AnalyticsEvent,
}

/// Aggregated playback metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackMetrics {
    /// Seconds spent playing
    pub total_play_time: f64,
    /// Seconds spent paused between plays
    pub total_paused_time: f64,
    /// Seconds spent waiting for data
    pub total_buffering_time: f64,
    pub seek_count: u64,
    pub volume_changes: u64,
    pub rate_changes: u64,
    pub errors: u64,
    pub event_count: u64,
}

#[derive(Debug, Serialize)]
struct Export<'a> {
    session_id: Uuid,
    metrics: &'a PlaybackMetrics,
    events: &'a VecDeque<AnalyticsEventRecord>,
}

/// In-memory analytics for one viewing session
#[derive(Debug, Clone)]
pub struct AnalyticsTracker {
    session_id: Uuid,
    sequence: u64,
    events: VecDeque<AnalyticsEventRecord>,
    max_events: usize,
    metrics: PlaybackMetrics,
    play_started: Option<DateTime<Utc>>,
    paused_at: Option<DateTime<Utc>>,
    buffering_started: Option<DateTime<Utc>>,
    last_time_bucket: Option<u64>,
}

impl AnalyticsTracker {
    pub fn new(max_events: usize) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            sequence: 0,
            events: VecDeque::new(),
            max_events: max_events.max(1),
            metrics: PlaybackMetrics::default(),
            play_started: None,
            paused_at: None,
            buffering_started: None,
            last_time_bucket: None,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Record an event now
    pub fn record(&mut self, event: AnalyticsEvent) {
        self.record_at(event, Utc::now());
    }

    /// Record an event at a given instant
    pub fn record_at(&mut self, event: AnalyticsEvent, now: DateTime<Utc>) {
        match &event {
            AnalyticsEvent::Play { .. } => {
                if let Some(paused_at) = self.paused_at.take() {
                    self.metrics.total_paused_time += seconds_between(paused_at, now);
                }
                self.play_started.get_or_insert(now);
            }
            AnalyticsEvent::Pause { .. } | AnalyticsEvent::Ended { .. } => {
                if let Some(started) = self.play_started.take() {
                    self.metrics.total_play_time += seconds_between(started, now);
                }
                self.paused_at = Some(now);
            }
            AnalyticsEvent::Waiting { .. } => {
                self.buffering_started.get_or_insert(now);
            }
            AnalyticsEvent::Playing { .. } => {
                if let Some(started) = self.buffering_started.take() {
                    self.metrics.total_buffering_time += seconds_between(started, now);
                }
            }
            AnalyticsEvent::Seeking { .. } => self.metrics.seek_count += 1,
            AnalyticsEvent::VolumeChange { .. } => self.metrics.volume_changes += 1,
            AnalyticsEvent::RateChange { .. } => self.metrics.rate_changes += 1,
            AnalyticsEvent::Error { .. } => self.metrics.errors += 1,
            AnalyticsEvent::TimeUpdate { position, .. } => {
                let bucket = (position.max(0.0) as u64) / TIME_UPDATE_BUCKET;
                if self.last_time_bucket == Some(bucket) {
                    return;
                }
                self.last_time_bucket = Some(bucket);
            }
            AnalyticsEvent::LoadStart { .. }
            | AnalyticsEvent::LoadedMetadata { .. }
            | AnalyticsEvent::QualityChange { .. }
            | AnalyticsEvent::FullscreenChange { .. } => {}
        }

        self.sequence += 1;
        self.metrics.event_count += 1;
        debug!(sequence = self.sequence, event = ?event, "Analytics event");

        if self.events.len() == self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(AnalyticsEventRecord {
            id: Uuid::new_v4(),
            session_id: self.session_id,
            timestamp: now,
            sequence: self.sequence,
            event,
        });
    }

    /// Retained events, oldest first
    pub fn events(&self) -> impl Iterator<Item = &AnalyticsEventRecord> {
        self.events.iter()
    }

    pub fn metrics(&self) -> &PlaybackMetrics {
        &self.metrics
    }

    /// Start a new session with a fresh id
    pub fn reset(&mut self) {
        let max_events = self.max_events;
        *self = Self::new(max_events);
        info!(session_id = %self.session_id, "Analytics session reset");
    }

    /// Session id, metrics and retained events as JSON
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&Export {
            session_id: self.session_id,
            metrics: &self.metrics,
            events: &self.events,
        })?)
    }
}

impl Default for AnalyticsTracker {
    fn default() -> Self {
        Self::new(1000)
    }
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    ((to - from).num_milliseconds().max(0)) as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_play_pause_time() {
        let mut tracker = AnalyticsTracker::default();
        let t0 = Utc::now();

        tracker.record_at(AnalyticsEvent::Play { position: 0.0 }, t0);
        tracker.record_at(AnalyticsEvent::Pause { position: 12.0 }, t0 + Duration::seconds(12));
        tracker.record_at(AnalyticsEvent::Play { position: 12.0 }, t0 + Duration::seconds(15));
        tracker.record_at(AnalyticsEvent::Ended { duration: 20.0 }, t0 + Duration::seconds(23));

        let metrics = tracker.metrics();
        assert_eq!(metrics.total_play_time, 20.0);
        assert_eq!(metrics.total_paused_time, 3.0);
        assert_eq!(metrics.event_count, 4);
    }

    #[test]
    fn test_buffering_time() {
        let mut tracker = AnalyticsTracker::default();
        let t0 = Utc::now();
        tracker.record_at(AnalyticsEvent::Waiting { position: 4.0 }, t0);
        tracker.record_at(AnalyticsEvent::Waiting { position: 4.0 }, t0 + Duration::milliseconds(500));
        tracker.record_at(AnalyticsEvent::Playing { position: 4.0 }, t0 + Duration::milliseconds(1500));
        assert_eq!(tracker.metrics().total_buffering_time, 1.5);
    }

    #[test]
    fn test_counters_and_sequence() {
        let mut tracker = AnalyticsTracker::default();
        tracker.record(AnalyticsEvent::Seeking { from: 0.0, to: 30.0 });
        tracker.record(AnalyticsEvent::VolumeChange { volume: 0.5, muted: false });
        tracker.record(AnalyticsEvent::RateChange { rate: 1.5 });
        tracker.record(AnalyticsEvent::Error {
            code: "ENGINE_ATTACH".to_string(),
            message: "unsupported codec".to_string(),
            fatal: true,
        });

        let metrics = tracker.metrics();
        assert_eq!(metrics.seek_count, 1);
        assert_eq!(metrics.volume_changes, 1);
        assert_eq!(metrics.rate_changes, 1);
        assert_eq!(metrics.errors, 1);

        let sequences: Vec<u64> = tracker.events().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_time_updates_sampled() {
        let mut tracker = AnalyticsTracker::default();
        for position in [0.5, 3.0, 9.9, 10.2, 14.0, 21.0] {
            tracker.record(AnalyticsEvent::TimeUpdate {
                position,
                duration: 60.0,
            });
        }
        assert_eq!(tracker.events().count(), 3);
    }

    #[test]
    fn test_event_cap() {
        let mut tracker = AnalyticsTracker::new(2);
        for i in 0..5 {
            tracker.record(AnalyticsEvent::RateChange { rate: 1.0 + i as f64 });
        }
        let kept: Vec<u64> = tracker.events().map(|e| e.sequence).collect();
        assert_eq!(kept, vec![4, 5]);
        assert_eq!(tracker.metrics().event_count, 5);
    }

    #[test]
    fn test_reset_and_export() {
        let mut tracker = AnalyticsTracker::default();
        let first = tracker.session_id();
        tracker.record(AnalyticsEvent::LoadStart {
            url: "https://cdn.example.com/a.m3u8".to_string(),
        });

        let json: serde_json::Value = serde_json::from_str(&tracker.export_json().unwrap()).unwrap();
        assert_eq!(json["events"][0]["event"], "load_start");
        assert_eq!(json["metrics"]["event_count"], 1);

        tracker.reset();
        assert_ne!(tracker.session_id(), first);
        assert_eq!(tracker.events().count(), 0);
    }
}
