//! Capability traits for the external playback collaborators
//!
//! The core never talks to a concrete streaming engine or media element;
//! hosts plug theirs in through these traits.

use crate::{BufferedRange, Result, StreamType};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Playback primitives of the media element
///
/// Calls are assumed to succeed except `play`, which a host may refuse
/// (for instance under an autoplay policy).
pub trait MediaElement: Send + Sync {
    /// Point the element at a progressive source
    fn set_source(&self, url: &str);
    fn play(&self) -> Result<()>;
    fn pause(&self);
    fn set_current_time(&self, time: f64);
    fn set_volume(&self, volume: f64);
    fn set_muted(&self, muted: bool);
    fn set_playback_rate(&self, rate: f64);
    /// Raw buffered intervals, in whatever order the element reports them
    fn buffered(&self) -> Vec<BufferedRange>;
    /// Activate a text track by id, or disable subtitles with `None`
    fn set_text_track(&self, id: Option<&str>);
    fn request_fullscreen(&self);
    fn exit_fullscreen(&self);
    fn request_picture_in_picture(&self);
    fn exit_picture_in_picture(&self);
}

/// An adaptive streaming engine feeding a media element
///
/// `load` may never resolve if the engine hangs; wrap it in
/// `tokio::time::timeout` when that matters.
#[async_trait]
pub trait AdaptiveEngine: Send + Sync {
    /// Engine name for logs
    fn name(&self) -> &str;

    /// Attach `url` to `sink`; resolves once playback can start
    async fn load(&mut self, url: &str, sink: Arc<dyn MediaElement>) -> Result<()>;

    /// Pin a level, or −1 for automatic selection
    fn set_level(&mut self, id: i32);

    /// Currently selected level, −1 when automatic
    fn level(&self) -> i32;

    /// Number of quality levels known after `load`
    fn level_count(&self) -> usize {
        0
    }

    /// Bandwidth estimate in bits per second
    fn bandwidth_estimate(&self) -> u64;

    /// Release everything the engine holds
    async fn destroy(&mut self);
}

/// Creates engines for a detected stream type
pub trait EngineFactory: Send + Sync {
    fn create(&self, stream_type: StreamType) -> Result<Box<dyn AdaptiveEngine>>;
}

/// Engine for progressive files the media element plays on its own
#[derive(Default)]
pub struct ProgressiveEngine {
    sink: Option<Arc<dyn MediaElement>>,
}

impl std::fmt::Debug for ProgressiveEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressiveEngine")
            .field("attached", &self.sink.is_some())
            .finish()
    }
}

impl ProgressiveEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AdaptiveEngine for ProgressiveEngine {
    fn name(&self) -> &str {
        "progressive"
    }

    async fn load(&mut self, url: &str, sink: Arc<dyn MediaElement>) -> Result<()> {
        debug!(url, "Attaching progressive source");
        sink.set_source(url);
        self.sink = Some(sink);
        Ok(())
    }

    fn set_level(&mut self, _id: i32) {}

    fn level(&self) -> i32 {
        -1
    }

    fn bandwidth_estimate(&self) -> u64 {
        0
    }

    async fn destroy(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.set_source("");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingElement {
        sources: Mutex<Vec<String>>,
    }

    impl MediaElement for RecordingElement {
        fn set_source(&self, url: &str) {
            self.sources.lock().unwrap().push(url.to_string());
        }
        fn play(&self) -> Result<()> {
            Ok(())
        }
        fn pause(&self) {}
        fn set_current_time(&self, _time: f64) {}
        fn set_volume(&self, _volume: f64) {}
        fn set_muted(&self, _muted: bool) {}
        fn set_playback_rate(&self, _rate: f64) {}
        fn buffered(&self) -> Vec<BufferedRange> {
            Vec::new()
        }
        fn set_text_track(&self, _id: Option<&str>) {}
        fn request_fullscreen(&self) {}
        fn exit_fullscreen(&self) {}
        fn request_picture_in_picture(&self) {}
        fn exit_picture_in_picture(&self) {}
    }

    #[tokio::test]
    async fn test_progressive_engine_sets_and_clears_source() {
        let element = Arc::new(RecordingElement::default());
        let mut engine = ProgressiveEngine::new();

        engine
            .load("https://cdn.example.com/a.mp4", element.clone())
            .await
            .unwrap();
        assert_eq!(engine.level(), -1);
        assert_eq!(engine.level_count(), 0);

        engine.destroy().await;
        engine.destroy().await;
        assert_eq!(
            *element.sources.lock().unwrap(),
            vec!["https://cdn.example.com/a.mp4".to_string(), String::new()]
        );
    }
}
