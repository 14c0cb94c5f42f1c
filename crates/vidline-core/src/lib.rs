//! Vidline Core - streaming player core
//!
//! This crate provides the engine-agnostic parts of a video player:
//! - HLS and DASH manifest parsing into segment timelines
//! - Buffered range normalization and buffer health
//! - A playback state machine driven by commands and media events
//! - Source switching with engine teardown and background manifest fetch
//! - Playback analytics and keyboard shortcuts
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Vidline Core                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │   Manifest   │  │   Segment    │  │   Buffered   │           │
//! │  │    Parser    │──│   Timeline   │  │    Ranges    │           │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘           │
//! │         │                 │                 │                   │
//! │  ┌──────┴───────┐         │          ┌──────┴───────┐           │
//! │  │    Source    │         └──────────│   Playback   │           │
//! │  │    Switch    │                    │    State     │           │
//! │  │ Coordinator  │                    │   Machine    │           │
//! │  └──────┬───────┘                    └──────┬───────┘           │
//! │         │          ┌─────────────┐          │                   │
//! │         └──────────│   Player    │──────────┘                   │
//! │                    │   Session   │                              │
//! │                    └──────┬──────┘                              │
//! │                           │                                     │
//! │  ┌──────────────┐  ┌──────┴──────┐  ┌──────────────┐            │
//! │  │  Analytics   │  │   Media     │  │  Transcode   │            │
//! │  │   Tracker    │  │  Element    │  │   Session    │            │
//! │  └──────────────┘  └─────────────┘  └──────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod types;
pub mod bitrate;
pub mod manifest;
pub mod timeline;
pub mod buffer;
pub mod playlist;
pub mod playback;
pub mod engine;
pub mod transcode;
pub mod source;
pub mod analytics;
pub mod keymap;
pub mod session;

pub use error::{Error, Result};
pub use types::*;
pub use bitrate::BitrateClass;
pub use manifest::{DashParser, HlsParser, ManifestFetcher, ManifestFormat, ManifestParser};
pub use timeline::{SegmentTimeline, SegmentView};
pub use buffer::{buffered_ahead_ms, BufferHealth, BufferedRangeSet, BufferedRangeTracker};
pub use playlist::Playlist;
pub use playback::{Command, Effect, MediaEvent, PlaybackState, PlaybackStateMachine, AUTO_QUALITY};
pub use engine::{AdaptiveEngine, EngineFactory, MediaElement, ProgressiveEngine};
pub use transcode::{MediaInfo, MediaInput, TranscodeOp, TranscodeOutput, TranscodeSession, Transcoder, TranscoderFactory};
pub use source::{SourceSwitchCoordinator, SwitchOutcome};
pub use analytics::{AnalyticsEvent, AnalyticsTracker, PlaybackMetrics};
pub use keymap::{Key, Keymap};
pub use session::{PlayerSession, PlayerStats, SessionError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the player library with default configuration
pub fn init() {
    tracing::info!(version = VERSION, "Vidline Core initialized");
}
