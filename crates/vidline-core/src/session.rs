//! Player Session - host for one player instance
//!
//! Coordinates:
//! - Command and media event dispatch into the state machine
//! - Applying effects to the media element and the source coordinator
//! - Segment timeline delivery
//! - Analytics events
//! - Surfacing errors to the UI

use crate::{
    analytics::{AnalyticsEvent, AnalyticsTracker},
    buffer::BufferHealth,
    engine::{EngineFactory, MediaElement},
    keymap::Keymap,
    playback::{Command, Effect, MediaEvent, PlaybackState, PlaybackStateMachine},
    playlist::Playlist,
    source::{SourceSwitchCoordinator, SwitchOutcome},
    timeline::SegmentView,
    transcode::{TranscodeSession, TranscoderFactory},
    Error, MediaSource, PlayerConfig, Result, SegmentTimeline, StreamType,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Error surfaced to the UI layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionError {
    pub code: String,
    pub message: String,
    pub recoverable: bool,
    pub at: DateTime<Utc>,
}

impl From<&Error> for SessionError {
    fn from(error: &Error) -> Self {
        Self {
            code: error.error_code().to_string(),
            message: error.to_string(),
            recoverable: error.is_recoverable(),
            at: Utc::now(),
        }
    }
}

/// Stats panel snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStats {
    pub session_id: Uuid,
    pub state: PlaybackState,
    pub stream_type: Option<StreamType>,
    /// Bits per second, 0 without an engine
    pub bandwidth_estimate: u64,
    pub level: Option<i32>,
    pub auto_quality: bool,
    pub buffer: BufferHealth,
    pub segment_count: usize,
    pub uptime_secs: f64,
}

/// Player session wiring state machine, coordinator and media element
pub struct PlayerSession {
    /// Unique session ID
    id: Uuid,
    config: PlayerConfig,
    machine: PlaybackStateMachine,
    coordinator: SourceSwitchCoordinator,
    element: Arc<dyn MediaElement>,
    playlist: Playlist,
    keymap: Keymap,
    analytics: Option<AnalyticsTracker>,
    /// State broadcaster for read-only observers
    state_tx: watch::Sender<PlaybackState>,
    last_error: Option<SessionError>,
    start_time: Instant,
}

impl std::fmt::Debug for PlayerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerSession")
            .field("id", &self.id)
            .field("state", self.machine.state())
            .field("coordinator", &self.coordinator)
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl PlayerSession {
    /// Create a new player session
    pub fn new(
        config: PlayerConfig,
        engines: Arc<dyn EngineFactory>,
        element: Arc<dyn MediaElement>,
    ) -> Result<Self> {
        config.validate()?;
        let coordinator = SourceSwitchCoordinator::new(engines, Arc::clone(&element), &config)?;
        let (state_tx, _) = watch::channel(PlaybackState::default());

        let analytics = config
            .analytics_enabled
            .then(|| AnalyticsTracker::new(config.analytics_max_events));

        Ok(Self {
            id: Uuid::new_v4(),
            machine: PlaybackStateMachine::new(config.clone()),
            keymap: Keymap::new(&config),
            config,
            coordinator,
            element,
            playlist: Playlist::default(),
            analytics,
            state_tx,
            last_error: None,
            start_time: Instant::now(),
        })
    }

    pub fn with_playlist(mut self, playlist: Playlist) -> Self {
        self.machine.set_playlist_len(playlist.len());
        self.playlist = playlist;
        self
    }

    /// Enable transcoding operations
    pub fn with_transcoder(mut self, factory: Arc<dyn TranscoderFactory>) -> Self {
        self.coordinator = self.coordinator.with_transcoder(factory);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn state(&self) -> &PlaybackState {
        self.machine.state()
    }

    /// Subscribe to state changes
    pub fn subscribe_state(&self) -> watch::Receiver<PlaybackState> {
        self.state_tx.subscribe()
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn timeline(&self) -> Arc<SegmentTimeline> {
        self.coordinator.timeline()
    }

    pub fn analytics(&self) -> Option<&AnalyticsTracker> {
        self.analytics.as_ref()
    }

    /// Last error surfaced to the UI, if not cleared
    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Load a standalone source
    ///
    /// The playlist position is kept, so Next/Previous still move relative
    /// to the last selected item.
    #[instrument(skip(self, source), fields(session_id = %self.id, url = %source.url))]
    pub async fn load(&mut self, source: &MediaSource) -> Result<SwitchOutcome> {
        let index = self.machine.state().playlist_index;
        self.switch(source, index, false).await
    }

    /// Load the playlist item at `index` (wrapping)
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn load_item(&mut self, index: usize, autoplay: bool) -> Result<SwitchOutcome> {
        let index = self
            .playlist
            .select_index(index)
            .ok_or_else(|| Error::Internal("playlist is empty".to_string()))?;
        let source = match self.playlist.get(index) {
            Some(item) => item.source(),
            None => return Err(Error::Internal(format!("no playlist item {}", index))),
        };
        self.switch(&source, index, autoplay).await
    }

    /// Apply a user command
    pub async fn dispatch(&mut self, command: Command) -> Result<()> {
        let before = self.machine.state().clone();
        let effects = self.machine.dispatch(command);
        self.record_effects(&before, &effects);
        let result = self.apply(effects).await;
        self.publish();
        result
    }

    /// Apply a media pipeline event
    pub async fn handle_event(&mut self, event: MediaEvent) -> Result<()> {
        self.record_event(&event);
        let effects = self.machine.handle_event(event);
        let result = self.apply(effects).await;
        self.publish();
        result
    }

    /// Translate a key press; `false` when the key is unbound
    pub async fn handle_key(&mut self, name: &str) -> Result<bool> {
        match self.keymap.command_for_name(name) {
            Some(command) => {
                self.dispatch(command).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Re-read the element's buffered intervals
    pub async fn refresh_buffered(&mut self) -> Result<()> {
        let ranges = self.element.buffered();
        self.handle_event(MediaEvent::Progress { ranges }).await
    }

    /// Pick up a timeline that arrived in the background
    pub fn poll_timeline(&mut self) -> Option<Arc<SegmentTimeline>> {
        self.coordinator.poll_timeline()
    }

    /// Wait for the current source's timeline
    pub async fn next_timeline(&mut self) -> Option<Arc<SegmentTimeline>> {
        self.coordinator.next_timeline().await
    }

    /// Segment visualization geometry for the current state
    pub fn segment_layout(&self) -> Vec<SegmentView> {
        let timeline = self.coordinator.timeline();
        let state = self.machine.state();
        let duration = if state.duration > 0.0 {
            state.duration
        } else {
            timeline.total_duration()
        };
        timeline.layout(duration, state.current_time, self.machine.tracker().ranges())
    }

    /// Snapshot for a stats panel
    pub fn stats(&self) -> PlayerStats {
        let state = self.machine.state().clone();
        PlayerStats {
            session_id: self.id,
            stream_type: self.coordinator.stream_type(),
            bandwidth_estimate: self.coordinator.bandwidth_estimate().unwrap_or(0),
            level: self.coordinator.level(),
            auto_quality: state.is_auto_quality(),
            buffer: self.machine.buffer_health(),
            segment_count: self.coordinator.timeline().len(),
            uptime_secs: self.start_time.elapsed().as_secs_f64(),
            state,
        }
    }

    /// Transcoding session; failures stay scoped to the operation
    pub fn transcoder(&mut self) -> Result<&mut TranscodeSession> {
        self.coordinator.transcoder()
    }

    /// Tear down engine, fetch and transcoder
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn shutdown(&mut self) {
        self.coordinator.shutdown().await;
        self.machine.handle_event(MediaEvent::SourceFailed);
        self.publish();
        info!(
            uptime_secs = self.start_time.elapsed().as_secs_f64(),
            "Session shut down"
        );
    }

    async fn switch(&mut self, source: &MediaSource, index: usize, autoplay: bool) -> Result<SwitchOutcome> {
        if let Some(analytics) = self.analytics.as_mut() {
            analytics.record(AnalyticsEvent::LoadStart {
                url: source.url.clone(),
            });
        }

        match self.coordinator.switch_to(source).await {
            Ok(outcome) => {
                self.machine
                    .handle_event(MediaEvent::SourceChanged { playlist_index: index });
                if outcome.level_count > 0 {
                    self.machine.handle_event(MediaEvent::LevelsLoaded {
                        count: outcome.level_count,
                    });
                }
                self.last_error = None;

                if autoplay {
                    let before = self.machine.state().clone();
                    let effects = self.machine.dispatch(Command::Play);
                    self.record_effects(&before, &effects);
                    for effect in effects {
                        // a blocked autoplay leaves the source attached and paused
                        if let Err(e) = self.apply_to_element(effect) {
                            debug!(error = %e, "Autoplay rejected");
                        }
                    }
                }
                self.publish();
                Ok(outcome)
            }
            Err(e) => {
                self.machine.handle_event(MediaEvent::SourceFailed);
                self.surface(&e, true);
                self.publish();
                Err(e)
            }
        }
    }

    async fn apply(&mut self, effects: Vec<Effect>) -> Result<()> {
        for effect in effects {
            match effect {
                Effect::SwitchSource { index, autoplay } => {
                    // failure is already surfaced and playback is idle
                    if let Err(e) = self.load_item(index, autoplay).await {
                        debug!(error = %e, "Playlist switch failed");
                    }
                }
                Effect::SetLevel { id } => {
                    if let Err(e) = self.coordinator.set_level(id) {
                        warn!(id, error = %e, "Level change not applied");
                    }
                }
                other => self.apply_to_element(other)?,
            }
        }
        Ok(())
    }

    fn apply_to_element(&mut self, effect: Effect) -> Result<()> {
        debug!(?effect, "Applying effect");
        match effect {
            Effect::Play => {
                if let Err(e) = self.element.play() {
                    self.machine.handle_event(MediaEvent::Paused);
                    if let Some(analytics) = self.analytics.as_mut() {
                        analytics.record(AnalyticsEvent::Pause {
                            position: self.machine.state().current_time,
                        });
                    }
                    self.surface(&e, false);
                    return Err(e);
                }
            }
            Effect::Pause => self.element.pause(),
            Effect::Seek { time } => self.element.set_current_time(time),
            Effect::SetVolume { volume } => self.element.set_volume(volume),
            Effect::SetMuted { muted } => self.element.set_muted(muted),
            Effect::SetPlaybackRate { rate } => self.element.set_playback_rate(rate),
            Effect::SetTextTrack { id } => self.element.set_text_track(id.as_deref()),
            Effect::RequestFullscreen => self.element.request_fullscreen(),
            Effect::ExitFullscreen => self.element.exit_fullscreen(),
            Effect::RequestPictureInPicture => self.element.request_picture_in_picture(),
            Effect::ExitPictureInPicture => self.element.exit_picture_in_picture(),
            Effect::SetLevel { .. } | Effect::SwitchSource { .. } => {
                debug!("Coordinator effect ignored by the media element");
            }
        }
        Ok(())
    }

    fn surface(&mut self, error: &Error, fatal: bool) {
        warn!(code = error.error_code(), error = %error, "Surfacing error");
        if let Some(analytics) = self.analytics.as_mut() {
            analytics.record(AnalyticsEvent::Error {
                code: error.error_code().to_string(),
                message: error.to_string(),
                fatal,
            });
        }
        self.last_error = Some(SessionError::from(error));
    }

    fn record_effects(&mut self, before: &PlaybackState, effects: &[Effect]) {
        let Some(analytics) = self.analytics.as_mut() else {
            return;
        };
        let after = self.machine.state();
        let mut volume_recorded = false;

        for effect in effects {
            let event = match effect {
                Effect::Play => AnalyticsEvent::Play {
                    position: after.current_time,
                },
                Effect::Pause => AnalyticsEvent::Pause {
                    position: after.current_time,
                },
                Effect::Seek { time } => AnalyticsEvent::Seeking {
                    from: before.current_time,
                    to: *time,
                },
                Effect::SetVolume { .. } | Effect::SetMuted { .. } if !volume_recorded => {
                    volume_recorded = true;
                    AnalyticsEvent::VolumeChange {
                        volume: after.volume,
                        muted: after.is_muted,
                    }
                }
                Effect::SetPlaybackRate { rate } => AnalyticsEvent::RateChange { rate: *rate },
                Effect::SetLevel { id } => AnalyticsEvent::QualityChange {
                    from: before.active_quality_id,
                    to: *id,
                },
                _ => continue,
            };
            analytics.record(event);
        }
    }

    fn record_event(&mut self, event: &MediaEvent) {
        let Some(analytics) = self.analytics.as_mut() else {
            return;
        };
        let state = self.machine.state();

        let record = match event {
            MediaEvent::MetadataLoaded { duration } => AnalyticsEvent::LoadedMetadata {
                duration: *duration,
            },
            MediaEvent::TimeUpdate { time } => AnalyticsEvent::TimeUpdate {
                position: *time,
                duration: state.duration,
            },
            MediaEvent::Playing => AnalyticsEvent::Playing {
                position: state.current_time,
            },
            MediaEvent::Waiting => AnalyticsEvent::Waiting {
                position: state.current_time,
            },
            MediaEvent::Ended => AnalyticsEvent::Ended {
                duration: state.duration,
            },
            MediaEvent::FullscreenChanged { active } => AnalyticsEvent::FullscreenChange { active: *active },
            _ => return,
        };
        analytics.record(record);
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.machine.state().clone());
    }
}
