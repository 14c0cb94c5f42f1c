//! Playback state machine
//!
//! Every change to [`PlaybackState`] goes through [`PlaybackStateMachine::dispatch`]
//! (user commands) or [`PlaybackStateMachine::handle_event`] (media pipeline
//! events). Both return the [`Effect`]s the host must perform on the media
//! element, the adaptive engine or the source switch coordinator.
//!
//! The model is a set of synchronized fields rather than a finite set of
//! states; the invariants below bound which combinations are reachable:
//! - `current_time` is finite, non-negative and at most `duration` once known
//! - `volume` stays in `[0, 1]`, independent of `is_muted`
//! - `playback_rate` is finite and positive
//! - `active_quality_id` is −1 (automatic) or a known level index

use crate::{
    buffer::{BufferHealth, BufferedRangeTracker},
    playlist::{wrap_next, wrap_previous, wrap_select},
    BufferedRange, PlayerConfig,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Automatic quality selection
pub const AUTO_QUALITY: i32 = -1;

/// Snapshot of everything the UI renders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    /// Playhead position in seconds
    pub current_time: f64,
    /// Media duration in seconds (0 = unknown)
    pub duration: f64,
    pub is_playing: bool,
    pub volume: f64,
    pub is_muted: bool,
    pub playback_rate: f64,
    /// Pinned rendition index, or −1 for automatic
    pub active_quality_id: i32,
    pub active_subtitle_id: Option<String>,
    pub playlist_index: usize,
    pub buffered_ranges: Vec<BufferedRange>,
    /// Number of quality levels reported by the engine
    pub quality_level_count: usize,
    pub is_fullscreen: bool,
    pub is_picture_in_picture: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            duration: 0.0,
            is_playing: false,
            volume: 1.0,
            is_muted: false,
            playback_rate: 1.0,
            active_quality_id: AUTO_QUALITY,
            active_subtitle_id: None,
            playlist_index: 0,
            buffered_ranges: Vec::new(),
            quality_level_count: 0,
            is_fullscreen: false,
            is_picture_in_picture: false,
        }
    }
}

impl PlaybackState {
    pub fn is_auto_quality(&self) -> bool {
        self.active_quality_id == AUTO_QUALITY
    }

    /// Played fraction in `[0, 1]`; 0 while the duration is unknown
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            (self.current_time / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// User or API commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "value", rename_all = "snake_case")]
pub enum Command {
    Play,
    Pause,
    TogglePlay,
    Seek(f64),
    /// Relative seek in seconds
    SeekBy(f64),
    SetVolume(f64),
    /// Relative volume change
    AdjustVolume(f64),
    ToggleMute,
    SetRate(f64),
    SetQuality(i32),
    SelectSubtitle(Option<String>),
    Next,
    Previous,
    SelectItem(usize),
    ToggleFullscreen,
    TogglePictureInPicture,
}

/// Asynchronous notifications from the media pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MediaEvent {
    MetadataLoaded { duration: f64 },
    TimeUpdate { time: f64 },
    VolumeChanged { volume: f64, muted: bool },
    Playing,
    Paused,
    /// Playback stalled waiting for data
    Waiting,
    /// Raw buffered intervals as reported by the media element
    Progress { ranges: Vec<BufferedRange> },
    Ended,
    LevelsLoaded { count: usize },
    FullscreenChanged { active: bool },
    PictureInPictureChanged { active: bool },
    /// The coordinator attached the item at `playlist_index`
    SourceChanged { playlist_index: usize },
    /// The coordinator failed to attach a source
    SourceFailed,
}

/// Primitive operations the host performs on behalf of the state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    Play,
    Pause,
    Seek { time: f64 },
    SetVolume { volume: f64 },
    SetMuted { muted: bool },
    SetPlaybackRate { rate: f64 },
    SetLevel { id: i32 },
    SetTextTrack { id: Option<String> },
    /// Load the playlist item at `index` through the coordinator
    SwitchSource { index: usize, autoplay: bool },
    RequestFullscreen,
    ExitFullscreen,
    RequestPictureInPicture,
    ExitPictureInPicture,
}

/// Single choke point for playback state mutation
#[derive(Debug, Clone)]
pub struct PlaybackStateMachine {
    state: PlaybackState,
    tracker: BufferedRangeTracker,
    config: PlayerConfig,
    playlist_len: usize,
    /// A backwards time update is expected once after a seek or switch
    discontinuity_expected: bool,
}

impl PlaybackStateMachine {
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            state: PlaybackState::default(),
            tracker: BufferedRangeTracker::new(),
            config,
            playlist_len: 0,
            discontinuity_expected: false,
        }
    }

    pub fn with_playlist_len(mut self, playlist_len: usize) -> Self {
        self.playlist_len = playlist_len;
        self
    }

    pub fn set_playlist_len(&mut self, playlist_len: usize) {
        self.playlist_len = playlist_len;
    }

    pub fn playlist_len(&self) -> usize {
        self.playlist_len
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn tracker(&self) -> &BufferedRangeTracker {
        &self.tracker
    }

    /// Buffer health at the playhead against the configured threshold
    pub fn buffer_health(&self) -> BufferHealth {
        self.tracker
            .health(self.state.current_time, self.config.rebuffer_threshold)
    }

    /// Apply a user command
    pub fn dispatch(&mut self, command: Command) -> Vec<Effect> {
        debug!(?command, "Dispatching command");

        match command {
            Command::Play => self.play(),
            Command::Pause => self.pause(),
            Command::TogglePlay => {
                if self.state.is_playing {
                    self.pause()
                } else {
                    self.play()
                }
            }
            Command::Seek(time) => self.seek(time),
            Command::SeekBy(delta) => {
                if !delta.is_finite() {
                    debug!(delta, "Rejected non-finite relative seek");
                    return Vec::new();
                }
                self.seek(self.state.current_time + delta)
            }
            Command::SetVolume(volume) => self.set_volume(volume),
            Command::AdjustVolume(delta) => {
                if !delta.is_finite() {
                    debug!(delta, "Rejected non-finite volume change");
                    return Vec::new();
                }
                self.set_volume(self.state.volume + delta)
            }
            Command::ToggleMute => {
                self.state.is_muted = !self.state.is_muted;
                vec![Effect::SetMuted {
                    muted: self.state.is_muted,
                }]
            }
            Command::SetRate(rate) => self.set_rate(rate),
            Command::SetQuality(id) => self.set_quality(id),
            Command::SelectSubtitle(id) => {
                if self.state.active_subtitle_id == id {
                    return Vec::new();
                }
                self.state.active_subtitle_id = id.clone();
                vec![Effect::SetTextTrack { id }]
            }
            Command::Next => {
                let target = wrap_next(self.state.playlist_index, self.playlist_len);
                self.step_to(target)
            }
            Command::Previous => {
                let target = wrap_previous(self.state.playlist_index, self.playlist_len);
                self.step_to(target)
            }
            Command::SelectItem(index) => {
                let target = wrap_select(index, self.playlist_len);
                self.switch_source(target, true)
            }
            Command::ToggleFullscreen => {
                if self.state.is_fullscreen {
                    vec![Effect::ExitFullscreen]
                } else {
                    vec![Effect::RequestFullscreen]
                }
            }
            Command::TogglePictureInPicture => {
                if self.state.is_picture_in_picture {
                    vec![Effect::ExitPictureInPicture]
                } else {
                    vec![Effect::RequestPictureInPicture]
                }
            }
        }
    }

    /// Apply a media pipeline event
    pub fn handle_event(&mut self, event: MediaEvent) -> Vec<Effect> {
        match event {
            MediaEvent::MetadataLoaded { duration } => {
                let duration = if duration.is_finite() && duration > 0.0 {
                    duration
                } else {
                    0.0
                };
                self.state.duration = duration;
                self.state.current_time = self.clamp_time(self.state.current_time);
                debug!(duration, "Metadata loaded");
                Vec::new()
            }
            MediaEvent::TimeUpdate { time } => {
                if !time.is_finite() {
                    debug!(time, "Ignored non-finite time update");
                    return Vec::new();
                }
                let time = self.clamp_time(time);
                if time < self.state.current_time && !self.discontinuity_expected {
                    debug!(
                        from = self.state.current_time,
                        to = time,
                        "Time moved backwards without a seek"
                    );
                }
                self.discontinuity_expected = false;
                self.state.current_time = time;
                Vec::new()
            }
            MediaEvent::VolumeChanged { volume, muted } => {
                if volume.is_finite() {
                    self.state.volume = volume.clamp(0.0, 1.0);
                }
                self.state.is_muted = muted;
                Vec::new()
            }
            MediaEvent::Playing => {
                self.state.is_playing = true;
                Vec::new()
            }
            MediaEvent::Paused => {
                self.state.is_playing = false;
                Vec::new()
            }
            MediaEvent::Waiting => {
                debug!(time = self.state.current_time, "Waiting for data");
                Vec::new()
            }
            MediaEvent::Progress { ranges } => {
                self.state.buffered_ranges = self.tracker.update(&ranges).as_slice().to_vec();
                Vec::new()
            }
            MediaEvent::Ended => self.ended(),
            MediaEvent::LevelsLoaded { count } => {
                self.state.quality_level_count = count;
                if self.state.active_quality_id >= 0 && self.state.active_quality_id as usize >= count {
                    debug!(
                        id = self.state.active_quality_id,
                        count, "Pinned quality no longer exists, back to automatic"
                    );
                    self.state.active_quality_id = AUTO_QUALITY;
                    return vec![Effect::SetLevel { id: AUTO_QUALITY }];
                }
                Vec::new()
            }
            MediaEvent::FullscreenChanged { active } => {
                self.state.is_fullscreen = active;
                Vec::new()
            }
            MediaEvent::PictureInPictureChanged { active } => {
                self.state.is_picture_in_picture = active;
                Vec::new()
            }
            MediaEvent::SourceChanged { playlist_index } => {
                debug!(playlist_index, "Source changed, resetting playback state");
                self.state = PlaybackState {
                    volume: self.state.volume,
                    is_muted: self.state.is_muted,
                    playback_rate: self.state.playback_rate,
                    is_fullscreen: self.state.is_fullscreen,
                    is_picture_in_picture: self.state.is_picture_in_picture,
                    playlist_index,
                    ..PlaybackState::default()
                };
                self.tracker.reset();
                self.discontinuity_expected = true;
                Vec::new()
            }
            MediaEvent::SourceFailed => {
                debug!("Source failed, playback idle");
                self.state.is_playing = false;
                self.state.current_time = 0.0;
                self.state.duration = 0.0;
                self.state.buffered_ranges.clear();
                self.tracker.reset();
                Vec::new()
            }
        }
    }

    fn play(&mut self) -> Vec<Effect> {
        if self.state.is_playing {
            return Vec::new();
        }
        self.state.is_playing = true;
        vec![Effect::Play]
    }

    fn pause(&mut self) -> Vec<Effect> {
        if !self.state.is_playing {
            return Vec::new();
        }
        self.state.is_playing = false;
        vec![Effect::Pause]
    }

    fn seek(&mut self, time: f64) -> Vec<Effect> {
        if !time.is_finite() {
            debug!(time, "Rejected non-finite seek");
            return Vec::new();
        }

        let time = self.clamp_time(time);
        if time == self.state.current_time {
            return Vec::new();
        }

        self.state.current_time = time;
        self.discontinuity_expected = true;
        vec![Effect::Seek { time }]
    }

    fn set_volume(&mut self, volume: f64) -> Vec<Effect> {
        if volume.is_nan() {
            debug!("Rejected NaN volume");
            return Vec::new();
        }

        let volume = volume.clamp(0.0, 1.0);
        let mut effects = Vec::new();
        if volume != self.state.volume {
            self.state.volume = volume;
            effects.push(Effect::SetVolume { volume });
        }
        if volume > 0.0 && self.state.is_muted {
            self.state.is_muted = false;
            effects.push(Effect::SetMuted { muted: false });
        }
        effects
    }

    fn set_rate(&mut self, rate: f64) -> Vec<Effect> {
        if !rate.is_finite() || rate <= 0.0 {
            debug!(rate, "Rejected playback rate");
            return Vec::new();
        }

        let rate = rate.clamp(self.config.min_playback_rate, self.config.max_playback_rate);
        if rate == self.state.playback_rate {
            return Vec::new();
        }
        self.state.playback_rate = rate;
        vec![Effect::SetPlaybackRate { rate }]
    }

    fn set_quality(&mut self, id: i32) -> Vec<Effect> {
        let known = id >= 0 && (id as usize) < self.state.quality_level_count;
        if id != AUTO_QUALITY && !known {
            debug!(
                id,
                count = self.state.quality_level_count,
                "Rejected unknown quality level"
            );
            return Vec::new();
        }

        if id == self.state.active_quality_id {
            return Vec::new();
        }
        self.state.active_quality_id = id;
        vec![Effect::SetLevel { id }]
    }

    fn switch_source(&mut self, target: Option<usize>, autoplay: bool) -> Vec<Effect> {
        match target {
            Some(index) => vec![Effect::SwitchSource { index, autoplay }],
            None => {
                debug!("No playlist, navigation ignored");
                Vec::new()
            }
        }
    }

    /// Next/previous navigation; wrapping onto the current item is a no-op
    fn step_to(&mut self, target: Option<usize>) -> Vec<Effect> {
        if target == Some(self.state.playlist_index) {
            debug!(index = self.state.playlist_index, "Already on the target item");
            return Vec::new();
        }
        self.switch_source(target, self.state.is_playing)
    }

    fn ended(&mut self) -> Vec<Effect> {
        if self.playlist_len > 0 && self.config.autoplay_next {
            let target = wrap_next(self.state.playlist_index, self.playlist_len);
            // a single-item playlist never replays itself
            if target != Some(self.state.playlist_index) {
                return self.switch_source(target, true);
            }
        }

        self.state.is_playing = false;
        self.state.current_time = self.state.duration;
        Vec::new()
    }

    /// Clamp into `[0, duration]`, or only below while the duration is unknown
    fn clamp_time(&self, time: f64) -> f64 {
        if self.state.duration > 0.0 {
            time.clamp(0.0, self.state.duration)
        } else {
            time.max(0.0)
        }
    }
}

impl Default for PlaybackStateMachine {
    fn default() -> Self {
        Self::new(PlayerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(duration: f64) -> PlaybackStateMachine {
        let mut machine = PlaybackStateMachine::default();
        machine.handle_event(MediaEvent::MetadataLoaded { duration });
        machine
    }

    #[test]
    fn test_seek_clamps_and_is_idempotent() {
        let mut machine = loaded(60.0);

        assert_eq!(machine.dispatch(Command::Seek(75.0)), vec![Effect::Seek { time: 60.0 }]);
        let after_first = machine.state().clone();
        assert!(machine.dispatch(Command::Seek(75.0)).is_empty());
        assert_eq!(machine.state(), &after_first);

        assert_eq!(machine.dispatch(Command::Seek(-3.0)), vec![Effect::Seek { time: 0.0 }]);
        assert!(machine.dispatch(Command::Seek(f64::NAN)).is_empty());
        assert_eq!(machine.state().current_time, 0.0);
    }

    #[test]
    fn test_seek_before_metadata() {
        let mut machine = PlaybackStateMachine::default();
        assert_eq!(machine.dispatch(Command::Seek(12.0)), vec![Effect::Seek { time: 12.0 }]);

        machine.handle_event(MediaEvent::MetadataLoaded { duration: 10.0 });
        assert_eq!(machine.state().current_time, 10.0);
    }

    #[test]
    fn test_seek_by() {
        let mut machine = loaded(60.0);
        machine.handle_event(MediaEvent::TimeUpdate { time: 30.0 });
        assert_eq!(machine.dispatch(Command::SeekBy(-5.0)), vec![Effect::Seek { time: 25.0 }]);
        assert_eq!(machine.dispatch(Command::SeekBy(100.0)), vec![Effect::Seek { time: 60.0 }]);
    }

    #[test]
    fn test_volume_unmutes_on_raise() {
        let mut machine = PlaybackStateMachine::default();
        machine.dispatch(Command::ToggleMute);
        assert!(machine.state().is_muted);
        assert_eq!(machine.state().volume, 1.0);

        let effects = machine.dispatch(Command::SetVolume(0.5));
        assert_eq!(
            effects,
            vec![Effect::SetVolume { volume: 0.5 }, Effect::SetMuted { muted: false }]
        );
        assert!(!machine.state().is_muted);
    }

    #[test]
    fn test_volume_zero_keeps_mute() {
        let mut machine = PlaybackStateMachine::default();
        machine.dispatch(Command::ToggleMute);
        machine.dispatch(Command::SetVolume(0.0));
        assert!(machine.state().is_muted);
        assert_eq!(machine.state().volume, 0.0);
    }

    #[test]
    fn test_volume_clamped() {
        let mut machine = PlaybackStateMachine::default();
        machine.dispatch(Command::SetVolume(-2.0));
        assert_eq!(machine.state().volume, 0.0);
        machine.dispatch(Command::AdjustVolume(0.3));
        assert!((machine.state().volume - 0.3).abs() < 1e-9);
        assert!(machine.dispatch(Command::SetVolume(f64::NAN)).is_empty());
        machine.dispatch(Command::SetVolume(7.0));
        assert_eq!(machine.state().volume, 1.0);
    }

    #[test]
    fn test_rate() {
        let mut machine = PlaybackStateMachine::default();
        assert_eq!(machine.dispatch(Command::SetRate(2.0)), vec![Effect::SetPlaybackRate { rate: 2.0 }]);
        assert!(machine.dispatch(Command::SetRate(0.0)).is_empty());
        assert!(machine.dispatch(Command::SetRate(-1.0)).is_empty());
        assert!(machine.dispatch(Command::SetRate(f64::INFINITY)).is_empty());
        machine.dispatch(Command::SetRate(100.0));
        assert_eq!(machine.state().playback_rate, 16.0);
    }

    #[test]
    fn test_quality_pinning() {
        let mut machine = PlaybackStateMachine::default();
        assert!(machine.dispatch(Command::SetQuality(0)).is_empty());

        machine.handle_event(MediaEvent::LevelsLoaded { count: 3 });
        assert_eq!(machine.dispatch(Command::SetQuality(2)), vec![Effect::SetLevel { id: 2 }]);
        assert!(!machine.state().is_auto_quality());

        assert!(machine.dispatch(Command::SetQuality(3)).is_empty());
        assert!(machine.dispatch(Command::SetQuality(-2)).is_empty());
        assert_eq!(machine.state().active_quality_id, 2);

        assert_eq!(machine.dispatch(Command::SetQuality(-1)), vec![Effect::SetLevel { id: -1 }]);
        assert!(machine.state().is_auto_quality());
    }

    #[test]
    fn test_levels_shrink_resets_pin() {
        let mut machine = PlaybackStateMachine::default();
        machine.handle_event(MediaEvent::LevelsLoaded { count: 4 });
        machine.dispatch(Command::SetQuality(3));

        let effects = machine.handle_event(MediaEvent::LevelsLoaded { count: 2 });
        assert_eq!(effects, vec![Effect::SetLevel { id: AUTO_QUALITY }]);
        assert!(machine.state().is_auto_quality());
    }

    #[test]
    fn test_playlist_navigation_wraps() {
        let mut machine = PlaybackStateMachine::default().with_playlist_len(3);

        assert_eq!(
            machine.dispatch(Command::Previous),
            vec![Effect::SwitchSource { index: 2, autoplay: false }]
        );
        assert_eq!(machine.state().playlist_index, 0);

        machine.handle_event(MediaEvent::SourceChanged { playlist_index: 2 });
        assert_eq!(
            machine.dispatch(Command::Next),
            vec![Effect::SwitchSource { index: 0, autoplay: false }]
        );
    }

    #[test]
    fn test_navigation_without_playlist() {
        let mut machine = PlaybackStateMachine::default();
        assert!(machine.dispatch(Command::Next).is_empty());
        assert!(machine.dispatch(Command::Previous).is_empty());
        assert!(machine.dispatch(Command::SelectItem(1)).is_empty());
    }

    #[test]
    fn test_ended_without_playlist_is_terminal() {
        let mut machine = loaded(42.0);
        machine.handle_event(MediaEvent::Playing);
        machine.handle_event(MediaEvent::TimeUpdate { time: 41.9 });

        assert!(machine.handle_event(MediaEvent::Ended).is_empty());
        assert!(!machine.state().is_playing);
        assert_eq!(machine.state().current_time, 42.0);
    }

    #[test]
    fn test_ended_advances_playlist() {
        let mut machine = loaded(42.0).with_playlist_len(2);
        machine.handle_event(MediaEvent::SourceChanged { playlist_index: 1 });
        assert_eq!(
            machine.handle_event(MediaEvent::Ended),
            vec![Effect::SwitchSource { index: 0, autoplay: true }]
        );
    }

    #[test]
    fn test_single_item_playlist_does_not_replay() {
        let mut machine = loaded(42.0).with_playlist_len(1);
        machine.handle_event(MediaEvent::Playing);
        machine.handle_event(MediaEvent::TimeUpdate { time: 41.9 });

        assert!(machine.handle_event(MediaEvent::Ended).is_empty());
        assert!(!machine.state().is_playing);
        assert_eq!(machine.state().current_time, 42.0);
    }

    #[test]
    fn test_single_item_navigation_is_noop() {
        let mut machine = loaded(42.0).with_playlist_len(1);
        machine.handle_event(MediaEvent::Playing);

        assert!(machine.dispatch(Command::Next).is_empty());
        assert!(machine.dispatch(Command::Previous).is_empty());
        assert_eq!(machine.state().playlist_index, 0);
        assert!(machine.state().is_playing);
    }

    #[test]
    fn test_source_changed_resets() {
        let mut machine = loaded(60.0).with_playlist_len(3);
        machine.handle_event(MediaEvent::TimeUpdate { time: 20.0 });
        machine.handle_event(MediaEvent::LevelsLoaded { count: 3 });
        machine.dispatch(Command::SetQuality(1));
        machine.dispatch(Command::SetVolume(0.4));
        machine.handle_event(MediaEvent::Progress {
            ranges: vec![BufferedRange::new(0.0, 30.0)],
        });

        machine.handle_event(MediaEvent::SourceChanged { playlist_index: 1 });
        let state = machine.state();
        assert_eq!(state.current_time, 0.0);
        assert_eq!(state.duration, 0.0);
        assert!(state.buffered_ranges.is_empty());
        assert!(state.is_auto_quality());
        assert_eq!(state.quality_level_count, 0);
        assert_eq!(state.playlist_index, 1);
        assert_eq!(state.volume, 0.4);
        assert!(machine.tracker().ranges().is_empty());
    }

    #[test]
    fn test_source_failed_goes_idle() {
        let mut machine = loaded(60.0);
        machine.handle_event(MediaEvent::Playing);
        machine.handle_event(MediaEvent::TimeUpdate { time: 20.0 });

        machine.handle_event(MediaEvent::SourceFailed);
        assert!(!machine.state().is_playing);
        assert_eq!(machine.state().current_time, 0.0);
    }

    #[test]
    fn test_time_update_sanitized() {
        let mut machine = loaded(30.0);
        machine.handle_event(MediaEvent::TimeUpdate { time: 45.0 });
        assert_eq!(machine.state().current_time, 30.0);
        machine.handle_event(MediaEvent::TimeUpdate { time: f64::NAN });
        assert_eq!(machine.state().current_time, 30.0);
        machine.handle_event(MediaEvent::TimeUpdate { time: 10.0 });
        assert_eq!(machine.state().current_time, 10.0);
    }

    #[test]
    fn test_metadata_infinite_duration() {
        let machine = loaded(f64::INFINITY);
        assert_eq!(machine.state().duration, 0.0);
    }

    #[test]
    fn test_progress_feeds_tracker() {
        let mut machine = loaded(30.0);
        machine.handle_event(MediaEvent::Progress {
            ranges: vec![
                BufferedRange::new(12.0, 15.0),
                BufferedRange::new(0.0, 5.0),
                BufferedRange::new(4.0, 9.0),
            ],
        });
        assert_eq!(
            machine.state().buffered_ranges,
            vec![BufferedRange::new(0.0, 9.0), BufferedRange::new(12.0, 15.0)]
        );
        machine.handle_event(MediaEvent::TimeUpdate { time: 6.0 });
        assert_eq!(machine.buffer_health().ahead_ms, 3000);
    }

    #[test]
    fn test_toggles_emit_requests() {
        let mut machine = PlaybackStateMachine::default();
        assert_eq!(machine.dispatch(Command::TogglePlay), vec![Effect::Play]);
        assert_eq!(machine.dispatch(Command::TogglePlay), vec![Effect::Pause]);
        assert_eq!(machine.dispatch(Command::ToggleFullscreen), vec![Effect::RequestFullscreen]);
        machine.handle_event(MediaEvent::FullscreenChanged { active: true });
        assert_eq!(machine.dispatch(Command::ToggleFullscreen), vec![Effect::ExitFullscreen]);
        assert_eq!(
            machine.dispatch(Command::TogglePictureInPicture),
            vec![Effect::RequestPictureInPicture]
        );
    }

    #[test]
    fn test_subtitle_selection() {
        let mut machine = PlaybackStateMachine::default();
        assert_eq!(
            machine.dispatch(Command::SelectSubtitle(Some("en".to_string()))),
            vec![Effect::SetTextTrack { id: Some("en".to_string()) }]
        );
        assert!(machine.dispatch(Command::SelectSubtitle(Some("en".to_string()))).is_empty());
        assert_eq!(
            machine.dispatch(Command::SelectSubtitle(None)),
            vec![Effect::SetTextTrack { id: None }]
        );
    }
}
