//! Source switching
//!
//! [`SourceSwitchCoordinator`] is the only owner of the active engine. A
//! switch cancels the previous manifest fetch, tears the previous engine
//! down, starts a fire-and-forget manifest fetch for the new source and
//! attaches a fresh engine.
//!
//! Engine loads run in their own task. If the future returned by
//! [`SourceSwitchCoordinator::switch_to`] is dropped while a load is in
//! flight (say by a caller-side timeout), the load keeps going and the next
//! switch or [`SourceSwitchCoordinator::shutdown`] waits for it and destroys
//! the engine it produced. A half-attached engine is never touched.

use crate::{
    engine::{AdaptiveEngine, EngineFactory, MediaElement},
    manifest::{ManifestFetcher, ManifestFormat},
    transcode::{TranscodeSession, TranscoderFactory},
    Error, MediaSource, PlayerConfig, Result, SegmentTimeline, StreamType,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

type AttachTask = JoinHandle<(Box<dyn AdaptiveEngine>, Result<()>)>;

/// Result of a successful switch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchOutcome {
    pub url: String,
    pub stream_type: StreamType,
    /// Incremented on every switch; tags manifest results
    pub generation: u64,
    /// Quality levels the engine reported after loading
    pub level_count: usize,
}

#[derive(Debug)]
struct TimelineUpdate {
    generation: u64,
    timeline: SegmentTimeline,
}

/// Tears down one source and attaches the next
pub struct SourceSwitchCoordinator {
    engines: Arc<dyn EngineFactory>,
    sink: Arc<dyn MediaElement>,
    fetcher: ManifestFetcher,
    transcode: Option<TranscodeSession>,
    engine: Option<Box<dyn AdaptiveEngine>>,
    pending: Option<AttachTask>,
    fetch_cancel: Option<CancellationToken>,
    fetch_in_flight: bool,
    generation: u64,
    timeline: Arc<SegmentTimeline>,
    timeline_tx: mpsc::UnboundedSender<TimelineUpdate>,
    timeline_rx: mpsc::UnboundedReceiver<TimelineUpdate>,
    current: Option<(MediaSource, StreamType)>,
}

impl std::fmt::Debug for SourceSwitchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceSwitchCoordinator")
            .field("generation", &self.generation)
            .field("attached", &self.engine.is_some())
            .field("pending", &self.pending.is_some())
            .field("segments", &self.timeline.len())
            .field("current", &self.current)
            .finish()
    }
}

impl SourceSwitchCoordinator {
    pub fn new(
        engines: Arc<dyn EngineFactory>,
        sink: Arc<dyn MediaElement>,
        config: &PlayerConfig,
    ) -> Result<Self> {
        Ok(Self::with_fetcher(engines, sink, ManifestFetcher::new(config)?))
    }

    pub fn with_fetcher(
        engines: Arc<dyn EngineFactory>,
        sink: Arc<dyn MediaElement>,
        fetcher: ManifestFetcher,
    ) -> Self {
        let (timeline_tx, timeline_rx) = mpsc::unbounded_channel();
        Self {
            engines,
            sink,
            fetcher,
            transcode: None,
            engine: None,
            pending: None,
            fetch_cancel: None,
            fetch_in_flight: false,
            generation: 0,
            timeline: Arc::new(SegmentTimeline::empty()),
            timeline_tx,
            timeline_rx,
            current: None,
        }
    }

    /// Enable transcoding; the transcoder itself is created on first use
    pub fn with_transcoder(mut self, factory: Arc<dyn TranscoderFactory>) -> Self {
        self.transcode = Some(TranscodeSession::new(factory));
        self
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current_source(&self) -> Option<&MediaSource> {
        self.current.as_ref().map(|(source, _)| source)
    }

    pub fn stream_type(&self) -> Option<StreamType> {
        self.current.as_ref().map(|(_, stream_type)| *stream_type)
    }

    pub fn is_attached(&self) -> bool {
        self.engine.is_some()
    }

    /// Timeline of the current source; empty until the manifest arrives
    pub fn timeline(&self) -> Arc<SegmentTimeline> {
        Arc::clone(&self.timeline)
    }

    /// Switch playback to `source`
    #[instrument(skip(self, source), fields(url = %source.url))]
    pub async fn switch_to(&mut self, source: &MediaSource) -> Result<SwitchOutcome> {
        self.generation += 1;
        let generation = self.generation;

        self.cancel_fetch();
        self.teardown_engine().await;
        self.timeline = Arc::new(SegmentTimeline::empty());

        let stream_type = source.stream_type();
        self.current = Some((source.clone(), stream_type));
        info!(generation, %stream_type, "Switching source");

        if let Some(format) = ManifestFormat::for_stream(stream_type) {
            self.spawn_fetch(source.url.clone(), format, generation);
        }

        let mut engine = self
            .engines
            .create(stream_type)
            .map_err(|e| Error::attach(&source.url, e.to_string()))?;
        debug!(engine = engine.name(), "Engine created");

        let url = source.url.clone();
        let sink = Arc::clone(&self.sink);
        self.pending = Some(tokio::spawn(async move {
            let result = engine.load(&url, sink).await;
            (engine, result)
        }));

        let joined = match self.pending.as_mut() {
            Some(task) => task.await,
            None => return Err(Error::Internal("attach task missing".to_string())),
        };
        self.pending = None;

        match joined {
            Ok((engine, Ok(()))) => {
                let level_count = engine.level_count();
                info!(
                    engine = engine.name(),
                    level_count, "Engine attached"
                );
                self.engine = Some(engine);
                Ok(SwitchOutcome {
                    url: source.url.clone(),
                    stream_type,
                    generation,
                    level_count,
                })
            }
            Ok((mut engine, Err(e))) => {
                warn!(engine = engine.name(), error = %e, "Engine attach failed");
                engine.destroy().await;
                Err(match e {
                    Error::EngineAttach { .. } => e,
                    other => Error::attach(&source.url, other.to_string()),
                })
            }
            Err(e) => {
                warn!(error = %e, "Engine attach task failed");
                Err(Error::attach(&source.url, format!("engine task failed: {}", e)))
            }
        }
    }

    /// Apply any timeline that arrived for the current source
    ///
    /// Results from earlier generations are dropped.
    pub fn poll_timeline(&mut self) -> Option<Arc<SegmentTimeline>> {
        let mut updated = None;
        while let Ok(update) = self.timeline_rx.try_recv() {
            if let Some(timeline) = self.accept(update) {
                updated = Some(timeline);
            }
        }
        updated
    }

    /// Wait for the current source's timeline
    ///
    /// `None` when no fetch is in flight for the current source.
    pub async fn next_timeline(&mut self) -> Option<Arc<SegmentTimeline>> {
        while self.fetch_in_flight {
            let update = self.timeline_rx.recv().await?;
            if let Some(timeline) = self.accept(update) {
                return Some(timeline);
            }
        }
        None
    }

    fn accept(&mut self, update: TimelineUpdate) -> Option<Arc<SegmentTimeline>> {
        if update.generation != self.generation {
            debug!(
                stale = update.generation,
                current = self.generation,
                "Dropping stale timeline"
            );
            return None;
        }

        self.fetch_in_flight = false;
        info!(
            generation = update.generation,
            segments = update.timeline.len(),
            total_duration = update.timeline.total_duration(),
            "Timeline ready"
        );
        self.timeline = Arc::new(update.timeline);
        Some(Arc::clone(&self.timeline))
    }

    /// Pin a level (or −1 for automatic) on the active engine
    pub fn set_level(&mut self, id: i32) -> Result<()> {
        let engine = self.engine.as_mut().ok_or(Error::NoEngine)?;
        engine.set_level(id);
        debug!(id, "Level set");
        Ok(())
    }

    pub fn level(&self) -> Option<i32> {
        self.engine.as_ref().map(|engine| engine.level())
    }

    pub fn level_count(&self) -> usize {
        self.engine.as_ref().map(|engine| engine.level_count()).unwrap_or(0)
    }

    /// Bandwidth estimate of the active engine in bits per second
    pub fn bandwidth_estimate(&self) -> Option<u64> {
        self.engine.as_ref().map(|engine| engine.bandwidth_estimate())
    }

    /// Transcoding session, if a transcoder factory was provided
    pub fn transcoder(&mut self) -> Result<&mut TranscodeSession> {
        self.transcode
            .as_mut()
            .ok_or_else(|| Error::transcode("load", "no transcoder configured"))
    }

    /// Tear everything down: fetch, engine, transcoder
    #[instrument(skip(self))]
    pub async fn shutdown(&mut self) {
        self.generation += 1;
        self.cancel_fetch();
        self.teardown_engine().await;
        if let Some(transcode) = self.transcode.as_mut() {
            transcode.shutdown().await;
        }
        self.timeline = Arc::new(SegmentTimeline::empty());
        self.current = None;
        info!("Source coordinator shut down");
    }

    fn cancel_fetch(&mut self) {
        if let Some(token) = self.fetch_cancel.take() {
            token.cancel();
        }
        self.fetch_in_flight = false;
    }

    fn spawn_fetch(&mut self, url: String, format: ManifestFormat, generation: u64) {
        let token = CancellationToken::new();
        self.fetch_cancel = Some(token.clone());
        self.fetch_in_flight = true;

        let fetcher = self.fetcher.clone();
        let tx = self.timeline_tx.clone();
        tokio::spawn(async move {
            let timeline = fetcher.fetch_timeline(&url, format, &token).await;
            // receiver gone means the coordinator was dropped
            let _ = tx.send(TimelineUpdate {
                generation,
                timeline,
            });
        });
    }

    async fn teardown_engine(&mut self) {
        if let Some(task) = self.pending.take() {
            debug!("Waiting for pending attach before teardown");
            match task.await {
                Ok((mut engine, _)) => {
                    engine.destroy().await;
                    debug!(engine = engine.name(), "Destroyed engine from pending attach");
                }
                Err(e) => warn!(error = %e, "Pending attach task failed"),
            }
        }

        if let Some(mut engine) = self.engine.take() {
            engine.destroy().await;
            debug!(engine = engine.name(), "Destroyed engine");
        }
    }
}

impl Drop for SourceSwitchCoordinator {
    fn drop(&mut self) {
        if let Some(token) = self.fetch_cancel.take() {
            token.cancel();
        }
    }
}
