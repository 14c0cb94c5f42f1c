//! Transcoding capability
//!
//! Operations run on an external transcoder (an ffmpeg binary, a wasm build,
//! a remote worker). The session creates it on first use and shuts it down
//! with the source coordinator. A failed operation is scoped to itself and
//! never touches playback state.

use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Number of thumbnails generated when the caller does not say
pub const DEFAULT_THUMBNAIL_COUNT: usize = 5;
/// Number of keyframes extracted when the caller does not say
pub const DEFAULT_KEYFRAME_COUNT: usize = 10;

/// A named input file
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInput {
    pub name: String,
    pub data: Bytes,
}

impl MediaInput {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Extension of the file name, lowercased
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .filter(|ext| !ext.is_empty())
    }
}

/// One transcoding operation
#[derive(Debug, Clone, PartialEq)]
pub enum TranscodeOp {
    /// Re-encode to H.264/AAC MP4
    Convert { input: MediaInput },
    /// Audio track as 192 kbps stereo MP3
    ExtractAudio { input: MediaInput },
    /// Stream-copy `duration` seconds starting at `start`
    Trim { input: MediaInput, start: f64, duration: f64 },
    /// `count` frames scaled to 320x180, `interval` seconds apart
    Thumbnails { input: MediaInput, interval: f64, count: usize },
    /// Container and stream metadata
    Info { input: MediaInput },
    /// Re-encode to VP9/Opus WebM
    Transcode { input: MediaInput },
    /// Up to `count` I-frames, one per 10 second window
    Keyframes { input: MediaInput, count: usize },
    /// Concatenate inputs without re-encoding
    Merge { inputs: Vec<MediaInput> },
}

/// Shape of an operation's result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Blob,
    Images,
    Info,
}

impl TranscodeOp {
    /// Operation name used in errors and logs
    pub fn name(&self) -> &'static str {
        match self {
            TranscodeOp::Convert { .. } => "convert",
            TranscodeOp::ExtractAudio { .. } => "extract_audio",
            TranscodeOp::Trim { .. } => "trim",
            TranscodeOp::Thumbnails { .. } => "thumbnails",
            TranscodeOp::Info { .. } => "info",
            TranscodeOp::Transcode { .. } => "transcode",
            TranscodeOp::Keyframes { .. } => "keyframes",
            TranscodeOp::Merge { .. } => "merge",
        }
    }

    pub fn output_kind(&self) -> OutputKind {
        match self {
            TranscodeOp::Thumbnails { .. } | TranscodeOp::Keyframes { .. } => OutputKind::Images,
            TranscodeOp::Info { .. } => OutputKind::Info,
            _ => OutputKind::Blob,
        }
    }

    /// MIME type of the produced blob or images
    pub fn output_mime(&self) -> &'static str {
        match self {
            TranscodeOp::Convert { .. } | TranscodeOp::Trim { .. } | TranscodeOp::Merge { .. } => "video/mp4",
            TranscodeOp::ExtractAudio { .. } => "audio/mpeg",
            TranscodeOp::Transcode { .. } => "video/webm",
            TranscodeOp::Thumbnails { .. } | TranscodeOp::Keyframes { .. } => "image/jpeg",
            TranscodeOp::Info { .. } => "application/json",
        }
    }

    /// Names of the input files the transcoder has to stage
    ///
    /// Merge inputs are renamed `input_<i>.<ext>` and listed in `file_list.txt`.
    pub fn staged_inputs(&self) -> Vec<(String, Bytes)> {
        match self {
            TranscodeOp::Merge { inputs } => {
                let mut staged: Vec<(String, Bytes)> = inputs
                    .iter()
                    .enumerate()
                    .map(|(i, input)| (merge_input_name(i, input), input.data.clone()))
                    .collect();
                let list = staged
                    .iter()
                    .map(|(name, _)| format!("file '{}'", name))
                    .collect::<Vec<_>>()
                    .join("\n");
                staged.push(("file_list.txt".to_string(), Bytes::from(list)));
                staged
            }
            TranscodeOp::Convert { input }
            | TranscodeOp::ExtractAudio { input }
            | TranscodeOp::Trim { input, .. }
            | TranscodeOp::Thumbnails { input, .. }
            | TranscodeOp::Info { input }
            | TranscodeOp::Transcode { input }
            | TranscodeOp::Keyframes { input, .. } => vec![(input.name.clone(), input.data.clone())],
        }
    }

    /// ffmpeg (or ffprobe for `Info`) argument lists, one per invocation
    pub fn ffmpeg_args(&self) -> Vec<Vec<String>> {
        match self {
            TranscodeOp::Convert { input } => vec![args(&[
                "-i", &input.name, "-c:v", "libx264", "-c:a", "aac", "-preset", "fast", "-crf", "23",
                "output.mp4",
            ])],
            TranscodeOp::ExtractAudio { input } => vec![args(&[
                "-i", &input.name, "-vn", "-ar", "44100", "-ac", "2", "-ab", "192k", "-f", "mp3",
                "output.mp3",
            ])],
            TranscodeOp::Trim {
                input,
                start,
                duration,
            } => vec![args(&[
                "-i",
                &input.name,
                "-ss",
                &start.to_string(),
                "-t",
                &duration.to_string(),
                "-c",
                "copy",
                "output.mp4",
            ])],
            TranscodeOp::Thumbnails {
                input,
                interval,
                count,
            } => (0..*count)
                .map(|i| {
                    args(&[
                        "-i",
                        &input.name,
                        "-ss",
                        &(i as f64 * interval).to_string(),
                        "-vframes",
                        "1",
                        "-vf",
                        "scale=320:180",
                        &format!("thumbnail_{}.jpg", i),
                    ])
                })
                .collect(),
            TranscodeOp::Info { input } => vec![args(&[
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                &input.name,
            ])],
            TranscodeOp::Transcode { input } => vec![args(&[
                "-i", &input.name, "-c:v", "libvpx-vp9", "-b:v", "2M", "-c:a", "libopus", "-b:a", "128k",
                "output.webm",
            ])],
            TranscodeOp::Keyframes { input, count } => (0..*count)
                .map(|i| {
                    args(&[
                        "-i",
                        &input.name,
                        "-vf",
                        &format!("select=eq(pict_type\\,I)*gte(t\\,{})", i * 10),
                        "-vsync",
                        "vfr",
                        "-q:v",
                        "2",
                        "-frames:v",
                        "1",
                        &format!("keyframe_{}.jpg", i),
                    ])
                })
                .collect(),
            TranscodeOp::Merge { .. } => vec![args(&[
                "-f",
                "concat",
                "-safe",
                "0",
                "-i",
                "file_list.txt",
                "-c",
                "copy",
                "merged.mp4",
            ])],
        }
    }

    fn validate(&self) -> Result<()> {
        let invalid = |message: &str| Err(Error::transcode(self.name(), message));
        match self {
            TranscodeOp::Trim { start, duration, .. } => {
                if !start.is_finite() || *start < 0.0 {
                    return invalid("start must be a non-negative number of seconds");
                }
                if !duration.is_finite() || *duration <= 0.0 {
                    return invalid("duration must be positive");
                }
            }
            TranscodeOp::Thumbnails { interval, count, .. } => {
                if !interval.is_finite() || *interval < 0.0 {
                    return invalid("interval must be a non-negative number of seconds");
                }
                if *count == 0 {
                    return invalid("at least one thumbnail is required");
                }
            }
            TranscodeOp::Keyframes { count, .. } if *count == 0 => {
                return invalid("at least one keyframe is required");
            }
            TranscodeOp::Merge { inputs } if inputs.len() < 2 => {
                return invalid("at least two inputs are required");
            }
            _ => {}
        }
        Ok(())
    }
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn merge_input_name(index: usize, input: &MediaInput) -> String {
    match input.extension() {
        Some(ext) => format!("input_{}.{}", index, ext),
        None => format!("input_{}", index),
    }
}

/// Video stream metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoStreamInfo {
    pub codec: String,
    pub width: u32,
    pub height: u32,
    pub fps: Option<f64>,
}

/// Audio stream metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioStreamInfo {
    pub codec: String,
    pub channels: u32,
    pub sample_rate: u32,
}

/// Result of the `info` operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub format: String,
    /// Seconds
    pub duration: f64,
    /// Bits per second
    pub bitrate: u64,
    pub video: Option<VideoStreamInfo>,
    pub audio: Option<AudioStreamInfo>,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    channels: Option<u32>,
    sample_rate: Option<String>,
}

impl MediaInfo {
    /// Map `ffprobe -print_format json -show_format -show_streams` output
    pub fn from_ffprobe_json(json: &str) -> Result<Self> {
        let output: FfprobeOutput = serde_json::from_str(json)?;

        let video = output
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .map(|s| VideoStreamInfo {
                codec: s.codec_name.clone().unwrap_or_default(),
                width: s.width.unwrap_or(0),
                height: s.height.unwrap_or(0),
                fps: s.r_frame_rate.as_deref().and_then(parse_rational),
            });

        let audio = output
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("audio"))
            .map(|s| AudioStreamInfo {
                codec: s.codec_name.clone().unwrap_or_default(),
                channels: s.channels.unwrap_or(0),
                sample_rate: s
                    .sample_rate
                    .as_deref()
                    .and_then(|r| r.parse().ok())
                    .unwrap_or(0),
            });

        Ok(Self {
            format: output
                .format
                .format_name
                .and_then(|name| name.split(',').next().map(str::to_string))
                .unwrap_or_default(),
            duration: output
                .format
                .duration
                .and_then(|d| d.parse().ok())
                .unwrap_or(0.0),
            bitrate: output
                .format
                .bit_rate
                .and_then(|b| b.parse().ok())
                .unwrap_or(0),
            video,
            audio,
        })
    }
}

/// `30000/1001` or `25`
fn parse_rational(value: &str) -> Option<f64> {
    match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            (den != 0.0).then(|| num / den)
        }
        None => value.parse().ok(),
    }
}

/// What an operation produced
#[derive(Debug, Clone, PartialEq)]
pub enum TranscodeOutput {
    Blob(Bytes),
    Images(Vec<Bytes>),
    Info(MediaInfo),
}

impl TranscodeOutput {
    pub fn kind(&self) -> OutputKind {
        match self {
            TranscodeOutput::Blob(_) => OutputKind::Blob,
            TranscodeOutput::Images(_) => OutputKind::Images,
            TranscodeOutput::Info(_) => OutputKind::Info,
        }
    }
}

/// An external transcoder
///
/// `run` has no internal cancellation: once started an operation runs to
/// completion or failure.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn run(&mut self, op: TranscodeOp) -> Result<TranscodeOutput>;

    /// Release the transcoder's resources
    async fn terminate(&mut self) {}
}

/// Loads a transcoder on demand
#[async_trait]
pub trait TranscoderFactory: Send + Sync {
    async fn create(&self) -> Result<Box<dyn Transcoder>>;
}

/// Lazily created, explicitly shut down transcoder handle
pub struct TranscodeSession {
    factory: Arc<dyn TranscoderFactory>,
    transcoder: Option<Box<dyn Transcoder>>,
    completed: u64,
    failed: u64,
}

impl std::fmt::Debug for TranscodeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscodeSession")
            .field("loaded", &self.transcoder.is_some())
            .field("completed", &self.completed)
            .field("failed", &self.failed)
            .finish()
    }
}

impl TranscodeSession {
    pub fn new(factory: Arc<dyn TranscoderFactory>) -> Self {
        Self {
            factory,
            transcoder: None,
            completed: 0,
            failed: 0,
        }
    }

    /// True once the transcoder has been created
    pub fn is_loaded(&self) -> bool {
        self.transcoder.is_some()
    }

    /// (completed, failed) operation counts
    pub fn counts(&self) -> (u64, u64) {
        (self.completed, self.failed)
    }

    /// Run one operation, creating the transcoder first if needed
    ///
    /// Every failure comes back as [`Error::Transcode`] naming the operation.
    #[instrument(skip(self, op), fields(operation = op.name()))]
    pub async fn run(&mut self, op: TranscodeOp) -> Result<TranscodeOutput> {
        let result = self.run_inner(op).await;
        match &result {
            Ok(_) => self.completed += 1,
            Err(e) => {
                self.failed += 1;
                warn!(error = %e, "Transcode operation failed");
            }
        }
        result
    }

    async fn run_inner(&mut self, op: TranscodeOp) -> Result<TranscodeOutput> {
        let name = op.name();
        let expected = op.output_kind();
        op.validate()?;

        if self.transcoder.is_none() {
            info!("Loading transcoder");
            let created = self
                .factory
                .create()
                .await
                .map_err(|e| Error::transcode(name, format!("transcoder unavailable: {}", e)))?;
            self.transcoder = Some(created);
        }
        let Some(transcoder) = self.transcoder.as_mut() else {
            return Err(Error::transcode(name, "transcoder unavailable"));
        };

        debug!("Running transcode operation");
        let output = transcoder.run(op).await.map_err(|e| match e {
            Error::Transcode { .. } => e,
            other => Error::transcode(name, other.to_string()),
        })?;

        if output.kind() != expected {
            return Err(Error::transcode(
                name,
                format!("expected {:?} output, got {:?}", expected, output.kind()),
            ));
        }
        Ok(output)
    }

    pub async fn convert(&mut self, input: MediaInput) -> Result<Bytes> {
        self.run(TranscodeOp::Convert { input }).await.map(into_blob)
    }

    pub async fn extract_audio(&mut self, input: MediaInput) -> Result<Bytes> {
        self.run(TranscodeOp::ExtractAudio { input }).await.map(into_blob)
    }

    pub async fn trim(&mut self, input: MediaInput, start: f64, duration: f64) -> Result<Bytes> {
        self.run(TranscodeOp::Trim { input, start, duration })
            .await
            .map(into_blob)
    }

    pub async fn thumbnails(&mut self, input: MediaInput, interval: f64) -> Result<Vec<Bytes>> {
        self.run(TranscodeOp::Thumbnails {
            input,
            interval,
            count: DEFAULT_THUMBNAIL_COUNT,
        })
        .await
        .map(into_images)
    }

    pub async fn info(&mut self, input: MediaInput) -> Result<MediaInfo> {
        match self.run(TranscodeOp::Info { input }).await? {
            TranscodeOutput::Info(info) => Ok(info),
            _ => Ok(MediaInfo::default()),
        }
    }

    pub async fn transcode(&mut self, input: MediaInput) -> Result<Bytes> {
        self.run(TranscodeOp::Transcode { input }).await.map(into_blob)
    }

    pub async fn keyframes(&mut self, input: MediaInput) -> Result<Vec<Bytes>> {
        self.run(TranscodeOp::Keyframes {
            input,
            count: DEFAULT_KEYFRAME_COUNT,
        })
        .await
        .map(into_images)
    }

    pub async fn merge(&mut self, inputs: Vec<MediaInput>) -> Result<Bytes> {
        self.run(TranscodeOp::Merge { inputs }).await.map(into_blob)
    }

    /// Terminate and drop the transcoder; the next operation creates a new one
    pub async fn shutdown(&mut self) {
        if let Some(mut transcoder) = self.transcoder.take() {
            transcoder.terminate().await;
            info!("Transcoder shut down");
        }
    }
}

fn into_blob(output: TranscodeOutput) -> Bytes {
    match output {
        TranscodeOutput::Blob(bytes) => bytes,
        _ => Bytes::new(),
    }
}

fn into_images(output: TranscodeOutput) -> Vec<Bytes> {
    match output {
        TranscodeOutput::Images(images) => images,
        _ => Vec::new(),
    }
}
