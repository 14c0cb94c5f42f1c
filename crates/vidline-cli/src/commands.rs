//! CLI command implementations

use crate::output::{self, OutputFormat, SegmentRow};
use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use vidline_core::bitrate::format_bitrate;
use vidline_core::manifest::{self, detect_container, detect_stream_type};
use vidline_core::{
    BufferedRange, BufferedRangeSet, BufferedRangeTracker, Command, Effect, ManifestFetcher, ManifestFormat,
    MediaEvent, PlaybackState, PlaybackStateMachine, PlayerConfig, SegmentTimeline,
};

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(Duration::from_millis(120));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb
}

/// Read a manifest from a URL or a local file and settle its format
async fn load_manifest(location: &str, config: &PlayerConfig) -> anyhow::Result<(String, ManifestFormat)> {
    let guess = ManifestFormat::for_stream(detect_stream_type(location, None));

    let content = if is_remote(location) {
        let pb = spinner(format!("Fetching {}", location));
        let fetcher = ManifestFetcher::new(config)?;
        let result = fetcher
            .fetch_text(location, guess.unwrap_or(ManifestFormat::Hls), &CancellationToken::new())
            .await;
        pb.finish_and_clear();
        result.with_context(|| format!("Failed to fetch manifest: {}", location))?
    } else {
        std::fs::read_to_string(location).with_context(|| format!("Failed to read manifest: {}", location))?
    };

    match guess.or_else(|| ManifestFormat::for_stream(detect_stream_type(location, Some(&content)))) {
        Some(format) => Ok((content, format)),
        None => bail!("{} is neither an HLS playlist nor a DASH MPD", location),
    }
}

/// Parse "0-5,4-9.5" into raw ranges
fn parse_ranges(input: &str) -> anyhow::Result<Vec<BufferedRange>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (start, end) = part
                .split_once('-')
                .with_context(|| format!("Range '{}' is not start-end", part))?;
            Ok(BufferedRange::new(
                start.trim().parse().with_context(|| format!("Bad range start '{}'", start))?,
                end.trim().parse().with_context(|| format!("Bad range end '{}'", end))?,
            ))
        })
        .collect()
}

#[derive(Serialize)]
struct TimelineReport<'a> {
    format: ManifestFormat,
    total_duration: f64,
    current_segment: Option<usize>,
    timeline: &'a SegmentTimeline,
    buffered: &'a BufferedRangeSet,
}

/// Show the segment timeline of a manifest
pub async fn timeline(
    location: &str,
    at: Option<f64>,
    buffered: Option<&str>,
    config: &PlayerConfig,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let (content, manifest_format) = load_manifest(location, config).await?;
    let timeline = manifest::parse(&content, manifest_format);
    let ranges = BufferedRangeSet::from_raw(&parse_ranges(buffered.unwrap_or_default())?);
    let position = at.unwrap_or(0.0);

    if format == OutputFormat::Json {
        return output::print_json(&TimelineReport {
            format: manifest_format,
            total_duration: timeline.total_duration(),
            current_segment: at.and_then(|t| timeline.index_at(t)),
            timeline: &timeline,
            buffered: &ranges,
        });
    }

    if timeline.is_empty() {
        println!("No segments found in {} manifest", manifest_format);
        return Ok(());
    }

    let views = timeline.layout(timeline.total_duration(), position, &ranges);
    output::heading(&format!(
        "{} segments, {:.3}s ({})",
        timeline.len(),
        timeline.total_duration(),
        manifest_format
    ));

    if format == OutputFormat::Table {
        let rows = timeline
            .iter()
            .zip(&views)
            .map(|(segment, view)| SegmentRow {
                index: view.index,
                start: format!("{:.3}", segment.start_time),
                duration: format!("{:.3}", segment.duration),
                bitrate: if segment.bitrate_bps > 0 {
                    format_bitrate(segment.bitrate_bps)
                } else {
                    "-".to_string()
                },
                class: view.class.label().to_string(),
                marks: output::view_marks(view),
                url: segment.url.clone(),
            })
            .collect();
        println!("{}", output::segment_table(rows));
    } else {
        for (segment, view) in timeline.iter().zip(&views) {
            println!(
                "  {:>4} {:>9.3}s +{:<7.3} {:2} {}",
                view.index,
                segment.start_time,
                segment.duration,
                output::view_marks(view),
                segment.url
            );
        }
    }

    println!("\n  {}", output::segment_bar(&views));
    if let Some(t) = at {
        match timeline.segment_at(t) {
            Some(segment) => println!("  {:.3}s is in {} (snaps to {:.3}s)", t, segment.url, timeline.snap(t)),
            None => println!("  {:.3}s is outside the timeline", t),
        }
    }
    Ok(())
}

/// List renditions
pub async fn renditions(location: &str, config: &PlayerConfig, format: OutputFormat) -> anyhow::Result<()> {
    let (content, manifest_format) = load_manifest(location, config).await?;
    let renditions = manifest::renditions(&content, manifest_format);

    match format {
        OutputFormat::Json => output::print_json(&renditions),
        _ if renditions.is_empty() => {
            println!("No renditions declared (media playlist or single representation)");
            Ok(())
        }
        OutputFormat::Table => {
            println!("{}", output::rendition_table(&renditions));
            Ok(())
        }
        OutputFormat::Text => {
            output::heading(&format!("{} renditions", renditions.len()));
            for (i, r) in renditions.iter().enumerate() {
                let resolution = r.resolution.map(|res| res.to_string()).unwrap_or_default();
                println!("  {}. {} - {} {}", i + 1, r.id, format_bitrate(r.bandwidth), resolution);
            }
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct RangesReport<'a> {
    ranges: &'a BufferedRangeSet,
    position: f64,
    health: vidline_core::BufferHealth,
}

/// Normalize ranges and report buffer ahead of `at`
pub fn ranges(input: &str, at: f64, config: &PlayerConfig, format: OutputFormat) -> anyhow::Result<()> {
    let raw = parse_ranges(input)?;
    let mut tracker = BufferedRangeTracker::new();
    tracker.update(&raw);
    let health = tracker.health(at, config.rebuffer_threshold);

    if format == OutputFormat::Json {
        return output::print_json(&RangesReport {
            ranges: tracker.ranges(),
            position: at,
            health,
        });
    }

    output::heading("Normalized ranges");
    for range in tracker.ranges().iter() {
        println!("  [{:.3}, {:.3}]", range.start, range.end);
    }
    output::print_health(&health);
    Ok(())
}

#[derive(Serialize)]
struct Detection<'a> {
    url: &'a str,
    stream_type: vidline_core::StreamType,
    container: &'a str,
    has_manifest: bool,
}

/// Detect stream type from a URL
pub fn detect(url: &str, format: OutputFormat) -> anyhow::Result<()> {
    let stream_type = detect_stream_type(url, None);
    let detection = Detection {
        url,
        stream_type,
        container: detect_container(url),
        has_manifest: stream_type.has_manifest(),
    };

    if format == OutputFormat::Json {
        return output::print_json(&detection);
    }
    println!("  Type: {}", detection.stream_type);
    println!("  Container: {}", detection.container);
    println!("  Manifest: {}", detection.has_manifest);
    Ok(())
}

/// Monitor a live manifest
pub async fn monitor(location: &str, interval: u64, duration: u64, config: &PlayerConfig) -> anyhow::Result<()> {
    let Some(manifest_format) = ManifestFormat::for_stream(detect_stream_type(location, None)) else {
        bail!("{} does not look like an HLS or DASH manifest URL", location);
    };
    println!("Monitoring: {}", location);
    println!("  Interval: {}s", interval);
    println!(
        "  Duration: {}",
        if duration == 0 { "indefinite".to_string() } else { format!("{}s", duration) }
    );

    let fetcher = ManifestFetcher::new(config)?;
    let cancel = CancellationToken::new();
    let start = std::time::Instant::now();
    let mut last: Option<(usize, f64)> = None;

    loop {
        if duration > 0 && start.elapsed().as_secs() >= duration {
            println!("\nMonitoring complete.");
            break;
        }

        let timeline = tokio::select! {
            timeline = fetcher.fetch_timeline(location, manifest_format, &cancel) => timeline,
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                println!("\nInterrupted.");
                break;
            }
        };

        let now = chrono::Utc::now().format("%H:%M:%S");
        let current = (timeline.len(), timeline.total_duration());
        match last {
            _ if timeline.is_empty() => println!("[{}] Segment visualization unavailable", now),
            Some(previous) if previous == current => println!("[{}] Unchanged - {} segments", now, current.0),
            _ => println!("[{}] {} segments, {:.3}s", now, current.0, current.1),
        }
        last = Some(current);

        tokio::time::sleep(Duration::from_secs(interval.max(1))).await;
    }

    Ok(())
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
enum Step {
    Command(Command),
    Event(MediaEvent),
}

#[derive(Serialize)]
struct StepResult {
    step: Step,
    effects: Vec<Effect>,
}

#[derive(Serialize)]
struct Simulation {
    steps: Vec<StepResult>,
    state: PlaybackState,
}

/// Run a script of commands and events through the state machine
pub fn simulate(script: &Path, playlist_len: usize, config: &PlayerConfig, format: OutputFormat) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(script).with_context(|| format!("Failed to read {}", script.display()))?;
    let steps: Vec<Step> = serde_json::from_str(&content).context("Script must be a JSON array of steps")?;

    let mut machine = PlaybackStateMachine::new(config.clone()).with_playlist_len(playlist_len);
    let results: Vec<StepResult> = steps
        .into_iter()
        .map(|step| {
            let effects = match &step {
                Step::Command(command) => machine.dispatch(command.clone()),
                Step::Event(event) => machine.handle_event(event.clone()),
            };
            StepResult { step, effects }
        })
        .collect();

    if format == OutputFormat::Json {
        return output::print_json(&Simulation {
            steps: results,
            state: machine.state().clone(),
        });
    }

    for (i, result) in results.iter().enumerate() {
        let effects = if result.effects.is_empty() {
            "-".to_string()
        } else {
            result
                .effects
                .iter()
                .map(|e| format!("{:?}", e))
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!("  {:>3}. {:?} => {}", i + 1, result.step, effects);
    }

    let state = machine.state();
    output::heading("Final state");
    println!(
        "  {:.3}/{:.3}s playing={} volume={:.2}{} rate={} quality={} item={}",
        state.current_time,
        state.duration,
        state.is_playing,
        state.volume,
        if state.is_muted { " (muted)" } else { "" },
        state.playback_rate,
        state.active_quality_id,
        state.playlist_index
    );
    output::print_health(&machine.buffer_health());
    Ok(())
}
