//! Benchmarks for vidline-core hot paths
//!
//! Run with: cargo bench -p vidline-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use vidline_core::manifest::{self, detect_stream_type, ManifestFormat};
use vidline_core::playback::{Command, MediaEvent, PlaybackStateMachine};
use vidline_core::{BufferedRange, BufferedRangeSet};

// ============================================================================
// Helpers
// ============================================================================

/// HLS media playlist with N segments
fn generate_hls_media(segment_count: usize) -> String {
    let mut m3u8 = String::from("#EXTM3U\n");
    m3u8.push_str("#EXT-X-VERSION:3\n");
    m3u8.push_str("#EXT-X-TARGETDURATION:6\n");
    m3u8.push_str("#EXT-X-MEDIA-SEQUENCE:0\n");

    for i in 0..segment_count {
        let dur = 4.0 + (i % 3) as f32 * 0.5; // 4.0, 4.5, 5.0 rotation
        m3u8.push_str(&format!("#EXTINF:{:.3},\n", dur));
        m3u8.push_str(&format!("segment_{:05}.ts\n", i));
    }

    m3u8.push_str("#EXT-X-ENDLIST\n");
    m3u8
}

/// MPD with N segment templates
fn generate_mpd(template_count: usize) -> String {
    let mut mpd = String::from("<MPD xmlns=\"urn:mpeg:dash:schema:mpd:2011\"><Period><AdaptationSet>\n");
    for i in 0..template_count {
        mpd.push_str(&format!(
            "<Representation id=\"r{i}\" bandwidth=\"{}\"><SegmentTemplate media=\"r{i}_$Number$.m4s\" timescale=\"90000\" duration=\"360000\"/></Representation>\n",
            800_000 + i * 100_000
        ));
    }
    mpd.push_str("</AdaptationSet></Period></MPD>\n");
    mpd
}

/// Overlapping, unordered ranges as a media element might report them
fn generate_ranges(count: usize) -> Vec<BufferedRange> {
    (0..count)
        .rev()
        .map(|i| {
            let start = i as f64 * 3.0;
            BufferedRange::new(start, start + 4.0 - (i % 2) as f64 * 2.0)
        })
        .collect()
}

// ============================================================================
// Manifest Parsing Benchmarks
// ============================================================================

fn bench_hls_media_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("HLS Media Parsing");

    for &segment_count in &[10, 50, 200, 1000] {
        let manifest = generate_hls_media(segment_count);

        group.bench_with_input(
            BenchmarkId::new("parse", format!("{}_segments", segment_count)),
            &manifest,
            |b, manifest| {
                b.iter(|| black_box(manifest::parse(black_box(manifest), ManifestFormat::Hls)));
            },
        );
    }

    group.finish();
}

fn bench_dash_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("DASH Template Parsing");

    for &template_count in &[1, 8, 32] {
        let mpd = generate_mpd(template_count);

        group.bench_with_input(
            BenchmarkId::new("parse", format!("{}_templates", template_count)),
            &mpd,
            |b, mpd| {
                b.iter(|| black_box(manifest::parse(black_box(mpd), ManifestFormat::Dash)));
            },
        );
    }

    group.finish();
}

fn bench_stream_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("Stream Type Detection");

    group.bench_function("detect_hls_by_url", |b| {
        b.iter(|| black_box(detect_stream_type(black_box("https://cdn.example.com/live/master.m3u8"), None)));
    });

    group.bench_function("detect_dash_by_content", |b| {
        let content = "<?xml version=\"1.0\"?><MPD xmlns=\"urn:mpeg:dash:schema:mpd:2011\">";
        b.iter(|| {
            black_box(detect_stream_type(
                black_box("https://cdn.example.com/live/stream"),
                Some(black_box(content)),
            ))
        });
    });

    group.finish();
}

// ============================================================================
// Timeline Benchmarks
// ============================================================================

fn bench_timeline_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("Timeline Queries");
    let timeline = manifest::parse(&generate_hls_media(1000), ManifestFormat::Hls);
    let ranges = BufferedRangeSet::from_raw(&generate_ranges(100));
    let total = timeline.total_duration();

    group.bench_function("segment_at", |b| {
        b.iter(|| black_box(timeline.segment_at(black_box(total * 0.37))));
    });

    group.bench_function("layout_1000", |b| {
        b.iter(|| black_box(timeline.layout(total, black_box(total / 2.0), &ranges)));
    });

    group.finish();
}

// ============================================================================
// Buffered Range Benchmarks
// ============================================================================

fn bench_range_normalization(c: &mut Criterion) {
    let mut group = c.benchmark_group("Buffered Range Normalization");

    for &count in &[4, 32, 256] {
        let raw = generate_ranges(count);
        group.bench_with_input(BenchmarkId::new("from_raw", count), &raw, |b, raw| {
            b.iter(|| black_box(BufferedRangeSet::from_raw(black_box(raw))));
        });
    }

    group.finish();
}

// ============================================================================
// State Machine Benchmarks
// ============================================================================

fn bench_state_machine(c: &mut Criterion) {
    let mut group = c.benchmark_group("Playback State Machine");

    group.bench_function("time_updates", |b| {
        let mut machine = PlaybackStateMachine::default();
        machine.handle_event(MediaEvent::MetadataLoaded { duration: 3600.0 });
        let mut time = 0.0;
        b.iter(|| {
            time = (time + 0.25) % 3600.0;
            black_box(machine.handle_event(MediaEvent::TimeUpdate { time }))
        });
    });

    group.bench_function("seek_commands", |b| {
        let mut machine = PlaybackStateMachine::default();
        machine.handle_event(MediaEvent::MetadataLoaded { duration: 3600.0 });
        b.iter(|| black_box(machine.dispatch(Command::SeekBy(black_box(5.0)))));
    });

    group.finish();
}

// ============================================================================
// Group Registration
// ============================================================================

criterion_group!(
    manifest_benches,
    bench_hls_media_parsing,
    bench_dash_parsing,
    bench_stream_detection,
);

criterion_group!(
    timeline_benches,
    bench_timeline_queries,
    bench_range_normalization,
);

criterion_group!(
    state_benches,
    bench_state_machine,
);

criterion_main!(manifest_benches, timeline_benches, state_benches);
