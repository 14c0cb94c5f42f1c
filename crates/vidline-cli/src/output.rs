//! Output formatting for CLI

use clap::ValueEnum;
use console::style;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use vidline_core::{bitrate::format_bitrate, BufferHealth, Rendition, SegmentView};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

/// Print `data` as pretty JSON
pub fn print_json<T: Serialize>(data: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

pub fn heading(text: &str) {
    println!("\n{}", style(text).green().bold());
}

#[derive(Tabled)]
pub struct SegmentRow {
    #[tabled(rename = "#")]
    pub index: usize,
    #[tabled(rename = "Start")]
    pub start: String,
    #[tabled(rename = "Duration")]
    pub duration: String,
    #[tabled(rename = "Bitrate")]
    pub bitrate: String,
    #[tabled(rename = "Class")]
    pub class: String,
    #[tabled(rename = "")]
    pub marks: String,
    #[tabled(rename = "URL")]
    pub url: String,
}

#[derive(Tabled)]
struct RenditionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Bandwidth")]
    bandwidth: String,
    #[tabled(rename = "Resolution")]
    resolution: String,
    #[tabled(rename = "Codecs")]
    codecs: String,
    #[tabled(rename = "URL")]
    url: String,
}

pub fn segment_table(rows: Vec<SegmentRow>) -> String {
    Table::new(rows).with(Style::modern()).to_string()
}

pub fn rendition_table(renditions: &[Rendition]) -> String {
    let rows = renditions.iter().map(|r| RenditionRow {
        id: r.id.clone(),
        bandwidth: format_bitrate(r.bandwidth),
        resolution: r
            .resolution
            .map(|res| format!("{} ({})", res, res.quality_name()))
            .unwrap_or_else(|| "-".to_string()),
        codecs: r.codecs.clone().unwrap_or_else(|| "-".to_string()),
        url: r.url.clone(),
    });
    Table::new(rows).with(Style::modern()).to_string()
}

/// Marks column for a segment view: `>` current, `=` buffered
pub fn view_marks(view: &SegmentView) -> String {
    let mut marks = String::new();
    if view.is_current {
        marks.push('>');
    }
    if view.is_buffered {
        marks.push('=');
    }
    marks
}

/// One-line text bar of buffered coverage, 50 columns wide
pub fn segment_bar(views: &[SegmentView]) -> String {
    const WIDTH: f64 = 50.0;
    let mut bar = String::new();
    for view in views {
        let cells = ((view.width_percent / 100.0) * WIDTH).round().max(1.0) as usize;
        let cell = if view.is_current {
            style("█").cyan().to_string()
        } else if view.is_buffered {
            style("▓").white().to_string()
        } else {
            style("░").dim().to_string()
        };
        bar.push_str(&cell.repeat(cells));
    }
    bar
}

pub fn print_health(health: &BufferHealth) {
    let status = if health.healthy {
        style("healthy").green()
    } else {
        style("rebuffer risk").red()
    };
    println!(
        "  Ahead: {} ms  Buffered: {:.2}s in {} range(s)  [{}]",
        health.ahead_ms, health.total_buffered, health.range_count, status
    );
}
