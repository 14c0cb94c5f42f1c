//! Bitrate measurement and presentation bands

use serde::{Deserialize, Serialize};

/// Presentation band of a segment bitrate
///
/// Used for colouring the segment visualization only; playback decisions
/// never look at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitrateClass {
    /// Below 1 Mbps
    Low,
    /// Below 3 Mbps
    Medium,
    /// Below 5 Mbps
    High,
    /// 5 Mbps and above
    VeryHigh,
}

impl BitrateClass {
    pub fn from_bps(bitrate_bps: u64) -> Self {
        match bitrate_bps {
            0..=999_999 => BitrateClass::Low,
            1_000_000..=2_999_999 => BitrateClass::Medium,
            3_000_000..=4_999_999 => BitrateClass::High,
            _ => BitrateClass::VeryHigh,
        }
    }

    /// Display colour (hex)
    pub fn color(&self) -> &'static str {
        match self {
            BitrateClass::Low => "#4CAF50",
            BitrateClass::Medium => "#FFEB3B",
            BitrateClass::High => "#FF9800",
            BitrateClass::VeryHigh => "#F44336",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BitrateClass::Low => "Low bitrate",
            BitrateClass::Medium => "Medium bitrate",
            BitrateClass::High => "High bitrate",
            BitrateClass::VeryHigh => "Very high bitrate",
        }
    }
}

impl std::fmt::Display for BitrateClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Bits per second for `bytes` transferred over `seconds`
pub fn measure_bitrate(bytes: u64, seconds: f64) -> u64 {
    if seconds <= 0.0 || !seconds.is_finite() {
        return 0;
    }
    ((bytes as f64 * 8.0) / seconds).round() as u64
}

/// Human readable bitrate: `850 bps`, `128.0 kbps`, `2.5 Mbps`
pub fn format_bitrate(bitrate_bps: u64) -> String {
    if bitrate_bps < 1_000 {
        format!("{} bps", bitrate_bps)
    } else if bitrate_bps < 1_000_000 {
        format!("{:.1} kbps", bitrate_bps as f64 / 1_000.0)
    } else {
        format!("{:.1} Mbps", bitrate_bps as f64 / 1_000_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitrate_bands() {
        assert_eq!(BitrateClass::from_bps(0), BitrateClass::Low);
        assert_eq!(BitrateClass::from_bps(999_999), BitrateClass::Low);
        assert_eq!(BitrateClass::from_bps(1_000_000), BitrateClass::Medium);
        assert_eq!(BitrateClass::from_bps(2_999_999), BitrateClass::Medium);
        assert_eq!(BitrateClass::from_bps(3_000_000), BitrateClass::High);
        assert_eq!(BitrateClass::from_bps(5_000_000), BitrateClass::VeryHigh);
    }

    #[test]
    fn test_measure_bitrate() {
        assert_eq!(measure_bitrate(1_250_000, 10.0), 1_000_000);
        assert_eq!(measure_bitrate(1_000, 0.0), 0);
        assert_eq!(measure_bitrate(1_000, -1.0), 0);
        assert_eq!(measure_bitrate(3, 7.0), 3);
    }

    #[test]
    fn test_format_bitrate() {
        assert_eq!(format_bitrate(850), "850 bps");
        assert_eq!(format_bitrate(128_000), "128.0 kbps");
        assert_eq!(format_bitrate(2_500_000), "2.5 Mbps");
    }
}
