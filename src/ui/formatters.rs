use chrono::{DateTime, Local, Utc};
use humansize::{format_size as human_format_size, BINARY};

const GB: f64 = 1024.0 * 1024.0 * 1024.0;
const MB: f64 = 1024.0 * 1024.0;

/// Format a byte count in human-readable form (KiB, MiB, ...)
pub fn format_size(bytes: u64) -> String {
    human_format_size(bytes, BINARY)
}

/// Bytes as gigabytes with two decimals
pub fn format_gb(bytes: u64) -> String {
    format!("{:.2} GB", bytes as f64 / GB)
}

/// Bytes as megabytes with one decimal
pub fn format_mb(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / MB)
}

/// Frequency in hertz as gigahertz
pub fn format_ghz(hz: u64) -> String {
    format!("{:.2} GHz", hz as f64 / 1_000_000_000.0)
}

/// Format a UTC timestamp in local time (HH:MM:SS)
pub fn format_time(time: DateTime<Utc>) -> String {
    let local: DateTime<Local> = time.into();
    local.format("%H:%M:%S").to_string()
}

/// Signed delta with an explicit sign, e.g. "+1.5" / "-0.3"
pub fn format_delta(value: f32) -> String {
    format!("{:+.1}", value)
}

/// Text bar `width` cells wide, filled proportionally to `percent`.
///
/// Percent is clamped to 0..=100; values above 100 (multi-core CPU usage)
/// render as a full bar.
pub fn usage_bar(percent: f32, width: usize) -> String {
    let percent = if percent.is_finite() {
        percent.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let filled = ((percent / 100.0) * width as f32).round() as usize;
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_bar_width_is_constant() {
        for percent in [0.0, 12.5, 50.0, 99.9, 100.0, 350.0, -4.0, f32::NAN] {
            assert_eq!(usage_bar(percent, 20).chars().count(), 20);
        }
    }

    #[test]
    fn test_usage_bar_fill() {
        assert_eq!(usage_bar(0.0, 4), "░░░░");
        assert_eq!(usage_bar(50.0, 4), "██░░");
        assert_eq!(usage_bar(100.0, 4), "████");
        assert_eq!(usage_bar(250.0, 4), "████");
    }

    #[test]
    fn test_unit_helpers() {
        assert_eq!(format_gb(2 * 1024 * 1024 * 1024), "2.00 GB");
        assert_eq!(format_mb(1536 * 1024), "1.5 MB");
        assert_eq!(format_ghz(2_400_000_000), "2.40 GHz");
        assert_eq!(format_delta(1.26), "+1.3");
        assert_eq!(format_delta(-0.3), "-0.3");
    }

    #[test]
    fn test_format_size() {
        assert!(format_size(512).ends_with(" B"));
        assert!(format_size(2048).contains("KiB"));
    }
}
