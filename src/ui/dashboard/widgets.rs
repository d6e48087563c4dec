use ratatui::{prelude::*, widgets::Gauge};

use crate::core::profiler::ThreadStat;

/// Color for a usage percentage
pub fn usage_color(value: f64) -> Color {
    match value {
        v if v < 50.0 => Color::Cyan,
        v if v < 75.0 => Color::LightYellow,
        v if v < 90.0 => Color::LightRed,
        _ => Color::Red,
    }
}

/// Create a gauge with color based on value thresholds
pub fn colored_gauge<'a>(value: f64, label: String) -> Gauge<'a> {
    Gauge::default()
        .gauge_style(Style::default().fg(usage_color(value)).bg(Color::Black))
        .ratio((value / 100.0).clamp(0.0, 1.0))
        .label(label)
}

/// Per-thread (id, user, system) CPU time in hundredths of a second.
/// Busiest threads first, at most `limit` of them.
pub fn thread_bars(threads: &[ThreadStat], limit: usize) -> Vec<(u64, u64, u64)> {
    let mut sorted: Vec<&ThreadStat> = threads.iter().collect();
    sorted.sort_by(|a, b| b.total_time().total_cmp(&a.total_time()));
    sorted
        .into_iter()
        .take(limit)
        .map(|t| {
            (
                t.thread_id,
                (t.user_time * 100.0) as u64,
                (t.system_time * 100.0) as u64,
            )
        })
        .collect()
}

/// Per-interval increments of a cumulative series.
pub fn increments(series: &[u64]) -> Vec<u64> {
    series
        .windows(2)
        .map(|pair| pair[1].saturating_sub(pair[0]))
        .collect()
}

/// Last `count` points of `series`.
pub fn tail(series: &[u64], count: usize) -> &[u64] {
    &series[series.len().saturating_sub(count)..]
}
