use ratatui::{
    prelude::*,
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
};

use super::app::DashboardApp;
use super::widgets::{colored_gauge, increments, tail, thread_bars, usage_color};
use crate::core::profiler::{flatten_tree, format_tree_indent, NodeRole, SampleFrame};
use crate::ui::formatters::{
    format_delta, format_gb, format_ghz, format_mb, format_size, format_time, usage_bar,
};

/// Main render function
pub fn render_ui(frame: &mut Frame, app: &DashboardApp) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),      // Host header
            Constraint::Length(4),      // Process summary
            Constraint::Percentage(40), // Usage + tree
            Constraint::Min(6),         // Threads + I/O
            Constraint::Length(1),      // Footer
        ])
        .split(area);

    render_host_header(frame, chunks[0], app);

    match &app.frame {
        Some(sample) => {
            render_process_summary(frame, chunks[1], app, sample);
            render_usage_section(frame, chunks[2], app, sample);
            render_threads_io_section(frame, chunks[3], sample);
        }
        None => {
            let waiting = Paragraph::new(format!(
                " Waiting for the first sample of process {}...",
                app.pid
            ))
            .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(waiting, chunks[1]);
        }
    }

    render_footer(frame, chunks[4], app);

    if app.show_help {
        render_help_overlay(frame, area);
    }
}

/// Machine-wide metrics in the title bar
fn render_host_header(frame: &mut Frame, area: Rect, app: &DashboardApp) {
    let host = app.frame.as_ref().and_then(|sample| sample.host.as_ref());

    let title = match host {
        Some(host) => {
            let disk = host
                .disk
                .as_ref()
                .map(|d| {
                    format!(
                        "Disk {}: {} free of {}",
                        d.mount_point,
                        format_gb(d.free_bytes),
                        format_gb(d.total_bytes)
                    )
                })
                .unwrap_or_else(|| "Disk: -".to_string());
            format!(
                " procwatch │ CPU {} │ RAM {}/{} │ {} │ Net ↑{} ↓{} │ Refresh: {:.1}s ",
                format_ghz(host.cpu_frequency_hz),
                format_gb(host.memory_used_bytes),
                format_gb(host.memory_total_bytes),
                disk,
                format_mb(host.network_bytes_sent),
                format_mb(host.network_bytes_received),
                app.interval.as_secs_f64(),
            )
        }
        None => format!(
            " procwatch │ Host metrics unavailable │ Refresh: {:.1}s ",
            app.interval.as_secs_f64()
        ),
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    frame.render_widget(block, area);
}

fn render_process_summary(frame: &mut Frame, area: Rect, app: &DashboardApp, sample: &SampleFrame) {
    let snapshot = &sample.snapshot;

    let block = Block::default()
        .title(format!(
            " {} (pid {}) │ cycle {} │ {} ",
            snapshot.name,
            snapshot.pid,
            sample.cycle,
            format_time(snapshot.timestamp)
        ))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let status_color = if app.finished {
        Color::Red
    } else {
        Color::Green
    };

    let line1 = Line::from(vec![
        Span::styled(
            format!("{} ", snapshot.status.label()),
            Style::default()
                .fg(status_color)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            "│ Priority: {} │ Threads: {} │ ",
            snapshot.priority_tier,
            snapshot.thread_count()
        )),
        Span::styled(
            snapshot.exe_path.clone().unwrap_or_else(|| "-".to_string()),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        ),
    ]);

    let bar_width = app.bar_width.min(inner.width.saturating_sub(30) as usize / 2).max(1);
    let cpu = snapshot.cpu_percent;
    let mem = snapshot.mem_percent;
    let line2 = Line::from(vec![
        Span::raw("CPU "),
        Span::styled(
            usage_bar(cpu, bar_width),
            Style::default().fg(usage_color(cpu as f64)),
        ),
        Span::raw(format!(" {:>5.1}% ({}) ", cpu, format_delta(sample.delta.cpu_delta))),
        Span::raw("MEM "),
        Span::styled(
            usage_bar(mem, bar_width),
            Style::default().fg(usage_color(mem as f64)),
        ),
        Span::raw(format!(" {:>5.1}% ({})", mem, format_delta(sample.delta.mem_delta))),
    ]);

    frame.render_widget(Paragraph::new(vec![line1, line2]), inner);
}

fn render_usage_section(frame: &mut Frame, area: Rect, app: &DashboardApp, sample: &SampleFrame) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    render_usage_history(frame, chunks[0], sample);

    if app.show_tree {
        render_tree_panel(frame, chunks[1], sample);
    } else {
        render_details_panel(frame, chunks[1], sample);
    }
}

/// CPU and memory gauges over their history bar charts
fn render_usage_history(frame: &mut Frame, area: Rect, sample: &SampleFrame) {
    let block = Block::default().title(" Usage ").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height < 2 {
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    let cpu = sample.snapshot.cpu_percent as f64;
    let mem = sample.snapshot.mem_percent as f64;
    frame.render_widget(colored_gauge(cpu, format!("CPU {:.1}%", cpu)), rows[0]);
    frame.render_widget(colored_gauge(mem, format!("MEM {:.1}%", mem)), rows[1]);

    if rows[2].height < 3 {
        return;
    }

    let charts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[2]);

    let history = &sample.history;
    render_history_chart(frame, charts[0], "CPU History", &history.cpu_as_u64(), Color::Cyan);
    render_history_chart(
        frame,
        charts[1],
        "Memory History",
        &history.memory_as_u64(),
        Color::Magenta,
    );
}

/// Percent history scaled by 10, as many recent points as fit
fn render_history_chart(frame: &mut Frame, area: Rect, title: &str, history: &[u64], color: Color) {
    let inner_width = area.width.saturating_sub(2) as usize;
    let bar_width: u16 = 1;
    let bar_gap: u16 = 1;
    let max_bars = inner_width / (bar_width + bar_gap) as usize;

    let data: Vec<(&str, u64)> = tail(history, max_bars).iter().map(|&v| ("", v)).collect();
    let max = data.iter().map(|&(_, v)| v).max().unwrap_or(0).max(1000);

    let chart = BarChart::default()
        .block(Block::default().title(title.to_string()).borders(Borders::ALL))
        .bar_width(bar_width)
        .bar_gap(bar_gap)
        .bar_style(Style::default().fg(color))
        .value_style(Style::default().fg(Color::Black).bg(color))
        .data(&data)
        .max(max);

    frame.render_widget(chart, area);
}

fn render_tree_panel(frame: &mut Frame, area: Rect, sample: &SampleFrame) {
    let title = if sample.tree_stale {
        format!(" Process Tree ({} nodes, stale) [t] ", sample.tree.node_count())
    } else {
        format!(" Process Tree ({} nodes) [t] ", sample.tree.node_count())
    };
    let block = Block::default().title(title).borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height < 2 {
        return;
    }

    let header = Row::new(vec![
        Cell::from("PID").style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from("PPID").style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from("Name").style(Style::default().add_modifier(Modifier::BOLD)),
    ])
    .height(1);

    let rows: Vec<Row> = flatten_tree(&sample.tree)
        .iter()
        .map(|row| {
            let style = match row.role {
                NodeRole::Current => Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
                NodeRole::Parent => Style::default().fg(Color::DarkGray),
                NodeRole::Child => Style::default(),
            };
            let ppid = row
                .parent_pid
                .map(|ppid| ppid.to_string())
                .unwrap_or_else(|| "-".to_string());
            Row::new(vec![
                Cell::from(row.pid.to_string()),
                Cell::from(ppid),
                Cell::from(format!("{}{}", format_tree_indent(row), row.name)),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Min(10),
    ];
    let table = Table::new(rows, widths).header(header);
    frame.render_widget(table, inner);
}

fn render_details_panel(frame: &mut Frame, area: Rect, sample: &SampleFrame) {
    let snapshot = &sample.snapshot;
    let block = Block::default().title(" Details [t] ").borders(Borders::ALL);

    let mut lines = vec![
        Line::from(format!("PID:       {}", snapshot.pid)),
        Line::from(format!("Name:      {}", snapshot.name)),
        Line::from(format!(
            "Path:      {}",
            snapshot.exe_path.as_deref().unwrap_or("-")
        )),
        Line::from(format!("Status:    {}", snapshot.status.label())),
        Line::from(format!("Priority:  {}", snapshot.priority_tier)),
        Line::from(format!("Threads:   {}", snapshot.thread_count())),
        Line::from(format!("Children:  {}", sample.tree.descendant_count())),
        Line::from(format!("History:   {} points", sample.history.len())),
        Line::from(format!("Sockets:   {}", snapshot.connections.len())),
    ];

    for connection in &snapshot.connections {
        lines.push(Line::from(format!(
            "  {:<5} {} {}",
            connection.kind,
            connection.endpoints(),
            connection.state
        )));
    }

    if snapshot.is_degraded() {
        lines.push(Line::from(Span::styled(
            format!("Stale:     {}", snapshot.degraded_fields.join(", ")),
            Style::default().fg(Color::Yellow),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_threads_io_section(frame: &mut Frame, area: Rect, sample: &SampleFrame) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    render_threads_chart(frame, chunks[0], sample);
    render_io_panel(frame, chunks[1], sample);
}

/// User and system CPU time per thread (hundredths of a second), busiest first
fn render_threads_chart(frame: &mut Frame, area: Rect, sample: &SampleFrame) {
    let title = format!(
        " Threads ({}) CPU time: user / system ",
        sample.snapshot.thread_count()
    );
    let block = Block::default().title(title).borders(Borders::ALL);

    if sample.snapshot.threads.is_empty() {
        let empty = Paragraph::new("No per-thread data")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let bar_width: u16 = 3;
    let group_gap: u16 = 2;
    let group_width = bar_width * 2 + 1 + group_gap;
    let max_groups = (area.width.saturating_sub(2) / group_width).max(1) as usize;

    let mut chart = BarChart::default()
        .block(block)
        .bar_width(bar_width)
        .bar_gap(1)
        .group_gap(group_gap);

    for (thread_id, user, system) in thread_bars(&sample.snapshot.threads, max_groups) {
        let bars = [
            Bar::default()
                .value(user)
                .style(Style::default().fg(Color::Green)),
            Bar::default()
                .value(system)
                .style(Style::default().fg(Color::Red)),
        ];
        chart = chart.data(
            BarGroup::default()
                .label(Line::from(thread_id.to_string()))
                .bars(&bars),
        );
    }

    frame.render_widget(chart, area);
}

fn render_io_panel(frame: &mut Frame, area: Rect, sample: &SampleFrame) {
    let block = Block::default().title(" I/O ").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(0)])
        .split(inner);

    let io = &sample.snapshot.io;
    let delta = &sample.delta.io;

    let header = Row::new(vec![
        Cell::from("Counter").style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from("Total").style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from("Δ").style(Style::default().add_modifier(Modifier::BOLD)),
    ]);
    let rows = vec![
        Row::new(vec![
            "read ops".to_string(),
            io.read_count.to_string(),
            delta.read_count.to_string(),
        ]),
        Row::new(vec![
            "write ops".to_string(),
            io.write_count.to_string(),
            delta.write_count.to_string(),
        ]),
        Row::new(vec![
            "other ops".to_string(),
            io.other_count.to_string(),
            delta.other_count.to_string(),
        ]),
        Row::new(vec![
            "read".to_string(),
            format_size(io.read_bytes),
            format_size(delta.read_bytes),
        ]),
        Row::new(vec![
            "write".to_string(),
            format_size(io.write_bytes),
            format_size(delta.write_bytes),
        ]),
        Row::new(vec![
            "other".to_string(),
            format_size(io.other_bytes),
            format_size(delta.other_bytes),
        ]),
    ];
    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(12),
            Constraint::Length(12),
        ],
    )
    .header(header);
    frame.render_widget(table, chunks[0]);

    if chunks[1].height < 3 {
        return;
    }

    let charts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    let history = &sample.history;
    let bytes = combined_increments(&history.read_bytes, &history.write_bytes);
    let ops = combined_increments(&history.read_count, &history.write_count);

    render_interval_chart(frame, charts[0], "Bytes / interval", &bytes, Color::Yellow);
    render_interval_chart(frame, charts[1], "Ops / interval", &ops, Color::Blue);
}

/// Read plus write increments between consecutive history points
fn combined_increments(reads: &[u64], writes: &[u64]) -> Vec<u64> {
    increments(reads)
        .iter()
        .zip(increments(writes).iter())
        .map(|(r, w)| r.saturating_add(*w))
        .collect()
}

fn render_interval_chart(frame: &mut Frame, area: Rect, title: &str, series: &[u64], color: Color) {
    let max_bars = area.width.saturating_sub(2) as usize / 2;
    let data: Vec<(&str, u64)> = tail(series, max_bars).iter().map(|&v| ("", v)).collect();

    let chart = BarChart::default()
        .block(Block::default().title(title.to_string()).borders(Borders::ALL))
        .bar_width(1)
        .bar_gap(1)
        .bar_style(Style::default().fg(color))
        .data(&data);
    frame.render_widget(chart, area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &DashboardApp) {
    let degraded = app
        .frame
        .as_ref()
        .filter(|sample| sample.snapshot.is_degraded())
        .map(|sample| format!(" │ stale: {}", sample.snapshot.degraded_fields.join(",")))
        .unwrap_or_default();

    let (text, color) = if app.finished {
        (
            format!(" Session ended │ q: Quit │ ?: Help{}", degraded),
            Color::Yellow,
        )
    } else {
        (
            format!(" q: Quit │ ?: Help │ t: Tree/details{}", degraded),
            Color::DarkGray,
        )
    };
    let para = Paragraph::new(text).style(Style::default().fg(color));
    frame.render_widget(para, area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let help_text = r#"
    procwatch - Help

    Keyboard Shortcuts:
    ─────────────────────────────────────
    q / Esc     Quit and end the session
    ? / h       Toggle this help screen
    t           Toggle tree / details panel

    Values marked stale are carried over from
    the previous sample after a slow query.
    "#;

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .style(Style::default().bg(Color::DarkGray));

    let paragraph = Paragraph::new(help_text)
        .block(block)
        .alignment(Alignment::Left);

    // Center the help popup
    let popup_area = centered_rect(60, 50, area);
    frame.render_widget(Clear, popup_area);
    frame.render_widget(paragraph, popup_area);
}

/// Helper function to create a centered rect
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
