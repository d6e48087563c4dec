use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::core::profiler::{ProfilerRuntime, SampleFrame};

use super::event_handler::{map_key, DashboardEvent};
use super::render::render_ui;

/// How often input is polled between frames
const INPUT_POLL: Duration = Duration::from_millis(100);

/// Dashboard application state
pub struct DashboardApp {
    pub pid: u32,
    /// Latest frame; its history carries every cycle, including frames
    /// skipped between redraws
    pub frame: Option<Arc<SampleFrame>>,
    pub should_quit: bool,
    pub show_help: bool,
    /// Side panel shows the process tree when true, details otherwise
    pub show_tree: bool,
    /// Sampler ended; the last frame stays on screen
    pub finished: bool,
    pub bar_width: usize,
    pub interval: Duration,
}

impl DashboardApp {
    pub fn new(pid: u32, config: &DashboardConfig) -> Self {
        Self {
            pid,
            frame: None,
            should_quit: false,
            show_help: false,
            show_tree: true,
            finished: false,
            bar_width: config.bar_width,
            interval: config.interval,
        }
    }

    pub fn apply_frame(&mut self, frame: Arc<SampleFrame>) {
        self.frame = Some(frame);
    }

    pub fn handle_event(&mut self, event: DashboardEvent) {
        match event {
            DashboardEvent::Quit => self.should_quit = true,
            DashboardEvent::ToggleHelp => self.show_help = !self.show_help,
            DashboardEvent::TogglePanel => self.show_tree = !self.show_tree,
            DashboardEvent::None => {}
        }
    }
}

/// Configuration for the dashboard
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub interval: Duration,
    pub bar_width: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            bar_width: 50,
        }
    }
}

/// Run the dashboard until the user quits. The session itself is shut down
/// by the caller.
pub fn run_dashboard(runtime: &mut ProfilerRuntime, config: DashboardConfig) -> Result<()> {
    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let mut app = DashboardApp::new(runtime.pid(), &config);
    let result = event_loop(&mut terminal, &mut app, runtime);

    // Restore terminal even when the loop failed
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut DashboardApp,
    runtime: &mut ProfilerRuntime,
) -> Result<()> {
    loop {
        if let Some(frame) = runtime.latest_frame() {
            app.apply_frame(frame);
        } else if !app.finished && runtime.is_finished() {
            log::info!("Sampler for process {} finished", app.pid);
            app.finished = true;
        }

        terminal.draw(|frame| render_ui(frame, app))?;

        if event::poll(INPUT_POLL).context("Event poll failed")? {
            if let Event::Key(key) = event::read().context("Event read failed")? {
                if key.kind == KeyEventKind::Press {
                    app.handle_event(map_key(key.code));
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
