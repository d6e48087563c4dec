//! Profiling session commands: `run` launches a program, `attach` follows an
//! existing process. Both end with a session report.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use colored::Colorize;

use crate::core::profiler::{ProfilerRuntime, SamplerConfig, SessionOutcome, SessionReport};
use crate::core::Config;
use crate::error::{ErrorKind, ProcwatchError};
use crate::platform::{launch_executable, SysinfoHost, SysinfoProcessHandle};
use crate::ui::dashboard::{run_dashboard, DashboardConfig};

/// How long the JSON printer waits for a frame before re-checking the session
const JSON_POLL: Duration = Duration::from_millis(250);

/// Output options shared by `run` and `attach`
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    pub json: bool,
    pub max_cycles: Option<u64>,
    /// The target was not started by this session
    pub attached: bool,
}

impl SessionOptions {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            json: matches.get_flag("json"),
            max_cycles: matches.get_one::<u64>("cycles").copied(),
            attached: false,
        }
    }

    /// Sampler settings for this session. An attached target is only ever
    /// terminated when the user asked for it with `--terminate`.
    pub fn sampler_config(&self, config: &Config) -> SamplerConfig {
        let mut sampler = config.sampler_config(self.max_cycles);
        if self.attached {
            sampler.terminate_on_failure = config.terminate_on_exit;
        }
        sampler
    }
}

/// Load the config file and apply command-line overrides, then validate.
pub fn resolve_config(matches: &ArgMatches) -> Result<Config> {
    let mut config = Config::load().context("Failed to load configuration")?;
    apply_overrides(&mut config, matches);
    config.validate()?;
    Ok(config)
}

pub fn apply_overrides(config: &mut Config, matches: &ArgMatches) {
    if let Some(interval) = matches.get_one::<f64>("interval") {
        config.interval_secs = *interval;
    }
    if let Some(history) = matches.get_one::<usize>("history") {
        config.history_capacity = *history;
    }
    if let Some(timeout) = matches.get_one::<u64>("timeout-ms") {
        config.query_timeout_ms = *timeout;
    }
    if let Some(max) = matches.get_one::<u32>("max-timeouts") {
        config.max_consecutive_timeouts = *max;
    }
    if let Some(disk) = matches.get_one::<String>("disk") {
        config.disk_path = disk.clone();
    }
    if let Some(width) = matches.get_one::<usize>("bar-width") {
        config.bar_width = *width;
    }
    if matches.get_flag("keep-alive") {
        config.terminate_on_exit = false;
    }
}

/// `procwatch run <EXE> [ARGS..]`
pub fn execute_run(matches: &ArgMatches) -> Result<()> {
    let config = resolve_config(matches)?;
    let options = SessionOptions::from_matches(matches);

    let program = matches
        .get_one::<PathBuf>("program")
        .context("Program argument is required")?;
    let args: Vec<String> = matches
        .get_many::<String>("args")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let pid = launch_executable(program, &args)?;
    profile(pid, &config, options)
}

/// Attached processes are left running unless `--terminate` is given,
/// whatever the config file says.
pub fn apply_attach_policy(config: &mut Config, matches: &ArgMatches) {
    config.terminate_on_exit = matches.get_flag("terminate");
}

/// `procwatch attach <PID>`
pub fn execute_attach(matches: &ArgMatches) -> Result<()> {
    let mut config = resolve_config(matches)?;
    apply_attach_policy(&mut config, matches);
    let options = SessionOptions {
        attached: true,
        ..SessionOptions::from_matches(matches)
    };

    let pid = *matches
        .get_one::<u32>("pid")
        .context("PID argument is required")?;
    profile(pid, &config, options)
}

fn profile(pid: u32, config: &Config, options: SessionOptions) -> Result<()> {
    let handle = match SysinfoProcessHandle::open(pid) {
        Ok(handle) => handle,
        Err(err @ ProcwatchError::ProcessGone { .. }) => {
            // Exited before the first sample: same report as a later exit
            log::info!("Process {} exited before sampling started", pid);
            let report = SessionReport {
                pid,
                cycles: 0,
                outcome: SessionOutcome::Failed {
                    kind: ErrorKind::ProcessGone,
                    message: err.to_string(),
                },
            };
            return finish(&report, options.json);
        }
        Err(err) => {
            return Err(err).with_context(|| format!("Cannot open process {}", pid));
        }
    };
    let host = SysinfoHost::new(&config.disk_path);

    let mut runtime =
        ProfilerRuntime::start(handle, Box::new(host), options.sampler_config(config))?;

    let sink = if options.json {
        run_json_output(&mut runtime)
    } else {
        let dashboard = DashboardConfig {
            interval: config.interval(),
            bar_width: config.bar_width,
        };
        run_dashboard(&mut runtime, dashboard).context("Failed to run dashboard")
    };

    let report = runtime.shutdown()?;
    sink?;

    finish(&report, options.json)
}

/// Print the report; only a failure other than the target exiting is an error.
fn finish(report: &SessionReport, to_stderr: bool) -> Result<()> {
    print_report(report, to_stderr);
    match &report.outcome {
        SessionOutcome::Failed { kind, message }
            if !matches!(kind, ErrorKind::ProcessGone) =>
        {
            bail!("{}", message)
        }
        _ => Ok(()),
    }
}

/// One `SampleFrame` per line on stdout until the session ends or Ctrl-C.
fn run_json_output(runtime: &mut ProfilerRuntime) -> Result<()> {
    let shutdown = runtime.shutdown_handle();
    ctrlc::set_handler(move || {
        let _ = shutdown.send(());
    })
    .context("Failed to install Ctrl-C handler")?;

    let stdout = std::io::stdout();
    loop {
        match runtime.next_frame(JSON_POLL) {
            Some(frame) => {
                let line = serde_json::to_string(&*frame)?;
                let mut out = stdout.lock();
                if writeln!(out, "{}", line).and_then(|_| out.flush()).is_err() {
                    // Reader went away
                    log::info!("stdout closed, stopping session");
                    runtime.request_stop();
                    return Ok(());
                }
            }
            None if runtime.is_finished() => return Ok(()),
            None => {}
        }
    }
}

fn print_report(report: &SessionReport, to_stderr: bool) {
    let summary = match &report.outcome {
        SessionOutcome::Stopped => format!(
            "✓ Session for process {} stopped after {} cycles",
            report.pid, report.cycles
        )
        .green(),
        SessionOutcome::Failed {
            kind: ErrorKind::ProcessGone,
            ..
        } => format!(
            "Process {} exited after {} cycles",
            report.pid, report.cycles
        )
        .yellow(),
        SessionOutcome::Failed { kind, message } => format!(
            "✗ Session for process {} terminated after {} cycles ({}): {}",
            report.pid, report.cycles, kind, message
        )
        .red(),
    };

    // Keep stdout clean for JSON consumers
    if to_stderr {
        eprintln!("{}", summary);
    } else {
        println!("{}", summary);
    }
}
