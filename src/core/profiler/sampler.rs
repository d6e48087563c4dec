//! The sampling cycle driver.
//!
//! One cycle queries the process handle for every per-process field,
//! normalizes priority, rebuilds the process tree, computes the delta
//! against the previous snapshot, appends to the history and hands the
//! result to the consumer as one immutable [`SampleFrame`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::mpsc;

use super::delta::{compute_delta, io_progress, DeltaRecord, IoProgress};
use super::handle::ProcessHandle;
use super::history::{HistorySeries, ProcessHistory};
use super::host::HostSource;
use super::metrics::{HostMetrics, ProcessSnapshot, ProcessRef};
use super::priority::{platform_table, PriorityTable, RawPriority};
use super::process_tree::{assemble_tree, build_process_tree, ProcessTree};
use crate::error::{ErrorKind, ProcwatchError, Result};

/// Settings for one sampling session
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub interval: Duration,
    pub query_timeout: Duration,
    /// Cycles in a row with a timed out query before the session fails.
    pub max_consecutive_timeouts: u32,
    pub history_capacity: usize,
    /// Terminate the target when the session is stopped.
    pub terminate_on_stop: bool,
    /// Terminate the target when sampling fails. Off for processes this
    /// session did not start.
    pub terminate_on_failure: bool,
    /// Stop after this many cycles.
    pub max_cycles: Option<u64>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            query_timeout: Duration::from_secs(2),
            max_consecutive_timeouts: 3,
            history_capacity: super::history::DEFAULT_HISTORY_SIZE,
            terminate_on_stop: true,
            terminate_on_failure: true,
            max_cycles: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    Idle,
    Running,
    Stopped,
    Terminated(ErrorKind),
}

/// Everything produced by one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct SampleFrame {
    pub cycle: u64,
    pub snapshot: ProcessSnapshot,
    pub delta: DeltaRecord,
    pub tree: ProcessTree,
    /// True when the tree query timed out and the previous tree was reused.
    pub tree_stale: bool,
    pub history: HistorySeries,
    pub host: Option<HostMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SessionOutcome {
    Stopped,
    Failed { kind: ErrorKind, message: String },
}

/// Summary returned when a session ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub pid: u32,
    pub cycles: u64,
    pub outcome: SessionOutcome,
}

/// Shared flag that lets exactly one caller terminate the target.
#[derive(Debug, Clone, Default)]
pub struct TerminateGuard(Arc<AtomicBool>);

impl TerminateGuard {
    /// Returns true for the first caller only.
    pub fn claim(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_claimed(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Sampler<H: ProcessHandle + 'static> {
    pid: u32,
    handle: Arc<Mutex<H>>,
    host: Arc<Mutex<Box<dyn HostSource>>>,
    table: &'static dyn PriorityTable,
    config: SamplerConfig,
    state: SamplerState,
    previous: Option<ProcessSnapshot>,
    previous_tree: Option<ProcessTree>,
    history: ProcessHistory,
    consecutive_timeouts: u32,
    cycles: u64,
    terminate_guard: TerminateGuard,
}

impl<H: ProcessHandle + 'static> Sampler<H> {
    pub fn new(handle: H, host: Box<dyn HostSource>, config: SamplerConfig) -> Self {
        Self::with_table(handle, host, config, platform_table())
    }

    pub fn with_table(
        handle: H,
        host: Box<dyn HostSource>,
        config: SamplerConfig,
        table: &'static dyn PriorityTable,
    ) -> Self {
        let history = ProcessHistory::with_capacity(config.history_capacity);
        Self {
            pid: handle.pid(),
            handle: Arc::new(Mutex::new(handle)),
            host: Arc::new(Mutex::new(host)),
            table,
            config,
            state: SamplerState::Idle,
            previous: None,
            previous_tree: None,
            history,
            consecutive_timeouts: 0,
            cycles: 0,
            terminate_guard: TerminateGuard::default(),
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn state(&self) -> SamplerState {
        self.state
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn history(&self) -> &ProcessHistory {
        &self.history
    }

    pub fn terminate_guard(&self) -> TerminateGuard {
        self.terminate_guard.clone()
    }

    /// Forget the previous snapshot and history, back to `Idle`.
    pub fn reset(&mut self) {
        self.previous = None;
        self.previous_tree = None;
        self.history = ProcessHistory::with_capacity(self.config.history_capacity);
        self.consecutive_timeouts = 0;
        self.cycles = 0;
        self.state = SamplerState::Idle;
    }

    /// Run one cycle. A fatal error moves the sampler to `Terminated`,
    /// requests termination of the target and emits nothing.
    pub async fn tick(&mut self) -> Result<Arc<SampleFrame>> {
        match self.state {
            SamplerState::Terminated(_) => return Err(ProcwatchError::ProcessGone { pid: self.pid }),
            SamplerState::Stopped => return Err(ProcwatchError::other("sampler was stopped")),
            SamplerState::Idle => {
                info!("Sampling process {} every {:?}", self.pid, self.config.interval);
                self.state = SamplerState::Running;
            }
            SamplerState::Running => {}
        }

        match self.sample().await {
            Ok(frame) => Ok(frame),
            Err(err) => {
                self.fail(&err).await;
                Err(err)
            }
        }
    }

    async fn sample(&mut self) -> Result<Arc<SampleFrame>> {
        let mut degraded: Vec<&'static str> = Vec::new();
        let previous = self.previous.clone();
        let prev = previous.as_ref();

        let name = self
            .field("name", |h| h.name(), &mut degraded, || {
                prev.map(|p| p.name.clone()).unwrap_or_default()
            })
            .await?;
        let exe_path = self
            .field("exe_path", |h| h.exe_path(), &mut degraded, || {
                prev.and_then(|p| p.exe_path.clone())
            })
            .await?;
        let status = self
            .field("status", |h| h.status(), &mut degraded, || {
                prev.map(|p| p.status).unwrap_or_default()
            })
            .await?;
        let cpu_percent = self
            .field("cpu_percent", |h| h.cpu_percent(), &mut degraded, || {
                prev.map(|p| p.cpu_percent).unwrap_or_default()
            })
            .await?;
        let mem_percent = self
            .field("mem_percent", |h| h.memory_percent(), &mut degraded, || {
                prev.map(|p| p.mem_percent).unwrap_or_default()
            })
            .await?;
        let io = self
            .field("io", |h| h.io_counters(), &mut degraded, || {
                prev.map(|p| p.io).unwrap_or_default()
            })
            .await?;
        let threads = self
            .field("threads", |h| h.threads(), &mut degraded, || {
                prev.map(|p| p.threads.clone()).unwrap_or_default()
            })
            .await?;
        let connections = self
            .field("connections", |h| h.connections(), &mut degraded, || {
                prev.map(|p| p.connections.clone()).unwrap_or_default()
            })
            .await?;
        let raw_priority: Option<RawPriority> = self
            .field("niceness", |h| h.niceness().map(Some), &mut degraded, || None)
            .await?;

        let priority_tier = match raw_priority {
            Some(raw) => self.table.tier(raw),
            None => prev.map(|p| p.priority_tier).unwrap_or_default(),
        };

        let (tree, tree_stale) = match self.query("tree", |h| build_process_tree(h)).await {
            Ok(tree) => (tree, false),
            Err(err) if err.kind() == ErrorKind::QueryTimeout => {
                warn!("Process tree query for {} timed out, reusing last tree", self.pid);
                let tree = self.previous_tree.clone().unwrap_or_else(|| {
                    assemble_tree(ProcessRef::new(self.pid, None, name.clone()), None, &[])
                });
                (tree, true)
            }
            Err(err) => return Err(err),
        };

        if degraded.is_empty() && !tree_stale {
            self.consecutive_timeouts = 0;
        } else {
            self.consecutive_timeouts += 1;
            warn!(
                "Degraded sample for process {} ({} of {} allowed): {:?}",
                self.pid,
                self.consecutive_timeouts,
                self.config.max_consecutive_timeouts,
                degraded
            );
            if self.consecutive_timeouts >= self.config.max_consecutive_timeouts {
                // Later queries queue behind a hung one, so the first
                // timed out field is the one that stalled
                let field = degraded.first().copied().unwrap_or("tree");
                return Err(ProcwatchError::QueryTimeout {
                    pid: self.pid,
                    field,
                });
            }
        }

        if let Some(prev) = prev {
            if io_progress(&prev.io, &io) == IoProgress::Reset {
                warn!(
                    "I/O counters of process {} went backwards, pid no longer names the same process",
                    self.pid
                );
                return Err(ProcwatchError::ProcessGone { pid: self.pid });
            }
        }

        let snapshot = ProcessSnapshot {
            pid: self.pid,
            name,
            exe_path,
            status,
            cpu_percent,
            mem_percent,
            priority_tier,
            io,
            threads,
            connections,
            timestamp: next_timestamp(prev.map(|p| p.timestamp)),
            degraded_fields: degraded.iter().map(|f| f.to_string()).collect(),
        };

        let host = self.read_host().await;
        let delta = compute_delta(prev, &snapshot);

        self.history.append(snapshot.timestamp, snapshot.io);
        self.history
            .push_usage(snapshot.cpu_percent, snapshot.mem_percent);
        self.cycles += 1;

        debug!(
            "Cycle {} for process {}: cpu {:.1}% ({:+.1}), mem {:.2}% ({:+.2})",
            self.cycles,
            self.pid,
            snapshot.cpu_percent,
            delta.cpu_delta,
            snapshot.mem_percent,
            delta.mem_delta
        );

        let frame = Arc::new(SampleFrame {
            cycle: self.cycles,
            snapshot: snapshot.clone(),
            delta,
            tree: tree.clone(),
            tree_stale,
            history: self.history.snapshot(),
            host,
        });

        self.previous = Some(snapshot);
        self.previous_tree = Some(tree);
        Ok(frame)
    }

    /// Drive cycles until stopped, the consumer goes away, or a fatal error.
    pub async fn run(
        mut self,
        frames: mpsc::Sender<Arc<SampleFrame>>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> SessionReport {
        let outcome = loop {
            if stop_requested(&mut shutdown) {
                info!("Stop requested for process {}", self.pid);
                break SessionOutcome::Stopped;
            }
            if let Some(max) = self.config.max_cycles {
                if self.cycles >= max {
                    info!("Completed {} cycles for process {}", self.cycles, self.pid);
                    break SessionOutcome::Stopped;
                }
            }

            match self.tick().await {
                Ok(frame) => {
                    if frames.send(frame).await.is_err() {
                        debug!("Frame consumer closed, stopping");
                        break SessionOutcome::Stopped;
                    }
                }
                Err(err) => {
                    break SessionOutcome::Failed {
                        kind: err.kind(),
                        message: err.to_string(),
                    };
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {}
                _ = shutdown.recv() => {
                    info!("Stop requested for process {}", self.pid);
                    break SessionOutcome::Stopped;
                }
            }
        };

        if outcome == SessionOutcome::Stopped {
            self.state = SamplerState::Stopped;
            if self.config.terminate_on_stop {
                self.terminate_target().await;
            }
        }

        SessionReport {
            pid: self.pid,
            cycles: self.cycles,
            outcome,
        }
    }

    async fn fail(&mut self, err: &ProcwatchError) {
        let kind = err.kind();
        error!("Sampling of process {} failed ({}): {}", self.pid, kind, err);
        self.state = SamplerState::Terminated(kind);
        if self.config.terminate_on_failure {
            self.terminate_target().await;
        }
    }

    /// Best-effort termination, at most once per session.
    async fn terminate_target(&self) {
        if !self.terminate_guard.claim() {
            return;
        }
        info!("Terminating process {}", self.pid);
        if let Err(err) = self.query("terminate", |h| h.terminate()).await {
            warn!("Terminate of process {} failed: {}", self.pid, err);
        }
    }

    /// Query one snapshot field. A timeout degrades the field to `fallback`;
    /// every other error is returned.
    async fn field<T, F, D>(
        &self,
        field: &'static str,
        query: F,
        degraded: &mut Vec<&'static str>,
        fallback: D,
    ) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut H) -> Result<T> + Send + 'static,
        D: FnOnce() -> T,
    {
        match self.query(field, query).await {
            Ok(value) => Ok(value),
            Err(err) if !err.kind().is_fatal() => {
                debug!("{}", err);
                degraded.push(field);
                Ok(fallback())
            }
            Err(err) => Err(err),
        }
    }

    async fn query<T, F>(&self, field: &'static str, query: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut H) -> Result<T> + Send + 'static,
    {
        bounded(
            Arc::clone(&self.handle),
            self.pid,
            field,
            self.config.query_timeout,
            query,
        )
        .await
    }

    async fn read_host(&self) -> Option<HostMetrics> {
        let result = bounded(
            Arc::clone(&self.host),
            self.pid,
            "host",
            self.config.query_timeout,
            |host| host.read(),
        )
        .await;
        match result {
            Ok(metrics) => Some(metrics),
            Err(err) => {
                debug!("Host metrics unavailable this cycle: {}", err);
                None
            }
        }
    }
}

/// Run a blocking OS query on the blocking pool, bounded by `timeout`.
async fn bounded<S, T, F>(
    target: Arc<Mutex<S>>,
    pid: u32,
    field: &'static str,
    timeout: Duration,
    query: F,
) -> Result<T>
where
    S: Send + 'static,
    T: Send + 'static,
    F: FnOnce(&mut S) -> Result<T> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(move || {
        let mut guard = target.lock();
        query(&mut guard)
    });

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(ProcwatchError::other(format!(
            "{} query for process {} panicked: {}",
            field, pid, join_err
        ))),
        Err(_) => Err(ProcwatchError::QueryTimeout { pid, field }),
    }
}

fn stop_requested(shutdown: &mut broadcast::Receiver<()>) -> bool {
    !matches!(shutdown.try_recv(), Err(TryRecvError::Empty))
}

/// Wall clock timestamp, nudged forward if the clock did not advance.
fn next_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if now <= prev => prev + chrono::Duration::microseconds(1),
        _ => now,
    }
}
