//! Tokio runtime hosting one sampling session.
//!
//! The sampler runs on its own small runtime so the caller (the dashboard or
//! the JSON printer) can stay synchronous and simply pull frames.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use super::handle::ProcessHandle;
use super::host::HostSource;
use super::sampler::{SampleFrame, Sampler, SamplerConfig, SessionReport};
use crate::error::{ProcwatchError, Result};

const FRAME_BUFFER: usize = 64;

/// A running sampling session.
pub struct ProfilerRuntime {
    pid: u32,
    frames_rx: mpsc::Receiver<Arc<SampleFrame>>,

    /// Shutdown signal sender
    shutdown_tx: broadcast::Sender<()>,

    session: Option<JoinHandle<SessionReport>>,

    /// Upper bound on how long teardown waits for queries still blocked in
    /// the OS
    query_timeout: Duration,

    runtime: tokio::runtime::Runtime,
}

impl ProfilerRuntime {
    /// Spawn the sampler for `handle` on a fresh runtime.
    pub fn start<H: ProcessHandle + 'static>(
        handle: H,
        host: Box<dyn HostSource>,
        config: SamplerConfig,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .thread_name("procwatch-sampler")
            .build()?;

        let (frames_tx, frames_rx) = mpsc::channel(FRAME_BUFFER);
        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

        let query_timeout = config.query_timeout;
        let sampler = Sampler::new(handle, host, config);
        let pid = sampler.pid();
        let session = runtime.spawn(sampler.run(frames_tx, shutdown_rx));

        log::info!("Sampling session started for process {}", pid);

        Ok(Self {
            pid,
            frames_rx,
            shutdown_tx,
            session: Some(session),
            query_timeout,
            runtime,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Ask the sampler to stop at the top of its next cycle.
    pub fn request_stop(&self) {
        // send() only fails if the sampler already ended
        let _ = self.shutdown_tx.send(());
    }

    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.session
            .as_ref()
            .map(|session| session.is_finished())
            .unwrap_or(true)
    }

    /// Most recent frame received since the last call, if any.
    pub fn latest_frame(&mut self) -> Option<Arc<SampleFrame>> {
        let mut latest = None;
        while let Ok(frame) = self.frames_rx.try_recv() {
            latest = Some(frame);
        }
        latest
    }

    /// Wait up to `timeout` for the next frame. `None` on timeout or once
    /// the session has ended and every frame was consumed.
    pub fn next_frame(&mut self, timeout: Duration) -> Option<Arc<SampleFrame>> {
        let frames_rx = &mut self.frames_rx;
        self.runtime
            .block_on(async { tokio::time::timeout(timeout, frames_rx.recv()).await })
            .ok()
            .flatten()
    }

    /// Stop the session and wait for its report.
    ///
    /// Queries that timed out may still be blocked on the OS; they get at
    /// most one more query timeout before the runtime is abandoned.
    pub fn shutdown(mut self) -> Result<SessionReport> {
        self.request_stop();
        let joined = match self.session.take() {
            Some(session) => self
                .runtime
                .block_on(session)
                .map_err(|err| ProcwatchError::other(format!("sampler task failed: {}", err))),
            None => Err(ProcwatchError::other("session already joined")),
        };
        self.runtime.shutdown_timeout(self.query_timeout);

        let report = joined?;
        log::info!(
            "Sampling session for process {} ended after {} cycles",
            report.pid,
            report.cycles
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::profiler::fake::{FakeProcess, FakeSample};
    use crate::core::profiler::host::StaticHost;
    use crate::core::profiler::sampler::SessionOutcome;

    #[test]
    fn test_runtime_delivers_frames_and_stops() {
        let fake = FakeProcess::new(77, "app").with_samples(vec![FakeSample::default(); 100]);
        let terminations = fake.terminations();
        let config = SamplerConfig {
            interval: Duration::from_millis(10),
            ..Default::default()
        };
        let mut runtime =
            ProfilerRuntime::start(fake, Box::new(StaticHost::default()), config).unwrap();

        let frame = runtime
            .next_frame(Duration::from_secs(5))
            .expect("first frame");
        assert_eq!(frame.snapshot.pid, 77);
        assert_eq!(frame.cycle, 1);

        let report = runtime.shutdown().unwrap();
        assert_eq!(report.pid, 77);
        assert_eq!(report.outcome, SessionOutcome::Stopped);
        assert_eq!(terminations.count(), 1);
    }

    #[test]
    fn test_shutdown_does_not_wait_for_hung_query() {
        let fake = FakeProcess::new(79, "stuck")
            .with_samples(vec![FakeSample::default(); 10])
            .with_delay("threads", Duration::from_secs(3), 1);
        let config = SamplerConfig {
            interval: Duration::from_millis(5),
            query_timeout: Duration::from_millis(50),
            max_consecutive_timeouts: 1,
            ..Default::default()
        };
        let runtime =
            ProfilerRuntime::start(fake, Box::new(StaticHost::default()), config).unwrap();

        let started = std::time::Instant::now();
        while !runtime.is_finished() && started.elapsed() < Duration::from_secs(2) {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(runtime.is_finished());

        let closing = std::time::Instant::now();
        let report = runtime.shutdown().unwrap();
        assert!(closing.elapsed() < Duration::from_secs(1));
        assert!(matches!(
            report.outcome,
            SessionOutcome::Failed {
                kind: crate::error::ErrorKind::QueryTimeout,
                ..
            }
        ));
    }

    #[test]
    fn test_runtime_reports_exited_target() {
        let fake = FakeProcess::exited(78);
        let mut runtime = ProfilerRuntime::start(
            fake,
            Box::new(StaticHost::default()),
            SamplerConfig::default(),
        )
        .unwrap();

        assert!(runtime.next_frame(Duration::from_secs(5)).is_none());
        let report = runtime.shutdown().unwrap();
        assert_eq!(report.cycles, 0);
        assert!(matches!(report.outcome, SessionOutcome::Failed { .. }));
    }
}
