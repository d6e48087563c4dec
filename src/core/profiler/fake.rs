//! Scripted in-memory process handle for tests.
//!
//! Public so integration tests can drive a session without a real process;
//! nothing in the binary uses it.
//!
//! Each call to `cpu_percent` advances to the next scripted sample; once the
//! script runs out the process behaves as exited.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::handle::ProcessHandle;
use super::metrics::{Connection, IoCounters, ProcessRef, ProcessStatus, ThreadStat};
use super::priority::RawPriority;
use crate::error::{ProcwatchError, Result};

/// Values returned for one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct FakeSample {
    pub cpu_percent: f32,
    pub mem_percent: f32,
    pub status: ProcessStatus,
    pub io: IoCounters,
    pub threads: Vec<ThreadStat>,
    pub connections: Vec<Connection>,
    pub nice: RawPriority,
}

impl Default for FakeSample {
    fn default() -> Self {
        Self {
            cpu_percent: 0.0,
            mem_percent: 0.0,
            status: ProcessStatus::Running,
            io: IoCounters::default(),
            threads: Vec::new(),
            connections: Vec::new(),
            nice: RawPriority::Nice(0),
        }
    }
}

/// Counts `terminate` calls across clones.
#[derive(Debug, Clone, Default)]
pub struct TerminationCounter(Arc<AtomicUsize>);

impl TerminationCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

struct FakeDelay {
    delay: Duration,
    remaining: usize,
}

pub struct FakeProcess {
    pid: u32,
    name: String,
    exe_path: Option<String>,
    parent: Option<ProcessRef>,
    descendants: Vec<ProcessRef>,
    script: VecDeque<FakeSample>,
    current: FakeSample,
    gone: bool,
    denied: Vec<&'static str>,
    delays: HashMap<&'static str, FakeDelay>,
    terminations: TerminationCounter,
}

impl FakeProcess {
    pub fn new(pid: u32, name: &str) -> Self {
        Self {
            pid,
            name: name.to_string(),
            exe_path: Some(format!("/usr/bin/{}", name)),
            parent: None,
            descendants: Vec::new(),
            script: VecDeque::new(),
            current: FakeSample::default(),
            gone: false,
            denied: Vec::new(),
            delays: HashMap::new(),
            terminations: TerminationCounter::default(),
        }
    }

    /// A handle whose process exited before the first read.
    pub fn exited(pid: u32) -> Self {
        let mut fake = Self::new(pid, "exited");
        fake.gone = true;
        fake
    }

    pub fn with_samples(mut self, samples: Vec<FakeSample>) -> Self {
        self.script = samples.into();
        self
    }

    pub fn with_parent(mut self, parent: ProcessRef) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_descendants(mut self, descendants: Vec<ProcessRef>) -> Self {
        self.descendants = descendants;
        self
    }

    /// Fail `field` with `AccessDenied`.
    pub fn deny(mut self, field: &'static str) -> Self {
        self.denied.push(field);
        self
    }

    /// Block the next `times` queries of `field` for `delay`.
    pub fn with_delay(mut self, field: &'static str, delay: Duration, times: usize) -> Self {
        self.delays.insert(
            field,
            FakeDelay {
                delay,
                remaining: times,
            },
        );
        self
    }

    pub fn terminations(&self) -> TerminationCounter {
        self.terminations.clone()
    }

    fn enter(&mut self, field: &'static str) -> Result<()> {
        if let Some(entry) = self.delays.get_mut(field) {
            if entry.remaining > 0 {
                entry.remaining -= 1;
                std::thread::sleep(entry.delay);
            }
        }
        if self.gone {
            return Err(ProcwatchError::ProcessGone { pid: self.pid });
        }
        if self.denied.contains(&field) {
            return Err(ProcwatchError::access_denied(self.pid, field));
        }
        Ok(())
    }
}

impl ProcessHandle for FakeProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn name(&mut self) -> Result<String> {
        self.enter("name")?;
        Ok(self.name.clone())
    }

    fn exe_path(&mut self) -> Result<Option<String>> {
        self.enter("exe_path")?;
        Ok(self.exe_path.clone())
    }

    fn status(&mut self) -> Result<ProcessStatus> {
        self.enter("status")?;
        Ok(self.current.status)
    }

    fn cpu_percent(&mut self) -> Result<f32> {
        self.enter("cpu_percent")?;
        match self.script.pop_front() {
            Some(sample) => {
                self.current = sample;
                Ok(self.current.cpu_percent)
            }
            None => {
                self.gone = true;
                Err(ProcwatchError::ProcessGone { pid: self.pid })
            }
        }
    }

    fn memory_percent(&mut self) -> Result<f32> {
        self.enter("mem_percent")?;
        Ok(self.current.mem_percent)
    }

    fn io_counters(&mut self) -> Result<IoCounters> {
        self.enter("io")?;
        Ok(self.current.io)
    }

    fn threads(&mut self) -> Result<Vec<ThreadStat>> {
        self.enter("threads")?;
        Ok(self.current.threads.clone())
    }

    fn niceness(&mut self) -> Result<RawPriority> {
        self.enter("niceness")?;
        Ok(self.current.nice)
    }

    fn connections(&mut self) -> Result<Vec<Connection>> {
        self.enter("connections")?;
        Ok(self.current.connections.clone())
    }

    fn parent(&mut self) -> Result<Option<ProcessRef>> {
        self.enter("parent")?;
        Ok(self.parent.clone())
    }

    fn children(&mut self, recursive: bool) -> Result<Vec<ProcessRef>> {
        self.enter("children")?;
        let pid = self.pid;
        Ok(self
            .descendants
            .iter()
            .filter(|p| recursive || p.parent_pid == Some(pid))
            .cloned()
            .collect())
    }

    fn terminate(&mut self) -> Result<()> {
        self.terminations.0.fetch_add(1, Ordering::SeqCst);
        self.gone = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_advances_on_cpu_read() {
        let mut fake = FakeProcess::new(5, "app").with_samples(vec![
            FakeSample {
                cpu_percent: 1.0,
                ..Default::default()
            },
            FakeSample {
                cpu_percent: 2.0,
                ..Default::default()
            },
        ]);

        assert_eq!(fake.cpu_percent().unwrap(), 1.0);
        assert_eq!(fake.cpu_percent().unwrap(), 2.0);
        assert!(matches!(
            fake.cpu_percent(),
            Err(ProcwatchError::ProcessGone { pid: 5 })
        ));
        // stays gone
        assert!(fake.name().is_err());
    }

    #[test]
    fn test_children_filter() {
        let mut fake = FakeProcess::new(5, "app").with_descendants(vec![
            ProcessRef::new(6, Some(5), "child"),
            ProcessRef::new(7, Some(6), "grandchild"),
        ]);
        assert_eq!(fake.children(false).unwrap().len(), 1);
        assert_eq!(fake.children(true).unwrap().len(), 2);
    }

    #[test]
    fn test_terminate_is_counted_and_idempotent() {
        let mut fake = FakeProcess::new(5, "app");
        let counter = fake.terminations();
        fake.terminate().unwrap();
        fake.terminate().unwrap();
        assert_eq!(counter.count(), 2);
        assert!(fake.status().is_err());
    }
}
