use std::fmt;
use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::priority::PriorityTier;

/// Scheduler state of a process as reported by the OS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessStatus {
    Running,
    Sleeping,
    DiskSleep,
    Idle,
    Stopped,
    Tracing,
    Zombie,
    Dead,
    Waking,
    Parked,
    Locked,
    #[default]
    Unknown,
}

impl ProcessStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ProcessStatus::Running => "running",
            ProcessStatus::Sleeping => "sleeping",
            ProcessStatus::DiskSleep => "disk-sleep",
            ProcessStatus::Idle => "idle",
            ProcessStatus::Stopped => "stopped",
            ProcessStatus::Tracing => "tracing-stop",
            ProcessStatus::Zombie => "zombie",
            ProcessStatus::Dead => "dead",
            ProcessStatus::Waking => "waking",
            ProcessStatus::Parked => "parked",
            ProcessStatus::Locked => "locked",
            ProcessStatus::Unknown => "unknown",
        }
    }
}

/// Cumulative I/O counters since process start.
///
/// `other_*` are only populated on platforms that account non read/write
/// operations separately (Windows); elsewhere they stay at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoCounters {
    pub read_count: u64,
    pub write_count: u64,
    pub other_count: u64,
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub other_bytes: u64,
}

impl IoCounters {
    /// True if every counter is at least the matching counter in `earlier`.
    pub fn is_monotonic_from(&self, earlier: &IoCounters) -> bool {
        self.read_count >= earlier.read_count
            && self.write_count >= earlier.write_count
            && self.other_count >= earlier.other_count
            && self.read_bytes >= earlier.read_bytes
            && self.write_bytes >= earlier.write_bytes
            && self.other_bytes >= earlier.other_bytes
    }
}

/// CPU time consumed by one OS thread, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadStat {
    pub thread_id: u64,
    pub user_time: f64,
    pub system_time: f64,
}

impl ThreadStat {
    pub fn total_time(&self) -> f64 {
        self.user_time + self.system_time
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SocketKind {
    Tcp,
    Tcp6,
    Udp,
    Udp6,
}

impl fmt::Display for SocketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SocketKind::Tcp => "tcp",
            SocketKind::Tcp6 => "tcp6",
            SocketKind::Udp => "udp",
            SocketKind::Udp6 => "udp6",
        };
        f.write_str(label)
    }
}

/// An open internet socket owned by the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub kind: SocketKind,
    pub local_addr: SocketAddr,
    /// `None` for sockets without a peer (listening or unconnected).
    pub remote_addr: Option<SocketAddr>,
    /// TCP state such as `ESTABLISHED` or `LISTEN`; `NONE` for UDP.
    pub state: String,
}

impl Connection {
    /// An all-zero peer address means no peer.
    pub fn new(
        kind: SocketKind,
        local_addr: SocketAddr,
        remote_addr: SocketAddr,
        state: impl Into<String>,
    ) -> Self {
        let no_peer = remote_addr.ip().is_unspecified() && remote_addr.port() == 0;
        let remote_addr = (!no_peer).then_some(remote_addr);
        Self {
            kind,
            local_addr,
            remote_addr,
            state: state.into(),
        }
    }

    /// `laddr -> raddr`, or just `laddr` when there is no peer.
    pub fn endpoints(&self) -> String {
        match self.remote_addr {
            Some(remote) => format!("{} -> {}", self.local_addr, remote),
            None => self.local_addr.to_string(),
        }
    }
}

/// Per-process fields read during one cycle.
///
/// Fields skipped because their query timed out are listed in
/// `degraded_fields`; they carry the previous cycle's value (or the default
/// on the first cycle).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub name: String,
    pub exe_path: Option<String>,
    pub status: ProcessStatus,
    pub cpu_percent: f32,
    pub mem_percent: f32,
    pub priority_tier: PriorityTier,
    pub io: IoCounters,
    pub threads: Vec<ThreadStat>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded_fields: Vec<String>,
}

impl ProcessSnapshot {
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    pub fn is_degraded(&self) -> bool {
        !self.degraded_fields.is_empty()
    }
}

/// Lightweight identity of a related process (parent or descendant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRef {
    pub pid: u32,
    pub parent_pid: Option<u32>,
    pub name: String,
}

impl ProcessRef {
    pub fn new(pid: u32, parent_pid: Option<u32>, name: impl Into<String>) -> Self {
        Self {
            pid,
            parent_pid,
            name: name.into(),
        }
    }
}

/// Machine-wide counters read once per cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostMetrics {
    pub cpu_frequency_hz: u64,
    pub memory_total_bytes: u64,
    pub memory_used_bytes: u64,
    pub disk: Option<DiskUsage>,
    /// Cumulative since boot, summed over all interfaces.
    pub network_bytes_sent: u64,
    /// Cumulative since boot, summed over all interfaces.
    pub network_bytes_received: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskUsage {
    pub mount_point: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
}
