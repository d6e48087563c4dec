use super::metrics::{Connection, IoCounters, ProcessRef, ProcessStatus, ThreadStat};
use super::priority::RawPriority;
use crate::error::Result;

/// Read-only view of one live OS process.
///
/// Every accessor fails with `ProcessGone` once the pid no longer resolves
/// to the process the handle was opened for, and keeps failing afterwards,
/// even if the OS hands the pid to a new process. `AccessDenied` is returned
/// when the caller lacks permission for a query.
///
/// Implementations live in the platform layer.
pub trait ProcessHandle: Send {
    fn pid(&self) -> u32;

    fn name(&mut self) -> Result<String>;

    fn exe_path(&mut self) -> Result<Option<String>>;

    fn status(&mut self) -> Result<ProcessStatus>;

    /// Percent of one core used since the previous call. The first call
    /// after the handle is opened has no baseline and is not meaningful.
    fn cpu_percent(&mut self) -> Result<f32>;

    /// Resident memory as a percent of total system memory.
    fn memory_percent(&mut self) -> Result<f32>;

    fn io_counters(&mut self) -> Result<IoCounters>;

    /// One entry per live thread, in OS order.
    fn threads(&mut self) -> Result<Vec<ThreadStat>>;

    fn niceness(&mut self) -> Result<RawPriority>;

    /// Internet sockets the process holds open. Sockets closed during the
    /// lookup are left out.
    fn connections(&mut self) -> Result<Vec<Connection>>;

    fn parent(&mut self) -> Result<Option<ProcessRef>>;

    /// Direct children, or every descendant when `recursive` is set.
    /// Processes that exit during enumeration are left out.
    fn children(&mut self, recursive: bool) -> Result<Vec<ProcessRef>>;

    /// Ask the OS to end the process. Returns before the process has
    /// necessarily exited. Calling it on a gone process is not an error.
    fn terminate(&mut self) -> Result<()>;
}
