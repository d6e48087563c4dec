//! Process profiling core.
//!
//! Samples one target process on a fixed cadence, normalizes what the OS
//! reports into stable records, tracks deltas between samples and keeps a
//! bounded history for charting.

mod delta;
#[doc(hidden)]
pub mod fake;
mod handle;
mod history;
mod host;
mod metrics;
pub mod priority;
pub mod process_tree;
mod runtime;
mod sampler;

pub use delta::{compute_delta, io_progress, DeltaRecord, IoProgress};
pub use handle::ProcessHandle;
pub use history::{HistorySeries, ProcessHistory, DEFAULT_HISTORY_SIZE};
pub use host::{HostSource, StaticHost};
pub use metrics::{
    Connection, DiskUsage, HostMetrics, IoCounters, ProcessRef, ProcessSnapshot, ProcessStatus,
    SocketKind, ThreadStat,
};
pub use priority::{platform_table, PriorityTable, PriorityTier, RawPriority};
pub use process_tree::{
    assemble_tree, build_process_tree, flatten_tree, format_tree_indent, FlattenedProcess,
    NodeRole, ProcessTree, ProcessTreeNode,
};
pub use runtime::ProfilerRuntime;
pub use sampler::{
    SampleFrame, Sampler, SamplerConfig, SamplerState, SessionOutcome, SessionReport,
    TerminateGuard,
};
