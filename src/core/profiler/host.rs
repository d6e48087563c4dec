use super::metrics::HostMetrics;
use crate::error::Result;

/// Source of machine-wide metrics.
///
/// Read once per sampling cycle. Values are point-in-time readings; network
/// byte counts are cumulative since boot, not per-interval rates.
/// Implementations are provided in the platform layer.
pub trait HostSource: Send {
    fn read(&mut self) -> Result<HostMetrics>;
}

/// Always reports the same metrics. Stands in for the real host in tests
/// driven by a scripted process handle.
#[derive(Debug, Clone, Default)]
pub struct StaticHost(pub HostMetrics);

impl HostSource for StaticHost {
    fn read(&mut self) -> Result<HostMetrics> {
        Ok(self.0.clone())
    }
}
