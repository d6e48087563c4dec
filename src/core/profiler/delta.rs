use serde::{Deserialize, Serialize};

use super::metrics::{IoCounters, ProcessSnapshot};

/// Change between two consecutive snapshots of the same process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeltaRecord {
    pub cpu_delta: f32,
    pub mem_delta: f32,
    /// Per-interval I/O growth. Zero on the first cycle.
    pub io: IoCounters,
}

/// Outcome of comparing I/O counters across two cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoProgress {
    Advanced(IoCounters),
    /// A counter went backwards: the pid now names a different process.
    Reset,
}

/// Delta of `current` against the snapshot immediately before it. With no
/// previous snapshot every field is zero.
pub fn compute_delta(previous: Option<&ProcessSnapshot>, current: &ProcessSnapshot) -> DeltaRecord {
    let Some(previous) = previous else {
        return DeltaRecord::default();
    };

    let io = match io_progress(&previous.io, &current.io) {
        IoProgress::Advanced(io) => io,
        IoProgress::Reset => IoCounters::default(),
    };

    DeltaRecord {
        cpu_delta: current.cpu_percent - previous.cpu_percent,
        mem_delta: current.mem_percent - previous.mem_percent,
        io,
    }
}

pub fn io_progress(previous: &IoCounters, current: &IoCounters) -> IoProgress {
    if !current.is_monotonic_from(previous) {
        return IoProgress::Reset;
    }
    IoProgress::Advanced(IoCounters {
        read_count: current.read_count - previous.read_count,
        write_count: current.write_count - previous.write_count,
        other_count: current.other_count - previous.other_count,
        read_bytes: current.read_bytes - previous.read_bytes,
        write_bytes: current.write_bytes - previous.write_bytes,
        other_bytes: current.other_bytes - previous.other_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(cpu: f32, mem: f32, read_bytes: u64) -> ProcessSnapshot {
        ProcessSnapshot {
            pid: 1,
            cpu_percent: cpu,
            mem_percent: mem,
            io: IoCounters {
                read_bytes,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_first_cycle_is_zero() {
        let delta = compute_delta(None, &snapshot(87.5, 12.0, 4096));
        assert_eq!(delta, DeltaRecord::default());
    }

    #[test]
    fn test_delta_against_previous() {
        let previous = snapshot(10.0, 2.5, 100);
        let current = snapshot(25.0, 2.0, 160);
        let delta = compute_delta(Some(&previous), &current);

        assert!((delta.cpu_delta - 15.0).abs() < f32::EPSILON);
        assert!((delta.mem_delta + 0.5).abs() < f32::EPSILON);
        assert_eq!(delta.io.read_bytes, 60);
    }

    #[test]
    fn test_counter_decrease_is_reset_not_negative() {
        let previous = snapshot(0.0, 0.0, 500);
        let current = snapshot(0.0, 0.0, 20);

        assert_eq!(io_progress(&previous.io, &current.io), IoProgress::Reset);
        let delta = compute_delta(Some(&previous), &current);
        assert_eq!(delta.io, IoCounters::default());
    }
}
