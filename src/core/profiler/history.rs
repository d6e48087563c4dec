use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::metrics::IoCounters;

pub const DEFAULT_HISTORY_SIZE: usize = 1000;

/// Bounded time series for charting.
///
/// The six I/O series share one timestamp axis and always have equal
/// length. CPU and memory percentages are kept under the same cap. Once
/// `capacity` points are held, each append evicts the oldest.
#[derive(Debug, Clone)]
pub struct ProcessHistory {
    capacity: usize,
    timestamps: VecDeque<DateTime<Utc>>,
    read_count: VecDeque<u64>,
    write_count: VecDeque<u64>,
    other_count: VecDeque<u64>,
    read_bytes: VecDeque<u64>,
    write_bytes: VecDeque<u64>,
    other_bytes: VecDeque<u64>,
    cpu_percent: VecDeque<f32>,
    mem_percent: VecDeque<f32>,
}

/// Owned copy of every series at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistorySeries {
    pub timestamps: Vec<DateTime<Utc>>,
    pub read_count: Vec<u64>,
    pub write_count: Vec<u64>,
    pub other_count: Vec<u64>,
    pub read_bytes: Vec<u64>,
    pub write_bytes: Vec<u64>,
    pub other_bytes: Vec<u64>,
    pub cpu_percent: Vec<f32>,
    pub mem_percent: Vec<f32>,
}

impl HistorySeries {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// CPU series for the sparkline widget, scaled by 10 to keep one decimal.
    pub fn cpu_as_u64(&self) -> Vec<u64> {
        scaled(&self.cpu_percent)
    }

    /// Memory series for the sparkline widget, scaled by 10 to keep one decimal.
    pub fn memory_as_u64(&self) -> Vec<u64> {
        scaled(&self.mem_percent)
    }
}

fn scaled(values: &[f32]) -> Vec<u64> {
    values.iter().map(|&v| (v.max(0.0) * 10.0) as u64).collect()
}

impl ProcessHistory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_SIZE)
    }

    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            timestamps: VecDeque::with_capacity(capacity),
            read_count: VecDeque::with_capacity(capacity),
            write_count: VecDeque::with_capacity(capacity),
            other_count: VecDeque::with_capacity(capacity),
            read_bytes: VecDeque::with_capacity(capacity),
            write_bytes: VecDeque::with_capacity(capacity),
            other_bytes: VecDeque::with_capacity(capacity),
            cpu_percent: VecDeque::with_capacity(capacity),
            mem_percent: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Append one I/O sample. Points are kept in call order.
    pub fn append(&mut self, timestamp: DateTime<Utc>, io: IoCounters) {
        let capacity = self.capacity;
        Self::push_value(&mut self.timestamps, timestamp, capacity);
        Self::push_value(&mut self.read_count, io.read_count, capacity);
        Self::push_value(&mut self.write_count, io.write_count, capacity);
        Self::push_value(&mut self.other_count, io.other_count, capacity);
        Self::push_value(&mut self.read_bytes, io.read_bytes, capacity);
        Self::push_value(&mut self.write_bytes, io.write_bytes, capacity);
        Self::push_value(&mut self.other_bytes, io.other_bytes, capacity);
    }

    pub fn push_usage(&mut self, cpu_percent: f32, mem_percent: f32) {
        let capacity = self.capacity;
        Self::push_value(&mut self.cpu_percent, cpu_percent, capacity);
        Self::push_value(&mut self.mem_percent, mem_percent, capacity);
    }

    fn push_value<T>(queue: &mut VecDeque<T>, value: T, capacity: usize) {
        if queue.len() >= capacity {
            queue.pop_front();
        }
        queue.push_back(value);
    }

    pub fn snapshot(&self) -> HistorySeries {
        HistorySeries {
            timestamps: self.timestamps.iter().copied().collect(),
            read_count: self.read_count.iter().copied().collect(),
            write_count: self.write_count.iter().copied().collect(),
            other_count: self.other_count.iter().copied().collect(),
            read_bytes: self.read_bytes.iter().copied().collect(),
            write_bytes: self.write_bytes.iter().copied().collect(),
            other_bytes: self.other_bytes.iter().copied().collect(),
            cpu_percent: self.cpu_percent.iter().copied().collect(),
            mem_percent: self.mem_percent.iter().copied().collect(),
        }
    }
}

impl Default for ProcessHistory {
    fn default() -> Self {
        Self::new()
    }
}
