use chrono::{Duration, TimeZone, Utc};
use procwatch::core::profiler::{IoCounters, ProcessHistory};

fn io(n: u64) -> IoCounters {
    IoCounters {
        read_count: n,
        write_count: n * 2,
        other_count: 0,
        read_bytes: n * 100,
        write_bytes: n * 200,
        other_bytes: 0,
    }
}

#[test]
fn test_history_evicts_oldest_at_capacity() {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut history = ProcessHistory::with_capacity(3);

    for i in 0..5u64 {
        history.append(start + Duration::seconds(i as i64), io(i));
    }

    let series = history.snapshot();
    assert_eq!(series.len(), 3);
    assert_eq!(series.read_count, vec![2, 3, 4]);
    assert_eq!(series.write_bytes, vec![400, 600, 800]);
    assert_eq!(series.timestamps[0], start + Duration::seconds(2));
    assert_eq!(series.other_bytes.len(), 3);
}

#[test]
fn test_usage_series_share_capacity() {
    let mut history = ProcessHistory::with_capacity(2);
    history.push_usage(10.0, 1.0);
    history.push_usage(20.0, 2.0);
    history.push_usage(30.0, 3.0);

    let series = history.snapshot();
    assert_eq!(series.cpu_percent, vec![20.0, 30.0]);
    assert_eq!(series.cpu_as_u64(), vec![200, 300]);
    assert_eq!(series.memory_as_u64(), vec![20, 30]);
}

#[test]
fn test_snapshot_is_independent_copy() {
    let mut history = ProcessHistory::with_capacity(10);
    history.append(Utc::now(), io(1));
    let before = history.snapshot();
    history.append(Utc::now(), io(2));

    assert_eq!(before.len(), 1);
    assert_eq!(history.snapshot().len(), 2);
}
