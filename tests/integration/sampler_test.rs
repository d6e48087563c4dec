use std::sync::Arc;
use std::time::Duration;

use procwatch::core::profiler::fake::{FakeProcess, FakeSample};
use procwatch::core::profiler::priority::UnixNiceTable;
use procwatch::core::profiler::{
    Connection, IoCounters, ProcessRef, ProfilerRuntime, RawPriority, SampleFrame, Sampler,
    SamplerConfig, SessionOutcome, SocketKind, StaticHost,
};
use procwatch::ErrorKind;
use tokio::sync::{broadcast, mpsc};

fn config(max_cycles: Option<u64>) -> SamplerConfig {
    SamplerConfig {
        interval: Duration::from_millis(5),
        query_timeout: Duration::from_millis(500),
        max_consecutive_timeouts: 3,
        history_capacity: 100,
        terminate_on_stop: true,
        terminate_on_failure: true,
        max_cycles,
    }
}

fn ramp(cycles: u64) -> Vec<FakeSample> {
    (0..cycles)
        .map(|i| FakeSample {
            cpu_percent: 10.0 + i as f32,
            mem_percent: 5.0,
            io: IoCounters {
                read_count: i,
                read_bytes: i * 4096,
                ..Default::default()
            },
            nice: RawPriority::Nice(5),
            ..Default::default()
        })
        .collect()
}

async fn collect(
    sampler: Sampler<FakeProcess>,
) -> (procwatch::core::profiler::SessionReport, Vec<Arc<SampleFrame>>) {
    let (frames_tx, mut frames_rx) = mpsc::channel(64);
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let report = sampler.run(frames_tx, shutdown_rx).await;

    let mut frames = Vec::new();
    while let Ok(frame) = frames_rx.try_recv() {
        frames.push(frame);
    }
    (report, frames)
}

#[tokio::test]
async fn test_session_of_five_cycles_with_tree() {
    let fake = FakeProcess::new(100, "server")
        .with_samples(ramp(5))
        .with_parent(ProcessRef::new(1, None, "init"))
        .with_descendants(vec![
            ProcessRef::new(101, Some(100), "worker-a"),
            ProcessRef::new(102, Some(100), "worker-b"),
        ]);
    let terminations = fake.terminations();
    let sampler = Sampler::with_table(
        fake,
        Box::new(StaticHost::default()),
        config(Some(5)),
        &UnixNiceTable,
    );

    let (report, frames) = collect(sampler).await;

    assert_eq!(report.outcome, SessionOutcome::Stopped);
    assert_eq!(report.cycles, 5);
    assert_eq!(frames.len(), 5);

    assert_eq!(frames[0].delta.cpu_delta, 0.0);
    assert_eq!(frames[1].delta.io.read_bytes, 4096);
    assert!((frames[4].delta.cpu_delta - 1.0).abs() < 1e-4);

    let last = &frames[4];
    assert_eq!(last.history.len(), 5);
    assert_eq!(last.tree.node_count(), 4);
    assert_eq!(last.tree.edges(), vec![(1, 100), (100, 101), (100, 102)]);
    assert_eq!(terminations.count(), 1);
}

#[tokio::test]
async fn test_target_exit_ends_session_as_process_gone() {
    let fake = FakeProcess::new(200, "short").with_samples(ramp(3));
    let terminations = fake.terminations();
    let sampler =
        Sampler::with_table(fake, Box::new(StaticHost::default()), config(None), &UnixNiceTable);

    let (report, frames) = collect(sampler).await;

    assert_eq!(frames.len(), 3);
    assert_eq!(report.cycles, 3);
    match report.outcome {
        SessionOutcome::Failed { kind, .. } => assert_eq!(kind, ErrorKind::ProcessGone),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(terminations.count() <= 1);
}

#[tokio::test]
async fn test_repeated_slow_queries_end_session() {
    let fake = FakeProcess::new(300, "slow")
        .with_samples(ramp(20))
        .with_delay("threads", Duration::from_millis(120), 10);
    let mut config = config(None);
    config.query_timeout = Duration::from_millis(30);
    config.max_consecutive_timeouts = 2;
    let sampler =
        Sampler::with_table(fake, Box::new(StaticHost::default()), config, &UnixNiceTable);

    let (report, frames) = collect(sampler).await;

    assert_eq!(frames.len(), 1);
    assert!(frames.iter().all(|f| f
        .snapshot
        .degraded_fields
        .contains(&"threads".to_string())));
    match report.outcome {
        SessionOutcome::Failed { kind, message } => {
            assert_eq!(kind, ErrorKind::QueryTimeout);
            assert!(message.contains("threads"), "{}", message);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn test_frames_carry_usage_history_and_connections() {
    let connection = Connection::new(
        SocketKind::Tcp,
        "127.0.0.1:8080".parse().unwrap(),
        "0.0.0.0:0".parse().unwrap(),
        "LISTEN",
    );
    let samples = ramp(3)
        .into_iter()
        .map(|sample| FakeSample {
            connections: vec![connection.clone()],
            ..sample
        })
        .collect();
    let fake = FakeProcess::new(500, "listener").with_samples(samples);
    let sampler = Sampler::with_table(
        fake,
        Box::new(StaticHost::default()),
        config(Some(3)),
        &UnixNiceTable,
    );

    let (_, frames) = collect(sampler).await;

    let last = &frames[2];
    assert_eq!(last.history.cpu_percent, vec![10.0, 11.0, 12.0]);
    assert_eq!(last.history.mem_percent.len(), last.history.len());
    assert_eq!(last.snapshot.connections, vec![connection]);
}

#[test]
fn test_runtime_json_frames_serialize() {
    let fake = FakeProcess::new(400, "json").with_samples(ramp(50));
    let mut runtime =
        ProfilerRuntime::start(fake, Box::new(StaticHost::default()), config(Some(2))).unwrap();

    let frame = runtime.next_frame(Duration::from_secs(5)).unwrap();
    let line = serde_json::to_string(&*frame).unwrap();
    let value: serde_json::Value = serde_json::from_str(&line).unwrap();

    assert_eq!(value["snapshot"]["pid"], 400);
    assert_eq!(value["snapshot"]["name"], "json");
    assert!(value["history"]["read_bytes"].is_array());
    assert_eq!(value["history"]["cpu_percent"].as_array().map(Vec::len), Some(1));
    assert!(value["snapshot"]["connections"].is_array());

    let report = runtime.shutdown().unwrap();
    assert_eq!(report.pid, 400);
}
