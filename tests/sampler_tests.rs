// Sampler: one cycle over all sources with per-source isolation and timeouts

mod common;

use common::*;
use dataview::models::*;
use dataview::sampler::Sampler;
use dataview::error::SourceError;
use dataview::sources::{ProbeOutcome, Sources, StickyAbsence};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

#[tokio::test]
async fn scenario_snapshot_has_every_field_resolved() {
    let sampler = Sampler::new(scenario_sources(), Duration::from_secs(1));
    let snap = sampler.sample().await;

    let cpu = snap.cpu.as_available().expect("cpu");
    assert_eq!(cpu.percent, 42.5);
    assert_eq!(cpu.temperature, None);

    let mem = snap.memory.as_available().expect("memory");
    assert_eq!(mem.percent, 50.0);
    assert_eq!(mem.used_bytes, 4096 * MB);

    assert_eq!(snap.disk.as_available().map(|d| d.percent), Some(50.0));
    assert_eq!(
        snap.network,
        Reading::Available(NetworkReading {
            bytes_sent: 100 * MB,
            bytes_received: 200 * MB,
        })
    );
    assert!(snap.gpu.is_none());
    assert!(snap.timestamp > 0);
}

#[tokio::test]
async fn failing_source_only_affects_its_field() {
    let sources = Sources {
        memory: Arc::new(Fixed::<MemoryReading>::failing("memory")),
        ..scenario_sources()
    };
    let snap = Sampler::new(sources, Duration::from_secs(1)).sample().await;

    assert_eq!(snap.memory, Reading::Unavailable);
    assert_eq!(snap.cpu_percent(), Some(42.5));
    assert!(snap.disk.is_available());
    assert!(snap.network.is_available());
}

#[tokio::test]
async fn temperature_is_attached_to_cpu_reading() {
    let sources = Sources {
        temperature: Arc::new(FixedOptional(Some(63.0))),
        ..scenario_sources()
    };
    let snap = Sampler::new(sources, Duration::from_secs(1)).sample().await;
    assert_eq!(snap.cpu_temperature(), Some(63.0));
}

#[tokio::test]
async fn gpu_reading_is_passed_through() {
    let gpu = GpuReading {
        name: "Test GPU".into(),
        utilization_percent: 12.0,
        memory_percent: 30.0,
        temperature: 45.0,
    };
    let sources = Sources {
        gpu: Arc::new(FixedOptional(Some(gpu.clone()))),
        ..scenario_sources()
    };
    let snap = Sampler::new(sources, Duration::from_secs(1)).sample().await;
    assert_eq!(snap.gpu, Some(gpu));
}

#[tokio::test]
async fn slow_source_times_out_without_stalling_cycle() {
    let slow = Arc::new(Slow::new(Duration::from_millis(500), 99.0));
    let sampler = Sampler::new(sources_with_cpu(slow.clone()), Duration::from_millis(50));

    let started = Instant::now();
    let snap = sampler.sample().await;
    assert!(started.elapsed() < Duration::from_millis(400));
    assert_eq!(snap.cpu, Reading::Unavailable);
    assert_eq!(snap.memory_percent(), Some(50.0));
}

#[tokio::test]
async fn hung_source_is_not_called_again_while_busy() {
    let slow = Arc::new(Slow::new(Duration::from_millis(400), 99.0));
    let sampler = Sampler::new(sources_with_cpu(slow.clone()), Duration::from_millis(30));

    let first = sampler.sample().await;
    let second = sampler.sample().await;
    assert_eq!(first.cpu, Reading::Unavailable);
    assert_eq!(second.cpu, Reading::Unavailable);
    assert_eq!(slow.calls.load(Ordering::SeqCst), 1);
    assert_eq!(slow.max_in_flight.load(Ordering::SeqCst), 1);

    // Once the abandoned call returns, the source is polled again.
    tokio::time::sleep(Duration::from_millis(500)).await;
    let _ = sampler.sample().await;
    assert_eq!(slow.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn gpu_failing_then_absent_reports_absence_each_cycle() {
    let probe = ScriptedProbe::new(
        vec![ProbeOutcome::Failed(SourceError::collection("nvml: unknown"))],
        ProbeOutcome::<GpuReading>::Absent,
    );
    let calls = probe.calls.clone();
    let sources = Sources {
        gpu: Arc::new(StickyAbsence::new(probe, 3)),
        ..scenario_sources()
    };
    let sampler = Sampler::new(sources, Duration::from_secs(1));

    for _ in 0..5 {
        let snap = sampler.sample().await;
        assert!(snap.gpu.is_none());
        assert_eq!(snap.cpu_percent(), Some(42.5));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
