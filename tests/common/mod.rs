// Shared test helpers: scripted sources standing in for the OS
#![allow(dead_code)]

use dataview::engine::{Engine, EngineConfig};
use dataview::error::SourceError;
use dataview::models::*;
use dataview::sampler::Sampler;
use dataview::sources::{OptionalSource, Probe, ProbeOutcome, RequiredSource, Sources};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const MB: u64 = 1024 * 1024;

/// Required source returning the same result on every call.
pub struct Fixed<T> {
    pub name: &'static str,
    pub result: Result<T, SourceError>,
    pub calls: AtomicUsize,
}

impl<T> Fixed<T> {
    pub fn ok(name: &'static str, value: T) -> Self {
        Self {
            name,
            result: Ok(value),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &'static str) -> Self {
        Self {
            name,
            result: Err(SourceError::collection("permission denied")),
            calls: AtomicUsize::new(0),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> RequiredSource for Fixed<T> {
    type Reading = T;

    fn name(&self) -> &'static str {
        self.name
    }

    fn sample(&self) -> Result<T, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Required source returning queued values in order, then failing.
pub struct Sequence {
    values: Mutex<VecDeque<Option<f64>>>,
}

impl Sequence {
    /// `None` entries fail that call.
    pub fn new(values: impl IntoIterator<Item = Option<f64>>) -> Self {
        Self {
            values: Mutex::new(values.into_iter().collect()),
        }
    }
}

impl RequiredSource for Sequence {
    type Reading = f64;

    fn name(&self) -> &'static str {
        "cpu"
    }

    fn sample(&self) -> Result<f64, SourceError> {
        self.values
            .lock()
            .unwrap()
            .pop_front()
            .flatten()
            .ok_or_else(|| SourceError::collection("scripted failure"))
    }
}

/// Required source that blocks for `delay` and records how many calls overlap.
pub struct Slow {
    pub delay: Duration,
    pub value: f64,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl Slow {
    pub fn new(delay: Duration, value: f64) -> Self {
        Self {
            delay,
            value,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

impl RequiredSource for Slow {
    type Reading = f64;

    fn name(&self) -> &'static str {
        "cpu"
    }

    fn sample(&self) -> Result<f64, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self.value)
    }
}

/// Optional source with a fixed answer.
pub struct FixedOptional<T>(pub Option<T>);

impl<T: Clone + Send + Sync + 'static> OptionalSource for FixedOptional<T> {
    type Reading = T;

    fn name(&self) -> &'static str {
        "optional"
    }

    fn sample(&self) -> Option<T> {
        self.0.clone()
    }
}

/// Probe replaying scripted outcomes; repeats `then` once the script runs out.
pub struct ScriptedProbe<T> {
    script: Mutex<VecDeque<ProbeOutcome<T>>>,
    then: ProbeOutcome<T>,
    pub calls: Arc<AtomicUsize>,
}

impl<T> ScriptedProbe<T> {
    pub fn new(script: Vec<ProbeOutcome<T>>, then: ProbeOutcome<T>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            then,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Probe for ScriptedProbe<T> {
    type Reading = T;

    fn name(&self) -> &'static str {
        "scripted"
    }

    fn probe(&self) -> ProbeOutcome<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.then.clone())
    }
}

pub fn memory_reading(used_mb: u64, total_mb: u64) -> MemoryReading {
    MemoryReading {
        used_bytes: used_mb * MB,
        total_bytes: total_mb * MB,
        percent: percent_of(used_mb, total_mb),
    }
}

pub fn disk_reading_half() -> DiskReading {
    DiskReading {
        mount_point: "/".into(),
        used_bytes: 50 * 1024 * MB,
        total_bytes: 100 * 1024 * MB,
        percent: 50.0,
    }
}

/// CPU 42.5 %, memory 4096/8192 MB, disk 50 %, network 100/200 MB, no GPU, no sensor.
pub fn scenario_sources() -> Sources {
    Sources {
        cpu: Arc::new(Fixed::ok("cpu", 42.5)),
        memory: Arc::new(Fixed::ok("memory", memory_reading(4096, 8192))),
        disk: Arc::new(Fixed::ok("disk", disk_reading_half())),
        network: Arc::new(Fixed::ok(
            "network",
            NetworkReading {
                bytes_sent: 100 * MB,
                bytes_received: 200 * MB,
            },
        )),
        temperature: Arc::new(FixedOptional::<f64>(None)),
        gpu: Arc::new(FixedOptional::<GpuReading>(None)),
    }
}

pub fn sources_with_cpu(cpu: Arc<dyn RequiredSource<Reading = f64>>) -> Sources {
    Sources {
        cpu,
        ..scenario_sources()
    }
}

pub fn engine_config(retention: usize) -> EngineConfig {
    EngineConfig {
        interval: Duration::from_millis(20),
        cycle_deadline: Duration::from_secs(2),
        retention_samples: retention,
        stats_log_interval: Duration::from_secs(3600),
    }
}

pub fn engine(sources: Sources, retention: usize) -> Engine {
    Engine::new(
        Sampler::new(sources, Duration::from_secs(1)),
        engine_config(retention),
    )
}
