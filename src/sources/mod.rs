// Metric source adapters: one OS capability each, behind two typed contracts.
//
// Required sources (CPU, memory, disk, network) are always present on a host and
// return a Result; an error means this one read failed. Optional sources (GPU,
// CPU temperature) return an Option; `None` is a normal, usually permanent state.

mod gpu;
mod host;
mod temperature;

pub use gpu::{GpuProbe, is_absent_error};
pub use host::{
    CpuSource, DiskSource, MemorySource, NetworkSource, check_cpu_window, disk_reading, sum_counters,
};
pub use temperature::{TemperatureProbe, select_temperature};

use std::sync::{Arc, Mutex, PoisonError};

use crate::config::SensorsConfig;
use crate::error::SourceError;
use crate::models::{DiskReading, GpuReading, MemoryReading, NetworkReading};

/// A source that exists on every host. Each call is a fresh read.
pub trait RequiredSource: Send + Sync + 'static {
    type Reading: Send + 'static;

    fn name(&self) -> &'static str;

    fn sample(&self) -> Result<Self::Reading, SourceError>;
}

/// A source that may not exist on this host (no GPU, no matching sensor).
pub trait OptionalSource: Send + Sync + 'static {
    type Reading: Send + 'static;

    fn name(&self) -> &'static str;

    fn sample(&self) -> Option<Self::Reading>;
}

/// Result of one raw query against optional hardware.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome<T> {
    Reading(T),
    /// Hardware or sensor does not exist.
    Absent,
    /// Hardware may exist but this query failed.
    Failed(SourceError),
}

/// One raw query against optional hardware; wrapped by [`StickyAbsence`].
pub trait Probe: Send + Sync + 'static {
    type Reading: Send + 'static;

    fn name(&self) -> &'static str;

    fn probe(&self) -> ProbeOutcome<Self::Reading>;
}

#[derive(Debug, Default)]
struct ProbeState {
    absent: bool,
    seen_reading: bool,
    consecutive_failures: u32,
}

/// Turns a [`Probe`] into an [`OptionalSource`] that stops probing once the
/// hardware is known to be missing.
///
/// `Absent` is final for the session. `Failed` returns `None` for that call;
/// after `max_failures` consecutive failures on hardware that never produced a
/// reading, the source is treated as absent too.
pub struct StickyAbsence<P> {
    probe: P,
    max_failures: u32,
    state: Mutex<ProbeState>,
}

impl<P: Probe> StickyAbsence<P> {
    pub fn new(probe: P, max_failures: u32) -> Self {
        Self {
            probe,
            max_failures: max_failures.max(1),
            state: Mutex::new(ProbeState::default()),
        }
    }

    pub fn is_absent(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .absent
    }

    fn mark_absent(&self, state: &mut ProbeState, reason: &str) {
        state.absent = true;
        tracing::info!(
            source = self.probe.name(),
            reason,
            "source not available on this host; no further probes"
        );
    }
}

impl<P: Probe> OptionalSource for StickyAbsence<P> {
    type Reading = P::Reading;

    fn name(&self) -> &'static str {
        self.probe.name()
    }

    fn sample(&self) -> Option<Self::Reading> {
        if self.is_absent() {
            return None;
        }
        // Lock is not held across the probe; the sampler never runs two calls to
        // the same source at once.
        let outcome = self.probe.probe();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match outcome {
            ProbeOutcome::Reading(v) => {
                state.seen_reading = true;
                state.consecutive_failures = 0;
                Some(v)
            }
            ProbeOutcome::Absent => {
                self.mark_absent(&mut state, "not present");
                None
            }
            ProbeOutcome::Failed(e) => {
                state.consecutive_failures += 1;
                tracing::warn!(
                    source = self.probe.name(),
                    error = %e,
                    consecutive_failures = state.consecutive_failures,
                    "probe failed"
                );
                if !state.seen_reading && state.consecutive_failures >= self.max_failures {
                    self.mark_absent(&mut state, "never produced a reading");
                }
                None
            }
        }
    }
}

/// The fixed set of adapters one sampler polls.
#[derive(Clone)]
pub struct Sources {
    pub cpu: Arc<dyn RequiredSource<Reading = f64>>,
    pub memory: Arc<dyn RequiredSource<Reading = MemoryReading>>,
    pub disk: Arc<dyn RequiredSource<Reading = DiskReading>>,
    pub network: Arc<dyn RequiredSource<Reading = NetworkReading>>,
    pub temperature: Arc<dyn OptionalSource<Reading = f64>>,
    pub gpu: Arc<dyn OptionalSource<Reading = GpuReading>>,
}

impl Sources {
    /// Adapters backed by this host's OS (sysinfo) and NVML.
    pub fn host(sensors: &SensorsConfig) -> Self {
        Self {
            cpu: Arc::new(CpuSource::new()),
            memory: Arc::new(MemorySource::new()),
            disk: Arc::new(DiskSource::new(&sensors.disk_mount)),
            network: Arc::new(NetworkSource::new()),
            temperature: Arc::new(StickyAbsence::new(
                TemperatureProbe::new(vec![
                    sensors.cpu_temp_primary.clone(),
                    sensors.cpu_temp_fallback.clone(),
                ]),
                sensors.max_probe_failures,
            )),
            gpu: Arc::new(StickyAbsence::new(
                GpuProbe::new(),
                sensors.max_probe_failures,
            )),
        }
    }
}
