// NVIDIA GPU via NVML. The library is loaded lazily on first probe.

use nvml_wrapper::Nvml;
use nvml_wrapper::enum_wrappers::device::TemperatureSensor;
use nvml_wrapper::error::NvmlError;
use std::sync::Mutex;

use super::{Probe, ProbeOutcome};
use crate::error::SourceError;
use crate::models::GpuReading;

/// Reads the first NVML device.
pub struct GpuProbe {
    nvml: Mutex<Option<Nvml>>,
}

impl Default for GpuProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuProbe {
    pub fn new() -> Self {
        Self {
            nvml: Mutex::new(None),
        }
    }
}

/// NVML errors that mean "no usable NVIDIA GPU on this host" rather than a failed read.
pub fn is_absent_error(e: &NvmlError) -> bool {
    matches!(
        e,
        NvmlError::LibloadingError(_)
            | NvmlError::FailedToLoadSymbol(_)
            | NvmlError::LibraryNotFound
            | NvmlError::DriverNotLoaded
            | NvmlError::NotFound
            | NvmlError::NotSupported
            | NvmlError::NoPermission
    )
}

fn failed<T>(e: NvmlError, what: &str) -> ProbeOutcome<T> {
    ProbeOutcome::Failed(SourceError::collection(format!("nvml {}: {}", what, e)))
}

/// Errors while loading NVML or enumerating devices; may mean there is no GPU.
fn classify<T>(e: NvmlError, what: &str) -> ProbeOutcome<T> {
    if is_absent_error(&e) {
        ProbeOutcome::Absent
    } else {
        failed(e, what)
    }
}

/// Errors from a device NVML already reported. The GPU exists, so every error
/// is a failed read.
fn classify_device<T>(e: NvmlError, what: &str) -> ProbeOutcome<T> {
    failed(e, what)
}

impl Probe for GpuProbe {
    type Reading = GpuReading;

    fn name(&self) -> &'static str {
        "gpu"
    }

    fn probe(&self) -> ProbeOutcome<GpuReading> {
        let Ok(mut guard) = self.nvml.lock() else {
            return ProbeOutcome::Failed(SourceError::LockPoisoned("nvml lock".into()));
        };
        if guard.is_none() {
            match Nvml::init() {
                Ok(nvml) => *guard = Some(nvml),
                Err(e) => return classify(e, "init"),
            }
        }
        let Some(nvml) = guard.as_ref() else {
            return ProbeOutcome::Absent;
        };

        match nvml.device_count() {
            Ok(0) => return ProbeOutcome::Absent,
            Ok(_) => {}
            Err(e) => return classify(e, "device_count"),
        }
        let device = match nvml.device_by_index(0) {
            Ok(d) => d,
            Err(e) => return classify_device(e, "device_by_index"),
        };
        let utilization = match device.utilization_rates() {
            Ok(u) => u,
            Err(e) => return classify_device(e, "utilization_rates"),
        };
        let temperature = match device.temperature(TemperatureSensor::Gpu) {
            Ok(t) => t,
            Err(e) => return classify_device(e, "temperature"),
        };
        let name = device.name().unwrap_or_else(|_| "NVIDIA GPU".into());

        ProbeOutcome::Reading(GpuReading {
            name,
            utilization_percent: (utilization.gpu as f64).clamp(0.0, 100.0),
            memory_percent: (utilization.memory as f64).clamp(0.0, 100.0),
            temperature: temperature as f64,
        })
    }
}
