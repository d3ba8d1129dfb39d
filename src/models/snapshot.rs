// Per-cycle snapshot models

use serde::{Deserialize, Serialize};

/// One field of a snapshot: a reading taken this cycle, or an explicit marker.
/// Serializes as `{"status":"available","value":...}` / `{"status":"unavailable"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
pub enum Reading<T> {
    Available(T),
    Unavailable,
}

impl<T> Reading<T> {
    pub fn as_available(&self) -> Option<&T> {
        match self {
            Reading::Available(v) => Some(v),
            Reading::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Reading::Available(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reading<U> {
        match self {
            Reading::Available(v) => Reading::Available(f(v)),
            Reading::Unavailable => Reading::Unavailable,
        }
    }
}

impl<T, E> From<Result<T, E>> for Reading<T> {
    fn from(r: Result<T, E>) -> Self {
        match r {
            Ok(v) => Reading::Available(v),
            Err(_) => Reading::Unavailable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuReading {
    pub percent: f64,
    /// Celsius; `None` when no CPU sensor is available this cycle.
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryReading {
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskReading {
    pub mount_point: String,
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub percent: f64,
}

/// Cumulative counters since boot, summed over all interfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkReading {
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuReading {
    pub name: String,
    pub utilization_percent: f64,
    pub memory_percent: f64,
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSnapshot {
    /// Cycle start, ms since UNIX epoch. 0 before the first cycle.
    pub timestamp: u64,
    /// Sequence number of the publishing cycle. 0 before the first cycle.
    pub cycle: u64,
    pub cpu: Reading<CpuReading>,
    pub memory: Reading<MemoryReading>,
    pub disk: Reading<DiskReading>,
    pub network: Reading<NetworkReading>,
    /// `None` when no GPU is present or it could not be read this cycle.
    pub gpu: Option<GpuReading>,
}

impl MetricSnapshot {
    /// Snapshot served before the first cycle completes.
    pub fn unavailable() -> Self {
        Self {
            timestamp: 0,
            cycle: 0,
            cpu: Reading::Unavailable,
            memory: Reading::Unavailable,
            disk: Reading::Unavailable,
            network: Reading::Unavailable,
            gpu: None,
        }
    }

    pub fn cpu_percent(&self) -> Option<f64> {
        self.cpu.as_available().map(|c| c.percent)
    }

    pub fn memory_percent(&self) -> Option<f64> {
        self.memory.as_available().map(|m| m.percent)
    }

    pub fn cpu_temperature(&self) -> Option<f64> {
        self.cpu.as_available().and_then(|c| c.temperature)
    }
}

impl Default for MetricSnapshot {
    fn default() -> Self {
        Self::unavailable()
    }
}

/// `part / total * 100`, or 0 when `total` is 0.
pub fn percent_of(part: u64, total: u64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}
