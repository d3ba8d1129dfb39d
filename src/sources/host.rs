// Required sources via sysinfo. Each adapter owns its own sysinfo handle.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use sysinfo::{Disks, Networks, System};
use tracing::instrument;

use super::RequiredSource;
use crate::error::SourceError;
use crate::models::{DiskReading, MemoryReading, NetworkReading, percent_of};

fn poisoned(what: &str) -> SourceError {
    SourceError::LockPoisoned(format!("sysinfo {} lock", what))
}

/// Global CPU usage in percent since the previous refresh.
pub struct CpuSource {
    state: Mutex<CpuState>,
}

struct CpuState {
    sys: System,
    last_refresh: Instant,
}

impl Default for CpuSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuSource {
    pub fn new() -> Self {
        let mut sys = System::new();
        // Baseline for the first delta
        sys.refresh_cpu_usage();
        Self {
            state: Mutex::new(CpuState {
                sys,
                last_refresh: Instant::now(),
            }),
        }
    }
}

/// Usage deltas over less than sysinfo's minimum window are noise, not a reading.
pub fn check_cpu_window(elapsed: Duration) -> Result<(), SourceError> {
    if elapsed < sysinfo::MINIMUM_CPU_UPDATE_INTERVAL {
        return Err(SourceError::collection(format!(
            "cpu usage window {} ms is below the {} ms minimum",
            elapsed.as_millis(),
            sysinfo::MINIMUM_CPU_UPDATE_INTERVAL.as_millis()
        )));
    }
    Ok(())
}

impl RequiredSource for CpuSource {
    type Reading = f64;

    fn name(&self) -> &'static str {
        "cpu"
    }

    #[instrument(skip(self), fields(source = "cpu", operation = "sample"))]
    fn sample(&self) -> Result<f64, SourceError> {
        let mut state = self.state.lock().map_err(|_| poisoned("cpu"))?;
        let now = Instant::now();
        // Keep the old baseline so the next call measures a longer window.
        check_cpu_window(now.duration_since(state.last_refresh))?;
        state.sys.refresh_cpu_usage();
        state.last_refresh = now;
        if state.sys.cpus().is_empty() {
            return Err(SourceError::collection("no CPUs reported"));
        }
        let usage = state.sys.global_cpu_usage() as f64;
        if !usage.is_finite() {
            return Err(SourceError::collection("non-finite CPU usage"));
        }
        Ok(usage.clamp(0.0, 100.0))
    }
}

pub struct MemorySource {
    sys: Mutex<System>,
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            sys: Mutex::new(System::new()),
        }
    }
}

impl RequiredSource for MemorySource {
    type Reading = MemoryReading;

    fn name(&self) -> &'static str {
        "memory"
    }

    #[instrument(skip(self), fields(source = "memory", operation = "sample"))]
    fn sample(&self) -> Result<MemoryReading, SourceError> {
        let mut sys = self.sys.lock().map_err(|_| poisoned("memory"))?;
        sys.refresh_memory();

        let total = sys.total_memory();
        if total == 0 {
            return Err(SourceError::collection("total memory reported as 0"));
        }
        let used = total.saturating_sub(sys.available_memory());
        Ok(MemoryReading {
            used_bytes: used,
            total_bytes: total,
            percent: percent_of(used, total),
        })
    }
}

/// Usage of the filesystem mounted at one mount point.
pub struct DiskSource {
    disks: Mutex<Disks>,
    mount: PathBuf,
}

impl DiskSource {
    pub fn new(mount: impl AsRef<Path>) -> Self {
        Self {
            disks: Mutex::new(Disks::new_with_refreshed_list()),
            mount: mount.as_ref().to_path_buf(),
        }
    }
}

/// Build a reading from total/available space; errors on a zero-sized filesystem.
pub fn disk_reading(mount: &Path, total: u64, available: u64) -> Result<DiskReading, SourceError> {
    if total == 0 {
        return Err(SourceError::collection(format!(
            "{} reports 0 bytes total",
            mount.display()
        )));
    }
    let used = total.saturating_sub(available);
    Ok(DiskReading {
        mount_point: mount.to_string_lossy().into_owned(),
        used_bytes: used,
        total_bytes: total,
        percent: percent_of(used, total),
    })
}

impl RequiredSource for DiskSource {
    type Reading = DiskReading;

    fn name(&self) -> &'static str {
        "disk"
    }

    #[instrument(skip(self), fields(source = "disk", operation = "sample", mount = %self.mount.display()))]
    fn sample(&self) -> Result<DiskReading, SourceError> {
        let mut disks = self.disks.lock().map_err(|_| poisoned("disks"))?;
        disks.refresh(false);
        let disk = disks
            .list()
            .iter()
            .find(|d| d.mount_point() == self.mount.as_path())
            .ok_or_else(|| {
                SourceError::collection(format!("no filesystem mounted at {}", self.mount.display()))
            })?;
        disk_reading(&self.mount, disk.total_space(), disk.available_space())
    }
}

/// Cumulative byte counters summed over every interface, loopback included.
pub struct NetworkSource {
    networks: Mutex<Networks>,
}

impl Default for NetworkSource {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkSource {
    pub fn new() -> Self {
        Self {
            networks: Mutex::new(Networks::new_with_refreshed_list()),
        }
    }
}

/// Sum `(sent, received)` pairs, saturating on overflow.
pub fn sum_counters(counters: impl IntoIterator<Item = (u64, u64)>) -> NetworkReading {
    let (sent, received) = counters
        .into_iter()
        .fold((0u64, 0u64), |(s, r), (ds, dr)| {
            (s.saturating_add(ds), r.saturating_add(dr))
        });
    NetworkReading {
        bytes_sent: sent,
        bytes_received: received,
    }
}

impl RequiredSource for NetworkSource {
    type Reading = NetworkReading;

    fn name(&self) -> &'static str {
        "network"
    }

    #[instrument(skip(self), fields(source = "network", operation = "sample"))]
    fn sample(&self) -> Result<NetworkReading, SourceError> {
        let mut networks = self.networks.lock().map_err(|_| poisoned("networks"))?;
        networks.refresh(true);
        Ok(sum_counters(
            networks
                .list()
                .values()
                .map(|data| (data.total_transmitted(), data.total_received())),
        ))
    }
}
