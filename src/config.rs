use serde::Deserialize;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Minimum gap between the per-source timeout and the interval. The cycle
/// deadline sits in the middle of it, so a hung source times out before the cycle does.
pub const CYCLE_MARGIN_MS: u64 = 10;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sampling: SamplingConfig,
    pub sensors: SensorsConfig,
    pub monitoring: MonitoringConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub interval_ms: u64,
    /// Max wait for any single source; a slower source is unavailable for that cycle.
    pub source_timeout_ms: u64,
    /// Samples kept per history series.
    pub retention_samples: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            source_timeout_ms: 800,
            retention_samples: 60,
        }
    }
}

impl SamplingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }

    /// Interval minus half the cycle margin; always after the source timeout once validated.
    pub fn cycle_deadline(&self) -> Duration {
        self.interval()
            .saturating_sub(Duration::from_millis(CYCLE_MARGIN_MS / 2))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SensorsConfig {
    /// Sensor label prefix tried first for CPU temperature.
    pub cpu_temp_primary: String,
    pub cpu_temp_fallback: String,
    pub disk_mount: String,
    /// Consecutive failed probes (with no reading ever) before an optional source is treated as absent.
    pub max_probe_failures: u32,
}

impl Default for SensorsConfig {
    fn default() -> Self {
        Self {
            cpu_temp_primary: "coretemp".into(),
            cpu_temp_fallback: "cpu_thermal".into(),
            disk_mount: "/".into(),
            max_probe_failures: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// How often to log engine stats (published/skipped/abandoned cycles) at INFO level.
    pub stats_log_interval_secs: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            stats_log_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub refresh_ms: u64,
    pub format: DisplayFormat,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_ms: 1000,
            format: DisplayFormat::Text,
        }
    }
}

impl AppConfig {
    /// Load from `CONFIG_FILE`, or `config.toml`. Only a missing default file falls back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var("CONFIG_FILE") {
            Ok(path) => {
                let s = std::fs::read_to_string(&path)
                    .map_err(|e| anyhow::anyhow!("reading {}: {}", path, e))?;
                Self::load_from_str(&s)
            }
            Err(_) => match std::fs::read_to_string(DEFAULT_CONFIG_PATH) {
                Ok(s) => Self::load_from_str(&s),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::info!("{} not found; using built-in defaults", DEFAULT_CONFIG_PATH);
                    Ok(Self::default())
                }
                Err(e) => Err(anyhow::anyhow!("reading {}: {}", DEFAULT_CONFIG_PATH, e)),
            },
        }
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.sampling.interval_ms > 0,
            "sampling.interval_ms must be > 0, got {}",
            self.sampling.interval_ms
        );
        anyhow::ensure!(
            self.sampling.source_timeout_ms > 0,
            "sampling.source_timeout_ms must be > 0, got {}",
            self.sampling.source_timeout_ms
        );
        anyhow::ensure!(
            self.sampling.source_timeout_ms.saturating_add(CYCLE_MARGIN_MS)
                <= self.sampling.interval_ms,
            "sampling.source_timeout_ms ({}) must be at least {} ms below sampling.interval_ms ({})",
            self.sampling.source_timeout_ms,
            CYCLE_MARGIN_MS,
            self.sampling.interval_ms
        );
        anyhow::ensure!(
            self.sampling.retention_samples > 0,
            "sampling.retention_samples must be > 0, got {}",
            self.sampling.retention_samples
        );
        anyhow::ensure!(
            !self.sensors.disk_mount.is_empty(),
            "sensors.disk_mount must be non-empty"
        );
        anyhow::ensure!(
            self.sensors.max_probe_failures > 0,
            "sensors.max_probe_failures must be > 0, got {}",
            self.sensors.max_probe_failures
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        anyhow::ensure!(
            self.display.refresh_ms > 0,
            "display.refresh_ms must be > 0, got {}",
            self.display.refresh_ms
        );
        Ok(())
    }
}
