// Aggregation engine: drives the sampler on a fixed interval, publishes the latest
// snapshot and keeps the CPU / memory history for the presentation layer.
//
// Idle -> Sampling -> Published -> Idle, one cycle at a time. Published state is
// replaced wholesale under one write lock, so readers never see a partial cycle.

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::time::{Duration, interval};
use tracing::{Instrument, instrument};

use crate::config::AppConfig;
use crate::error::EngineError;
use crate::history::HistoryBuffer;
use crate::models::{HistorySample, MetricSnapshot, Series};
use crate::sampler::Sampler;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub interval: Duration,
    /// A cycle running longer than this is dropped without publishing.
    pub cycle_deadline: Duration,
    pub retention_samples: usize,
    /// How often the periodic loop logs engine stats.
    pub stats_log_interval: Duration,
}

impl EngineConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            interval: config.sampling.interval(),
            cycle_deadline: config.sampling.cycle_deadline(),
            retention_samples: config.sampling.retention_samples,
            stats_log_interval: Duration::from_secs(config.monitoring.stats_log_interval_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Sampling,
    Published,
}

impl EngineState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => EngineState::Sampling,
            2 => EngineState::Published,
            _ => EngineState::Idle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Snapshot published with this cycle number.
    Published(u64),
    /// Another cycle was still in flight; nothing sampled.
    Skipped,
    /// Cycle overran its deadline; nothing published.
    Abandoned,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub published: u64,
    pub skipped: u64,
    pub abandoned: u64,
}

struct Store {
    snapshot: Arc<MetricSnapshot>,
    cpu: HistoryBuffer,
    memory: HistoryBuffer,
}

impl Store {
    fn new(retention: usize) -> Self {
        Self {
            snapshot: Arc::new(MetricSnapshot::unavailable()),
            cpu: HistoryBuffer::new(retention),
            memory: HistoryBuffer::new(retention),
        }
    }

    fn series(&self, series: Series) -> &HistoryBuffer {
        match series {
            Series::CpuPercent => &self.cpu,
            Series::MemoryPercent => &self.memory,
        }
    }
}

/// Snapshot and both series as of one published cycle.
#[derive(Debug, Clone)]
pub struct EngineView {
    pub snapshot: Arc<MetricSnapshot>,
    pub cpu_history: Vec<HistorySample>,
    pub memory_history: Vec<HistorySample>,
    pub retention: usize,
}

/// Read-only view of the engine for the presentation layer.
#[derive(Clone)]
pub struct EngineHandle {
    store: Arc<RwLock<Store>>,
}

impl EngineHandle {
    /// Latest published snapshot, or the all-unavailable one before the first cycle.
    pub fn current_snapshot(&self) -> Arc<MetricSnapshot> {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot
            .clone()
    }

    pub fn history(&self, series: Series) -> Vec<HistorySample> {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .series(series)
            .snapshot()
    }

    /// Everything a frame needs, read under one lock so panels and graphs agree.
    pub fn view(&self) -> EngineView {
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        EngineView {
            snapshot: store.snapshot.clone(),
            cpu_history: store.cpu.snapshot(),
            memory_history: store.memory.snapshot(),
            retention: store.cpu.capacity(),
        }
    }

    /// History by series name ("cpu", "memory").
    pub fn history_by_name(&self, name: &str) -> Result<Vec<HistorySample>, EngineError> {
        Ok(self.history(name.parse()?))
    }

    pub fn retention(&self) -> usize {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .cpu
            .capacity()
    }
}

/// Resets the state to Idle however the cycle ends, including cancellation.
struct IdleOnDrop<'a>(&'a AtomicU8);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(EngineState::Idle as u8, Ordering::Release);
    }
}

pub struct Engine {
    sampler: Sampler,
    config: EngineConfig,
    store: Arc<RwLock<Store>>,
    cycle_lock: tokio::sync::Mutex<()>,
    state: AtomicU8,
    last_cycle: AtomicU64,
    published: AtomicU64,
    skipped: AtomicU64,
    abandoned: AtomicU64,
}

impl Engine {
    pub fn new(sampler: Sampler, config: EngineConfig) -> Self {
        let store = Arc::new(RwLock::new(Store::new(config.retention_samples)));
        Self {
            sampler,
            config,
            store,
            cycle_lock: tokio::sync::Mutex::new(()),
            state: AtomicU8::new(EngineState::Idle as u8),
            last_cycle: AtomicU64::new(0),
            published: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            abandoned: AtomicU64::new(0),
        }
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            store: self.store.clone(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            published: self.published.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
        }
    }

    pub fn current_snapshot(&self) -> Arc<MetricSnapshot> {
        self.handle().current_snapshot()
    }

    pub fn history(&self, series: Series) -> Vec<HistorySample> {
        self.handle().history(series)
    }

    /// Run one sample -> publish cycle. Returns `Skipped` if another cycle is in flight.
    #[instrument(skip(self), fields(operation = "run_cycle"))]
    pub async fn run_cycle(&self) -> CycleOutcome {
        let Ok(_in_flight) = self.cycle_lock.try_lock() else {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("previous cycle still running; tick skipped");
            return CycleOutcome::Skipped;
        };
        let _idle = IdleOnDrop(&self.state);
        self.state.store(EngineState::Sampling as u8, Ordering::Release);

        match tokio::time::timeout(self.config.cycle_deadline, self.sampler.sample()).await {
            Ok(snapshot) => CycleOutcome::Published(self.publish(snapshot)),
            Err(_) => {
                self.abandoned.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    deadline_ms = self.config.cycle_deadline.as_millis() as u64,
                    "cycle overran its deadline; result discarded"
                );
                CycleOutcome::Abandoned
            }
        }
    }

    fn publish(&self, mut snapshot: MetricSnapshot) -> u64 {
        let cycle = self.last_cycle.fetch_add(1, Ordering::Relaxed) + 1;
        snapshot.cycle = cycle;
        let timestamp = snapshot.timestamp;
        let cpu = snapshot.cpu_percent();
        let memory = snapshot.memory_percent();

        {
            let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
            store.snapshot = Arc::new(snapshot);
            // Unavailable readings are skipped, leaving a gap in the series.
            if let Some(v) = cpu {
                store.cpu.append(v, timestamp);
            }
            if let Some(v) = memory {
                store.memory.append(v, timestamp);
            }
        }

        self.state.store(EngineState::Published as u8, Ordering::Release);
        self.published.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(cycle, cpu_percent = ?cpu, memory_percent = ?memory, "snapshot published");
        cycle
    }
}

/// Spawns the periodic sampling loop on the current Tokio runtime.
/// Missed ticks are skipped, never run concurrently. Shutdown drops an in-flight
/// cycle without publishing it.
pub fn spawn(
    engine: Arc<Engine>,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> Result<tokio::task::JoinHandle<()>, EngineError> {
    let runtime = tokio::runtime::Handle::try_current().map_err(|_| EngineError::NoRuntime)?;
    let engine_span = tracing::span!(
        tracing::Level::DEBUG,
        "engine",
        interval_ms = engine.config.interval.as_millis() as u64
    );
    Ok(runtime.spawn(run(engine, shutdown_rx).instrument(engine_span)))
}

async fn run(engine: Arc<Engine>, mut shutdown_rx: tokio::sync::oneshot::Receiver<()>) {
    let mut tick = interval(engine.config.interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut stats_log_tick = interval(engine.config.stats_log_interval);
    stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // First stats tick fires immediately; nothing to report yet.
    stats_log_tick.tick().await;

    loop {
        tokio::select! {
            _ = tick.tick() => {
                tokio::select! {
                    _ = engine.run_cycle() => {}
                    _ = &mut shutdown_rx => {
                        tracing::debug!("Engine shutting down mid-cycle");
                        break;
                    }
                }
            }
            _ = &mut shutdown_rx => {
                tracing::debug!("Engine shutting down");
                break;
            }
            _ = stats_log_tick.tick() => {
                let stats = engine.stats();
                tracing::info!(
                    cycles_published = stats.published,
                    cycles_skipped = stats.skipped,
                    cycles_abandoned = stats.abandoned,
                    "engine stats"
                );
            }
        }
    }
}
