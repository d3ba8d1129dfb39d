// One polling cycle over every source, producing a fully formed snapshot.
// Each source runs on the blocking pool under its own timeout; a failing, slow or
// missing source only affects its own field.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::instrument;

use crate::error::SourceError;
use crate::models::{CpuReading, MetricSnapshot, Reading};
use crate::sources::{OptionalSource, RequiredSource, Sources};

/// Clears the in-flight flag when the blocking call returns, or when it is dropped unrun.
struct BusyRelease(Arc<AtomicBool>);

impl Drop for BusyRelease {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Per-source in-flight flags. A call abandoned on timeout keeps its flag set
/// until it actually returns, so the next cycle reports the source busy instead
/// of stacking a second blocked call on top of it.
#[derive(Default)]
struct InFlight {
    cpu: Arc<AtomicBool>,
    memory: Arc<AtomicBool>,
    disk: Arc<AtomicBool>,
    network: Arc<AtomicBool>,
    temperature: Arc<AtomicBool>,
    gpu: Arc<AtomicBool>,
}

pub struct Sampler {
    sources: Sources,
    source_timeout: Duration,
    in_flight: InFlight,
}

/// Current time in ms since UNIX epoch (0 if the clock is before the epoch).
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        })
}

async fn call_bounded<T, F>(
    busy: &Arc<AtomicBool>,
    timeout: Duration,
    f: F,
) -> Result<T, SourceError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SourceError> + Send + 'static,
{
    if busy.swap(true, Ordering::AcqRel) {
        return Err(SourceError::Busy);
    }
    let release = BusyRelease(busy.clone());
    let task = tokio::task::spawn_blocking(move || {
        let _release = release;
        f()
    });
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(SourceError::Join(e.to_string())),
        Err(_) => Err(SourceError::Timeout(timeout)),
    }
}

fn log_failure(source: &str, e: &SourceError) {
    match e {
        SourceError::Busy => tracing::debug!(source, "source still busy from an earlier cycle"),
        _ => tracing::warn!(source, error = %e, "source unavailable this cycle"),
    }
}

impl Sampler {
    pub fn new(sources: Sources, source_timeout: Duration) -> Self {
        Self {
            sources,
            source_timeout,
            in_flight: InFlight::default(),
        }
    }

    pub fn source_timeout(&self) -> Duration {
        self.source_timeout
    }

    async fn required<T: Send + 'static>(
        &self,
        source: &Arc<dyn RequiredSource<Reading = T>>,
        busy: &Arc<AtomicBool>,
    ) -> Result<T, SourceError> {
        let name = source.name();
        let source = Arc::clone(source);
        let result = call_bounded(busy, self.source_timeout, move || source.sample()).await;
        if let Err(ref e) = result {
            log_failure(name, e);
        }
        result
    }

    async fn optional<T: Send + 'static>(
        &self,
        source: &Arc<dyn OptionalSource<Reading = T>>,
        busy: &Arc<AtomicBool>,
    ) -> Option<T> {
        let name = source.name();
        let source = Arc::clone(source);
        match call_bounded(busy, self.source_timeout, move || Ok(source.sample())).await {
            Ok(reading) => reading,
            Err(e) => {
                log_failure(name, &e);
                None
            }
        }
    }

    /// Run one cycle. Never fails: unavailable fields carry an explicit marker.
    /// `cycle` is left at 0; the engine numbers published snapshots.
    #[instrument(skip(self), fields(operation = "sample_cycle"))]
    pub async fn sample(&self) -> MetricSnapshot {
        let timestamp = now_ms();
        let s = &self.sources;
        let f = &self.in_flight;

        let (cpu, memory, disk, network, temperature, gpu) = tokio::join!(
            self.required(&s.cpu, &f.cpu),
            self.required(&s.memory, &f.memory),
            self.required(&s.disk, &f.disk),
            self.required(&s.network, &f.network),
            self.optional(&s.temperature, &f.temperature),
            self.optional(&s.gpu, &f.gpu),
        );

        MetricSnapshot {
            timestamp,
            cycle: 0,
            cpu: Reading::from(cpu).map(|percent| CpuReading {
                percent,
                temperature,
            }),
            memory: memory.into(),
            disk: disk.into(),
            network: network.into(),
            gpu,
        }
    }
}
