// Domain models: per-cycle snapshot and history samples

mod history;
mod snapshot;

pub use history::{HistorySample, Series};
pub use snapshot::{
    CpuReading, DiskReading, GpuReading, MemoryReading, MetricSnapshot, NetworkReading, Reading,
    percent_of,
};
