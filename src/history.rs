// Fixed-capacity rolling window for one scalar series.

use std::collections::VecDeque;

use crate::models::HistorySample;

/// Most recent `capacity` samples of one series, oldest first.
///
/// Appending to a full buffer evicts the oldest sample; evicted samples are
/// dropped. The engine never appends for an unavailable reading, so a missing
/// cycle shows up as a gap in timestamps rather than a sentinel value.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    capacity: usize,
    samples: VecDeque<HistorySample>,
}

impl HistoryBuffer {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub fn append(&mut self, value: f64, timestamp: u64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(HistorySample { timestamp, value });
    }

    /// Copy of the retained samples in chronological order.
    pub fn snapshot(&self) -> Vec<HistorySample> {
        self.samples.iter().copied().collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn latest(&self) -> Option<HistorySample> {
        self.samples.back().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
