// History sample and the closed set of graphed series

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySample {
    /// ms since UNIX epoch
    pub timestamp: u64,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Series {
    #[serde(rename = "cpu")]
    CpuPercent,
    #[serde(rename = "memory")]
    MemoryPercent,
}

impl Series {
    pub const ALL: [Series; 2] = [Series::CpuPercent, Series::MemoryPercent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Series::CpuPercent => "cpu",
            Series::MemoryPercent => "memory",
        }
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Series {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Ok(Series::CpuPercent),
            "memory" | "mem" | "ram" => Ok(Series::MemoryPercent),
            _ => Err(EngineError::UnknownSeries(s.to_string())),
        }
    }
}
