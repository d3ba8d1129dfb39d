// Terminal presentation: text panels and sparklines over the engine's read interface.
// Formatting and unit conversion live here; the engine only hands out raw readings.

use serde::Serialize;

use crate::engine::EngineHandle;
use crate::models::{HistorySample, MetricSnapshot, Reading};

const MB: u64 = 1024 * 1024;
const GB: u64 = 1024 * 1024 * 1024;
const NA: &str = "N/A";
const SPARK_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// One titled block of readout lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    pub title: &'static str,
    pub lines: Vec<String>,
}

impl Panel {
    pub fn render(&self) -> String {
        let mut out = format!("[ {} ]\n", self.title);
        for line in &self.lines {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

fn temp_line(temp: Option<f64>) -> String {
    match temp {
        Some(t) => format!("Temp: {:.1}°C", t),
        None => format!("Temp: {}", NA),
    }
}

/// Readout panels in display order: CPU, MEMORY, GPU, DISK, NETWORK.
pub fn panels(snapshot: &MetricSnapshot) -> Vec<Panel> {
    // Both CPU and MEMORY show the one temperature read this cycle.
    let cpu_temp = snapshot.cpu_temperature();

    let cpu = match &snapshot.cpu {
        Reading::Available(c) => vec![format!("Usage: {:.1}%", c.percent), temp_line(c.temperature)],
        Reading::Unavailable => vec![format!("Usage: {}", NA), temp_line(None)],
    };

    let memory = match &snapshot.memory {
        Reading::Available(m) => vec![
            format!("Used: {} MB", m.used_bytes / MB),
            format!("Total: {} MB", m.total_bytes / MB),
            format!("Usage: {:.1}%", m.percent),
            temp_line(cpu_temp),
        ],
        Reading::Unavailable => vec![
            format!("Used: {}", NA),
            format!("Total: {}", NA),
            format!("Usage: {}", NA),
            temp_line(cpu_temp),
        ],
    };

    let gpu = match &snapshot.gpu {
        Some(g) => vec![
            g.name.clone(),
            format!("Usage: {:.1}%", g.utilization_percent),
            format!("Memory: {:.1}%", g.memory_percent),
            format!("Temp: {:.0}°C", g.temperature),
        ],
        None => vec![NA.to_string()],
    };

    let disk = match &snapshot.disk {
        Reading::Available(d) => vec![
            format!("Mount: {}", d.mount_point),
            format!("Used: {} GB", d.used_bytes / GB),
            format!("Total: {} GB", d.total_bytes / GB),
            format!("Usage: {:.1}%", d.percent),
        ],
        Reading::Unavailable => vec![
            format!("Used: {}", NA),
            format!("Total: {}", NA),
            format!("Usage: {}", NA),
        ],
    };

    let network = match &snapshot.network {
        Reading::Available(n) => vec![
            format!("Sent: {} MB", n.bytes_sent / MB),
            format!("Recv: {} MB", n.bytes_received / MB),
        ],
        Reading::Unavailable => vec![format!("Sent: {}", NA), format!("Recv: {}", NA)],
    };

    vec![
        Panel { title: "CPU", lines: cpu },
        Panel { title: "MEMORY", lines: memory },
        Panel { title: "GPU", lines: gpu },
        Panel { title: "DISK", lines: disk },
        Panel { title: "NETWORK", lines: network },
    ]
}

/// Render the last `width` samples of a 0-100 % series as block glyphs.
pub fn sparkline(samples: &[HistorySample], width: usize) -> String {
    let start = samples.len().saturating_sub(width);
    samples[start..]
        .iter()
        .map(|s| {
            let v = if s.value.is_finite() {
                s.value.clamp(0.0, 100.0)
            } else {
                0.0
            };
            let idx = ((v / 100.0) * (SPARK_GLYPHS.len() - 1) as f64).round() as usize;
            SPARK_GLYPHS[idx.min(SPARK_GLYPHS.len() - 1)]
        })
        .collect()
}

fn graph(title: &str, samples: &[HistorySample], width: usize) -> String {
    let last = samples
        .last()
        .map(|s| format!("{:.1}%", s.value))
        .unwrap_or_else(|| NA.to_string());
    format!(
        "[ {} ] {} ({} samples)\n  {}\n",
        title,
        last,
        samples.len(),
        sparkline(samples, width)
    )
}

/// Full text frame: readout panels followed by the CPU and memory graphs.
pub fn render_text(handle: &EngineHandle) -> String {
    let view = handle.view();
    let mut out = String::new();
    for panel in panels(&view.snapshot) {
        out.push_str(&panel.render());
    }
    out.push_str(&graph("CPU Usage Graph", &view.cpu_history, view.retention));
    out.push_str(&graph(
        "Memory Usage Graph",
        &view.memory_history,
        view.retention,
    ));
    out
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonFrame<'a> {
    snapshot: &'a MetricSnapshot,
    cpu_history: &'a [HistorySample],
    memory_history: &'a [HistorySample],
}

/// One-line JSON frame with the snapshot and both series.
pub fn render_json(handle: &EngineHandle) -> serde_json::Result<String> {
    let view = handle.view();
    serde_json::to_string(&JsonFrame {
        snapshot: &view.snapshot,
        cpu_history: &view.cpu_history,
        memory_history: &view.memory_history,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(value: f64) -> HistorySample {
        HistorySample {
            timestamp: 0,
            value,
        }
    }

    #[test]
    fn sparkline_maps_range_to_glyphs() {
        let line = sparkline(&[sample(0.0), sample(50.0), sample(100.0)], 10);
        assert_eq!(line, "▁▅█");
    }

    #[test]
    fn sparkline_keeps_most_recent_samples() {
        let line = sparkline(&[sample(100.0), sample(0.0), sample(0.0)], 2);
        assert_eq!(line, "▁▁");
    }

    #[test]
    fn sparkline_clamps_out_of_range() {
        assert_eq!(sparkline(&[sample(150.0), sample(-3.0)], 5), "█▁");
    }
}
