// CPU temperature via sysinfo components, with labelled fallback lookup.

use std::sync::Mutex;
use sysinfo::Components;

use super::{Probe, ProbeOutcome};
use crate::error::SourceError;

/// Looks up the CPU package sensor by label prefix (e.g. "coretemp", then "cpu_thermal").
pub struct TemperatureProbe {
    components: Mutex<Components>,
    labels: Vec<String>,
}

impl TemperatureProbe {
    pub fn new(labels: Vec<String>) -> Self {
        Self {
            components: Mutex::new(Components::new_with_refreshed_list()),
            labels,
        }
    }
}

/// Pick the first sensor matching the first label that matches anything.
///
/// Labels are tried in order; a sensor matches when its label starts with the
/// wanted label, ignoring case. No label matching → `Absent`. Matching sensor
/// with no current value → `Failed`.
pub fn select_temperature<'a>(
    sensors: impl IntoIterator<Item = (&'a str, Option<f32>)>,
    labels: &[String],
) -> ProbeOutcome<f64> {
    let sensors: Vec<(String, Option<f32>)> = sensors
        .into_iter()
        .map(|(label, temp)| (label.to_lowercase(), temp))
        .collect();

    for wanted in labels {
        let wanted = wanted.to_lowercase();
        if wanted.is_empty() {
            continue;
        }
        if let Some((label, temp)) = sensors.iter().find(|(l, _)| l.starts_with(&wanted)) {
            return match temp {
                Some(t) if t.is_finite() => ProbeOutcome::Reading(*t as f64),
                _ => ProbeOutcome::Failed(SourceError::collection(format!(
                    "sensor {} has no reading",
                    label
                ))),
            };
        }
    }
    ProbeOutcome::Absent
}

impl Probe for TemperatureProbe {
    type Reading = f64;

    fn name(&self) -> &'static str {
        "cpu_temperature"
    }

    fn probe(&self) -> ProbeOutcome<f64> {
        let Ok(mut components) = self.components.lock() else {
            return ProbeOutcome::Failed(SourceError::LockPoisoned(
                "sysinfo components lock".into(),
            ));
        };
        components.refresh(false);
        select_temperature(
            components.list().iter().map(|c| (c.label(), c.temperature())),
            &self.labels,
        )
    }
}
