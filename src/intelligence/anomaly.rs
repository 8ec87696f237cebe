//! Anomaly detection
//!
//! Flags entities whose current state looks wrong: offline devices, drained
//! batteries, sensors that stopped reporting, implausible readings and things
//! left on or open for too long.

use crate::client::EntityState;
use crate::config::IntelligenceConfig;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// How urgent an anomaly is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "critical" | "error" => Ok(Severity::Critical),
            other => Err(format!("Unknown severity: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    Unavailable,
    Unknown,
    LowBattery,
    Stale,
    OutOfRange,
    LongRunning,
    OpenTooLong,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnomalyKind::Unavailable => "unavailable",
            AnomalyKind::Unknown => "unknown",
            AnomalyKind::LowBattery => "low_battery",
            AnomalyKind::Stale => "stale",
            AnomalyKind::OutOfRange => "out_of_range",
            AnomalyKind::LongRunning => "long_running",
            AnomalyKind::OpenTooLong => "open_too_long",
        };
        f.write_str(s)
    }
}

/// One detected anomaly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub entity_id: String,
    pub friendly_name: String,
    pub kind: AnomalyKind,
    pub severity: Severity,
    pub message: String,
    pub state: String,
}

/// Counts by severity and kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalySummary {
    pub total: usize,
    pub by_severity: BTreeMap<String, usize>,
    pub by_kind: BTreeMap<String, usize>,
}

const OPENING_CLASSES: &[&str] = &["door", "window", "garage_door", "opening"];

fn anomaly(state: &EntityState, kind: AnomalyKind, severity: Severity, message: String) -> Anomaly {
    Anomaly {
        entity_id: state.entity_id.clone(),
        friendly_name: state.friendly_name().to_string(),
        kind,
        severity,
        message,
        state: state.state.clone(),
    }
}

fn to_chrono(duration: std::time::Duration) -> ChronoDuration {
    ChronoDuration::from_std(duration).unwrap_or_else(|_| ChronoDuration::days(365))
}

fn format_age(age: ChronoDuration) -> String {
    let hours = age.num_hours();
    if hours >= 48 {
        format!("{} days", hours / 24)
    } else if hours >= 1 {
        format!("{hours} hours")
    } else {
        format!("{} minutes", age.num_minutes().max(0))
    }
}

fn battery_level(state: &EntityState) -> Option<f64> {
    if state.device_class() == Some("battery") && state.domain() == "sensor" {
        return state.numeric_state();
    }
    state.attribute_f64("battery_level")
}

/// Plausible range for a numeric sensor, if its class has one
fn plausible_range(state: &EntityState) -> Option<(f64, f64)> {
    match (state.device_class(), state.unit()) {
        (Some("temperature"), Some("°F")) => Some((-58.0, 158.0)),
        (Some("temperature"), _) => Some((-50.0, 70.0)),
        (Some("humidity"), _) | (_, Some("%")) => Some((0.0, 100.0)),
        _ => None,
    }
}

fn check_entity(
    state: &EntityState,
    now: DateTime<Utc>,
    config: &IntelligenceConfig,
    found: &mut Vec<Anomaly>,
) {
    let domain = state.domain();

    match state.state.as_str() {
        "unavailable" => {
            found.push(anomaly(
                state,
                AnomalyKind::Unavailable,
                Severity::Warning,
                format!("{} is unavailable", state.friendly_name()),
            ));
            return;
        }
        "unknown" => {
            found.push(anomaly(
                state,
                AnomalyKind::Unknown,
                Severity::Info,
                format!("{} reports an unknown state", state.friendly_name()),
            ));
            return;
        }
        _ => {}
    }

    if let Some(level) = battery_level(state) {
        if level < config.low_battery_threshold {
            let severity = if level < 5.0 {
                Severity::Critical
            } else {
                Severity::Warning
            };
            found.push(anomaly(
                state,
                AnomalyKind::LowBattery,
                severity,
                format!("Battery at {level:.0}%"),
            ));
        }
    }

    if matches!(domain, "sensor" | "binary_sensor") {
        if let Some(updated) = state.last_updated {
            let age = now - updated;
            if age > to_chrono(config.stale_after) {
                found.push(anomaly(
                    state,
                    AnomalyKind::Stale,
                    Severity::Info,
                    format!("No update for {}", format_age(age)),
                ));
            }
        }
    }

    if domain == "sensor" {
        if let (Some(value), Some((min, max))) = (state.numeric_state(), plausible_range(state)) {
            if value < min || value > max {
                found.push(anomaly(
                    state,
                    AnomalyKind::OutOfRange,
                    Severity::Warning,
                    format!(
                        "Reading {value}{} outside plausible range {min}..{max}",
                        state.unit().unwrap_or_default()
                    ),
                ));
            }
        }
    }

    if state.state == "on" {
        let on_for = state.last_changed.map(|changed| now - changed);

        if matches!(domain, "light" | "switch") {
            if let Some(age) = on_for.filter(|age| *age > to_chrono(config.long_running_after)) {
                found.push(anomaly(
                    state,
                    AnomalyKind::LongRunning,
                    Severity::Info,
                    format!("On for {}", format_age(age)),
                ));
            }
        }

        let is_opening = domain == "binary_sensor"
            && state
                .device_class()
                .is_some_and(|class| OPENING_CLASSES.contains(&class));
        if is_opening {
            if let Some(age) = on_for.filter(|age| *age > to_chrono(config.open_too_long_after)) {
                found.push(anomaly(
                    state,
                    AnomalyKind::OpenTooLong,
                    Severity::Warning,
                    format!("Open for {}", format_age(age)),
                ));
            }
        }
    }
}

/// Scan states for anomalies, most severe first
pub fn detect_anomalies(
    states: &[EntityState],
    now: DateTime<Utc>,
    config: &IntelligenceConfig,
) -> Vec<Anomaly> {
    let mut found = Vec::new();
    for state in states {
        check_entity(state, now, config, &mut found);
    }

    found.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.entity_id.cmp(&b.entity_id))
            .then_with(|| a.kind.cmp(&b.kind))
    });
    found
}

pub fn summarize(anomalies: &[Anomaly]) -> AnomalySummary {
    let mut summary = AnomalySummary {
        total: anomalies.len(),
        ..Default::default()
    };
    for anomaly in anomalies {
        *summary
            .by_severity
            .entry(anomaly.severity.to_string())
            .or_default() += 1;
        *summary.by_kind.entry(anomaly.kind.to_string()).or_default() += 1;
    }
    summary
}
