//! Time-to-threshold predictions

use crate::analytics::health::wear_percent;
use crate::analytics::usage::{analyze_battery_usage, extract_charging_sessions, UsageAnalysis, MIN_HISTORY_ENTRIES};
use crate::core::{HistoryEntry, Settings, Snapshot};
use serde::{Serialize, Serializer};
use std::fmt;

/// Minutes of runtime left while discharging.
///
/// Prefers the sensor estimate, otherwise derives it from the average drain rate.
pub fn estimated_time_remaining(snapshot: &Snapshot, analysis: &UsageAnalysis) -> Option<u32> {
    if snapshot.is_charging() {
        return None;
    }

    if let Some(minutes) = snapshot.reading.time_remaining_minutes {
        return Some(minutes);
    }

    let rate = analysis.average_drain_rate.filter(|r| *r > 0.0)?;
    Some((snapshot.percent() / rate * 60.0).round() as u32)
}

/// Minutes until full, from the average rate of past charging sessions
pub fn predict_charging_time_to_full(snapshot: &Snapshot, history: &[HistoryEntry]) -> Option<u32> {
    if !snapshot.is_charging() || history.len() < MIN_HISTORY_ENTRIES {
        return None;
    }

    let sessions = extract_charging_sessions(history);
    if sessions.len() < 2 {
        return None;
    }

    let rates: Vec<f64> = sessions
        .iter()
        .map(|s| s.rate_per_minute())
        .filter(|rate| *rate > 0.0)
        .collect();
    if rates.is_empty() {
        return None;
    }

    let average = rates.iter().sum::<f64>() / rates.len() as f64;
    Some(((100.0 - snapshot.percent()).max(0.0) / average).round() as u32)
}

/// When the battery should be plugged in to respect the lower charge limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeTimeHint {
    Now,
    In { minutes: u32 },
}

impl fmt::Display for ChargeTimeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ChargeTimeHint::Now => f.write_str("now"),
            ChargeTimeHint::In { minutes } if minutes < 60 => {
                write!(f, "{} minute{}", minutes, plural(minutes))
            }
            ChargeTimeHint::In { minutes } => {
                let (hours, rest) = (minutes / 60, minutes % 60);
                write!(f, "{} hour{}", hours, plural(hours))?;
                if rest > 0 {
                    write!(f, " and {} minute{}", rest, plural(rest))?;
                }
                Ok(())
            }
        }
    }
}

impl Serialize for ChargeTimeHint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn plural(n: u32) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Time until the battery drains down to `optimalChargeCycles.lowerLimit`.
///
/// `None` while charging, once below the limit, or without a drain rate.
/// Exactly at the limit the hint is `Now`.
pub fn predict_optimal_charge_time(
    snapshot: &Snapshot,
    settings: &Settings,
    history: &[HistoryEntry],
) -> Option<ChargeTimeHint> {
    let lower = settings.optimal_charge_cycles.lower_limit;
    if snapshot.is_charging() || snapshot.percent() < lower {
        return None;
    }

    let rate = analyze_battery_usage(history)
        .average_drain_rate
        .filter(|r| *r > 0.0)?;

    let hours = (snapshot.percent() - lower) / rate;
    if hours <= 0.0 {
        return Some(ChargeTimeHint::Now);
    }

    Some(ChargeTimeHint::In {
        minutes: (hours * 60.0).round() as u32,
    })
}

/// Predictor output published with every poll
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Predictions {
    pub time_remaining_minutes: Option<u32>,
    pub minutes_to_full: Option<u32>,
    pub optimal_charge_in: Option<ChargeTimeHint>,
    pub wear_percent: Option<i32>,
}

impl Predictions {
    pub fn compute(
        snapshot: &Snapshot,
        analysis: &UsageAnalysis,
        history: &[HistoryEntry],
        settings: &Settings,
    ) -> Self {
        Self {
            time_remaining_minutes: estimated_time_remaining(snapshot, analysis),
            minutes_to_full: predict_charging_time_to_full(snapshot, history),
            optimal_charge_in: predict_optimal_charge_time(snapshot, settings, history),
            wear_percent: wear_percent(&snapshot.reading),
        }
    }
}
