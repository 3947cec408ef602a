//! Usage analysis over the battery history
//!
//! Scans consecutive history pairs to derive drain rate, charging habits and
//! recommendations, and extracts charging sessions for the predictor.

use crate::core::{ChargingSession, HistoryEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum number of history entries before anything is derived
pub const MIN_HISTORY_ENTRIES: usize = 5;

/// Pairs closer than this (in hours, ~36s) are ignored for drain estimation
const DRAIN_NOISE_FLOOR_HOURS: f64 = 0.01;

const HIGH_DRAIN_RATE: f64 = 15.0;
const DEEP_DISCHARGE_LEVEL: f64 = 20.0;
const OVERCHARGE_LEVEL: f64 = 90.0;
const OVERCHARGE_EVENT_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendationKind {
    HighDrain,
    DeepDischarge,
    Overcharge,
}

impl RecommendationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationKind::HighDrain => "high-drain",
            RecommendationKind::DeepDischarge => "deep-discharge",
            RecommendationKind::Overcharge => "overcharge",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            RecommendationKind::HighDrain => {
                "Your battery is draining quickly. Consider reducing screen brightness and closing unnecessary applications."
            }
            RecommendationKind::DeepDischarge => {
                "You frequently let your battery discharge below 20%. This can reduce battery lifespan."
            }
            RecommendationKind::Overcharge => {
                "You often keep your laptop plugged in at high charge levels. Consider unplugging once your battery reaches 80%."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub message: String,
}

impl From<RecommendationKind> for Recommendation {
    fn from(kind: RecommendationKind) -> Self {
        Self {
            kind,
            message: kind.message().to_string(),
        }
    }
}

/// Counters for plug-in events found in the history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChargingEvents {
    pub total: usize,
    pub deep_discharge: usize,
    pub overcharge: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingFrequency {
    pub total: usize,
    pub deep_discharge: usize,
    pub overcharge: usize,
    pub sessions: Vec<ChargingSession>,
}

impl ChargingFrequency {
    /// Share of charging events that started below 20%, 0 without events
    pub fn deep_discharge_percentage(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        (100.0 * self.deep_discharge as f64 / self.total as f64).round() as u32
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageAnalysis {
    /// Percent per hour while discharging
    pub average_drain_rate: Option<f64>,
    pub estimated_life_hours: Option<f64>,
    pub charging_frequency: Option<ChargingFrequency>,
    pub recommendations: Vec<Recommendation>,
}

/// One drain-rate sample, stamped with the later entry of its pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainSample {
    pub timestamp: DateTime<Utc>,
    pub rate: f64,
}

/// Analyze the history. Fewer than 5 entries yield an empty analysis.
pub fn analyze_battery_usage(history: &[HistoryEntry]) -> UsageAnalysis {
    if history.len() < MIN_HISTORY_ENTRIES {
        return UsageAnalysis::default();
    }

    let sorted = sorted_by_time(history);

    let samples = drain_samples(&sorted);
    let average_drain_rate = if samples.is_empty() {
        None
    } else {
        Some(samples.iter().map(|s| s.rate).sum::<f64>() / samples.len() as f64)
    };
    let estimated_life_hours = average_drain_rate.map(|rate| 100.0 / rate);

    let events = count_events(&sorted);

    let mut recommendations = Vec::new();
    if average_drain_rate.map_or(false, |rate| rate > HIGH_DRAIN_RATE) {
        recommendations.push(RecommendationKind::HighDrain.into());
    }
    if events.deep_discharge as f64 > events.total as f64 * 0.3 {
        recommendations.push(RecommendationKind::DeepDischarge.into());
    }
    if events.overcharge > OVERCHARGE_EVENT_LIMIT {
        recommendations.push(RecommendationKind::Overcharge.into());
    }

    UsageAnalysis {
        average_drain_rate,
        estimated_life_hours,
        charging_frequency: Some(ChargingFrequency {
            total: events.total,
            deep_discharge: events.deep_discharge,
            overcharge: events.overcharge,
            sessions: sessions_from_sorted(&sorted),
        }),
        recommendations,
    }
}

/// Drain-rate samples the analyzer averages, oldest first
pub fn drain_rate_series(history: &[HistoryEntry]) -> Vec<DrainSample> {
    drain_samples(&sorted_by_time(history))
}

/// Count plug-in, deep-discharge and overcharge events
pub fn count_charging_events(history: &[HistoryEntry]) -> ChargingEvents {
    count_events(&sorted_by_time(history))
}

/// Extract valid charging sessions (at least a minute long, positive gain)
pub fn extract_charging_sessions(history: &[HistoryEntry]) -> Vec<ChargingSession> {
    sessions_from_sorted(&sorted_by_time(history))
}

fn sorted_by_time(history: &[HistoryEntry]) -> Vec<HistoryEntry> {
    let mut sorted = history.to_vec();
    sorted.sort_by_key(|entry| entry.timestamp);
    sorted
}

fn count_events(sorted: &[HistoryEntry]) -> ChargingEvents {
    let mut events = ChargingEvents::default();

    for pair in sorted.windows(2) {
        let (prev, current) = (&pair[0], &pair[1]);

        if !prev.is_charging && current.is_charging {
            events.total += 1;
            if prev.percentage < DEEP_DISCHARGE_LEVEL {
                events.deep_discharge += 1;
            }
        }

        if prev.is_charging
            && current.is_charging
            && prev.percentage > OVERCHARGE_LEVEL
            && current.percentage > OVERCHARGE_LEVEL
        {
            events.overcharge += 1;
        }
    }

    events
}

fn drain_samples(sorted: &[HistoryEntry]) -> Vec<DrainSample> {
    sorted
        .windows(2)
        .filter(|pair| !pair[0].is_charging && !pair[1].is_charging)
        .filter_map(|pair| {
            let (prev, current) = (&pair[0], &pair[1]);
            let hours = (current.timestamp - prev.timestamp).num_milliseconds() as f64 / 3_600_000.0;
            if hours <= DRAIN_NOISE_FLOOR_HOURS {
                return None;
            }

            let rate = (prev.percentage - current.percentage) / hours;
            (rate > 0.0).then(|| DrainSample {
                timestamp: current.timestamp,
                rate,
            })
        })
        .collect()
}

fn sessions_from_sorted(sorted: &[HistoryEntry]) -> Vec<ChargingSession> {
    let mut sessions = Vec::new();
    let mut start: Option<&HistoryEntry> = None;
    let mut last_charging: Option<&HistoryEntry> = None;

    for entry in sorted {
        if entry.is_charging {
            if start.is_none() {
                start = Some(entry);
            }
            last_charging = Some(entry);
        } else if let (Some(first), Some(last)) = (start.take(), last_charging.take()) {
            sessions.extend(session(first, last));
        }
    }

    if let (Some(first), Some(last)) = (start, last_charging) {
        sessions.extend(session(first, last));
    }

    sessions
}

fn session(first: &HistoryEntry, last: &HistoryEntry) -> Option<ChargingSession> {
    let duration_minutes = (last.timestamp - first.timestamp).num_milliseconds() as f64 / 60_000.0;
    if duration_minutes < 1.0 || last.percentage <= first.percentage {
        return None;
    }

    Some(ChargingSession {
        start_time: first.timestamp,
        start_percentage: first.percentage,
        end_time: last.timestamp,
        end_percentage: last.percentage,
        duration_minutes,
    })
}
