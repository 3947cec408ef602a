//! Health and wear estimation
//!
//! Pure functions over capacity and cycle-count fields. Missing inputs
//! yield `None` (or leave the score untouched) rather than an error.

use crate::analytics::usage::count_charging_events;
use crate::core::{BatteryReading, HistoryEntry, Snapshot};
use serde::{Deserialize, Serialize};

/// Cycle count after which the health score starts to decay
const CYCLE_PENALTY_START: u32 = 300;
/// Maximum share of the score the cycle penalty can remove
const MAX_CYCLE_PENALTY: f64 = 0.5;

/// Health score of a single reading.
///
/// Starts at 100, scaled by `max / design` capacity when both are known (not
/// clamped above 1) and by a linear cycle penalty past 300 cycles capped at 50%.
pub fn health_score(reading: &BatteryReading) -> u32 {
    let mut score = 100.0;

    if let Some(ratio) = reading.capacity_ratio() {
        score *= ratio;
    }

    if let Some(cycles) = reading.cycle_count {
        score *= 1.0 - cycle_penalty(cycles);
    }

    score.round().max(0.0) as u32
}

/// Fraction of the score removed for `cycles` charge cycles
pub fn cycle_penalty(cycles: u32) -> f64 {
    if cycles <= CYCLE_PENALTY_START {
        return 0.0;
    }
    (f64::from(cycles - CYCLE_PENALTY_START) / 1000.0).min(MAX_CYCLE_PENALTY)
}

/// `100 - round(100 * max / design)`, `None` when either capacity is missing
pub fn wear_percent(reading: &BatteryReading) -> Option<i32> {
    capacity_percent(reading).map(|pct| 100 - pct as i32)
}

/// Current full-charge capacity as a rounded percentage of the design capacity
pub fn capacity_percent(reading: &BatteryReading) -> Option<u32> {
    reading
        .capacity_ratio()
        .map(|ratio| (ratio * 100.0).round() as u32)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthTier {
    Good,
    Fair,
    Poor,
}

impl HealthTier {
    fn from_score(score: u32) -> Self {
        if score > 70 {
            HealthTier::Good
        } else if score > 40 {
            HealthTier::Fair
        } else {
            HealthTier::Poor
        }
    }
}

/// Composite report mixing capacity loss, cycle wear and charging habits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub score: u32,
    pub tier: HealthTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity_percent: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_count: Option<u32>,
    pub guidance: Vec<String>,
}

/// Build the health report, or `None` while fewer than 5 history entries exist
pub fn health_report(snapshot: &Snapshot, history: &[HistoryEntry]) -> Option<HealthReport> {
    if history.len() < 5 {
        return None;
    }

    let mut score = 100.0;

    let capacity = capacity_percent(&snapshot.reading);
    if let Some(pct) = capacity {
        score -= (100.0 - f64::from(pct)) * 0.5;
    }

    let cycles = snapshot.reading.cycle_count.filter(|c| *c > 0);
    if let Some(cycles) = cycles {
        let estimated_life = (100.0 - f64::from(cycles) / 5.0).max(0.0);
        score -= (100.0 - estimated_life) * 0.2;
    }

    let events = count_charging_events(history);
    let habits = (100.0
        - events.deep_discharge as f64 * 5.0
        - events.overcharge as f64 * 2.0)
        .max(0.0);
    score -= (100.0 - habits) * 0.3;

    let score = score.round().clamp(0.0, 100.0) as u32;

    Some(HealthReport {
        score,
        tier: HealthTier::from_score(score),
        capacity_percent: capacity,
        cycle_count: cycles,
        guidance: guidance(score),
    })
}

fn guidance(score: u32) -> Vec<String> {
    let lines: &[&str] = if score < 50 {
        &[
            "Your battery health is declining. Consider replacing your battery soon.",
            "Use your laptop plugged in when possible.",
            "Back up your data regularly.",
        ]
    } else if score < 80 {
        &[
            "Your battery is showing signs of wear. Keep it between 20-80% charge.",
            "Avoid exposing your laptop to high temperatures.",
            "Consider using battery saver mode when mobile.",
        ]
    } else {
        &["Your battery is in good health! Keep up the good habits."]
    };
    lines.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn reading(max: f64, design: f64, cycles: u32) -> BatteryReading {
        BatteryReading::new(60.0, false)
            .with_capacity(max, design)
            .with_cycle_count(cycles)
    }

    #[test]
    fn test_full_capacity_low_cycles_is_perfect() {
        for cycles in [0, 1, 150, 300] {
            assert_eq!(health_score(&reading(50_000.0, 50_000.0, cycles)), 100);
        }
    }

    #[test]
    fn test_cycle_penalty_is_capped() {
        assert_eq!(cycle_penalty(1300), 0.5);
        assert_eq!(cycle_penalty(5000), 0.5);
        assert_eq!(health_score(&reading(100.0, 100.0, 1300)), 50);
    }

    #[test]
    fn test_capacity_above_design_is_not_clamped() {
        assert_eq!(health_score(&reading(110.0, 100.0, 10)), 110);
    }

    #[test]
    fn test_combined_capacity_and_cycles() {
        // 0.8 * (1 - 0.2) = 0.64
        assert_eq!(health_score(&reading(80.0, 100.0, 500)), 64);
    }

    #[test]
    fn test_missing_fields() {
        let bare = BatteryReading::new(42.0, true);
        assert_eq!(health_score(&bare), 100);
        assert_eq!(wear_percent(&bare), None);
        assert_eq!(capacity_percent(&bare), None);
    }

    #[test]
    fn test_wear() {
        assert_eq!(wear_percent(&reading(45_600.0, 57_000.0, 0)), Some(20));
        assert_eq!(wear_percent(&reading(57_000.0, 57_000.0, 0)), Some(0));
    }

    #[test]
    fn test_health_report_needs_history() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let snapshot = Snapshot {
            reading: reading(40.0, 100.0, 250),
            health_score: 40,
            multi: None,
            taken_at: now,
        };

        let short: Vec<HistoryEntry> = (0..4)
            .map(|i| HistoryEntry::new(now + Duration::hours(i), 90.0 - i as f64, false))
            .collect();
        assert!(health_report(&snapshot, &short).is_none());

        let history: Vec<HistoryEntry> = (0..6)
            .map(|i| HistoryEntry::new(now + Duration::hours(i), 90.0 - i as f64, false))
            .collect();
        let report = health_report(&snapshot, &history).unwrap();
        // 100 - 60*0.5 - 50*0.2 - 0
        assert_eq!(report.score, 60);
        assert_eq!(report.tier, HealthTier::Fair);
        assert_eq!(report.capacity_percent, Some(40));
        assert_eq!(report.guidance.len(), 3);
    }
}
