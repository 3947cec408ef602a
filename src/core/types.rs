//! Common types used across the application

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw reading from a single battery, as reported by the sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryReading {
    /// State of charge, 0-100
    pub percent: f64,
    pub is_charging: bool,
    /// Full-charge capacity as measured now (same unit as `design_capacity`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_capacity: Option<f64>,
    /// Capacity the battery was designed for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_capacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_count: Option<u32>,
    /// Only meaningful while discharging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_remaining_minutes: Option<u32>,
}

impl BatteryReading {
    pub fn new(percent: f64, is_charging: bool) -> Self {
        Self {
            percent,
            is_charging,
            max_capacity: None,
            design_capacity: None,
            cycle_count: None,
            time_remaining_minutes: None,
        }
    }

    pub fn with_capacity(mut self, max_capacity: f64, design_capacity: f64) -> Self {
        self.max_capacity = Some(max_capacity);
        self.design_capacity = Some(design_capacity);
        self
    }

    pub fn with_cycle_count(mut self, cycle_count: u32) -> Self {
        self.cycle_count = Some(cycle_count);
        self
    }

    pub fn with_time_remaining(mut self, minutes: u32) -> Self {
        self.time_remaining_minutes = Some(minutes);
        self
    }

    /// `max / design` when both capacities are known and positive
    pub fn capacity_ratio(&self) -> Option<f64> {
        match (self.max_capacity, self.design_capacity) {
            (Some(max), Some(design)) if max > 0.0 && design > 0.0 => Some(max / design),
            _ => None,
        }
    }
}

/// How the percentage of a multi-battery snapshot was combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AggregationMethod {
    /// Every sub-battery reported a full-charge capacity
    CapacityWeighted,
    ArithmeticMean,
}

/// Per-battery breakdown attached to an aggregate snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiBattery {
    pub count: usize,
    pub batteries: Vec<Snapshot>,
    pub method: AggregationMethod,
}

/// A normalized battery reading at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(flatten)]
    pub reading: BatteryReading,
    /// Derived 0-100 score (can exceed 100 when measured capacity beats the design value)
    pub health_score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi: Option<MultiBattery>,
    pub taken_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn percent(&self) -> f64 {
        self.reading.percent
    }

    pub fn is_charging(&self) -> bool {
        self.reading.is_charging
    }

    /// Sub-battery snapshots, empty for single-battery hosts
    pub fn batteries(&self) -> &[Snapshot] {
        self.multi.as_ref().map(|m| m.batteries.as_slice()).unwrap_or(&[])
    }
}

/// Reduced form of a snapshot kept in the rolling history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub percentage: f64,
    pub is_charging: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_percentages: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_charging: Option<Vec<bool>>,
}

impl HistoryEntry {
    pub fn new(timestamp: DateTime<Utc>, percentage: f64, is_charging: bool) -> Self {
        Self {
            timestamp,
            percentage,
            is_charging,
            capacity: None,
            cycle_count: None,
            battery_count: None,
            battery_percentages: None,
            battery_charging: None,
        }
    }

    pub fn from_snapshot(snapshot: &Snapshot, timestamp: DateTime<Utc>) -> Self {
        let mut entry = Self::new(timestamp, snapshot.percent(), snapshot.is_charging());
        entry.capacity = snapshot.reading.max_capacity;
        entry.cycle_count = snapshot.reading.cycle_count;

        if let Some(multi) = &snapshot.multi {
            entry.battery_count = Some(multi.count);
            entry.battery_percentages = Some(multi.batteries.iter().map(|b| b.percent()).collect());
            entry.battery_charging = Some(multi.batteries.iter().map(|b| b.is_charging()).collect());
        }

        entry
    }
}

/// A contiguous run of charging samples with a positive net gain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingSession {
    pub start_time: DateTime<Utc>,
    pub start_percentage: f64,
    pub end_time: DateTime<Utc>,
    pub end_percentage: f64,
    pub duration_minutes: f64,
}

impl ChargingSession {
    /// Percent gained per minute of charging
    pub fn rate_per_minute(&self) -> f64 {
        if self.duration_minutes <= 0.0 {
            return 0.0;
        }
        (self.end_percentage - self.start_percentage) / self.duration_minutes
    }
}

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }

    /// Only critical advisories play a sound
    pub fn plays_sound(&self) -> bool {
        matches!(self, Severity::Critical)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry of the recent-notification log used for throttling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Severity name or a category tag such as `health-warning`
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub timestamp: DateTime<Utc>,
}

/// Charging state remembered between decision cycles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastBatteryState {
    pub is_charging: bool,
    pub percentage: f64,
}

impl From<&Snapshot> for LastBatteryState {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            is_charging: snapshot.is_charging(),
            percentage: snapshot.percent(),
        }
    }
}
