//! User-facing battery settings
//!
//! Persisted as JSON in the key-value store and re-read on every decision cycle.
//! Field names follow the camelCase surface shared with the settings UI.

use crate::core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_true")]
    pub start_at_login: bool,
    #[serde(default = "default_true")]
    pub minimize_to_tray: bool,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
    /// Warn when charging at or above this level
    #[serde(default = "default_overcharge_threshold")]
    pub overcharge_threshold: f64,
    /// Warn when discharging at or below this level
    #[serde(default = "default_low_battery_threshold")]
    pub low_battery_threshold: f64,
    /// Slow cadence: history sampling interval
    #[serde(default = "default_check_interval")]
    pub check_interval_minutes: u64,
    #[serde(default)]
    pub optimal_charge_cycles: OptimalChargeCycles,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimalChargeCycles {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_lower_limit")]
    pub lower_limit: f64,
    #[serde(default = "default_upper_limit")]
    pub upper_limit: f64,
}

/// Longest history sampling interval, one retention window
pub const MAX_CHECK_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

fn default_true() -> bool { true }
fn default_overcharge_threshold() -> f64 { 80.0 }
fn default_low_battery_threshold() -> f64 { 20.0 }
fn default_check_interval() -> u64 { 5 }
fn default_lower_limit() -> f64 { 20.0 }
fn default_upper_limit() -> f64 { 80.0 }

impl Default for Settings {
    fn default() -> Self {
        Self {
            start_at_login: true,
            minimize_to_tray: true,
            notifications_enabled: true,
            overcharge_threshold: default_overcharge_threshold(),
            low_battery_threshold: default_low_battery_threshold(),
            check_interval_minutes: default_check_interval(),
            optimal_charge_cycles: OptimalChargeCycles::default(),
        }
    }
}

impl Default for OptimalChargeCycles {
    fn default() -> Self {
        Self {
            enabled: true,
            lower_limit: default_lower_limit(),
            upper_limit: default_upper_limit(),
        }
    }
}

impl Settings {
    /// Reject values the decision engine cannot work with
    pub fn validate(&self) -> Result<()> {
        let percent_fields = [
            ("overchargeThreshold", self.overcharge_threshold),
            ("lowBatteryThreshold", self.low_battery_threshold),
            ("optimalChargeCycles.lowerLimit", self.optimal_charge_cycles.lower_limit),
            ("optimalChargeCycles.upperLimit", self.optimal_charge_cycles.upper_limit),
        ];
        for (name, value) in percent_fields {
            if !(0.0..=100.0).contains(&value) {
                return Err(Error::InvalidSettings(format!(
                    "{} must be between 0 and 100, got {}",
                    name, value
                )));
            }
        }

        if self.optimal_charge_cycles.lower_limit >= self.optimal_charge_cycles.upper_limit {
            return Err(Error::InvalidSettings(
                "optimalChargeCycles.lowerLimit must be below upperLimit".to_string(),
            ));
        }

        if !(1..=MAX_CHECK_INTERVAL_MINUTES).contains(&self.check_interval_minutes) {
            return Err(Error::InvalidSettings(format!(
                "checkIntervalMinutes must be between 1 and {}, got {}",
                MAX_CHECK_INTERVAL_MINUTES, self.check_interval_minutes
            )));
        }

        Ok(())
    }

    /// Apply a partial JSON object on top of these settings.
    ///
    /// Nested objects are merged field by field, so a patch of
    /// `{"optimalChargeCycles": {"upperLimit": 90}}` keeps the other limits.
    pub fn merged(&self, patch: &Value) -> Result<Self> {
        if !patch.is_object() {
            return Err(Error::InvalidSettings(
                "settings patch must be a JSON object".to_string(),
            ));
        }

        let mut current = serde_json::to_value(self)?;
        merge_json(&mut current, patch);

        let merged: Settings = serde_json::from_value(current)
            .map_err(|e| Error::InvalidSettings(e.to_string()))?;
        merged.validate()?;
        Ok(merged)
    }
}

fn merge_json(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                match base.get_mut(key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        merge_json(existing, value)
                    }
                    _ => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.overcharge_threshold, 80.0);
        assert_eq!(settings.optimal_charge_cycles.lower_limit, 20.0);
    }

    #[test]
    fn test_camel_case_surface() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(value["notificationsEnabled"], json!(true));
        assert_eq!(value["optimalChargeCycles"]["upperLimit"], json!(80.0));
    }

    #[test]
    fn test_nested_merge_keeps_siblings() {
        let patch = json!({ "lowBatteryThreshold": 15, "optimalChargeCycles": { "upperLimit": 90 } });
        let merged = Settings::default().merged(&patch).unwrap();

        assert_eq!(merged.low_battery_threshold, 15.0);
        assert_eq!(merged.optimal_charge_cycles.upper_limit, 90.0);
        assert_eq!(merged.optimal_charge_cycles.lower_limit, 20.0);
        assert!(merged.optimal_charge_cycles.enabled);
    }

    #[test]
    fn test_merge_rejects_inverted_limits() {
        let patch = json!({ "optimalChargeCycles": { "lowerLimit": 85 } });
        assert!(matches!(
            Settings::default().merged(&patch),
            Err(Error::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_merge_rejects_zero_interval_and_non_objects() {
        assert!(Settings::default().merged(&json!({ "checkIntervalMinutes": 0 })).is_err());
        assert!(Settings::default().merged(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_check_interval_upper_bound() {
        let week = Settings::default()
            .merged(&json!({ "checkIntervalMinutes": MAX_CHECK_INTERVAL_MINUTES }))
            .unwrap();
        assert_eq!(week.check_interval_minutes, MAX_CHECK_INTERVAL_MINUTES);

        assert!(matches!(
            Settings::default().merged(&json!({ "checkIntervalMinutes": MAX_CHECK_INTERVAL_MINUTES + 1 })),
            Err(Error::InvalidSettings(_))
        ));
        assert!(Settings::default()
            .merged(&json!({ "checkIntervalMinutes": 400_000_000_000_000_000u64 }))
            .is_err());
    }

    #[test]
    fn test_missing_fields_deserialize_to_defaults() {
        let settings: Settings = serde_json::from_value(json!({ "overchargeThreshold": 90 })).unwrap();
        assert_eq!(settings.overcharge_threshold, 90.0);
        assert_eq!(settings.check_interval_minutes, 5);
        assert_eq!(settings.optimal_charge_cycles, OptimalChargeCycles::default());
    }
}
