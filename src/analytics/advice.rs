//! Live tips for the current snapshot

use crate::analytics::health::capacity_percent;
use crate::core::Snapshot;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tip {
    pub title: String,
    pub message: String,
}

impl Tip {
    fn new(title: &str, message: String) -> Self {
        Self {
            title: title.to_string(),
            message,
        }
    }
}

/// Spread between the fullest and emptiest sub-battery, if there are several
pub fn battery_spread(snapshot: &Snapshot) -> Option<(f64, f64)> {
    let batteries = snapshot.batteries();
    if batteries.len() < 2 {
        return None;
    }

    let min = batteries.iter().map(|b| b.percent()).fold(f64::INFINITY, f64::min);
    let max = batteries.iter().map(|b| b.percent()).fold(f64::NEG_INFINITY, f64::max);
    Some((min, max))
}

pub fn current_tips(snapshot: &Snapshot) -> Vec<Tip> {
    let mut tips = Vec::new();
    let percent = snapshot.percent().round();

    if snapshot.is_charging() && snapshot.percent() >= 80.0 {
        tips.push(Tip::new(
            "Consider unplugging your charger",
            format!(
                "Your battery is at {}%. For optimal battery health, it's best to unplug at 80%.",
                percent
            ),
        ));
    } else if !snapshot.is_charging() && snapshot.percent() <= 20.0 {
        tips.push(Tip::new(
            "Time to charge",
            format!(
                "Your battery is at {}%. To prevent deep discharge, consider plugging in soon.",
                percent
            ),
        ));
    }

    if let Some(health) = capacity_percent(&snapshot.reading).filter(|pct| *pct < 70) {
        tips.push(Tip::new(
            "Battery health declining",
            format!(
                "Your battery health is at {}%. Consider battery replacement if you notice reduced performance.",
                health
            ),
        ));
    }

    if let Some((min, max)) = battery_spread(snapshot).filter(|(min, max)| max - min > 20.0) {
        tips.push(Tip::new(
            "Unbalanced batteries detected",
            format!(
                "Your battery levels vary significantly ({}% - {}%). Consider running a battery calibration by fully discharging and recharging once.",
                min.round(),
                max.round()
            ),
        ));
    }

    if tips.is_empty() {
        tips.push(Tip::new(
            "Battery tip",
            "Keep your battery between 20% and 80% for optimal longevity. Avoid extreme temperatures."
                .to_string(),
        ));
    }

    tips
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AggregationMethod, BatteryReading, MultiBattery};
    use chrono::Utc;

    fn snapshot(reading: BatteryReading) -> Snapshot {
        Snapshot {
            reading,
            health_score: 100,
            multi: None,
            taken_at: Utc::now(),
        }
    }

    #[test]
    fn test_general_tip_when_nothing_applies() {
        let tips = current_tips(&snapshot(BatteryReading::new(55.0, false)));
        assert_eq!(tips.len(), 1);
        assert_eq!(tips[0].title, "Battery tip");
    }

    #[test]
    fn test_unplug_and_declining_health() {
        let reading = BatteryReading::new(85.0, true).with_capacity(60.0, 100.0);
        let titles: Vec<String> = current_tips(&snapshot(reading)).into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["Consider unplugging your charger", "Battery health declining"]);
    }

    #[test]
    fn test_imbalance() {
        let mut aggregate = snapshot(BatteryReading::new(50.0, false));
        aggregate.multi = Some(MultiBattery {
            count: 2,
            batteries: vec![
                snapshot(BatteryReading::new(30.0, false)),
                snapshot(BatteryReading::new(70.0, false)),
            ],
            method: AggregationMethod::ArithmeticMean,
        });

        assert_eq!(battery_spread(&aggregate), Some((30.0, 70.0)));
        let tips = current_tips(&aggregate);
        assert_eq!(tips.len(), 1);
        assert!(tips[0].message.contains("(30% - 70%)"));
    }
}
