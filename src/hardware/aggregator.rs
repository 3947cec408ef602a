//! Snapshot aggregation
//!
//! Folds one or many raw battery readings into a single canonical snapshot.

use crate::analytics::health_score;
use crate::core::{AggregationMethod, BatteryReading, MultiBattery, Snapshot};
use chrono::{DateTime, Utc};

/// Build a snapshot from the readings of one poll. `None` when there are no readings.
pub fn aggregate(mut readings: Vec<BatteryReading>, now: DateTime<Utc>) -> Option<Snapshot> {
    match readings.len() {
        0 => None,
        1 => readings.pop().map(|reading| single(reading, now)),
        _ => Some(combine(readings, now)),
    }
}

fn single(reading: BatteryReading, now: DateTime<Utc>) -> Snapshot {
    Snapshot {
        health_score: health_score(&reading),
        reading,
        multi: None,
        taken_at: now,
    }
}

fn combine(readings: Vec<BatteryReading>, now: DateTime<Utc>) -> Snapshot {
    let count = readings.len();

    let total_max: f64 = readings.iter().filter_map(|r| r.max_capacity).sum();
    let weighted = readings.iter().all(|r| r.max_capacity.is_some()) && total_max > 0.0;

    let (percent, method) = if weighted {
        let sum: f64 = readings
            .iter()
            .map(|r| r.percent * r.max_capacity.unwrap_or(0.0))
            .sum();
        (sum / total_max, AggregationMethod::CapacityWeighted)
    } else {
        let sum: f64 = readings.iter().map(|r| r.percent).sum();
        (sum / count as f64, AggregationMethod::ArithmeticMean)
    };

    let cycles: Vec<u32> = readings.iter().filter_map(|r| r.cycle_count).collect();
    let cycle_count = if cycles.is_empty() {
        None
    } else {
        let mean = cycles.iter().map(|c| f64::from(*c)).sum::<f64>() / cycles.len() as f64;
        Some(mean.round() as u32)
    };

    let time_remaining_minutes = readings
        .iter()
        .filter(|r| !r.is_charging)
        .filter_map(|r| r.time_remaining_minutes)
        .min();

    let reading = BatteryReading {
        percent,
        is_charging: readings.iter().any(|r| r.is_charging),
        max_capacity: summed(&readings, |r| r.max_capacity),
        design_capacity: summed(&readings, |r| r.design_capacity),
        cycle_count,
        time_remaining_minutes,
    };

    let batteries = readings.into_iter().map(|r| single(r, now)).collect();

    Snapshot {
        health_score: health_score(&reading),
        reading,
        multi: Some(MultiBattery {
            count,
            batteries,
            method,
        }),
        taken_at: now,
    }
}

/// Sum with missing values counted as 0; `None` when no battery reports the field
fn summed(readings: &[BatteryReading], field: impl Fn(&BatteryReading) -> Option<f64>) -> Option<f64> {
    let values: Vec<f64> = readings.iter().filter_map(|r| field(r)).collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(percent: f64, charging: bool) -> BatteryReading {
        BatteryReading::new(percent, charging)
    }

    #[test]
    fn test_empty_and_single() {
        let now = Utc::now();
        assert!(aggregate(Vec::new(), now).is_none());

        let reading = pack(64.0, false).with_capacity(40.0, 50.0).with_cycle_count(120);
        let snapshot = aggregate(vec![reading.clone()], now).unwrap();
        assert_eq!(snapshot.reading, reading);
        assert_eq!(snapshot.health_score, 80);
        assert!(snapshot.multi.is_none());
    }

    #[test]
    fn test_identical_batteries() {
        let now = Utc::now();
        let one = pack(73.0, false)
            .with_capacity(45_000.0, 50_000.0)
            .with_cycle_count(410);

        for n in 2..=4 {
            let snapshot = aggregate(vec![one.clone(); n], now).unwrap();
            assert!((snapshot.percent() - 73.0).abs() < 1e-9);
            assert_eq!(snapshot.reading.max_capacity, Some(45_000.0 * n as f64));
            assert_eq!(snapshot.reading.design_capacity, Some(50_000.0 * n as f64));
            assert_eq!(snapshot.reading.cycle_count, Some(410));

            let multi = snapshot.multi.as_ref().unwrap();
            assert_eq!(multi.count, n);
            assert_eq!(multi.method, AggregationMethod::CapacityWeighted);
            assert!(multi.batteries.iter().all(|b| b.health_score == snapshot.health_score));
        }
    }

    #[test]
    fn test_weighted_vs_mean() {
        let now = Utc::now();
        let weighted = aggregate(
            vec![
                pack(100.0, false).with_capacity(30.0, 30.0),
                pack(0.0, false).with_capacity(10.0, 10.0),
            ],
            now,
        )
        .unwrap();
        assert!((weighted.percent() - 75.0).abs() < 1e-9);

        let mean = aggregate(
            vec![pack(100.0, false).with_capacity(30.0, 30.0), pack(0.0, false)],
            now,
        )
        .unwrap();
        assert!((mean.percent() - 50.0).abs() < 1e-9);
        assert_eq!(mean.multi.unwrap().method, AggregationMethod::ArithmeticMean);
        assert_eq!(mean.reading.max_capacity, Some(30.0));
    }

    #[test]
    fn test_charging_cycles_and_time_remaining() {
        let now = Utc::now();
        let snapshot = aggregate(
            vec![
                pack(40.0, true).with_cycle_count(100).with_time_remaining(5),
                pack(60.0, false).with_cycle_count(201).with_time_remaining(90),
                pack(50.0, false).with_time_remaining(45),
                pack(50.0, false),
            ],
            now,
        )
        .unwrap();

        assert!(snapshot.is_charging());
        assert_eq!(snapshot.reading.cycle_count, Some(151));
        assert_eq!(snapshot.reading.time_remaining_minutes, Some(45));
        assert_eq!(snapshot.reading.max_capacity, None);
        assert_eq!(snapshot.batteries().len(), 4);
    }

    #[test]
    fn test_no_time_from_charging_batteries() {
        let snapshot = aggregate(
            vec![
                pack(40.0, true).with_time_remaining(5),
                pack(60.0, false),
            ],
            Utc::now(),
        )
        .unwrap();
        assert_eq!(snapshot.reading.time_remaining_minutes, None);
    }
}
