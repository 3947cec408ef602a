//! Linux battery source via /sys/class/power_supply
//!
//! Each `power_supply` entry whose `type` is `Battery` becomes one reading.
//! Energy counters (`energy_*`, µWh) are preferred over charge counters
//! (`charge_*`, µAh); both are reported in milli-units.

use crate::core::{BatteryReading, Error, Result};
use crate::hardware::BatterySource;
use std::fs;
use std::path::{Path, PathBuf};

const POWER_SUPPLY_ROOT: &str = "/sys/class/power_supply";

/// Battery source reading the kernel power_supply class
pub struct SysfsBatterySource {
    root: PathBuf,
}

impl SysfsBatterySource {
    pub fn new() -> Result<Self> {
        Self::with_root(POWER_SUPPLY_ROOT)
    }

    /// Use another directory laid out like `/sys/class/power_supply`
    pub fn with_root(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.exists() {
            return Err(Error::HardwareNotSupported(format!(
                "{} not available",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    fn battery_dirs(&self) -> Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if read_string(&path, "type").as_deref() == Some("Battery") {
                dirs.push(path);
            }
        }
        dirs.sort();
        Ok(dirs)
    }
}

impl BatterySource for SysfsBatterySource {
    fn read(&self) -> Result<Vec<BatteryReading>> {
        let dirs = self.battery_dirs()?;
        if dirs.is_empty() {
            return Err(Error::HardwareNotSupported("No battery found".to_string()));
        }

        dirs.iter().map(|dir| read_battery(dir)).collect()
    }

    fn name(&self) -> &str {
        "Linux power_supply"
    }
}

fn read_battery(dir: &Path) -> Result<BatteryReading> {
    let percent = read_number(dir, "capacity").ok_or_else(|| {
        Error::Sensor(format!("{}: capacity unreadable", dir.display()))
    })?;

    let status = read_string(dir, "status").unwrap_or_default();
    // "Not charging": on AC but held below a charge threshold
    let is_charging = matches!(status.as_str(), "Charging" | "Full" | "Not charging");

    let mut reading = BatteryReading::new(percent.clamp(0.0, 100.0), is_charging);

    let (full, design, now, rate) = if dir.join("energy_full").exists() {
        ("energy_full", "energy_full_design", "energy_now", "power_now")
    } else {
        ("charge_full", "charge_full_design", "charge_now", "current_now")
    };

    reading.max_capacity = read_number(dir, full).filter(|v| *v > 0.0).map(|v| v / 1000.0);
    reading.design_capacity = read_number(dir, design).filter(|v| *v > 0.0).map(|v| v / 1000.0);
    reading.cycle_count = read_number(dir, "cycle_count")
        .filter(|c| *c > 0.0)
        .map(|c| c as u32);

    if !is_charging {
        if let (Some(remaining), Some(drain)) = (read_number(dir, now), read_number(dir, rate)) {
            // some drivers report a negative current while discharging
            let drain = drain.abs();
            if drain > 0.0 {
                reading.time_remaining_minutes = Some((remaining / drain * 60.0).round() as u32);
            }
        }
    }

    Ok(reading)
}

fn read_string(dir: &Path, name: &str) -> Option<String> {
    fs::read_to_string(dir.join(name))
        .ok()
        .map(|s| s.trim().to_string())
}

fn read_number(dir: &Path, name: &str) -> Option<f64> {
    read_string(dir, name).and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_supply(root: &Path, name: &str, files: &[(&str, &str)]) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        for (file, value) in files {
            fs::write(dir.join(file), format!("{}\n", value)).unwrap();
        }
    }

    #[test]
    fn test_missing_root() {
        assert!(matches!(
            SysfsBatterySource::with_root("/definitely/not/here"),
            Err(Error::HardwareNotSupported(_))
        ));
    }

    #[test]
    fn test_no_battery_entries() {
        let tmp = TempDir::new().unwrap();
        write_supply(tmp.path(), "AC", &[("type", "Mains"), ("online", "1")]);

        let source = SysfsBatterySource::with_root(tmp.path()).unwrap();
        assert!(matches!(source.read(), Err(Error::HardwareNotSupported(_))));
    }

    #[test]
    fn test_energy_battery_discharging() {
        let tmp = TempDir::new().unwrap();
        write_supply(tmp.path(), "AC", &[("type", "Mains")]);
        write_supply(
            tmp.path(),
            "BAT0",
            &[
                ("type", "Battery"),
                ("status", "Discharging"),
                ("capacity", "62"),
                ("energy_full", "45600000"),
                ("energy_full_design", "57000000"),
                ("energy_now", "28272000"),
                ("power_now", "14136000"),
                ("cycle_count", "312"),
            ],
        );

        let source = SysfsBatterySource::with_root(tmp.path()).unwrap();
        let readings = source.read().unwrap();
        assert_eq!(readings.len(), 1);

        let bat = &readings[0];
        assert_eq!(bat.percent, 62.0);
        assert!(!bat.is_charging);
        assert_eq!(bat.max_capacity, Some(45_600.0));
        assert_eq!(bat.design_capacity, Some(57_000.0));
        assert_eq!(bat.cycle_count, Some(312));
        assert_eq!(bat.time_remaining_minutes, Some(120));
    }

    #[test]
    fn test_charge_counters_sorted_and_plugged_states_count_as_charging() {
        let tmp = TempDir::new().unwrap();
        write_supply(
            tmp.path(),
            "BAT1",
            &[
                ("type", "Battery"),
                ("status", "Full"),
                ("capacity", "100"),
                ("charge_full", "3000000"),
                ("charge_full_design", "4000000"),
                ("cycle_count", "0"),
            ],
        );
        write_supply(
            tmp.path(),
            "BAT0",
            &[("type", "Battery"), ("status", "Charging"), ("capacity", "40")],
        );
        write_supply(
            tmp.path(),
            "BAT2",
            &[
                ("type", "Battery"),
                ("status", "Not charging"),
                ("capacity", "75"),
                ("energy_now", "30000000"),
                ("power_now", "0"),
            ],
        );

        let source = SysfsBatterySource::with_root(tmp.path()).unwrap();
        let readings = source.read().unwrap();
        assert_eq!(readings.len(), 3);
        assert_eq!(readings[0].percent, 40.0);
        assert!(readings[0].is_charging);
        assert_eq!(readings[0].max_capacity, None);

        assert!(readings[1].is_charging);
        assert_eq!(readings[1].max_capacity, Some(3000.0));
        assert_eq!(readings[1].cycle_count, None);
        assert_eq!(readings[1].time_remaining_minutes, None);

        assert_eq!(readings[2].percent, 75.0);
        assert!(readings[2].is_charging);
        assert_eq!(readings[2].time_remaining_minutes, None);
    }

    #[test]
    fn test_unreadable_capacity_is_a_sensor_error() {
        let tmp = TempDir::new().unwrap();
        write_supply(tmp.path(), "BAT0", &[("type", "Battery"), ("capacity", "n/a")]);

        let source = SysfsBatterySource::with_root(tmp.path()).unwrap();
        assert!(matches!(source.read(), Err(Error::Sensor(_))));
    }
}
