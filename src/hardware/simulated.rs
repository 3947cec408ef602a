//! Simulated battery source
//!
//! A deterministic laptop that drains on battery, gets plugged in at a low
//! mark and unplugged at a high mark. Every `read` advances one step.

use crate::core::{BatteryReading, Error, Result};
use crate::hardware::BatterySource;
use std::sync::Mutex;

/// Drain/charge behaviour shared by all packs
#[derive(Debug, Clone)]
pub struct SimulationProfile {
    /// Percent lost per read while unplugged
    pub drain_per_read: f64,
    /// Percent gained per read while plugged in
    pub charge_per_read: f64,
    /// Mean charge at which the charger gets plugged in
    pub plug_at: f64,
    /// Mean charge at which the charger gets unplugged
    pub unplug_at: f64,
    /// Wall-clock minutes one read stands for
    pub minutes_per_read: f64,
}

impl Default for SimulationProfile {
    fn default() -> Self {
        Self {
            drain_per_read: 1.5,
            charge_per_read: 4.0,
            plug_at: 15.0,
            unplug_at: 95.0,
            minutes_per_read: 5.0,
        }
    }
}

#[derive(Debug, Clone)]
struct Pack {
    percent: f64,
    max_capacity: f64,
    design_capacity: f64,
    cycle_count: u32,
}

#[derive(Debug)]
struct SimState {
    plugged: bool,
    packs: Vec<Pack>,
}

pub struct SimulatedBattery {
    state: Mutex<SimState>,
    profile: SimulationProfile,
}

impl SimulatedBattery {
    /// One worn pack (80% of design capacity, 420 cycles) starting at `percent`
    pub fn new(percent: f64) -> Self {
        Self {
            state: Mutex::new(SimState {
                plugged: false,
                packs: vec![Pack {
                    percent: percent.clamp(0.0, 100.0),
                    max_capacity: 45_600.0,
                    design_capacity: 57_000.0,
                    cycle_count: 420,
                }],
            }),
            profile: SimulationProfile::default(),
        }
    }

    pub fn with_profile(mut self, profile: SimulationProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Add another pack, e.g. a hot-swappable secondary battery
    pub fn with_pack(self, percent: f64, max_capacity: f64, design_capacity: f64, cycle_count: u32) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.packs.push(Pack {
                percent: percent.clamp(0.0, 100.0),
                max_capacity,
                design_capacity,
                cycle_count,
            });
        }
        self
    }

    fn step(&self, state: &mut SimState) {
        let delta = if state.plugged {
            self.profile.charge_per_read
        } else {
            -self.profile.drain_per_read
        };

        for pack in &mut state.packs {
            pack.percent = (pack.percent + delta).clamp(0.0, 100.0);
        }

        let mean = state.packs.iter().map(|p| p.percent).sum::<f64>() / state.packs.len().max(1) as f64;
        if state.plugged && mean >= self.profile.unplug_at {
            state.plugged = false;
            for pack in &mut state.packs {
                pack.cycle_count += 1;
            }
        } else if !state.plugged && mean <= self.profile.plug_at {
            state.plugged = true;
        }
    }
}

impl BatterySource for SimulatedBattery {
    fn read(&self) -> Result<Vec<BatteryReading>> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| Error::Sensor("simulated battery state poisoned".to_string()))?;
        self.step(&mut state);

        let readings = state
            .packs
            .iter()
            .map(|pack| {
                let reading = BatteryReading::new(pack.percent, state.plugged)
                    .with_capacity(pack.max_capacity, pack.design_capacity)
                    .with_cycle_count(pack.cycle_count);

                if state.plugged || self.profile.drain_per_read <= 0.0 {
                    return reading;
                }
                let reads_left = pack.percent / self.profile.drain_per_read;
                reading.with_time_remaining((reads_left * self.profile.minutes_per_read).round() as u32)
            })
            .collect();

        Ok(readings)
    }

    fn name(&self) -> &str {
        "Simulated battery"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drains_then_plugs_in() {
        let battery = SimulatedBattery::new(20.0);

        let first = battery.read().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].percent, 18.5);
        assert!(!first[0].is_charging);
        assert_eq!(first[0].time_remaining_minutes, Some(62));

        let mut plugged = false;
        for _ in 0..5 {
            plugged = battery.read().unwrap()[0].is_charging;
        }
        assert!(plugged);
    }

    #[test]
    fn test_unplugs_at_high_mark_and_counts_a_cycle() {
        let battery = SimulatedBattery::new(14.0);
        let start = battery.read().unwrap()[0].cycle_count;

        let mut unplugged_after = None;
        for i in 0..40 {
            let reading = &battery.read().unwrap()[0];
            if !reading.is_charging && reading.percent >= 95.0 {
                unplugged_after = Some(i);
                assert_eq!(reading.cycle_count, start.map(|c| c + 1));
                break;
            }
        }
        assert!(unplugged_after.is_some());
    }

    #[test]
    fn test_extra_packs() {
        let battery = SimulatedBattery::new(80.0).with_pack(40.0, 20_000.0, 24_000.0, 90);
        let readings = battery.read().unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[1].cycle_count, Some(90));
        assert_eq!(readings[1].percent, 38.5);
    }
}
