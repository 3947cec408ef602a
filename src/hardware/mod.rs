//! Battery sensing module
//!
//! Provides abstractions for reading raw battery state from various sources:
//! - Linux: kernel power_supply class via sysfs
//! - Simulated: deterministic battery for demos and tests
//!
//! Raw readings are folded into a single [`Snapshot`] by the aggregator.

mod aggregator;
#[cfg(target_os = "linux")]
mod linux;
mod simulated;

pub use aggregator::aggregate;
#[cfg(target_os = "linux")]
pub use linux::SysfsBatterySource;
pub use simulated::{SimulatedBattery, SimulationProfile};

use crate::core::{BatteryReading, Error, Result, Snapshot};
use chrono::{DateTime, Utc};

/// Battery monitor that abstracts over different sensor sources
pub struct BatteryMonitor {
    source: Box<dyn BatterySource + Send + Sync>,
}

impl BatteryMonitor {
    /// Create a new battery monitor, automatically detecting the host source
    pub fn new() -> Result<Self> {
        #[cfg(target_os = "linux")]
        {
            match SysfsBatterySource::new() {
                Ok(sysfs) => {
                    log::info!("Using power_supply sysfs for battery monitoring");
                    return Ok(Self::with_source(Box::new(sysfs)));
                }
                Err(e) => log::debug!("power_supply sysfs unavailable: {}", e),
            }
        }

        Err(Error::HardwareNotSupported(
            "No battery sensor available on this platform".to_string(),
        ))
    }

    /// Create a monitor backed by a simulated battery
    pub fn simulated() -> Self {
        Self::with_source(Box::new(SimulatedBattery::new(100.0)))
    }

    pub fn with_source(source: Box<dyn BatterySource + Send + Sync>) -> Self {
        Self { source }
    }

    /// Get the name of the current battery source
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Read and aggregate the current battery state.
    ///
    /// Sensor failures are logged and yield `None`; the next poll is the retry.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Option<Snapshot> {
        match self.source.read() {
            Ok(readings) => {
                let snapshot = aggregate(readings, now);
                if snapshot.is_none() {
                    log::debug!("{} returned no batteries", self.source.name());
                }
                snapshot
            }
            Err(Error::HardwareNotSupported(msg)) => {
                log::debug!("No battery data: {}", msg);
                None
            }
            Err(e) => {
                log::warn!("Failed to read battery from {}: {}", self.source.name(), e);
                None
            }
        }
    }
}

/// Trait for battery sensor sources
pub trait BatterySource {
    /// One reading per physical battery, in a stable order
    fn read(&self) -> Result<Vec<BatteryReading>>;

    /// Name of this battery source
    fn name(&self) -> &str;
}
