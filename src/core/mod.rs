//! Core module - configuration, user settings, errors and common types

mod config;
mod error;
mod settings;
mod types;

pub use config::{Config, GeneralConfig, NotificationConfig, StorageConfig};
pub use error::{Error, Result};
pub use settings::{OptimalChargeCycles, Settings, MAX_CHECK_INTERVAL_MINUTES};
pub use types::{
    AggregationMethod, BatteryReading, ChargingSession, HistoryEntry, LastBatteryState,
    MultiBattery, NotificationRecord, Severity, Snapshot,
};
