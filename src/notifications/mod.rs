//! Notification decision engine
//!
//! Maps the current snapshot and usage analysis to advisories, throttles
//! them against the recent-notification log and hands survivors to a
//! [`Notifier`]. All rules are independent and may fire in the same cycle.

pub mod dispatch;
pub mod throttle;

pub use dispatch::{DesktopNotifier, LogNotifier, Notifier};
pub use throttle::{clear_notification_history, Delivery, NotificationLog, Throttle};

use crate::analytics::advice::battery_spread;
use crate::analytics::{capacity_percent, UsageAnalysis};
use crate::core::{LastBatteryState, Result, Settings, Severity, Snapshot};
use crate::db::settings::load_settings;
use crate::db::{KeyValueStore, KeyValueStoreExt, LAST_STATE_KEY};
use chrono::{DateTime, Utc};
use serde::Serialize;

const APP: &str = "BatterySense";

/// Sub-battery or aggregate level treated as critical
const CRITICAL_LEVEL: f64 = 5.0;
/// Low-battery alerts escalate to critical at or below this level
const LOW_CRITICAL_LEVEL: f64 = 10.0;
const HEALTH_WARNING_LEVEL: u32 = 50;
const IMBALANCE_SPREAD: f64 = 20.0;

/// One notification candidate produced by the rules
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Advisory {
    pub title: String,
    pub message: String,
    pub severity: Severity,
    #[serde(skip)]
    pub throttle: Throttle,
}

impl Advisory {
    fn new(title: &str, message: String, severity: Severity) -> Self {
        Self {
            title: format!("{} - {}", APP, title),
            message,
            severity,
            throttle: Throttle::Title(severity),
        }
    }

    fn throttled_as(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }
}

/// Outcome of one decision cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub delivered: Vec<Advisory>,
    pub suppressed: usize,
    /// State the caller persists for the next cycle
    pub last_state: LastBatteryState,
}

/// Evaluate every rule for the current snapshot.
///
/// `previous` is the state persisted by the last cycle; no transition notice
/// is produced without one.
pub fn advisories(
    snapshot: &Snapshot,
    analysis: &UsageAnalysis,
    settings: &Settings,
    previous: Option<&LastBatteryState>,
) -> Vec<Advisory> {
    let mut out = Vec::new();
    let percent = snapshot.percent();
    let charging = snapshot.is_charging();
    let shown = percent.round();

    for (index, battery) in snapshot.batteries().iter().enumerate() {
        if !battery.is_charging() && battery.percent() <= CRITICAL_LEVEL {
            out.push(Advisory::new(
                &format!("Battery {} Critical", index + 1),
                format!(
                    "Battery {} is critically low ({}%)! Save your work and connect to power immediately.",
                    index + 1,
                    battery.percent().round()
                ),
                Severity::Critical,
            ));
        }
    }

    if let Some((min, max)) = battery_spread(snapshot).filter(|(min, max)| max - min > IMBALANCE_SPREAD) {
        out.push(
            Advisory::new(
                "Unbalanced Batteries",
                format!(
                    "Your batteries are significantly unbalanced ({}% - {}%). Consider running a battery calibration.",
                    min.round(),
                    max.round()
                ),
                Severity::Warning,
            )
            .throttled_as(Throttle::Category(throttle::UNBALANCED_BATTERIES.to_string())),
        );
    }

    if charging && percent >= settings.overcharge_threshold {
        out.push(Advisory::new(
            "Overcharging Alert",
            format!(
                "Your battery is at {}%. To maximize battery health, consider unplugging your charger.",
                shown
            ),
            Severity::Warning,
        ));
    }

    if !charging && percent <= settings.low_battery_threshold {
        let severity = if percent <= LOW_CRITICAL_LEVEL {
            Severity::Critical
        } else {
            Severity::Warning
        };
        out.push(Advisory::new(
            "Low Battery Alert",
            format!("Your battery is at {}%. Connect your charger soon.", shown),
            severity,
        ));
    }

    if !charging && percent <= CRITICAL_LEVEL {
        out.push(Advisory::new(
            "Critical Battery Level",
            "Your battery is critically low! Save your work and connect to power immediately.".to_string(),
            Severity::Critical,
        ));
    }

    let optimal = &settings.optimal_charge_cycles;
    if optimal.enabled {
        if charging && percent >= optimal.upper_limit {
            out.push(Advisory::new(
                "Optimal Charging",
                format!(
                    "Battery reached {}%. For optimal battery life, unplug your charger now.",
                    shown
                ),
                Severity::Info,
            ));
        } else if !charging && percent <= optimal.lower_limit {
            out.push(Advisory::new(
                "Optimal Charging",
                format!(
                    "Battery at {}%. For optimal battery life, it's a good time to charge now.",
                    shown
                ),
                Severity::Info,
            ));
        }
    }

    if let Some(health) = capacity_percent(&snapshot.reading).filter(|h| *h < HEALTH_WARNING_LEVEL) {
        out.push(
            Advisory::new(
                "Battery Health Warning",
                format!(
                    "Your battery health is at {}%. Consider battery replacement soon.",
                    health
                ),
                Severity::Warning,
            )
            .throttled_as(Throttle::Category(throttle::HEALTH_WARNING.to_string())),
        );
    }

    for recommendation in &analysis.recommendations {
        out.push(
            Advisory::new("Battery Usage Tip", recommendation.message.clone(), Severity::Info)
                .throttled_as(Throttle::usage(recommendation.kind.as_str())),
        );
    }

    if let Some(previous) = previous.filter(|p| p.is_charging != charging) {
        let (title, message) = if charging {
            ("Charging Started", format!("Your laptop is now charging ({}%).", shown))
        } else {
            (
                "Running on Battery",
                format!(
                    "Your laptop is now running on battery power ({}%, was {}%).",
                    shown,
                    previous.percentage.round()
                ),
            )
        };
        out.push(Advisory::new(title, message, Severity::Info).throttled_as(Throttle::transition(charging)));
    }

    out
}

/// Stateless engine around a dispatch backend; state is passed in and returned
pub struct NotificationEngine {
    notifier: Box<dyn Notifier + Send + Sync>,
}

impl NotificationEngine {
    pub fn new(notifier: Box<dyn Notifier + Send + Sync>) -> Self {
        Self { notifier }
    }

    /// Dispatch `advisory` unless a matching one is still inside its throttle window
    pub fn send_if_not_recent(
        &self,
        log: &mut NotificationLog,
        advisory: &Advisory,
        now: DateTime<Utc>,
    ) -> Delivery {
        let delivery = log.admit(&advisory.title, &advisory.throttle, now);
        if delivery == Delivery::Sent {
            log::info!("Notification [{}] {}", advisory.severity, advisory.title);
            self.notifier.notify(
                &advisory.title,
                &advisory.message,
                advisory.severity,
                advisory.severity.plays_sound(),
            );
        } else {
            log::debug!("Suppressed recent notification: {}", advisory.title);
        }
        delivery
    }

    /// Run one decision cycle against an already loaded log
    pub fn evaluate(
        &self,
        snapshot: &Snapshot,
        analysis: &UsageAnalysis,
        settings: &Settings,
        previous: Option<&LastBatteryState>,
        log: &mut NotificationLog,
        now: DateTime<Utc>,
    ) -> Decision {
        let mut decision = Decision {
            delivered: Vec::new(),
            suppressed: 0,
            last_state: LastBatteryState::from(snapshot),
        };

        if !settings.notifications_enabled {
            return decision;
        }

        for advisory in advisories(snapshot, analysis, settings, previous) {
            match self.send_if_not_recent(log, &advisory, now) {
                Delivery::Sent => decision.delivered.push(advisory),
                Delivery::Suppressed => decision.suppressed += 1,
            }
        }

        decision
    }

    /// Load settings, last state and log from `store`, decide, then persist
    /// the log and the new last state.
    pub fn check_battery_notifications<S: KeyValueStore + ?Sized>(
        &self,
        store: &mut S,
        snapshot: &Snapshot,
        analysis: &UsageAnalysis,
        now: DateTime<Utc>,
    ) -> Result<Decision> {
        let settings = load_settings(store)?;
        let previous: Option<LastBatteryState> = store.load(LAST_STATE_KEY)?;
        let mut log = NotificationLog::load(store)?;

        let decision = self.evaluate(snapshot, analysis, &settings, previous.as_ref(), &mut log, now);

        log.save(store)?;
        store.store(LAST_STATE_KEY, &decision.last_state)?;
        Ok(decision)
    }
}
