//! Recent-notification log used for throttling
//!
//! Each record carries a `type`: either a severity name (throttled together
//! with its title for 15 minutes) or a category tag with its own window.

use crate::core::{NotificationRecord, Result, Severity};
use crate::db::{KeyValueStore, KeyValueStoreExt, NOTIFICATIONS_KEY};
use chrono::{DateTime, Duration, Utc};

pub const HEALTH_WARNING: &str = "health-warning";
pub const UNBALANCED_BATTERIES: &str = "unbalanced-batteries";
pub const USAGE_PREFIX: &str = "usage-";
pub const TRANSITION_PREFIX: &str = "power-";

/// How a notification is matched against the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Throttle {
    /// Same severity and title
    Title(Severity),
    /// Same category tag, whatever the title
    Category(String),
}

impl Throttle {
    pub fn usage(kind: &str) -> Self {
        Throttle::Category(format!("{}{}", USAGE_PREFIX, kind))
    }

    /// Charging-state change, keyed on the state entered
    pub fn transition(charging: bool) -> Self {
        let state = if charging { "charging" } else { "battery" };
        Throttle::Category(format!("{}{}", TRANSITION_PREFIX, state))
    }

    /// Value stored in the record's `type` field
    pub fn kind(&self) -> &str {
        match self {
            Throttle::Title(severity) => severity.as_str(),
            Throttle::Category(tag) => tag.as_str(),
        }
    }

    fn matches(&self, record: &NotificationRecord, title: &str) -> bool {
        match self {
            Throttle::Title(severity) => record.kind == severity.as_str() && record.title == title,
            Throttle::Category(tag) => record.kind == *tag,
        }
    }
}

/// Throttle window for a record type
pub fn window_for(kind: &str) -> Duration {
    match kind {
        HEALTH_WARNING => Duration::hours(24),
        UNBALANCED_BATTERIES => Duration::days(7),
        k if k.starts_with(USAGE_PREFIX) => Duration::days(3),
        k if k.starts_with(TRANSITION_PREFIX) => Duration::minutes(1),
        _ => Duration::minutes(15),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Suppressed,
}

#[derive(Debug, Clone, Default)]
pub struct NotificationLog {
    records: Vec<NotificationRecord>,
    dirty: bool,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Result<Self> {
        Ok(Self {
            records: store.load(NOTIFICATIONS_KEY)?.unwrap_or_default(),
            dirty: false,
        })
    }

    /// Persist the log if anything changed since it was loaded
    pub fn save<S: KeyValueStore + ?Sized>(&mut self, store: &mut S) -> Result<()> {
        if self.dirty {
            store.store(NOTIFICATIONS_KEY, &self.records)?;
            self.dirty = false;
        }
        Ok(())
    }

    pub fn records(&self) -> &[NotificationRecord] {
        &self.records
    }

    /// Drop records older than the window of their own type
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let before = self.records.len();
        self.records
            .retain(|record| record.timestamp >= now - window_for(&record.kind));
        if self.records.len() != before {
            self.dirty = true;
        }
    }

    /// Record the notification unless a matching one is still inside its window
    pub fn admit(&mut self, title: &str, throttle: &Throttle, now: DateTime<Utc>) -> Delivery {
        self.prune(now);

        if self.records.iter().any(|record| throttle.matches(record, title)) {
            return Delivery::Suppressed;
        }

        self.records.push(NotificationRecord {
            kind: throttle.kind().to_string(),
            title: title.to_string(),
            timestamp: now,
        });
        self.dirty = true;
        Delivery::Sent
    }
}

/// Forget every sent notification so all rules may fire again
pub fn clear_notification_history<S: KeyValueStore + ?Sized>(store: &mut S) -> Result<()> {
    store.store(NOTIFICATIONS_KEY, &Vec::<NotificationRecord>::new())?;
    log::info!("Notification history cleared");
    Ok(())
}
