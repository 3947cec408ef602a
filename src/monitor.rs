//! Two-cadence battery polling
//!
//! A fast timer (default 5s) takes a snapshot, publishes it to consumers and
//! runs the notification pass. A slow timer (`checkIntervalMinutes`) appends
//! to the history. Both re-arm, ticking once immediately, when settings change.

use crate::analytics::{
    analyze_battery_usage, current_tips, health_report, HealthReport, Predictions, Tip,
    UsageAnalysis,
};
use crate::core::{HistoryEntry, Result, Settings, Snapshot, MAX_CHECK_INTERVAL_MINUTES};
use crate::db::history::{append_history, read_history};
use crate::db::settings::{load_settings, update_settings};
use crate::db::KeyValueStore;
use crate::hardware::BatteryMonitor;
use crate::notifications::{Advisory, NotificationEngine};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, Notify};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Everything consumers get from one fast tick
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollUpdate {
    pub snapshot: Snapshot,
    pub history: Vec<HistoryEntry>,
    pub significant_change: bool,
    pub analysis: UsageAnalysis,
    pub predictions: Predictions,
    pub tips: Vec<Tip>,
    pub health_report: Option<HealthReport>,
    /// Notifications dispatched during this tick
    pub delivered: Vec<Advisory>,
}

/// True on the first poll, on a charging flip, or when the level moved by at least 1%
pub fn significant_change(previous: Option<&Snapshot>, current: &Snapshot) -> bool {
    match previous {
        None => true,
        Some(prev) => {
            prev.is_charging() != current.is_charging()
                || (prev.percent() - current.percent()).abs() >= 1.0
        }
    }
}

pub struct MonitorService<S> {
    store: Arc<Mutex<S>>,
    monitor: BatteryMonitor,
    engine: NotificationEngine,
    refresh_interval: Duration,
    settings_changed: Notify,
}

impl<S: KeyValueStore + Send> MonitorService<S> {
    pub fn new(store: Arc<Mutex<S>>, monitor: BatteryMonitor, engine: NotificationEngine) -> Self {
        Self {
            store,
            monitor,
            engine,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            settings_changed: Notify::new(),
        }
    }

    pub fn with_refresh_interval(mut self, refresh_interval: Duration) -> Self {
        self.refresh_interval = refresh_interval.max(Duration::from_secs(1));
        self
    }

    /// Shared handle on the store; hold the lock for a whole read-modify-write
    pub fn store(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.store)
    }

    /// Ask a running loop to re-arm both timers
    pub fn settings_changed(&self) {
        self.settings_changed.notify_one();
    }

    /// Merge `patch` into the stored settings and re-arm the timers
    pub async fn update_settings(&self, patch: &Value) -> Result<Settings> {
        let settings = {
            let mut store = self.store.lock().await;
            update_settings(&mut *store, patch)?
        };
        self.settings_changed();
        Ok(settings)
    }

    async fn settings(&self) -> Settings {
        let store = self.store.lock().await;
        load_settings(&*store).unwrap_or_else(|e| {
            log::warn!("Failed to load settings, using defaults: {}", e);
            Settings::default()
        })
    }

    async fn check_interval_minutes(&self) -> u64 {
        self.settings()
            .await
            .check_interval_minutes
            .clamp(1, MAX_CHECK_INTERVAL_MINUTES)
    }

    /// Fast tick: snapshot, analysis and the notification pass.
    ///
    /// `None` when the sensor had nothing this cycle.
    pub async fn poll_once(&self, previous: Option<&Snapshot>, now: DateTime<Utc>) -> Option<PollUpdate> {
        self.poll(previous, now, true).await
    }

    /// Same as [`poll_once`](Self::poll_once) without notifications or state changes
    pub async fn inspect(&self, now: DateTime<Utc>) -> Option<PollUpdate> {
        self.poll(None, now, false).await
    }

    async fn poll(&self, previous: Option<&Snapshot>, now: DateTime<Utc>, notify: bool) -> Option<PollUpdate> {
        let snapshot = self.monitor.snapshot(now)?;

        let (history, settings, analysis, delivered) = {
            let mut store = self.store.lock().await;

            let history = read_history(&*store).unwrap_or_else(|e| {
                log::warn!("Failed to read battery history: {}", e);
                Vec::new()
            });
            let settings = load_settings(&*store).unwrap_or_else(|e| {
                log::warn!("Failed to load settings, using defaults: {}", e);
                Settings::default()
            });
            let analysis = analyze_battery_usage(&history);

            let delivered = if notify {
                match self
                    .engine
                    .check_battery_notifications(&mut *store, &snapshot, &analysis, now)
                {
                    Ok(decision) => decision.delivered,
                    Err(e) => {
                        log::warn!("Notification pass failed: {}", e);
                        Vec::new()
                    }
                }
            } else {
                Vec::new()
            };

            (history, settings, analysis, delivered)
        };

        Some(PollUpdate {
            significant_change: significant_change(previous, &snapshot),
            predictions: Predictions::compute(&snapshot, &analysis, &history, &settings),
            tips: current_tips(&snapshot),
            health_report: health_report(&snapshot, &history),
            snapshot,
            history,
            analysis,
            delivered,
        })
    }

    /// Slow tick: append the current snapshot to the history.
    ///
    /// Returns the retained history length, `None` when nothing was recorded.
    pub async fn record_history(&self, now: DateTime<Utc>) -> Option<usize> {
        let snapshot = self.monitor.snapshot(now)?;
        let entry = HistoryEntry::from_snapshot(&snapshot, now);

        let mut store = self.store.lock().await;
        match append_history(&mut *store, entry, now) {
            Ok(history) => {
                log::debug!("Recorded history entry ({} retained)", history.len());
                Some(history.len())
            }
            Err(e) => {
                log::warn!("Failed to save battery history: {}", e);
                None
            }
        }
    }

    /// Drive both cadences until `cancel` fires, publishing every update on `updates`
    pub async fn run(&self, cancel: CancellationToken, updates: watch::Sender<Option<PollUpdate>>) {
        log::info!(
            "Starting battery monitoring with {} ({}s refresh)",
            self.monitor.source_name(),
            self.refresh_interval.as_secs()
        );

        let mut previous: Option<Snapshot> = None;

        loop {
            let check_minutes = self.check_interval_minutes().await;

            let mut fast = interval(self.refresh_interval);
            fast.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut slow = interval(Duration::from_secs(check_minutes.saturating_mul(60)));
            slow.set_missed_tick_behavior(MissedTickBehavior::Delay);

            log::info!("History sampling every {} minute(s)", check_minutes);

            loop {
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => {
                        log::info!("Battery monitoring shutting down");
                        return;
                    }
                    _ = self.settings_changed.notified() => {
                        log::info!("Settings changed, restarting timers");
                        break;
                    }
                    _ = fast.tick() => {
                        if let Some(update) = self.poll_once(previous.as_ref(), Utc::now()).await {
                            previous = Some(update.snapshot.clone());
                            updates.send_replace(Some(update));
                        }

                        let current = self.check_interval_minutes().await;
                        if current != check_minutes {
                            log::info!("Check interval changed to {} minute(s)", current);
                            break;
                        }
                    }
                    _ = slow.tick() => {
                        self.record_history(Utc::now()).await;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BatteryReading, Error, LastBatteryState};
    use crate::db::{KeyValueStoreExt, MemoryStore, LAST_STATE_KEY, SETTINGS_KEY};
    use crate::hardware::{BatterySource, SimulatedBattery};
    use crate::notifications::LogNotifier;
    use serde_json::json;

    struct Unavailable;

    impl BatterySource for Unavailable {
        fn read(&self) -> Result<Vec<BatteryReading>> {
            Err(Error::HardwareNotSupported("no battery".to_string()))
        }

        fn name(&self) -> &str {
            "unavailable"
        }
    }

    fn service(source: Box<dyn BatterySource + Send + Sync>) -> MonitorService<MemoryStore> {
        MonitorService::new(
            Arc::new(Mutex::new(MemoryStore::new())),
            BatteryMonitor::with_source(source),
            NotificationEngine::new(Box::new(LogNotifier)),
        )
    }

    fn snapshot(percent: f64, charging: bool) -> Snapshot {
        Snapshot {
            reading: BatteryReading::new(percent, charging),
            health_score: 100,
            multi: None,
            taken_at: Utc::now(),
        }
    }

    #[test]
    fn test_significant_change() {
        let prev = snapshot(50.0, false);
        assert!(significant_change(None, &prev));
        assert!(!significant_change(Some(&prev), &snapshot(50.6, false)));
        assert!(significant_change(Some(&prev), &snapshot(49.0, false)));
        assert!(significant_change(Some(&prev), &snapshot(50.0, true)));
    }

    #[tokio::test]
    async fn test_sensor_failure_skips_the_cycle() {
        let service = service(Box::new(Unavailable));
        assert!(service.poll_once(None, Utc::now()).await.is_none());
        assert!(service.record_history(Utc::now()).await.is_none());

        let store = service.store();
        let store = store.lock().await;
        assert!(read_history(&*store).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_poll_persists_last_state() {
        let service = service(Box::new(SimulatedBattery::new(60.0)));

        let first = service.poll_once(None, Utc::now()).await.unwrap();
        assert!(first.significant_change);
        assert!(first.history.is_empty());
        assert!(first.health_report.is_none());
        assert!(!first.tips.is_empty());

        let store = service.store();
        let state: Option<LastBatteryState> = store.lock().await.load(LAST_STATE_KEY).unwrap();
        assert_eq!(state.map(|s| s.percentage), Some(first.snapshot.percent()));
    }

    #[tokio::test]
    async fn test_inspect_leaves_state_alone() {
        let service = service(Box::new(SimulatedBattery::new(60.0)));
        assert!(service.inspect(Utc::now()).await.is_some());

        let store = service.store();
        let state: Option<LastBatteryState> = store.lock().await.load(LAST_STATE_KEY).unwrap();
        assert!(state.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_and_rearms_on_settings_change() {
        let service = service(Box::new(SimulatedBattery::new(80.0)));
        let cancel = CancellationToken::new();
        let (tx, rx) = watch::channel(None);

        let driver = async {
            tokio::time::sleep(Duration::from_secs(12)).await;
            {
                let store = service.store();
                let store = store.lock().await;
                // only the immediate slow tick so far
                assert_eq!(read_history(&*store).unwrap().len(), 1);
            }

            service
                .update_settings(&json!({ "checkIntervalMinutes": 1 }))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(8)).await;
            cancel.cancel();
        };

        tokio::join!(service.run(cancel.clone(), tx), driver);

        let store = service.store();
        let store = store.lock().await;
        // re-arming ticks the slow timer once more right away
        assert_eq!(read_history(&*store).unwrap().len(), 2);

        let update = rx.borrow();
        let update = update.as_ref().unwrap();
        assert!(update.snapshot.percent() < 80.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_survives_huge_check_interval() {
        let service = service(Box::new(SimulatedBattery::new(80.0)));
        let huge = json!({ "checkIntervalMinutes": 400_000_000_000_000_000u64 });

        assert!(service.update_settings(&huge).await.is_err());
        // written behind the validator's back, e.g. by an older build
        service
            .store()
            .lock()
            .await
            .set(SETTINGS_KEY, &huge)
            .unwrap();

        let cancel = CancellationToken::new();
        let (tx, rx) = watch::channel(None);
        let driver = async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            cancel.cancel();
        };
        tokio::join!(service.run(cancel.clone(), tx), driver);

        let store = service.store();
        let store = store.lock().await;
        assert_eq!(read_history(&*store).unwrap().len(), 1);
        assert!(rx.borrow().is_some());
    }
}
