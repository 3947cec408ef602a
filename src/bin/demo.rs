//! BatterySense - Demo CLI
//!
//! Replays two days of a simulated dual-pack laptop through the whole
//! pipeline in accelerated time: sensing, history, analysis, predictions
//! and throttled notifications (logged instead of shown).

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

use batterysense_lib::analytics::drain_rate_series;
use batterysense_lib::db::MemoryStore;
use batterysense_lib::hardware::{BatteryMonitor, SimulatedBattery, SimulationProfile};
use batterysense_lib::monitor::MonitorService;
use batterysense_lib::notifications::{LogNotifier, NotificationEngine, NotificationLog};

/// Simulated minutes per step; every step reads the sensor twice
const STEP_MINUTES: i64 = 5;
const STEPS: i64 = 2 * 24 * 60 / STEP_MINUTES;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    println!("==============================================");
    println!("   BatterySense - Demo CLI");
    println!("==============================================\n");

    // 1. Simulated battery
    println!("[1/3] Initializing simulated battery...");
    let profile = SimulationProfile {
        drain_per_read: 0.9,
        charge_per_read: 2.5,
        plug_at: 12.0,
        unplug_at: 96.0,
        minutes_per_read: STEP_MINUTES as f64 / 2.0,
    };
    let battery = SimulatedBattery::new(92.0)
        .with_profile(profile)
        .with_pack(64.0, 20_500.0, 24_000.0, 180);
    let monitor = BatteryMonitor::with_source(Box::new(battery));
    println!("      Source: {}\n", monitor.source_name());

    // 2. Store and engine
    println!("[2/3] Initializing in-memory store and notification engine...");
    let store = Arc::new(Mutex::new(MemoryStore::new()));
    let engine = NotificationEngine::new(Box::new(LogNotifier));
    let service = MonitorService::new(Arc::clone(&store), monitor, engine);
    println!("      Notifications are written to the log (RUST_LOG=info to see them)\n");

    // 3. Replay
    println!("[3/3] Replaying {} hours in {}-minute steps...\n", STEPS * STEP_MINUTES / 60, STEP_MINUTES);
    println!("----------------------------------------------------------");
    println!("  Hour | Level | State    | Drain %/h | Left  | Sent");
    println!("----------------------------------------------------------");

    let start = Utc::now() - Duration::minutes(STEPS * STEP_MINUTES);
    let mut previous = None;
    let mut sent = 0;
    let mut last = None;

    for step in 0..STEPS {
        let now = start + Duration::minutes(step * STEP_MINUTES);

        service.record_history(now).await;
        let Some(update) = service.poll_once(previous.as_ref(), now).await else {
            continue;
        };
        sent += update.delivered.len();

        if step % (60 / STEP_MINUTES) == 0 {
            println!(
                "  {:>4} | {:>4.0}% | {:<8} | {:>9} | {:>5} | {:>4}",
                step * STEP_MINUTES / 60,
                update.snapshot.percent(),
                if update.snapshot.is_charging() { "charging" } else { "battery" },
                update
                    .analysis
                    .average_drain_rate
                    .map(|r| format!("{:.1}", r))
                    .unwrap_or_else(|| "-".to_string()),
                update
                    .predictions
                    .time_remaining_minutes
                    .map(|m| format!("{}m", m))
                    .unwrap_or_else(|| "-".to_string()),
                sent
            );
        }

        previous = Some(update.snapshot.clone());
        last = Some(update);
    }
    println!("----------------------------------------------------------\n");

    let update = last.context("The simulated battery produced no data")?;

    println!("=== Usage Analysis ===\n");
    println!("  History entries:   {}", update.history.len());
    println!("  Drain samples:     {}", drain_rate_series(&update.history).len());
    if let Some(life) = update.analysis.estimated_life_hours {
        println!("  Estimated life:    {:.1} h per full charge", life);
    }
    if let Some(freq) = &update.analysis.charging_frequency {
        println!("  Charging events:   {}", freq.total);
        println!("  Deep discharges:   {} ({}% of charges)", freq.deep_discharge, freq.deep_discharge_percentage());
        println!("  Overcharge events: {}", freq.overcharge);
        println!("  Charging sessions: {}", freq.sessions.len());
    }
    for rec in &update.analysis.recommendations {
        println!("  [{}] {}", rec.kind.as_str(), rec.message);
    }

    println!("\n=== Predictions ===\n");
    let p = &update.predictions;
    println!("  Time remaining:    {}", p.time_remaining_minutes.map(|m| format!("{} minutes", m)).unwrap_or_else(|| "-".into()));
    println!("  Minutes to full:   {}", p.minutes_to_full.map(|m| m.to_string()).unwrap_or_else(|| "-".into()));
    println!("  Charge at limit:   {}", p.optimal_charge_in.map(|h| h.to_string()).unwrap_or_else(|| "-".into()));
    println!("  Wear:              {}", p.wear_percent.map(|w| format!("{}%", w)).unwrap_or_else(|| "-".into()));

    if let Some(report) = &update.health_report {
        println!("\n=== Health Report ===\n");
        println!("  Score: {}% ({:?})", report.score, report.tier);
        for line in &report.guidance {
            println!("  - {}", line);
        }
    }

    println!("\n=== Tips ===\n");
    for tip in &update.tips {
        println!("  {}: {}", tip.title, tip.message);
    }

    let store = store.lock().await;
    let log = NotificationLog::load(&*store)?;
    println!("\n=== Notifications ===\n");
    println!("  Dispatched over the replay: {}", sent);
    println!("  Still inside a throttle window: {}", log.records().len());

    println!("\n==============================================\n");
    Ok(())
}
