//! BatterySense - Main entry point
//!
//! Background battery monitor with health analytics and throttled desktop
//! notifications, plus a few commands to inspect and tweak its state.

use anyhow::{bail, Context, Result};
use batterysense_lib::core::Config;
use batterysense_lib::db::history::read_history;
use batterysense_lib::db::settings::{load_settings, reset_settings, update_settings};
use batterysense_lib::db::Database;
use batterysense_lib::hardware::BatteryMonitor;
use batterysense_lib::monitor::{MonitorService, PollUpdate};
use batterysense_lib::notifications::{clear_notification_history, dispatch, NotificationEngine};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load();
    let log_level = config
        .as_ref()
        .map(|c| c.general.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    log::info!("Starting BatterySense v{}", env!("CARGO_PKG_VERSION"));

    // Load or create configuration
    let config = config.unwrap_or_else(|e| {
        log::warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let simulate = take_flag(&mut args, "--simulate");

    let mut db = match &config.storage.database_path {
        Some(path) => Database::open(path),
        None => Database::new(),
    }
    .context("Failed to initialize database")?;

    match args.first().map(String::as_str) {
        None | Some("run") => run(config, db, simulate).await,
        Some("status") => {
            let service = build_service(&config, db, simulate)?;
            match service.inspect(Utc::now()).await {
                Some(update) => println!("{}", serde_json::to_string_pretty(&update)?),
                None => bail!("No battery data available"),
            }
            Ok(())
        }
        Some("settings") => {
            let settings = match args.get(1) {
                Some(patch) => {
                    let patch: serde_json::Value =
                        serde_json::from_str(patch).context("Settings patch is not valid JSON")?;
                    update_settings(&mut db, &patch)?
                }
                None => load_settings(&db)?,
            };
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
        Some("reset-settings") => {
            let settings = reset_settings(&mut db)?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
        Some("clear-notifications") => {
            clear_notification_history(&mut db)?;
            println!("Notification history cleared");
            Ok(())
        }
        Some("history") => {
            let history = read_history(&db)?;
            println!("{}", serde_json::to_string_pretty(&history)?);
            Ok(())
        }
        Some(_) => {
            print_usage();
            Ok(())
        }
    }
}

fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    let before = args.len();
    args.retain(|a| a != flag);
    args.len() != before
}

fn build_service(config: &Config, db: Database, simulate: bool) -> Result<MonitorService<Database>> {
    let monitor = if simulate {
        log::info!("Using simulated battery");
        BatteryMonitor::simulated()
    } else {
        BatteryMonitor::new().context("No battery sensor found (pass --simulate to use a simulated battery)")?
    };

    let engine = NotificationEngine::new(dispatch::from_config(&config.notifications));

    Ok(MonitorService::new(Arc::new(Mutex::new(db)), monitor, engine)
        .with_refresh_interval(Duration::from_secs(config.general.refresh_interval_secs)))
}

async fn run(config: Config, db: Database, simulate: bool) -> Result<()> {
    let service = build_service(&config, db, simulate)?;
    let cancel = CancellationToken::new();
    let (tx, mut rx) = watch::channel::<Option<PollUpdate>>(None);

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {}", e);
        }
        log::info!("Shutdown requested");
        shutdown.cancel();
    });

    let reporter = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let update = rx.borrow_and_update().clone();
            if let Some(update) = update.filter(|u| u.significant_change) {
                log::info!(
                    "Battery {:.0}% ({}), health {}",
                    update.snapshot.percent(),
                    if update.snapshot.is_charging() { "charging" } else { "on battery" },
                    update.snapshot.health_score
                );
            }
        }
    });

    service.run(cancel, tx).await;
    // the sender is gone once run returns, which ends the reporter
    let _ = reporter.await;

    log::info!("BatterySense stopped");
    Ok(())
}

fn print_usage() {
    println!("Usage:");
    println!("  batterysense [run]                 - Monitor the battery until Ctrl-C");
    println!("  batterysense status                - Print one snapshot with analysis as JSON");
    println!("  batterysense settings              - Print the current settings");
    println!("  batterysense settings '<json>'     - Merge a partial JSON object into the settings");
    println!("  batterysense reset-settings        - Restore default settings");
    println!("  batterysense clear-notifications   - Forget recently sent notifications");
    println!("  batterysense history               - Print the stored battery history");
    println!();
    println!("  --simulate                         - Use a simulated battery instead of the host sensor");
}
