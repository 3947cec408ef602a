//! Notification dispatch backends
//!
//! Dispatch is fire-and-forget: failures are logged, never reported back.

use crate::core::{NotificationConfig, Severity};
use std::process::{Command, Stdio};

/// Trait for notification sinks
pub trait Notifier {
    fn notify(&self, title: &str, message: &str, severity: Severity, play_sound: bool);
}

/// Writes notifications to the log only
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, message: &str, severity: Severity, _play_sound: bool) {
        match severity {
            Severity::Critical => log::warn!("[{}] {}: {}", severity, title, message),
            _ => log::info!("[{}] {}: {}", severity, title, message),
        }
    }
}

/// Desktop notifications through `notify-send`
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    app_name: String,
    timeout_ms: u64,
}

impl DesktopNotifier {
    pub fn new(config: &NotificationConfig) -> Self {
        Self {
            app_name: config.app_name.clone(),
            timeout_ms: config.timeout_secs.saturating_mul(1000),
        }
    }

    fn urgency(severity: Severity) -> &'static str {
        match severity {
            Severity::Info => "low",
            Severity::Warning => "normal",
            Severity::Critical => "critical",
        }
    }

    fn args(&self, title: &str, message: &str, severity: Severity, play_sound: bool) -> Vec<String> {
        let mut args = vec![
            "--app-name".to_string(),
            self.app_name.clone(),
            "--urgency".to_string(),
            Self::urgency(severity).to_string(),
            "--expire-time".to_string(),
            self.timeout_ms.to_string(),
        ];
        if play_sound {
            args.push("--hint".to_string());
            args.push("string:sound-name:dialog-warning".to_string());
        }
        args.push(title.to_string());
        args.push(message.to_string());
        args
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, message: &str, severity: Severity, play_sound: bool) {
        let spawned = Command::new("notify-send")
            .args(self.args(title, message, severity, play_sound))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(mut child) => {
                // reap in the background
                std::thread::spawn(move || {
                    let _ = child.wait();
                });
            }
            Err(e) => log::warn!("Failed to send desktop notification '{}': {}", title, e),
        }
    }
}

/// Build the notifier selected by the `[notifications]` config section
pub fn from_config(config: &NotificationConfig) -> Box<dyn Notifier + Send + Sync> {
    match config.backend.as_str() {
        "desktop" => Box::new(DesktopNotifier::new(config)),
        "log" => Box::new(LogNotifier),
        other => {
            log::warn!("Unknown notification backend '{}', using log", other);
            Box::new(LogNotifier)
        }
    }
}
