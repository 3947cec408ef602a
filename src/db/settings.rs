//! Settings persistence

use crate::core::{Result, Settings};
use crate::db::{KeyValueStore, KeyValueStoreExt, SETTINGS_KEY};
use serde_json::Value;

/// Persisted settings, or the defaults when none (or unreadable or invalid ones) are stored
pub fn load_settings<S: KeyValueStore + ?Sized>(store: &S) -> Result<Settings> {
    let Some(settings) = store.load::<Settings>(SETTINGS_KEY)? else {
        return Ok(Settings::default());
    };

    match settings.validate() {
        Ok(()) => Ok(settings),
        Err(e) => {
            log::warn!("Ignoring stored settings: {}", e);
            Ok(Settings::default())
        }
    }
}

pub fn save_settings<S: KeyValueStore + ?Sized>(store: &mut S, settings: &Settings) -> Result<()> {
    settings.validate()?;
    store.store(SETTINGS_KEY, settings)
}

pub fn reset_settings<S: KeyValueStore + ?Sized>(store: &mut S) -> Result<Settings> {
    let settings = Settings::default();
    store.store(SETTINGS_KEY, &settings)?;
    log::info!("Settings reset to defaults");
    Ok(settings)
}

/// Merge a partial JSON object into the stored settings and persist the result
pub fn update_settings<S: KeyValueStore + ?Sized>(store: &mut S, patch: &Value) -> Result<Settings> {
    let merged = load_settings(store)?.merged(patch)?;
    save_settings(store, &merged)?;
    log::info!("Settings updated");
    Ok(merged)
}
