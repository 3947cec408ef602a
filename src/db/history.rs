//! Rolling battery history
//!
//! Entries are only ever appended; pruning past the retention window is the
//! single deletion path.

use crate::core::{HistoryEntry, Result};
use crate::db::{KeyValueStore, KeyValueStoreExt, HISTORY_KEY};
use chrono::{DateTime, Duration, Utc};

pub const RETENTION_DAYS: i64 = 7;

/// Stored history in insertion order. Absent history is empty.
pub fn read_history<S: KeyValueStore + ?Sized>(store: &S) -> Result<Vec<HistoryEntry>> {
    Ok(store.load(HISTORY_KEY)?.unwrap_or_default())
}

/// Append `entry`, drop everything older than `now - 7 days` and persist.
///
/// Returns the history as persisted.
pub fn append_history<S: KeyValueStore + ?Sized>(
    store: &mut S,
    entry: HistoryEntry,
    now: DateTime<Utc>,
) -> Result<Vec<HistoryEntry>> {
    let mut history = read_history(store)?;
    history.push(entry);

    let cutoff = now - Duration::days(RETENTION_DAYS);
    let before = history.len();
    history.retain(|e| e.timestamp >= cutoff);
    if history.len() < before {
        log::debug!("Pruned {} history entries older than {}", before - history.len(), cutoff);
    }

    store.store(HISTORY_KEY, &history)?;
    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use chrono::TimeZone;

    #[test]
    fn test_empty_store_reads_empty() {
        let store = MemoryStore::new();
        assert!(read_history(&store).unwrap().is_empty());
    }

    #[test]
    fn test_append_prunes_past_retention() {
        let mut store = MemoryStore::new();
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        for day in 0..10 {
            let at = start + Duration::days(day);
            append_history(&mut store, HistoryEntry::new(at, 50.0, false), at).unwrap();
        }

        let history = read_history(&store).unwrap();
        // days 2..=9 remain: day 2 sits exactly on the cutoff
        assert_eq!(history.len(), 8);
        assert_eq!(history[0].timestamp, start + Duration::days(2));
        assert_eq!(history.last().unwrap().timestamp, start + Duration::days(9));
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let mut store = MemoryStore::new();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        append_history(&mut store, HistoryEntry::new(now, 40.0, false), now).unwrap();
        let earlier = now - Duration::minutes(5);
        let history = append_history(&mut store, HistoryEntry::new(earlier, 41.0, false), now).unwrap();

        assert_eq!(history[0].percentage, 40.0);
        assert_eq!(history[1].percentage, 41.0);
    }
}
