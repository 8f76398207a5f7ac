//! In-memory store for tests and credential-less development.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use crate::models::{NoticeRecord, ProcessingLogEntry};

use super::{NoticeStore, StoreError};

/// Mutexed maps behind the `NoticeStore` trait. Same visible behavior as
/// the Firestore implementation, minus durability.
#[derive(Debug, Default)]
pub struct MemoryStore {
    notices: Mutex<HashMap<Uuid, NoticeRecord>>,
    logs: Mutex<Vec<ProcessingLogEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn notices(&self) -> Result<MutexGuard<'_, HashMap<Uuid, NoticeRecord>>, StoreError> {
        self.notices.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn logs(&self) -> Result<MutexGuard<'_, Vec<ProcessingLogEntry>>, StoreError> {
        self.logs.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl NoticeStore for MemoryStore {
    fn save(&self, record: &NoticeRecord) -> Result<NoticeRecord, StoreError> {
        let mut stored = record.clone();
        stored.id = Uuid::new_v4();
        let now = Utc::now();
        stored.created_at = now;
        stored.updated_at = now;

        self.notices()?.insert(stored.id, stored.clone());
        self.logs()?
            .push(ProcessingLogEntry::new(stored.id, "saved", "notice persisted"));

        Ok(stored)
    }

    fn get(&self, id: &Uuid) -> Result<Option<NoticeRecord>, StoreError> {
        Ok(self.notices()?.get(id).cloned())
    }

    fn list(&self, limit: usize) -> Result<Vec<NoticeRecord>, StoreError> {
        let mut records: Vec<NoticeRecord> = self.notices()?.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }

    fn update(&self, record: &NoticeRecord) -> Result<NoticeRecord, StoreError> {
        let mut notices = self.notices()?;
        let Some(stored) = notices.get_mut(&record.id) else {
            return Err(StoreError::NotFound(record.id));
        };

        let mut updated = record.clone();
        updated.created_at = stored.created_at;
        updated.updated_at = Utc::now();
        *stored = updated.clone();
        Ok(updated)
    }

    fn delete(&self, id: &Uuid) -> Result<bool, StoreError> {
        // Both locks held for the whole cascade so a concurrent reader
        // never sees logs for a half-deleted record.
        let mut notices = self.notices()?;
        let mut logs = self.logs()?;
        if notices.remove(id).is_none() {
            return Ok(false);
        }
        logs.retain(|entry| entry.notice_id != *id);
        Ok(true)
    }

    fn list_missing_coordinates(&self) -> Result<Vec<NoticeRecord>, StoreError> {
        let mut records: Vec<NoticeRecord> = self
            .notices()?
            .values()
            .filter(|record| !record.has_coordinates())
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }

    fn append_log(&self, entry: &ProcessingLogEntry) -> Result<(), StoreError> {
        self.logs()?.push(entry.clone());
        Ok(())
    }

    fn logs_for(&self, notice_id: &Uuid) -> Result<Vec<ProcessingLogEntry>, StoreError> {
        let mut entries: Vec<ProcessingLogEntry> = self
            .logs()?
            .iter()
            .filter(|entry| entry.notice_id == *notice_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(entries)
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.notices()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record_with_village(raw_text: &str, village: &str) -> NoticeRecord {
        let mut record = NoticeRecord::new(raw_text);
        record.village_name = Some(village.to_string());
        record
    }

    #[test]
    fn save_assigns_fresh_identity_and_logs() {
        let store = MemoryStore::new();
        let mut record = NoticeRecord::new("ગામ રીબડા");
        record.id = Uuid::nil();

        let stored = store.save(&record).unwrap();
        assert_ne!(stored.id, Uuid::nil());
        assert_eq!(store.count().unwrap(), 1);

        let logs = store.logs_for(&stored.id).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].stage, "saved");
    }

    #[test]
    fn saving_twice_never_overwrites() {
        let store = MemoryStore::new();
        let record = NoticeRecord::new("same text");

        let first = store.save(&record).unwrap();
        let second = store.save(&record).unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn notice_date_survives_a_round_trip() {
        let store = MemoryStore::new();
        let mut record = NoticeRecord::new("text");
        record.notice_date = NaiveDate::from_ymd_opt(2024, 3, 15);

        let stored = store.save(&record).unwrap();
        let fetched = store.get(&stored.id).unwrap().unwrap();
        assert_eq!(fetched.notice_date, NaiveDate::from_ymd_opt(2024, 3, 15));
    }

    #[test]
    fn list_is_newest_first_and_limited() {
        let store = MemoryStore::new();
        for i in 0..5 {
            let mut record = NoticeRecord::new(format!("notice {i}"));
            // Spread creation times out so ordering is deterministic.
            record = store.save(&record).unwrap();
            let mut bump = record.clone();
            bump.created_at = Utc::now() + chrono::Duration::milliseconds(i);
            store.notices().unwrap().insert(bump.id, bump);
        }

        let listed = store.list(3).unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].raw_text, "notice 4");
        assert_eq!(listed[1].raw_text, "notice 3");
    }

    #[test]
    fn update_restamps_and_preserves_created_at() {
        let store = MemoryStore::new();
        let stored = store.save(&record_with_village("text", "રીબડા")).unwrap();

        let mut changed = stored.clone();
        changed.village_name = Some("કોઠારિયા".into());
        changed.created_at = Utc::now() + chrono::Duration::days(1);

        let updated = store.update(&changed).unwrap();
        assert_eq!(updated.village_name.as_deref(), Some("કોઠારિયા"));
        assert_eq!(updated.created_at, stored.created_at);
        assert!(updated.updated_at >= stored.updated_at);
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let store = MemoryStore::new();
        let record = NoticeRecord::new("text");
        assert!(matches!(
            store.update(&record),
            Err(StoreError::NotFound(id)) if id == record.id
        ));
    }

    #[test]
    fn delete_cascades_logs_and_reports_existence() {
        let store = MemoryStore::new();
        let stored = store.save(&NoticeRecord::new("text")).unwrap();
        store
            .append_log(&ProcessingLogEntry::new(stored.id, "geocoded", "ok"))
            .unwrap();
        let other = store.save(&NoticeRecord::new("other")).unwrap();

        assert!(store.delete(&stored.id).unwrap());
        assert!(store.get(&stored.id).unwrap().is_none());
        assert!(store.logs_for(&stored.id).unwrap().is_empty());

        // The other record and its log line are untouched.
        assert_eq!(store.logs_for(&other.id).unwrap().len(), 1);

        assert!(!store.delete(&stored.id).unwrap());
    }

    #[test]
    fn missing_coordinates_filter() {
        let store = MemoryStore::new();
        let unlocated = store.save(&record_with_village("a", "રીબડા")).unwrap();

        let mut located = record_with_village("b", "કોઠારિયા");
        located.latitude = Some(22.25);
        located.longitude = Some(70.77);
        store.save(&located).unwrap();

        let missing = store.list_missing_coordinates().unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].id, unlocated.id);
    }

    #[test]
    fn logs_keep_happening_order() {
        let store = MemoryStore::new();
        let stored = store.save(&NoticeRecord::new("text")).unwrap();

        for (i, stage) in ["extracted", "refined", "geocoded"].iter().enumerate() {
            let mut entry = ProcessingLogEntry::new(stored.id, stage, "ok");
            entry.created_at = Utc::now() + chrono::Duration::milliseconds(i as i64 + 1);
            store.append_log(&entry).unwrap();
        }

        let stages: Vec<String> = store
            .logs_for(&stored.id)
            .unwrap()
            .into_iter()
            .map(|entry| entry.stage)
            .collect();
        assert_eq!(stages, vec!["saved", "extracted", "refined", "geocoded"]);
    }
}
