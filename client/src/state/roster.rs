use std::sync::Arc;

use crate::{api::types::CheckinRecord, error::StorageError, utils::storage::KeyValueStore};

use super::checkins_cache_key;

/// Most-recent-first check-in list per event session.
#[derive(Clone)]
pub struct RosterCache {
    storage: Arc<dyn KeyValueStore>,
}

impl RosterCache {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    pub fn load(&self, event_id: i64, session_id: i64) -> Result<Vec<CheckinRecord>, StorageError> {
        let key = checkins_cache_key(event_id, session_id);
        let Some(raw) = self.storage.get(&key)? else {
            return Ok(Vec::new());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|err| {
            tracing::warn!(key = %key, error = %err, "Ignoring undecodable roster cache");
            Vec::new()
        }))
    }

    pub fn replace(
        &self,
        event_id: i64,
        session_id: i64,
        records: &[CheckinRecord],
    ) -> Result<(), StorageError> {
        self.storage.set(
            &checkins_cache_key(event_id, session_id),
            &serde_json::to_string(records)?,
        )
    }

    /// Puts `record` at the head, dropping an older copy with the same id.
    pub fn prepend(
        &self,
        event_id: i64,
        session_id: i64,
        record: &CheckinRecord,
    ) -> Result<Vec<CheckinRecord>, StorageError> {
        let mut records = self.load(event_id, session_id)?;
        records.retain(|existing| existing.id != record.id);
        records.insert(0, record.clone());
        self.replace(event_id, session_id, &records)?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::types::{CheckinGuest, EventSessionRef},
        utils::storage::MemoryStore,
    };

    fn record(id: i64) -> CheckinRecord {
        CheckinRecord {
            id,
            guest: CheckinGuest {
                id: 100 + id,
                first_name: "Luis".into(),
                last_name: "Soto".into(),
                email: "luis@example.com".into(),
                registrant_type: None,
            },
            event_session: EventSessionRef {
                id: 7,
                name: "Jornada".into(),
            },
            method: "qr".into(),
            latitude: None,
            longitude: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn prepend_keeps_most_recent_first() {
        let cache = RosterCache::new(Arc::new(MemoryStore::new()));
        assert!(cache.load(3, 7).unwrap().is_empty());
        cache.prepend(3, 7, &record(1)).unwrap();
        let records = cache.prepend(3, 7, &record(2)).unwrap();
        assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 1]);

        let records = cache.prepend(3, 7, &record(1)).unwrap();
        assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
        assert!(cache.load(3, 8).unwrap().is_empty());
    }
}
