//! Temporary session grant obtained from a session code.
//!
//! Expiry is enforced lazily: [`TemporarySessionStore::load`] drops a grant
//! whose `expires_at` has passed. Activation and explicit teardown are
//! published on a broadcast channel so UI collaborators can redirect without
//! a global notification bus.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::{
    api::types::{SessionLookup, TemporarySessionGrant},
    error::StorageError,
    utils::{
        storage::{KeyValueStore, StorageOp},
        time::Clock,
    },
};

use super::{CHECKINS_CACHE_PREFIX, TEMPORARY_SESSION_KEY};

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemporarySessionEvent {
    Activated { event_id: i64, session_id: i64 },
    Ended,
}

pub struct TemporarySessionStore {
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<TemporarySessionEvent>,
}

impl TemporarySessionStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            storage,
            clock,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TemporarySessionEvent> {
        self.events.subscribe()
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Persists `grant`, replacing any previous one, and announces it once.
    pub fn save(&self, grant: &TemporarySessionGrant) -> Result<(), StorageError> {
        let mut ops = self.roster_cache_removals()?;
        ops.push(StorageOp::set(
            TEMPORARY_SESSION_KEY,
            serde_json::to_string(grant)?,
        ));
        self.storage.write_batch(ops)?;

        tracing::info!(
            event_id = grant.event_id,
            session_id = grant.session_id,
            expires_at = %grant.expires_at,
            "Temporary session activated"
        );
        // No subscribers is fine.
        let _ = self.events.send(TemporarySessionEvent::Activated {
            event_id: grant.event_id,
            session_id: grant.session_id,
        });
        Ok(())
    }

    pub fn load(&self) -> Result<Option<TemporarySessionGrant>, StorageError> {
        let Some(raw) = self.storage.get(TEMPORARY_SESSION_KEY)? else {
            return Ok(None);
        };
        let grant = match serde_json::from_str::<TemporarySessionGrant>(&raw) {
            Ok(grant) => grant,
            Err(err) => {
                tracing::warn!(error = %err, "Discarding undecodable temporary session");
                self.clear()?;
                return Ok(None);
            }
        };

        if grant.is_expired_at(self.clock.now()) {
            tracing::info!(
                session_id = grant.session_id,
                expired_at = %grant.expires_at,
                "Temporary session expired"
            );
            self.clear()?;
            return Ok(None);
        }
        Ok(Some(grant))
    }

    /// Refreshes session data in place without announcing anything.
    pub fn update_silently(
        &self,
        lookup: &SessionLookup,
    ) -> Result<Option<TemporarySessionGrant>, StorageError> {
        let Some(current) = self.load()? else {
            return Ok(None);
        };
        let updated = current.refreshed_from(lookup);
        self.storage
            .set(TEMPORARY_SESSION_KEY, &serde_json::to_string(&updated)?)?;
        tracing::debug!(session_id = updated.session_id, "Temporary session refreshed");
        Ok(Some(updated))
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        let had_grant = self.storage.get(TEMPORARY_SESSION_KEY)?.is_some();
        let mut ops = self.roster_cache_removals()?;
        ops.push(StorageOp::remove(TEMPORARY_SESSION_KEY));
        self.storage.write_batch(ops)?;

        if had_grant {
            tracing::info!("Temporary session cleared");
            let _ = self.events.send(TemporarySessionEvent::Ended);
        }
        Ok(())
    }

    fn roster_cache_removals(&self) -> Result<Vec<StorageOp>, StorageError> {
        Ok(self
            .storage
            .keys_with_prefix(CHECKINS_CACHE_PREFIX)?
            .into_iter()
            .map(StorageOp::Remove)
            .collect())
    }
}
