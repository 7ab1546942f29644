//! In-memory session store that drops sessions once they expire.
//!
//! Records are removed when an expired one is loaded, when a new session is
//! created and by the periodic sweep started in `init_server`, so abandoned
//! sessions cannot pile up in memory.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::*;
use std::sync::Arc;
use time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, ExpiredDeletion, SessionStore};

#[derive(Clone, Debug, Default)]
pub struct ExpiringMemoryStore(Arc<DashMap<Id, Record>>);

impl ExpiringMemoryStore {
    /// Number of sessions currently held, expired or not.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn purge_expired(&self, now: OffsetDateTime) -> usize {
        let before = self.0.len();
        self.0.retain(|_, record| record.expiry_date > now);
        before.saturating_sub(self.0.len())
    }
}

#[async_trait]
impl SessionStore for ExpiringMemoryStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        self.purge_expired(OffsetDateTime::now_utc());
        loop {
            match self.0.entry(record.id) {
                Entry::Occupied(_) => record.id = Id::default(),
                Entry::Vacant(entry) => {
                    entry.insert(record.clone());
                    return Ok(());
                }
            }
        }
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.0.insert(record.id, record.clone());
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let now = OffsetDateTime::now_utc();
        let record = self.0.get(session_id).map(|entry| entry.value().clone());
        match record {
            Some(record) if record.expiry_date > now => Ok(Some(record)),
            Some(_) => {
                self.0.remove_if(session_id, |_, record| record.expiry_date <= now);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.0.remove(session_id);
        Ok(())
    }
}

#[async_trait]
impl ExpiredDeletion for ExpiringMemoryStore {
    async fn delete_expired(&self) -> session_store::Result<()> {
        let removed = self.purge_expired(OffsetDateTime::now_utc());
        if removed > 0 {
            debug!("Removed {removed} expired sessions");
        }
        Ok(())
    }
}
