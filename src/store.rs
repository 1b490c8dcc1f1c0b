//! Contact store abstraction.
//!
//! Route handlers only see the `ContactStore` trait; `SqliteStore` is the
//! implementation backed by the local database.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::contact::{Contact, ContactUpdate};
use crate::db::Database;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no contact found for {0}")]
    NotFound(String),
    #[error("contact store is unavailable")]
    Poisoned,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Asynchronous contact store used by the route handlers.
#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn get_contact(&self, id: &str) -> Result<Option<Contact>, StoreError>;

    /// Apply a partial update and return the updated record.
    async fn update_contact(&self, id: &str, update: ContactUpdate) -> Result<Contact, StoreError>;

    /// Returns `true` when a contact was removed.
    async fn delete_contact(&self, id: &str) -> Result<bool, StoreError>;

    /// Contacts whose name matches `query`, in display order.
    async fn list_contacts(&self, query: Option<&str>) -> Result<Vec<Contact>, StoreError>;
}

pub struct SqliteStore {
    db: Mutex<Database>,
    latency: Duration,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self::with_latency(db, Duration::ZERO)
    }

    /// Every call waits `latency` before touching the database.
    pub fn with_latency(db: Database, latency: Duration) -> Self {
        Self {
            db: Mutex::new(db),
            latency,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database>, StoreError> {
        self.db.lock().map_err(|_| StoreError::Poisoned)
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl ContactStore for SqliteStore {
    async fn get_contact(&self, id: &str) -> Result<Option<Contact>, StoreError> {
        self.simulate_latency().await;
        let contact = self.lock()?.get(id)?;
        Ok(contact)
    }

    async fn update_contact(&self, id: &str, update: ContactUpdate) -> Result<Contact, StoreError> {
        self.simulate_latency().await;
        let updated = self.lock()?.update(id, &update)?;
        match updated {
            Some(contact) => {
                debug!(id, favorite = contact.favorite, "contact updated");
                Ok(contact)
            }
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn delete_contact(&self, id: &str) -> Result<bool, StoreError> {
        self.simulate_latency().await;
        let removed = self.lock()?.delete(id)?;
        debug!(id, removed, "contact delete");
        Ok(removed)
    }

    async fn list_contacts(&self, query: Option<&str>) -> Result<Vec<Contact>, StoreError> {
        self.simulate_latency().await;
        let contacts = self.lock()?.list(query)?;
        Ok(contacts)
    }
}

#[cfg(test)]
pub mod testing {
    //! Store doubles shared by the unit tests.

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::search;

    /// In-memory store that counts mutations and can be told to fail updates.
    #[derive(Default)]
    pub struct MemoryStore {
        contacts: Mutex<HashMap<String, Contact>>,
        pub updates: AtomicUsize,
        pub deletes: AtomicUsize,
        pub fail_updates: bool,
    }

    impl MemoryStore {
        pub fn with(contacts: impl IntoIterator<Item = Contact>) -> Self {
            let store = Self::default();
            {
                let mut map = store.contacts.lock().unwrap();
                for contact in contacts {
                    map.insert(contact.id.clone(), contact);
                }
            }
            store
        }

        pub fn failing(contacts: impl IntoIterator<Item = Contact>) -> Self {
            Self {
                fail_updates: true,
                ..Self::with(contacts)
            }
        }

        pub fn mutation_count(&self) -> usize {
            self.updates.load(Ordering::SeqCst) + self.deletes.load(Ordering::SeqCst)
        }

        pub fn snapshot(&self, id: &str) -> Option<Contact> {
            self.contacts.lock().unwrap().get(id).cloned()
        }
    }

    #[async_trait]
    impl ContactStore for MemoryStore {
        async fn get_contact(&self, id: &str) -> Result<Option<Contact>, StoreError> {
            Ok(self.snapshot(id))
        }

        async fn update_contact(
            &self,
            id: &str,
            update: ContactUpdate,
        ) -> Result<Contact, StoreError> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            if self.fail_updates {
                return Err(StoreError::Backend(anyhow::anyhow!("write rejected")));
            }
            let mut map = self.contacts.lock().unwrap();
            let current = map
                .get(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            let merged = update.apply_to(current);
            map.insert(id.to_string(), merged.clone());
            Ok(merged)
        }

        async fn delete_contact(&self, id: &str) -> Result<bool, StoreError> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            Ok(self.contacts.lock().unwrap().remove(id).is_some())
        }

        async fn list_contacts(&self, query: Option<&str>) -> Result<Vec<Contact>, StoreError> {
            let needle = query.and_then(search::normalize_query).unwrap_or_default();
            let mut contacts: Vec<Contact> = self
                .contacts
                .lock()
                .unwrap()
                .values()
                .filter(|c| {
                    search::name_key(c.first.as_deref(), c.last.as_deref()).contains(&needle)
                })
                .cloned()
                .collect();
            contacts.sort_by(|a, b| {
                let a_last = a.last.as_deref().unwrap_or_default().to_lowercase();
                let b_last = b.last.as_deref().unwrap_or_default().to_lowercase();
                a_last.cmp(&b_last).then(a.created_at.cmp(&b.created_at))
            });
            Ok(contacts)
        }
    }

    pub fn contact(id: &str, first: Option<&str>, last: Option<&str>) -> Contact {
        Contact {
            id: id.to_string(),
            first: first.map(str::to_string),
            last: last.map(str::to_string),
            avatar: None,
            twitter: None,
            notes: None,
            favorite: false,
            created_at: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::NewContact;

    fn seeded() -> (SqliteStore, String) {
        let mut db = Database::open_in_memory().unwrap();
        let created = db
            .insert(&NewContact {
                first: Some("Ada".into()),
                last: Some("Lovelace".into()),
                ..NewContact::default()
            })
            .unwrap();
        (SqliteStore::new(db), created.id)
    }

    #[tokio::test]
    async fn test_get_contact() {
        let (store, id) = seeded();
        let contact = store.get_contact(&id).await.unwrap().unwrap();
        assert_eq!(contact.first.as_deref(), Some("Ada"));
        assert!(store.get_contact("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_contact_missing_is_not_found() {
        let (store, _) = seeded();
        let err = store
            .update_contact("nope", ContactUpdate::favorite(true))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ref id) if id == "nope"));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (store, id) = seeded();
        let updated = store
            .update_contact(&id, ContactUpdate::favorite(true))
            .await
            .unwrap();
        assert!(updated.favorite);
        assert!(store.delete_contact(&id).await.unwrap());
        assert!(store.get_contact(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_contacts_filters_by_name() {
        let (store, id) = seeded();
        let all = store.list_contacts(None).await.unwrap();
        assert_eq!(all.len(), 1);
        let hits = store.list_contacts(Some("love")).await.unwrap();
        assert_eq!(hits[0].id, id);
        assert!(store.list_contacts(Some("hopper")).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_applied() {
        let db = Database::open_in_memory().unwrap();
        let store = SqliteStore::with_latency(db, Duration::from_millis(500));
        let started = tokio::time::Instant::now();
        store.get_contact("nope").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(500));
    }
}
