//! In-memory person store.
//!
//! Used by tests in place of PostgreSQL. Mirrors the backend semantics
//! the handlers rely on, including the unique-email constraint.

use crate::errors::ApiError;
use crate::models::Person;
use crate::repositories::{NewPerson, PersonStore, PersonUpdate};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use tokio::sync::RwLock;

/// Person store backed by a process-local map.
pub struct MemoryPersonStore {
    records: RwLock<HashMap<i32, Person>>,
    next_id: AtomicI32,
}

impl MemoryPersonStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            next_id: AtomicI32::new(1),
        }
    }
}

impl Default for MemoryPersonStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersonStore for MemoryPersonStore {
    async fn list(&self) -> Result<Vec<Person>, ApiError> {
        let records = self.records.read().await;
        let mut people: Vec<Person> = records.values().cloned().collect();
        people.sort_by_key(|p| p.id);
        Ok(people)
    }

    async fn get(&self, id: i32) -> Result<Option<Person>, ApiError> {
        let records = self.records.read().await;
        Ok(records.get(&id).cloned())
    }

    async fn insert(&self, record: NewPerson) -> Result<Person, ApiError> {
        let mut records = self.records.write().await;

        if records.values().any(|p| p.email == record.email) {
            return Err(ApiError::Conflict(
                "Record duplication detected".to_string(),
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = chrono::Utc::now().naive_utc();
        let person = Person {
            id,
            name: record.name,
            email: record.email,
            created_at: now,
            updated_at: now,
            update_user: record.update_user,
        };

        records.insert(id, person.clone());
        Ok(person)
    }

    async fn update(&self, id: i32, record: PersonUpdate) -> Result<u64, ApiError> {
        let mut records = self.records.write().await;

        match records.get_mut(&id) {
            Some(person) => {
                person.name = record.name;
                person.email = record.email;
                person.update_user = record.update_user;
                person.updated_at = chrono::Utc::now().naive_utc();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, id: i32) -> Result<u64, ApiError> {
        let mut records = self.records.write().await;
        Ok(u64::from(records.remove(&id).is_some()))
    }

    async fn ping(&self) -> Result<(), ApiError> {
        Ok(())
    }
}
