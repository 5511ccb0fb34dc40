//! Read-through Redis cache decorator for a person store.
//!
//! Cache failures never fail the request: they are logged and the call
//! falls through to the inner store. Writes invalidate the affected keys
//! so readers converge on the backing store.

use crate::errors::ApiError;
use crate::models::Person;
use crate::repositories::{NewPerson, PersonStore, PersonUpdate};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::Arc;

/// Cache key for the full person list.
const ALL_PEOPLE_KEY: &str = "person:all";

fn person_key(id: i32) -> String {
    format!("person:{}", id)
}

/// Person store decorator adding a Redis read-through cache.
pub struct CachedPersonStore {
    inner: Arc<dyn PersonStore>,
    redis: ConnectionManager,
    ttl_seconds: u64,
}

impl CachedPersonStore {
    pub fn new(inner: Arc<dyn PersonStore>, redis: ConnectionManager, ttl_seconds: u64) -> Self {
        Self {
            inner,
            redis,
            ttl_seconds,
        }
    }

    async fn cache_get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.redis.clone();
        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(target: "roster.cache", key = %key, error = %e, "Discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::error!(target: "roster.cache", key = %key, error = %e, "Cache read failed");
                None
            }
        }
    }

    async fn cache_set<T: serde::Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(target: "roster.cache", key = %key, error = %e, "Cache encode failed");
                return;
            }
        };

        let mut conn = self.redis.clone();
        if let Err(e) = conn.set_ex::<_, _, ()>(key, raw, self.ttl_seconds).await {
            tracing::error!(target: "roster.cache", key = %key, error = %e, "Cache write failed");
        }
    }

    async fn cache_delete(&self, keys: &[String]) {
        let mut conn = self.redis.clone();
        if let Err(e) = conn.del::<_, ()>(keys).await {
            tracing::error!(target: "roster.cache", error = %e, "Cache invalidation failed");
        }
    }
}

#[async_trait]
impl PersonStore for CachedPersonStore {
    async fn list(&self) -> Result<Vec<Person>, ApiError> {
        if let Some(cached) = self.cache_get::<Vec<Person>>(ALL_PEOPLE_KEY).await {
            tracing::debug!(target: "roster.cache", key = ALL_PEOPLE_KEY, "Cache hit");
            return Ok(cached);
        }

        let people = self.inner.list().await?;
        self.cache_set(ALL_PEOPLE_KEY, &people).await;
        Ok(people)
    }

    async fn get(&self, id: i32) -> Result<Option<Person>, ApiError> {
        let key = person_key(id);

        if let Some(cached) = self.cache_get::<Person>(&key).await {
            tracing::debug!(target: "roster.cache", key = %key, "Cache hit");
            return Ok(Some(cached));
        }

        let person = self.inner.get(id).await?;
        if let Some(person) = &person {
            self.cache_set(&key, person).await;
        }
        Ok(person)
    }

    async fn insert(&self, record: NewPerson) -> Result<Person, ApiError> {
        let person = self.inner.insert(record).await?;

        self.cache_set(&person_key(person.id), &person).await;
        self.cache_delete(&[ALL_PEOPLE_KEY.to_string()]).await;

        Ok(person)
    }

    async fn update(&self, id: i32, record: PersonUpdate) -> Result<u64, ApiError> {
        let affected = self.inner.update(id, record).await?;

        if affected > 0 {
            self.cache_delete(&[person_key(id), ALL_PEOPLE_KEY.to_string()])
                .await;
        }

        Ok(affected)
    }

    async fn delete(&self, id: i32) -> Result<u64, ApiError> {
        let affected = self.inner.delete(id).await?;

        if affected > 0 {
            self.cache_delete(&[person_key(id), ALL_PEOPLE_KEY.to_string()])
                .await;
        }

        Ok(affected)
    }

    async fn ping(&self) -> Result<(), ApiError> {
        self.inner.ping().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_person_key_format() {
        assert_eq!(person_key(42), "person:42");
    }
}
