//! Person persistence.
//!
//! Handlers depend on the [`PersonStore`] trait rather than a concrete
//! backend. Production wires [`PgPersonStore`], optionally wrapped by the
//! read-through [`CachedPersonStore`]; tests use [`MemoryPersonStore`].

pub mod cached;
pub mod memory;
pub mod person;

pub use cached::CachedPersonStore;
pub use memory::MemoryPersonStore;
pub use person::PgPersonStore;

use crate::errors::ApiError;
use crate::models::Person;
use async_trait::async_trait;

/// Fields for a person insert.
#[derive(Debug, Clone)]
pub struct NewPerson {
    pub name: String,
    pub email: String,
    pub update_user: String,
}

/// Fields for a person update.
#[derive(Debug, Clone)]
pub struct PersonUpdate {
    pub name: String,
    pub email: String,
    pub update_user: String,
}

/// Person storage abstraction.
#[async_trait]
pub trait PersonStore: Send + Sync {
    /// All person records.
    async fn list(&self) -> Result<Vec<Person>, ApiError>;

    /// A single person by id, or `None` when absent.
    async fn get(&self, id: i32) -> Result<Option<Person>, ApiError>;

    /// Insert a new person and return the stored record.
    async fn insert(&self, record: NewPerson) -> Result<Person, ApiError>;

    /// Update a person; returns the number of affected records.
    async fn update(&self, id: i32, record: PersonUpdate) -> Result<u64, ApiError>;

    /// Delete a person; returns the number of affected records.
    async fn delete(&self, id: i32) -> Result<u64, ApiError>;

    /// Verify the backend is reachable.
    async fn ping(&self) -> Result<(), ApiError>;
}
