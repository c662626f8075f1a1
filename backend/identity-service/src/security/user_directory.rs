//! Subject lookup used to revoke tokens of deleted users.
//!
//! A token can verify cryptographically long after its subject was removed.
//! When a directory is configured the authority asks it after every
//! successful decode and answers `revoked` for unknown subjects.

use crate::db;
use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashSet;
use sqlx::PgPool;

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// `Ok(false)` means the subject is gone; `Err` is an authority fault.
    async fn subject_exists(&self, subject_id: i32) -> Result<bool>;
}

/// PostgreSQL-backed directory over the `users` table
#[derive(Debug, Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn subject_exists(&self, subject_id: i32) -> Result<bool> {
        db::users::subject_exists(&self.pool, subject_id).await
    }
}

/// Directory held in memory, for local runs and tests
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    subjects: DashSet<i32>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subjects(subjects: impl IntoIterator<Item = i32>) -> Self {
        Self {
            subjects: subjects.into_iter().collect(),
        }
    }

    pub fn insert(&self, subject_id: i32) {
        self.subjects.insert(subject_id);
    }

    /// Returns whether the subject was present.
    pub fn remove(&self, subject_id: i32) -> bool {
        self.subjects.remove(&subject_id).is_some()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn subject_exists(&self, subject_id: i32) -> Result<bool> {
        Ok(self.subjects.contains(&subject_id))
    }
}
