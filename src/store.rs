//! User record storage.
//!
//! The coordinator talks to storage only through [`UserStore`], which offers
//! plain `get`/`put` plus an optimistic `compare_and_swap` so a persistent
//! backend can be slotted in without changing the state machine.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

/// An outstanding OTP challenge.
///
/// The pending language, the code and its expiry only ever exist together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub pending_language: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl Challenge {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Per-user profile plus language state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub preferred_language: String,
    pub challenge: Option<Challenge>,
}

impl UserRecord {
    /// A freshly provisioned user with no pending challenge.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        mobile: impl Into<String>,
        preferred_language: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            mobile: mobile.into(),
            preferred_language: preferred_language.into(),
            challenge: None,
        }
    }

    pub fn pending_language(&self) -> Option<&str> {
        self.challenge.as_ref().map(|c| c.pending_language.as_str())
    }
}

/// Keyed store of [`UserRecord`]s.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<UserRecord>>;

    /// Insert or replace the record stored under `record.id`.
    async fn put(&self, record: UserRecord) -> Result<()>;

    /// Replace the stored record with `new` only if it still equals `expected`.
    ///
    /// Returns `Ok(false)` when the record changed underneath the caller or
    /// no longer exists.
    async fn compare_and_swap(&self, expected: &UserRecord, new: UserRecord) -> Result<bool>;
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    records: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `records`.
    pub fn with_records(records: impl IntoIterator<Item = UserRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().map(|r| (r.id.clone(), r)).collect()),
        }
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| anyhow!("user store lock poisoned"))?;
        Ok(records.get(user_id).cloned())
    }

    async fn put(&self, record: UserRecord) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| anyhow!("user store lock poisoned"))?;
        records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn compare_and_swap(&self, expected: &UserRecord, new: UserRecord) -> Result<bool> {
        if expected.id != new.id {
            return Err(anyhow!(
                "compare_and_swap cannot change record id ({} -> {})",
                expected.id,
                new.id
            ));
        }

        let mut records = self
            .records
            .write()
            .map_err(|_| anyhow!("user store lock poisoned"))?;

        match records.get_mut(&expected.id) {
            Some(current) if current == expected => {
                *current = new;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
