//! Record storage seams.
//!
//! Persistence belongs to the caller. These traits describe the reads and
//! writes the lifecycle primitives need; the in-memory implementations back
//! tests and the CLI.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use crate::session::Session;
use crate::verification::Verification;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Storage for verification records.
pub trait VerificationStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<Verification>, StoreError>;

    /// Insert or overwrite a record.
    fn update(&self, verification: &Verification) -> Result<(), StoreError>;
}

/// Storage for session records.
pub trait SessionStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<Session>, StoreError>;

    /// Insert or overwrite a record.
    fn update(&self, session: &Session) -> Result<(), StoreError>;

    /// Every session of a user in a tenant, in any status.
    fn sessions_for_user(&self, tenant_id: &str, user_id: &str)
    -> Result<Vec<Session>, StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryVerificationStore {
    records: RwLock<HashMap<String, Verification>>,
}

impl MemoryVerificationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VerificationStore for MemoryVerificationStore {
    fn get(&self, id: &str) -> Result<Option<Verification>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(records.get(id).cloned())
    }

    fn update(&self, verification: &Verification) -> Result<(), StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        records.insert(verification.id.clone(), verification.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    records: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, id: &str) -> Result<Option<Session>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(records.get(id).cloned())
    }

    fn update(&self, session: &Session) -> Result<(), StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        records.insert(session.id.clone(), session.clone());
        Ok(())
    }

    fn sessions_for_user(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> Result<Vec<Session>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let mut sessions: Vec<Session> = records
            .values()
            .filter(|s| s.tenant_id == tenant_id && s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(sessions)
    }
}
