//! Persistence interface for session material.

use super::model::SessionData;
use crate::error::Result;
use tokio::sync::RwLock;

/// Durable storage for identity, tokens, and the XSRF token.
///
/// The auth service is the only writer; it loads, modifies, and saves the
/// whole [`SessionData`] so that implementations stay trivial.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads the stored session. A missing store yields an empty session.
    async fn load(&self) -> Result<SessionData>;

    /// Replaces the stored session.
    async fn save(&self, session: &SessionData) -> Result<()>;
}

/// Process-local session store.
///
/// Useful for one-shot tools and tests; nothing survives a restart.
#[derive(Default)]
pub struct MemorySessionStore {
    session: RwLock<SessionData>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: SessionData) -> Self {
        Self {
            session: RwLock::new(session),
        }
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<SessionData> {
        Ok(self.session.read().await.clone())
    }

    async fn save(&self, session: &SessionData) -> Result<()> {
        *self.session.write().await = session.clone();
        Ok(())
    }
}
