use std::{
    collections::HashSet,
    sync::{Mutex, RwLock},
};

use {async_trait::async_trait, tracing::debug};

use crate::error::Result;

/// Handle to a conversation session owned by the bot runtime.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SessionContext {
    /// Stable session key, e.g. `"T1@C1"` for a Slack workspace/channel pair.
    pub id: String,
}

/// Session/context store the connectors delegate to.
///
/// The runtime owns session state; connectors only compose keys and ask for
/// the matching context.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Return the session for `context_id`, creating it on first use.
    async fn get_or_create(&self, context_id: &str) -> Result<SessionContext>;
}

/// In-memory [`SessionStore`] for single-process deployments and tests.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    known: RwLock<HashSet<String>>,
    created: Mutex<Vec<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session keys created so far, in creation order.
    pub fn created_ids(&self) -> Vec<String> {
        self.created
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get_or_create(&self, context_id: &str) -> Result<SessionContext> {
        let fresh = {
            let mut known = self.known.write().unwrap_or_else(|e| e.into_inner());
            known.insert(context_id.to_string())
        };
        if fresh {
            debug!(context_id, "created session context");
            self.created
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(context_id.to_string());
        }
        Ok(SessionContext {
            id: context_id.to_string(),
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let store = MemorySessionStore::new();
        let first = store.get_or_create("T1@C1").await.unwrap();
        let second = store.get_or_create("T1@C1").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.created_ids(), vec!["T1@C1".to_string()]);
    }

    #[tokio::test]
    async fn distinct_keys_create_distinct_sessions() {
        let store = MemorySessionStore::new();
        store.get_or_create("T1@C1").await.unwrap();
        store.get_or_create("T1@D1").await.unwrap();
        assert_eq!(
            store.created_ids(),
            vec!["T1@C1".to_string(), "T1@D1".to_string()]
        );
    }
}
