//! Durable session storage.
//!
//! Only [`Session`] is persisted; streaming buffers never outlive the actor
//! that owns them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ferry_core::Session;
use ferry_core::types::SessionId;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage backend error: {message}")]
    Backend { message: String },
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, session_id: &SessionId) -> Result<Option<Session>, StoreError>;

    async fn save(&self, session: &Session) -> Result<(), StoreError>;

    /// Returns whether a session was removed.
    async fn delete(&self, session_id: &SessionId) -> Result<bool, StoreError>;

    async fn list(&self) -> Result<Vec<SessionSummary>, StoreError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub title: Option<String>,
    pub message_count: usize,
    pub saved_at: DateTime<Utc>,
}

struct StoredSession {
    session: Session,
    saved_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, StoredSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: &SessionId) -> Result<Option<Session>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).map(|stored| stored.session.clone()))
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(
            session.id.clone(),
            StoredSession {
                session: session.clone(),
                saved_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete(&self, session_id: &SessionId) -> Result<bool, StoreError> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.remove(session_id).is_some())
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, StoreError> {
        let sessions = self.sessions.read().await;
        let mut summaries: Vec<_> = sessions
            .values()
            .map(|stored| SessionSummary {
                session_id: stored.session.id.clone(),
                title: stored.session.title.clone(),
                message_count: stored.session.messages.len(),
                saved_at: stored.saved_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::session::{ContentBlock, Message, Role};
    use ferry_core::types::MessageId;

    #[tokio::test]
    async fn save_load_delete() {
        let store = InMemorySessionStore::new();
        let mut session = Session::new(SessionId::from("s1"));
        session.title = Some("Notes".to_string());
        session.messages.push(Message::new(
            MessageId::from("u1"),
            Role::User,
            vec![ContentBlock::text("hello")],
        ));

        assert!(store.load(&session.id).await.unwrap().is_none());
        store.save(&session).await.unwrap();
        assert_eq!(store.load(&session.id).await.unwrap(), Some(session.clone()));

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title.as_deref(), Some("Notes"));
        assert_eq!(listed[0].message_count, 1);

        assert!(store.delete(&session.id).await.unwrap());
        assert!(!store.delete(&session.id).await.unwrap());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn saving_again_replaces_the_entry() {
        let store = InMemorySessionStore::new();
        let mut session = Session::new(SessionId::from("s1"));
        store.save(&session).await.unwrap();
        session.title = Some("Renamed".to_string());
        store.save(&session).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title.as_deref(), Some("Renamed"));
    }
}
