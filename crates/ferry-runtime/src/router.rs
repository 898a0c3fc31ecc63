use std::collections::HashMap;
use std::sync::Arc;

use ferry_core::types::SessionId;
use ferry_core::{AgentEvent, SessionState};
use tokio::sync::Mutex;

use crate::actor::{SessionHandle, spawn_session_actor};
use crate::config::RuntimeConfig;
use crate::effect::EffectHandler;
use crate::error::{Error, Result};
use crate::store::SessionStore;

/// Routes events to per-session actors, opening sessions on first use.
pub struct EventRouter {
    sessions: Mutex<HashMap<SessionId, SessionHandle>>,
    store: Arc<dyn SessionStore>,
    effects: Arc<dyn EffectHandler>,
    config: RuntimeConfig,
}

impl EventRouter {
    pub fn new(
        store: Arc<dyn SessionStore>,
        effects: Arc<dyn EffectHandler>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            store,
            effects,
            config,
        }
    }

    /// Returns the running actor for `session_id`, spawning it from the
    /// stored session (or a fresh one) if needed.
    pub async fn open_session(&self, session_id: &SessionId) -> Result<SessionHandle> {
        let mut sessions = self.sessions.lock().await;
        self.handle_for(&mut sessions, session_id).await
    }

    async fn handle_for(
        &self,
        sessions: &mut HashMap<SessionId, SessionHandle>,
        session_id: &SessionId,
    ) -> Result<SessionHandle> {
        if let Some(handle) = sessions.get(session_id) {
            return Ok(handle.clone());
        }

        let state = match self.store.load(session_id).await? {
            Some(session) => {
                tracing::info!(%session_id, messages = session.messages.len(), "Resuming stored session");
                SessionState::from_session(session)
            }
            None => {
                tracing::info!(%session_id, "Creating session");
                let session = ferry_core::Session::new(session_id.clone())
                    .with_permission_mode(self.config.default_permission_mode);
                SessionState::from_session(session)
            }
        };

        let handle = spawn_session_actor(
            state,
            Arc::clone(&self.store),
            Arc::clone(&self.effects),
            &self.config,
        );
        sessions.insert(session_id.clone(), handle.clone());
        Ok(handle)
    }

    /// Queues the event on its session's actor. Holding the session map while
    /// submitting orders it against a concurrent `close_session`: the event is
    /// either drained by the closing actor or folded by a new one resumed from
    /// the store after the close persisted.
    pub async fn route(&self, event: AgentEvent) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        let handle = self.handle_for(&mut sessions, event.session_id()).await?;
        handle.submit(event).await
    }

    /// Decodes one wire event and routes it.
    pub async fn route_json(&self, line: &str) -> Result<()> {
        let event = AgentEvent::from_json(line)?;
        self.route(event).await
    }

    pub async fn session(&self, session_id: &SessionId) -> Option<SessionHandle> {
        self.sessions.lock().await.get(session_id).cloned()
    }

    pub async fn state(&self, session_id: &SessionId) -> Result<Arc<SessionState>> {
        self.session(session_id)
            .await
            .map(|handle| handle.state())
            .ok_or_else(|| Error::SessionNotFound {
                session_id: session_id.clone(),
            })
    }

    pub async fn active_sessions(&self) -> Vec<SessionId> {
        let mut ids: Vec<_> = self.sessions.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Persists the session and stops its actor. Events routed to the session
    /// meanwhile wait until the close has persisted.
    pub async fn close_session(&self, session_id: &SessionId) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        let handle = sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound {
                session_id: session_id.clone(),
            })?;
        let closed = handle.close().await;
        sessions.remove(session_id);
        closed?;
        tracing::info!(%session_id, "Session closed");
        Ok(())
    }

    /// Closes every session. Failures are logged and the rest still close.
    pub async fn shutdown(&self) {
        let mut sessions = self.sessions.lock().await;
        for (session_id, handle) in sessions.drain() {
            if let Err(e) = handle.close().await {
                tracing::error!(%session_id, error = %e, "Failed to close session during shutdown");
            }
        }
        tracing::info!("Event router stopped");
    }
}
