//! One task per session, folding its events strictly in arrival order.

use std::sync::Arc;

use ferry_core::types::SessionId;
use ferry_core::{AgentEvent, EventKind, SessionState, process_event};
use tokio::sync::{mpsc, oneshot, watch};

use crate::config::RuntimeConfig;
use crate::effect::EffectHandler;
use crate::error::{Error, Result};
use crate::store::SessionStore;

pub(crate) enum SessionCmd {
    Process {
        event: Box<AgentEvent>,
        reply: Option<oneshot::Sender<Arc<SessionState>>>,
    },
    Persist {
        reply: oneshot::Sender<Result<()>>,
    },
    Close {
        reply: oneshot::Sender<Result<()>>,
    },
}

/// Cheap, cloneable address of a running session actor.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    cmd_tx: mpsc::Sender<SessionCmd>,
    state_rx: watch::Receiver<Arc<SessionState>>,
}

impl SessionHandle {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Queues an event without waiting for it to be folded.
    pub async fn submit(&self, event: AgentEvent) -> Result<()> {
        self.cmd_tx
            .send(SessionCmd::Process {
                event: Box::new(event),
                reply: None,
            })
            .await
            .map_err(|_| Error::ChannelClosed)
    }

    /// Folds an event and returns the state it produced.
    pub async fn process(&self, event: AgentEvent) -> Result<Arc<SessionState>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCmd::Process {
                event: Box::new(event),
                reply: Some(reply_tx),
            })
            .await
            .map_err(|_| Error::ChannelClosed)?;
        reply_rx.await.map_err(|_| Error::ChannelClosed)
    }

    /// Latest committed state.
    pub fn state(&self) -> Arc<SessionState> {
        Arc::clone(&self.state_rx.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<SessionState>> {
        self.state_rx.clone()
    }

    pub async fn persist(&self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCmd::Persist { reply: reply_tx })
            .await
            .map_err(|_| Error::ChannelClosed)?;
        reply_rx.await.map_err(|_| Error::ChannelClosed)?
    }

    /// Persists the session and stops the actor once queued events are folded.
    pub async fn close(&self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCmd::Close { reply: reply_tx })
            .await
            .map_err(|_| Error::ChannelClosed)?;
        reply_rx.await.map_err(|_| Error::ChannelClosed)?
    }
}

struct SessionActor {
    session_id: SessionId,
    state: Arc<SessionState>,
    state_tx: watch::Sender<Arc<SessionState>>,
    store: Arc<dyn SessionStore>,
    effects: Arc<dyn EffectHandler>,
    persist_on_turn_end: bool,
}

fn ends_turn(kind: EventKind) -> bool {
    matches!(
        kind,
        EventKind::Complete | EventKind::Error | EventKind::TypedError | EventKind::Interrupted
    )
}

impl SessionActor {
    async fn run(mut self, mut cmd_rx: mpsc::Receiver<SessionCmd>) {
        tracing::debug!(session_id = %self.session_id, "Session actor started");

        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                SessionCmd::Process { event, reply } => {
                    let state = self.handle_event(*event).await;
                    if let Some(reply) = reply {
                        let _ = reply.send(state);
                    }
                }
                SessionCmd::Persist { reply } => {
                    let _ = reply.send(self.persist().await);
                }
                SessionCmd::Close { reply } => {
                    cmd_rx.close();
                    // Fold whatever was queued before the close.
                    while let Some(pending) = cmd_rx.recv().await {
                        match pending {
                            SessionCmd::Process { event, reply } => {
                                let state = self.handle_event(*event).await;
                                if let Some(reply) = reply {
                                    let _ = reply.send(state);
                                }
                            }
                            SessionCmd::Persist { reply } | SessionCmd::Close { reply } => {
                                let _ = reply.send(Err(Error::ChannelClosed));
                            }
                        }
                    }
                    let _ = reply.send(self.persist().await);
                    break;
                }
            }
        }

        tracing::debug!(session_id = %self.session_id, "Session actor stopped");
    }

    async fn handle_event(&mut self, event: AgentEvent) -> Arc<SessionState> {
        let kind = event.kind();
        let outcome = process_event(&self.state, event);

        if !Arc::ptr_eq(&self.state, &outcome.state) {
            self.state = Arc::clone(&outcome.state);
            self.state_tx.send_replace(Arc::clone(&outcome.state));
        }

        for effect in outcome.effects {
            if let Err(e) = self.effects.handle(effect).await {
                tracing::error!(
                    session_id = %self.session_id,
                    event_type = %kind,
                    error = %e,
                    "Effect handler failed"
                );
            }
        }

        if self.persist_on_turn_end
            && ends_turn(kind)
            && let Err(e) = self.persist().await
        {
            tracing::error!(session_id = %self.session_id, error = %e, "Failed to persist session");
        }

        outcome.state
    }

    async fn persist(&self) -> Result<()> {
        self.store.save(&self.state.session).await?;
        tracing::debug!(
            session_id = %self.session_id,
            messages = self.state.session.messages.len(),
            "Session persisted"
        );
        Ok(())
    }
}

pub fn spawn_session_actor(
    state: SessionState,
    store: Arc<dyn SessionStore>,
    effects: Arc<dyn EffectHandler>,
    config: &RuntimeConfig,
) -> SessionHandle {
    let session_id = state.session_id().clone();
    let state = Arc::new(state);
    let (cmd_tx, cmd_rx) = mpsc::channel(config.command_channel_capacity.max(1));
    let (state_tx, state_rx) = watch::channel(Arc::clone(&state));

    let actor = SessionActor {
        session_id: session_id.clone(),
        state,
        state_tx,
        store,
        effects,
        persist_on_turn_end: config.persist_on_turn_end,
    };
    tokio::spawn(actor.run(cmd_rx));

    SessionHandle {
        session_id,
        cmd_tx,
        state_rx,
    }
}
