use async_trait::async_trait;
use ferry_core::Effect;
use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error)]
pub enum EffectError {
    #[error("Effect receiver is gone")]
    Closed,
    #[error("Effect failed: {message}")]
    Failed { message: String },
}

/// Host-side interpreter for the effects a fold emits.
///
/// Called by the owning session actor, in emission order, after the new
/// state has been published. Errors are logged; they never undo the fold.
#[async_trait]
pub trait EffectHandler: Send + Sync {
    async fn handle(&self, effect: Effect) -> Result<(), EffectError>;
}

/// Drops every effect.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardEffects;

#[async_trait]
impl EffectHandler for DiscardEffects {
    async fn handle(&self, effect: Effect) -> Result<(), EffectError> {
        tracing::trace!(session_id = %effect.session_id(), "Discarding effect");
        Ok(())
    }
}

/// Forwards effects to a channel the host drains on its own task.
#[derive(Debug, Clone)]
pub struct ChannelEffectHandler {
    tx: mpsc::UnboundedSender<Effect>,
}

impl ChannelEffectHandler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Effect>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EffectHandler for ChannelEffectHandler {
    async fn handle(&self, effect: Effect) -> Result<(), EffectError> {
        self.tx.send(effect).map_err(|_| EffectError::Closed)
    }
}
