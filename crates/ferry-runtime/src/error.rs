use crate::browser::BrowserError;
use crate::store::StoreError;
use ferry_core::types::SessionId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] ferry_core::Error),
    #[error("Session store error: {0}")]
    Store(#[from] StoreError),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Channel closed")]
    ChannelClosed,
    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: SessionId },
    #[error(transparent)]
    Browser(#[from] BrowserError),
}
