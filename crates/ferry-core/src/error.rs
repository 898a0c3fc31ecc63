use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures at the wire boundary. Folding itself never fails.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed event payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Event is missing required field `{0}`")]
    MissingField(&'static str),
}
