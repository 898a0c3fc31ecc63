// Pure event folding for agent sessions, no I/O

pub mod effect;
pub mod error;
pub mod event;
pub mod reduce;
pub mod session;
pub mod types;

pub use effect::Effect;
pub use error::{Error, Result};
pub use event::{AgentEvent, EventKind};
pub use reduce::{ProcessOutcome, process_event, replay};
pub use session::{Session, SessionState};
