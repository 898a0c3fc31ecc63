// Async surroundings for ferry-core: actors, routing, and host-side contracts

pub mod actor;
pub mod browser;
pub mod config;
pub mod effect;
pub mod error;
pub mod router;
pub mod store;
pub mod utils;

pub use actor::{SessionHandle, spawn_session_actor};
pub use config::RuntimeConfig;
pub use effect::{ChannelEffectHandler, DiscardEffects, EffectError, EffectHandler};
pub use error::{Error, Result};
pub use router::EventRouter;
pub use store::{InMemorySessionStore, SessionStore, StoreError};
