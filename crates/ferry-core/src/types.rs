use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn from_string(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identity of one conversation. Opaque to the core; hosts pick the format.
    SessionId
);
string_id!(
    /// Stable transcript entry id. Messages are always addressed through it.
    MessageId
);
string_id!(ToolUseId);
string_id!(TurnId);
string_id!(RequestId);
string_id!(ArtifactId);

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl MessageId {
    /// Deterministic id for messages the core creates on its own.
    pub fn local(seq: u64) -> Self {
        Self(format!("local-{seq}"))
    }

    pub fn is_local(&self) -> bool {
        self.0.starts_with("local-")
    }
}
