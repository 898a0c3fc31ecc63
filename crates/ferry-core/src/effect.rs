use crate::event::{Artifact, ControlState};
use crate::types::{ArtifactId, SessionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Side effect the caller must perform. Pure data; the host interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Effect {
    /// Resubmit `original_message` now that `source_slug` is connected.
    AutoRetry {
        session_id: SessionId,
        original_message: String,
        source_slug: String,
    },

    ArtifactCreated {
        session_id: SessionId,
        artifact: Artifact,
    },

    ArtifactUpdated {
        session_id: SessionId,
        artifact_id: ArtifactId,
        changes: Value,
    },

    ArtifactDeleted {
        session_id: SessionId,
        artifact_id: ArtifactId,
    },

    BrowserScreenshot {
        session_id: SessionId,
        image_base64: String,
        control_state: ControlState,
    },

    BrowserNavigated {
        session_id: SessionId,
        url: String,
        title: Option<String>,
    },

    BrowserControlChanged {
        session_id: SessionId,
        control_state: ControlState,
    },

    BrowserClosed {
        session_id: SessionId,
    },

    BrowserError {
        session_id: SessionId,
        error: String,
    },
}

impl Effect {
    pub fn session_id(&self) -> &SessionId {
        match self {
            Effect::AutoRetry { session_id, .. }
            | Effect::ArtifactCreated { session_id, .. }
            | Effect::ArtifactUpdated { session_id, .. }
            | Effect::ArtifactDeleted { session_id, .. }
            | Effect::BrowserScreenshot { session_id, .. }
            | Effect::BrowserNavigated { session_id, .. }
            | Effect::BrowserControlChanged { session_id, .. }
            | Effect::BrowserClosed { session_id }
            | Effect::BrowserError { session_id, .. } => session_id,
        }
    }

    pub fn is_artifact(&self) -> bool {
        matches!(
            self,
            Effect::ArtifactCreated { .. }
                | Effect::ArtifactUpdated { .. }
                | Effect::ArtifactDeleted { .. }
        )
    }

    pub fn is_browser(&self) -> bool {
        matches!(
            self,
            Effect::BrowserScreenshot { .. }
                | Effect::BrowserNavigated { .. }
                | Effect::BrowserControlChanged { .. }
                | Effect::BrowserClosed { .. }
                | Effect::BrowserError { .. }
        )
    }
}
