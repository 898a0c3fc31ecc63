//! Incoming agent events.
//!
//! Wire shape: a JSON object discriminated by a snake_case `type` tag with
//! camelCase fields, always carrying `sessionId`.

use crate::error::{Error, Result};
use crate::session::{Attachment, Badge, InfoLevel, PermissionMode, Usage};
use crate::types::{ArtifactId, MessageId, RequestId, SessionId, ToolUseId, TurnId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use strum_macros::{Display, EnumDiscriminants, EnumIter, EnumString, IntoStaticStr};

/// Who holds input authority over a browser instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ControlState {
    #[default]
    Idle,
    Agent,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedError {
    pub kind: crate::session::ErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub message: String,
    #[serde(default)]
    pub can_retry: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Permission, credential and auth prompts share one shape: an id to resolve
/// against, an optional human-readable line, and whatever else the agent sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptRequest {
    pub request_id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMessagePayload {
    pub id: MessageId,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub badges: Vec<Badge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UserMessageStatus {
    Accepted,
    Queued,
    Processing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: ArtifactId,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumDiscriminants)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
#[strum_discriminants(
    name(EventKind),
    derive(Hash, Display, EnumString, IntoStaticStr, EnumIter),
    strum(serialize_all = "snake_case")
)]
pub enum AgentEvent {
    // Streaming text
    TextDelta {
        session_id: SessionId,
        delta: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        turn_id: Option<TurnId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
    },
    TextComplete {
        session_id: SessionId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default)]
        is_intermediate: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        turn_id: Option<TurnId>,
    },

    // Tool lifecycle
    ToolStart {
        session_id: SessionId,
        tool_use_id: ToolUseId,
        tool_name: String,
        #[serde(default)]
        input: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        intent: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        display_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_tool_use_id: Option<ToolUseId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        turn_id: Option<TurnId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
    },
    ToolResult {
        session_id: SessionId,
        tool_use_id: ToolUseId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_name: Option<String>,
        #[serde(default)]
        result: Value,
        #[serde(default)]
        is_error: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
    },
    ParentUpdate {
        session_id: SessionId,
        tool_use_id: ToolUseId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_tool_use_id: Option<ToolUseId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        progress: Option<String>,
    },
    TaskBackgrounded {
        session_id: SessionId,
        tool_use_id: ToolUseId,
        task_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        intent: Option<String>,
    },
    ShellBackgrounded {
        session_id: SessionId,
        tool_use_id: ToolUseId,
        shell_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        command: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        intent: Option<String>,
    },
    TaskProgress {
        session_id: SessionId,
        tool_use_id: ToolUseId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        progress: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        elapsed_seconds: Option<u64>,
    },

    // Session lifecycle and control
    Complete {
        session_id: SessionId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token_usage: Option<Usage>,
    },
    Error {
        session_id: SessionId,
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
    },
    TypedError {
        session_id: SessionId,
        error: TypedError,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
    },
    Status {
        session_id: SessionId,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status_type: Option<String>,
    },
    Info {
        session_id: SessionId,
        message: String,
        #[serde(default)]
        level: InfoLevel,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status_type: Option<String>,
    },
    Interrupted {
        session_id: SessionId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
    },
    TitleGenerated {
        session_id: SessionId,
        title: String,
    },
    TitleRegenerating {
        session_id: SessionId,
        is_regenerating: bool,
    },
    AsyncOperation {
        session_id: SessionId,
        is_ongoing: bool,
    },
    WorkingDirectoryChanged {
        session_id: SessionId,
        working_directory: String,
    },
    PermissionModeChanged {
        session_id: SessionId,
        permission_mode: PermissionMode,
    },
    SessionModelChanged {
        session_id: SessionId,
        model: String,
    },
    SourcesChanged {
        session_id: SessionId,
        enabled_source_slugs: Vec<String>,
    },
    PermissionRequest {
        session_id: SessionId,
        request: PromptRequest,
    },
    CredentialRequest {
        session_id: SessionId,
        request: PromptRequest,
    },
    PlanSubmitted {
        session_id: SessionId,
        message: PlanPayload,
    },
    UserMessage {
        session_id: SessionId,
        message: UserMessagePayload,
        status: UserMessageStatus,
    },
    SessionShared {
        session_id: SessionId,
        shared_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        share_id: Option<String>,
    },
    SessionUnshared {
        session_id: SessionId,
    },
    AuthRequest {
        session_id: SessionId,
        request: PromptRequest,
    },
    AuthCompleted {
        session_id: SessionId,
        request_id: RequestId,
        success: bool,
        #[serde(default)]
        cancelled: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    UsageUpdate {
        session_id: SessionId,
        token_usage: Usage,
    },
    SourceActivated {
        session_id: SessionId,
        source_slug: String,
        original_message: String,
    },

    // Effect-only: artifacts
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

    // Effect-only: browser
    BrowserScreenshot {
        session_id: SessionId,
        image_base64: String,
        control_state: ControlState,
    },
    BrowserNavigated {
        session_id: SessionId,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
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

    /// A tag this build does not know. Never produced by serde; only by
    /// [`AgentEvent::from_value`].
    #[serde(skip)]
    Unrecognized {
        session_id: SessionId,
        event_type: String,
    },
}

impl AgentEvent {
    /// Decodes one wire event.
    pub fn from_value(value: Value) -> Result<Self> {
        let event_type = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(Error::MissingField("type"))?
            .to_owned();
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or(Error::MissingField("sessionId"))?
            .to_owned();

        match EventKind::from_str(&event_type) {
            Ok(kind) if kind != EventKind::Unrecognized => Ok(serde_json::from_value(value)?),
            _ => Ok(AgentEvent::Unrecognized {
                session_id: SessionId::from(session_id),
                event_type,
            }),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    pub fn kind(&self) -> EventKind {
        EventKind::from(self)
    }

    /// Wire tag for this event. Unrecognized events report the tag they arrived with.
    pub fn event_type(&self) -> &str {
        match self {
            AgentEvent::Unrecognized { event_type, .. } => event_type.as_str(),
            other => other.kind().into(),
        }
    }

    pub fn is_effect_only(&self) -> bool {
        self.kind().is_effect_only()
    }

    pub fn session_id(&self) -> &SessionId {
        match self {
            AgentEvent::TextDelta { session_id, .. }
            | AgentEvent::TextComplete { session_id, .. }
            | AgentEvent::ToolStart { session_id, .. }
            | AgentEvent::ToolResult { session_id, .. }
            | AgentEvent::ParentUpdate { session_id, .. }
            | AgentEvent::TaskBackgrounded { session_id, .. }
            | AgentEvent::ShellBackgrounded { session_id, .. }
            | AgentEvent::TaskProgress { session_id, .. }
            | AgentEvent::Complete { session_id, .. }
            | AgentEvent::Error { session_id, .. }
            | AgentEvent::TypedError { session_id, .. }
            | AgentEvent::Status { session_id, .. }
            | AgentEvent::Info { session_id, .. }
            | AgentEvent::Interrupted { session_id, .. }
            | AgentEvent::TitleGenerated { session_id, .. }
            | AgentEvent::TitleRegenerating { session_id, .. }
            | AgentEvent::AsyncOperation { session_id, .. }
            | AgentEvent::WorkingDirectoryChanged { session_id, .. }
            | AgentEvent::PermissionModeChanged { session_id, .. }
            | AgentEvent::SessionModelChanged { session_id, .. }
            | AgentEvent::SourcesChanged { session_id, .. }
            | AgentEvent::PermissionRequest { session_id, .. }
            | AgentEvent::CredentialRequest { session_id, .. }
            | AgentEvent::PlanSubmitted { session_id, .. }
            | AgentEvent::UserMessage { session_id, .. }
            | AgentEvent::SessionShared { session_id, .. }
            | AgentEvent::SessionUnshared { session_id }
            | AgentEvent::AuthRequest { session_id, .. }
            | AgentEvent::AuthCompleted { session_id, .. }
            | AgentEvent::UsageUpdate { session_id, .. }
            | AgentEvent::SourceActivated { session_id, .. }
            | AgentEvent::ArtifactCreated { session_id, .. }
            | AgentEvent::ArtifactUpdated { session_id, .. }
            | AgentEvent::ArtifactDeleted { session_id, .. }
            | AgentEvent::BrowserScreenshot { session_id, .. }
            | AgentEvent::BrowserNavigated { session_id, .. }
            | AgentEvent::BrowserControlChanged { session_id, .. }
            | AgentEvent::BrowserClosed { session_id }
            | AgentEvent::BrowserError { session_id, .. }
            | AgentEvent::Unrecognized { session_id, .. } => session_id,
        }
    }

    pub fn tool_use_id(&self) -> Option<&ToolUseId> {
        match self {
            AgentEvent::ToolStart { tool_use_id, .. }
            | AgentEvent::ToolResult { tool_use_id, .. }
            | AgentEvent::ParentUpdate { tool_use_id, .. }
            | AgentEvent::TaskBackgrounded { tool_use_id, .. }
            | AgentEvent::ShellBackgrounded { tool_use_id, .. }
            | AgentEvent::TaskProgress { tool_use_id, .. } => Some(tool_use_id),
            _ => None,
        }
    }
}

impl EventKind {
    /// Artifact and browser events are only demultiplexed into effects.
    pub fn is_effect_only(self) -> bool {
        matches!(
            self,
            EventKind::ArtifactCreated
                | EventKind::ArtifactUpdated
                | EventKind::ArtifactDeleted
                | EventKind::BrowserScreenshot
                | EventKind::BrowserNavigated
                | EventKind::BrowserControlChanged
                | EventKind::BrowserClosed
                | EventKind::BrowserError
        )
    }
}
