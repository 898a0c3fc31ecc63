use super::log::MessageLog;
use super::usage::Usage;
use crate::types::{MessageId, SessionId, ToolUseId, TurnId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PermissionMode {
    /// Read-only exploration; every write is refused.
    Safe,
    #[default]
    Ask,
    AllowAll,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "visibility", rename_all = "snake_case")]
pub enum Sharing {
    #[default]
    Private,
    Shared {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        share_id: Option<String>,
    },
}

impl Sharing {
    pub fn is_shared(&self) -> bool {
        matches!(self, Sharing::Shared { .. })
    }
}

/// Transient one-line indicator ("Compacting conversation…").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLine {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundTask {
    pub task_id: String,
    pub tool_use_id: ToolUseId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundShell {
    pub shell_id: String,
    pub tool_use_id: ToolUseId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
}

/// Durable part of a session: everything the store persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub messages: MessageLog,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub permission_mode: PermissionMode,
    #[serde(default)]
    pub working_directory: Option<String>,
    #[serde(default)]
    pub sharing: Sharing,
    #[serde(default)]
    pub usage: Usage,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub is_regenerating_title: bool,
    #[serde(default)]
    pub is_processing: bool,
    #[serde(default)]
    pub async_operation_ongoing: bool,
    #[serde(default)]
    pub status: Option<StatusLine>,
    #[serde(default)]
    pub enabled_sources: Vec<String>,
    /// Every tool use ever recorded, mapped to the message that owns its block.
    #[serde(default)]
    pub tool_index: HashMap<ToolUseId, MessageId>,
    #[serde(default)]
    pub background_tasks: BTreeMap<String, BackgroundTask>,
    #[serde(default)]
    pub background_shells: BTreeMap<String, BackgroundShell>,
    #[serde(default)]
    pub next_local_id: u64,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            messages: MessageLog::new(),
            model: None,
            permission_mode: PermissionMode::default(),
            working_directory: None,
            sharing: Sharing::default(),
            usage: Usage::default(),
            title: None,
            is_regenerating_title: false,
            is_processing: false,
            async_operation_ongoing: false,
            status: None,
            enabled_sources: Vec::new(),
            tool_index: HashMap::new(),
            background_tasks: BTreeMap::new(),
            background_shells: BTreeMap::new(),
            next_local_id: 0,
        }
    }

    pub fn with_permission_mode(mut self, mode: PermissionMode) -> Self {
        self.permission_mode = mode;
        self
    }

    /// Mints the next core-local message id, skipping any already in use.
    pub fn next_message_id(&mut self) -> MessageId {
        loop {
            let id = MessageId::local(self.next_local_id);
            self.next_local_id += 1;
            if !self.messages.contains(&id) {
                return id;
            }
        }
    }

    pub fn has_background_work(&self, tool_use_id: &ToolUseId) -> bool {
        self.background_tasks
            .values()
            .any(|task| &task.tool_use_id == tool_use_id)
            || self
                .background_shells
                .values()
                .any(|shell| &shell.tool_use_id == tool_use_id)
    }

    /// Drops the background tasks and shells started by `tool_use_id`.
    pub fn release_background(&mut self, tool_use_id: &ToolUseId) {
        self.background_tasks
            .retain(|_, task| &task.tool_use_id != tool_use_id);
        self.background_shells
            .retain(|_, shell| &shell.tool_use_id != tool_use_id);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAssistant {
    pub message_id: MessageId,
    pub turn_id: Option<TurnId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBuffer {
    pub message_id: MessageId,
    /// Index of the text block inside the message. Blocks are append-only.
    pub block: usize,
    pub buffer: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTool {
    pub message_id: MessageId,
    pub tool_name: String,
}

/// Per-turn buffers. Reset whenever a turn ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Streaming {
    pub assistant: Option<OpenAssistant>,
    pub text: Option<TextBuffer>,
    pub open_tools: BTreeMap<ToolUseId, OpenTool>,
}

impl Streaming {
    pub fn is_idle(&self) -> bool {
        self.assistant.is_none() && self.text.is_none() && self.open_tools.is_empty()
    }
}

/// The unit of fold state.
///
/// Never mutated in place. The dispatcher always returns a new top-level
/// `Arc`, and a handler that changes `session` or `streaming` installs a new
/// `Arc` for that part while untouched parts stay shared with the input.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session: Arc<Session>,
    pub streaming: Arc<Streaming>,
}

impl SessionState {
    pub fn new(session_id: SessionId) -> Self {
        Self::from_session(Session::new(session_id))
    }

    /// Opens a previously persisted session. Streaming buffers never survive
    /// a reload, so tools left open are closed out by the next turn end.
    pub fn from_session(session: Session) -> Self {
        Self {
            session: Arc::new(session),
            streaming: Arc::new(Streaming::default()),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session.id
    }

    pub fn has_open_tools(&self) -> bool {
        !self.streaming.open_tools.is_empty()
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}
