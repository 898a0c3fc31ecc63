//! Transcript entries.
//!
//! A [`Message`] holds an ordered list of typed [`ContentBlock`]s. Assistant
//! turns interleave text and tool-use blocks inside one message; tool results
//! are attached next to the tool use they answer.

use crate::types::{MessageId, RequestId, ToolUseId, TurnId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Plan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolStatus {
    Running,
    Completed,
    Failed,
    Backgrounded,
    Interrupted,
    /// The turn ended before a result arrived.
    Abandoned,
}

impl ToolStatus {
    pub fn is_open(self) -> bool {
        matches!(self, ToolStatus::Running | ToolStatus::Backgrounded)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Thinking {
        text: String,
    },
    ToolUse {
        tool_use_id: ToolUseId,
        tool_name: String,
        #[serde(default)]
        input: Value,
        status: ToolStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        intent: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        display_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        progress: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_tool_use_id: Option<ToolUseId>,
        /// Set when the record was rebuilt from a result whose start was never seen.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        synthesized: bool,
    },
    ToolResult {
        tool_use_id: ToolUseId,
        content: Value,
        #[serde(default)]
        is_error: bool,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn tool_use_id(&self) -> Option<&ToolUseId> {
        match self {
            ContentBlock::ToolUse { tool_use_id, .. }
            | ContentBlock::ToolResult { tool_use_id, .. } => Some(tool_use_id),
            ContentBlock::Text { .. } | ContentBlock::Thinking { .. } => None,
        }
    }

    pub fn tool_status(&self) -> Option<ToolStatus> {
        match self {
            ContentBlock::ToolUse { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Inline mention chip rendered next to a message (source, skill, file).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub kind: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolLink {
    pub tool_name: String,
    pub tool_use_id: ToolUseId,
}

/// Structured failure classes reported by `typed_error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    AuthExpired,
    InvalidApiKey,
    RateLimited,
    QuotaExceeded,
    Overloaded,
    ContextTooLong,
    Network,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InfoLevel {
    #[default]
    Info,
    Success,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PromptKind {
    Permission,
    Credential,
    Auth,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PromptStatus {
    Pending,
    Completed,
    Cancelled,
    Failed { error: String },
}

/// A point where the host must collect user input before the agent continues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractivePrompt {
    pub kind: PromptKind,
    pub request_id: RequestId,
    pub payload: Value,
    pub status: PromptStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "annotation", rename_all = "snake_case")]
pub enum Annotation {
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<ErrorKind>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default)]
        can_retry: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
    },
    Info {
        level: InfoLevel,
    },
    Interrupted,
    Prompt(InteractivePrompt),
    Plan {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        plan_path: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub badges: Vec<Badge>,
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub pending: bool,
    #[serde(default)]
    pub queued: bool,
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub intermediate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<ToolLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_id: Option<TurnId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Annotation>,
}

impl Message {
    pub fn new(id: MessageId, role: Role, content: Vec<ContentBlock>) -> Self {
        Self {
            id,
            role,
            content,
            attachments: Vec::new(),
            badges: Vec::new(),
            timestamp: 0,
            pending: false,
            queued: false,
            streaming: false,
            intermediate: false,
            tool: None,
            turn_id: None,
            annotation: None,
        }
    }

    pub fn system(id: MessageId, text: impl Into<String>, annotation: Annotation) -> Self {
        let mut message = Self::new(id, Role::System, vec![ContentBlock::text(text)]);
        message.annotation = Some(annotation);
        message
    }

    pub fn with_timestamp(mut self, timestamp: Option<u64>) -> Self {
        if let Some(timestamp) = timestamp {
            self.timestamp = timestamp;
        }
        self
    }

    /// Concatenated text blocks, the way the transcript shows them.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn tool_use(&self, id: &ToolUseId) -> Option<&ContentBlock> {
        self.content
            .iter()
            .find(|block| matches!(block, ContentBlock::ToolUse { tool_use_id, .. } if tool_use_id == id))
    }

    pub fn tool_use_mut(&mut self, id: &ToolUseId) -> Option<&mut ContentBlock> {
        self.content
            .iter_mut()
            .find(|block| matches!(block, ContentBlock::ToolUse { tool_use_id, .. } if tool_use_id == id))
    }

    pub fn has_tool_result(&self, id: &ToolUseId) -> bool {
        self.content.iter().any(
            |block| matches!(block, ContentBlock::ToolResult { tool_use_id, .. } if tool_use_id == id),
        )
    }

    pub fn prompt(&self) -> Option<&InteractivePrompt> {
        match &self.annotation {
            Some(Annotation::Prompt(prompt)) => Some(prompt),
            _ => None,
        }
    }
}
