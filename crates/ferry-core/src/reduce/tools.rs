//! Tool lifecycle: start, result, re-parenting and background work.

use super::draft::Draft;
use crate::session::{
    BackgroundShell, BackgroundTask, ContentBlock, Message, OpenTool, Role, ToolLink, ToolStatus,
};
use crate::types::{MessageId, ToolUseId, TurnId};
use serde_json::Value;
use tracing::debug;

pub(super) struct ToolStart {
    pub tool_use_id: ToolUseId,
    pub tool_name: String,
    pub input: Value,
    pub intent: Option<String>,
    pub display_name: Option<String>,
    pub parent_tool_use_id: Option<ToolUseId>,
    pub turn_id: Option<TurnId>,
    pub timestamp: Option<u64>,
}

pub(super) struct ToolOutput {
    pub tool_use_id: ToolUseId,
    pub tool_name: Option<String>,
    pub result: Value,
    pub is_error: bool,
    pub timestamp: Option<u64>,
}

/// Message that owns the tool-use block for `tool_use_id`, if it still exists.
fn owner(draft: &Draft<'_>, tool_use_id: &ToolUseId) -> Option<MessageId> {
    let session = draft.session();
    draft
        .streaming()
        .open_tools
        .get(tool_use_id)
        .map(|open| &open.message_id)
        .or_else(|| session.tool_index.get(tool_use_id))
        .filter(|id| session.messages.contains(id))
        .cloned()
}

pub(super) fn start(draft: &mut Draft<'_>, start: ToolStart) {
    if let Some(message_id) = owner(draft, &start.tool_use_id) {
        // Repeated start for a known tool: refresh what it carries, keep its status.
        debug!(tool_use_id = %start.tool_use_id, "Duplicate tool_start; updating input");
        draft.update_message(&message_id, |message| {
            if let Some(ContentBlock::ToolUse {
                input,
                intent,
                display_name,
                parent_tool_use_id,
                ..
            }) = message.tool_use_mut(&start.tool_use_id)
            {
                *input = start.input;
                if start.intent.is_some() {
                    *intent = start.intent;
                }
                if start.display_name.is_some() {
                    *display_name = start.display_name;
                }
                if start.parent_tool_use_id.is_some() {
                    *parent_tool_use_id = start.parent_tool_use_id;
                }
            }
        });
        return;
    }

    draft.finish_text_segment(None);
    let message_id = draft.open_assistant(start.turn_id.as_ref(), start.timestamp);

    let block = ContentBlock::ToolUse {
        tool_use_id: start.tool_use_id.clone(),
        tool_name: start.tool_name.clone(),
        input: start.input,
        status: ToolStatus::Running,
        intent: start.intent,
        display_name: start.display_name,
        progress: None,
        parent_tool_use_id: start.parent_tool_use_id,
        synthesized: false,
    };
    draft.update_message(&message_id, |message| message.content.push(block));

    draft
        .session_mut()
        .tool_index
        .insert(start.tool_use_id.clone(), message_id.clone());
    draft.streaming_mut().open_tools.insert(
        start.tool_use_id,
        OpenTool {
            message_id,
            tool_name: start.tool_name,
        },
    );
}

pub(super) fn result(draft: &mut Draft<'_>, output: ToolOutput) {
    let ToolOutput {
        tool_use_id,
        tool_name,
        result,
        is_error,
        timestamp,
    } = output;
    let terminal = if is_error {
        ToolStatus::Failed
    } else {
        ToolStatus::Completed
    };

    match owner(draft, &tool_use_id) {
        Some(message_id) => {
            draft.update_message(&message_id, |message| {
                if let Some(ContentBlock::ToolUse { status, .. }) = message.tool_use_mut(&tool_use_id) {
                    *status = terminal;
                }
                let block = ContentBlock::ToolResult {
                    tool_use_id: tool_use_id.clone(),
                    content: result,
                    is_error,
                };
                let existing = message.content.iter().position(|block| {
                    matches!(block, ContentBlock::ToolResult { tool_use_id: id, .. } if *id == tool_use_id)
                });
                match existing {
                    Some(index) => message.content[index] = block,
                    None => message.content.push(block),
                }
            });
        }
        None => {
            debug!(%tool_use_id, "tool_result without a matching tool_start; synthesizing");
            let tool_name = tool_name.unwrap_or_else(|| "unknown".to_string());
            let session = draft.session_mut();
            let id = session.next_message_id();
            let mut message = Message::new(
                id.clone(),
                Role::Assistant,
                vec![
                    ContentBlock::ToolUse {
                        tool_use_id: tool_use_id.clone(),
                        tool_name: tool_name.clone(),
                        input: Value::Null,
                        status: terminal,
                        intent: None,
                        display_name: None,
                        progress: None,
                        parent_tool_use_id: None,
                        synthesized: true,
                    },
                    ContentBlock::ToolResult {
                        tool_use_id: tool_use_id.clone(),
                        content: result,
                        is_error,
                    },
                ],
            )
            .with_timestamp(timestamp);
            message.tool = Some(ToolLink {
                tool_name,
                tool_use_id: tool_use_id.clone(),
            });
            session.messages.push(message);
            session.tool_index.insert(tool_use_id.clone(), id);
        }
    }

    if draft.streaming().open_tools.contains_key(&tool_use_id) {
        draft.streaming_mut().open_tools.remove(&tool_use_id);
    }
    draft.release_background(&tool_use_id);
}

pub(super) fn parent_update(
    draft: &mut Draft<'_>,
    tool_use_id: &ToolUseId,
    parent: Option<ToolUseId>,
    new_progress: Option<String>,
) {
    let Some(message_id) = owner(draft, tool_use_id) else {
        debug!(%tool_use_id, "parent_update for unknown tool; ignoring");
        return;
    };
    draft.update_message(&message_id, |message| {
        if let Some(ContentBlock::ToolUse {
            parent_tool_use_id,
            progress,
            ..
        }) = message.tool_use_mut(tool_use_id)
        {
            if parent.is_some() {
                *parent_tool_use_id = parent;
            }
            if new_progress.is_some() {
                *progress = new_progress;
            }
        }
    });
}

fn mark_backgrounded(draft: &mut Draft<'_>, tool_use_id: &ToolUseId) {
    let Some(message_id) = owner(draft, tool_use_id) else {
        debug!(%tool_use_id, "Backgrounded tool has no tool-use record");
        return;
    };
    draft.update_message(&message_id, |message| {
        if let Some(ContentBlock::ToolUse { status, .. }) = message.tool_use_mut(tool_use_id)
            && *status == ToolStatus::Running
        {
            *status = ToolStatus::Backgrounded;
        }
    });
}

pub(super) fn task_backgrounded(
    draft: &mut Draft<'_>,
    tool_use_id: ToolUseId,
    task_id: String,
    intent: Option<String>,
) {
    mark_backgrounded(draft, &tool_use_id);
    draft.session_mut().background_tasks.insert(
        task_id.clone(),
        BackgroundTask {
            task_id,
            tool_use_id,
            intent,
            progress: None,
            elapsed_seconds: None,
        },
    );
}

pub(super) fn shell_backgrounded(
    draft: &mut Draft<'_>,
    tool_use_id: ToolUseId,
    shell_id: String,
    command: Option<String>,
    intent: Option<String>,
) {
    mark_backgrounded(draft, &tool_use_id);
    draft.session_mut().background_shells.insert(
        shell_id.clone(),
        BackgroundShell {
            shell_id,
            tool_use_id,
            command,
            intent,
        },
    );
}

/// Progress is addressed by tool-use id; agents that only know the task id
/// send that in the same field.
pub(super) fn task_progress(
    draft: &mut Draft<'_>,
    tool_use_id: &ToolUseId,
    new_progress: Option<String>,
    elapsed_seconds: Option<u64>,
) {
    let task_key = draft
        .session()
        .background_tasks
        .iter()
        .find(|(key, task)| &task.tool_use_id == tool_use_id || key.as_str() == tool_use_id.as_str())
        .map(|(key, task)| (key.clone(), task.tool_use_id.clone()));

    let Some((key, owning_tool)) = task_key else {
        debug!(%tool_use_id, "task_progress for unknown task; ignoring");
        return;
    };

    if let Some(task) = draft.session_mut().background_tasks.get_mut(&key) {
        if new_progress.is_some() {
            task.progress.clone_from(&new_progress);
        }
        if elapsed_seconds.is_some() {
            task.elapsed_seconds = elapsed_seconds;
        }
    }

    if let Some(text) = new_progress
        && let Some(message_id) = owner(draft, &owning_tool)
    {
        draft.update_message(&message_id, |message| {
            if let Some(ContentBlock::ToolUse { progress, .. }) = message.tool_use_mut(&owning_tool) {
                *progress = Some(text);
            }
        });
    }
}
