//! The event fold.
//!
//! [`process_event`] is the single entry point: it never fails, never
//! mutates its input, and returns a fresh top-level state together with the
//! effects the host should perform.

mod draft;
mod lifecycle;
mod prompts;
mod text;
mod tools;

#[cfg(test)]
mod tests;

use crate::effect::Effect;
use crate::event::AgentEvent;
use crate::session::{PromptKind, SessionState, Sharing};
use draft::Draft;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub state: Arc<SessionState>,
    pub effects: Vec<Effect>,
}

impl ProcessOutcome {
    /// Effect-only events hand back the input state itself.
    fn passthrough(state: &Arc<SessionState>, effect: Effect) -> Self {
        Self {
            state: Arc::clone(state),
            effects: vec![effect],
        }
    }
}

pub fn process_event(state: &Arc<SessionState>, event: AgentEvent) -> ProcessOutcome {
    if event.session_id() != state.session_id() {
        warn!(
            session_id = %state.session_id(),
            event_session_id = %event.session_id(),
            event_type = event.event_type(),
            "Folding event addressed to a different session"
        );
    }

    let mut draft = Draft::new(state);
    let mut effects = Vec::new();

    match event {
        AgentEvent::TextDelta {
            delta,
            turn_id,
            timestamp,
            ..
        } => text::delta(&mut draft, &delta, turn_id.as_ref(), timestamp),
        AgentEvent::TextComplete {
            text: final_text,
            is_intermediate,
            turn_id,
            ..
        } => text::complete(&mut draft, final_text, is_intermediate, turn_id.as_ref()),

        AgentEvent::ToolStart {
            tool_use_id,
            tool_name,
            input,
            intent,
            display_name,
            parent_tool_use_id,
            turn_id,
            timestamp,
            ..
        } => tools::start(
            &mut draft,
            tools::ToolStart {
                tool_use_id,
                tool_name,
                input,
                intent,
                display_name,
                parent_tool_use_id,
                turn_id,
                timestamp,
            },
        ),
        AgentEvent::ToolResult {
            tool_use_id,
            tool_name,
            result,
            is_error,
            timestamp,
            ..
        } => tools::result(
            &mut draft,
            tools::ToolOutput {
                tool_use_id,
                tool_name,
                result,
                is_error,
                timestamp,
            },
        ),
        AgentEvent::ParentUpdate {
            tool_use_id,
            parent_tool_use_id,
            progress,
            ..
        } => tools::parent_update(&mut draft, &tool_use_id, parent_tool_use_id, progress),
        AgentEvent::TaskBackgrounded {
            tool_use_id,
            task_id,
            intent,
            ..
        } => tools::task_backgrounded(&mut draft, tool_use_id, task_id, intent),
        AgentEvent::ShellBackgrounded {
            tool_use_id,
            shell_id,
            command,
            intent,
            ..
        } => tools::shell_backgrounded(&mut draft, tool_use_id, shell_id, command, intent),
        AgentEvent::TaskProgress {
            tool_use_id,
            progress,
            elapsed_seconds,
            ..
        } => tools::task_progress(&mut draft, &tool_use_id, progress, elapsed_seconds),

        AgentEvent::Complete { token_usage, .. } => {
            lifecycle::complete(&mut draft, token_usage.as_ref());
        }
        AgentEvent::Error {
            error, timestamp, ..
        } => lifecycle::error(&mut draft, error, timestamp),
        AgentEvent::TypedError {
            error, timestamp, ..
        } => lifecycle::typed_error(&mut draft, error, timestamp),
        AgentEvent::Status {
            message,
            status_type,
            ..
        } => lifecycle::status(&mut draft, message, status_type),
        AgentEvent::Info {
            message,
            level,
            status_type,
            ..
        } => lifecycle::info(&mut draft, message, level, status_type),
        AgentEvent::Interrupted {
            message, timestamp, ..
        } => lifecycle::interrupted(&mut draft, message, timestamp),
        AgentEvent::UserMessage {
            message, status, ..
        } => lifecycle::user_message(&mut draft, message, status),

        AgentEvent::TitleGenerated { title, .. } => {
            let session = draft.session_mut();
            session.title = Some(title);
            session.is_regenerating_title = false;
        }
        AgentEvent::TitleRegenerating {
            is_regenerating, ..
        } => draft.session_mut().is_regenerating_title = is_regenerating,
        AgentEvent::AsyncOperation { is_ongoing, .. } => {
            draft.session_mut().async_operation_ongoing = is_ongoing;
        }
        AgentEvent::WorkingDirectoryChanged {
            working_directory, ..
        } => draft.session_mut().working_directory = Some(working_directory),
        AgentEvent::PermissionModeChanged {
            permission_mode, ..
        } => draft.session_mut().permission_mode = permission_mode,
        AgentEvent::SessionModelChanged { model, .. } => {
            draft.session_mut().model = Some(model);
        }
        AgentEvent::SourcesChanged {
            enabled_source_slugs,
            ..
        } => draft.session_mut().enabled_sources = enabled_source_slugs,
        AgentEvent::SessionShared {
            shared_url,
            share_id,
            ..
        } => {
            draft.session_mut().sharing = Sharing::Shared {
                url: shared_url,
                share_id,
            };
        }
        AgentEvent::SessionUnshared { .. } => draft.session_mut().sharing = Sharing::Private,
        AgentEvent::UsageUpdate { token_usage, .. } => {
            draft.session_mut().usage.accumulate(&token_usage);
        }

        AgentEvent::PermissionRequest { request, .. } => {
            prompts::request(&mut draft, PromptKind::Permission, request);
        }
        AgentEvent::CredentialRequest { request, .. } => {
            prompts::request(&mut draft, PromptKind::Credential, request);
        }
        AgentEvent::AuthRequest { request, .. } => {
            prompts::request(&mut draft, PromptKind::Auth, request);
        }
        AgentEvent::AuthCompleted {
            request_id,
            success,
            cancelled,
            error,
            ..
        } => prompts::auth_completed(&mut draft, &request_id, success, cancelled, error),
        AgentEvent::PlanSubmitted { message, .. } => prompts::plan_submitted(&mut draft, message),

        AgentEvent::SourceActivated {
            session_id,
            source_slug,
            original_message,
        } => effects.push(Effect::AutoRetry {
            session_id,
            original_message,
            source_slug,
        }),

        AgentEvent::ArtifactCreated {
            session_id,
            artifact,
        } => {
            return ProcessOutcome::passthrough(
                state,
                Effect::ArtifactCreated {
                    session_id,
                    artifact,
                },
            );
        }
        AgentEvent::ArtifactUpdated {
            session_id,
            artifact_id,
            changes,
        } => {
            return ProcessOutcome::passthrough(
                state,
                Effect::ArtifactUpdated {
                    session_id,
                    artifact_id,
                    changes,
                },
            );
        }
        AgentEvent::ArtifactDeleted {
            session_id,
            artifact_id,
        } => {
            return ProcessOutcome::passthrough(
                state,
                Effect::ArtifactDeleted {
                    session_id,
                    artifact_id,
                },
            );
        }
        AgentEvent::BrowserScreenshot {
            session_id,
            image_base64,
            control_state,
        } => {
            return ProcessOutcome::passthrough(
                state,
                Effect::BrowserScreenshot {
                    session_id,
                    image_base64,
                    control_state,
                },
            );
        }
        AgentEvent::BrowserNavigated {
            session_id,
            url,
            title,
        } => {
            return ProcessOutcome::passthrough(
                state,
                Effect::BrowserNavigated {
                    session_id,
                    url,
                    title,
                },
            );
        }
        AgentEvent::BrowserControlChanged {
            session_id,
            control_state,
        } => {
            return ProcessOutcome::passthrough(
                state,
                Effect::BrowserControlChanged {
                    session_id,
                    control_state,
                },
            );
        }
        AgentEvent::BrowserClosed { session_id } => {
            return ProcessOutcome::passthrough(state, Effect::BrowserClosed { session_id });
        }
        AgentEvent::BrowserError { session_id, error } => {
            return ProcessOutcome::passthrough(state, Effect::BrowserError { session_id, error });
        }

        AgentEvent::Unrecognized { event_type, .. } => {
            debug!(%event_type, "Ignoring unrecognized event");
        }
    }

    ProcessOutcome {
        state: Arc::new(draft.finish()),
        effects,
    }
}

/// Folds a sequence of events, collecting every effect in order.
pub fn replay(
    state: &Arc<SessionState>,
    events: impl IntoIterator<Item = AgentEvent>,
) -> ProcessOutcome {
    events.into_iter().fold(
        ProcessOutcome {
            state: Arc::clone(state),
            effects: Vec::new(),
        },
        |mut acc, event| {
            let next = process_event(&acc.state, event);
            acc.state = next.state;
            acc.effects.extend(next.effects);
            acc
        },
    )
}
