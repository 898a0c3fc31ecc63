//! Interactive prompts and plans: points where the agent waits on the user.

use super::draft::Draft;
use crate::event::{PlanPayload, PromptRequest};
use crate::session::{
    Annotation, ContentBlock, InteractivePrompt, Message, PromptKind, PromptStatus, Role,
};
use crate::types::{MessageId, RequestId};
use tracing::debug;

fn prompt_message(draft: &Draft<'_>, request_id: &RequestId) -> Option<MessageId> {
    draft
        .session()
        .messages
        .find(|message| {
            message
                .prompt()
                .is_some_and(|prompt| &prompt.request_id == request_id)
        })
        .map(|message| message.id.clone())
}

fn default_text(kind: PromptKind) -> &'static str {
    match kind {
        PromptKind::Permission => "Permission required",
        PromptKind::Credential => "Credentials required",
        PromptKind::Auth => "Authentication required",
    }
}

/// Records a pending prompt. A re-sent request with the same id refreshes the
/// existing entry instead of adding another.
pub(super) fn request(draft: &mut Draft<'_>, kind: PromptKind, request: PromptRequest) {
    let text = request
        .message
        .clone()
        .unwrap_or_else(|| default_text(kind).to_string());
    let prompt = InteractivePrompt {
        kind,
        request_id: request.request_id.clone(),
        payload: serde_json::to_value(&request).unwrap_or_default(),
        status: PromptStatus::Pending,
    };

    let id = match prompt_message(draft, &request.request_id) {
        Some(id) => id,
        None => draft.session_mut().next_message_id(),
    };
    draft.push_message(Message::system(id, text, Annotation::Prompt(prompt)));
}

pub(super) fn auth_completed(
    draft: &mut Draft<'_>,
    request_id: &RequestId,
    success: bool,
    cancelled: bool,
    error: Option<String>,
) {
    let Some(id) = prompt_message(draft, request_id) else {
        debug!(%request_id, "auth_completed for unknown request; ignoring");
        return;
    };
    let status = if cancelled {
        PromptStatus::Cancelled
    } else if success {
        PromptStatus::Completed
    } else {
        PromptStatus::Failed {
            error: error.unwrap_or_else(|| "Authentication failed".to_string()),
        }
    };
    draft.update_message(&id, |message| {
        if let Some(Annotation::Prompt(prompt)) = &mut message.annotation {
            prompt.status = status;
        }
    });
}

/// Plans are upserted by id so a revised plan replaces the earlier draft.
pub(super) fn plan_submitted(draft: &mut Draft<'_>, plan: PlanPayload) {
    let id = match plan.id {
        Some(id) => draft.claim_id(id, Role::Plan),
        None => draft.session_mut().next_message_id(),
    };
    let mut message = Message::new(id, Role::Plan, vec![ContentBlock::text(plan.content)])
        .with_timestamp(plan.timestamp);
    message.annotation = Some(Annotation::Plan {
        plan_path: plan.plan_path,
    });
    draft.push_message(message);
}
