//! Turn boundaries: user input, completion, errors and interruption.

use super::draft::{Draft, TurnEnd};
use crate::event::{TypedError, UserMessagePayload, UserMessageStatus};
use crate::session::{Annotation, ContentBlock, InfoLevel, Message, Role, StatusLine, Usage};

const INTERRUPTED_TEXT: &str = "Interrupted";

pub(super) fn complete(draft: &mut Draft<'_>, token_usage: Option<&Usage>) {
    draft.close_turn(TurnEnd::Finished);
    if let Some(usage) = token_usage {
        draft.session_mut().usage.accumulate(usage);
    }
}

fn push_system(
    draft: &mut Draft<'_>,
    text: String,
    annotation: Annotation,
    timestamp: Option<u64>,
) {
    let id = draft.session_mut().next_message_id();
    draft.push_message(Message::system(id, text, annotation).with_timestamp(timestamp));
}

pub(super) fn error(draft: &mut Draft<'_>, error: String, timestamp: Option<u64>) {
    draft.close_turn(TurnEnd::Finished);
    push_system(
        draft,
        error,
        Annotation::Error {
            kind: None,
            title: None,
            can_retry: false,
            details: None,
        },
        timestamp,
    );
}

pub(super) fn typed_error(draft: &mut Draft<'_>, error: TypedError, timestamp: Option<u64>) {
    draft.close_turn(TurnEnd::Finished);
    push_system(
        draft,
        error.message,
        Annotation::Error {
            kind: Some(error.kind),
            title: error.title,
            can_retry: error.can_retry,
            details: error.details,
        },
        timestamp,
    );
}

pub(super) fn interrupted(draft: &mut Draft<'_>, message: Option<String>, timestamp: Option<u64>) {
    draft.close_turn(TurnEnd::Interrupted);
    push_system(
        draft,
        message.unwrap_or_else(|| INTERRUPTED_TEXT.to_string()),
        Annotation::Interrupted,
        timestamp,
    );
}

pub(super) fn status(draft: &mut Draft<'_>, message: String, status_type: Option<String>) {
    draft.session_mut().status = Some(StatusLine {
        message,
        status_type,
    });
}

/// Appends an info line. An info carrying the same `status_type` as the
/// current status line resolves it.
pub(super) fn info(
    draft: &mut Draft<'_>,
    message: String,
    level: InfoLevel,
    status_type: Option<String>,
) {
    push_system(draft, message, Annotation::Info { level }, None);

    let resolves_status = status_type.is_some()
        && draft
            .session()
            .status
            .as_ref()
            .is_some_and(|status| status.status_type == status_type);
    if resolves_status {
        draft.session_mut().status = None;
    }
}

/// Inserts or confirms a user message. `accepted` and `processing` start a
/// new turn; `queued` only marks the message as waiting.
pub(super) fn user_message(
    draft: &mut Draft<'_>,
    payload: UserMessagePayload,
    status: UserMessageStatus,
) {
    let queued = status == UserMessageStatus::Queued;
    let UserMessagePayload {
        id,
        content,
        attachments,
        badges,
        timestamp,
    } = payload;
    let id = draft.claim_id(id, Role::User);

    let updated = draft.update_message(&id, |message| {
        message.content = vec![ContentBlock::text(content.clone())];
        if !attachments.is_empty() {
            message.attachments.clone_from(&attachments);
        }
        if !badges.is_empty() {
            message.badges.clone_from(&badges);
        }
        if let Some(timestamp) = timestamp {
            message.timestamp = timestamp;
        }
        message.pending = false;
        message.queued = queued;
    });
    if !updated {
        let mut message =
            Message::new(id, Role::User, vec![ContentBlock::text(content)]).with_timestamp(timestamp);
        message.attachments = attachments;
        message.badges = badges;
        message.queued = queued;
        draft.push_message(message);
    }

    if !queued {
        begin_turn(draft);
    }
}

fn begin_turn(draft: &mut Draft<'_>) {
    draft.finish_text_segment(None);
    if draft.streaming().assistant.is_some() {
        draft.streaming_mut().assistant = None;
    }
    draft.session_mut().is_processing = true;
}
