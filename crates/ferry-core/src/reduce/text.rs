use super::draft::Draft;
use crate::session::ContentBlock;
use crate::types::TurnId;
use tracing::debug;

pub(super) fn delta(
    draft: &mut Draft<'_>,
    delta: &str,
    turn_id: Option<&TurnId>,
    timestamp: Option<u64>,
) {
    let message_id = draft.open_assistant(turn_id, timestamp);

    let in_segment = draft
        .streaming()
        .text
        .as_ref()
        .is_some_and(|segment| segment.message_id == message_id);
    if !in_segment {
        draft.finish_text_segment(None);
        draft.begin_text_segment(&message_id);
    }

    let Some(segment) = draft.streaming_mut().text.as_mut() else {
        return;
    };
    segment.buffer.push_str(delta);
    let block = segment.block;

    draft.update_message(&message_id, |message| {
        match message.content.get_mut(block) {
            Some(ContentBlock::Text { text }) => text.push_str(delta),
            _ => message.content.push(ContentBlock::text(delta)),
        }
        message.streaming = true;
    });
}

/// Finalizes the active segment. The assistant message stays open so tool
/// calls later in the turn land in it.
pub(super) fn complete(
    draft: &mut Draft<'_>,
    text: Option<String>,
    is_intermediate: bool,
    turn_id: Option<&TurnId>,
) {
    if let Some(segment) = draft.streaming().text.as_ref() {
        let message_id = segment.message_id.clone();
        draft.finish_text_segment(text);
        draft.update_message(&message_id, |message| message.intermediate = is_intermediate);
        return;
    }

    // No deltas preceded this completion.
    let Some(text) = text.filter(|text| !text.is_empty()) else {
        debug!("Empty text_complete with no open segment");
        return;
    };
    let message_id = draft.open_assistant(turn_id, None);
    draft.update_message(&message_id, |message| {
        message.content.push(ContentBlock::text(text));
        message.streaming = false;
        message.intermediate = is_intermediate;
    });
}
