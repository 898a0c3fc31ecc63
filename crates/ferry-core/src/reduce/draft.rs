use crate::session::{
    ContentBlock, Message, OpenAssistant, Role, Session, SessionState, Streaming, TextBuffer,
    ToolStatus,
};
use crate::types::{MessageId, ToolUseId, TurnId};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TurnEnd {
    /// `complete` or an error: unresolved calls are abandoned, background work
    /// keeps running.
    Finished,
    /// Open calls, backgrounded ones included, are interrupted and their
    /// background records dropped.
    Interrupted,
}

impl TurnEnd {
    fn close(self, status: ToolStatus) -> Option<ToolStatus> {
        match (self, status) {
            (TurnEnd::Finished, ToolStatus::Running) => Some(ToolStatus::Abandoned),
            (TurnEnd::Interrupted, ToolStatus::Running | ToolStatus::Backgrounded) => {
                Some(ToolStatus::Interrupted)
            }
            _ => None,
        }
    }
}

/// Copy-on-write view over a [`SessionState`] for the duration of one event.
///
/// Reading goes to the base state. The first mutable access to `session` or
/// `streaming` clones that part; `finish` wraps only the cloned parts in new
/// `Arc`s and shares the rest with the base.
pub(crate) struct Draft<'a> {
    base: &'a SessionState,
    session: Option<Session>,
    streaming: Option<Streaming>,
}

impl<'a> Draft<'a> {
    pub(crate) fn new(base: &'a SessionState) -> Self {
        Self {
            base,
            session: None,
            streaming: None,
        }
    }

    pub(crate) fn session(&self) -> &Session {
        self.session.as_ref().unwrap_or(&self.base.session)
    }

    pub(crate) fn streaming(&self) -> &Streaming {
        self.streaming.as_ref().unwrap_or(&self.base.streaming)
    }

    pub(crate) fn session_mut(&mut self) -> &mut Session {
        let base = self.base;
        self.session
            .get_or_insert_with(|| Session::clone(&base.session))
    }

    pub(crate) fn streaming_mut(&mut self) -> &mut Streaming {
        let base = self.base;
        self.streaming
            .get_or_insert_with(|| Streaming::clone(&base.streaming))
    }

    pub(crate) fn finish(self) -> SessionState {
        SessionState {
            session: self
                .session
                .map_or_else(|| Arc::clone(&self.base.session), Arc::new),
            streaming: self
                .streaming
                .map_or_else(|| Arc::clone(&self.base.streaming), Arc::new),
        }
    }

    pub(crate) fn update_message(&mut self, id: &MessageId, f: impl FnOnce(&mut Message)) -> bool {
        if !self.session().messages.contains(id) {
            return false;
        }
        self.session_mut().messages.update(id, f)
    }

    pub(crate) fn push_message(&mut self, message: Message) {
        self.session_mut().messages.push(message);
    }

    /// Keeps `id` for an upsert unless it already names a message of another
    /// role, in which case a fresh local id is minted.
    pub(crate) fn claim_id(&mut self, id: MessageId, role: Role) -> MessageId {
        let taken_by = self
            .session()
            .messages
            .get(&id)
            .map(|existing| existing.role)
            .filter(|existing| *existing != role);
        match taken_by {
            Some(existing) => {
                debug!(%id, %existing, wanted = %role, "Message id taken by another role");
                self.session_mut().next_message_id()
            }
            None => id,
        }
    }

    /// Background work ends with its tool; only copies the session when
    /// something is attached.
    pub(crate) fn release_background(&mut self, tool_use_id: &ToolUseId) {
        if self.session().has_background_work(tool_use_id) {
            self.session_mut().release_background(tool_use_id);
        }
    }

    /// Returns the assistant message open for this turn, creating one when
    /// none is open or the event belongs to a different turn.
    pub(crate) fn open_assistant(
        &mut self,
        turn_id: Option<&TurnId>,
        timestamp: Option<u64>,
    ) -> MessageId {
        if let Some(open) = &self.streaming().assistant
            && self.session().messages.contains(&open.message_id)
            && turn_id.is_none_or(|turn| open.turn_id.as_ref() == Some(turn))
        {
            return open.message_id.clone();
        }

        self.finish_text_segment(None);

        let session = self.session_mut();
        let id = session.next_message_id();
        let mut message = Message::new(id.clone(), Role::Assistant, Vec::new()).with_timestamp(timestamp);
        message.turn_id = turn_id.cloned();
        session.messages.push(message);

        self.streaming_mut().assistant = Some(OpenAssistant {
            message_id: id.clone(),
            turn_id: turn_id.cloned(),
        });
        id
    }

    /// Starts a fresh text block in `message_id` and makes it the active segment.
    pub(crate) fn begin_text_segment(&mut self, message_id: &MessageId) {
        let mut block = None;
        self.update_message(message_id, |message| {
            message.content.push(ContentBlock::text(""));
            message.streaming = true;
            block = Some(message.content.len() - 1);
        });
        if let Some(block) = block {
            self.streaming_mut().text = Some(TextBuffer {
                message_id: message_id.clone(),
                block,
                buffer: String::new(),
            });
        }
    }

    /// Finalizes the active text segment, if any. `final_text` replaces the
    /// accumulated buffer when given.
    pub(crate) fn finish_text_segment(&mut self, final_text: Option<String>) {
        if self.streaming().text.is_none() {
            return;
        }
        let Some(segment) = self.streaming_mut().text.take() else {
            return;
        };
        let text = final_text.unwrap_or(segment.buffer);
        self.update_message(&segment.message_id, |message| {
            match message.content.get_mut(segment.block) {
                Some(ContentBlock::Text { text: block_text }) => *block_text = text,
                _ => message.content.push(ContentBlock::Text { text }),
            }
            message.streaming = false;
        });
    }

    /// Ends the current turn: finalizes streaming text, closes the tools still
    /// open in it, and resets the streaming buffers.
    pub(crate) fn close_turn(&mut self, end: TurnEnd) {
        self.finish_text_segment(None);

        let mut by_message: BTreeMap<MessageId, Vec<_>> = BTreeMap::new();
        for (tool_use_id, open) in &self.streaming().open_tools {
            by_message
                .entry(open.message_id.clone())
                .or_default()
                .push(tool_use_id.clone());
        }
        for (message_id, tool_use_ids) in by_message {
            self.update_message(&message_id, |message| {
                for tool_use_id in &tool_use_ids {
                    if let Some(ContentBlock::ToolUse { status, .. }) =
                        message.tool_use_mut(tool_use_id)
                        && let Some(closed) = end.close(*status)
                    {
                        *status = closed;
                    }
                }
            });
            if end == TurnEnd::Interrupted {
                for tool_use_id in &tool_use_ids {
                    self.release_background(tool_use_id);
                }
            }
        }

        if let Some(open) = self.streaming().assistant.clone() {
            let still_streaming = self
                .session()
                .messages
                .get(&open.message_id)
                .is_some_and(|m| m.streaming);
            if still_streaming {
                self.update_message(&open.message_id, |m| m.streaming = false);
            }
        }

        if !self.streaming().is_idle() {
            *self.streaming_mut() = Streaming::default();
        }

        let session = self.session_mut();
        session.is_processing = false;
        session.status = None;
    }
}
