use super::message::Message;
use crate::types::MessageId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Ordered transcript with an id index.
///
/// Entries are shared `Arc`s: cloning the log is a pointer copy per entry, and
/// [`MessageLog::update`] copies only the entry it changes. Position is an
/// implementation detail; callers address messages by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Message>", into = "Vec<Message>")]
pub struct MessageLog {
    entries: Vec<Arc<Message>>,
    index: HashMap<MessageId, usize>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.get_arc(id).map(Arc::as_ref)
    }

    pub fn get_arc(&self, id: &MessageId) -> Option<&Arc<Message>> {
        self.index.get(id).and_then(|&idx| self.entries.get(idx))
    }

    pub fn last(&self) -> Option<&Message> {
        self.entries.last().map(Arc::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> + '_ {
        self.entries.iter().map(Arc::as_ref)
    }

    pub fn arcs(&self) -> &[Arc<Message>] {
        &self.entries
    }

    /// Appends a message. A message whose id is already present replaces the
    /// existing entry in place instead of being duplicated.
    pub fn push(&mut self, message: Message) {
        if let Some(&idx) = self.index.get(&message.id)
            && let Some(slot) = self.entries.get_mut(idx)
        {
            *slot = Arc::new(message);
            return;
        }
        self.index.insert(message.id.clone(), self.entries.len());
        self.entries.push(Arc::new(message));
    }

    /// Applies `f` to the message with `id`. Returns `false` when absent.
    pub fn update(&mut self, id: &MessageId, f: impl FnOnce(&mut Message)) -> bool {
        let Some(&idx) = self.index.get(id) else {
            return false;
        };
        let Some(slot) = self.entries.get_mut(idx) else {
            return false;
        };
        f(Arc::make_mut(slot));
        true
    }

    /// Updates every message matching `pred`, returns how many were touched.
    pub fn update_where(
        &mut self,
        pred: impl Fn(&Message) -> bool,
        mut f: impl FnMut(&mut Message),
    ) -> usize {
        let mut touched = 0;
        for slot in &mut self.entries {
            if pred(slot.as_ref()) {
                f(Arc::make_mut(slot));
                touched += 1;
            }
        }
        touched
    }

    pub fn find(&self, pred: impl Fn(&Message) -> bool) -> Option<&Message> {
        self.iter().find(|m| pred(m))
    }
}

impl From<Vec<Message>> for MessageLog {
    fn from(messages: Vec<Message>) -> Self {
        let mut log = MessageLog::new();
        for message in messages {
            log.push(message);
        }
        log
    }
}

impl From<MessageLog> for Vec<Message> {
    fn from(log: MessageLog) -> Self {
        log.entries
            .into_iter()
            .map(Arc::unwrap_or_clone)
            .collect()
    }
}
