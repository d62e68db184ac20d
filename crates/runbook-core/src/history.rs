use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::message::{ContentBlock, Message, MessageContent, Role};

/// Ordered conversation turns, kept in the shape the completion protocol
/// accepts: roles alternate and no turn opens with an orphaned tool result.
///
/// [`push`](Self::push) coalesces a turn into the previous one when both have
/// the same role, so alternation holds after every append rather than being
/// repaired afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationHistory {
    turns: Vec<Message>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a history from raw turns, coalescing same-role neighbours.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        let mut history = Self::new();
        for message in messages {
            history.push(message);
        }
        history
    }

    /// Keep at most the last `max_turns` raw turns, then drop leading turns
    /// until the window opens on a user turn that is not a tool result.
    ///
    /// A single forward scan: if no valid starting turn exists the result is
    /// empty.
    pub fn recent_window(messages: Vec<Message>, max_turns: usize) -> Self {
        let start = messages.len().saturating_sub(max_turns);
        let window = &messages[start..];
        match window
            .iter()
            .position(|m| m.role == Role::User && !m.first_block_is_tool_result())
        {
            Some(first_valid) => Self::from_messages(window[first_valid..].to_vec()),
            None => Self::new(),
        }
    }

    /// Append a turn. Empty turns are ignored; a turn with the same role as
    /// the last one is merged into it.
    pub fn push(&mut self, message: Message) {
        if message.content.is_empty() {
            return;
        }
        match self.turns.last_mut() {
            Some(last) if last.role == message.role => {
                let previous = std::mem::replace(&mut last.content, MessageContent::Blocks(vec![]));
                let mut blocks = previous.into_blocks();
                blocks.extend(message.content.into_blocks());
                last.content = MessageContent::Blocks(blocks);
            }
            _ => self.turns.push(message),
        }
    }

    pub fn push_user_text(&mut self, text: impl Into<String>) {
        self.push(Message::user(text));
    }

    pub fn push_assistant_block(&mut self, block: ContentBlock) {
        self.push(Message::blocks(Role::Assistant, vec![block]));
    }

    pub fn push_tool_result(&mut self, tool_use_id: impl Into<String>, content: impl Into<String>) {
        self.push(Message::tool_result(tool_use_id, content));
    }

    pub fn ends_with_user(&self) -> bool {
        self.turns.last().is_some_and(|m| m.role == Role::User)
    }

    /// Append a fixed assistant turn if the history ends on a user turn.
    /// Returns whether a turn was added.
    pub fn close_with_assistant(&mut self, placeholder: &str) -> bool {
        if self.ends_with_user() {
            self.turns.push(Message::assistant_text(placeholder));
            true
        } else {
            false
        }
    }

    /// Check every protocol invariant: the first turn is a plain user turn,
    /// roles strictly alternate, and every tool result answers a tool use from
    /// the assistant turn right before it.
    pub fn is_well_formed(&self) -> bool {
        if let Some(first) = self.turns.first() {
            if first.role != Role::User || first.first_block_is_tool_result() {
                return false;
            }
        }
        for pair in self.turns.windows(2) {
            if pair[0].role == pair[1].role {
                return false;
            }
        }
        for (idx, turn) in self.turns.iter().enumerate() {
            let MessageContent::Blocks(blocks) = &turn.content else {
                continue;
            };
            let answered: Vec<&str> = blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::ToolResult { tool_use_id, .. } => Some(tool_use_id.as_str()),
                    _ => None,
                })
                .collect();
            if answered.is_empty() {
                continue;
            }
            let Some(previous) = idx.checked_sub(1).map(|i| &self.turns[i]) else {
                return false;
            };
            let requested: HashSet<String> =
                previous.tool_uses().into_iter().map(|call| call.id).collect();
            if answered.iter().any(|id| !requested.contains(*id)) {
                return false;
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.turns.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.turns.iter()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.turns
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.turns
    }
}
