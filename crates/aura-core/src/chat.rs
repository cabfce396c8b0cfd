//! Live chat transcript and the bounded archive of past ones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::events::Event;
use crate::state::AppState;

/// Maximum number of archived sessions kept; oldest are evicted.
pub const ARCHIVE_CAP: usize = 50;
/// Characters of the first message kept as a session preview.
pub const PREVIEW_CHARS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub preview: String,
    pub messages: Vec<ChatMessage>,
}

fn preview_of(messages: &[ChatMessage]) -> String {
    messages
        .first()
        .map(|m| m.text.chars().take(PREVIEW_CHARS).collect())
        .unwrap_or_default()
}

impl AppState {
    pub fn push_chat_message(&mut self, role: ChatRole, text: impl Into<String>, now: DateTime<Utc>) {
        self.chats.push(ChatMessage {
            role,
            text: text.into(),
            timestamp: now,
        });
    }

    pub fn clear_chat(&mut self) {
        self.chats.clear();
    }

    /// Move the live transcript to the front of the archive.
    pub fn archive_current_chat(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.chats.is_empty() {
            return None;
        }
        let messages = std::mem::take(&mut self.chats);
        let session = ChatSession {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: now,
            preview: preview_of(&messages),
            messages,
        };
        let event = Event::ChatArchived {
            id: session.id.clone(),
            messages: session.messages.len(),
        };
        self.archived_chats.insert(0, session);
        self.archived_chats.truncate(ARCHIVE_CAP);
        debug!(archived = self.archived_chats.len(), "chat archived");
        Some(event)
    }

    /// Replace the live transcript with an archived session's messages.
    /// The session stays in the archive.
    pub fn restore_session(&mut self, id: &str) -> Option<Event> {
        let session = self.archived_chats.iter().find(|s| s.id == id)?;
        self.chats = session.messages.clone();
        Some(Event::ChatRestored { id: id.to_string() })
    }

    pub fn delete_session(&mut self, id: &str) -> Option<Event> {
        let idx = self.archived_chats.iter().position(|s| s.id == id)?;
        self.archived_chats.remove(idx);
        Some(Event::ChatDeleted { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_wraps_and_clears_live_transcript() {
        let now = Utc::now();
        let mut state = AppState::default();
        assert!(state.archive_current_chat(now).is_none());

        let long = "x".repeat(100);
        state.push_chat_message(ChatRole::User, long, now);
        state.push_chat_message(ChatRole::Model, "ok", now);
        state.archive_current_chat(now).unwrap();

        assert!(state.chats.is_empty());
        let session = &state.archived_chats[0];
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.preview.chars().count(), PREVIEW_CHARS);
    }

    #[test]
    fn archive_keeps_newest_fifty() {
        let now = Utc::now();
        let mut state = AppState::default();
        for i in 0..(ARCHIVE_CAP + 5) {
            state.push_chat_message(ChatRole::User, format!("msg {i}"), now);
            state.archive_current_chat(now);
        }
        assert_eq!(state.archived_chats.len(), ARCHIVE_CAP);
        assert_eq!(state.archived_chats[0].preview, "msg 54");
        assert_eq!(state.archived_chats[ARCHIVE_CAP - 1].preview, "msg 5");
    }

    #[test]
    fn restore_copies_without_removing() {
        let now = Utc::now();
        let mut state = AppState::default();
        state.push_chat_message(ChatRole::User, "plan my day", now);
        state.archive_current_chat(now);
        let id = state.archived_chats[0].id.clone();

        state.restore_session(&id).unwrap();
        assert_eq!(state.chats.len(), 1);
        assert_eq!(state.archived_chats.len(), 1);

        state.delete_session(&id).unwrap();
        assert!(state.archived_chats.is_empty());
        assert!(state.delete_session(&id).is_none());
        assert!(state.restore_session(&id).is_none());
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let now = Utc::now();
        let msgs = vec![ChatMessage {
            role: ChatRole::User,
            text: "é".repeat(80),
            timestamp: now,
        }];
        assert_eq!(preview_of(&msgs).chars().count(), PREVIEW_CHARS);
    }
}
