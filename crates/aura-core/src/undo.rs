//! Single-slot undo buffer for task deletion.
//!
//! Each staged deletion gets its own [`UndoTicket`]. Expiry is keyed to the
//! ticket, so a timer scheduled for an earlier deletion can never clear a
//! newer entry.

use chrono::{DateTime, Duration, Utc};

use crate::task::Task;

/// Identifies one staged deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UndoTicket(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct UndoEntry {
    pub task: Task,
    pub ticket: UndoTicket,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UndoBuffer {
    slot: Option<UndoEntry>,
    next_ticket: u64,
}

impl UndoBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `task`, replacing any previous entry.
    pub fn stage(&mut self, task: Task, now: DateTime<Utc>, window: Duration) -> UndoTicket {
        self.next_ticket += 1;
        let ticket = UndoTicket(self.next_ticket);
        self.slot = Some(UndoEntry {
            task,
            ticket,
            expires_at: now + window,
        });
        ticket
    }

    pub fn peek(&self) -> Option<&UndoEntry> {
        self.slot.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    /// Take the staged task if it has not expired at `now`.
    pub fn take(&mut self, now: DateTime<Utc>) -> Option<Task> {
        self.expire_due(now);
        self.slot.take().map(|entry| entry.task)
    }

    /// Clear the slot only if it still holds `ticket`.
    pub fn expire(&mut self, ticket: UndoTicket) -> bool {
        if self.slot.as_ref().is_some_and(|e| e.ticket == ticket) {
            self.slot = None;
            true
        } else {
            false
        }
    }

    /// Clear the slot if its entry expired at or before `now`.
    pub fn expire_due(&mut self, now: DateTime<Utc>) -> Option<UndoEntry> {
        if self.slot.as_ref().is_some_and(|e| now >= e.expires_at) {
            self.slot.take()
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }
}
