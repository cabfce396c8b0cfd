use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::IntervalType;

/// Every state change in the system produces an Event.
/// Front ends render them; not-found mutations produce none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TasksAdded {
        ids: Vec<String>,
    },
    TaskToggled {
        id: String,
        completed: bool,
        /// Today's history counter after the toggle.
        day_count: u32,
        xp: u64,
    },
    SubtaskToggled {
        task_id: String,
        subtask_id: String,
        completed: bool,
    },
    TaskUpdated {
        id: String,
    },
    /// Task removed and staged for undo until `undo_until`.
    TaskDeleted {
        id: String,
        undo_until: DateTime<Utc>,
    },
    TaskRestored {
        id: String,
    },
    /// Undo window closed without an undo.
    UndoExpired {
        id: String,
    },
    RoutineAdded {
        id: String,
        active: bool,
    },
    RoutineDeleted {
        id: String,
    },
    RoutineToggled {
        id: String,
        active: bool,
    },
    RoutineUpdated {
        id: String,
    },
    DayReconciled {
        date: NaiveDate,
        purged: usize,
        materialized: usize,
    },
    IntervalStarted {
        interval: IntervalType,
        length_min: u32,
        ends_at: DateTime<Utc>,
    },
    IntervalPaused {
        interval: IntervalType,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    IntervalResumed {
        interval: IntervalType,
        ends_at: DateTime<Utc>,
    },
    IntervalCancelled {
        interval: IntervalType,
        at: DateTime<Utc>,
    },
    IntervalCompleted {
        interval: IntervalType,
        length_min: u32,
        at: DateTime<Utc>,
    },
    ChatArchived {
        id: String,
        messages: usize,
    },
    ChatRestored {
        id: String,
    },
    ChatDeleted {
        id: String,
    },
    PlanApplied {
        created: usize,
        updated: usize,
        reality_check: Option<String>,
    },
}
