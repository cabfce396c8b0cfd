//! Task ledger: mutations over `AppState::tasks`.
//!
//! Toggling completion is the only operation with stat side effects; it
//! moves today's history counter, XP and the streak floor together.
//! Deletion goes through the single-slot undo buffer.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::debug;

use super::{Task, TaskPatch};
use crate::events::Event;
use crate::state::AppState;
use crate::stats::TASK_XP;

impl AppState {
    fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Prepend `tasks` in the given order. Ids are the caller's business.
    pub fn add_tasks(&mut self, tasks: Vec<Task>) -> Option<Event> {
        if tasks.is_empty() {
            return None;
        }
        let ids: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
        self.tasks.splice(0..0, tasks);
        debug!(count = ids.len(), "tasks added");
        Some(Event::TasksAdded { ids })
    }

    /// Flip completion and move today's counter, XP and streak.
    pub fn toggle_task(&mut self, id: &str, today: NaiveDate) -> Option<Event> {
        let task = self.task_mut(id)?;
        task.completed = !task.completed;
        let completed = task.completed;

        let day_count = if completed {
            self.stats.gain_xp(TASK_XP);
            self.history.increment(today)
        } else {
            self.stats.lose_xp(TASK_XP);
            self.history.decrement(today)
        };
        self.stats.bump_streak(day_count);

        debug!(task = %id, completed, day_count, xp = self.stats.xp, "task toggled");
        Some(Event::TaskToggled {
            id: id.to_string(),
            completed,
            day_count,
            xp: self.stats.xp,
        })
    }

    pub fn toggle_subtask(&mut self, task_id: &str, subtask_id: &str) -> Option<Event> {
        let sub = self
            .task_mut(task_id)?
            .sub_tasks
            .iter_mut()
            .find(|s| s.id == subtask_id)?;
        sub.completed = !sub.completed;
        Some(Event::SubtaskToggled {
            task_id: task_id.to_string(),
            subtask_id: subtask_id.to_string(),
            completed: sub.completed,
        })
    }

    pub fn update_task(&mut self, id: &str, patch: &TaskPatch) -> Option<Event> {
        let task = self.task_mut(id)?;
        patch.apply(task);
        debug!(task = %id, "task updated");
        Some(Event::TaskUpdated { id: id.to_string() })
    }

    /// Remove a task and stage it in the undo slot for `window`.
    ///
    /// Any previously staged task is dropped for good.
    pub fn delete_task(&mut self, id: &str, now: DateTime<Utc>, window: Duration) -> Option<Event> {
        let idx = self.tasks.iter().position(|t| t.id == id)?;
        let task = self.tasks.remove(idx);
        self.undo.stage(task, now, window);
        debug!(task = %id, "task deleted");
        Some(Event::TaskDeleted {
            id: id.to_string(),
            undo_until: now + window,
        })
    }

    /// Put the staged task back at the front of the list.
    pub fn undo_delete(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let task = self.undo.take(now)?;
        let id = task.id.clone();
        self.tasks.insert(0, task);
        debug!(task = %id, "delete undone");
        Some(Event::TaskRestored { id })
    }

    /// Clear the undo slot if its window has closed.
    pub fn expire_undo(&mut self, now: DateTime<Utc>) -> Option<Event> {
        self.undo
            .expire_due(now)
            .map(|entry| Event::UndoExpired { id: entry.task.id })
    }
}
