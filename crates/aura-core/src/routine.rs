//! Routine blueprints and the registry operations over them.
//!
//! A [`RoutineBlueprint`] is a daily template. While it is active, the
//! day reconciler materializes one [`Task`] from it per day; activation
//! and deactivation create or remove today's instance immediately. Past
//! instances are ordinary tasks and are never touched by the registry.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::events::Event;
use crate::state::AppState;
use crate::task::{
    default_difficulty, default_duration, routine_instance_id, RoutineLink, Task, TaskCategory,
    MAX_DIFFICULTY, MIN_DIFFICULTY,
};

/// Reusable daily task template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineBlueprint {
    pub id: String,
    pub title: String,
    /// `HH:MM`, local.
    pub start_time: String,
    /// Minutes.
    #[serde(default = "default_duration")]
    pub duration: u32,
    pub category: TaskCategory,
    #[serde(default = "default_difficulty")]
    pub difficulty: u8,
    #[serde(default)]
    pub active: bool,
}

impl RoutineBlueprint {
    pub fn new(
        title: impl Into<String>,
        start_time: impl Into<String>,
        duration: u32,
        category: TaskCategory,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            start_time: start_time.into(),
            duration: duration.max(1),
            category,
            difficulty: MIN_DIFFICULTY,
            active: true,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_difficulty(mut self, difficulty: u8) -> Self {
        self.difficulty = difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Concrete task for `date` derived from this template.
    pub fn materialize(&self, date: NaiveDate) -> Task {
        Task {
            id: routine_instance_id(&self.id, date),
            title: self.title.clone(),
            duration: self.duration,
            start_time: Some(self.start_time.clone()),
            date: Some(date),
            completed: false,
            category: self.category,
            is_boss: false,
            sub_tasks: Vec::new(),
            difficulty: self.difficulty,
            routine: Some(RoutineLink {
                routine_id: self.id.clone(),
                instance_date: date,
            }),
            recurring: None,
        }
    }
}

/// Partial update for a blueprint. Activation goes through
/// [`AppState::toggle_routine_active`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutinePatch {
    pub title: Option<String>,
    pub start_time: Option<String>,
    pub duration: Option<u32>,
    pub category: Option<TaskCategory>,
    pub difficulty: Option<u8>,
}

impl RoutinePatch {
    pub fn apply(&self, routine: &mut RoutineBlueprint) {
        if let Some(title) = &self.title {
            routine.title = title.clone();
        }
        if let Some(start_time) = &self.start_time {
            routine.start_time = start_time.clone();
        }
        if let Some(duration) = self.duration {
            routine.duration = duration.max(1);
        }
        if let Some(category) = self.category {
            routine.category = category;
        }
        if let Some(difficulty) = self.difficulty {
            routine.difficulty = difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);
        }
    }

    /// Carry the template fields over onto a materialized instance.
    pub fn apply_to_instance(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(start_time) = &self.start_time {
            task.start_time = Some(start_time.clone());
        }
        if let Some(duration) = self.duration {
            task.duration = duration.max(1);
        }
        if let Some(category) = self.category {
            task.category = category;
        }
        if let Some(difficulty) = self.difficulty {
            task.difficulty = difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);
        }
    }
}

impl AppState {
    /// Append today's instance of `routine` unless one already exists.
    ///
    /// Returns the instance id when a task was created.
    pub(crate) fn materialize_instance(&mut self, routine: &RoutineBlueprint, today: NaiveDate) -> Option<String> {
        if self.tasks.iter().any(|t| t.is_instance_of(&routine.id, today)) {
            return None;
        }
        let task = routine.materialize(today);
        let id = task.id.clone();
        self.tasks.push(task);
        Some(id)
    }

    fn remove_instance(&mut self, routine_id: &str, today: NaiveDate) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.is_instance_of(routine_id, today));
        before - self.tasks.len()
    }

    pub fn add_routine(&mut self, routine: RoutineBlueprint, today: NaiveDate) -> Option<Event> {
        if self.routine(&routine.id).is_some() {
            return None;
        }
        if routine.active {
            self.materialize_instance(&routine, today);
        }
        debug!(routine = %routine.id, active = routine.active, "routine added");
        let event = Event::RoutineAdded {
            id: routine.id.clone(),
            active: routine.active,
        };
        self.routines.push(routine);
        Some(event)
    }

    /// Remove a blueprint and today's instance of it.
    pub fn delete_routine(&mut self, id: &str, today: NaiveDate) -> Option<Event> {
        let idx = self.routines.iter().position(|r| r.id == id)?;
        self.routines.remove(idx);
        let removed = self.remove_instance(id, today);
        debug!(routine = %id, removed, "routine deleted");
        Some(Event::RoutineDeleted { id: id.to_string() })
    }

    /// Flip `active`; materializes or removes today's instance.
    pub fn toggle_routine_active(&mut self, id: &str, today: NaiveDate) -> Option<Event> {
        let routine = self.routines.iter_mut().find(|r| r.id == id)?;
        routine.active = !routine.active;
        let snapshot = routine.clone();

        if snapshot.active {
            self.materialize_instance(&snapshot, today);
        } else {
            self.remove_instance(id, today);
        }
        debug!(routine = %id, active = snapshot.active, "routine toggled");
        Some(Event::RoutineToggled {
            id: id.to_string(),
            active: snapshot.active,
        })
    }

    /// Merge `patch` into the template and today's instance only.
    pub fn update_routine(&mut self, id: &str, patch: &RoutinePatch, today: NaiveDate) -> Option<Event> {
        let routine = self.routines.iter_mut().find(|r| r.id == id)?;
        patch.apply(routine);
        for task in self.tasks.iter_mut().filter(|t| t.is_instance_of(id, today)) {
            patch.apply_to_instance(task);
        }
        Some(Event::RoutineUpdated { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn walk() -> RoutineBlueprint {
        RoutineBlueprint::new("Morning Walk", "08:00", 20, TaskCategory::Health)
            .with_id("walk")
            .with_difficulty(1)
    }

    #[test]
    fn adding_active_routine_materializes_today() {
        let today = date(2024, 1, 1);
        let mut state = AppState::default();
        state.add_routine(walk(), today).unwrap();

        assert_eq!(state.tasks.len(), 1);
        let task = &state.tasks[0];
        assert_eq!(task.id, "routine-walk-2024-01-01");
        assert_eq!(task.title, "Morning Walk");
        assert_eq!(task.date, Some(today));
        assert!(task.is_instance_of("walk", today));
    }

    #[test]
    fn adding_inactive_routine_creates_nothing() {
        let mut state = AppState::default();
        state.add_routine(walk().with_active(false), date(2024, 1, 1));
        assert!(state.tasks.is_empty());
        assert_eq!(state.routines.len(), 1);
    }

    #[test]
    fn toggle_removes_only_todays_instance() {
        let mut state = AppState::default();
        let yesterday = date(2024, 1, 1);
        let today = date(2024, 1, 2);
        state.add_routine(walk(), yesterday);
        state.materialize_instance(&walk(), today);
        assert_eq!(state.tasks.len(), 2);

        state.toggle_routine_active("walk", today).unwrap();
        assert_eq!(state.tasks.len(), 1);
        assert!(state.tasks[0].is_instance_of("walk", yesterday));

        state.toggle_routine_active("walk", today).unwrap();
        assert_eq!(state.tasks.len(), 2);
    }

    #[test]
    fn reactivating_does_not_duplicate() {
        let today = date(2024, 1, 1);
        let mut state = AppState::default();
        state.add_routine(walk(), today);
        state.materialize_instance(&walk(), today);
        assert_eq!(state.tasks.len(), 1);
    }

    #[test]
    fn update_syncs_today_only() {
        let mut state = AppState::default();
        let yesterday = date(2024, 1, 1);
        let today = date(2024, 1, 2);
        state.add_routine(walk(), yesterday);
        state.materialize_instance(&walk(), today);

        let patch = RoutinePatch {
            title: Some("Evening Walk".into()),
            start_time: Some("19:00".into()),
            ..Default::default()
        };
        state.update_routine("walk", &patch, today).unwrap();

        assert_eq!(state.routine("walk").unwrap().title, "Evening Walk");
        let old = state.task("routine-walk-2024-01-01").unwrap();
        let new = state.task("routine-walk-2024-01-02").unwrap();
        assert_eq!(old.title, "Morning Walk");
        assert_eq!(new.title, "Evening Walk");
        assert_eq!(new.start_time.as_deref(), Some("19:00"));
    }

    #[test]
    fn delete_removes_template_and_todays_instance() {
        let mut state = AppState::default();
        let yesterday = date(2024, 1, 1);
        let today = date(2024, 1, 2);
        state.add_routine(walk(), yesterday);
        state.materialize_instance(&walk(), today);

        state.delete_routine("walk", today).unwrap();
        assert!(state.routines.is_empty());
        assert_eq!(state.tasks.len(), 1);
        assert!(state.task("routine-walk-2024-01-01").is_some());
    }

    #[test]
    fn unknown_routine_is_a_no_op() {
        let mut state = AppState::default();
        let today = date(2024, 1, 1);
        assert!(state.toggle_routine_active("ghost", today).is_none());
        assert!(state.delete_routine("ghost", today).is_none());
        assert!(state
            .update_routine("ghost", &RoutinePatch::default(), today)
            .is_none());
    }
}
