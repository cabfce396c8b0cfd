//! Task types.
//!
//! A [`Task`] is a unit of work for one day. Tasks created from a routine
//! template carry a [`RoutineLink`] naming the template and the date they
//! were materialized for; everything else about them is an ordinary task.

mod ledger;
pub mod reconciliation;

pub use reconciliation::{PurgePolicy, ReconcileReport};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Fixed task category set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Work,
    Personal,
    Health,
    Growth,
}

impl TaskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::Work => "work",
            TaskCategory::Personal => "personal",
            TaskCategory::Health => "health",
            TaskCategory::Growth => "growth",
        }
    }

    /// Parse a lowercase category name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "work" => Some(TaskCategory::Work),
            "personal" => Some(TaskCategory::Personal),
            "health" => Some(TaskCategory::Health),
            "growth" => Some(TaskCategory::Growth),
            _ => None,
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recurrence marker carried over from manual entry. Advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    Daily,
    Weekly,
    None,
}

/// Link from a materialized instance back to its routine template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineLink {
    pub routine_id: String,
    pub instance_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

impl SubTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            completed: false,
        }
    }
}

pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 5;

pub(crate) fn default_duration() -> u32 {
    30
}

pub(crate) fn default_difficulty() -> u8 {
    MIN_DIFFICULTY
}

/// Core task type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    /// Minutes.
    #[serde(default = "default_duration")]
    pub duration: u32,
    /// `HH:MM`, local.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// Day the task belongs to; `None` means "today".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub completed: bool,
    pub category: TaskCategory,
    #[serde(default)]
    pub is_boss: bool,
    #[serde(default)]
    pub sub_tasks: Vec<SubTask>,
    /// 1-5 cognitive load.
    #[serde(default = "default_difficulty")]
    pub difficulty: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routine: Option<RoutineLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring: Option<Recurrence>,
}

impl Task {
    /// New incomplete task with a random id, 30 minutes, difficulty 1.
    pub fn new(title: impl Into<String>, category: TaskCategory) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), title, category)
    }

    pub fn with_id(id: impl Into<String>, title: impl Into<String>, category: TaskCategory) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            duration: 30,
            start_time: None,
            date: None,
            completed: false,
            category,
            is_boss: false,
            sub_tasks: Vec::new(),
            difficulty: MIN_DIFFICULTY,
            routine: None,
            recurring: None,
        }
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration = minutes.max(1);
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_start_time(mut self, start_time: impl Into<String>) -> Self {
        self.start_time = Some(start_time.into());
        self
    }

    pub fn with_difficulty(mut self, difficulty: u8) -> Self {
        self.difficulty = difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);
        self
    }

    pub fn with_boss(mut self, is_boss: bool) -> Self {
        self.is_boss = is_boss;
        self
    }

    pub fn with_subtasks(mut self, sub_tasks: Vec<SubTask>) -> Self {
        self.sub_tasks = sub_tasks;
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    /// The day this task counts against, defaulting to `today`.
    pub fn effective_date(&self, today: NaiveDate) -> NaiveDate {
        self.date.unwrap_or(today)
    }

    /// Dated strictly before `today`. Undated tasks are never past.
    pub fn is_past(&self, today: NaiveDate) -> bool {
        self.effective_date(today) < today
    }

    pub fn is_routine_instance(&self) -> bool {
        self.routine.is_some()
    }

    /// Whether this task is the materialized instance of `routine_id` for `date`.
    pub fn is_instance_of(&self, routine_id: &str, date: NaiveDate) -> bool {
        self.routine
            .as_ref()
            .is_some_and(|link| link.routine_id == routine_id && link.instance_date == date)
    }
}

/// Identifier used for a routine instance on a given day.
pub fn routine_instance_id(routine_id: &str, date: NaiveDate) -> String {
    format!("routine-{routine_id}-{}", date.format("%Y-%m-%d"))
}

/// Partial update for [`Task`]. `None` fields are left untouched.
///
/// Completion is deliberately absent: it goes through `toggle_task` so
/// history and XP stay consistent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub duration: Option<u32>,
    pub start_time: Option<String>,
    pub date: Option<NaiveDate>,
    pub category: Option<TaskCategory>,
    pub is_boss: Option<bool>,
    pub sub_tasks: Option<Vec<SubTask>>,
    pub difficulty: Option<u8>,
    pub recurring: Option<Recurrence>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(duration) = self.duration {
            task.duration = duration.max(1);
        }
        if let Some(start_time) = &self.start_time {
            task.start_time = Some(start_time.clone());
        }
        if let Some(date) = self.date {
            task.date = Some(date);
        }
        if let Some(category) = self.category {
            task.category = category;
        }
        if let Some(is_boss) = self.is_boss {
            task.is_boss = is_boss;
        }
        if let Some(sub_tasks) = &self.sub_tasks {
            task.sub_tasks = sub_tasks.clone();
        }
        if let Some(difficulty) = self.difficulty {
            task.difficulty = difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);
        }
        if let Some(recurring) = self.recurring {
            task.recurring = Some(recurring);
        }
    }
}

/// Presentation ordering for the task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortPreference {
    Difficulty,
    #[default]
    Time,
    Category,
}

impl SortPreference {
    fn compare(&self, a: &Task, b: &Task) -> Ordering {
        match self {
            SortPreference::Difficulty => b.difficulty.cmp(&a.difficulty),
            SortPreference::Category => a.category.as_str().cmp(b.category.as_str()),
            // Untimed tasks sink to the bottom.
            SortPreference::Time => a
                .start_time
                .as_deref()
                .unwrap_or("99:99")
                .cmp(b.start_time.as_deref().unwrap_or("99:99")),
        }
    }
}

/// Stable sort of `tasks` by `preference`.
pub fn sort_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>, preference: SortPreference) -> Vec<&'a Task> {
    let mut list: Vec<&Task> = tasks.into_iter().collect();
    list.sort_by(|a, b| preference.compare(a, b));
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn undated_task_is_never_past() {
        let task = Task::new("Inbox zero", TaskCategory::Work);
        assert!(!task.is_past(date(2030, 1, 1)));
        let dated = task.with_date(date(2024, 1, 1));
        assert!(dated.is_past(date(2024, 1, 2)));
        assert!(!dated.is_past(date(2024, 1, 1)));
    }

    #[test]
    fn routine_instance_id_format() {
        assert_eq!(
            routine_instance_id("walk", date(2024, 1, 2)),
            "routine-walk-2024-01-02"
        );
    }

    #[test]
    fn patch_leaves_unset_fields() {
        let mut task = Task::with_id("t1", "Draft", TaskCategory::Work)
            .with_duration(45)
            .with_difficulty(3);
        TaskPatch {
            title: Some("Final draft".into()),
            difficulty: Some(9),
            ..Default::default()
        }
        .apply(&mut task);
        assert_eq!(task.title, "Final draft");
        assert_eq!(task.duration, 45);
        assert_eq!(task.difficulty, MAX_DIFFICULTY);
    }

    #[test]
    fn time_sort_puts_untimed_last() {
        let a = Task::with_id("a", "a", TaskCategory::Work);
        let b = Task::with_id("b", "b", TaskCategory::Work).with_start_time("13:00");
        let c = Task::with_id("c", "c", TaskCategory::Work).with_start_time("08:30");
        let tasks = vec![a, b, c];
        let ids: Vec<_> = sort_tasks(&tasks, SortPreference::Time)
            .into_iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, ["c", "b", "a"]);
    }

    #[test]
    fn difficulty_sort_is_descending() {
        let tasks = vec![
            Task::with_id("easy", "e", TaskCategory::Work).with_difficulty(1),
            Task::with_id("hard", "h", TaskCategory::Work).with_difficulty(5),
        ];
        let first = sort_tasks(&tasks, SortPreference::Difficulty)[0];
        assert_eq!(first.id, "hard");
    }

    #[test]
    fn category_parse_rejects_unknown() {
        assert_eq!(TaskCategory::parse(" Health "), Some(TaskCategory::Health));
        assert_eq!(TaskCategory::parse("errands"), None);
    }
}
