//! Free-text task ingestion and chat replies.
//!
//! A [`TaskPlanner`] turns the user's text into a [`RawPlan`]; a
//! [`ChatResponder`] answers a chat message. The payload
//! is untrusted: [`RawPlan::validate`] accepts the whole batch or nothing,
//! and only a validated plan can be applied to the state.

mod gemini;

pub use gemini::GeminiPlanner;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::IngestError;
use crate::events::Event;
use crate::state::{AiMode, AppState, EnergyLevel};
use crate::task::{SubTask, Task, TaskCategory, MAX_DIFFICULTY, MIN_DIFFICULTY};

/// Everything a planner gets to see.
#[derive(Debug, Clone, Serialize)]
pub struct PlanRequest {
    pub input: String,
    pub mode: AiMode,
    pub energy: EnergyLevel,
    pub existing: Vec<Task>,
    pub now: DateTime<Utc>,
}

/// Source of task plans.
pub trait TaskPlanner {
    fn plan(&self, request: &PlanRequest) -> Result<RawPlan, IngestError>;
}

/// Source of chat replies. Each message is answered on its own, without
/// the rest of the transcript.
pub trait ChatResponder {
    fn reply(&self, message: &str) -> Result<String, IngestError>;
}

// ── Untrusted payload ──

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSubTask {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTask {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub difficulty: Option<f64>,
    #[serde(default)]
    pub is_boss: Option<bool>,
    #[serde(default)]
    pub sub_tasks: Option<Vec<RawSubTask>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlan {
    #[serde(default)]
    pub tasks: Option<Vec<RawTask>>,
    #[serde(default)]
    pub reality_check: Option<String>,
}

// ── Validated plan ──

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTask {
    /// Existing task to update in place, if the planner named one.
    pub id: Option<String>,
    pub title: String,
    pub duration: u32,
    pub start_time: Option<String>,
    pub date: Option<NaiveDate>,
    pub category: TaskCategory,
    pub difficulty: u8,
    pub is_boss: bool,
    pub sub_tasks: Option<Vec<SubTask>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidPlan {
    pub tasks: Vec<PlannedTask>,
    pub reality_check: Option<String>,
}

fn malformed(index: usize, message: impl std::fmt::Display) -> IngestError {
    IngestError::MalformedPayload(format!("task {index}: {message}"))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

impl RawTask {
    fn validate(&self, index: usize) -> Result<PlannedTask, IngestError> {
        let title = non_empty(self.title.as_deref()).ok_or_else(|| malformed(index, "empty title"))?;

        let duration = match self.duration {
            Some(d) if d.is_finite() && d >= 1.0 && d <= f64::from(u32::MAX) => d.round() as u32,
            Some(d) => return Err(malformed(index, format!("invalid duration {d}"))),
            None => return Err(malformed(index, "missing duration")),
        };

        let raw_category = self.category.as_deref().unwrap_or_default();
        let category = TaskCategory::parse(raw_category)
            .ok_or_else(|| malformed(index, format!("unknown category '{raw_category}'")))?;

        let difficulty = match self.difficulty {
            Some(d) if d.fract() == 0.0 && (f64::from(MIN_DIFFICULTY)..=f64::from(MAX_DIFFICULTY)).contains(&d) => d as u8,
            Some(d) => return Err(malformed(index, format!("difficulty {d} outside 1-5"))),
            None => return Err(malformed(index, "missing difficulty")),
        };

        let start_time = match non_empty(self.start_time.as_deref()) {
            Some(t) => {
                let parsed = NaiveTime::parse_from_str(t, "%H:%M")
                    .map_err(|_| malformed(index, format!("bad start time '{t}'")))?;
                Some(parsed.format("%H:%M").to_string())
            }
            None => None,
        };

        let date = match non_empty(self.date.as_deref()) {
            Some(d) => Some(
                NaiveDate::parse_from_str(d, "%Y-%m-%d")
                    .map_err(|_| malformed(index, format!("bad date '{d}'")))?,
            ),
            None => None,
        };

        let sub_tasks = match &self.sub_tasks {
            Some(subs) => Some(
                subs.iter()
                    .map(|s| {
                        let title = non_empty(s.title.as_deref())
                            .ok_or_else(|| malformed(index, "empty subtask title"))?;
                        let mut sub = SubTask::new(title);
                        sub.completed = s.completed.unwrap_or(false);
                        Ok(sub)
                    })
                    .collect::<Result<Vec<_>, IngestError>>()?,
            ),
            None => None,
        };

        Ok(PlannedTask {
            id: non_empty(self.id.as_deref()).map(str::to_string),
            title: title.to_string(),
            duration,
            start_time,
            date,
            category,
            difficulty,
            is_boss: self.is_boss.unwrap_or(false),
            sub_tasks,
        })
    }
}

impl RawPlan {
    /// Check every task; one bad entry rejects the batch.
    pub fn validate(&self) -> Result<ValidPlan, IngestError> {
        let raw = self
            .tasks
            .as_ref()
            .ok_or_else(|| IngestError::MalformedPayload("missing tasks".into()))?;
        let tasks = raw
            .iter()
            .enumerate()
            .map(|(i, t)| t.validate(i))
            .collect::<Result<Vec<_>, _>>()?;
        let reality_check = non_empty(self.reality_check.as_deref()).map(str::to_string);
        Ok(ValidPlan {
            tasks,
            reality_check,
        })
    }
}

/// Result of applying a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub reality_check: Option<String>,
}

impl AppState {
    /// Apply a validated plan: update tasks whose id matches, prepend the rest.
    pub fn apply_plan(&mut self, plan: ValidPlan) -> (PlanSummary, Event) {
        let mut summary = PlanSummary {
            reality_check: plan.reality_check,
            ..Default::default()
        };
        let mut new_tasks = Vec::new();

        for planned in plan.tasks {
            let existing = planned
                .id
                .as_deref()
                .and_then(|id| self.tasks.iter_mut().find(|t| t.id == id));
            match existing {
                Some(task) => {
                    task.title = planned.title;
                    task.duration = planned.duration;
                    task.category = planned.category;
                    task.difficulty = planned.difficulty;
                    task.is_boss = planned.is_boss;
                    if planned.start_time.is_some() {
                        task.start_time = planned.start_time;
                    }
                    if planned.date.is_some() {
                        task.date = planned.date;
                    }
                    if let Some(subs) = planned.sub_tasks {
                        task.sub_tasks = subs;
                    }
                    summary.updated.push(task.id.clone());
                }
                None => {
                    let mut task = Task::new(planned.title, planned.category)
                        .with_duration(planned.duration)
                        .with_difficulty(planned.difficulty)
                        .with_boss(planned.is_boss)
                        .with_subtasks(planned.sub_tasks.unwrap_or_default());
                    task.start_time = planned.start_time;
                    task.date = planned.date;
                    summary.created.push(task.id.clone());
                    new_tasks.push(task);
                }
            }
        }

        self.add_tasks(new_tasks);
        debug!(
            created = summary.created.len(),
            updated = summary.updated.len(),
            "plan applied"
        );
        let event = Event::PlanApplied {
            created: summary.created.len(),
            updated: summary.updated.len(),
            reality_check: summary.reality_check.clone(),
        };
        (summary, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(title: &str) -> RawTask {
        RawTask {
            title: Some(title.into()),
            duration: Some(30.0),
            category: Some("work".into()),
            difficulty: Some(3.0),
            is_boss: Some(false),
            ..Default::default()
        }
    }

    fn plan(tasks: Vec<RawTask>) -> RawPlan {
        RawPlan {
            tasks: Some(tasks),
            reality_check: None,
        }
    }

    #[test]
    fn parses_camel_case_payload() {
        let json = r#"{
            "tasks": [{"title": "Deep work", "duration": 90, "startTime": "09:00",
                       "category": "work", "difficulty": 4, "isBoss": true,
                       "subTasks": [{"title": "outline"}]}],
            "realityCheck": "Too much for one day."
        }"#;
        let valid = serde_json::from_str::<RawPlan>(json).unwrap().validate().unwrap();
        let task = &valid.tasks[0];
        assert_eq!(task.start_time.as_deref(), Some("09:00"));
        assert!(task.is_boss);
        assert_eq!(task.sub_tasks.as_ref().unwrap()[0].title, "outline");
        assert_eq!(valid.reality_check.as_deref(), Some("Too much for one day."));
    }

    #[test]
    fn one_bad_task_rejects_batch() {
        let mut bad = raw("Errands");
        bad.category = Some("errands".into());
        let err = plan(vec![raw("ok"), bad]).validate().unwrap_err();
        assert!(matches!(err, IngestError::MalformedPayload(ref m) if m.contains("task 1")));
    }

    #[test]
    fn rejects_out_of_range_fields() {
        let cases: [fn(&mut RawTask); 7] = [
            |t| t.difficulty = Some(6.0),
            |t| t.difficulty = Some(2.5),
            |t| t.duration = Some(0.0),
            |t| t.duration = None,
            |t| t.title = Some("   ".into()),
            |t| t.start_time = Some("25:00".into()),
            |t| t.date = Some("tomorrow".into()),
        ];
        for mutate in cases {
            let mut task = raw("x");
            mutate(&mut task);
            assert!(plan(vec![task]).validate().is_err());
        }
        assert!(RawPlan::default().validate().is_err());
    }

    #[test]
    fn apply_updates_by_id_and_prepends_new() {
        let mut state = AppState::default();
        state.tasks.push(
            Task::with_id("t1", "Gym", TaskCategory::Health)
                .with_start_time("07:00")
                .completed(true),
        );
        state.tasks.push(Task::with_id("t2", "Read", TaskCategory::Growth));

        let mut moved = raw("Gym");
        moved.id = Some("t1".into());
        moved.category = Some("health".into());
        moved.start_time = Some("18:00".into());
        let mut ghost = raw("Call mom");
        ghost.id = Some("does-not-exist".into());

        let valid = plan(vec![moved, raw("Write report"), ghost]).validate().unwrap();
        let (summary, _event) = state.apply_plan(valid);

        assert_eq!(summary.updated, ["t1"]);
        assert_eq!(summary.created.len(), 2);
        assert_eq!(state.tasks.len(), 4);
        assert_eq!(state.tasks[0].title, "Write report");
        assert_eq!(state.tasks[1].title, "Call mom");
        assert_ne!(state.tasks[1].id, "does-not-exist");

        let gym = state.task("t1").unwrap();
        assert_eq!(gym.start_time.as_deref(), Some("18:00"));
        assert!(gym.completed);
        assert!(!state.tasks[0].completed);
    }
}
