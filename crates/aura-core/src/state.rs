//! The application state tree.
//!
//! [`AppState`] is the single value the snapshot store persists. Every
//! mutation in the ledger, routine registry, interval timer and chat
//! archive is a method on it; the [`crate::Aura`] controller owns one
//! instance and is the only writer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::chat::{ChatMessage, ChatSession};
use crate::routine::RoutineBlueprint;
use crate::stats::{History, UserStats};
use crate::task::{SortPreference, Task};
use crate::timer::{ChronoState, Rituals};
use crate::undo::UndoBuffer;

/// Tone of the planner's system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiMode {
    Soft,
    #[default]
    Normal,
    Brutal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyLevel {
    #[default]
    Morning,
    Afternoon,
    Night,
}

impl EnergyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnergyLevel::Morning => "morning",
            EnergyLevel::Afternoon => "afternoon",
            EnergyLevel::Night => "night",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub name: String,
    pub motto: String,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: "Seeker".into(),
            motto: "Flow follows focus.".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Glass,
    Midnight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlassStyle {
    Pure,
    Deep,
    Prism,
    #[default]
    Fusion,
}

/// Appearance preferences. Stored, never interpreted by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Appearance {
    pub theme: Theme,
    pub accent_color: String,
    pub glass_style: GlassStyle,
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            accent_color: "blue".into(),
            glass_style: GlassStyle::default(),
        }
    }
}

/// Whole persisted application state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppState {
    pub tasks: Vec<Task>,
    pub routines: Vec<RoutineBlueprint>,
    /// Local date the day reconciler last rolled the state over.
    pub last_reconciled: Option<NaiveDate>,
    pub stats: UserStats,
    pub history: History,
    pub ai_mode: AiMode,
    pub api_key: Option<String>,
    pub energy_level: EnergyLevel,
    pub onboarded: bool,
    pub profile: Profile,
    pub appearance: Appearance,
    pub rituals: Rituals,
    /// Live chat transcript.
    pub chats: Vec<ChatMessage>,
    /// Archived transcripts, newest first.
    pub archived_chats: Vec<ChatSession>,
    pub chrono: ChronoState,
    pub sort_preference: SortPreference,
    /// Recently deleted task. Ephemeral: never persisted.
    #[serde(skip)]
    pub undo: UndoBuffer,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            routines: Vec::new(),
            last_reconciled: None,
            stats: UserStats::default(),
            history: History::default(),
            ai_mode: AiMode::default(),
            api_key: None,
            energy_level: EnergyLevel::default(),
            onboarded: true,
            profile: Profile::default(),
            appearance: Appearance::default(),
            rituals: Rituals::default(),
            chats: Vec::new(),
            archived_chats: Vec::new(),
            chrono: ChronoState::default(),
            sort_preference: SortPreference::default(),
            undo: UndoBuffer::default(),
        }
    }
}

impl AppState {
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn routine(&self, id: &str) -> Option<&RoutineBlueprint> {
        self.routines.iter().find(|r| r.id == id)
    }

    /// Tasks that belong to `today` (undated tasks included).
    pub fn today_tasks(&self, today: NaiveDate) -> impl Iterator<Item = &Task> + '_ {
        self.tasks
            .iter()
            .filter(move |t| t.effective_date(today) == today)
    }

    /// Today's tasks in the user's preferred order.
    pub fn sorted_today(&self, today: NaiveDate) -> Vec<&Task> {
        crate::task::sort_tasks(self.today_tasks(today), self.sort_preference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskCategory;

    #[test]
    fn undo_slot_is_not_serialized() {
        let mut state = AppState::default();
        let task = Task::with_id("t1", "Gone", TaskCategory::Work);
        state
            .undo
            .stage(task, chrono::Utc::now(), chrono::Duration::seconds(5));
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("undo").is_none());
        assert!(json.get("tasks").is_some());
    }

    #[test]
    fn today_tasks_include_undated() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut state = AppState::default();
        state.tasks.push(Task::with_id("a", "undated", TaskCategory::Work));
        state.tasks.push(
            Task::with_id("b", "yesterday", TaskCategory::Work)
                .with_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
        );
        let ids: Vec<_> = state.today_tasks(today).map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["a"]);
    }
}
