//! The Aura controller.
//!
//! [`Aura`] owns the state tree, the clock, the snapshot store, the undo
//! buffer and the transient notice. Every mutation goes through it and is
//! followed by a snapshot write; write failures are logged and swallowed
//! so a mutation never fails because of persistence.
//!
//! ## Usage
//! ```rust,ignore
//! let mut aura = Aura::open(Box::new(store), Arc::new(SystemClock), AuraOptions::default());
//! aura.add_task(Task::new("Write report", TaskCategory::Work));
//! // In a loop:
//! for event in aura.tick() { /* render */ }
//! ```

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::chat::ChatRole;
use crate::clock::Clock;
use crate::error::IngestError;
use crate::events::Event;
use crate::ingest::{ChatResponder, PlanRequest, PlanSummary, TaskPlanner};
use crate::routine::{RoutineBlueprint, RoutinePatch};
use crate::state::{AiMode, AppState, EnergyLevel};
use crate::storage::snapshot::{self, SnapshotStore};
use crate::storage::Config;
use crate::task::{PurgePolicy, ReconcileReport, SortPreference, Task, TaskPatch};
use crate::timer::{IntervalType, Rituals};

/// Controller tunables, normally taken from [`Config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuraOptions {
    pub policy: PurgePolicy,
    pub undo_window: Duration,
    pub notice_ttl: Duration,
}

impl Default for AuraOptions {
    fn default() -> Self {
        Self {
            policy: PurgePolicy::default(),
            undo_window: Duration::seconds(5),
            notice_ttl: Duration::seconds(4),
        }
    }
}

impl AuraOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            policy: config.reconcile.policy,
            undo_window: config.undo_window(),
            notice_ttl: config.notice_ttl(),
        }
    }
}

/// Short-lived message for the user, e.g. a failed ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

/// What happened to a piece of free text sent for ingestion.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// Blank input; nothing was sent.
    Skipped,
    Applied(PlanSummary),
    /// Nothing was applied. The input is handed back for the text box.
    Failed {
        error: IngestError,
        restored_input: String,
    },
}

/// What happened to a chat message sent to the mentor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    /// Blank input; nothing was sent.
    Skipped,
    Replied(String),
    /// The transcript is unchanged. The input is handed back.
    Failed {
        error: IngestError,
        restored_input: String,
    },
}

pub struct Aura {
    state: AppState,
    store: Box<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
    options: AuraOptions,
    notice: Option<Notice>,
}

impl Aura {
    /// Load the snapshot, reconcile the day and write the result back.
    ///
    /// When the stored blob could not be loaded in full, it is copied to the
    /// store's backup slot and left in place; the first real mutation
    /// replaces it.
    pub fn open(store: Box<dyn SnapshotStore>, clock: Arc<dyn Clock>, options: AuraOptions) -> Self {
        let loaded = snapshot::load_with_status(store.as_ref());
        if let Some(raw) = loaded.raw.as_deref().filter(|_| loaded.status.is_lossy()) {
            match store.backup(raw) {
                Ok(()) => warn!(status = ?loaded.status, "snapshot partly unreadable, original backed up"),
                Err(e) => warn!(error = %e, "snapshot backup failed"),
            }
        }
        let mut aura = Self {
            state: loaded.state,
            store,
            clock,
            options,
            notice: None,
        };
        let report = aura.reconcile_day();
        info!(
            date = %report.date,
            tasks = aura.state.tasks.len(),
            routines = aura.state.routines.len(),
            status = ?loaded.status,
            "state loaded"
        );
        if !loaded.status.is_lossy() {
            aura.commit();
        }
        aura
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn options(&self) -> &AuraOptions {
        &self.options
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Current notice, if it has not expired.
    pub fn notice(&self) -> Option<&Notice> {
        let now = self.now();
        self.notice.as_ref().filter(|n| now < n.expires_at)
    }

    pub fn today_tasks(&self) -> Vec<&Task> {
        self.state.sorted_today(self.today())
    }

    fn commit(&self) {
        if let Err(e) = snapshot::save(self.store.as_ref(), &self.state) {
            warn!(error = %e, "snapshot write failed");
        }
    }

    fn committed(&self, event: Option<Event>) -> Option<Event> {
        if event.is_some() {
            self.commit();
        }
        event
    }

    fn reconcile_day(&mut self) -> ReconcileReport {
        let today = self.today();
        self.state.reconcile_day(today, self.options.policy)
    }

    fn post_notice(&mut self, message: impl Into<String>) {
        self.notice = Some(Notice {
            message: message.into(),
            expires_at: self.now() + self.options.notice_ttl,
        });
    }

    // ── Periodic ──

    /// Roll the day over if needed, complete an expired interval, and
    /// expire the undo slot and notice. Safe to call as often as wanted.
    pub fn tick(&mut self) -> Vec<Event> {
        let now = self.now();
        let mut events = Vec::new();

        if self.state.last_reconciled != Some(self.today()) {
            let report = self.reconcile_day();
            events.push(Event::DayReconciled {
                date: report.date,
                purged: report.purged.len(),
                materialized: report.materialized.len(),
            });
        }
        events.extend(self.state.reconcile_chrono(now));
        let undo_expired = self.state.expire_undo(now);

        if self.notice.as_ref().is_some_and(|n| now >= n.expires_at) {
            self.notice = None;
        }

        if !events.is_empty() {
            self.commit();
        }
        events.extend(undo_expired);
        events
    }

    /// Same as [`Aura::tick`]; call when the host regains focus.
    pub fn on_foreground(&mut self) -> Vec<Event> {
        self.tick()
    }

    // ── Task ledger ──

    pub fn add_task(&mut self, task: Task) -> Option<Event> {
        self.add_tasks(vec![task])
    }

    pub fn add_tasks(&mut self, tasks: Vec<Task>) -> Option<Event> {
        let event = self.state.add_tasks(tasks);
        self.committed(event)
    }

    pub fn toggle_task(&mut self, id: &str) -> Option<Event> {
        let today = self.today();
        let event = self.state.toggle_task(id, today);
        self.committed(event)
    }

    pub fn toggle_subtask(&mut self, task_id: &str, subtask_id: &str) -> Option<Event> {
        let event = self.state.toggle_subtask(task_id, subtask_id);
        self.committed(event)
    }

    pub fn update_task(&mut self, id: &str, patch: &TaskPatch) -> Option<Event> {
        let event = self.state.update_task(id, patch);
        self.committed(event)
    }

    pub fn delete_task(&mut self, id: &str) -> Option<Event> {
        let now = self.now();
        let event = self.state.delete_task(id, now, self.options.undo_window);
        self.committed(event)
    }

    pub fn undo_delete(&mut self) -> Option<Event> {
        let now = self.now();
        let event = self.state.undo_delete(now);
        self.committed(event)
    }

    // ── Routines ──

    pub fn add_routine(&mut self, routine: RoutineBlueprint) -> Option<Event> {
        let today = self.today();
        let event = self.state.add_routine(routine, today);
        self.committed(event)
    }

    pub fn delete_routine(&mut self, id: &str) -> Option<Event> {
        let today = self.today();
        let event = self.state.delete_routine(id, today);
        self.committed(event)
    }

    pub fn toggle_routine_active(&mut self, id: &str) -> Option<Event> {
        let today = self.today();
        let event = self.state.toggle_routine_active(id, today);
        self.committed(event)
    }

    pub fn update_routine(&mut self, id: &str, patch: &RoutinePatch) -> Option<Event> {
        let today = self.today();
        let event = self.state.update_routine(id, patch, today);
        self.committed(event)
    }

    // ── Interval timer ──

    pub fn start_interval(&mut self, kind: IntervalType) -> Option<Event> {
        let now = self.now();
        let event = self.state.start_interval(kind, now);
        self.committed(event)
    }

    pub fn pause_interval(&mut self) -> Option<Event> {
        let now = self.now();
        let event = self.state.pause_interval(now);
        self.committed(event)
    }

    pub fn resume_interval(&mut self) -> Option<Event> {
        let now = self.now();
        let event = self.state.resume_interval(now);
        self.committed(event)
    }

    pub fn cancel_interval(&mut self) -> Option<Event> {
        let now = self.now();
        let event = self.state.cancel_interval(now);
        self.committed(event)
    }

    // ── Chat ──

    pub fn push_chat_message(&mut self, role: ChatRole, text: impl Into<String>) {
        let now = self.now();
        self.state.push_chat_message(role, text, now);
        self.commit();
    }

    /// Ask `responder` about `text`. The user message and the reply are
    /// appended together, or not at all.
    pub fn send_chat(&mut self, text: &str, responder: &dyn ChatResponder) -> ChatOutcome {
        if text.trim().is_empty() {
            return ChatOutcome::Skipped;
        }
        match responder.reply(text) {
            Ok(reply) => {
                let now = self.now();
                self.state.push_chat_message(ChatRole::User, text, now);
                self.state.push_chat_message(ChatRole::Model, reply.clone(), now);
                self.commit();
                ChatOutcome::Replied(reply)
            }
            Err(error) => {
                warn!(error = %error, "chat reply failed");
                self.post_notice(error.user_message());
                ChatOutcome::Failed {
                    error,
                    restored_input: text.to_string(),
                }
            }
        }
    }

    pub fn clear_chat(&mut self) {
        self.state.clear_chat();
        self.commit();
    }

    pub fn archive_current_chat(&mut self) -> Option<Event> {
        let now = self.now();
        let event = self.state.archive_current_chat(now);
        self.committed(event)
    }

    pub fn restore_session(&mut self, id: &str) -> Option<Event> {
        let event = self.state.restore_session(id);
        self.committed(event)
    }

    pub fn delete_session(&mut self, id: &str) -> Option<Event> {
        let event = self.state.delete_session(id);
        self.committed(event)
    }

    // ── Settings ──

    pub fn set_sort_preference(&mut self, preference: SortPreference) {
        self.state.sort_preference = preference;
        self.commit();
    }

    pub fn set_ai_mode(&mut self, mode: AiMode) {
        self.state.ai_mode = mode;
        self.commit();
    }

    pub fn set_energy_level(&mut self, energy: EnergyLevel) {
        self.state.energy_level = energy;
        self.commit();
    }

    /// Store the planner key; an empty string clears it.
    pub fn set_api_key(&mut self, key: &str) {
        let key = key.trim();
        self.state.api_key = (!key.is_empty()).then(|| key.to_string());
        self.commit();
    }

    pub fn update_rituals(&mut self, update: impl FnOnce(&mut Rituals)) {
        update(&mut self.state.rituals);
        self.commit();
    }

    /// The stored key, falling back to the `env_var` environment variable.
    pub fn planner_api_key(&self, env_var: &str) -> Option<String> {
        self.state
            .api_key
            .clone()
            .or_else(|| std::env::var(env_var).ok())
            .filter(|k| !k.trim().is_empty())
    }

    // ── Ingestion ──

    /// Send `input` to `planner` and apply the result, all or nothing.
    pub fn ingest(&mut self, input: &str, planner: &dyn TaskPlanner) -> IngestOutcome {
        if input.trim().is_empty() {
            return IngestOutcome::Skipped;
        }
        let request = PlanRequest {
            input: input.to_string(),
            mode: self.state.ai_mode,
            energy: self.state.energy_level,
            existing: self.state.tasks.clone(),
            now: self.now(),
        };

        match planner.plan(&request).and_then(|raw| raw.validate()) {
            Ok(plan) => {
                let (summary, _event) = self.state.apply_plan(plan);
                self.commit();
                IngestOutcome::Applied(summary)
            }
            Err(error) => {
                warn!(error = %error, "ingestion failed");
                self.post_notice(error.user_message());
                IngestOutcome::Failed {
                    error,
                    restored_input: input.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::ingest::RawPlan;
    use crate::storage::MemorySnapshotStore;
    use crate::task::TaskCategory;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn open(store: &MemorySnapshotStore, clock: &Arc<FixedClock>) -> Aura {
        Aura::open(Box::new(store.clone()), clock.clone(), AuraOptions::default())
    }

    struct Fails(IngestError);

    impl TaskPlanner for Fails {
        fn plan(&self, _request: &PlanRequest) -> Result<RawPlan, IngestError> {
            Err(self.0.clone())
        }
    }

    struct Returns(&'static str);

    impl TaskPlanner for Returns {
        fn plan(&self, _request: &PlanRequest) -> Result<RawPlan, IngestError> {
            serde_json::from_str(self.0).map_err(|e| IngestError::MalformedPayload(e.to_string()))
        }
    }

    struct Mentor(Result<&'static str, IngestError>);

    impl ChatResponder for Mentor {
        fn reply(&self, _message: &str) -> Result<String, IngestError> {
            self.0.clone().map(str::to_string)
        }
    }

    #[test]
    fn open_persists_reconciled_state() {
        let store = MemorySnapshotStore::new();
        let clock = Arc::new(FixedClock::at(date(2024, 1, 1), 9, 0));
        let aura = open(&store, &clock);
        assert_eq!(aura.state().last_reconciled, Some(date(2024, 1, 1)));
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn open_keeps_partly_unreadable_blob() {
        let blob = r#"{"stats": {"xp": 900}, "tasks": [
            {"id": "a", "title": "Report", "duration": 45, "category": "work", "difficulty": 3},
            {"id": "b", "title": "Shop", "duration": 20, "category": "errands", "difficulty": 1}
        ]}"#;
        let store = MemorySnapshotStore::with_blob(blob);
        let clock = Arc::new(FixedClock::at(date(2024, 1, 1), 9, 0));
        let mut aura = open(&store, &clock);

        assert_eq!(aura.state().stats.xp, 900);
        assert_eq!(aura.state().tasks.len(), 1);
        assert_eq!(store.writes(), 0);
        assert_eq!(store.blob().as_deref(), Some(blob));
        assert_eq!(store.backup_blob().as_deref(), Some(blob));

        aura.add_task(Task::with_id("c", "Call", TaskCategory::Personal));
        assert_eq!(store.writes(), 1);
        assert_eq!(store.backup_blob().as_deref(), Some(blob));
    }

    #[test]
    fn open_does_not_overwrite_corrupt_blob() {
        let store = MemorySnapshotStore::with_blob("{not json");
        let clock = Arc::new(FixedClock::at(date(2024, 1, 1), 9, 0));
        let aura = open(&store, &clock);

        assert_eq!(aura.state().stats.xp, 0);
        assert_eq!(store.writes(), 0);
        assert_eq!(store.blob().as_deref(), Some("{not json"));
        assert_eq!(store.backup_blob().as_deref(), Some("{not json"));
    }

    #[test]
    fn persistence_failure_is_swallowed() {
        let store = MemorySnapshotStore::new();
        store.fail_writes(true);
        let clock = Arc::new(FixedClock::at(date(2024, 1, 1), 9, 0));
        let mut aura = open(&store, &clock);

        assert!(aura.add_task(Task::with_id("t1", "Plan", TaskCategory::Work)).is_some());
        assert!(aura.state().task("t1").is_some());
        assert!(store.blob().is_none());
    }

    #[test]
    fn tick_rolls_day_over_while_running() {
        let store = MemorySnapshotStore::new();
        let clock = Arc::new(FixedClock::at(date(2024, 1, 1), 23, 59));
        let mut aura = open(&store, &clock);
        aura.add_routine(RoutineBlueprint::new("Stretch", "07:00", 10, TaskCategory::Health).with_id("s"));
        assert!(aura.tick().is_empty());

        clock.advance(Duration::minutes(2));
        let events = aura.tick();
        assert!(matches!(events[0], Event::DayReconciled { materialized: 1, .. }));
        assert!(aura.state().task("routine-s-2024-01-02").is_some());
        assert!(aura.tick().is_empty());
    }

    #[test]
    fn undo_window_follows_clock() {
        let store = MemorySnapshotStore::new();
        let clock = Arc::new(FixedClock::at(date(2024, 1, 1), 9, 0));
        let mut aura = open(&store, &clock);
        aura.add_task(Task::with_id("t1", "Plan", TaskCategory::Work));
        aura.delete_task("t1").unwrap();

        clock.advance(Duration::seconds(6));
        let events = aura.tick();
        assert_eq!(events, vec![Event::UndoExpired { id: "t1".into() }]);
        assert!(aura.undo_delete().is_none());
        assert!(aura.state().task("t1").is_none());
    }

    #[test]
    fn failed_ingest_leaves_state_and_posts_notice() {
        let store = MemorySnapshotStore::new();
        let clock = Arc::new(FixedClock::at(date(2024, 1, 1), 9, 0));
        let mut aura = open(&store, &clock);
        aura.add_task(Task::with_id("t1", "Plan", TaskCategory::Work));
        let before = aura.state().clone();

        let outcome = aura.ingest("plan my week", &Fails(IngestError::MissingKey));
        assert_eq!(
            outcome,
            IngestOutcome::Failed {
                error: IngestError::MissingKey,
                restored_input: "plan my week".into()
            }
        );
        assert_eq!(aura.state(), &before);
        assert_eq!(
            aura.notice().unwrap().message,
            "Neural key missing. Check Settings."
        );

        clock.advance(Duration::seconds(4));
        assert!(aura.notice().is_none());
    }

    #[test]
    fn malformed_plan_applies_nothing() {
        let store = MemorySnapshotStore::new();
        let clock = Arc::new(FixedClock::at(date(2024, 1, 1), 9, 0));
        let mut aura = open(&store, &clock);
        let planner = Returns(
            r#"{"tasks":[{"title":"ok","duration":30,"category":"work","difficulty":2,"isBoss":false},
                         {"title":"bad","duration":30,"category":"chores","difficulty":2,"isBoss":false}]}"#,
        );
        let outcome = aura.ingest("two things", &planner);
        assert!(matches!(outcome, IngestOutcome::Failed { error: IngestError::MalformedPayload(_), .. }));
        assert!(aura.state().tasks.is_empty());
        assert_eq!(aura.notice().unwrap().message, "Could not understand the plan.");
    }

    #[test]
    fn blank_input_is_skipped() {
        let store = MemorySnapshotStore::new();
        let clock = Arc::new(FixedClock::at(date(2024, 1, 1), 9, 0));
        let mut aura = open(&store, &clock);
        assert_eq!(aura.ingest("   ", &Fails(IngestError::RateLimited)), IngestOutcome::Skipped);
        assert!(aura.notice().is_none());
    }

    #[test]
    fn chat_reply_appends_both_messages() {
        let store = MemorySnapshotStore::new();
        let clock = Arc::new(FixedClock::at(date(2024, 1, 1), 9, 0));
        let mut aura = open(&store, &clock);

        let outcome = aura.send_chat("where do I start?", &Mentor(Ok("With the hardest task.")));
        assert_eq!(outcome, ChatOutcome::Replied("With the hardest task.".into()));
        let chats = &aura.state().chats;
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].role, ChatRole::User);
        assert_eq!(chats[0].text, "where do I start?");
        assert_eq!(chats[1].role, ChatRole::Model);
        assert_eq!(store.writes(), 2);
    }

    #[test]
    fn failed_chat_leaves_transcript() {
        let store = MemorySnapshotStore::new();
        let clock = Arc::new(FixedClock::at(date(2024, 1, 1), 9, 0));
        let mut aura = open(&store, &clock);

        let outcome = aura.send_chat("hello", &Mentor(Err(IngestError::AuthInvalid)));
        assert_eq!(
            outcome,
            ChatOutcome::Failed {
                error: IngestError::AuthInvalid,
                restored_input: "hello".into()
            }
        );
        assert!(aura.state().chats.is_empty());
        assert_eq!(aura.notice().unwrap().message, "Neural key rejected. Check Settings.");
        assert_eq!(aura.send_chat("  ", &Mentor(Ok("unused"))), ChatOutcome::Skipped);
    }

    #[test]
    fn planner_key_prefers_state() {
        let store = MemorySnapshotStore::new();
        let clock = Arc::new(FixedClock::at(date(2024, 1, 1), 9, 0));
        let mut aura = open(&store, &clock);
        aura.set_api_key("stored");
        assert_eq!(
            aura.planner_api_key("AURA_TEST_UNSET_KEY_VAR").as_deref(),
            Some("stored")
        );
        aura.set_api_key("");
        assert!(aura.planner_api_key("AURA_TEST_UNSET_KEY_VAR").is_none());
    }
}
