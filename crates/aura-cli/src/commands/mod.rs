pub mod chat;
pub mod config;
pub mod interval;
pub mod plan;
pub mod routine;
pub mod stats;
pub mod task;

use std::sync::Arc;

use aura_core::storage::data_dir;
use aura_core::{Aura, AuraOptions, Config, Database, Event, SqliteSnapshotStore, SystemClock};
use clap::CommandFactory;
use serde::de::DeserializeOwned;
use tracing::debug;
use tracing_subscriber::EnvFilter;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Logs go to stderr so JSON output on stdout stays clean. `RUST_LOG`
/// overrides `log.filter` from the config file.
pub fn init_tracing() {
    let fallback = Config::load_or_default().log.filter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub fn completions(shell: clap_complete::Shell) {
    let mut cmd = crate::Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}

/// Open the controller over the configured SQLite snapshot and catch up
/// with wall-clock time.
pub fn open_aura() -> Result<(Aura, Config), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let path = data_dir()?.join(&config.storage.database_file);
    debug!(path = %path.display(), slot = %config.storage.slot, "opening snapshot");
    let db = Database::open(&path)?;
    let store = SqliteSnapshotStore::new(db, config.storage.slot.clone());
    let mut aura = Aura::open(
        Box::new(store),
        Arc::new(SystemClock),
        AuraOptions::from_config(&config),
    );
    for event in aura.tick() {
        print_event(&event);
    }
    Ok((aura, config))
}

/// Parse a lowercase enum name the same way the snapshot stores it.
pub fn parse_named<T: DeserializeOwned>(kind: &str, value: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_lowercase()))
        .map_err(|_| format!("unknown {kind}: {value}"))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One-line human rendering of an event, on stderr.
pub fn print_event(event: &Event) {
    let line = match event {
        Event::TasksAdded { ids } => format!("Added {} task(s): {}", ids.len(), ids.join(", ")),
        Event::TaskToggled { id, completed, xp, .. } => {
            let state = if *completed { "done" } else { "open" };
            format!("Task {id} is {state} (xp {xp})")
        }
        Event::SubtaskToggled { task_id, subtask_id, completed } => {
            format!("Subtask {subtask_id} of {task_id}: completed={completed}")
        }
        Event::TaskUpdated { id } => format!("Task updated: {id}"),
        Event::TaskDeleted { id, .. } => format!("Task deleted: {id}"),
        Event::TaskRestored { id } => format!("Task restored: {id}"),
        Event::UndoExpired { id } => format!("Undo expired for {id}"),
        Event::RoutineAdded { id, .. } => format!("Routine added: {id}"),
        Event::RoutineDeleted { id } => format!("Routine deleted: {id}"),
        Event::RoutineToggled { id, active } => format!("Routine {id}: active={active}"),
        Event::RoutineUpdated { id } => format!("Routine updated: {id}"),
        Event::DayReconciled { date, purged, materialized } => {
            format!("{date}: {purged} task(s) purged, {materialized} routine instance(s) created")
        }
        Event::IntervalStarted { interval, length_min, .. } => {
            format!("{interval} started ({length_min} min)")
        }
        Event::IntervalPaused { interval, remaining_ms, .. } => {
            format!("{interval} paused, {} left", format_remaining(*remaining_ms))
        }
        Event::IntervalResumed { interval, .. } => format!("{interval} resumed"),
        Event::IntervalCancelled { interval, .. } => format!("{interval} cancelled"),
        Event::IntervalCompleted { interval, length_min, .. } => {
            format!("{interval} complete ({length_min} min)")
        }
        Event::ChatArchived { id, messages } => format!("Archived {messages} message(s) as {id}"),
        Event::ChatRestored { id } => format!("Chat restored: {id}"),
        Event::ChatDeleted { id } => format!("Chat deleted: {id}"),
        Event::PlanApplied { created, updated, .. } => {
            format!("Plan applied: {created} created, {updated} updated")
        }
    };
    eprintln!("{line}");
}

/// Normalize an `HH:MM` clock time.
pub fn parse_clock_time(value: &str) -> Result<String, String> {
    chrono::NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| format!("expected HH:MM, got '{value}'"))
}

pub fn parse_category(value: &str) -> Result<aura_core::TaskCategory, String> {
    aura_core::TaskCategory::parse(value).ok_or_else(|| format!("unknown category: {value}"))
}

/// `mm:ss` rendering of a millisecond count.
pub fn format_remaining(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Print the event, or fail with `missing` when the mutation was a no-op.
pub fn report(event: Option<Event>, missing: impl FnOnce() -> String) -> CmdResult {
    match event {
        Some(event) => {
            print_event(&event);
            Ok(())
        }
        None => Err(missing().into()),
    }
}
