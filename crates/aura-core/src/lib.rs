//! # Aura Core Library
//!
//! State engine for a personal productivity assistant: a daily task list
//! seeded from routine templates, a focus/break interval timer, progression
//! stats, and a chat archive, all persisted as one snapshot.
//!
//! ## Architecture
//!
//! - **Snapshot store**: one JSON blob in a SQLite `kv` row, merged over
//!   defaults on load
//! - **Day reconciler**: purges stale tasks and materializes routine
//!   instances when the local date changes
//! - **Task ledger / routine registry**: mutations on [`AppState`]
//! - **Interval timer**: a wall-clock state machine; the caller drives it
//!   through [`Aura::tick`]
//! - **Ingestion**: a [`TaskPlanner`] boundary with a Gemini implementation
//!
//! ## Key Components
//!
//! - [`Aura`]: controller owning the state, clock and store
//! - [`AppState`]: the persisted state tree
//! - [`Config`]: host configuration
//! - [`Event`]: what every mutation reports

pub mod app;
pub mod chat;
pub mod clock;
pub mod error;
pub mod events;
pub mod ingest;
pub mod routine;
pub mod state;
pub mod stats;
pub mod storage;
pub mod task;
pub mod timer;
pub mod undo;

pub use app::{Aura, AuraOptions, ChatOutcome, IngestOutcome, Notice};
pub use chat::{ChatMessage, ChatRole, ChatSession};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ConfigError, CoreError, IngestError, Result, StoreError};
pub use events::Event;
pub use ingest::{ChatResponder, GeminiPlanner, PlanRequest, PlanSummary, RawPlan, TaskPlanner};
pub use routine::{RoutineBlueprint, RoutinePatch};
pub use state::{AiMode, AppState, EnergyLevel};
pub use stats::{History, PeriodSeries, UserStats};
pub use storage::{Config, Database, MemorySnapshotStore, SnapshotStore, SqliteSnapshotStore};
pub use task::{PurgePolicy, ReconcileReport, SortPreference, SubTask, Task, TaskCategory, TaskPatch};
pub use timer::{ChronoPhase, ChronoState, IntervalType, Rituals};
