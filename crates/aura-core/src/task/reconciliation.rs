//! Day reconciliation.
//!
//! Run whenever the state is loaded and whenever the local date rolls over
//! while the process is alive. It brings the task list in line with
//! `today`:
//!
//! 1. Past-dated incomplete tasks are always dropped.
//! 2. On the first run of a new day, stale non-routine tasks from earlier
//!    days are purged according to the [`PurgePolicy`], and every active
//!    routine gets its instance for today.
//!
//! Reconciling twice on the same day is a no-op, and a completed task is
//! never dropped under the default policy.
//!
//! ## Usage
//! ```rust,ignore
//! let report = state.reconcile_day(today, PurgePolicy::default());
//! if report.rolled_over {
//!     println!("{}", report.message());
//! }
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use super::Task;
use crate::state::AppState;

/// Which past-dated non-routine tasks the roll-over purge removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PurgePolicy {
    /// Only incomplete ones. Completed tasks stay for history.
    #[default]
    IncompleteOnly,
    /// All of them, completed or not.
    AllNonRoutine,
}

impl PurgePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurgePolicy::IncompleteOnly => "incomplete-only",
            PurgePolicy::AllNonRoutine => "all-non-routine",
        }
    }

    fn purges(&self, task: &Task, today: NaiveDate) -> bool {
        if task.is_routine_instance() || !task.is_past(today) {
            return false;
        }
        match self {
            PurgePolicy::IncompleteOnly => !task.completed,
            PurgePolicy::AllNonRoutine => true,
        }
    }
}

impl fmt::Display for PurgePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurgePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "incomplete-only" => Ok(PurgePolicy::IncompleteOnly),
            "all-non-routine" => Ok(PurgePolicy::AllNonRoutine),
            other => Err(format!("unknown purge policy: {other}")),
        }
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub date: NaiveDate,
    /// Whether this pass performed the once-per-day roll-over.
    pub rolled_over: bool,
    /// Ids of removed tasks.
    pub purged: Vec<String>,
    /// Ids of routine instances created for `date`.
    pub materialized: Vec<String>,
}

impl ReconcileReport {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            rolled_over: false,
            purged: Vec::new(),
            materialized: Vec::new(),
        }
    }

    pub fn changed(&self) -> bool {
        self.rolled_over || !self.purged.is_empty() || !self.materialized.is_empty()
    }

    /// One-line human summary.
    pub fn message(&self) -> String {
        if !self.changed() {
            return format!("{} already reconciled", self.date);
        }
        format!(
            "{}: {} task(s) purged, {} routine instance(s) created",
            self.date,
            self.purged.len(),
            self.materialized.len()
        )
    }
}

impl AppState {
    /// Bring the task list up to date for `today`.
    pub fn reconcile_day(&mut self, today: NaiveDate, policy: PurgePolicy) -> ReconcileReport {
        let mut report = ReconcileReport::new(today);

        if self.last_reconciled != Some(today) {
            report.rolled_over = true;
            report.purged.extend(self.drain_tasks(|t| policy.purges(t, today)));

            let active: Vec<_> = self.routines.iter().filter(|r| r.active).cloned().collect();
            for routine in &active {
                if let Some(id) = self.materialize_instance(routine, today) {
                    report.materialized.push(id);
                }
            }
        }

        // Runs on every pass, routine instances included.
        report
            .purged
            .extend(self.drain_tasks(|t| t.is_past(today) && !t.completed));

        self.last_reconciled = Some(today);

        if report.changed() {
            info!(
                date = %today,
                policy = %policy,
                purged = report.purged.len(),
                materialized = report.materialized.len(),
                "day reconciled"
            );
        }
        report
    }

    fn drain_tasks(&mut self, mut pred: impl FnMut(&Task) -> bool) -> Vec<String> {
        let mut removed = Vec::new();
        self.tasks.retain(|t| {
            if pred(t) {
                removed.push(t.id.clone());
                false
            } else {
                true
            }
        });
        removed
    }
}
