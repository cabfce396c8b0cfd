//! Interval timer ("chrono").
//!
//! A wall-clock state machine holding at most one interval. Remaining time
//! is always derived from the absolute `ends_at`, so the value is correct
//! however long the process was suspended. There is no internal thread;
//! the caller drives completion through `AppState::reconcile_chrono`.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Idle          (completed or cancelled)
//!         Running <-> Paused -> Idle (cancelled)
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::schedule::{IntervalType, Rituals};
use crate::events::Event;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChronoPhase {
    #[default]
    Idle,
    Running,
    Paused,
}

/// The single active-or-idle interval.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChronoState {
    pub phase: ChronoPhase,
    pub interval: IntervalType,
    pub started_at: Option<DateTime<Utc>>,
    /// Set only while running; `started_at + length_min`.
    pub ends_at: Option<DateTime<Utc>>,
    pub length_min: u32,
    /// Set only while paused.
    pub remaining_at_pause_ms: Option<u64>,
    /// Focus sessions finished since the last long break.
    pub focus_run: u32,
}

/// A running interval that reached its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalCompletion {
    pub interval: IntervalType,
    pub length_min: u32,
    pub ended_at: DateTime<Utc>,
}

impl ChronoState {
    pub fn is_idle(&self) -> bool {
        self.phase == ChronoPhase::Idle
    }

    pub fn is_running(&self) -> bool {
        self.phase == ChronoPhase::Running
    }

    /// Begin an interval of `kind`. Does nothing unless idle.
    pub fn start(&mut self, kind: IntervalType, rituals: &Rituals, now: DateTime<Utc>) -> Option<Event> {
        if !self.is_idle() {
            return None;
        }
        let length_min = rituals.length_for(kind);
        let ends_at = now + Duration::minutes(i64::from(length_min));
        self.phase = ChronoPhase::Running;
        self.interval = kind;
        self.started_at = Some(now);
        self.ends_at = Some(ends_at);
        self.length_min = length_min;
        self.remaining_at_pause_ms = None;
        if kind == IntervalType::LongBreak {
            self.focus_run = 0;
        }
        Some(Event::IntervalStarted {
            interval: kind,
            length_min,
            ends_at,
        })
    }

    /// Freeze the remaining time. An interval already past its end is left
    /// for completion instead.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let ends_at = self.ends_at.filter(|_| self.is_running())?;
        if now >= ends_at {
            return None;
        }
        let remaining_ms = (ends_at - now).num_milliseconds().max(0) as u64;
        self.phase = ChronoPhase::Paused;
        self.ends_at = None;
        self.remaining_at_pause_ms = Some(remaining_ms);
        Some(Event::IntervalPaused {
            interval: self.interval,
            remaining_ms,
            at: now,
        })
    }

    /// Re-anchor a paused interval so it ends `remaining` after `now`.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.phase != ChronoPhase::Paused {
            return None;
        }
        let remaining_ms = self.remaining_at_pause_ms.take().unwrap_or(0);
        let ends_at = now + Duration::milliseconds(remaining_ms as i64);
        self.phase = ChronoPhase::Running;
        self.ends_at = Some(ends_at);
        self.started_at = Some(ends_at - Duration::minutes(i64::from(self.length_min)));
        Some(Event::IntervalResumed {
            interval: self.interval,
            ends_at,
        })
    }

    /// Drop the current interval without credit.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.is_idle() {
            return None;
        }
        let interval = self.interval;
        self.clear();
        Some(Event::IntervalCancelled { interval, at: now })
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        match self.phase {
            ChronoPhase::Idle => Duration::zero(),
            ChronoPhase::Paused => {
                Duration::milliseconds(self.remaining_at_pause_ms.unwrap_or(0) as i64)
            }
            ChronoPhase::Running => self
                .ends_at
                .map(|end| (end - now).max(Duration::zero()))
                .unwrap_or_else(Duration::zero),
        }
    }

    /// Fraction elapsed in `[0, 1]`.
    pub fn progress(&self, now: DateTime<Utc>) -> f64 {
        if self.is_idle() || self.length_min == 0 {
            return 0.0;
        }
        let total = Duration::minutes(i64::from(self.length_min)).num_milliseconds() as f64;
        let left = self.remaining(now).num_milliseconds() as f64;
        ((total - left) / total).clamp(0.0, 1.0)
    }

    /// Move a running interval past its end back to idle, exactly once.
    pub fn complete_if_due(&mut self, now: DateTime<Utc>) -> Option<IntervalCompletion> {
        let ends_at = self.ends_at.filter(|_| self.is_running())?;
        if now < ends_at {
            return None;
        }
        let completion = IntervalCompletion {
            interval: self.interval,
            length_min: self.length_min,
            ended_at: ends_at,
        };
        if completion.interval == IntervalType::Focus {
            self.focus_run = self.focus_run.saturating_add(1);
        }
        self.clear();
        Some(completion)
    }

    fn clear(&mut self) {
        self.phase = ChronoPhase::Idle;
        self.started_at = None;
        self.ends_at = None;
        self.length_min = 0;
        self.remaining_at_pause_ms = None;
    }
}

impl AppState {
    pub fn start_interval(&mut self, kind: IntervalType, now: DateTime<Utc>) -> Option<Event> {
        self.chrono.start(kind, &self.rituals, now)
    }

    pub fn pause_interval(&mut self, now: DateTime<Utc>) -> Option<Event> {
        self.chrono.pause(now)
    }

    pub fn resume_interval(&mut self, now: DateTime<Utc>) -> Option<Event> {
        self.chrono.resume(now)
    }

    pub fn cancel_interval(&mut self, now: DateTime<Utc>) -> Option<Event> {
        self.chrono.cancel(now)
    }

    /// Complete an expired interval, credit stats, and auto-chain once.
    ///
    /// Idempotent: calling it again on an idle or unexpired timer is a no-op.
    pub fn reconcile_chrono(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        let mut events = Vec::new();
        let Some(done) = self.chrono.complete_if_due(now) else {
            return events;
        };

        if done.interval == IntervalType::Focus {
            self.stats.credit_focus_session(done.length_min);
        }
        info!(
            interval = %done.interval,
            length_min = done.length_min,
            sessions = self.stats.sessions_completed,
            "interval completed"
        );
        events.push(Event::IntervalCompleted {
            interval: done.interval,
            length_min: done.length_min,
            at: done.ended_at,
        });

        if let Some(next) = self.rituals.chain_after(done.interval, self.chrono.focus_run) {
            events.extend(self.chrono.start(next, &self.rituals, now));
        }
        events
    }
}
