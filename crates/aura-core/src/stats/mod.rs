//! Progression statistics.
//!
//! [`UserStats`] carries the aggregate XP/level/streak counters that task
//! completion and focus sessions feed. [`History`] is the per-day counter
//! of net task completions used for streaks and analytics.

mod history;

pub use history::{History, PeriodSeries};

use serde::{Deserialize, Serialize};

/// XP gained (or lost) per task completion toggle.
pub const TASK_XP: u64 = 25;
/// XP gained per completed focus interval.
pub const FOCUS_SESSION_XP: u64 = 50;
/// XP needed per level step.
pub const XP_PER_LEVEL: u64 = 500;

/// Aggregate progression for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserStats {
    /// Advisory attribute scores.
    pub focus: u32,
    pub discipline: u32,
    pub consistency: u32,
    pub creativity: u32,
    /// Experience points, never negative.
    pub xp: u64,
    pub level: u32,
    /// Days with net-positive completions (minimal floor-bump only).
    pub streak: u32,
    /// Cumulative minutes of completed focus intervals.
    pub focus_minutes: u64,
    /// Cumulative completed focus intervals.
    pub sessions_completed: u64,
}

impl Default for UserStats {
    fn default() -> Self {
        Self {
            focus: 10,
            discipline: 10,
            consistency: 10,
            creativity: 10,
            xp: 0,
            level: 1,
            streak: 0,
            focus_minutes: 0,
            sessions_completed: 0,
        }
    }
}

impl UserStats {
    /// Level for a given XP total: 1 + one level per [`XP_PER_LEVEL`].
    pub fn level_for(xp: u64) -> u32 {
        u32::try_from(1 + xp / XP_PER_LEVEL).unwrap_or(u32::MAX)
    }

    pub fn gain_xp(&mut self, amount: u64) {
        self.xp = self.xp.saturating_add(amount);
        self.level = Self::level_for(self.xp);
    }

    /// Remove XP, flooring at zero.
    pub fn lose_xp(&mut self, amount: u64) {
        self.xp = self.xp.saturating_sub(amount);
        self.level = Self::level_for(self.xp);
    }

    /// Raise the streak to at least 1 when today's counter is positive.
    ///
    /// Never lowers the streak.
    pub fn bump_streak(&mut self, todays_count: u32) {
        if todays_count > 0 {
            self.streak = self.streak.max(1);
        }
    }

    /// Credit one finished focus interval of `minutes`.
    pub fn credit_focus_session(&mut self, minutes: u32) {
        self.focus_minutes = self.focus_minutes.saturating_add(u64::from(minutes));
        self.sessions_completed = self.sessions_completed.saturating_add(1);
        self.gain_xp(FOCUS_SESSION_XP);
    }
}
