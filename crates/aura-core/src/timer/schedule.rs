use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntervalType {
    #[default]
    Focus,
    Break,
    LongBreak,
}

impl IntervalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalType::Focus => "focus",
            IntervalType::Break => "break",
            IntervalType::LongBreak => "long-break",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "focus" => Some(IntervalType::Focus),
            "break" => Some(IntervalType::Break),
            "long-break" | "long" => Some(IntervalType::LongBreak),
            _ => None,
        }
    }

    pub fn is_break(&self) -> bool {
        !matches!(self, IntervalType::Focus)
    }
}

impl std::fmt::Display for IntervalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-editable interval settings.
///
/// Lengths are minutes. Sound and haptic fields are stored for front ends
/// and never read by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rituals {
    pub pomodoro_length: u32,
    pub break_length: u32,
    pub long_break_length: u32,
    pub haptic_intensity: u8,
    pub sound_enabled: bool,
    pub sound_volume: f32,
    pub auto_start_breaks: bool,
    pub auto_start_focus: bool,
    /// Focus sessions between long breaks; 0 disables long breaks in the chain.
    pub long_break_every: u32,
}

impl Default for Rituals {
    fn default() -> Self {
        Self {
            pomodoro_length: 25,
            break_length: 5,
            long_break_length: 15,
            haptic_intensity: 50,
            sound_enabled: true,
            sound_volume: 0.5,
            auto_start_breaks: false,
            auto_start_focus: false,
            long_break_every: 4,
        }
    }
}

impl Rituals {
    /// Configured length for `kind`, never below one minute.
    pub fn length_for(&self, kind: IntervalType) -> u32 {
        let minutes = match kind {
            IntervalType::Focus => self.pomodoro_length,
            IntervalType::Break => self.break_length,
            IntervalType::LongBreak => self.long_break_length,
        };
        minutes.max(1)
    }

    /// Break that follows a focus session, given how many focus sessions
    /// have finished since the last long break.
    pub fn break_after(&self, focus_run: u32) -> IntervalType {
        if self.long_break_every > 0 && focus_run >= self.long_break_every {
            IntervalType::LongBreak
        } else {
            IntervalType::Break
        }
    }

    /// Interval to chain after `finished`, if auto-start allows it.
    pub fn chain_after(&self, finished: IntervalType, focus_run: u32) -> Option<IntervalType> {
        match finished {
            IntervalType::Focus if self.auto_start_breaks => Some(self.break_after(focus_run)),
            IntervalType::Break | IntervalType::LongBreak if self.auto_start_focus => {
                Some(IntervalType::Focus)
            }
            _ => None,
        }
    }
}
