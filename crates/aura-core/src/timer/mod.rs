mod engine;
mod schedule;

pub use engine::{ChronoPhase, ChronoState, IntervalCompletion};
pub use schedule::{IntervalType, Rituals};
