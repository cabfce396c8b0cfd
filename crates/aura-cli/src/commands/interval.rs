use std::io::Write;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use clap::Subcommand;
use serde::Serialize;

use aura_core::{Aura, ChronoPhase, IntervalType, Rituals};

use super::{format_remaining, open_aura, print_event, print_json, report, CmdResult};

#[derive(Subcommand)]
pub enum ChronoAction {
    /// Start an interval: focus, break or long-break
    Start {
        #[arg(default_value = "focus", value_parser = parse_interval)]
        kind: IntervalType,
    },
    /// Pause the running interval
    Pause,
    /// Resume a paused interval
    Resume,
    /// Drop the current interval without credit
    Cancel,
    /// Print the timer state
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or change interval settings
    Rituals {
        /// Focus length in minutes
        #[arg(long)]
        focus: Option<u32>,
        /// Short break length in minutes
        #[arg(long = "break")]
        short_break: Option<u32>,
        /// Long break length in minutes
        #[arg(long)]
        long_break: Option<u32>,
        /// Focus sessions between long breaks (0 disables)
        #[arg(long)]
        long_break_every: Option<u32>,
        /// Start a break automatically after focus
        #[arg(long)]
        auto_breaks: Option<bool>,
        /// Start focus automatically after a break
        #[arg(long)]
        auto_focus: Option<bool>,
    },
    /// Follow the timer until it goes idle or is paused
    Watch,
}

fn parse_interval(value: &str) -> Result<IntervalType, String> {
    IntervalType::parse(value).ok_or_else(|| format!("unknown interval: {value}"))
}

#[derive(Serialize)]
struct ChronoStatus {
    phase: ChronoPhase,
    interval: IntervalType,
    length_min: u32,
    remaining_ms: i64,
    progress: f64,
    ends_at: Option<DateTime<Utc>>,
    focus_run: u32,
}

fn status(aura: &Aura) -> ChronoStatus {
    let now = aura.now();
    let chrono = &aura.state().chrono;
    ChronoStatus {
        phase: chrono.phase,
        interval: chrono.interval,
        length_min: chrono.length_min,
        remaining_ms: chrono.remaining(now).num_milliseconds(),
        progress: chrono.progress(now),
        ends_at: chrono.ends_at,
        focus_run: chrono.focus_run,
    }
}

fn status_line(status: &ChronoStatus) -> String {
    let remaining = format_remaining(u64::try_from(status.remaining_ms).unwrap_or(0));
    match status.phase {
        ChronoPhase::Idle => "idle".to_string(),
        ChronoPhase::Running => format!(
            "{} running, {remaining} left ({:.0}%)",
            status.interval,
            status.progress * 100.0
        ),
        ChronoPhase::Paused => format!("{} paused, {remaining} left", status.interval),
    }
}

fn print_rituals(rituals: &Rituals) {
    println!("focus:            {} min", rituals.pomodoro_length);
    println!("break:            {} min", rituals.break_length);
    println!("long break:       {} min", rituals.long_break_length);
    println!("long break every: {}", rituals.long_break_every);
    println!("auto breaks:      {}", rituals.auto_start_breaks);
    println!("auto focus:       {}", rituals.auto_start_focus);
}

pub fn run(action: ChronoAction) -> CmdResult {
    let (mut aura, config) = open_aura()?;

    match action {
        ChronoAction::Start { kind } => {
            report(aura.start_interval(kind), || "an interval is already active".into())?;
        }
        ChronoAction::Pause => {
            report(aura.pause_interval(), || "no running interval".into())?;
        }
        ChronoAction::Resume => {
            report(aura.resume_interval(), || "no paused interval".into())?;
        }
        ChronoAction::Cancel => {
            report(aura.cancel_interval(), || "no active interval".into())?;
        }
        ChronoAction::Status { json } => {
            let status = status(&aura);
            if json {
                print_json(&status)?;
            } else {
                println!("{}", status_line(&status));
            }
        }
        ChronoAction::Rituals {
            focus,
            short_break,
            long_break,
            long_break_every,
            auto_breaks,
            auto_focus,
        } => {
            aura.update_rituals(|r| {
                if let Some(v) = focus {
                    r.pomodoro_length = v.max(1);
                }
                if let Some(v) = short_break {
                    r.break_length = v.max(1);
                }
                if let Some(v) = long_break {
                    r.long_break_length = v.max(1);
                }
                if let Some(v) = long_break_every {
                    r.long_break_every = v;
                }
                if let Some(v) = auto_breaks {
                    r.auto_start_breaks = v;
                }
                if let Some(v) = auto_focus {
                    r.auto_start_focus = v;
                }
            });
            print_rituals(&aura.state().rituals);
        }
        ChronoAction::Watch => watch(&mut aura, config.chrono.tick_secs)?,
    }

    Ok(())
}

/// Tick the controller on a fixed cadence, redrawing the remaining time,
/// until the timer is idle or paused.
fn watch(aura: &mut Aura, tick_secs: u64) -> CmdResult {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(follow(aura, tick_secs))?;
    Ok(())
}

async fn follow(aura: &mut Aura, tick_secs: u64) -> std::io::Result<()> {
    let mut ticker = tokio::time::interval(StdDuration::from_secs(tick_secs.max(1)));
    loop {
        ticker.tick().await;
        for event in aura.tick() {
            eprintln!();
            print_event(&event);
        }
        let current = status(aura);
        match current.phase {
            ChronoPhase::Idle => {
                eprintln!("idle");
                return Ok(());
            }
            // Only another command can resume it.
            ChronoPhase::Paused => {
                eprintln!("\r{}", status_line(&current));
                return Ok(());
            }
            ChronoPhase::Running => {}
        }
        eprint!("\r{}   ", status_line(&current));
        std::io::stderr().flush()?;
    }
}
