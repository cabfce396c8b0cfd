use clap::Subcommand;
use serde::Serialize;

use aura_core::{PeriodSeries, UserStats};

use super::{open_aura, print_json, CmdResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// XP, level, streak and focus totals
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Completions this week against last week
    Weekly {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Completions per month, this year against last year
    Monthly {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct StatsView<'a> {
    #[serde(flatten)]
    stats: &'a UserStats,
    today_completed: u32,
    current_run: u32,
}

pub fn run(action: StatsAction) -> CmdResult {
    let (aura, _config) = open_aura()?;
    let today = aura.today();
    let state = aura.state();

    match action {
        StatsAction::Show { json } => {
            let view = StatsView {
                stats: &state.stats,
                today_completed: state.history.get(today),
                current_run: state.history.current_run(today),
            };
            if json {
                print_json(&view)?;
            } else {
                let s = view.stats;
                println!("Level {}  ({} xp)", s.level, s.xp);
                println!("Streak:          {} day(s)", s.streak);
                println!("Current run:     {} day(s)", view.current_run);
                println!("Done today:      {}", view.today_completed);
                println!("Focus sessions:  {}", s.sessions_completed);
                println!("Focus minutes:   {}", s.focus_minutes);
            }
        }
        StatsAction::Weekly { json } => print_series(&state.history.weekly(today), json)?,
        StatsAction::Monthly { json } => print_series(&state.history.monthly(today), json)?,
    }

    Ok(())
}

fn print_series(series: &PeriodSeries, json: bool) -> CmdResult {
    if json {
        return print_json(series);
    }
    println!("{:<5} {:>7} {:>8}", "", "current", "previous");
    for ((label, current), previous) in series
        .labels
        .iter()
        .zip(&series.current)
        .zip(&series.previous)
    {
        println!("{label:<5} {current:>7} {previous:>8}");
    }
    Ok(())
}
