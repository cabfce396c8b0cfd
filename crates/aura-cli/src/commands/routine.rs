use clap::Subcommand;

use aura_core::{RoutineBlueprint, RoutinePatch, TaskCategory};

use super::{open_aura, parse_category, parse_clock_time, print_json, report, CmdResult};

#[derive(Subcommand)]
pub enum RoutineAction {
    /// Register a daily routine; today's instance is created right away
    Add {
        /// Routine title
        title: String,
        /// Start time (HH:MM)
        #[arg(long, value_parser = parse_clock_time)]
        start: String,
        /// Minutes
        #[arg(long, default_value = "15")]
        duration: u32,
        #[arg(long, default_value = "health", value_parser = parse_category)]
        category: TaskCategory,
        #[arg(long, default_value = "2", value_parser = clap::value_parser!(u8).range(1..=5))]
        difficulty: u8,
        /// Register without scheduling it
        #[arg(long)]
        inactive: bool,
    },
    /// List routine templates
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Activate or deactivate a routine
    Toggle {
        /// Routine ID
        id: String,
    },
    /// Edit a routine; today's instance follows
    Update {
        /// Routine ID
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, value_parser = parse_clock_time)]
        start: Option<String>,
        #[arg(long)]
        duration: Option<u32>,
        #[arg(long, value_parser = parse_category)]
        category: Option<TaskCategory>,
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        difficulty: Option<u8>,
    },
    /// Remove a routine and today's instance
    Delete {
        /// Routine ID
        id: String,
    },
}

pub fn run(action: RoutineAction) -> CmdResult {
    let (mut aura, _config) = open_aura()?;

    match action {
        RoutineAction::Add {
            title,
            start,
            duration,
            category,
            difficulty,
            inactive,
        } => {
            let routine = RoutineBlueprint::new(title, start, duration, category)
                .with_difficulty(difficulty)
                .with_active(!inactive);
            let id = routine.id.clone();
            report(aura.add_routine(routine), || format!("routine already exists: {id}"))?;
            println!("{id}");
        }
        RoutineAction::List { json } => {
            let routines = &aura.state().routines;
            if json {
                print_json(routines)?;
            } else if routines.is_empty() {
                println!("No routines.");
            } else {
                for r in routines {
                    let state = if r.active { "on " } else { "off" };
                    println!(
                        "[{state}] {} {} ({} min, {}, d{})  {}",
                        r.start_time, r.title, r.duration, r.category, r.difficulty, r.id
                    );
                }
            }
        }
        RoutineAction::Toggle { id } => {
            report(aura.toggle_routine_active(&id), || format!("routine not found: {id}"))?;
        }
        RoutineAction::Update {
            id,
            title,
            start,
            duration,
            category,
            difficulty,
        } => {
            let patch = RoutinePatch {
                title,
                start_time: start,
                duration,
                category,
                difficulty,
            };
            report(aura.update_routine(&id, &patch), || format!("routine not found: {id}"))?;
        }
        RoutineAction::Delete { id } => {
            report(aura.delete_routine(&id), || format!("routine not found: {id}"))?;
        }
    }

    Ok(())
}
