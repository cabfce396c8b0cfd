use chrono::NaiveDate;
use clap::Subcommand;

use aura_core::{SortPreference, SubTask, Task, TaskPatch};

use super::{open_aura, parse_category, parse_clock_time, parse_named, print_json, report, CmdResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task to the ledger
    Add {
        /// Task title
        title: String,
        /// work, personal, health or growth
        #[arg(long, default_value = "personal", value_parser = parse_category)]
        category: aura_core::TaskCategory,
        /// Planned minutes
        #[arg(long, default_value = "30")]
        duration: u32,
        /// Start time (HH:MM)
        #[arg(long, value_parser = parse_clock_time)]
        start: Option<String>,
        /// Day the task belongs to (YYYY-MM-DD); defaults to undated
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Difficulty 1-5
        #[arg(long, default_value = "3", value_parser = clap::value_parser!(u8).range(1..=5))]
        difficulty: u8,
        /// Mark as a boss task
        #[arg(long)]
        boss: bool,
        /// Subtask title (repeatable)
        #[arg(long = "subtask")]
        subtasks: Vec<String>,
    },
    /// List today's tasks in the preferred order
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Include tasks dated for other days
        #[arg(long)]
        all: bool,
    },
    /// Flip a task between open and done
    Toggle {
        /// Task ID
        id: String,
    },
    /// Flip a subtask between open and done
    Subtask {
        /// Task ID
        task_id: String,
        /// Subtask ID
        subtask_id: String,
    },
    /// Edit task fields
    Update {
        /// Task ID
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, value_parser = parse_category)]
        category: Option<aura_core::TaskCategory>,
        #[arg(long)]
        duration: Option<u32>,
        #[arg(long, value_parser = parse_clock_time)]
        start: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        difficulty: Option<u8>,
        #[arg(long)]
        boss: Option<bool>,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
    /// Set the list ordering: time, difficulty or category
    Sort {
        preference: String,
    },
}

pub fn run(action: TaskAction) -> CmdResult {
    let (mut aura, _config) = open_aura()?;

    match action {
        TaskAction::Add {
            title,
            category,
            duration,
            start,
            date,
            difficulty,
            boss,
            subtasks,
        } => {
            let mut task = Task::new(title, category)
                .with_duration(duration)
                .with_difficulty(difficulty)
                .with_boss(boss)
                .with_subtasks(subtasks.into_iter().map(SubTask::new).collect());
            if let Some(start) = start {
                task = task.with_start_time(start);
            }
            if let Some(date) = date {
                task = task.with_date(date);
            }
            let id = task.id.clone();
            report(aura.add_task(task), || "task was not added".into())?;
            println!("{id}");
        }
        TaskAction::List { json, all } => {
            let tasks: Vec<&Task> = if all {
                aura.state().tasks.iter().collect()
            } else {
                aura.today_tasks()
            };
            if json {
                print_json(&tasks)?;
            } else if tasks.is_empty() {
                println!("No tasks.");
            } else {
                for task in tasks {
                    print_task(task);
                }
            }
        }
        TaskAction::Toggle { id } => {
            report(aura.toggle_task(&id), || format!("task not found: {id}"))?;
        }
        TaskAction::Subtask { task_id, subtask_id } => {
            report(aura.toggle_subtask(&task_id, &subtask_id), || {
                format!("subtask not found: {task_id}/{subtask_id}")
            })?;
        }
        TaskAction::Update {
            id,
            title,
            category,
            duration,
            start,
            date,
            difficulty,
            boss,
        } => {
            let patch = TaskPatch {
                title,
                duration,
                start_time: start,
                date,
                category,
                is_boss: boss,
                difficulty,
                ..Default::default()
            };
            if patch.is_empty() {
                return Err("nothing to update".into());
            }
            report(aura.update_task(&id, &patch), || format!("task not found: {id}"))?;
        }
        TaskAction::Delete { id } => {
            report(aura.delete_task(&id), || format!("task not found: {id}"))?;
        }
        TaskAction::Sort { preference } => {
            let preference: SortPreference = parse_named("sort preference", &preference)?;
            aura.set_sort_preference(preference);
            println!("Sorting by {preference:?}");
        }
    }

    Ok(())
}

fn print_task(task: &Task) {
    let mark = if task.completed { "x" } else { " " };
    let start = task.start_time.as_deref().unwrap_or("--:--");
    let boss = if task.is_boss { " [boss]" } else { "" };
    println!(
        "[{mark}] {start} {} ({} min, {}, d{}){boss}  {}",
        task.title, task.duration, task.category, task.difficulty, task.id
    );
    for sub in &task.sub_tasks {
        let mark = if sub.completed { "x" } else { " " };
        println!("      [{mark}] {}  {}", sub.title, sub.id);
    }
}
