use clap::{Parser, Subcommand};
use clap_complete::Shell;

mod commands;

#[derive(Parser)]
#[command(name = "aura", version, about = "Aura: daily tasks, routines and focus intervals")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Daily routine templates
    Routine {
        #[command(subcommand)]
        action: commands::routine::RoutineAction,
    },
    /// Focus and break intervals
    Chrono {
        #[command(subcommand)]
        action: commands::interval::ChronoAction,
    },
    /// Chat transcript and archive
    Chat {
        #[command(subcommand)]
        action: commands::chat::ChatAction,
    },
    /// Progression and history
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Turn free text into tasks with the planner
    Plan {
        #[command(subcommand)]
        action: commands::plan::PlanAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();
    commands::init_tracing();

    let result = match cli.command {
        Commands::Task { action } => commands::task::run(action),
        Commands::Routine { action } => commands::routine::run(action),
        Commands::Chrono { action } => commands::interval::run(action),
        Commands::Chat { action } => commands::chat::run(action),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Plan { action } => commands::plan::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            commands::completions(shell);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
