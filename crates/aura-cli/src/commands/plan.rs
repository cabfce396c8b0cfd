use clap::Subcommand;

use aura_core::{AiMode, EnergyLevel, GeminiPlanner, IngestOutcome};

use super::{open_aura, parse_named, print_json, CmdResult};

#[derive(Subcommand)]
pub enum PlanAction {
    /// Send free text to the planner and apply the resulting tasks
    Run {
        /// What you want to get done, in your own words
        text: String,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the planner tone: soft, normal or brutal
    Mode { mode: String },
    /// Set the energy level hint: morning, afternoon or night
    Energy { level: String },
    /// Store the planner API key; pass an empty string to clear it
    Key { key: String },
}

pub fn run(action: PlanAction) -> CmdResult {
    let (mut aura, config) = open_aura()?;

    match action {
        PlanAction::Run { text, json } => {
            let key = aura.planner_api_key(&config.ingest.api_key_env);
            let planner = GeminiPlanner::new(&config.ingest, key);
            match aura.ingest(&text, &planner) {
                IngestOutcome::Skipped => eprintln!("Nothing to plan"),
                IngestOutcome::Applied(summary) => {
                    if json {
                        print_json(&summary)?;
                    } else {
                        println!(
                            "{} created, {} updated",
                            summary.created.len(),
                            summary.updated.len()
                        );
                        if let Some(check) = &summary.reality_check {
                            println!("{check}");
                        }
                    }
                }
                IngestOutcome::Failed { error, .. } => {
                    let notice = aura
                        .notice()
                        .map(|n| n.message.clone())
                        .unwrap_or_else(|| error.user_message().to_string());
                    eprintln!("{notice}");
                    return Err(error.into());
                }
            }
        }
        PlanAction::Mode { mode } => {
            let mode: AiMode = parse_named("mode", &mode)?;
            aura.set_ai_mode(mode);
            eprintln!("Planner mode: {mode:?}");
        }
        PlanAction::Energy { level } => {
            let energy: EnergyLevel = parse_named("energy level", &level)?;
            aura.set_energy_level(energy);
            eprintln!("Energy level: {}", energy.as_str());
        }
        PlanAction::Key { key } => {
            aura.set_api_key(&key);
            if aura.state().api_key.is_some() {
                eprintln!("Key stored");
            } else {
                eprintln!("Key cleared");
            }
        }
    }

    Ok(())
}
