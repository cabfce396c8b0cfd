use clap::Subcommand;

use aura_core::{ChatOutcome, ChatRole, GeminiPlanner};

use super::{open_aura, parse_named, print_event, print_json, report, CmdResult};

#[derive(Subcommand)]
pub enum ChatAction {
    /// Ask the mentor and append both sides to the live transcript
    Say {
        /// Message text
        text: String,
        /// Append the message without asking the mentor
        #[arg(long)]
        local: bool,
        /// Role of a local message: user or model
        #[arg(long, default_value = "user", requires = "local")]
        role: String,
    },
    /// Print the live transcript
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move the live transcript into the archive
    Archive,
    /// List archived sessions, newest first
    Sessions {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Load an archived session into the live transcript
    Restore {
        /// Session ID
        id: String,
    },
    /// Remove an archived session
    Delete {
        /// Session ID
        id: String,
    },
    /// Empty the live transcript without archiving
    Clear,
}

pub fn run(action: ChatAction) -> CmdResult {
    let (mut aura, config) = open_aura()?;

    match action {
        ChatAction::Say { text, local: true, role } => {
            let role: ChatRole = parse_named("role", &role)?;
            aura.push_chat_message(role, text);
        }
        ChatAction::Say { text, local: false, .. } => {
            let key = aura.planner_api_key(&config.ingest.api_key_env);
            let mentor = GeminiPlanner::new(&config.ingest, key);
            match aura.send_chat(&text, &mentor) {
                ChatOutcome::Skipped => eprintln!("Nothing to send"),
                ChatOutcome::Replied(reply) => println!("{reply}"),
                ChatOutcome::Failed { error, .. } => {
                    let notice = aura
                        .notice()
                        .map(|n| n.message.clone())
                        .unwrap_or_else(|| error.user_message().to_string());
                    eprintln!("{notice}");
                    return Err(error.into());
                }
            }
        }
        ChatAction::List { json } => {
            let chats = &aura.state().chats;
            if json {
                print_json(chats)?;
            } else {
                for message in chats {
                    let who = match message.role {
                        ChatRole::User => "you",
                        ChatRole::Model => "aura",
                    };
                    println!("{} {who}: {}", message.timestamp.format("%H:%M"), message.text);
                }
            }
        }
        ChatAction::Archive => {
            match aura.archive_current_chat() {
                Some(event) => print_event(&event),
                None => eprintln!("Nothing to archive"),
            }
        }
        ChatAction::Sessions { json } => {
            let sessions = &aura.state().archived_chats;
            if json {
                print_json(sessions)?;
            } else if sessions.is_empty() {
                println!("No archived sessions.");
            } else {
                for s in sessions {
                    println!(
                        "{}  {}  ({} messages)  {}",
                        s.timestamp.format("%Y-%m-%d %H:%M"),
                        s.preview,
                        s.messages.len(),
                        s.id
                    );
                }
            }
        }
        ChatAction::Restore { id } => {
            report(aura.restore_session(&id), || format!("session not found: {id}"))?;
        }
        ChatAction::Delete { id } => {
            report(aura.delete_session(&id), || format!("session not found: {id}"))?;
        }
        ChatAction::Clear => {
            aura.clear_chat();
            eprintln!("Transcript cleared");
        }
    }

    Ok(())
}
