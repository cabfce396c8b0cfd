pub mod config;
pub mod database;
pub mod snapshot;

pub use config::Config;
pub use database::Database;
pub use snapshot::{MemorySnapshotStore, SnapshotStore, SqliteSnapshotStore};

use std::path::PathBuf;

/// Returns the data directory, creating it if needed.
///
/// `AURA_HOME` wins when set. Otherwise `~/.config/aura[-dev]/`, with
/// `AURA_ENV=dev` selecting the development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> crate::Result<PathBuf> {
    let dir = match std::env::var_os("AURA_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("AURA_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("aura-dev")
            } else {
                base_dir.join("aura")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
