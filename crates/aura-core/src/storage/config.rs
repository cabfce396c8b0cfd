//! TOML-based application configuration.
//!
//! Host-level settings that do not belong in the state snapshot:
//! - where the snapshot lives
//! - undo and notice windows
//! - the timer poll interval and day-reconciliation policy
//! - the planner endpoint
//! - the log filter
//!
//! Configuration is stored at `<data dir>/config.toml`.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::task::PurgePolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Key of the snapshot row in the `kv` table.
    #[serde(default = "default_slot")]
    pub slot: String,
    #[serde(default = "default_database_file")]
    pub database_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoConfig {
    #[serde(default = "default_undo_window")]
    pub window_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeConfig {
    #[serde(default = "default_notice_ttl")]
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChronoConfig {
    /// Poll interval for `chrono watch`.
    #[serde(default = "default_tick")]
    pub tick_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    #[serde(default)]
    pub policy: PurgePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Environment variable consulted when the state holds no API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub undo: UndoConfig,
    #[serde(default)]
    pub notice: NoticeConfig,
    #[serde(default)]
    pub chrono: ChronoConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub log: LogConfig,
}

// Default functions
fn default_slot() -> String {
    "aura_state".into()
}
fn default_database_file() -> String {
    "aura.db".into()
}
fn default_undo_window() -> u64 {
    5
}
fn default_notice_ttl() -> u64 {
    4
}
fn default_tick() -> u64 {
    1
}
fn default_model() -> String {
    "gemini-2.5-flash".into()
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn default_api_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_log_filter() -> String {
    "warn".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            slot: default_slot(),
            database_file: default_database_file(),
        }
    }
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            window_secs: default_undo_window(),
        }
    }
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_notice_ttl(),
        }
    }
}

impl Default for ChronoConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        let mut current = root;
        while let Some(part) = parts.next() {
            if part.is_empty() {
                return Err(unknown());
            }
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => serde_json::Value::Number(
                    value
                        .parse::<u64>()
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?
                        .into(),
                ),
                serde_json::Value::Object(_) => return Err(unknown()),
                _ => serde_json::Value::String(value.into()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// `<data dir>/config.toml`.
    pub fn path() -> crate::Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data dir, writing the defaults on first run.
    pub fn load() -> crate::Result<Self> {
        Ok(Self::load_from(&Self::path()?)?)
    }

    /// Load from `path`, writing the defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed,
    /// or if the default config cannot be written.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the data dir.
    pub fn save(&self) -> crate::Result<()> {
        Ok(self.save_to(&Self::path()?)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key. The caller saves.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit
    /// the field.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Every leaf key, sorted, with its current value.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out.sort();
        out
    }

    pub fn undo_window(&self) -> Duration {
        Duration::seconds(i64::try_from(self.undo.window_secs).unwrap_or(i64::MAX / 1000))
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::seconds(i64::try_from(self.notice.ttl_secs).unwrap_or(i64::MAX / 1000))
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.undo.window_secs, 5);
        assert_eq!(parsed.notice.ttl_secs, 4);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[reconcile]\npolicy = \"all-non-routine\"\n").unwrap();
        assert_eq!(parsed.reconcile.policy, PurgePolicy::AllNonRoutine);
        assert_eq!(parsed.storage.slot, "aura_state");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("undo.window_secs").as_deref(), Some("5"));
        assert_eq!(cfg.get("reconcile.policy").as_deref(), Some("incomplete-only"));
        assert!(cfg.get("undo.missing_key").is_none());
    }

    #[test]
    fn set_updates_typed_fields() {
        let mut cfg = Config::default();
        cfg.set("notice.ttl_secs", "10").unwrap();
        cfg.set("reconcile.policy", "all-non-routine").unwrap();
        cfg.set("ingest.model", "gemini-pro").unwrap();
        assert_eq!(cfg.notice.ttl_secs, 10);
        assert_eq!(cfg.reconcile.policy, PurgePolicy::AllNonRoutine);
        assert_eq!(cfg.ingest.model, "gemini-pro");
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("undo.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(cfg.set("undo", "1"), Err(ConfigError::UnknownKey(_))));
        assert!(matches!(cfg.set("", "1"), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn set_rejects_invalid_values() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("undo.window_secs", "soon"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.set("reconcile.policy", "everything"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn load_from_writes_defaults_then_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.set("chrono.tick_secs", "2").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().chrono.tick_secs, 2);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "undo = [").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseFailed(_))
        ));
    }

    #[test]
    fn entries_lists_leaves() {
        let entries = Config::default().entries();
        assert!(entries.contains(&("storage.slot".to_string(), "aura_state".to_string())));
        assert!(entries.iter().all(|(k, _)| k.contains('.')));
    }
}
