//! Persistent user configuration.
//!
//! A small JSON file; every field is optional and falls back to a default,
//! so a missing file is the same as an empty one. Locating the file is left
//! to the caller.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::WATCH_LATER_PLAYLIST_ID;
use crate::prune::DEFAULT_BATCH_SIZE;
use crate::retention::RetentionThreshold;
use crate::util::normalize_text_option;

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DB_FILE_NAME: &str = "ytm.db";
pub const DB_PATH_ENV: &str = "YTM_DB_PATH";

const DEFAULT_RETENTION_DAYS: u32 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    #[serde(default = "default_watch_later_playlist_id")]
    pub watch_later_playlist_id: String,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    #[serde(default = "default_prune_batch_size")]
    pub prune_batch_size: usize,
}

fn default_watch_later_playlist_id() -> String {
    WATCH_LATER_PLAYLIST_ID.to_string()
}

const fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

const fn default_prune_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: None,
            watch_later_playlist_id: default_watch_later_playlist_id(),
            retention_days: DEFAULT_RETENTION_DAYS,
            prune_batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl Config {
    /// Load the config at `path`, or defaults when the file does not exist
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let mut config = serde_json::from_str::<Self>(&raw).map_err(|error| {
            Error::InvalidInput(format!(
                "Failed to parse config at {}: {error}",
                path.display()
            ))
        })?;
        config.normalize()?;
        Ok(config)
    }

    /// Write the config to `path`, creating parent directories
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let serialized = serde_json::to_string_pretty(self)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    fn normalize(&mut self) -> Result<()> {
        self.watch_later_playlist_id =
            normalize_text_option(Some(self.watch_later_playlist_id.clone()))
                .unwrap_or_else(default_watch_later_playlist_id);
        if self.prune_batch_size == 0 {
            return Err(Error::InvalidInput(
                "prune_batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub const fn retention_threshold(&self) -> RetentionThreshold {
        RetentionThreshold::days(self.retention_days)
    }

    /// Pick the database path: explicit flag, then environment, then this
    /// config, then `default_path`.
    #[must_use]
    pub fn resolve_db_path(
        &self,
        explicit: Option<&Path>,
        env_value: Option<String>,
        default_path: PathBuf,
    ) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        if let Some(path) = normalize_text_option(env_value) {
            return PathBuf::from(path);
        }
        self.db_path.clone().unwrap_or(default_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from_path(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.watch_later_playlist_id, "WL");
        assert_eq!(config.retention_threshold().as_days(), 30);
    }

    #[test]
    fn partial_file_fills_defaults_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{ "retention_days": 14, "watch_later_playlist_id": "  " }"#)
            .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.retention_days, 14);
        assert_eq!(config.watch_later_playlist_id, "WL");
        assert_eq!(config.prune_batch_size, 50);

        config.save_to_path(&path).unwrap();
        assert_eq!(Config::load_from_path(&path).unwrap(), config);
    }

    #[test]
    fn unknown_fields_are_rejected_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{ "retension_days": 14 }"#).unwrap();

        let error = Config::load_from_path(&path).unwrap_err();
        assert!(error.to_string().contains("config.json"));
    }

    #[test]
    fn db_path_resolution_order() {
        let config = Config {
            db_path: Some(PathBuf::from("/from/config.db")),
            ..Config::default()
        };
        let default = PathBuf::from("/default.db");

        assert_eq!(
            config.resolve_db_path(
                Some(Path::new("/flag.db")),
                Some("/env.db".to_string()),
                default.clone()
            ),
            PathBuf::from("/flag.db")
        );
        assert_eq!(
            config.resolve_db_path(None, Some("/env.db".to_string()), default.clone()),
            PathBuf::from("/env.db")
        );
        assert_eq!(
            config.resolve_db_path(None, Some(" ".to_string()), default.clone()),
            PathBuf::from("/from/config.db")
        );
        assert_eq!(
            Config::default().resolve_db_path(None, None, default.clone()),
            default
        );
    }
}
