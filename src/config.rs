//! User configuration, read from `config.toml`.
//!
//! Every field has a default, so a missing file or a partial one is fine.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_FOLDER_NAME, DEFAULT_PIECE_LENGTH, DEFAULT_TRACKER, SHARE_FOLDER_NAME, TORRENT_BUCKET,
};
use crate::metainfo::TrackerList;

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a home directory")]
    HomeInvalid,

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Piece length for new torrents, in bytes.
    pub piece_length: i64,
    /// Announce URLs, first one primary.
    pub trackers: Vec<String>,
    /// Hashing threads used for file sources.
    pub workers: usize,
    pub bucket: String,
    pub default_folder: String,
    pub share_folder: String,
    /// Base URL that public object URLs are built from.
    pub storage_url: String,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            piece_length: DEFAULT_PIECE_LENGTH,
            trackers: vec![DEFAULT_TRACKER.to_string()],
            workers: 1,
            bucket: TORRENT_BUCKET.to_string(),
            default_folder: DEFAULT_FOLDER_NAME.to_string(),
            share_folder: SHARE_FOLDER_NAME.to_string(),
            storage_url: "http://localhost:54321/storage/v1".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// `<config dir>/bdesk/config.toml`, if the platform has a home directory.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dirs = ProjectDirs::from("", "", "bdesk").ok_or(ConfigError::HomeInvalid)?;
        Ok(dirs.config_dir().join(CONFIG_FILE))
    }

    /// Loads from `path` when given, else from [`Config::default_path`].
    ///
    /// A missing file at the default location yields the defaults; a missing
    /// file that was asked for explicitly is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_path(path),
            None => {
                let path = Self::default_path()?;
                if path.exists() {
                    Self::from_path(&path)
                } else {
                    tracing::debug!(path = %path.display(), "no config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn tracker_list(&self) -> TrackerList {
        self.trackers
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.piece_length, 262_144);
        assert_eq!(config.workers, 1);
        assert_eq!(config.bucket, "torrents");
        assert_eq!(
            config.tracker_list().primary(),
            Some("udp://tracker.opentrackr.org:1337/announce")
        );
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            piece_length = 16384
            trackers = ["udp://a/announce", "  ", "http://b/announce"]
            "#,
        )
        .unwrap();

        assert_eq!(config.piece_length, 16_384);
        assert_eq!(config.tracker_list().len(), 2);
        assert_eq!(config.default_folder, "Documents");
        assert_eq!(config.share_folder, "Share");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "workers = 4\nlog_level = \"debug\"").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::load(Some(&dir.path().join("missing.toml"))),
            Err(ConfigError::Io { .. })
        ));
        assert!(matches!(
            Config::from_toml_str("workers = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_serializes_back() {
        let config = Config::default();
        let text = toml::to_string(&config).unwrap();
        assert_eq!(Config::from_toml_str(&text).unwrap(), config);
    }
}
