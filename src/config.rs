// SPDX-License-Identifier: MPL-2.0

//! Injectable filter configuration.
//!
//! The keyword set and author allow-list are data, not code: deployments load
//! them from a JSON file and can retune without rebuilding the filter logic.
//! The defaults reproduce the Finger Lakes deployment this crate grew out of.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Region filter tuning, serializable so it can live in a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Case-insensitive substring keywords; a post matching any is relevant.
    pub keywords: HashSet<String>,
    /// Author DIDs whose posts are always relevant, keywords or not.
    pub allow_list: HashSet<String>,
    /// When true, posts older than the archive threshold are dropped at
    /// ingest time regardless of relevance.
    #[serde(default = "default_ignore_archived")]
    pub ignore_archived: bool,
    /// Age beyond which a post counts as archived.
    #[serde(default = "default_archive_threshold_hours")]
    pub archive_threshold_hours: i64,
}

fn default_ignore_archived() -> bool {
    true
}

fn default_archive_threshold_hours() -> i64 {
    24
}

impl Default for FilterConfig {
    fn default() -> Self {
        let keywords = [
            "ithaca",
            "tompkins",
            "14850",
            "flxsky",
            "cornell",
            "ithacany",
            "fingerlakes",
            "cayuga",
            "trumansburg",
        ];
        let allow_list = [
            // Ithaca Voice
            "did:plc:oynycxf3neiejuf272tswm5n",
            // Ithaca Murals
            "did:plc:wekkzymalzgyxlboce5ezecm",
        ];

        Self {
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            allow_list: allow_list.iter().map(|s| s.to_string()).collect(),
            ignore_archived: default_ignore_archived(),
            archive_threshold_hours: default_archive_threshold_hours(),
        }
    }
}

impl FilterConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Load from a JSON file, falling back to defaults if it doesn't exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to a JSON file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
