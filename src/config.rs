//! Configuration for the eduplat CLI.
//!
//! Loaded from `~/.eduplat/config.toml` when present; every field has a
//! working default so a missing file is not an error. The database path can
//! also be overridden per invocation with `--db` / `EDUPLAT_DB`, and the AI
//! key with `EDUPLAT_AI_KEY`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Error;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Path to the SQLite database file. Defaults to
    /// `~/.eduplat/eduplat.sqlite3`.
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    #[serde(default)]
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            model: default_model(),
        }
    }
}

fn default_base_url() -> String {
    "https://spark-api-open.xf-yun.com/v1".to_string()
}

fn default_model() -> String {
    "lite".to_string()
}

impl Config {
    /// Load config from `~/.eduplat/config.toml`, falling back to defaults.
    pub fn load() -> Result<Self, Error> {
        let path = Self::path();
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str(&content)
                .map_err(|e| Error::invalid(format!("bad config file {}: {}", path.display(), e)))?
        } else {
            Self::default()
        };
        if let Ok(key) = std::env::var("EDUPLAT_AI_KEY") {
            config.ai.api_key = key;
        }
        Ok(config)
    }

    /// Path to the global eduplat directory (`~/.eduplat/`).
    pub fn global_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".eduplat")
    }

    pub fn path() -> PathBuf {
        Self::global_dir().join("config.toml")
    }

    /// Database path: explicit override > config file > default location.
    pub fn resolve_db_path(&self, cli_override: Option<&PathBuf>) -> PathBuf {
        if let Some(p) = cli_override {
            return p.clone();
        }
        if let Some(p) = &self.db_path {
            return p.clone();
        }
        Self::global_dir().join("eduplat.sqlite3")
    }
}
