// ⚙️ Configuration - defaults, optional JSON file, CLI/env overrides

use crate::identity::{CardIssuer, DEFAULT_BIN};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Database file used when nothing else is configured
pub const DEFAULT_DATABASE: &str = "card.s3db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// SQLite database file
    pub database: PathBuf,

    /// 6-digit issuer prefix for new card numbers
    pub bin: String,

    /// Card number draws before account creation gives up
    pub max_issue_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database: PathBuf::from(DEFAULT_DATABASE),
            bin: DEFAULT_BIN.to_string(),
            max_issue_attempts: 10,
        }
    }
}

impl Config {
    /// Load a JSON config file. Missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(raw).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then the optional file, then an explicit database override
    /// (CLI flag or `BANKING_DB`).
    pub fn load(file: Option<&Path>, database: Option<PathBuf>) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(database) = database {
            config.database = database;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bin.len() != 6 || !self.bin.bytes().all(|b| b.is_ascii_digit()) {
            bail!("BIN must be exactly 6 digits, got {:?}", self.bin);
        }
        if self.max_issue_attempts == 0 {
            bail!("max_issue_attempts must be at least 1");
        }
        if self.database.as_os_str().is_empty() {
            bail!("database path must not be empty");
        }
        Ok(())
    }

    pub fn issuer(&self) -> CardIssuer {
        CardIssuer::new(self.bin.clone(), self.max_issue_attempts)
    }
}
