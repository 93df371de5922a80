//! `loanctl.toml` settings.
//!
//! Looked up in the working directory unless `--config` points elsewhere.
//! Every setting can also be overridden per invocation by a flag.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use loan_ledger_core::payments::ClosedMonthPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "loanctl.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    /// JSON ledger snapshot read and written by the mutating commands.
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,

    /// Whether payments dated inside a closed month are refused.
    #[serde(default)]
    pub closed_month_policy: ClosedMonthPolicy,
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("ledger.json")
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            ledger_path: default_ledger_path(),
            closed_month_policy: ClosedMonthPolicy::default(),
        }
    }
}

impl CliConfig {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
        let config = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse '{}': {}", path.display(), e))?;
        Ok(config)
    }

    /// An explicit path must exist; the default file is optional.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.is_file() {
                    Self::load(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// `LOANCTL_LEDGER` replaces the configured ledger path.
    pub fn with_env_override(mut self) -> Self {
        if let Ok(path) = std::env::var("LOANCTL_LEDGER") {
            if !path.trim().is_empty() {
                self.ledger_path = PathBuf::from(path);
            }
        }
        self
    }
}
