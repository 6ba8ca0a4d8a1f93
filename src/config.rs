//! Build-configuration loading from TOML.
//!
//! The configuration block mirrors what a build tool would hand over:
//!
//! ```toml
//! [timestamp]
//! ignore_filter = """
//! pom.xml
//! """
//! format = "%Y%m%d%H%M"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Top-level configuration document
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timestamp: TimestampConfig,
}

/// The `[timestamp]` block
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TimestampConfig {
    /// Basenames to skip, one per line
    #[serde(default, alias = "ignoreFilter")]
    pub ignore_filter: Option<String>,
    /// strftime pattern for the rendered timestamp
    #[serde(default)]
    pub format: Option<String>,
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse configuration TOML")
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Raw ignore filter with extra names appended one per line.
    /// Absent when neither source names anything.
    pub fn ignore_filter_with(&self, extra: &[String]) -> Option<String> {
        let mut lines: Vec<&str> = Vec::new();
        if let Some(filter) = self.timestamp.ignore_filter.as_deref() {
            lines.push(filter);
        }
        lines.extend(extra.iter().map(String::as_str));

        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}
