//! Timestamp rendering for build output.

use anyhow::Result;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, SecondsFormat, Utc};

/// Build-qualifier layout, e.g. `202401311542`.
pub const QUALIFIER_PATTERN: &str = "%Y%m%d%H%M";

/// How a build timestamp is written out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampFormat {
    /// `2024-01-31T15:42:07Z`
    Rfc3339,
    /// Seconds since the Unix epoch
    Unix,
    /// A chrono strftime pattern, rendered in UTC
    Pattern(String),
}

impl TimestampFormat {
    /// Create a format from CLI arguments
    /// An explicit pattern wins over the config pattern; `unix` and `qualifier` are shorthands
    pub fn from_args(
        pattern: Option<&str>,
        config_pattern: Option<&str>,
        unix: bool,
        qualifier: bool,
    ) -> Result<Self> {
        if unix {
            return Ok(TimestampFormat::Unix);
        }
        if qualifier {
            return Ok(TimestampFormat::Pattern(QUALIFIER_PATTERN.to_string()));
        }

        match pattern.or(config_pattern) {
            Some(pattern) => parse_pattern(pattern),
            None => Ok(TimestampFormat::Rfc3339),
        }
    }

    pub fn render(&self, timestamp: &DateTime<Utc>) -> String {
        match self {
            TimestampFormat::Rfc3339 => timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            TimestampFormat::Unix => timestamp.timestamp().to_string(),
            TimestampFormat::Pattern(pattern) => timestamp.format(pattern).to_string(),
        }
    }
}

/// Validate a strftime pattern up front so rendering can't fail later
pub fn parse_pattern(pattern: &str) -> Result<TimestampFormat> {
    if pattern.is_empty() {
        anyhow::bail!("Timestamp format must not be empty");
    }

    let invalid = StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error));
    if invalid {
        anyhow::bail!("Invalid timestamp format: {}", pattern);
    }

    Ok(TimestampFormat::Pattern(pattern.to_string()))
}
