//! buildstamp - Reproducible Build Timestamps
//!
//! buildstamp answers "when was this code last changed" for a project root by reading
//! committed dates out of Git history rather than filesystem mtimes, so the value is
//! stable across clones, checkouts and touched files.
//!
//! ## Architecture
//!
//! - `filter` turns a raw multi-line ignore filter into an exact-basename set
//! - `vcs` walks the tracked entries under a root and dates each one from `git log`
//! - `aggregate` folds the entries into the latest committed date, skipping ignored
//!   basenames and undated entries
//!
//! `config` and `time` hold the host-side concerns: reading the TOML configuration block
//! and rendering the result.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod filter;
pub mod time;
pub mod vcs;

// Re-export commonly used items
pub use aggregate::{
    aggregate_latest_timestamp, aggregate_with, latest_committed, latest_committed_par,
    LatestTimestamp,
};
pub use config::{Config, TimestampConfig};
pub use error::MetadataAccessError;
pub use filter::{parse_ignore_filter, IgnoreSet};
pub use time::{TimestampFormat, QUALIFIER_PATTERN};
pub use vcs::{GitStore, MetadataEntry, MetadataStore};
