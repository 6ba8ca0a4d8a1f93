//! Maximum committed-date reduction over version-control metadata.

use std::path::Path;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::error::Result;
use crate::filter::IgnoreSet;
use crate::vcs::{GitStore, MetadataEntry, MetadataStore};

/// Running maximum of committed dates.
///
/// `observe` and `merge` are associative and commutative, so entries can be
/// folded in any order or split across threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatestTimestamp {
    latest: Option<DateTime<Utc>>,
    considered: usize,
}

impl LatestTimestamp {
    /// Fold one entry in. Ignored and undated entries leave the value unchanged.
    pub fn observe(self, entry: &MetadataEntry, ignore: &IgnoreSet) -> Self {
        if ignore.contains(&entry.basename) {
            trace!(path = %entry.path.display(), "Skipping ignored entry");
            return self;
        }
        let Some(date) = entry.last_committed else {
            trace!(path = %entry.path.display(), "Skipping entry without committed date");
            return self;
        };

        LatestTimestamp {
            latest: match self.latest {
                Some(current) if current >= date => Some(current),
                _ => Some(date),
            },
            considered: self.considered + 1,
        }
    }

    pub fn merge(self, other: Self) -> Self {
        LatestTimestamp {
            latest: self.latest.max(other.latest),
            considered: self.considered + other.considered,
        }
    }

    pub fn latest(&self) -> Option<DateTime<Utc>> {
        self.latest
    }

    /// Number of dated, non-ignored entries folded in.
    pub fn considered(&self) -> usize {
        self.considered
    }
}

/// Latest committed date among `entries` whose basename is not ignored.
pub fn latest_committed<I>(entries: I, ignore: &IgnoreSet) -> LatestTimestamp
where
    I: IntoIterator<Item = MetadataEntry>,
{
    entries
        .into_iter()
        .fold(LatestTimestamp::default(), |acc, entry| acc.observe(&entry, ignore))
}

/// Parallel form of [`latest_committed`] for an already collected entry list.
pub fn latest_committed_par(entries: &[MetadataEntry], ignore: &IgnoreSet) -> LatestTimestamp {
    entries
        .par_iter()
        .fold(LatestTimestamp::default, |acc, entry| acc.observe(entry, ignore))
        .reduce(LatestTimestamp::default, LatestTimestamp::merge)
}

/// Latest committed date under `root`, read through `store`.
///
/// `Ok(None)` means no tracked, non-ignored entry carries a date. Any failure
/// to read the store aborts the whole computation.
pub fn aggregate_with<S: MetadataStore>(
    store: &S,
    root: &Path,
    ignore: &IgnoreSet,
) -> Result<Option<DateTime<Utc>>> {
    let result = latest_committed(store.entries(root)?, ignore);
    debug!(
        root = %root.display(),
        considered = result.considered(),
        latest = ?result.latest(),
        "Aggregated committed dates"
    );
    Ok(result.latest())
}

/// Latest committed date of any tracked entry under `root` in its Git
/// working copy, skipping entries whose basename is in `ignore`.
pub fn aggregate_latest_timestamp(
    root: &Path,
    ignore: &IgnoreSet,
) -> Result<Option<DateTime<Utc>>> {
    aggregate_with(&GitStore, root, ignore)
}
