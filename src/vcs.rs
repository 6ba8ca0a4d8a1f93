//! Version-control metadata traversal backed by Git.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::error::{MetadataAccessError, Result};

/// Prefix written in front of each commit header in the streamed `git log`.
/// A record separator cannot appear at the start of a log token otherwise.
pub const COMMIT_MARKER: char = '\u{1e}';

/// Settings forced on every git invocation so user or repository config
/// cannot change which paths `git log` reports or how it names them.
const PINNED_CONFIG: &[&str] = &[
    "log.showSignature=false",
    "log.showRoot=true",
    "diff.relative=false",
];

/// One version-controlled file or directory seen during traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    pub path: PathBuf,
    pub basename: String,
    /// For files, the committer date of the most recent commit touching the
    /// path; `None` for files that are staged but were never committed.
    /// For directories, the most recent commit that deleted something whose
    /// nearest surviving ancestor is this directory; `None` if there is none.
    pub last_committed: Option<DateTime<Utc>>,
}

impl MetadataEntry {
    pub fn new(path: PathBuf, last_committed: Option<DateTime<Utc>>) -> Self {
        let basename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        MetadataEntry {
            path,
            basename,
            last_committed,
        }
    }
}

/// Source of version-control metadata for a project tree.
///
/// `entries` yields every tracked entry under `root`, `root` included. The
/// sequence is finite and consumed once. Failing to read the store at all is
/// an error; an entry without a date is not.
pub trait MetadataStore {
    type Entries: Iterator<Item = MetadataEntry>;

    fn entries(&self, root: &Path) -> Result<Self::Entries>;
}

/// Reads committed dates from the Git working copy containing the root.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitStore;

impl MetadataStore for GitStore {
    type Entries = std::vec::IntoIter<MetadataEntry>;

    fn entries(&self, root: &Path) -> Result<Self::Entries> {
        let working_copy = WorkingCopy::locate(root)?;
        debug!(
            toplevel = %working_copy.toplevel.display(),
            prefix = %working_copy.prefix,
            "Located git working copy"
        );

        let tracked = list_tracked_files(root)?;
        let history = if has_commits(root)? {
            read_history(root, &tracked)?
        } else {
            debug!(root = %root.display(), "Repository has no commits yet");
            History::default()
        };

        debug!(
            tracked = tracked.len(),
            dated = history.files.len(),
            deleted = history.deletions.len(),
            "Collected git metadata"
        );
        Ok(working_copy.entries(tracked, &history).into_iter())
    }
}

/// Dates recovered from one walk of the history under a root, keyed by
/// path relative to the repository toplevel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    /// Most recent commit touching each tracked file.
    pub files: HashMap<String, DateTime<Utc>>,
    /// Most recent commit that deleted each path no longer tracked.
    pub deletions: HashMap<String, DateTime<Utc>>,
}

/// Where a root sits inside its repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingCopy {
    pub toplevel: PathBuf,
    /// Root relative to `toplevel`, with a trailing `/`, or empty at the top.
    pub prefix: String,
}

impl WorkingCopy {
    /// Ask git for the toplevel and prefix of the working copy containing `root`.
    pub fn locate(root: &Path) -> Result<Self> {
        let output = run_git(root, "rev-parse", &["--show-toplevel", "--show-prefix"])?;
        if !output.status.success() {
            return Err(MetadataAccessError::NotAWorkingCopy {
                path: root.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut lines = stdout.lines();
        let toplevel = match lines.next() {
            Some(line) if !line.is_empty() => PathBuf::from(line),
            _ => {
                return Err(MetadataAccessError::Malformed {
                    command: "rev-parse",
                    detail: "missing toplevel".to_string(),
                })
            }
        };
        let prefix = lines.next().unwrap_or("").to_string();

        Ok(WorkingCopy { toplevel, prefix })
    }

    /// Absolute path of the root this working copy was located from.
    pub fn root(&self) -> PathBuf {
        let prefix = self.prefix.trim_end_matches('/');
        if prefix.is_empty() {
            self.toplevel.clone()
        } else {
            self.toplevel.join(prefix)
        }
    }

    fn relative<'a>(&self, path: &'a str) -> &'a str {
        path.strip_prefix(self.prefix.as_str()).unwrap_or(path)
    }

    /// Build the entry list: the root, every tracked file under it, and every
    /// directory between the root and a tracked file. Deletions date the
    /// closest directory that still exists, the root included.
    pub fn entries(&self, tracked: HashSet<String>, history: &History) -> Vec<MetadataEntry> {
        let root = self.root();
        let mut entries = Vec::with_capacity(tracked.len() + 1);

        let mut dirs = BTreeSet::new();
        for file in &tracked {
            let relative = self.relative(file);
            for ancestor in Path::new(relative).ancestors().skip(1) {
                // Once a directory is known, so are all of its ancestors.
                if ancestor.as_os_str().is_empty() || !dirs.insert(ancestor.to_path_buf()) {
                    break;
                }
            }
            let date = history.files.get(file).copied();
            entries.push(MetadataEntry::new(root.join(relative), date));
        }

        // Keyed by path relative to the root; the empty path is the root.
        let mut dir_dates: HashMap<PathBuf, DateTime<Utc>> = HashMap::new();
        for (deleted, date) in &history.deletions {
            let survivor = Path::new(self.relative(deleted))
                .ancestors()
                .skip(1)
                .find(|ancestor| ancestor.as_os_str().is_empty() || dirs.contains(*ancestor))
                .unwrap_or(Path::new(""));
            let slot = dir_dates.entry(survivor.to_path_buf()).or_insert(*date);
            *slot = (*slot).max(*date);
        }

        entries.push(MetadataEntry::new(
            root.clone(),
            dir_dates.get(Path::new("")).copied(),
        ));
        entries.extend(dirs.into_iter().map(|dir| {
            let date = dir_dates.get(&dir).copied();
            MetadataEntry::new(root.join(dir), date)
        }));
        entries
    }
}

fn git(root: &Path) -> Command {
    let mut command = Command::new("git");
    for setting in PINNED_CONFIG {
        command.arg("-c").arg(setting);
    }
    command.current_dir(root);
    command
}

fn run_git(root: &Path, command: &'static str, args: &[&str]) -> Result<Output> {
    git(root)
        .arg(command)
        .args(args)
        .output()
        .map_err(|source| MetadataAccessError::Spawn {
            command,
            path: root.to_path_buf(),
            source,
        })
}

fn command_failed(root: &Path, command: &'static str, stderr: &[u8]) -> MetadataAccessError {
    MetadataAccessError::Command {
        command,
        path: root.to_path_buf(),
        stderr: String::from_utf8_lossy(stderr).trim().to_string(),
    }
}

/// Tracked files under `root`, relative to the repository toplevel.
fn list_tracked_files(root: &Path) -> Result<HashSet<String>> {
    let output = run_git(root, "ls-files", &["-z", "--full-name", "--", "."])?;
    if !output.status.success() {
        return Err(command_failed(root, "ls-files", &output.stderr));
    }

    Ok(output
        .stdout
        .split(|byte| *byte == 0)
        .filter(|name| !name.is_empty())
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .collect())
}

/// Whether HEAD points at a commit. An unborn branch is not an error, but a
/// HEAD that names an existing ref without resolving to a commit is.
fn has_commits(root: &Path) -> Result<bool> {
    let head = run_git(root, "rev-parse", &["--verify", "--quiet", "HEAD^{commit}"])?;
    if head.status.success() {
        return Ok(true);
    }

    let symbolic = run_git(root, "symbolic-ref", &["--quiet", "HEAD"])?;
    if !symbolic.status.success() {
        return Err(command_failed(root, "rev-parse", b"HEAD does not resolve to a commit"));
    }
    let branch = String::from_utf8_lossy(&symbolic.stdout).trim().to_string();

    let refs = run_git(root, "for-each-ref", &["--format=%(refname)", branch.as_str()])?;
    if !refs.status.success() {
        return Err(command_failed(root, "for-each-ref", &refs.stderr));
    }
    if refs.stdout.iter().all(u8::is_ascii_whitespace) {
        Ok(false)
    } else {
        Err(command_failed(
            root,
            "rev-parse",
            format!("{branch} does not resolve to a commit").as_bytes(),
        ))
    }
}

/// A running `git log` whose process is killed and reaped when dropped.
struct LogProcess {
    child: Child,
    exhausted: bool,
}

impl Drop for LogProcess {
    fn drop(&mut self) {
        if !self.exhausted {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

/// Stream the full history under `root` and date every tracked file and
/// every deleted path.
///
/// Merges are diffed against their first parent, so changes made while
/// merging (conflict resolutions included) carry the merge's date.
fn read_history(root: &Path, tracked: &HashSet<String>) -> Result<History> {
    let format = format!("--format={COMMIT_MARKER}%ct");
    let child = git(root)
        .args([
            "log",
            "-z",
            "--name-status",
            "--no-renames",
            "--no-relative",
            "--diff-merges=first-parent",
            format.as_str(),
            "--",
            ".",
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| MetadataAccessError::Spawn {
            command: "log",
            path: root.to_path_buf(),
            source,
        })?;
    let mut process = LogProcess {
        child,
        exhausted: false,
    };

    // Drained concurrently so a chatty stderr cannot block git mid-stream.
    let stderr = process.child.stderr.take();
    let stderr_reader = thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = stderr {
            let _ = pipe.read_to_end(&mut buffer);
        }
        buffer
    });

    let stdout = process
        .child
        .stdout
        .take()
        .ok_or_else(|| MetadataAccessError::Malformed {
            command: "log",
            detail: "stdout was not captured".to_string(),
        })?;

    let mut scan = LogScan::new(tracked);
    for token in BufReader::new(stdout).split(0) {
        let token = token.map_err(|source| MetadataAccessError::Spawn {
            command: "log",
            path: root.to_path_buf(),
            source,
        })?;
        scan.feed(&token)?;
    }

    process.exhausted = true;
    let status = process
        .child
        .wait()
        .map_err(|source| MetadataAccessError::Spawn {
            command: "log",
            path: root.to_path_buf(),
            source,
        })?;
    if !status.success() {
        let stderr = stderr_reader.join().unwrap_or_default();
        return Err(command_failed(root, "log", &stderr));
    }

    scan.finish()
}

/// Incremental parser for `git log -z --name-status` output: a commit
/// header followed by alternating status and path tokens.
#[derive(Debug)]
pub struct LogScan<'a> {
    tracked: &'a HashSet<String>,
    history: History,
    /// Untracked paths already seen; only their most recent change counts.
    untracked_seen: HashSet<String>,
    current: Option<DateTime<Utc>>,
    status: Option<String>,
}

impl<'a> LogScan<'a> {
    pub fn new(tracked: &'a HashSet<String>) -> Self {
        LogScan {
            tracked,
            history: History::default(),
            untracked_seen: HashSet::new(),
            current: None,
            status: None,
        }
    }

    /// Consume one NUL-separated token.
    pub fn feed(&mut self, token: &[u8]) -> Result<()> {
        let raw = String::from_utf8_lossy(token);
        let token = raw.strip_prefix('\n').unwrap_or(&raw);

        let Some(status) = self.status.take() else {
            if let Some(stamp) = token.strip_prefix(COMMIT_MARKER) {
                self.current = Some(parse_commit_time(stamp)?);
            } else if !token.is_empty() {
                self.status = Some(token.to_string());
            }
            return Ok(());
        };

        let Some(date) = self.current else {
            return Err(MetadataAccessError::Malformed {
                command: "log",
                detail: format!("path {token:?} before any commit header"),
            });
        };
        self.record(&status, token, date);
        Ok(())
    }

    fn record(&mut self, status: &str, path: &str, date: DateTime<Utc>) {
        if self.tracked.contains(path) {
            if !self.history.files.contains_key(path) {
                trace!(path, %date, "Dated path");
                self.history.files.insert(path.to_string(), date);
            }
        } else if self.untracked_seen.insert(path.to_string()) && status.starts_with('D') {
            trace!(path, %date, "Dated deletion");
            self.history.deletions.insert(path.to_string(), date);
        }
    }

    /// The dates collected so far. A status left without its path means the
    /// stream was cut short.
    pub fn finish(self) -> Result<History> {
        if let Some(status) = self.status {
            return Err(MetadataAccessError::Malformed {
                command: "log",
                detail: format!("status {status:?} without a path"),
            });
        }
        Ok(self.history)
    }
}

/// Parse a `%ct` committer timestamp (seconds since the Unix epoch).
fn parse_commit_time(stamp: &str) -> Result<DateTime<Utc>> {
    let seconds: i64 = stamp
        .trim()
        .parse()
        .map_err(|_| MetadataAccessError::Malformed {
            command: "log",
            detail: format!("invalid commit time {stamp:?}"),
        })?;

    DateTime::<Utc>::from_timestamp(seconds, 0).ok_or_else(|| MetadataAccessError::Malformed {
        command: "log",
        detail: format!("commit time out of range: {seconds}"),
    })
}
