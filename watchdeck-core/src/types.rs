//! Domain types for the watchdeck registry.
//!
//! Every field carries a serde default so a hand-edited or older config file
//! still loads into a fully populated [`Project`].

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// The unique key of a project inside a [`crate::Registry`].
///
/// Comparison is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectName(pub String);

impl ProjectName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ProjectName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProjectName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Where a script runs relative to the pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookPoint {
    Before,
    After,
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPoint::Before => write!(f, "before"),
            HookPoint::After => write!(f, "after"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// A user script attached to a project's watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub command: String,
    /// Working directory, relative to the project path when not absolute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub hook: Option<HookPoint>,
}

/// What to observe and how to react.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watcher {
    /// Sub-paths relative to the project root; `/` is the root itself.
    #[serde(default = "default_watch_paths")]
    pub paths: BTreeSet<String>,
    #[serde(default = "default_ignore")]
    pub ignore: BTreeSet<String>,
    #[serde(default = "default_exts")]
    pub exts: BTreeSet<String>,
    /// Detect changes but never run the pipeline.
    #[serde(default)]
    pub preview: bool,
    #[serde(default)]
    pub scripts: Vec<Command>,
}

impl Default for Watcher {
    fn default() -> Self {
        Self {
            paths: default_watch_paths(),
            ignore: default_ignore(),
            exts: default_exts(),
            preview: false,
            scripts: Vec::new(),
        }
    }
}

/// Output routing for pipeline stdout, event log and stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streams {
    #[serde(default = "default_true")]
    pub cli_out: bool,
    #[serde(default)]
    pub file_out: bool,
    #[serde(default)]
    pub file_log: bool,
    #[serde(default)]
    pub file_err: bool,
}

impl Default for Streams {
    fn default() -> Self {
        Self {
            cli_out: true,
            file_out: false,
            file_log: false,
            file_err: false,
        }
    }
}

/// One buildable, watchable unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: ProjectName,
    /// Base path on disk, normalized when the project is added.
    pub path: PathBuf,
    #[serde(default = "default_true")]
    pub fmt: bool,
    #[serde(default)]
    pub generate: bool,
    #[serde(default)]
    pub test: bool,
    #[serde(default)]
    pub build: bool,
    /// Install stage.
    #[serde(default = "default_true")]
    pub bin: bool,
    #[serde(default = "default_true")]
    pub run: bool,
    /// Extra arguments for the run stage.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,
    #[serde(default)]
    pub watcher: Watcher,
    #[serde(default)]
    pub streams: Streams,
}

impl Project {
    /// A project with every field at its default.
    pub fn new(name: impl Into<ProjectName>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            fmt: true,
            generate: false,
            test: false,
            build: false,
            bin: true,
            run: true,
            params: Vec::new(),
            watcher: Watcher::default(),
            streams: Streams::default(),
        }
    }

    /// Two projects are duplicates when their names match; paths are not compared.
    pub fn is_duplicate_of(&self, other: &Project) -> bool {
        self.name == other.name
    }
}

/// Change-detection settings shared by every project in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Legacy {
    /// Poll the file tree instead of subscribing to OS notifications.
    #[serde(default)]
    pub status: bool,
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
}

impl Default for Legacy {
    fn default() -> Self {
        Self {
            status: false,
            interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Process-wide settings persisted next to the project list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub legacy: Legacy,
}

// ---------------------------------------------------------------------------
// serde defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_EXTENSION: &str = ".go";
pub const DEFAULT_IGNORED: &str = "vendor";
pub const ROOT_WATCH_PATH: &str = "/";

fn default_true() -> bool {
    true
}

fn default_watch_paths() -> BTreeSet<String> {
    BTreeSet::from([ROOT_WATCH_PATH.to_owned()])
}

fn default_ignore() -> BTreeSet<String> {
    BTreeSet::from([DEFAULT_IGNORED.to_owned()])
}

fn default_exts() -> BTreeSet<String> {
    BTreeSet::from([DEFAULT_EXTENSION.to_owned()])
}

fn default_poll_interval_ms() -> u64 {
    1000
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
