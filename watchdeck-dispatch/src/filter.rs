//! Which file-system events are worth a pipeline cycle.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use notify::EventKind;
use tokio::time::Instant;

use watchdeck_core::Project;

use crate::paths::{stream_dir, DEBOUNCE_WINDOW};

/// Extension and ignore rules for one project, anchored at its resolved root.
#[derive(Debug, Clone)]
pub struct ChangeFilter {
    root: PathBuf,
    exts: Vec<String>,
    ignored_roots: Vec<PathBuf>,
    ignored_names: Vec<String>,
}

impl ChangeFilter {
    /// Extensions match with or without a leading dot. An ignore entry
    /// containing a `/` is a path under the root; a bare name also matches any
    /// directory of that name. The stream directory is always ignored.
    pub fn for_project(project: &Project, root: &Path) -> Self {
        let exts = project
            .watcher
            .exts
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();

        let mut ignored_roots = vec![stream_dir(root)];
        let mut ignored_names = Vec::new();
        for entry in &project.watcher.ignore {
            let trimmed = entry.trim_matches('/');
            if trimmed.is_empty() {
                continue;
            }
            ignored_roots.push(root.join(trimmed));
            if !trimmed.contains('/') {
                ignored_names.push(trimmed.to_owned());
            }
        }

        Self {
            root: root.to_path_buf(),
            exts,
            ignored_roots,
            ignored_names,
        }
    }

    pub fn accepts(&self, path: &Path) -> bool {
        if self.ignored_roots.iter().any(|root| path.starts_with(root)) {
            return false;
        }
        // Directories above the root are not the project's, so a path outside
        // it (e.g. a non-canonical alias) is never matched against bare names.
        let relative = path.strip_prefix(&self.root).ok();
        let in_ignored_dir = relative.and_then(Path::parent).is_some_and(|parent| {
            parent.components().any(|c| match c {
                Component::Normal(name) => self
                    .ignored_names
                    .iter()
                    .any(|ignored| name.to_str() == Some(ignored.as_str())),
                _ => false,
            })
        });
        if in_ignored_dir {
            return false;
        }
        if self.exts.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.exts.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

/// Sub-paths of `root` named by the watcher config; `/` is the root itself.
pub fn watch_roots(project: &Project, root: &Path) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = project
        .watcher
        .paths
        .iter()
        .map(|rel| {
            let rel = rel.trim_matches('/');
            if rel.is_empty() {
                root.to_path_buf()
            } else {
                root.join(rel)
            }
        })
        .collect();
    if roots.is_empty() {
        roots.push(root.to_path_buf());
    }
    roots.sort();
    roots.dedup();
    roots
}

pub fn is_relevant_event_kind(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

pub fn should_process_event(
    debounce: &mut HashMap<PathBuf, Instant>,
    path: &Path,
    now: Instant,
) -> bool {
    should_process_event_with_threshold(debounce, path, now, DEBOUNCE_WINDOW)
}

/// Editors tend to emit several events per save; only the first per window counts.
pub fn should_process_event_with_threshold(
    debounce: &mut HashMap<PathBuf, Instant>,
    path: &Path,
    now: Instant,
    threshold: Duration,
) -> bool {
    debounce.retain(|_, seen_at| now.duration_since(*seen_at) <= Duration::from_secs(30));
    match debounce.get(path) {
        Some(last_seen) if now.duration_since(*last_seen) < threshold => false,
        _ => {
            debounce.insert(path.to_path_buf(), now);
            true
        }
    }
}
