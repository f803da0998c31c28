//! The in-memory project registry.
//!
//! Mutation rules:
//! - [`Registry::add`] rejects a name that is already present and leaves the
//!   registry untouched.
//! - [`Registry::remove`] deletes the first project with the given name.
//! - [`Registry::clean`] heals duplicates that arrived through a loaded config,
//!   keeping the last occurrence of each name.
//!
//! [`Registry::check`] is the gate in front of listing and dispatch: it fails
//! on an empty registry and otherwise cleans.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::listing::{self, ProjectListing};
use crate::types::{Project, ProjectName};

/// Ordered collection of uniquely named projects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    projects: Vec<Project>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap projects as loaded, duplicates included. Call [`Registry::check`]
    /// or [`Registry::clean`] before relying on uniqueness.
    pub fn from_projects(projects: Vec<Project>) -> Self {
        Self { projects }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Project> {
        self.projects.iter()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.name.as_str() == name)
    }

    /// Append `candidate` unless a project with the same name exists.
    pub fn add(&mut self, candidate: Project) -> Result<&Project, RegistryError> {
        if self.projects.iter().any(|p| p.is_duplicate_of(&candidate)) {
            return Err(RegistryError::DuplicateProject {
                name: candidate.name,
            });
        }
        self.projects.push(candidate);
        Ok(&self.projects[self.projects.len() - 1])
    }

    /// Remove the first project named `name` and hand it back.
    pub fn remove(&mut self, name: &str) -> Result<Project, RegistryError> {
        match self.projects.iter().position(|p| p.name.as_str() == name) {
            Some(index) => Ok(self.projects.remove(index)),
            None => Err(RegistryError::ProjectNotFound {
                name: ProjectName::from(name),
            }),
        }
    }

    /// Drop every project that has a later namesake. Returns how many were dropped.
    ///
    /// Survivors keep their relative order, so `[A, B, A']` becomes `[B, A']`.
    pub fn clean(&mut self) -> usize {
        let mut last_seen: HashMap<ProjectName, usize> = HashMap::new();
        for (index, project) in self.projects.iter().enumerate() {
            last_seen.insert(project.name.clone(), index);
        }

        let before = self.projects.len();
        let mut index = 0usize;
        self.projects.retain(|project| {
            let keep = last_seen.get(&project.name) == Some(&index);
            index += 1;
            keep
        });
        before - self.projects.len()
    }

    /// Fail with [`RegistryError::EmptyRegistry`] when there is nothing to
    /// work with; otherwise deduplicate in place.
    pub fn check(&mut self) -> Result<(), RegistryError> {
        if self.projects.is_empty() {
            return Err(RegistryError::EmptyRegistry);
        }
        self.clean();
        Ok(())
    }

    /// Structured description of every project, in registry order.
    pub fn list(&mut self) -> Result<Vec<ProjectListing>, RegistryError> {
        self.check()?;
        Ok(self.projects.iter().map(listing::describe).collect())
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a Project;
    type IntoIter = std::slice::Iter<'a, Project>;

    fn into_iter(self) -> Self::IntoIter {
        self.projects.iter()
    }
}

// ---------------------------------------------------------------------------
// Add requests
// ---------------------------------------------------------------------------

/// The fields a caller supplies to register a project.
///
/// `Default` matches a bare `watchdeck add`: current directory, fmt/install/run
/// enabled, every other stage off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddRequest {
    pub name: Option<String>,
    pub path: PathBuf,
    pub fmt: bool,
    pub generate: bool,
    pub test: bool,
    pub build: bool,
    pub bin: bool,
    pub run: bool,
    pub preview: bool,
    pub params: Vec<String>,
}

impl Default for AddRequest {
    fn default() -> Self {
        Self {
            name: None,
            path: PathBuf::from("."),
            fmt: true,
            generate: false,
            test: false,
            build: false,
            bin: true,
            run: true,
            preview: false,
            params: Vec::new(),
        }
    }
}

impl AddRequest {
    /// Resolve the path against `cwd`, derive the name if none was given and
    /// build the project with default watcher and stream settings.
    pub fn into_project(self, cwd: &Path) -> Result<Project, RegistryError> {
        let path = normalize_path(&self.path, cwd);

        let name = match self.name.as_deref().map(str::trim) {
            Some(explicit) if !explicit.is_empty() => explicit.to_owned(),
            _ => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    RegistryError::InvalidProject(format!(
                        "cannot derive a project name from '{}'; pass --name",
                        path.display()
                    ))
                })?,
        };

        let mut project = Project::new(name, path);
        project.fmt = self.fmt;
        project.generate = self.generate;
        project.test = self.test;
        project.build = self.build;
        project.bin = self.bin;
        project.run = self.run;
        project.params = self.params;
        project.watcher.preview = self.preview;
        Ok(project)
    }
}

/// Make `raw` absolute against `cwd` and fold `.` / `..` lexically.
///
/// The filesystem is not consulted, so the path does not need to exist yet.
pub fn normalize_path(raw: &Path, cwd: &Path) -> PathBuf {
    let joined = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        cwd.join(raw)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `/..` stays `/`
                if !matches!(out.components().next_back(), Some(Component::RootDir) | None) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
