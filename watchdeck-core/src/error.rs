//! Error types for watchdeck-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::ProjectName;

/// All errors that can arise from registry operations and config persistence.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Run or List on a registry with nothing in it.
    #[error("there are no projects; add one with `watchdeck add`")]
    EmptyRegistry,

    /// Add rejected because the name is already registered.
    #[error("project '{name}' already exists")]
    DuplicateProject { name: ProjectName },

    /// Remove given a name that is not registered.
    #[error("no project named '{name}'")]
    ProjectNotFound { name: ProjectName },

    /// An add request that cannot produce a usable project.
    #[error("invalid project: {0}")]
    InvalidProject(String),

    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the file path.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}
