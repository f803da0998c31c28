use std::path::PathBuf;

use thiserror::Error;

/// Why a single watch task stopped.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The task could not start observing its tree. Reported per project;
    /// other tasks keep running.
    #[error("cannot watch {path}: {reason}")]
    SetupFailure { path: PathBuf, reason: String },

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),
}

impl WatchError {
    /// A per-project setup problem rather than a fault after watching began.
    pub fn is_setup_failure(&self) -> bool {
        matches!(self, WatchError::SetupFailure { .. })
    }
}

/// Failure of one pipeline step.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to stop '{program}': {source}")]
    Stop {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{step} exited with {status}")]
    StepFailed { step: String, status: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Error surface of [`crate::Dispatcher::run`] and the blocking entry point.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("registry error: {0}")]
    Registry(#[from] watchdeck_core::RegistryError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DispatchError {
    DispatchError::Io {
        path: path.into(),
        source,
    }
}
