use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Per-project directory holding the stream files. Never watched.
pub const STREAM_DIR: &str = ".watchdeck";

pub const OUTPUT_LOG: &str = "outputs.log";
pub const EVENT_LOG: &str = "logs.log";
pub const ERROR_LOG: &str = "errors.log";

pub fn stream_dir(project_root: &Path) -> PathBuf {
    project_root.join(STREAM_DIR)
}

pub fn output_log_path(project_root: &Path) -> PathBuf {
    stream_dir(project_root).join(OUTPUT_LOG)
}

pub fn event_log_path(project_root: &Path) -> PathBuf {
    stream_dir(project_root).join(EVENT_LOG)
}

pub fn error_log_path(project_root: &Path) -> PathBuf {
    stream_dir(project_root).join(ERROR_LOG)
}
