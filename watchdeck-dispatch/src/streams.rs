//! Routing of pipeline output according to a project's [`Streams`] settings.
//!
//! `cli_out` sends stage output through `tracing`; each file flag appends a
//! timestamped line to its file under `<project>/.watchdeck/`. File writes
//! happen on a writer task that batches lines onto the blocking pool, so a
//! chatty program never blocks a runtime worker.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tokio::sync::{mpsc, oneshot};

use watchdeck_core::{ProjectName, Streams};

use crate::error::PipelineError;
use crate::log_rotation::rotate_stream_file;
use crate::paths::{error_log_path, event_log_path, output_log_path, stream_dir};

enum WriterMsg {
    Append { path: PathBuf, line: String },
    Flush(oneshot::Sender<()>),
}

/// Output sinks for one project.
///
/// When any file stream is enabled, construction spawns the writer task and
/// must happen inside a tokio runtime.
#[derive(Debug, Clone)]
pub struct StreamSinks {
    project: ProjectName,
    streams: Streams,
    root: PathBuf,
    writer: Option<mpsc::UnboundedSender<WriterMsg>>,
}

impl StreamSinks {
    pub fn new(project: ProjectName, streams: Streams, root: &Path) -> Self {
        let writer = (streams.file_out || streams.file_log || streams.file_err).then(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(write_loop(rx, root.to_path_buf(), project.clone()));
            tx
        });
        Self {
            project,
            streams,
            root: root.to_path_buf(),
            writer,
        }
    }

    pub fn streams(&self) -> Streams {
        self.streams
    }

    /// A line of stage stdout.
    pub fn out(&self, line: &str) {
        if self.streams.cli_out {
            tracing::info!(project = %self.project, "{line}");
        }
        if self.streams.file_out {
            self.append(output_log_path(&self.root), line);
        }
    }

    /// A watcher/pipeline event (change detected, stage started, ...).
    pub fn log(&self, line: &str) {
        if self.streams.file_log {
            self.append(event_log_path(&self.root), line);
        }
    }

    /// A line of stage stderr or a failure message.
    pub fn err(&self, line: &str) {
        if self.streams.cli_out {
            tracing::warn!(project = %self.project, "{line}");
        }
        if self.streams.file_err {
            self.append(error_log_path(&self.root), line);
        }
    }

    /// Resolve once every line queued before this call is on disk.
    pub async fn flush(&self) {
        let Some(writer) = &self.writer else { return };
        let (ack, done) = oneshot::channel();
        if writer.send(WriterMsg::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }

    fn append(&self, path: PathBuf, line: &str) {
        let Some(writer) = &self.writer else { return };
        // Stamp at emit time; the write may lag.
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let msg = WriterMsg::Append {
            path,
            line: format!("[{stamp}] {line}"),
        };
        if writer.send(msg).is_err() {
            tracing::warn!(project = %self.project, "stream writer stopped; line dropped");
        }
    }
}

async fn write_loop(mut rx: mpsc::UnboundedReceiver<WriterMsg>, root: PathBuf, project: ProjectName) {
    while let Some(first) = rx.recv().await {
        let mut batch = vec![first];
        while let Ok(next) = rx.try_recv() {
            batch.push(next);
        }

        let dir = root.clone();
        let (acks, errors) = match tokio::task::spawn_blocking(move || write_batch(&dir, batch)).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(project = %project, error = %err, "stream writer batch failed");
                continue;
            }
        };
        for err in errors {
            tracing::warn!(project = %project, error = %err, "failed to write stream file");
        }
        for ack in acks {
            let _ = ack.send(());
        }
    }
}

/// Append every line in order; flush requests are handed back for acking.
fn write_batch(root: &Path, batch: Vec<WriterMsg>) -> (Vec<oneshot::Sender<()>>, Vec<PipelineError>) {
    let mut acks = Vec::new();
    let mut errors = Vec::new();
    for msg in batch {
        match msg {
            WriterMsg::Append { path, line } => {
                if let Err(err) = append_line(root, &path, &line) {
                    errors.push(err);
                }
            }
            WriterMsg::Flush(ack) => acks.push(ack),
        }
    }
    (acks, errors)
}

fn append_line(root: &Path, path: &Path, line: &str) -> Result<(), PipelineError> {
    let io = |source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = stream_dir(root);
    std::fs::create_dir_all(&dir).map_err(|source| PipelineError::Io { path: dir, source })?;
    rotate_stream_file(path);

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io)?;
    writeln!(file, "{line}").map_err(io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sinks(root: &Path, streams: Streams) -> StreamSinks {
        StreamSinks::new(ProjectName::from("api"), streams, root)
    }

    #[test]
    fn default_streams_need_no_runtime_and_write_no_files() {
        let root = TempDir::new().unwrap();
        let s = sinks(root.path(), Streams::default());
        s.out("built");
        s.log("changed");
        s.err("boom");
        assert!(!stream_dir(root.path()).exists());
    }

    #[tokio::test]
    async fn each_file_flag_routes_to_its_file() {
        let root = TempDir::new().unwrap();
        let s = sinks(
            root.path(),
            Streams {
                cli_out: false,
                file_out: true,
                file_log: true,
                file_err: true,
            },
        );
        s.out("stdout line");
        s.log("event line");
        s.err("stderr line");
        s.flush().await;

        let out = std::fs::read_to_string(output_log_path(root.path())).unwrap();
        let log = std::fs::read_to_string(event_log_path(root.path())).unwrap();
        let err = std::fs::read_to_string(error_log_path(root.path())).unwrap();
        assert!(out.trim_end().ends_with("stdout line") && out.starts_with('['));
        assert!(log.contains("event line") && !log.contains("stdout line"));
        assert!(err.contains("stderr line"));
    }

    #[tokio::test]
    async fn lines_append_in_emit_order() {
        let root = TempDir::new().unwrap();
        let s = sinks(
            root.path(),
            Streams {
                file_out: true,
                ..Streams::default()
            },
        );
        for n in 0..200 {
            s.out(&format!("line {n}"));
        }
        s.flush().await;

        let out = std::fs::read_to_string(output_log_path(root.path())).unwrap();
        let numbers: Vec<usize> = out
            .lines()
            .map(|l| l.rsplit(' ').next().unwrap().parse().unwrap())
            .collect();
        assert_eq!(numbers, (0..200).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn flush_without_file_streams_returns_at_once() {
        let root = TempDir::new().unwrap();
        sinks(root.path(), Streams::default()).flush().await;
    }
}
