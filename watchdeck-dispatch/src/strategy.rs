//! Change-detection strategies.
//!
//! Both variants feed the same watch loop; they differ only in the `notify`
//! backend: OS notifications ([`NotifyStrategy`]) or periodic directory scans
//! ([`PollingStrategy`], the legacy mode for network and container mounts).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use notify::{recommended_watcher, Config, Event, PollWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::dispatcher::BoundProject;
use crate::error::WatchError;
use crate::filter::{is_relevant_event_kind, should_process_event, watch_roots, ChangeFilter};
use crate::pipeline::Pipeline;
use crate::runner::TaskRunner;

/// Observes one project until a fatal error. Implementations own their
/// watcher handle and release it on every exit path.
#[async_trait]
pub trait WatchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn watch(&self, project: BoundProject) -> Result<(), WatchError>;
}

pub struct NotifyStrategy {
    runner: Arc<dyn TaskRunner>,
}

impl NotifyStrategy {
    pub fn new(runner: Arc<dyn TaskRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl WatchStrategy for NotifyStrategy {
    fn name(&self) -> &'static str {
        "notify"
    }

    async fn watch(&self, project: BoundProject) -> Result<(), WatchError> {
        let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let watcher = recommended_watcher(move |event| {
            let _ = event_tx.send(event);
        })
        .map_err(|err| setup_failure(&project, err))?;
        observe(watcher, event_rx, project, self.runner.clone()).await
    }
}

pub struct PollingStrategy {
    interval: Duration,
    runner: Arc<dyn TaskRunner>,
}

impl PollingStrategy {
    pub fn new(interval: Duration, runner: Arc<dyn TaskRunner>) -> Self {
        Self { interval, runner }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[async_trait]
impl WatchStrategy for PollingStrategy {
    fn name(&self) -> &'static str {
        "polling"
    }

    async fn watch(&self, project: BoundProject) -> Result<(), WatchError> {
        let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let watcher = PollWatcher::new(
            move |event| {
                let _ = event_tx.send(event);
            },
            Config::default().with_poll_interval(self.interval),
        )
        .map_err(|err| setup_failure(&project, err))?;
        observe(watcher, event_rx, project, self.runner.clone()).await
    }
}

fn setup_failure(project: &BoundProject, err: notify::Error) -> WatchError {
    WatchError::SetupFailure {
        path: project.resolved_path().to_path_buf(),
        reason: err.to_string(),
    }
}

/// Register the project's roots with `watcher`, run the initial cycle, then
/// run a cycle per qualifying change. Returns only on setup failure or when
/// the event channel closes.
async fn observe<W: Watcher + Send>(
    mut watcher: W,
    mut events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    project: BoundProject,
    runner: Arc<dyn TaskRunner>,
) -> Result<(), WatchError> {
    let root = project.resolved_path().to_path_buf();
    if !root.is_dir() {
        return Err(WatchError::SetupFailure {
            path: root,
            reason: "project path does not exist or is not a directory".into(),
        });
    }

    let roots = watch_roots(project.project(), &root);
    for dir in &roots {
        if !dir.exists() {
            return Err(WatchError::SetupFailure {
                path: dir.clone(),
                reason: "watch path does not exist".into(),
            });
        }
        watcher
            .watch(dir, RecursiveMode::Recursive)
            .map_err(|err| WatchError::SetupFailure {
                path: dir.clone(),
                reason: err.to_string(),
            })?;
    }

    let name = project.name().clone();
    tracing::info!(
        project = %name,
        roots = ?roots,
        preview = project.project().watcher.preview,
        "watching",
    );

    let filter = ChangeFilter::for_project(project.project(), &root);
    let mut pipeline = Pipeline::new(&project, runner);
    if let Err(err) = pipeline.cycle(None).await {
        tracing::error!(project = %name, error = %err, "initial pipeline cycle failed");
    }

    let mut debounce = HashMap::<PathBuf, Instant>::new();
    let result = loop {
        let Some(event) = events.recv().await else {
            break Err(WatchError::ChannelClosed("watch events"));
        };
        let event = match event {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(project = %name, error = %err, "watcher event error");
                continue;
            }
        };
        if !is_relevant_event_kind(&event.kind) {
            continue;
        }

        let trigger = event.paths.into_iter().find(|path| {
            filter.accepts(path) && should_process_event(&mut debounce, path, Instant::now())
        });
        let Some(trigger) = trigger else { continue };

        tracing::info!(project = %name, path = %trigger.display(), "change detected");
        if let Err(err) = pipeline.cycle(Some(&trigger)).await {
            tracing::error!(project = %name, error = %err, "pipeline cycle failed");
        }
    };

    pipeline.shutdown().await;
    drop(watcher);
    result
}
