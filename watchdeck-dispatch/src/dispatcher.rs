//! Concurrent dispatch: one watch task per registered project.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use watchdeck_core::{Legacy, Project, ProjectName, Registry, Settings};

use crate::counter::CompletionCounter;
use crate::error::{io_err, DispatchError};
use crate::runner::{ProcessRunner, TaskRunner};
use crate::strategy::{NotifyStrategy, PollingStrategy, WatchStrategy};

/// Change detection used for every project of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Notify,
    Polling { interval: Duration },
}

impl StrategyKind {
    pub fn from_legacy(legacy: &Legacy) -> Self {
        if legacy.status {
            StrategyKind::Polling {
                interval: Duration::from_millis(legacy.interval_ms.max(1)),
            }
        } else {
            StrategyKind::Notify
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    pub strategy: StrategyKind,
}

impl DispatchConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            strategy: StrategyKind::from_legacy(&settings.legacy),
        }
    }
}

/// Build the strategy named by `kind`.
pub fn select_strategy(kind: StrategyKind, runner: Arc<dyn TaskRunner>) -> Arc<dyn WatchStrategy> {
    match kind {
        StrategyKind::Notify => Arc::new(NotifyStrategy::new(runner)),
        StrategyKind::Polling { interval } => Arc::new(PollingStrategy::new(interval, runner)),
    }
}

/// A project as seen by its watch task: an immutable registry snapshot, the
/// project's index in it and the path resolved at dispatch time.
#[derive(Debug, Clone)]
pub struct BoundProject {
    registry: Arc<Registry>,
    index: usize,
    resolved_path: PathBuf,
}

impl BoundProject {
    /// Bind the project at `index`. Panics if `index` is out of range.
    pub fn bind(registry: Arc<Registry>, index: usize) -> Self {
        let resolved_path = resolve_path(&registry.projects()[index].path);
        Self {
            registry,
            index,
            resolved_path,
        }
    }

    pub fn project(&self) -> &Project {
        &self.registry.projects()[self.index]
    }

    pub fn name(&self) -> &ProjectName {
        &self.project().name
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn resolved_path(&self) -> &Path {
        &self.resolved_path
    }
}

/// Canonical path when the directory exists, otherwise the stored path as-is
/// so the watch task can report it.
fn resolve_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskFailure {
    pub project: ProjectName,
    pub error: String,
    /// The task never started observing (bad path, watcher init failure).
    pub setup: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub launched: usize,
    pub failures: Vec<TaskFailure>,
    /// Set by [`start_blocking`] when Ctrl-C ended the run.
    pub interrupted: bool,
}

pub struct Dispatcher {
    strategy: Arc<dyn WatchStrategy>,
    counter: CompletionCounter,
}

impl Dispatcher {
    /// Dispatcher running real processes with the strategy chosen by `config`.
    pub fn new(config: DispatchConfig) -> Self {
        Self::with_runner(config, Arc::new(ProcessRunner))
    }

    pub fn with_runner(config: DispatchConfig, runner: Arc<dyn TaskRunner>) -> Self {
        Self::with_strategy(select_strategy(config.strategy, runner), CompletionCounter::new())
    }

    /// Inject both the strategy and the counter.
    pub fn with_strategy(strategy: Arc<dyn WatchStrategy>, counter: CompletionCounter) -> Self {
        Self { strategy, counter }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn counter(&self) -> &CompletionCounter {
        &self.counter
    }

    /// Check the registry, spawn one watch task per project and wait until
    /// every task has returned.
    ///
    /// A failing task is logged and recorded in the summary; it does not stop
    /// the others. The registry is cleaned in place but not otherwise mutated;
    /// tasks read a snapshot.
    pub async fn run(&self, registry: &mut Registry) -> Result<RunSummary, DispatchError> {
        registry.check()?;
        let snapshot = Arc::new(registry.clone());
        let count = snapshot.len();

        tracing::info!(projects = count, strategy = self.strategy.name(), "starting watchers");
        self.counter.add(count);

        let mut handles = Vec::with_capacity(count);
        for index in 0..count {
            let bound = BoundProject::bind(snapshot.clone(), index);
            let name = bound.name().clone();
            let strategy = self.strategy.clone();
            let guard = self.counter.guard();
            let handle = tokio::spawn(async move {
                let _guard = guard;
                let name = bound.name().clone();
                let result = strategy.watch(bound).await;
                match &result {
                    Ok(()) => tracing::info!(project = %name, "watch task finished"),
                    Err(err) => tracing::error!(project = %name, error = %err, "watch task failed"),
                }
                result
            });
            handles.push((name, handle));
        }

        self.counter.wait().await;

        let mut summary = RunSummary {
            launched: count,
            ..RunSummary::default()
        };
        for (project, handle) in handles {
            let failure = match handle.await {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => TaskFailure {
                    project,
                    setup: err.is_setup_failure(),
                    error: err.to_string(),
                },
                Err(join) => TaskFailure {
                    project,
                    setup: false,
                    error: format!("task join failure: {join}"),
                },
            };
            summary.failures.push(failure);
        }
        Ok(summary)
    }

    /// [`Dispatcher::run`], cut short when `shutdown` resolves. An interrupted
    /// summary carries the launch count but no failures.
    pub async fn run_until<F>(
        &self,
        registry: &mut Registry,
        shutdown: F,
    ) -> Result<RunSummary, DispatchError>
    where
        F: Future<Output = ()>,
    {
        registry.check()?;
        let launched = registry.len();
        tokio::select! {
            result = self.run(registry) => result,
            _ = shutdown => {
                tracing::info!(active = self.counter.active(), "shutdown requested, stopping watchers");
                Ok(RunSummary {
                    launched,
                    interrupted: true,
                    ..RunSummary::default()
                })
            }
        }
    }
}

/// Start a multi-thread runtime and dispatch until every task returns or
/// Ctrl-C is received.
pub fn start_blocking(
    config: DispatchConfig,
    registry: &mut Registry,
) -> Result<RunSummary, DispatchError> {
    init_tracing();
    registry.check()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;

    let dispatcher = Dispatcher::new(config);
    runtime.block_on(async {
        let ctrl_c = async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %err, "ctrl-c handler failed");
                std::future::pending::<()>().await;
            }
        };
        dispatcher.run_until(registry, ctrl_c).await
    })
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
