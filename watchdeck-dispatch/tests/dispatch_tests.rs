use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Semaphore;

use watchdeck_core::{Project, Registry, RegistryError};
use watchdeck_dispatch::{
    BoundProject, CompletionCounter, DispatchConfig, DispatchError, Dispatcher, Invocation,
    PipelineError, PollingStrategy, RunningProcess, StepOutput, StrategyKind, TaskRunner,
    WatchError, WatchStrategy,
};

/// Records every bound project and holds each task until a permit is released.
struct GatedStrategy {
    seen: Mutex<Vec<(String, PathBuf, usize)>>,
    gate: Semaphore,
    fail: Option<&'static str>,
}

impl GatedStrategy {
    fn new(fail: Option<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
            gate: Semaphore::new(0),
            fail,
        })
    }

    fn seen(&self) -> Vec<(String, PathBuf, usize)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl WatchStrategy for GatedStrategy {
    fn name(&self) -> &'static str {
        "gated"
    }

    async fn watch(&self, project: BoundProject) -> Result<(), WatchError> {
        self.seen.lock().unwrap().push((
            project.name().to_string(),
            project.resolved_path().to_path_buf(),
            project.registry().len(),
        ));
        if self.fail == Some(project.name().as_str()) {
            return Err(WatchError::SetupFailure {
                path: project.resolved_path().to_path_buf(),
                reason: "boom".into(),
            });
        }
        let _permit = self.gate.acquire().await.expect("gate open");
        Ok(())
    }
}

fn registry_of(names: &[&str]) -> Registry {
    Registry::from_projects(
        names
            .iter()
            .map(|name| Project::new(*name, format!("/nowhere/{name}")))
            .collect(),
    )
}

#[tokio::test]
async fn empty_registry_spawns_nothing() {
    let strategy = GatedStrategy::new(None);
    let dispatcher = Dispatcher::with_strategy(strategy.clone(), CompletionCounter::new());
    let mut registry = Registry::new();

    let err = dispatcher.run(&mut registry).await.unwrap_err();
    assert!(matches!(
        err,
        DispatchError::Registry(RegistryError::EmptyRegistry)
    ));
    assert!(strategy.seen().is_empty());
    assert_eq!(dispatcher.counter().active(), 0);
}

#[tokio::test]
async fn run_blocks_until_every_task_returns() {
    let strategy = GatedStrategy::new(None);
    let counter = CompletionCounter::new();
    let dispatcher = Arc::new(Dispatcher::with_strategy(strategy.clone(), counter.clone()));

    let run = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            let mut registry = registry_of(&["api", "web", "worker"]);
            dispatcher.run(&mut registry).await
        })
    };

    tokio::time::timeout(Duration::from_secs(5), async {
        while strategy.seen().len() < 3 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("all three tasks should start");

    assert_eq!(counter.active(), 3);
    assert!(!run.is_finished());

    let mut seen = strategy.seen();
    seen.sort();
    let names: Vec<&str> = seen.iter().map(|(name, _, _)| name.as_str()).collect();
    assert_eq!(names, ["api", "web", "worker"]);
    assert!(seen.iter().all(|(name, path, len)| {
        *len == 3 && path == &PathBuf::from(format!("/nowhere/{name}"))
    }));

    strategy.gate.add_permits(3);
    let summary = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("run should return once tasks finish")
        .expect("join")
        .expect("run");
    assert_eq!(summary.launched, 3);
    assert!(summary.failures.is_empty());
    assert_eq!(counter.active(), 0);
}

#[tokio::test]
async fn one_failing_task_does_not_stop_the_others() {
    let strategy = GatedStrategy::new(Some("web"));
    strategy.gate.add_permits(2);
    let dispatcher = Dispatcher::with_strategy(strategy.clone(), CompletionCounter::new());
    let mut registry = registry_of(&["api", "web", "worker"]);

    let summary = dispatcher.run(&mut registry).await.expect("run");
    assert_eq!(summary.launched, 3);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].project.as_str(), "web");
    assert!(summary.failures[0].setup);
    assert_eq!(strategy.seen().len(), 3);
}

#[tokio::test]
async fn duplicates_are_cleaned_before_dispatch() {
    let strategy = GatedStrategy::new(None);
    strategy.gate.add_permits(2);
    let dispatcher = Dispatcher::with_strategy(strategy.clone(), CompletionCounter::new());
    let mut registry = Registry::from_projects(vec![
        Project::new("api", "/old/api"),
        Project::new("web", "/svc/web"),
        Project::new("api", "/new/api"),
    ]);

    let summary = dispatcher.run(&mut registry).await.expect("run");
    assert_eq!(summary.launched, 2);
    assert_eq!(registry.len(), 2);

    let api = strategy
        .seen()
        .into_iter()
        .find(|(name, _, _)| name == "api")
        .expect("api dispatched");
    assert_eq!(api.1, PathBuf::from("/new/api"));
}

/// Records invocations instead of running them.
#[derive(Default)]
struct RecordingRunner {
    calls: Mutex<Vec<String>>,
}

impl RecordingRunner {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

struct IdleProcess;

#[async_trait]
impl RunningProcess for IdleProcess {
    async fn stop(&mut self) -> Result<(), PipelineError> {
        Ok(())
    }
}

#[async_trait]
impl TaskRunner for RecordingRunner {
    async fn execute(&self, invocation: &Invocation) -> Result<StepOutput, PipelineError> {
        self.calls.lock().unwrap().push(invocation.to_string());
        Ok(StepOutput {
            success: true,
            code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    async fn spawn(
        &self,
        invocation: &Invocation,
        _sinks: Arc<watchdeck_dispatch::streams::StreamSinks>,
    ) -> Result<Box<dyn RunningProcess>, PipelineError> {
        self.calls.lock().unwrap().push(invocation.to_string());
        Ok(Box::new(IdleProcess))
    }
}

#[tokio::test]
async fn missing_project_path_is_a_setup_failure() {
    let runner = Arc::new(RecordingRunner::default());
    let dispatcher = Dispatcher::with_runner(
        DispatchConfig {
            strategy: StrategyKind::Notify,
        },
        runner.clone(),
    );
    let mut registry = registry_of(&["api", "web"]);

    let summary = tokio::time::timeout(Duration::from_secs(5), dispatcher.run(&mut registry))
        .await
        .expect("setup failures end the run")
        .expect("run");
    assert_eq!(summary.launched, 2);
    assert_eq!(summary.failures.len(), 2);
    assert!(summary.failures.iter().all(|f| f.setup));
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn polling_runs_initial_cycle_then_reacts_to_new_file() {
    let dir = TempDir::new().unwrap();
    let mut project = Project::new("api", dir.path());
    project.streams.cli_out = false;
    let registry = Arc::new(Registry::from_projects(vec![project]));
    let bound = BoundProject::bind(registry, 0);

    let runner = Arc::new(RecordingRunner::default());
    let strategy = PollingStrategy::new(Duration::from_millis(50), runner.clone());
    assert_eq!(strategy.interval(), Duration::from_millis(50));
    let task = tokio::spawn(async move { strategy.watch(bound).await });

    let initial = ["gofmt -s -w .", "go install", "go run ."];
    tokio::time::timeout(Duration::from_secs(5), async {
        while runner.calls().len() < initial.len() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("initial cycle should run");
    assert_eq!(runner.calls(), initial);

    std::fs::write(dir.path().join("main.go"), "package main\n").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored\n").unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while runner.calls().len() < initial.len() * 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("a new .go file should trigger a cycle");

    task.abort();
    let _ = task.await;
    assert_eq!(&runner.calls()[initial.len()..], initial);
}
