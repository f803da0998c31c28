//! Ordered build/run pipeline for one project.
//!
//! A cycle runs `before` scripts, the enabled stages in fixed order
//! (fmt, generate, test, build, install, run), then `after` scripts.
//! The first failing step ends the cycle. The run stage is long-lived and is
//! stopped before the next cycle starts.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use watchdeck_core::{Command, HookPoint, Project};

use crate::dispatcher::BoundProject;
use crate::error::PipelineError;
use crate::runner::{Invocation, RunningProcess, TaskRunner};
use crate::streams::StreamSinks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Fmt,
    Generate,
    Test,
    Build,
    Install,
    Run,
}

impl Stage {
    pub const ORDER: [Stage; 6] = [
        Stage::Fmt,
        Stage::Generate,
        Stage::Test,
        Stage::Build,
        Stage::Install,
        Stage::Run,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Stage::Fmt => "Fmt",
            Stage::Generate => "Generate",
            Stage::Test => "Test",
            Stage::Build => "Build",
            Stage::Install => "Install",
            Stage::Run => "Run",
        }
    }

    pub fn enabled_for(self, project: &Project) -> bool {
        match self {
            Stage::Fmt => project.fmt,
            Stage::Generate => project.generate,
            Stage::Test => project.test,
            Stage::Build => project.build,
            Stage::Install => project.bin,
            Stage::Run => project.run,
        }
    }

    /// Go toolchain command for this stage, run from the project root.
    pub fn invocation(self, project: &Project, root: &Path) -> Invocation {
        match self {
            Stage::Fmt => Invocation::new("gofmt", ["-s", "-w", "."], root),
            Stage::Generate => Invocation::new("go", ["generate", "./..."], root),
            Stage::Test => Invocation::new("go", ["test", "./..."], root),
            Stage::Build => Invocation::new("go", ["build"], root),
            Stage::Install => Invocation::new("go", ["install"], root),
            Stage::Run => {
                let args = ["run".to_string(), ".".to_string()]
                    .into_iter()
                    .chain(project.params.iter().cloned());
                Invocation::new("go", args, root)
            }
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Script(Command),
    Stage(Stage),
}

impl Step {
    pub fn label(&self) -> String {
        match self {
            Step::Script(cmd) => format!("script '{}'", cmd.command),
            Step::Stage(stage) => stage.label().to_string(),
        }
    }

    pub fn invocation(&self, project: &Project, root: &Path) -> Invocation {
        match self {
            Step::Stage(stage) => stage.invocation(project, root),
            Step::Script(cmd) => {
                let dir = cmd
                    .path
                    .as_ref()
                    .map(|p| root.join(p))
                    .unwrap_or_else(|| root.to_path_buf());
                Invocation::shell(&cmd.command, &dir)
            }
        }
    }
}

/// The steps of one cycle, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    steps: Vec<Step>,
}

impl Plan {
    /// Scripts without a hook point run with the `after` group; scripts with
    /// an empty command are dropped.
    pub fn for_project(project: &Project) -> Self {
        let scripts = |point: HookPoint| {
            project
                .watcher
                .scripts
                .iter()
                .filter(|s| !s.command.trim().is_empty())
                .filter(move |s| s.hook.unwrap_or(HookPoint::After) == point)
                .cloned()
                .map(Step::Script)
        };

        let steps = scripts(HookPoint::Before)
            .chain(
                Stage::ORDER
                    .into_iter()
                    .filter(|stage| stage.enabled_for(project))
                    .map(Step::Stage),
            )
            .chain(scripts(HookPoint::After))
            .collect();
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.steps
            .iter()
            .filter_map(|step| match step {
                Step::Stage(stage) => Some(*stage),
                Step::Script(_) => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Preview mode: the change was reported, nothing ran.
    Previewed,
    /// Every step succeeded; `steps` is how many ran.
    Completed { steps: usize },
}

/// Executes [`Plan`] cycles for one bound project and owns its run process.
pub struct Pipeline {
    bound: BoundProject,
    runner: Arc<dyn TaskRunner>,
    sinks: Arc<StreamSinks>,
    plan: Plan,
    running: Option<Box<dyn RunningProcess>>,
}

impl Pipeline {
    pub fn new(bound: &BoundProject, runner: Arc<dyn TaskRunner>) -> Self {
        let project = bound.project();
        Self {
            sinks: Arc::new(StreamSinks::new(
                project.name.clone(),
                project.streams,
                bound.resolved_path(),
            )),
            plan: Plan::for_project(project),
            bound: bound.clone(),
            runner,
            running: None,
        }
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn sinks(&self) -> &StreamSinks {
        &self.sinks
    }

    /// Run one cycle. `trigger` is the changed file, or `None` for the
    /// initial cycle at startup.
    pub async fn cycle(&mut self, trigger: Option<&Path>) -> Result<CycleOutcome, PipelineError> {
        let bound = self.bound.clone();
        let project = bound.project();
        match trigger {
            Some(path) => self.sinks.log(&format!("changed: {}", path.display())),
            None => self.sinks.log("watching started"),
        }

        if project.watcher.preview {
            if let Some(path) = trigger {
                tracing::info!(project = %project.name, path = %path.display(), "change detected (preview)");
            }
            return Ok(CycleOutcome::Previewed);
        }

        self.stop_running().await;

        let root = bound.resolved_path();
        for step in self.plan.steps() {
            let invocation = step.invocation(project, root);
            let label = step.label();
            self.sinks.log(&format!("{label}: {invocation}"));
            tracing::debug!(project = %project.name, step = %label, command = %invocation, "running step");

            if matches!(step, Step::Stage(Stage::Run)) {
                let process = self
                    .runner
                    .spawn(&invocation, self.sinks.clone())
                    .await
                    .inspect_err(|err| self.sinks.err(&format!("{label}: {err}")))?;
                self.running = Some(process);
                continue;
            }

            let output = self
                .runner
                .execute(&invocation)
                .await
                .inspect_err(|err| self.sinks.err(&format!("{label}: {err}")))?;
            for line in output.stdout.lines() {
                self.sinks.out(line);
            }
            for line in output.stderr.lines() {
                self.sinks.err(line);
            }
            if !output.success {
                let err = PipelineError::StepFailed {
                    step: label,
                    status: output.status_label(),
                };
                self.sinks.err(&err.to_string());
                return Err(err);
            }
        }

        tracing::info!(project = %project.name, steps = self.plan.steps().len(), "pipeline completed");
        Ok(CycleOutcome::Completed {
            steps: self.plan.steps().len(),
        })
    }

    /// Stop the run-stage process, if any, and flush pending stream lines.
    pub async fn shutdown(&mut self) {
        self.stop_running().await;
        self.sinks.flush().await;
    }

    async fn stop_running(&mut self) {
        if let Some(mut process) = self.running.take() {
            if let Err(err) = process.stop().await {
                tracing::warn!(project = %self.bound.name(), error = %err, "failed to stop running process");
            }
        }
    }
}
