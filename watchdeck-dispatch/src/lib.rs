//! Watch dispatcher: one watch task per registered project, each running the
//! project's pipeline whenever a relevant file changes.

pub mod counter;
mod dispatcher;
mod error;
pub mod filter;
pub mod log_rotation;
pub mod paths;
pub mod pipeline;
pub mod runner;
pub mod strategy;
pub mod streams;

pub use counter::{CompletionCounter, CompletionGuard};
pub use dispatcher::{
    select_strategy, start_blocking, BoundProject, DispatchConfig, Dispatcher, RunSummary,
    StrategyKind, TaskFailure,
};
pub use error::{DispatchError, PipelineError, WatchError};
pub use pipeline::{CycleOutcome, Pipeline, Plan, Stage, Step};
pub use runner::{Invocation, ProcessRunner, RunningProcess, StepOutput, TaskRunner};
pub use strategy::{NotifyStrategy, PollingStrategy, WatchStrategy};
