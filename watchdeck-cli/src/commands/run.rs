//! `watchdeck run` — watch every registered project in the foreground.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use watchdeck_dispatch::{start_blocking, DispatchConfig};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Poll the file system instead of using OS notifications.
    #[arg(long)]
    pub legacy: bool,

    /// Polling interval in milliseconds. Implies `--legacy`.
    #[arg(long, value_name = "MS")]
    pub interval: Option<u64>,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let mut config = super::load(&home)?;

        if self.legacy || self.interval.is_some() {
            config.settings.legacy.status = true;
        }
        if let Some(interval) = self.interval {
            config.settings.legacy.interval_ms = interval;
        }

        config.projects.check().context("nothing to run")?;
        // Persist the deduplicated registry, not the one-off flag overrides.
        let mut persisted = super::load(&home)?;
        persisted.projects = config.projects.clone();
        super::save(&home, &persisted)?;

        let dispatch = DispatchConfig::from_settings(&config.settings);
        let summary =
            start_blocking(dispatch, &mut config.projects).context("dispatcher exited with error")?;

        if summary.interrupted {
            println!("Stopped.");
            return Ok(());
        }
        for failure in &summary.failures {
            eprintln!("{} {}: {}", "✗".red(), failure.project, failure.error);
        }
        if !summary.failures.is_empty() {
            bail!(
                "{} of {} project(s) stopped with an error",
                summary.failures.len(),
                summary.launched
            );
        }
        Ok(())
    }
}
