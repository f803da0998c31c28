//! `watchdeck remove --name <name>`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Name of the project to remove.
    #[arg(long, short = 'n')]
    pub name: String,
}

impl RemoveArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let mut config = super::load(&home)?;

        let removed = config
            .projects
            .remove(&self.name)
            .context("failed to remove project")?;

        super::save(&home, &config)?;
        println!("{} Removed '{}'", "✓".green(), removed.name);
        Ok(())
    }
}
