//! `watchdeck add`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use watchdeck_core::AddRequest;

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Project name. Defaults to the last component of the path.
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// Project directory, relative to the current directory.
    #[arg(long, short = 'p', default_value = ".")]
    pub path: PathBuf,

    /// Skip `gofmt`.
    #[arg(long)]
    pub no_fmt: bool,

    /// Run `go generate`.
    #[arg(long)]
    pub generate: bool,

    /// Run `go test`.
    #[arg(long)]
    pub test: bool,

    /// Run `go build`.
    #[arg(long)]
    pub build: bool,

    /// Skip `go install`.
    #[arg(long)]
    pub no_bin: bool,

    /// Do not start the program after a successful build.
    #[arg(long)]
    pub no_run: bool,

    /// Report changes without running anything.
    #[arg(long)]
    pub preview: bool,

    /// Arguments passed to the program by the run stage.
    #[arg(long, num_args = 1.., allow_hyphen_values = true)]
    pub params: Vec<String>,
}

impl AddArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let cwd = std::env::current_dir().context("could not determine current directory")?;
        let mut config = super::load(&home)?;

        let project = self
            .into_request()
            .into_project(&cwd)
            .context("invalid project")?;
        let name = config
            .projects
            .add(project)
            .context("failed to add project")?
            .name
            .clone();

        super::save(&home, &config)?;
        println!("{} Added '{}'", "✓".green(), name);
        Ok(())
    }

    fn into_request(self) -> AddRequest {
        AddRequest {
            name: self.name,
            path: self.path,
            fmt: !self.no_fmt,
            generate: self.generate,
            test: self.test,
            build: self.build,
            bin: !self.no_bin,
            run: !self.no_run,
            preview: self.preview,
            params: self.params,
        }
    }
}
