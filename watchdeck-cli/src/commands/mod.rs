pub mod add;
pub mod clean;
pub mod list;
pub mod remove;
pub mod run;

use std::path::PathBuf;

use anyhow::{Context, Result};

use watchdeck_core::{store, ConfigFile};

pub(crate) fn home() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

pub(crate) fn load(home: &std::path::Path) -> Result<ConfigFile> {
    store::load_at(home).with_context(|| {
        format!(
            "failed to load {}",
            store::config_path_at(home).display()
        )
    })
}

pub(crate) fn save(home: &std::path::Path, config: &ConfigFile) -> Result<()> {
    store::save_at(home, config).with_context(|| {
        format!(
            "failed to write {}",
            store::config_path_at(home).display()
        )
    })
}
