//! `watchdeck clean`

use anyhow::Result;
use colored::Colorize;

pub fn run() -> Result<()> {
    let home = super::home()?;
    let mut config = super::load(&home)?;

    let dropped = config.projects.clean();
    super::save(&home, &config)?;

    if dropped == 0 {
        println!("No duplicate projects.");
    } else {
        println!(
            "{} Dropped {} duplicate project(s); {} remaining",
            "✓".green(),
            dropped,
            config.projects.len()
        );
    }
    Ok(())
}
