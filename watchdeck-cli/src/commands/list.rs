//! `watchdeck list` — grouped project settings as tables or JSON.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use watchdeck_core::{FieldValue, ProjectListing};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "group")]
    group: &'static str,
    #[tabled(rename = "field")]
    field: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

impl ListArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let mut config = super::load(&home)?;
        let listings = config.projects.list().context("nothing to list")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&listings).context("failed to render listing JSON")?
            );
            return Ok(());
        }

        print_tables(&listings);
        Ok(())
    }
}

fn print_tables(listings: &[ProjectListing]) {
    let separator = "─".repeat(60).bright_black().to_string();
    for listing in listings {
        println!("{separator}");
        println!("{}", listing.name.as_str().to_uppercase().bold());

        let rows: Vec<FieldRow> = listing
            .groups
            .iter()
            .flat_map(|group| {
                group.fields.iter().map(move |field| FieldRow {
                    group: group.group.label(),
                    field: field.label,
                    value: render_value(&field.value),
                })
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }
    println!("{separator}");
}

fn render_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Flag(true) => "true".green().to_string(),
        FieldValue::Flag(false) => "false".red().to_string(),
        other => other.to_string(),
    }
}
