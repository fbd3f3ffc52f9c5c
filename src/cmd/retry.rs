//! Retry counter inspection and reset — `specflow retry`.

use anyhow::Result;
use std::path::Path;

use specflow::retry::{FileRetryStore, RetryStore};

use super::super::{Cli, RetryCommands};
use super::load_config;

pub fn cmd_retry(cli: &Cli, project_dir: &Path, command: RetryCommands) -> Result<()> {
    let config = load_config(cli, project_dir.to_path_buf())?;
    let store = FileRetryStore::new(&config.state_dir());

    match command {
        RetryCommands::Show => {
            let entries = store.entries()?;
            println!();
            if entries.is_empty() {
                println!("No retry counters recorded.");
                println!();
                return Ok(());
            }

            println!("Retry counters ({}):", store.path().display());
            println!();
            println!("{:<40} {:<8} Updated", "Key", "Count");
            println!(
                "{:<40} {:<8} -------",
                "----------------------------------------", "--------"
            );
            for (key, entry) in entries {
                println!(
                    "{:<40} {:<8} {}",
                    key,
                    format!("{}/{}", entry.count, config.max_retries()),
                    entry.updated_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
            println!();
        }
        RetryCommands::Reset { stage } => {
            let spec = specflow::spec::resolve_spec(
                cli.spec.as_deref(),
                &config.project_dir,
                &config.specs_dir(),
            )?
            .unwrap_or_default();

            match stage {
                Some(stage) => {
                    store.reset(&spec, stage)?;
                    // Project-scoped stages may also be recorded without a spec.
                    if stage.is_project_scoped() {
                        store.reset("", stage)?;
                    }
                    println!("Reset retry counter for {} ({}).", stage, display_spec(&spec));
                }
                None => {
                    let removed = store.reset_spec(&spec)?;
                    println!(
                        "Reset {} retry counter(s) for {}.",
                        removed,
                        display_spec(&spec)
                    );
                }
            }
        }
    }

    Ok(())
}

fn display_spec(spec: &str) -> &str {
    if spec.is_empty() { "project" } else { spec }
}
