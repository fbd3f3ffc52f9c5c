//! Implementation in one of the execution modes — `specflow implement`.

use anyhow::Result;
use console::style;
use std::path::PathBuf;

use specflow::command::resume_phase;
use specflow::orchestrator::{ImplementMode, ImplementSummary, ModeFlags};

use super::super::Cli;
use super::Engine;

pub async fn cmd_implement(
    cli: &Cli,
    project_dir: PathBuf,
    flags: &ModeFlags,
    prompt: Option<&str>,
) -> Result<()> {
    let engine = Engine::new(cli, project_dir)?;
    let spec = engine.require_spec(cli.spec.as_deref())?;
    let mode = ImplementMode::select(flags);

    println!();
    println!("Implementing {} ({})", style(&spec).bold(), mode);
    println!();

    let summary = engine.orchestrator().implement(&spec, &mode, prompt).await?;
    print_implement_summary(&spec, &summary);
    Ok(())
}

pub fn print_implement_summary(spec: &str, summary: &ImplementSummary) {
    println!();
    if summary.nothing_to_do {
        println!("{} Nothing to do: all tasks are already settled.", style("✓").green().bold());
        println!();
        return;
    }

    if !summary.executed.is_empty() {
        println!(
            "{} Implemented: {}",
            style("✓").green().bold(),
            summary.executed.join(", ")
        );
    }
    if !summary.skipped.is_empty() {
        println!(
            "{} Skipped: {}",
            style("-").dim(),
            style(summary.skipped.join(", ")).dim()
        );
    }
    for phase in &summary.incomplete_phases {
        println!(
            "{} Phase {} still has unfinished tasks. Re-run with: {}",
            style("!").yellow().bold(),
            phase,
            resume_phase(spec, *phase)
        );
    }
    println!();
}
