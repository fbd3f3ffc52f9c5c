//! Single-stage commands — `specflow specify`, `plan`, `tasks`, and the
//! auxiliary stages.

use anyhow::Result;
use console::style;
use std::path::PathBuf;

use specflow::stage::{Stage, StageResult};

use super::super::Cli;
use super::Engine;

pub async fn cmd_specify(cli: &Cli, project_dir: PathBuf, description: &str) -> Result<()> {
    let engine = Engine::new(cli, project_dir)?;
    let (result, spec) = engine.orchestrator().specify(description).await?;

    print_stage_result(&result);
    println!("Spec: {}", style(&spec).bold());
    println!();
    println!("Next: specflow plan --spec {}", spec);
    Ok(())
}

pub async fn cmd_stage(
    cli: &Cli,
    project_dir: PathBuf,
    stage: Stage,
    prompt: Option<&str>,
) -> Result<()> {
    let engine = Engine::new(cli, project_dir)?;
    let spec = if stage.is_project_scoped() {
        engine.resolve_spec(cli.spec.as_deref())?.unwrap_or_default()
    } else {
        engine.require_spec(cli.spec.as_deref())?
    };

    let result = engine.orchestrator().run_stage(&spec, stage, prompt).await?;
    print_stage_result(&result);
    Ok(())
}

pub fn print_stage_result(result: &StageResult) {
    println!(
        "{} {} completed",
        style("✓").green().bold(),
        style(result.stage).bold()
    );
}
