//! Multi-stage workflows — `specflow run`, `specflow all`, `specflow prep`.

use anyhow::{Result, bail};
use console::style;
use std::path::PathBuf;

use specflow::orchestrator::{ImplementMode, ModeFlags};
use specflow::stage::Stage;

use super::super::Cli;
use super::Engine;
use super::implement::print_implement_summary;
use super::stage::print_stage_result;

pub const ALL_STAGES: [Stage; 4] = [Stage::Specify, Stage::Plan, Stage::Tasks, Stage::Implement];

pub const PREP_STAGES: [Stage; 3] = [Stage::Specify, Stage::Plan, Stage::Tasks];

pub async fn cmd_run(
    cli: &Cli,
    project_dir: PathBuf,
    stages: &[Stage],
    description: Option<&str>,
) -> Result<()> {
    if stages.is_empty() {
        bail!(
            "No stages selected. Pass stage flags such as -s -p -t -i, or -a for the full workflow."
        );
    }

    let engine = Engine::new(cli, project_dir)?;
    // Specify picks its own spec; otherwise the workflow needs one up front.
    let spec = if stages.contains(&Stage::Specify) {
        None
    } else {
        engine.resolve_spec(cli.spec.as_deref())?
    };

    let mode = ImplementMode::select(&ModeFlags::default());
    let summary = engine
        .orchestrator()
        .run_stages(spec.as_deref(), stages, description, &mode)
        .await?;

    println!();
    for result in &summary.stages {
        print_stage_result(result);
    }
    if let (Some(spec), Some(implement)) = (&summary.spec, &summary.implement) {
        print_implement_summary(spec, implement);
    }
    if let Some(ref spec) = summary.spec {
        println!("Spec: {}", style(spec).bold());
    }
    Ok(())
}
