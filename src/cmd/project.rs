//! Project setup and progress display — `specflow init`, `specflow status`.

use anyhow::Result;
use console::style;
use std::path::Path;

use super::super::Cli;
use super::load_config;

pub fn cmd_init(project_dir: &Path) -> Result<()> {
    use specflow::init::init_project;

    let result = init_project(project_dir)?;

    println!();
    if result.created {
        println!(
            "Initialized specflow project at {}",
            result.specflow_dir.display()
        );
    } else {
        println!(
            "Specflow project already initialized at {}",
            result.specflow_dir.display()
        );
        println!("Ensured directory structure is complete.");
    }
    println!("Specs directory: {}", result.specs_dir.display());
    println!();
    println!("Next steps:");
    println!("  1. Review .specflow/config.toml (agent command, retry budget)");
    println!("  2. Run 'specflow specify \"<feature description>\"' to create a spec");
    println!();
    Ok(())
}

pub fn cmd_status(cli: &Cli, project_dir: &Path) -> Result<()> {
    use specflow::artifact::{PLAN_FILE, SPEC_FILE, TASKS_FILE, TasksFile};
    use specflow::dag::first_incomplete_phase;
    use specflow::init::is_initialized;
    use specflow::retry::FileRetryStore;
    use specflow::spec::resolve_spec;

    println!();
    println!("Specflow Project Status");
    println!("=======================");
    println!();

    if !is_initialized(project_dir) {
        println!("Project: Not initialized");
        println!();
        println!("Run 'specflow init' to initialize the project.");
        println!();
        return Ok(());
    }
    println!("Project: Initialized");

    let config = load_config(cli, project_dir.to_path_buf())?;
    let specs_dir = config.specs_dir();
    let Some(spec) = resolve_spec(cli.spec.as_deref(), &config.project_dir, &specs_dir)? else {
        println!("Spec:    None");
        println!();
        println!("Run 'specflow specify \"<feature description>\"' to create one.");
        println!();
        return Ok(());
    };
    println!("Spec:    {}", style(&spec).bold());

    let spec_dir = specs_dir.join(&spec);
    for file in [SPEC_FILE, PLAN_FILE, TASKS_FILE] {
        let marker = if spec_dir.join(file).is_file() {
            style("✓").green()
        } else {
            style("✗").red()
        };
        println!("         {} {}", marker, file);
    }
    println!();

    let tasks_path = spec_dir.join(TASKS_FILE);
    if tasks_path.is_file() {
        let tasks_file = TasksFile::load(&tasks_path)?;
        let stats = tasks_file.stats();

        println!(
            "Tasks: {}/{} completed ({:.0}%)",
            stats.completed,
            stats.total,
            stats.completion_percentage()
        );
        println!(
            "       {} in progress, {} pending, {} blocked",
            stats.in_progress, stats.pending, stats.blocked
        );
        println!(
            "Phases: {}/{} completed",
            stats.completed_phases, stats.total_phases
        );
        println!();

        let phases = tasks_file.phase_info();
        if !phases.is_empty() {
            println!("{:<8} {:<30} {:<10} Blocked", "Phase", "Title", "Done");
            println!(
                "{:<8} {:<30} {:<10} -------",
                "--------", "------------------------------", "----------"
            );
            for phase in &phases {
                println!(
                    "{:<8} {:<30} {:<10} {}",
                    phase.number,
                    phase.title,
                    format!("{}/{}", phase.completed_tasks, phase.total_tasks),
                    phase.blocked_tasks
                );
            }
            println!();
        }

        match first_incomplete_phase(&tasks_file.tasks()) {
            0 if stats.is_complete() => println!("All tasks completed."),
            0 => println!("No runnable phases left; remaining tasks are blocked."),
            next => println!(
                "Next: {}   (or --phases to continue through all)",
                specflow::command::resume_phase(&spec, next)
            ),
        }
        println!();
    } else {
        println!("No tasks yet. Run 'specflow tasks' once plan.yaml exists.");
        println!();
    }

    let store = FileRetryStore::new(&config.state_dir());
    let prefix = format!("{}:", spec);
    let retries: Vec<_> = store
        .entries()?
        .into_iter()
        .filter(|(key, _)| key.starts_with(&prefix))
        .collect();
    if !retries.is_empty() {
        println!("Retry counters:");
        for (key, entry) in retries {
            println!(
                "  {}: {}/{} (updated {})",
                key,
                entry.count,
                config.max_retries(),
                entry.updated_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
        println!();
    }
    Ok(())
}
