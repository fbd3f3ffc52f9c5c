//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module          | Commands handled                                          |
//! |-----------------|------------------------------------------------------------|
//! | `stage`         | `Specify`, `Plan`, `Tasks`, `Constitution`, `Clarify`,     |
//! |                 | `Checklist`, `Analyze`                                     |
//! | `implement`     | `Implement`                                                |
//! | `run`           | `Run`, `All`, `Prep`                                       |
//! | `project`       | `Init`, `Status`                                           |
//! | `retry`         | `Retry`                                                    |
//! | `config`        | `Config`                                                   |

pub mod config;
pub mod implement;
pub mod project;
pub mod retry;
pub mod run;
pub mod stage;

pub use config::cmd_config;
pub use implement::cmd_implement;
pub use project::{cmd_init, cmd_status};
pub use retry::cmd_retry;
pub use run::{ALL_STAGES, PREP_STAGES, cmd_run};
pub use stage::{cmd_specify, cmd_stage};

use anyhow::{Context, Result};
use console::style;
use std::path::PathBuf;
use tracing::warn;

use specflow::agent::ProcessAgent;
use specflow::config::SpecflowConfig;
use specflow::errors::WorkflowError;
use specflow::orchestrator::{StageRunner, WorkflowOrchestrator};
use specflow::retry::FileRetryStore;

use super::Cli;

/// Everything a workflow command needs, built once from configuration.
pub struct Engine {
    pub config: SpecflowConfig,
    agent: ProcessAgent,
    store: FileRetryStore,
}

impl Engine {
    pub fn new(cli: &Cli, project_dir: PathBuf) -> Result<Self> {
        let config = load_config(cli, project_dir)?;
        for warning in config.validate() {
            warn!(%warning, "configuration warning");
        }

        let agent = ProcessAgent::new(
            config.agent_command(),
            config.agent_args().to_vec(),
            config.project_dir.clone(),
        );
        let store = FileRetryStore::new(&config.state_dir());

        Ok(Self {
            config,
            agent,
            store,
        })
    }

    pub fn orchestrator(&self) -> WorkflowOrchestrator<'_> {
        let runner = StageRunner::new(
            &self.agent,
            &self.store,
            self.config.max_retries(),
            self.config.exec_options(),
            self.config.specs_dir(),
        );
        WorkflowOrchestrator::new(runner, self.config.constitution_path()).with_progress(true)
    }

    /// The spec to operate on, if one can be determined.
    pub fn resolve_spec(&self, explicit: Option<&str>) -> Result<Option<String>> {
        specflow::spec::resolve_spec(explicit, &self.config.project_dir, &self.config.specs_dir())
    }

    /// Like `resolve_spec`, but failing when nothing can be found.
    pub fn require_spec(&self, explicit: Option<&str>) -> Result<String> {
        self.resolve_spec(explicit)?.with_context(|| {
            format!(
                "No spec found in {}. Run `specflow specify` first or pass --spec.",
                self.config.specs_dir().display()
            )
        })
    }
}

pub fn load_config(cli: &Cli, project_dir: PathBuf) -> Result<SpecflowConfig> {
    SpecflowConfig::with_cli_args(project_dir, cli.verbose, cli.max_retries, cli.timeout)
}

/// Print a failed command's error chain, and the resume command when there is one.
pub fn report_error(err: &anyhow::Error) {
    let resume = err
        .downcast_ref::<WorkflowError>()
        .and_then(WorkflowError::resume_command);

    let message = format!("{:#}", err);
    let message = match resume {
        // The resume line is part of the error text; print it separately.
        Some(_) => message
            .split_once("\nTo resume, run:")
            .map_or(message.as_str(), |(head, _)| head)
            .to_string(),
        None => message,
    };

    eprintln!("{} {}", style("Error:").red().bold(), message);
    if let Some(command) = resume {
        eprintln!();
        eprintln!("To resume, run: {}", style(command).yellow().bold());
    }
}
