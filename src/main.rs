use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "specflow")]
#[command(
    version,
    about = "Agent-driven development workflow: specify, plan, tasks, implement"
)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Spec to operate on. Defaults to the spec named like the current git
    /// branch, then the most recently modified spec directory.
    #[arg(long, global = true)]
    pub spec: Option<String>,

    /// Retry budget per stage, phase or task. Overrides config.toml.
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    /// Agent timeout in seconds (0 disables). Overrides config.toml.
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new specflow project
    Init,
    /// Create a new spec from a feature description
    Specify { description: String },
    /// Produce plan.yaml for the current spec
    Plan { prompt: Option<String> },
    /// Produce tasks.yaml for the current spec
    Tasks { prompt: Option<String> },
    /// Implement the current spec's tasks
    Implement {
        /// Continue the previous single-session implementation
        #[arg(long)]
        resume: bool,
        /// One agent session per phase, starting at the first unfinished phase
        #[arg(long)]
        phases: bool,
        /// Implement exactly one phase
        #[arg(long, value_name = "N")]
        phase: Option<u32>,
        /// One agent session per phase, starting at phase N
        #[arg(long, value_name = "N")]
        from_phase: Option<u32>,
        /// One agent session per task, in dependency order
        #[arg(long)]
        tasks: bool,
        /// Per-task sessions starting at the given task
        #[arg(long, value_name = "ID")]
        from_task: Option<String>,
        prompt: Option<String>,
    },
    /// Write or update the project constitution
    Constitution { prompt: Option<String> },
    /// Resolve open questions in the current spec
    Clarify { prompt: Option<String> },
    /// Generate requirement checklists for the current spec
    Checklist { prompt: Option<String> },
    /// Cross-check spec, plan and tasks for consistency
    Analyze { prompt: Option<String> },
    /// Run a selection of stages in canonical order
    Run {
        #[arg(short = 's', long)]
        specify: bool,
        #[arg(short = 'p', long)]
        plan: bool,
        #[arg(short = 't', long)]
        tasks: bool,
        #[arg(short = 'i', long)]
        implement: bool,
        #[arg(long)]
        constitution: bool,
        #[arg(long)]
        clarify: bool,
        #[arg(long)]
        checklist: bool,
        #[arg(long)]
        analyze: bool,
        /// Specify, plan, tasks and implement
        #[arg(short = 'a', long)]
        all: bool,
        /// Feature description, required when specify is selected
        description: Option<String>,
    },
    /// Specify, plan, tasks and implement in one go
    All { description: String },
    /// Specify, plan and tasks, stopping before implementation
    Prep { description: String },
    /// Show task progress for the current spec
    Status,
    /// Inspect or reset persisted retry counters
    Retry {
        #[command(subcommand)]
        command: RetryCommands,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum RetryCommands {
    /// List all recorded retry counters
    Show,
    /// Reset the counters of the current spec
    Reset {
        /// Only reset this stage
        #[arg(long)]
        stage: Option<specflow::stage::Stage>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default config.toml file
    Init,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    specflow::logging::init(cli.verbose);

    if let Err(err) = run(cli).await {
        cmd::report_error(&err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    use specflow::stage::Stage;

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Init => cmd::cmd_init(&project_dir)?,
        Commands::Specify { description } => {
            cmd::cmd_specify(&cli, project_dir, description).await?
        }
        Commands::Plan { prompt } => {
            cmd::cmd_stage(&cli, project_dir, Stage::Plan, prompt.as_deref()).await?
        }
        Commands::Tasks { prompt } => {
            cmd::cmd_stage(&cli, project_dir, Stage::Tasks, prompt.as_deref()).await?
        }
        Commands::Constitution { prompt } => {
            cmd::cmd_stage(&cli, project_dir, Stage::Constitution, prompt.as_deref()).await?
        }
        Commands::Clarify { prompt } => {
            cmd::cmd_stage(&cli, project_dir, Stage::Clarify, prompt.as_deref()).await?
        }
        Commands::Checklist { prompt } => {
            cmd::cmd_stage(&cli, project_dir, Stage::Checklist, prompt.as_deref()).await?
        }
        Commands::Analyze { prompt } => {
            cmd::cmd_stage(&cli, project_dir, Stage::Analyze, prompt.as_deref()).await?
        }
        Commands::Implement {
            resume,
            phases,
            phase,
            from_phase,
            tasks,
            from_task,
            prompt,
        } => {
            let flags = specflow::orchestrator::ModeFlags {
                resume: *resume,
                all_phases: *phases,
                phase: *phase,
                from_phase: *from_phase,
                tasks: *tasks,
                from_task: from_task.clone(),
            };
            cmd::cmd_implement(&cli, project_dir, &flags, prompt.as_deref()).await?
        }
        Commands::Run {
            specify,
            plan,
            tasks,
            implement,
            constitution,
            clarify,
            checklist,
            analyze,
            all,
            description,
        } => {
            let selected = [
                (*specify || *all, Stage::Specify),
                (*plan || *all, Stage::Plan),
                (*tasks || *all, Stage::Tasks),
                (*implement || *all, Stage::Implement),
                (*constitution, Stage::Constitution),
                (*clarify, Stage::Clarify),
                (*checklist, Stage::Checklist),
                (*analyze, Stage::Analyze),
            ];
            let stages: Vec<Stage> = selected
                .iter()
                .filter(|(on, _)| *on)
                .map(|(_, stage)| *stage)
                .collect();
            cmd::cmd_run(&cli, project_dir, &stages, description.as_deref()).await?
        }
        Commands::All { description } => {
            cmd::cmd_run(&cli, project_dir, &cmd::ALL_STAGES, Some(description)).await?
        }
        Commands::Prep { description } => {
            cmd::cmd_run(&cli, project_dir, &cmd::PREP_STAGES, Some(description)).await?
        }
        Commands::Status => cmd::cmd_status(&cli, &project_dir)?,
        Commands::Retry { command } => cmd::cmd_retry(&cli, &project_dir, command.clone())?,
        Commands::Config { command } => cmd::cmd_config(&cli, &project_dir, command.clone())?,
    }

    Ok(())
}
