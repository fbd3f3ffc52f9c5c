use anyhow::{Context, Result, bail};
use console::style;
use glob::glob;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::artifact::{
    CHECKLISTS_DIR, PLAN_FILE, SPEC_FILE, TASKS_FILE, TaskItem, TaskStatus, get_all_tasks,
    get_phase_info, get_task_stats, validate_plan_schema, validate_spec_schema, validate_tasks_schema,
};
use crate::command::{self, Instruction};
use crate::dag::{
    dependencies_met, first_incomplete_phase, is_phase_complete, is_phase_settled,
    order_by_dependency,
};
use crate::errors::WorkflowError;
use crate::orchestrator::mode::ImplementMode;
use crate::orchestrator::runner::StageRunner;
use crate::spec::list_specs;
use crate::stage::{Stage, StageResult};

type Validator<'v> = Box<dyn Fn(&Path) -> Result<()> + 'v>;

/// The spec directory that is not in `existing`. When an agent created
/// several, the greatest name wins.
fn new_spec(specs_dir: &Path, existing: &[String]) -> Result<Option<String>> {
    Ok(list_specs(specs_dir)?
        .into_iter()
        .filter(|name| !existing.contains(name))
        .next_back())
}

/// What an implement invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplementSummary {
    pub mode: ImplementMode,
    /// Units (phases or tasks) the agent was invoked for, in order.
    pub executed: Vec<String>,
    /// Units passed over without an agent call.
    pub skipped: Vec<String>,
    /// Phases still not fully Completed after a single-phase run.
    pub incomplete_phases: Vec<u32>,
    pub nothing_to_do: bool,
}

impl ImplementSummary {
    fn new(mode: ImplementMode) -> Self {
        Self {
            mode,
            executed: Vec::new(),
            skipped: Vec::new(),
            incomplete_phases: Vec::new(),
            nothing_to_do: false,
        }
    }
}

/// Outcome of a multi-stage workflow run.
#[derive(Debug, Clone)]
pub struct WorkflowSummary {
    /// Spec the workflow ended on (set by specify when it ran).
    pub spec: Option<String>,
    pub stages: Vec<StageResult>,
    pub implement: Option<ImplementSummary>,
}

/// Top-level driver: composes stages into workflows and dispatches the
/// implement stage to one of the execution modes.
///
/// Holds no progress state of its own. Every scheduling decision re-reads
/// `tasks.yaml`, so a run can be interrupted and resumed at any point.
pub struct WorkflowOrchestrator<'a> {
    runner: StageRunner<'a>,
    constitution_path: PathBuf,
    progress: bool,
}

impl<'a> WorkflowOrchestrator<'a> {
    pub fn new(runner: StageRunner<'a>, constitution_path: PathBuf) -> Self {
        Self {
            runner,
            constitution_path,
            progress: false,
        }
    }

    /// Print a styled line to stderr before each unit of work.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    fn announce(&self, message: &str) {
        if self.progress {
            eprintln!("{} {}", style("▶").cyan().bold(), message);
        }
    }

    fn specs_dir(&self) -> &Path {
        self.runner.specs_dir()
    }

    fn tasks_path(&self, spec: &str) -> PathBuf {
        self.specs_dir().join(spec).join(TASKS_FILE)
    }

    fn read_tasks(&self, spec: &str) -> Result<Vec<TaskItem>, WorkflowError> {
        Ok(get_all_tasks(&self.tasks_path(spec))?)
    }

    fn exhausted(
        spec: &str,
        unit: String,
        result: StageResult,
        resume_command: String,
    ) -> WorkflowError {
        WorkflowError::RetryExhausted {
            spec: spec.to_string(),
            unit,
            retries: result.retry_count,
            last_error: result.error.unwrap_or_default(),
            resume_command,
        }
    }

    /// Artifacts a stage needs before the agent is worth invoking.
    pub fn check_prerequisites(&self, spec: &str, stage: Stage) -> Result<(), WorkflowError> {
        let required: &[(&str, Stage)] = match stage {
            Stage::Specify | Stage::Constitution => &[],
            Stage::Clarify | Stage::Plan => &[(SPEC_FILE, Stage::Specify)],
            Stage::Tasks => &[(PLAN_FILE, Stage::Plan)],
            Stage::Implement => &[(TASKS_FILE, Stage::Tasks)],
            Stage::Checklist | Stage::Analyze => {
                &[(SPEC_FILE, Stage::Specify), (TASKS_FILE, Stage::Tasks)]
            }
        };
        for (file, producer) in required {
            let path = self.specs_dir().join(spec).join(file);
            if !path.is_file() {
                let producer = command::resume_stage(*producer, spec);
                return Err(WorkflowError::MissingArtifact {
                    path,
                    hint: format!("Run `{}` first.", producer),
                });
            }
        }
        Ok(())
    }

    /// Post-condition checked after the agent reports success.
    ///
    /// `existing` is the spec directory listing taken before specify ran.
    fn validator<'v>(&'v self, stage: Stage, existing: &'v [String]) -> Validator<'v> {
        match stage {
            Stage::Specify => Box::new(move |specs_dir: &Path| -> Result<()> {
                let name = new_spec(specs_dir, existing)?
                    .context("agent did not create a new spec directory")?;
                validate_spec_schema(&specs_dir.join(name))?;
                Ok(())
            }),
            Stage::Clarify => Box::new(|dir: &Path| -> Result<()> { Ok(validate_spec_schema(dir)?) }),
            Stage::Plan => Box::new(|dir: &Path| -> Result<()> { Ok(validate_plan_schema(dir)?) }),
            Stage::Tasks => Box::new(|dir: &Path| -> Result<()> { Ok(validate_tasks_schema(dir)?) }),
            Stage::Checklist => Box::new(|dir: &Path| -> Result<()> {
                let pattern = dir.join(CHECKLISTS_DIR).join("*.yaml");
                let found = glob(&pattern.to_string_lossy())
                    .context("Invalid checklist glob pattern")?
                    .filter_map(|entry| entry.ok())
                    .any(|path| path.is_file());
                if !found {
                    bail!("no checklist files found in {}", dir.join(CHECKLISTS_DIR).display());
                }
                Ok(())
            }),
            Stage::Constitution => Box::new(move |_: &Path| -> Result<()> {
                let path = &self.constitution_path;
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read constitution: {}", path.display()))?;
                if content.trim().is_empty() {
                    bail!("constitution is empty: {}", path.display());
                }
                Ok(())
            }),
            Stage::Analyze | Stage::Implement => Box::new(|_: &Path| -> Result<()> { Ok(()) }),
        }
    }

    /// Run one non-implement stage to success or exhaustion.
    pub async fn run_stage(
        &self,
        spec: &str,
        stage: Stage,
        prompt: Option<&str>,
    ) -> Result<StageResult, WorkflowError> {
        let existing = list_specs(self.specs_dir())?;
        self.run_stage_after(spec, stage, prompt, &existing).await
    }

    async fn run_stage_after(
        &self,
        spec: &str,
        stage: Stage,
        prompt: Option<&str>,
        existing: &[String],
    ) -> Result<StageResult, WorkflowError> {
        if stage == Stage::Implement {
            return Err(WorkflowError::InvalidInput(
                "the implement stage is dispatched through `implement`".to_string(),
            ));
        }
        if stage == Stage::Specify && prompt.is_none_or(|p| p.trim().is_empty()) {
            return Err(WorkflowError::InvalidInput(
                "specify requires a feature description".to_string(),
            ));
        }
        self.check_prerequisites(spec, stage)?;

        let instruction = Instruction::new(stage).prompt(prompt).render();
        self.announce(&format!("Running {}", style(stage).bold()));

        let validate = self.validator(stage, existing);
        let result = self
            .runner
            .execute_stage(spec, stage, &instruction, validate)
            .await?;
        if result.exhausted {
            return Err(Self::exhausted(
                spec,
                format!("Stage {}", stage),
                result,
                command::resume_stage(stage, spec),
            ));
        }
        Ok(result)
    }

    /// Create a new spec from a feature description. Returns the name of the
    /// spec directory this run created.
    pub async fn specify(&self, description: &str) -> Result<(StageResult, String), WorkflowError> {
        let existing = list_specs(self.specs_dir())?;
        let result = self
            .run_stage_after("", Stage::Specify, Some(description), &existing)
            .await?;
        let name = new_spec(self.specs_dir(), &existing)?.ok_or_else(|| {
            WorkflowError::Other(anyhow::anyhow!("specify succeeded but created no spec directory"))
        })?;
        info!(spec = %name, "spec created");
        Ok((result, name))
    }

    /// Run the selected stages in canonical order.
    ///
    /// `description` feeds specify; after specify the workflow continues on
    /// the spec it created.
    pub async fn run_stages(
        &self,
        spec: Option<&str>,
        stages: &[Stage],
        description: Option<&str>,
        mode: &ImplementMode,
    ) -> Result<WorkflowSummary, WorkflowError> {
        let stages = Stage::in_canonical_order(stages);
        if stages.is_empty() {
            return Err(WorkflowError::InvalidInput("no stages selected".to_string()));
        }

        let mut summary = WorkflowSummary {
            spec: spec.map(str::to_string),
            stages: Vec::new(),
            implement: None,
        };

        for stage in stages {
            match stage {
                Stage::Specify => {
                    let description = description.ok_or_else(|| {
                        WorkflowError::InvalidInput(
                            "specify requires a feature description".to_string(),
                        )
                    })?;
                    let (result, name) = self.specify(description).await?;
                    summary.stages.push(result);
                    summary.spec = Some(name);
                }
                Stage::Constitution => {
                    let spec = summary.spec.clone().unwrap_or_default();
                    summary.stages.push(self.run_stage(&spec, stage, None).await?);
                }
                Stage::Implement => {
                    let spec = Self::require_spec(summary.spec.as_deref())?;
                    summary.implement = Some(self.implement(&spec, mode, None).await?);
                }
                other => {
                    let spec = Self::require_spec(summary.spec.as_deref())?;
                    summary.stages.push(self.run_stage(&spec, other, None).await?);
                }
            }
        }

        Ok(summary)
    }

    fn require_spec(spec: Option<&str>) -> Result<String, WorkflowError> {
        spec.filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                WorkflowError::InvalidInput(
                    "no spec selected; run `specflow specify` first or pass --spec".to_string(),
                )
            })
    }

    /// Run the implement stage in the given mode.
    pub async fn implement(
        &self,
        spec: &str,
        mode: &ImplementMode,
        prompt: Option<&str>,
    ) -> Result<ImplementSummary, WorkflowError> {
        let spec = Self::require_spec(Some(spec))?;
        self.check_prerequisites(&spec, Stage::Implement)?;

        let mut summary = ImplementSummary::new(mode.clone());
        let tasks = self.read_tasks(&spec)?;
        if tasks.is_empty() {
            info!(spec = %spec, "no tasks defined, nothing to do");
            summary.nothing_to_do = true;
            return Ok(summary);
        }
        info!(spec = %spec, %mode, "implement mode selected");

        match mode {
            ImplementMode::Default { resume } => {
                self.implement_session(&spec, *resume, prompt, &tasks, &mut summary)
                    .await?
            }
            ImplementMode::AllPhases => {
                let start = first_incomplete_phase(&tasks);
                if start == 0 {
                    info!(spec = %spec, "all phases settled, nothing to do");
                    summary.nothing_to_do = true;
                } else {
                    self.implement_phases(&spec, start, prompt, &mut summary)
                        .await?;
                }
            }
            ImplementMode::SinglePhase(n) => {
                self.check_phase_range(&spec, *n)?;
                self.implement_single_phase(&spec, *n, prompt, &mut summary)
                    .await?;
            }
            ImplementMode::FromPhase(n) => {
                self.check_phase_range(&spec, *n)?;
                self.implement_phases(&spec, *n, prompt, &mut summary)
                    .await?;
            }
            ImplementMode::AllTasks { from_task } => {
                self.implement_tasks(&spec, from_task.as_deref(), prompt, &tasks, &mut summary)
                    .await?;
            }
        }

        Ok(summary)
    }

    /// Phase numbers as listed in `tasks.yaml`, including phases without tasks.
    fn listed_phases(&self, spec: &str) -> Result<Vec<u32>, WorkflowError> {
        Ok(get_phase_info(&self.tasks_path(spec))?
            .into_iter()
            .map(|p| p.number)
            .collect())
    }

    fn check_phase_range(&self, spec: &str, requested: u32) -> Result<(), WorkflowError> {
        let total = self.listed_phases(spec)?.len() as u32;
        if !(1..=total).contains(&requested) {
            return Err(WorkflowError::PhaseOutOfRange { requested, total });
        }
        Ok(())
    }

    async fn implement_session(
        &self,
        spec: &str,
        resume: bool,
        prompt: Option<&str>,
        tasks: &[TaskItem],
        summary: &mut ImplementSummary,
    ) -> Result<(), WorkflowError> {
        if tasks.iter().all(|t| t.status == TaskStatus::Completed) {
            info!(spec, "all tasks completed, nothing to do");
            summary.nothing_to_do = true;
            return Ok(());
        }

        let instruction = Instruction::new(Stage::Implement)
            .resume(resume)
            .prompt(prompt)
            .render();
        self.announce("Implementing all remaining tasks");

        let tasks_path = self.tasks_path(spec);
        let result = self
            .runner
            .execute_stage(spec, Stage::Implement, &instruction, |_| {
                let stats = get_task_stats(&tasks_path)?;
                if !stats.is_complete() {
                    bail!(
                        "{} of {} tasks completed ({} blocked)",
                        stats.completed,
                        stats.total,
                        stats.blocked
                    );
                }
                Ok(())
            })
            .await?;
        if result.exhausted {
            return Err(Self::exhausted(
                spec,
                "Implementation".to_string(),
                result,
                command::resume_implement(spec),
            ));
        }
        summary.executed.push("implement".to_string());
        Ok(())
    }

    /// One agent session scoped to a phase. Succeeds once every task in the
    /// phase is Completed or Blocked.
    async fn run_phase(
        &self,
        spec: &str,
        phase: u32,
        prompt: Option<&str>,
    ) -> Result<(), WorkflowError> {
        let instruction = Instruction::new(Stage::Implement)
            .phase(phase)
            .prompt(prompt)
            .render();
        self.announce(&format!("Implementing phase {}", style(phase).bold()));

        let tasks_path = self.tasks_path(spec);
        let result = self
            .runner
            .execute_stage(spec, Stage::Implement, &instruction, |_| {
                let tasks = get_all_tasks(&tasks_path)?;
                if !is_phase_settled(phase, &tasks) {
                    let open: Vec<&str> = tasks
                        .iter()
                        .filter(|t| t.phase == phase && !t.status.is_settled())
                        .map(|t| t.id.as_str())
                        .collect();
                    bail!("phase {} still has open tasks: {}", phase, open.join(", "));
                }
                Ok(())
            })
            .await?;
        if result.exhausted {
            return Err(Self::exhausted(
                spec,
                format!("Phase {}", phase),
                result,
                command::resume_phase(spec, phase),
            ));
        }
        Ok(())
    }

    /// Phases `start..` in order, skipping phases that are already settled.
    async fn implement_phases(
        &self,
        spec: &str,
        start: u32,
        prompt: Option<&str>,
        summary: &mut ImplementSummary,
    ) -> Result<(), WorkflowError> {
        let phases: Vec<u32> = self
            .listed_phases(spec)?
            .into_iter()
            .filter(|&p| p >= start)
            .collect();

        for phase in phases {
            let tasks = self.read_tasks(spec)?;
            if is_phase_settled(phase, &tasks) {
                info!(spec, phase, "phase already settled, skipping");
                summary.skipped.push(format!("phase {}", phase));
                continue;
            }

            self.run_phase(spec, phase, prompt).await?;
            summary.executed.push(format!("phase {}", phase));

            let tasks = self.read_tasks(spec)?;
            if !is_phase_complete(phase, &tasks) {
                return Err(WorkflowError::PhaseIncomplete {
                    phase,
                    resume_command: command::resume_phase(spec, phase),
                });
            }
        }
        Ok(())
    }

    async fn implement_single_phase(
        &self,
        spec: &str,
        phase: u32,
        prompt: Option<&str>,
        summary: &mut ImplementSummary,
    ) -> Result<(), WorkflowError> {
        let tasks = self.read_tasks(spec)?;
        if is_phase_settled(phase, &tasks) {
            info!(spec, phase, "phase already settled, skipping");
            summary.skipped.push(format!("phase {}", phase));
        } else {
            self.run_phase(spec, phase, prompt).await?;
            summary.executed.push(format!("phase {}", phase));
        }

        let tasks = self.read_tasks(spec)?;
        if !is_phase_complete(phase, &tasks) {
            warn!(spec, phase, "phase finished with tasks not completed");
            summary.incomplete_phases.push(phase);
        }
        Ok(())
    }

    async fn implement_tasks(
        &self,
        spec: &str,
        from_task: Option<&str>,
        prompt: Option<&str>,
        tasks: &[TaskItem],
        summary: &mut ImplementSummary,
    ) -> Result<(), WorkflowError> {
        let ordered = order_by_dependency(tasks)?;

        let start = match from_task {
            Some(id) => {
                let index = ordered
                    .iter()
                    .position(|t| t.id == id)
                    .ok_or_else(|| WorkflowError::TaskNotFound {
                        task: id.to_string(),
                    })?;
                let (met, unmet) = dependencies_met(&ordered[index], tasks);
                if !met {
                    return Err(WorkflowError::DependencyUnmet {
                        task: id.to_string(),
                        unmet,
                    });
                }
                index
            }
            None => 0,
        };

        for planned in &ordered[start..] {
            let current = self.read_tasks(spec)?;
            let task = current
                .iter()
                .find(|t| t.id == planned.id)
                .ok_or_else(|| WorkflowError::TaskNotFound {
                    task: planned.id.clone(),
                })?;

            if task.status.is_settled() {
                info!(spec, task = %task.id, status = %task.status, "skipping settled task");
                summary.skipped.push(task.id.clone());
                continue;
            }

            let (met, unmet) = dependencies_met(task, &current);
            if !met {
                warn!(
                    spec,
                    task = %task.id,
                    unmet = %unmet.join(", "),
                    "skipping task with unmet dependencies"
                );
                summary.skipped.push(task.id.clone());
                continue;
            }

            self.run_task(spec, &task.id, prompt).await?;
            summary.executed.push(task.id.clone());

            let after = self.read_tasks(spec)?;
            let status = after
                .iter()
                .find(|t| t.id == task.id)
                .map(|t| t.status)
                .ok_or_else(|| WorkflowError::TaskNotFound {
                    task: task.id.clone(),
                })?;
            if status != TaskStatus::Completed {
                return Err(WorkflowError::TaskIncomplete {
                    task: task.id.clone(),
                    status: status.to_string(),
                    resume_command: command::resume_task(spec, &task.id),
                });
            }
        }
        Ok(())
    }

    /// One agent session scoped to a task. Succeeds once the task is
    /// Completed or Blocked.
    async fn run_task(&self, spec: &str, id: &str, prompt: Option<&str>) -> Result<(), WorkflowError> {
        let instruction = Instruction::new(Stage::Implement)
            .task(id)
            .prompt(prompt)
            .render();
        self.announce(&format!("Implementing task {}", style(id).bold()));

        let tasks_path = self.tasks_path(spec);
        let result = self
            .runner
            .execute_stage(spec, Stage::Implement, &instruction, |_| {
                let tasks = get_all_tasks(&tasks_path)?;
                match tasks.iter().find(|t| t.id == id) {
                    Some(t) if t.status.is_settled() => Ok(()),
                    Some(t) => bail!("task {} is still {}", id, t.status),
                    None => bail!("task {} disappeared from {}", id, TASKS_FILE),
                }
            })
            .await?;
        if result.exhausted {
            return Err(Self::exhausted(
                spec,
                format!("Task {}", id),
                result,
                command::resume_task(spec, id),
            ));
        }
        Ok(())
    }
}
