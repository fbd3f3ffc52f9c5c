use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::agent::{Agent, ExecOptions};
use crate::errors::WorkflowError;
use crate::retry::RetryStore;
use crate::stage::{Stage, StageResult};

/// Executes one stage: invoke the agent, validate what it produced, retry
/// with a persisted counter, and report exhaustion.
///
/// Agent failures (non-zero exit, timeout, spawn error) and validation
/// failures draw from the same budget. With `max_retries = M` a stage that
/// never succeeds invokes the agent `M + 1` times and ends with a persisted
/// count of `M`.
pub struct StageRunner<'a> {
    agent: &'a dyn Agent,
    store: &'a dyn RetryStore,
    max_retries: u32,
    options: ExecOptions,
    specs_dir: PathBuf,
}

impl<'a> StageRunner<'a> {
    pub fn new(
        agent: &'a dyn Agent,
        store: &'a dyn RetryStore,
        max_retries: u32,
        options: ExecOptions,
        specs_dir: PathBuf,
    ) -> Self {
        Self {
            agent,
            store,
            max_retries,
            options,
            specs_dir,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn specs_dir(&self) -> &Path {
        &self.specs_dir
    }

    /// Directory handed to a stage's validator.
    pub fn artifact_dir(&self, spec: &str, stage: Stage) -> PathBuf {
        if stage.is_project_scoped() {
            self.specs_dir.clone()
        } else {
            self.specs_dir.join(spec)
        }
    }

    pub async fn execute_stage<F>(
        &self,
        spec: &str,
        stage: Stage,
        instruction: &str,
        validate: F,
    ) -> Result<StageResult, WorkflowError>
    where
        F: Fn(&Path) -> Result<()>,
    {
        if instruction.trim().is_empty() {
            return Err(WorkflowError::InvalidInput(format!(
                "empty instruction for stage {}",
                stage
            )));
        }
        if !stage.is_project_scoped() && spec.trim().is_empty() {
            return Err(WorkflowError::InvalidInput(format!(
                "stage {} requires a spec name",
                stage
            )));
        }

        // Every specify run produces a fresh spec, so old failures don't count.
        if stage == Stage::Specify {
            self.store.reset(spec, stage)?;
        }

        let artifact_dir = self.artifact_dir(spec, stage);
        let mut count = self.store.get(spec, stage)?;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            info!(%stage, spec, attempt, retry_count = count, "invoking agent");

            let failure = match self.agent.execute(instruction, &self.options).await {
                Ok(result) if result.success() => match validate(&artifact_dir) {
                    Ok(()) => None,
                    Err(e) => Some(format!("validation failed: {:#}", e)),
                },
                Ok(result) => Some(format!("agent exited with code {}", result.exit_code)),
                Err(e) => Some(e.to_string()),
            };

            let Some(error) = failure else {
                self.store.reset(spec, stage)?;
                info!(%stage, spec, attempt, "stage succeeded");
                return Ok(StageResult::succeeded(stage, 0));
            };

            if count >= self.max_retries {
                warn!(%stage, spec, retry_count = count, %error, "retry budget exhausted");
                return Ok(StageResult::exhausted(stage, count, error));
            }

            count = self.store.increment(spec, stage)?;
            warn!(
                %stage,
                spec,
                retry_count = count,
                max_retries = self.max_retries,
                %error,
                "attempt failed, retrying"
            );
        }
    }
}
