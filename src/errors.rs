//! Typed error hierarchy for the specflow engine.
//!
//! Two enums cover the two layers:
//! - `AgentError` — failures of a single agent process invocation
//! - `WorkflowError` — stage, phase and task scheduling failures
//!
//! Only agent and validation failures are retried (inside `StageRunner`);
//! every other `WorkflowError` aborts the current unit of work immediately.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors from invoking the external agent process.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Failed to spawn agent command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Agent timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Failed to wait for agent process: {0}")]
    Wait(#[source] std::io::Error),
}

/// Errors from the workflow engine.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Task {task} has unmet dependencies: {}", .unmet.join(", "))]
    DependencyUnmet { task: String, unmet: Vec<String> },

    #[error("Cycle detected in task dependencies. Involved tasks: {}", .remaining.join(", "))]
    Cycle { remaining: Vec<String> },

    #[error("Task {task} depends on unknown task {dependency}")]
    UnknownDependency { task: String, dependency: String },

    #[error("Phase {requested} is out of range (valid phases: 1-{total})")]
    PhaseOutOfRange { requested: u32, total: u32 },

    #[error("Task {task} not found in tasks.yaml")]
    TaskNotFound { task: String },

    #[error("Required artifact missing: {}. {hint}", .path.display())]
    MissingArtifact { path: PathBuf, hint: String },

    #[error(
        "{unit} for spec '{spec}' failed after {retries} retries: {last_error}\nTo resume, run: {resume_command}"
    )]
    RetryExhausted {
        spec: String,
        unit: String,
        retries: u32,
        last_error: String,
        resume_command: String,
    },

    #[error("Phase {phase} still has incomplete tasks after execution\nTo resume, run: {resume_command}")]
    PhaseIncomplete { phase: u32, resume_command: String },

    #[error("Task {task} ended with status {status} instead of Completed\nTo resume, run: {resume_command}")]
    TaskIncomplete {
        task: String,
        status: String,
        resume_command: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WorkflowError {
    /// The literal command a user can run to continue where this error stopped, if any.
    pub fn resume_command(&self) -> Option<&str> {
        match self {
            Self::RetryExhausted { resume_command, .. }
            | Self::PhaseIncomplete { resume_command, .. }
            | Self::TaskIncomplete { resume_command, .. } => Some(resume_command),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_error_timeout_mentions_seconds() {
        let err = AgentError::Timeout(Duration::from_secs(90));
        assert!(err.to_string().contains("90s"));
    }

    #[test]
    fn agent_error_spawn_carries_command() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err = AgentError::Spawn {
            command: "claude".to_string(),
            source: io_err,
        };
        match &err {
            AgentError::Spawn { command, source } => {
                assert_eq!(command, "claude");
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            _ => panic!("Expected Spawn variant"),
        }
    }

    #[test]
    fn dependency_unmet_lists_ids() {
        let err = WorkflowError::DependencyUnmet {
            task: "T002".to_string(),
            unmet: vec!["T001".to_string(), "T000".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Task T002 has unmet dependencies: T001, T000"
        );
    }

    #[test]
    fn retry_exhausted_exposes_resume_command() {
        let err = WorkflowError::RetryExhausted {
            spec: "001-auth".to_string(),
            unit: "phase 2".to_string(),
            retries: 3,
            last_error: "agent exited with code 1".to_string(),
            resume_command: "specflow implement --phase 2".to_string(),
        };
        assert_eq!(err.resume_command(), Some("specflow implement --phase 2"));
        assert!(err.to_string().contains("To resume, run: specflow implement --phase 2"));
    }

    #[test]
    fn fatal_errors_have_no_resume_command() {
        let err = WorkflowError::PhaseOutOfRange {
            requested: 99,
            total: 1,
        };
        assert!(err.resume_command().is_none());
        assert!(err.to_string().contains("1-1"));
    }

    #[test]
    fn workflow_error_converts_from_anyhow() {
        let err: WorkflowError = anyhow::anyhow!("disk full").into();
        assert!(matches!(err, WorkflowError::Other(_)));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&AgentError::Timeout(Duration::from_secs(1)));
        assert_std_error(&WorkflowError::InvalidInput("x".into()));
    }
}
