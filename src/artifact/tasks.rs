//! Reading `tasks.yaml`: tasks, phases and progress statistics.
//!
//! The file is owned by the agent. This module only reads it, and every
//! accessor goes back to disk so that edits made between invocations are
//! always observed.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Status of a task as written by the agent.
///
/// Parsing is case-insensitive and accepts `in_progress`, `in-progress` and
/// `inprogress` for `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Blocked,
}

impl TaskStatus {
    /// Completed or Blocked: nothing left for the agent to do right now.
    pub fn is_settled(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Blocked)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "Pending"),
            TaskStatus::InProgress => write!(f, "InProgress"),
            TaskStatus::Completed => write!(f, "Completed"),
            TaskStatus::Blocked => write!(f, "Blocked"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "inprogress" | "in_progress" | "in-progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "blocked" => Ok(TaskStatus::Blocked),
            _ => anyhow::bail!(
                "Invalid task status '{}'. Valid values: Pending, InProgress, Completed, Blocked",
                s
            ),
        }
    }
}

impl TryFrom<String> for TaskStatus {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        status.to_string()
    }
}

/// The smallest schedulable unit of implementation work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    pub dependencies: Vec<String>,
    /// Number of the enclosing phase
    pub phase: u32,
    pub parallel: bool,
}

impl TaskItem {
    pub fn new(id: &str, phase: u32, status: TaskStatus, dependencies: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            title: format!("Task {}", id),
            status,
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
            phase,
            parallel: false,
        }
    }
}

/// Derived view of one phase, recomputed on every query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseInfo {
    pub number: u32,
    pub title: String,
    pub purpose: String,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub blocked_tasks: usize,
}

/// Aggregate progress over the whole task list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub blocked: usize,
    pub total_phases: usize,
    pub completed_phases: usize,
}

impl TaskStats {
    pub fn completion_percentage(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.completed as f64 / self.total as f64) * 100.0
    }

    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }
}

#[derive(Debug, Clone, Deserialize)]
struct TaskEntry {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    status: TaskStatus,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    parallel: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct PhaseEntry {
    number: u32,
    #[serde(default)]
    title: String,
    #[serde(default)]
    purpose: String,
    #[serde(default)]
    tasks: Vec<TaskEntry>,
}

/// Parsed `tasks.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct TasksFile {
    #[serde(default)]
    phases: Vec<PhaseEntry>,
}

impl TasksFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read tasks file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse tasks YAML: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self { phases: Vec::new() });
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// All tasks in file order.
    pub fn tasks(&self) -> Vec<TaskItem> {
        self.phases
            .iter()
            .flat_map(|phase| {
                phase.tasks.iter().map(move |t| TaskItem {
                    id: t.id.clone(),
                    title: t.title.clone(),
                    status: t.status,
                    dependencies: t.dependencies.clone(),
                    phase: phase.number,
                    parallel: t.parallel,
                })
            })
            .collect()
    }

    pub fn phase_info(&self) -> Vec<PhaseInfo> {
        let mut infos: Vec<PhaseInfo> = self
            .phases
            .iter()
            .map(|phase| PhaseInfo {
                number: phase.number,
                title: phase.title.clone(),
                purpose: phase.purpose.clone(),
                total_tasks: phase.tasks.len(),
                completed_tasks: phase
                    .tasks
                    .iter()
                    .filter(|t| t.status == TaskStatus::Completed)
                    .count(),
                blocked_tasks: phase
                    .tasks
                    .iter()
                    .filter(|t| t.status == TaskStatus::Blocked)
                    .count(),
            })
            .collect();
        infos.sort_by_key(|p| p.number);
        infos
    }

    pub fn stats(&self) -> TaskStats {
        let tasks = self.tasks();
        let phases = self.phase_info();
        let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();
        TaskStats {
            total: tasks.len(),
            completed: count(TaskStatus::Completed),
            in_progress: count(TaskStatus::InProgress),
            pending: count(TaskStatus::Pending),
            blocked: count(TaskStatus::Blocked),
            total_phases: phases.len(),
            completed_phases: phases
                .iter()
                .filter(|p| p.completed_tasks == p.total_tasks)
                .count(),
        }
    }
}

pub fn get_all_tasks(path: &Path) -> Result<Vec<TaskItem>> {
    Ok(TasksFile::load(path)?.tasks())
}

pub fn get_task_by_id(path: &Path, id: &str) -> Result<Option<TaskItem>> {
    Ok(get_all_tasks(path)?.into_iter().find(|t| t.id == id))
}

pub fn get_phase_info(path: &Path) -> Result<Vec<PhaseInfo>> {
    Ok(TasksFile::load(path)?.phase_info())
}

pub fn get_task_stats(path: &Path) -> Result<TaskStats> {
    Ok(TasksFile::load(path)?.stats())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"
phases:
  - number: 1
    title: Setup
    purpose: Scaffolding
    tasks:
      - id: T001
        title: Create layout
        status: completed
      - id: T002
        title: Add config
        status: Pending
        dependencies: [T001]
  - number: 2
    title: Core
    tasks:
      - id: T003
        title: Engine
        status: In_Progress
        parallel: true
        dependencies: [T001, T002]
      - id: T004
        title: Blocked work
        status: BLOCKED
"#;

    fn write_sample() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.yaml");
        fs::write(&path, SAMPLE).unwrap();
        (dir, path)
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("COMPLETED".parse::<TaskStatus>().unwrap(), TaskStatus::Completed);
        assert_eq!("in-progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!("Blocked".parse::<TaskStatus>().unwrap(), TaskStatus::Blocked);
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_get_all_tasks_preserves_file_order_and_phase() {
        let (_dir, path) = write_sample();
        let tasks = get_all_tasks(&path).unwrap();
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["T001", "T002", "T003", "T004"]);
        assert_eq!(tasks[1].phase, 1);
        assert_eq!(tasks[2].phase, 2);
        assert_eq!(tasks[2].status, TaskStatus::InProgress);
        assert!(tasks[2].parallel);
        assert_eq!(tasks[2].dependencies, vec!["T001", "T002"]);
    }

    #[test]
    fn test_get_task_by_id() {
        let (_dir, path) = write_sample();
        let task = get_task_by_id(&path, "T004").unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Blocked);
        assert!(get_task_by_id(&path, "T999").unwrap().is_none());
    }

    #[test]
    fn test_get_phase_info_counts() {
        let (_dir, path) = write_sample();
        let phases = get_phase_info(&path).unwrap();
        assert_eq!(phases.len(), 2);
        assert_eq!(phases[0].title, "Setup");
        assert_eq!(phases[0].purpose, "Scaffolding");
        assert_eq!(phases[0].total_tasks, 2);
        assert_eq!(phases[0].completed_tasks, 1);
        assert_eq!(phases[1].blocked_tasks, 1);
    }

    #[test]
    fn test_get_task_stats() {
        let (_dir, path) = write_sample();
        let stats = get_task_stats(&path).unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.blocked, 1);
        assert_eq!(stats.total_phases, 2);
        assert_eq!(stats.completed_phases, 0);
        assert_eq!(stats.completion_percentage(), 25.0);
        assert!(!stats.is_complete());
    }

    #[test]
    fn test_empty_file_has_no_tasks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.yaml");
        fs::write(&path, "\n").unwrap();
        assert!(get_all_tasks(&path).unwrap().is_empty());
        assert_eq!(get_task_stats(&path).unwrap().completion_percentage(), 100.0);
    }

    #[test]
    fn test_missing_file_error() {
        let err = get_all_tasks(Path::new("/nonexistent/tasks.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read tasks file"));
    }

    #[test]
    fn test_invalid_status_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.yaml");
        fs::write(
            &path,
            "phases:\n  - number: 1\n    tasks:\n      - id: T001\n        status: finished\n",
        )
        .unwrap();
        let err = get_all_tasks(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse tasks YAML"));
    }
}
