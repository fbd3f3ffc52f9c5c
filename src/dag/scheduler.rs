//! Ordering and readiness queries over a task list.
//!
//! Every function here is pure over the slice it is given; callers re-read
//! `tasks.yaml` before each decision instead of holding on to a result.

use std::collections::{BTreeSet, HashMap};

use crate::artifact::{TaskItem, TaskStatus};
use crate::dag::builder::DagBuilder;
use crate::errors::WorkflowError;

/// Order tasks so that each appears strictly after all of its dependencies.
///
/// Ties among simultaneously-ready tasks keep their original relative order.
pub fn order_by_dependency(tasks: &[TaskItem]) -> Result<Vec<TaskItem>, WorkflowError> {
    let graph = DagBuilder::new(tasks.to_vec()).build()?;
    let order = graph.topological_order()?;
    Ok(order.into_iter().map(|i| graph.tasks()[i].clone()).collect())
}

/// Whether every dependency of `task` is Completed, plus the ids that are not.
///
/// A dependency id with no matching task counts as unmet.
pub fn dependencies_met(task: &TaskItem, all_tasks: &[TaskItem]) -> (bool, Vec<String>) {
    let by_id: HashMap<&str, &TaskItem> = all_tasks.iter().map(|t| (t.id.as_str(), t)).collect();
    let unmet: Vec<String> = task
        .dependencies
        .iter()
        .filter(|dep| {
            by_id
                .get(dep.as_str())
                .is_none_or(|t| t.status != TaskStatus::Completed)
        })
        .cloned()
        .collect();
    (unmet.is_empty(), unmet)
}

/// Distinct phase numbers present in the task list, ascending.
pub fn phase_numbers(tasks: &[TaskItem]) -> Vec<u32> {
    tasks
        .iter()
        .map(|t| t.phase)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Tasks belonging to a phase, in source order.
pub fn tasks_in_phase(phase: u32, tasks: &[TaskItem]) -> Vec<TaskItem> {
    tasks.iter().filter(|t| t.phase == phase).cloned().collect()
}

/// First phase, ascending, holding a task that is neither Completed nor Blocked.
///
/// Returns 0 when every phase is settled.
pub fn first_incomplete_phase(tasks: &[TaskItem]) -> u32 {
    phase_numbers(tasks)
        .into_iter()
        .find(|&phase| !is_phase_settled(phase, tasks))
        .unwrap_or(0)
}

/// True iff every task in the phase is Completed. Blocked tasks do not count.
pub fn is_phase_complete(phase: u32, tasks: &[TaskItem]) -> bool {
    tasks
        .iter()
        .filter(|t| t.phase == phase)
        .all(|t| t.status == TaskStatus::Completed)
}

/// True iff every task in the phase is Completed or Blocked.
pub fn is_phase_settled(phase: u32, tasks: &[TaskItem]) -> bool {
    tasks
        .iter()
        .filter(|t| t.phase == phase)
        .all(|t| t.status.is_settled())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, phase: u32, status: TaskStatus, deps: &[&str]) -> TaskItem {
        TaskItem::new(id, phase, status, deps)
    }

    fn ids(tasks: &[TaskItem]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_order_fan_out_keeps_relative_order() {
        let tasks = vec![
            task("T1", 1, TaskStatus::Pending, &[]),
            task("T2", 1, TaskStatus::Pending, &["T1"]),
            task("T3", 1, TaskStatus::Pending, &["T1"]),
        ];
        let ordered = order_by_dependency(&tasks).unwrap();
        assert_eq!(ids(&ordered), vec!["T1", "T2", "T3"]);
    }

    #[test]
    fn test_order_places_every_task_after_its_dependencies() {
        let tasks = vec![
            task("T5", 2, TaskStatus::Pending, &["T4", "T2"]),
            task("T4", 2, TaskStatus::Pending, &["T3"]),
            task("T3", 1, TaskStatus::Pending, &["T1"]),
            task("T2", 1, TaskStatus::Pending, &[]),
            task("T1", 1, TaskStatus::Pending, &[]),
            task("T6", 2, TaskStatus::Pending, &["T5", "T1"]),
        ];
        let ordered = order_by_dependency(&tasks).unwrap();
        assert_eq!(ordered.len(), tasks.len());

        let position: HashMap<&str, usize> = ordered
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.as_str(), i))
            .collect();
        for t in &ordered {
            for dep in &t.dependencies {
                assert!(
                    position[dep.as_str()] < position[t.id.as_str()],
                    "{} must come after {}",
                    t.id,
                    dep
                );
            }
        }
    }

    #[test]
    fn test_order_cycle_terminates_with_error() {
        let tasks = vec![
            task("T1", 1, TaskStatus::Pending, &["T2"]),
            task("T2", 1, TaskStatus::Pending, &["T1"]),
            task("T3", 1, TaskStatus::Pending, &[]),
        ];
        match order_by_dependency(&tasks).unwrap_err() {
            WorkflowError::Cycle { remaining } => assert_eq!(remaining, vec!["T1", "T2"]),
            other => panic!("Expected Cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_order_self_dependency_is_a_cycle() {
        let tasks = vec![task("T1", 1, TaskStatus::Pending, &["T1"])];
        assert!(matches!(
            order_by_dependency(&tasks),
            Err(WorkflowError::Cycle { .. })
        ));
    }

    #[test]
    fn test_dependencies_met() {
        let tasks = vec![
            task("T1", 1, TaskStatus::Completed, &[]),
            task("T2", 1, TaskStatus::Blocked, &[]),
            task("T3", 1, TaskStatus::Pending, &["T1"]),
            task("T4", 1, TaskStatus::Pending, &["T1", "T2", "T9"]),
        ];
        assert_eq!(dependencies_met(&tasks[2], &tasks), (true, vec![]));
        assert_eq!(
            dependencies_met(&tasks[3], &tasks),
            (false, vec!["T2".to_string(), "T9".to_string()])
        );
    }

    #[test]
    fn test_first_incomplete_phase_skips_settled_phases() {
        let tasks = vec![
            task("T1", 1, TaskStatus::Completed, &[]),
            task("T2", 1, TaskStatus::Blocked, &[]),
            task("T3", 2, TaskStatus::Completed, &[]),
            task("T4", 3, TaskStatus::InProgress, &[]),
        ];
        assert_eq!(first_incomplete_phase(&tasks), 3);
    }

    #[test]
    fn test_first_incomplete_phase_all_done() {
        let tasks = vec![
            task("T1", 1, TaskStatus::Completed, &[]),
            task("T2", 2, TaskStatus::Blocked, &[]),
        ];
        assert_eq!(first_incomplete_phase(&tasks), 0);
        assert_eq!(first_incomplete_phase(&[]), 0);
    }

    #[test]
    fn test_is_phase_complete_rejects_blocked() {
        let tasks = vec![
            task("T1", 1, TaskStatus::Completed, &[]),
            task("T2", 1, TaskStatus::Blocked, &[]),
            task("T3", 2, TaskStatus::Completed, &[]),
        ];
        assert!(!is_phase_complete(1, &tasks));
        assert!(is_phase_settled(1, &tasks));
        assert!(is_phase_complete(2, &tasks));
    }

    #[test]
    fn test_tasks_in_phase_preserves_order() {
        let tasks = vec![
            task("T3", 2, TaskStatus::Pending, &[]),
            task("T1", 1, TaskStatus::Pending, &[]),
            task("T2", 2, TaskStatus::Pending, &[]),
        ];
        assert_eq!(ids(&tasks_in_phase(2, &tasks)), vec!["T3", "T2"]);
        assert_eq!(phase_numbers(&tasks), vec![1, 2]);
    }
}
