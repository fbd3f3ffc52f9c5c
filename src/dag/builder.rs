//! Dependency graph construction over tasks.
//!
//! The builder validates that every dependency names an existing task and
//! that ids are unique; `TaskGraph::topological_order` then runs Kahn's
//! algorithm with a stable tie-break.

use std::collections::{BTreeSet, HashMap};

use crate::artifact::TaskItem;
use crate::errors::WorkflowError;

/// Index into the task list.
pub type TaskIndex = usize;

/// A directed graph of tasks. Edge `from -> to` means `from` must complete before `to`.
#[derive(Debug)]
pub struct TaskGraph {
    tasks: Vec<TaskItem>,
    /// index -> tasks that depend on it
    forward_edges: Vec<Vec<TaskIndex>>,
    /// index -> tasks it depends on
    reverse_edges: Vec<Vec<TaskIndex>>,
}

impl TaskGraph {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tasks(&self) -> &[TaskItem] {
        &self.tasks
    }

    pub fn dependents(&self, index: TaskIndex) -> &[TaskIndex] {
        self.forward_edges.get(index).map_or(&[], |v| v.as_slice())
    }

    pub fn dependencies(&self, index: TaskIndex) -> &[TaskIndex] {
        self.reverse_edges.get(index).map_or(&[], |v| v.as_slice())
    }

    /// Kahn's algorithm. Among tasks that are ready at the same time, the one
    /// that appears first in the source list is emitted first, so the result
    /// is deterministic for a given input.
    pub fn topological_order(&self) -> Result<Vec<TaskIndex>, WorkflowError> {
        let mut in_degree: Vec<usize> = self.reverse_edges.iter().map(|deps| deps.len()).collect();

        let mut ready: BTreeSet<TaskIndex> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, deg)| *deg == 0)
            .map(|(i, _)| i)
            .collect();

        let mut order = Vec::with_capacity(self.len());

        while let Some(node) = ready.pop_first() {
            order.push(node);
            for &dependent in self.dependents(node) {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() != self.len() {
            let remaining: Vec<String> = in_degree
                .iter()
                .enumerate()
                .filter(|&(_, deg)| *deg > 0)
                .map(|(i, _)| self.tasks[i].id.clone())
                .collect();
            return Err(WorkflowError::Cycle { remaining });
        }

        Ok(order)
    }
}

/// Builder for task graphs.
pub struct DagBuilder {
    tasks: Vec<TaskItem>,
}

impl DagBuilder {
    pub fn new(tasks: Vec<TaskItem>) -> Self {
        Self { tasks }
    }

    /// Build the graph, rejecting duplicate ids and unknown dependencies.
    ///
    /// Cycles are not rejected here; `topological_order` reports them.
    pub fn build(self) -> Result<TaskGraph, WorkflowError> {
        let mut index_map: HashMap<String, TaskIndex> = HashMap::new();
        for (i, task) in self.tasks.iter().enumerate() {
            if index_map.insert(task.id.clone(), i).is_some() {
                return Err(WorkflowError::InvalidInput(format!(
                    "Duplicate task id: {}",
                    task.id
                )));
            }
        }

        let mut forward_edges: Vec<Vec<TaskIndex>> = vec![Vec::new(); self.tasks.len()];
        let mut reverse_edges: Vec<Vec<TaskIndex>> = vec![Vec::new(); self.tasks.len()];

        for (to_idx, task) in self.tasks.iter().enumerate() {
            for dep in &task.dependencies {
                let from_idx =
                    *index_map
                        .get(dep)
                        .ok_or_else(|| WorkflowError::UnknownDependency {
                            task: task.id.clone(),
                            dependency: dep.clone(),
                        })?;
                // A repeated dependency id would double-count in-degree.
                if reverse_edges[to_idx].contains(&from_idx) {
                    continue;
                }
                forward_edges[from_idx].push(to_idx);
                reverse_edges[to_idx].push(from_idx);
            }
        }

        Ok(TaskGraph {
            tasks: self.tasks,
            forward_edges,
            reverse_edges,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::TaskStatus;

    fn task(id: &str, deps: &[&str]) -> TaskItem {
        TaskItem::new(id, 1, TaskStatus::Pending, deps)
    }

    #[test]
    fn test_build_simple_graph() {
        let graph = DagBuilder::new(vec![
            task("T1", &[]),
            task("T2", &["T1"]),
            task("T3", &["T1"]),
            task("T4", &["T2", "T3"]),
        ])
        .build()
        .unwrap();

        assert_eq!(graph.len(), 4);
        assert_eq!(graph.dependencies(3), &[1, 2]);
        assert_eq!(graph.dependents(0), &[1, 2]);
    }

    #[test]
    fn test_missing_dependency() {
        let err = DagBuilder::new(vec![task("T1", &["nonexistent"])])
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::UnknownDependency { ref dependency, .. } if dependency == "nonexistent"
        ));
    }

    #[test]
    fn test_duplicate_task_id() {
        let err = DagBuilder::new(vec![task("T1", &[]), task("T1", &[])])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Duplicate"));
    }

    #[test]
    fn test_repeated_dependency_counts_once() {
        let graph = DagBuilder::new(vec![task("T1", &[]), task("T2", &["T1", "T1"])])
            .build()
            .unwrap();
        assert_eq!(graph.topological_order().unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_empty_graph() {
        let graph = DagBuilder::new(vec![]).build().unwrap();
        assert!(graph.is_empty());
        assert!(graph.topological_order().unwrap().is_empty());
    }

    #[test]
    fn test_topological_order_is_stable() {
        // T4 is listed first but depends on T3, which is listed last.
        let graph = DagBuilder::new(vec![
            task("T4", &["T3"]),
            task("T1", &[]),
            task("T2", &[]),
            task("T3", &["T1"]),
        ])
        .build()
        .unwrap();
        let order: Vec<&str> = graph
            .topological_order()
            .unwrap()
            .into_iter()
            .map(|i| graph.tasks()[i].id.as_str())
            .collect();
        assert_eq!(order, vec!["T1", "T2", "T3", "T4"]);
    }

    #[test]
    fn test_cycle_names_remaining_tasks() {
        let graph = DagBuilder::new(vec![
            task("T0", &[]),
            task("T1", &["T3"]),
            task("T2", &["T1"]),
            task("T3", &["T2"]),
            task("T4", &["T3"]),
        ])
        .build()
        .unwrap();
        match graph.topological_order().unwrap_err() {
            WorkflowError::Cycle { remaining } => {
                assert_eq!(remaining, vec!["T1", "T2", "T3", "T4"]);
            }
            other => panic!("Expected Cycle, got {other:?}"),
        }
    }
}
