//! Dependency-aware task scheduling.
//!
//! Tasks in `tasks.yaml` declare dependencies on other task ids. This module
//! builds the dependency graph and answers the questions the orchestrator
//! asks before and after each unit of work:
//!
//! - in which order may tasks run ([`order_by_dependency`])
//! - may this task run now ([`dependencies_met`])
//! - where should a phase-by-phase run start ([`first_incomplete_phase`])
//! - did a phase finish ([`is_phase_complete`])
//!
//! ## Example
//!
//! ```
//! use specflow::artifact::{TaskItem, TaskStatus};
//! use specflow::dag::order_by_dependency;
//!
//! let tasks = vec![
//!     TaskItem::new("T1", 1, TaskStatus::Pending, &[]),
//!     TaskItem::new("T2", 1, TaskStatus::Pending, &["T1"]),
//!     TaskItem::new("T3", 1, TaskStatus::Pending, &["T1"]),
//! ];
//! let ordered = order_by_dependency(&tasks).unwrap();
//! let ids: Vec<&str> = ordered.iter().map(|t| t.id.as_str()).collect();
//! assert_eq!(ids, ["T1", "T2", "T3"]);
//! ```

mod builder;
mod scheduler;

pub use builder::{DagBuilder, TaskGraph, TaskIndex};
pub use scheduler::{
    dependencies_met, first_incomplete_phase, is_phase_complete, is_phase_settled,
    order_by_dependency, phase_numbers, tasks_in_phase,
};
