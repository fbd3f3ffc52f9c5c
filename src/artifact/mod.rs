//! Agent-produced YAML artifacts: reading `tasks.yaml` and schema checks.

pub mod tasks;
pub mod validate;

pub use tasks::{
    PhaseInfo, TaskItem, TaskStats, TaskStatus, TasksFile, get_all_tasks, get_phase_info,
    get_task_by_id, get_task_stats,
};
pub use validate::{SchemaError, validate_plan_schema, validate_spec_schema, validate_tasks_schema};

pub const SPEC_FILE: &str = "spec.yaml";
pub const PLAN_FILE: &str = "plan.yaml";
pub const TASKS_FILE: &str = "tasks.yaml";
pub const CHECKLISTS_DIR: &str = "checklists";
