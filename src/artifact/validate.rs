//! Structural checks for the YAML artifacts the agent writes.
//!
//! Each validator collects every violation it finds instead of stopping at
//! the first, and reports them as one [`SchemaError`].

use serde_yaml::{Mapping, Value};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use super::tasks::TaskStatus;
use super::{PLAN_FILE, SPEC_FILE, TASKS_FILE, TaskItem};
use crate::dag::order_by_dependency;

/// Violations found in one artifact file.
///
/// Renders as `schema validation failed for <file>:` followed by one
/// `- <reason>` line per violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    pub file: PathBuf,
    pub reasons: Vec<String>,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema validation failed for {}:", self.file.display())?;
        for reason in &self.reasons {
            write!(f, "\n- {}", reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaError {}

/// Accumulates reasons for one file.
struct Checker {
    file: PathBuf,
    reasons: Vec<String>,
}

impl Checker {
    fn new(file: PathBuf) -> Self {
        Self {
            file,
            reasons: Vec::new(),
        }
    }

    fn fail(&mut self, reason: impl Into<String>) {
        self.reasons.push(reason.into());
    }

    fn load(&mut self) -> Option<Value> {
        let content = match std::fs::read_to_string(&self.file) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.fail("file not found");
                return None;
            }
            Err(e) => {
                self.fail(format!("unreadable: {}", e));
                return None;
            }
        };
        match serde_yaml::from_str::<Value>(&content) {
            Ok(Value::Null) => {
                self.fail("file is empty");
                None
            }
            Ok(value) => Some(value),
            Err(e) => {
                self.fail(format!("invalid YAML: {}", e));
                None
            }
        }
    }

    fn mapping<'a>(&mut self, parent: &'a Value, key: &str) -> Option<&'a Mapping> {
        match parent.get(key) {
            Some(Value::Mapping(m)) => Some(m),
            Some(_) => {
                self.fail(format!("'{}' must be a mapping", key));
                None
            }
            None => {
                self.fail(format!("missing '{}'", key));
                None
            }
        }
    }

    /// Require a non-empty string at `parent[key]`; `path` names it in messages.
    fn string(&mut self, parent: &Value, key: &str, path: &str) -> Option<String> {
        match parent.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            Some(Value::String(_)) => {
                self.fail(format!("'{}' must not be empty", path));
                None
            }
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(_) => {
                self.fail(format!("'{}' must be a string", path));
                None
            }
            None => {
                self.fail(format!("missing '{}'", path));
                None
            }
        }
    }

    fn non_empty_seq<'a>(&mut self, parent: &'a Value, key: &str, path: &str) -> &'a [Value] {
        match parent.get(key) {
            Some(Value::Sequence(items)) if !items.is_empty() => items,
            Some(Value::Sequence(_)) => {
                self.fail(format!("'{}' must contain at least one entry", path));
                &[]
            }
            Some(_) => {
                self.fail(format!("'{}' must be a list", path));
                &[]
            }
            None => {
                self.fail(format!("missing '{}'", path));
                &[]
            }
        }
    }

    fn finish(self) -> Result<(), SchemaError> {
        if self.reasons.is_empty() {
            Ok(())
        } else {
            Err(SchemaError {
                file: self.file,
                reasons: self.reasons,
            })
        }
    }
}

/// Check `<spec_dir>/spec.yaml`.
///
/// Requires `feature.branch`, `feature.description`, a non-empty
/// `user_stories` list whose entries have `id` and `title`, and a non-empty
/// `requirements.functional` list whose entries have `id` and `description`.
pub fn validate_spec_schema(spec_dir: &Path) -> Result<(), SchemaError> {
    let mut c = Checker::new(spec_dir.join(SPEC_FILE));
    let Some(doc) = c.load() else {
        return c.finish();
    };

    if c.mapping(&doc, "feature").is_some() {
        let feature = &doc["feature"];
        c.string(feature, "branch", "feature.branch");
        c.string(feature, "description", "feature.description");
    }

    for (i, story) in c.non_empty_seq(&doc, "user_stories", "user_stories").iter().enumerate() {
        c.string(story, "id", &format!("user_stories[{}].id", i));
        c.string(story, "title", &format!("user_stories[{}].title", i));
    }

    if c.mapping(&doc, "requirements").is_some() {
        let requirements = &doc["requirements"];
        let functional = c.non_empty_seq(requirements, "functional", "requirements.functional");
        for (i, req) in functional.iter().enumerate() {
            c.string(req, "id", &format!("requirements.functional[{}].id", i));
            c.string(
                req,
                "description",
                &format!("requirements.functional[{}].description", i),
            );
        }
    }

    c.finish()
}

/// Check `<spec_dir>/plan.yaml`.
///
/// Requires `plan.branch`, `plan.spec_path`, a non-empty `summary` and a
/// `technical_context` mapping.
pub fn validate_plan_schema(spec_dir: &Path) -> Result<(), SchemaError> {
    let mut c = Checker::new(spec_dir.join(PLAN_FILE));
    let Some(doc) = c.load() else {
        return c.finish();
    };

    if c.mapping(&doc, "plan").is_some() {
        let plan = &doc["plan"];
        c.string(plan, "branch", "plan.branch");
        c.string(plan, "spec_path", "plan.spec_path");
    }
    c.string(&doc, "summary", "summary");
    c.mapping(&doc, "technical_context");

    c.finish()
}

/// Check `<spec_dir>/tasks.yaml`.
///
/// Phases must be numbered contiguously from 1 and titled. Task ids must be
/// unique, statuses valid, dependencies must name existing tasks and must not
/// form a cycle.
pub fn validate_tasks_schema(spec_dir: &Path) -> Result<(), SchemaError> {
    let mut c = Checker::new(spec_dir.join(TASKS_FILE));
    let Some(doc) = c.load() else {
        return c.finish();
    };

    let phases = c.non_empty_seq(&doc, "phases", "phases");
    let mut items: Vec<TaskItem> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (i, phase) in phases.iter().enumerate() {
        let expected = i as u64 + 1;
        let number = match phase.get("number").and_then(Value::as_u64) {
            Some(n) => {
                if n != expected {
                    c.fail(format!(
                        "phases[{}].number is {} but phases must be numbered contiguously from 1 (expected {})",
                        i, n, expected
                    ));
                }
                n as u32
            }
            None => {
                c.fail(format!("phases[{}].number must be a positive integer", i));
                expected as u32
            }
        };
        c.string(phase, "title", &format!("phases[{}].title", i));

        let tasks = match phase.get("tasks") {
            Some(Value::Sequence(tasks)) => tasks.as_slice(),
            Some(_) => {
                c.fail(format!("phases[{}].tasks must be a list", i));
                &[]
            }
            None => {
                c.fail(format!("missing 'phases[{}].tasks'", i));
                &[]
            }
        };

        for (j, task) in tasks.iter().enumerate() {
            let path = format!("phases[{}].tasks[{}]", i, j);
            let Some(id) = c.string(task, "id", &format!("{}.id", path)) else {
                continue;
            };
            if !seen.insert(id.clone()) {
                c.fail(format!("duplicate task id '{}'", id));
                continue;
            }

            let status = match task.get("status") {
                None => TaskStatus::Pending,
                Some(Value::String(s)) => match s.parse::<TaskStatus>() {
                    Ok(status) => status,
                    Err(_) => {
                        c.fail(format!("task {} has invalid status '{}'", id, s));
                        TaskStatus::Pending
                    }
                },
                Some(_) => {
                    c.fail(format!("task {} status must be a string", id));
                    TaskStatus::Pending
                }
            };

            let dependencies: Vec<String> = match task.get("dependencies") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Sequence(deps)) => deps
                    .iter()
                    .filter_map(|d| match d {
                        Value::String(s) => Some(s.clone()),
                        other => {
                            c.fail(format!(
                                "task {} has a non-string dependency: {:?}",
                                id, other
                            ));
                            None
                        }
                    })
                    .collect(),
                Some(_) => {
                    c.fail(format!("task {} dependencies must be a list", id));
                    Vec::new()
                }
            };

            items.push(TaskItem {
                title: String::new(),
                status,
                dependencies,
                phase: number,
                parallel: false,
                id,
            });
        }
    }

    let known: HashSet<&str> = items.iter().map(|t| t.id.as_str()).collect();
    let mut dangling = false;
    for task in &items {
        for dep in &task.dependencies {
            if !known.contains(dep.as_str()) {
                c.fail(format!("task {} depends on unknown task {}", task.id, dep));
                dangling = true;
            }
        }
    }

    // Cycle detection only makes sense once every edge resolves.
    if !dangling && c.reasons.is_empty()
        && let Err(e) = order_by_dependency(&items)
    {
        c.fail(e.to_string());
    }

    c.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const VALID_SPEC: &str = r#"
feature:
  branch: 001-auth
  description: User authentication
user_stories:
  - id: US1
    title: Sign in
requirements:
  functional:
    - id: FR-001
      description: Users can sign in with email
"#;

    const VALID_PLAN: &str = r#"
plan:
  branch: 001-auth
  spec_path: specs/001-auth/spec.yaml
summary: Add session-based authentication
technical_context:
  language: Rust
"#;

    const VALID_TASKS: &str = r#"
phases:
  - number: 1
    title: Setup
    tasks:
      - id: T001
        title: Scaffold
        status: completed
  - number: 2
    title: Core
    tasks:
      - id: T002
        title: Login
        status: pending
        dependencies: [T001]
"#;

    fn dir_with(file: &str, content: &str) -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(file), content).unwrap();
        dir
    }

    #[test]
    fn test_valid_artifacts_pass() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(SPEC_FILE), VALID_SPEC).unwrap();
        fs::write(dir.path().join(PLAN_FILE), VALID_PLAN).unwrap();
        fs::write(dir.path().join(TASKS_FILE), VALID_TASKS).unwrap();
        assert!(validate_spec_schema(dir.path()).is_ok());
        assert!(validate_plan_schema(dir.path()).is_ok());
        assert!(validate_tasks_schema(dir.path()).is_ok());
    }

    #[test]
    fn test_missing_file_reports_not_found() {
        let dir = tempdir().unwrap();
        let err = validate_plan_schema(dir.path()).unwrap_err();
        assert_eq!(err.reasons, vec!["file not found"]);
    }

    #[test]
    fn test_error_format() {
        let dir = dir_with(SPEC_FILE, "feature:\n  branch: 001-auth\n");
        let err = validate_spec_schema(dir.path()).unwrap_err();
        let rendered = err.to_string();
        let mut lines = rendered.lines();
        assert_eq!(
            lines.next().unwrap(),
            format!(
                "schema validation failed for {}:",
                dir.path().join(SPEC_FILE).display()
            )
        );
        let reasons: Vec<&str> = lines.collect();
        assert!(reasons.iter().all(|l| l.starts_with("- ")));
        assert!(reasons.contains(&"- missing 'feature.description'"));
        assert!(reasons.contains(&"- missing 'user_stories'"));
        assert!(reasons.contains(&"- missing 'requirements'"));
    }

    #[test]
    fn test_invalid_yaml() {
        let dir = dir_with(PLAN_FILE, "plan: [unclosed\n");
        let err = validate_plan_schema(dir.path()).unwrap_err();
        assert_eq!(err.reasons.len(), 1);
        assert!(err.reasons[0].starts_with("invalid YAML:"));
    }

    #[test]
    fn test_plan_empty_summary() {
        let content = VALID_PLAN.replace("Add session-based authentication", "\"\"");
        let dir = dir_with(PLAN_FILE, &content);
        let err = validate_plan_schema(dir.path()).unwrap_err();
        assert_eq!(err.reasons, vec!["'summary' must not be empty"]);
    }

    #[test]
    fn test_tasks_non_contiguous_phases() {
        let content = VALID_TASKS.replace("number: 2", "number: 3");
        let dir = dir_with(TASKS_FILE, &content);
        let err = validate_tasks_schema(dir.path()).unwrap_err();
        assert!(err.reasons[0].contains("contiguously"));
    }

    #[test]
    fn test_tasks_unknown_dependency_and_bad_status() {
        let content = VALID_TASKS
            .replace("[T001]", "[T009]")
            .replace("status: pending", "status: finished");
        let dir = dir_with(TASKS_FILE, &content);
        let err = validate_tasks_schema(dir.path()).unwrap_err();
        assert!(err.reasons.iter().any(|r| r.contains("invalid status 'finished'")));
        assert!(err.reasons.iter().any(|r| r == "task T002 depends on unknown task T009"));
    }

    #[test]
    fn test_tasks_duplicate_ids() {
        let content = VALID_TASKS.replace("id: T002", "id: T001").replace("[T001]", "[]");
        let dir = dir_with(TASKS_FILE, &content);
        let err = validate_tasks_schema(dir.path()).unwrap_err();
        assert!(err.reasons.contains(&"duplicate task id 'T001'".to_string()));
    }

    #[test]
    fn test_tasks_cycle() {
        let content = r#"
phases:
  - number: 1
    title: Loop
    tasks:
      - id: T001
        dependencies: [T002]
      - id: T002
        dependencies: [T001]
"#;
        let dir = dir_with(TASKS_FILE, content);
        let err = validate_tasks_schema(dir.path()).unwrap_err();
        assert_eq!(err.reasons.len(), 1);
        assert!(err.reasons[0].contains("Cycle"));
    }

    #[test]
    fn test_tasks_empty_phases() {
        let dir = dir_with(TASKS_FILE, "phases: []\n");
        let err = validate_tasks_schema(dir.path()).unwrap_err();
        assert_eq!(err.reasons, vec!["'phases' must contain at least one entry"]);
    }
}
