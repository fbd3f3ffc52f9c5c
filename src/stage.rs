//! Workflow stages and the result of running one.

use serde::{Deserialize, Serialize};

/// One top-level step of the workflow.
///
/// The lowercase name doubles as the retry-state key, the CLI subcommand and
/// the suffix of the instruction token (`/specflow.<name>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Specify,
    Plan,
    Tasks,
    Implement,
    Constitution,
    Clarify,
    Checklist,
    Analyze,
}

impl Stage {
    /// Canonical execution order used when several stages run in one workflow.
    pub const ORDER: [Stage; 8] = [
        Stage::Constitution,
        Stage::Specify,
        Stage::Clarify,
        Stage::Plan,
        Stage::Tasks,
        Stage::Checklist,
        Stage::Analyze,
        Stage::Implement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Specify => "specify",
            Stage::Plan => "plan",
            Stage::Tasks => "tasks",
            Stage::Implement => "implement",
            Stage::Constitution => "constitution",
            Stage::Clarify => "clarify",
            Stage::Checklist => "checklist",
            Stage::Analyze => "analyze",
        }
    }

    /// Stages that operate on the project rather than on one spec directory.
    ///
    /// These accept an empty spec name and validate against the specs root.
    pub fn is_project_scoped(&self) -> bool {
        matches!(self, Stage::Specify | Stage::Constitution)
    }

    /// Sort a set of stages into canonical order and drop duplicates.
    pub fn in_canonical_order(stages: &[Stage]) -> Vec<Stage> {
        Self::ORDER
            .iter()
            .copied()
            .filter(|s| stages.contains(s))
            .collect()
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "specify" => Ok(Stage::Specify),
            "plan" => Ok(Stage::Plan),
            "tasks" => Ok(Stage::Tasks),
            "implement" => Ok(Stage::Implement),
            "constitution" => Ok(Stage::Constitution),
            "clarify" => Ok(Stage::Clarify),
            "checklist" => Ok(Stage::Checklist),
            "analyze" => Ok(Stage::Analyze),
            _ => anyhow::bail!(
                "Invalid stage '{}'. Valid values: specify, plan, tasks, implement, constitution, clarify, checklist, analyze",
                s
            ),
        }
    }
}

/// Outcome of one `StageRunner::execute_stage` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    pub stage: Stage,
    pub success: bool,
    /// The retry budget was consumed without success.
    pub exhausted: bool,
    /// Persisted retry count when the call returned.
    pub retry_count: u32,
    /// Last agent or validation failure, if any.
    pub error: Option<String>,
}

impl StageResult {
    pub fn succeeded(stage: Stage, retry_count: u32) -> Self {
        Self {
            stage,
            success: true,
            exhausted: false,
            retry_count,
            error: None,
        }
    }

    pub fn exhausted(stage: Stage, retry_count: u32, error: String) -> Self {
        Self {
            stage,
            success: false,
            exhausted: true,
            retry_count,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display_matches_as_str() {
        for stage in Stage::ORDER {
            assert_eq!(stage.to_string(), stage.as_str());
        }
    }

    #[test]
    fn test_stage_from_str_is_case_insensitive() {
        assert_eq!("PLAN".parse::<Stage>().unwrap(), Stage::Plan);
        assert_eq!(" Implement ".parse::<Stage>().unwrap(), Stage::Implement);
        assert!("deploy".parse::<Stage>().is_err());
    }

    #[test]
    fn test_canonical_order_sorts_and_dedups() {
        let stages = [Stage::Implement, Stage::Specify, Stage::Plan, Stage::Specify];
        assert_eq!(
            Stage::in_canonical_order(&stages),
            vec![Stage::Specify, Stage::Plan, Stage::Implement]
        );
    }

    #[test]
    fn test_project_scoped_stages() {
        assert!(Stage::Specify.is_project_scoped());
        assert!(Stage::Constitution.is_project_scoped());
        assert!(!Stage::Tasks.is_project_scoped());
    }

    #[test]
    fn test_stage_serde_lowercase() {
        let json = serde_json::to_string(&Stage::Checklist).unwrap();
        assert_eq!(json, "\"checklist\"");
    }
}
