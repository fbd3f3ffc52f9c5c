use std::fmt;

/// Raw implement flags as given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeFlags {
    pub resume: bool,
    pub all_phases: bool,
    pub phase: Option<u32>,
    pub from_phase: Option<u32>,
    pub tasks: bool,
    pub from_task: Option<String>,
}

/// How the implement stage is split into agent sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImplementMode {
    /// One session for the whole remaining stage.
    Default { resume: bool },
    /// One session per phase, starting at the first unsettled phase.
    AllPhases,
    /// Exactly one phase.
    SinglePhase(u32),
    /// One session per phase from the given phase onward.
    FromPhase(u32),
    /// One session per task in dependency order.
    AllTasks { from_task: Option<String> },
}

impl ImplementMode {
    /// Pick the mode by priority: task mode, all phases, single phase,
    /// from phase, default. Zero phase numbers count as unset.
    pub fn select(flags: &ModeFlags) -> Self {
        let from_task = flags
            .from_task
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        if flags.tasks || from_task.is_some() {
            return ImplementMode::AllTasks { from_task };
        }
        if flags.all_phases {
            return ImplementMode::AllPhases;
        }
        if let Some(n) = flags.phase.filter(|&n| n > 0) {
            return ImplementMode::SinglePhase(n);
        }
        if let Some(n) = flags.from_phase.filter(|&n| n > 0) {
            return ImplementMode::FromPhase(n);
        }
        ImplementMode::Default {
            resume: flags.resume,
        }
    }
}

impl fmt::Display for ImplementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImplementMode::Default { resume: false } => write!(f, "single session"),
            ImplementMode::Default { resume: true } => write!(f, "single session (resume)"),
            ImplementMode::AllPhases => write!(f, "all phases"),
            ImplementMode::SinglePhase(n) => write!(f, "phase {}", n),
            ImplementMode::FromPhase(n) => write!(f, "phases from {}", n),
            ImplementMode::AllTasks { from_task: None } => write!(f, "all tasks"),
            ImplementMode::AllTasks {
                from_task: Some(id),
            } => write!(f, "tasks from {}", id),
        }
    }
}
