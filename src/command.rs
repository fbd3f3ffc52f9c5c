//! Instruction text sent to the agent, and the resume commands shown to users.
//!
//! An instruction has the shape
//!
//! ```text
//! /specflow.<stage>[ --resume][ --phase N| --task ID][ '<prompt>']
//! ```
//!
//! The agent receives it as a single argument. The prompt is single-quoted
//! with embedded quotes escaped POSIX-style so the text survives being pasted
//! into a shell verbatim.

use std::fmt;

use crate::stage::Stage;

/// Name of the binary used in resume hints.
pub const BIN_NAME: &str = "specflow";

/// Narrows an implement invocation to one phase or one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Phase(u32),
    Task(String),
}

/// A rendered-on-demand agent instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub stage: Stage,
    pub resume: bool,
    pub scope: Option<Scope>,
    pub prompt: Option<String>,
}

impl Instruction {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            resume: false,
            scope: None,
            prompt: None,
        }
    }

    pub fn resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn phase(mut self, phase: u32) -> Self {
        self.scope = Some(Scope::Phase(phase));
        self
    }

    pub fn task(mut self, id: impl Into<String>) -> Self {
        self.scope = Some(Scope::Task(id.into()));
        self
    }

    /// Attach free-form text. Empty or whitespace-only prompts are dropped.
    pub fn prompt(mut self, prompt: Option<&str>) -> Self {
        self.prompt = prompt
            .filter(|p| !p.trim().is_empty())
            .map(str::to_string);
        self
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/specflow.{}", self.stage)?;
        if self.resume {
            f.write_str(" --resume")?;
        }
        match &self.scope {
            Some(Scope::Phase(n)) => write!(f, " --phase {}", n)?,
            Some(Scope::Task(id)) => write!(f, " --task {}", id)?,
            None => {}
        }
        if let Some(prompt) = &self.prompt {
            write!(f, " {}", shell_quote(prompt))?;
        }
        Ok(())
    }
}

/// Wrap text in single quotes, replacing each `'` with `'\''`.
pub fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

/// Resume hint for a stage run outside implementation mode dispatch.
pub fn resume_stage(stage: Stage, spec: &str) -> String {
    with_spec(format!("{} {}", BIN_NAME, stage), spec)
}

/// Resume hint for the single-session implement mode.
pub fn resume_implement(spec: &str) -> String {
    with_spec(format!("{} implement --resume", BIN_NAME), spec)
}

pub fn resume_phase(spec: &str, phase: u32) -> String {
    with_spec(format!("{} implement --phase {}", BIN_NAME, phase), spec)
}

pub fn resume_task(spec: &str, id: &str) -> String {
    with_spec(format!("{} implement --from-task {}", BIN_NAME, id), spec)
}

/// Pin the command to `spec` so resolution cannot pick another one.
fn with_spec(command: String, spec: &str) -> String {
    if spec.trim().is_empty() {
        command
    } else {
        format!("{} --spec {}", command, spec)
    }
}
