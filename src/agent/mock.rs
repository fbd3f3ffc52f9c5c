//! Scripted agent for engine tests.

use async_trait::async_trait;
use std::sync::Mutex;

use super::{Agent, ExecOptions, ExecResult};
use crate::errors::AgentError;

type Behavior = Box<dyn Fn(&str, usize) -> Result<ExecResult, AgentError> + Send + Sync>;

/// Records every instruction and answers with a closure of
/// `(instruction, zero-based call index)`.
pub struct MockAgent {
    calls: Mutex<Vec<String>>,
    behavior: Behavior,
}

impl MockAgent {
    pub fn new(
        behavior: impl Fn(&str, usize) -> Result<ExecResult, AgentError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            behavior: Box::new(behavior),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(|_, _| Ok(ExecResult { exit_code: 0 }))
    }

    pub fn failing() -> Self {
        Self::new(|_, _| Ok(ExecResult { exit_code: 1 }))
    }

    /// Fails the first `n` calls, then succeeds.
    pub fn failing_times(n: usize) -> Self {
        Self::new(move |_, i| {
            Ok(ExecResult {
                exit_code: if i < n { 1 } else { 0 },
            })
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Agent for MockAgent {
    async fn execute(
        &self,
        instruction: &str,
        _options: &ExecOptions,
    ) -> Result<ExecResult, AgentError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(instruction.to_string());
            calls.len() - 1
        };
        (self.behavior)(instruction, index)
    }
}
