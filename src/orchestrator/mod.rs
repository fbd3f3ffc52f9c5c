//! Stage execution and workflow composition.
//!
//! - [`StageRunner`] drives one stage to success or exhaustion.
//! - [`WorkflowOrchestrator`] composes stages and dispatches the implement
//!   stage in one of the [`ImplementMode`]s.

pub mod mode;
pub mod runner;
pub mod workflow;

pub use mode::{ImplementMode, ModeFlags};
pub use runner::StageRunner;
pub use workflow::{ImplementSummary, WorkflowOrchestrator, WorkflowSummary};
