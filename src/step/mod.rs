//! The two-phase contract every test step satisfies, plus the built-in step
//! catalog.
//!
//! A step is constructed from its parameter table by the
//! [resolver](crate::resolver), validated once against the case's
//! [RunContext], and then executed once. `validate` normalizes parameters
//! (defaults, placeholder substitution) without touching the outside world;
//! `execute` performs the effect and reports failure through [StepError].
use crate::{context::RunContext, errors::StepError};

mod command;
mod counter;
mod delay;
mod file;
mod message;
pub mod validation;

pub use command::ExecuteCommandStep;
pub use counter::CounterMonitorStep;
pub use delay::DelayStep;
pub use file::FileExistsStep;
pub use message::LogMessageStep;

/// A single pluggable unit of test action.
pub trait Step: Send {
    /// Name under which this step type is registered.
    fn type_name(&self) -> &str;

    /// Check and normalize the bound parameters. Must be repeatable and must
    /// not have effects beyond the step's own fields and log writes.
    fn validate(&mut self, ctx: &mut RunContext) -> Result<(), StepError>;

    /// Perform the step. Only called after a successful `validate`.
    fn execute(&mut self, ctx: &mut RunContext) -> Result<(), StepError>;
}

/// Error for a step whose `execute` was reached without `validate`.
pub(crate) fn not_validated(type_name: &str) -> StepError {
    StepError::execution(format!(
        "{} was executed before it was validated",
        type_name
    ))
}
