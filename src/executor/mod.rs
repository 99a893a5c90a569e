//! An executor is responsible for running test cases and generating results.

pub mod case;
pub mod results;
pub mod suite;
mod harness;

pub use case::{run_case, CaseDefinition, Phase, StepDefinition, TestCase};
pub use harness::Harness;
