//! stepcase is a test-step orchestration framework.
//!
//! A test case is an ordered list of *steps*: clear a directory, run a
//! process, wait for a counter to reach a value. Each step is an independent,
//! pluggable unit that is named in configuration, resolved by name at run
//! time, and driven through the same two phases:
//!   - `validate` checks and normalizes the step's parameters (required
//!     values, defaults, `${name}` substitutions) without side effects;
//!   - `execute` performs the step's effect and reports failure as an error.
//!
//! All steps of a case share one [RunContext](context::RunContext) holding
//! the substitution table and the case log.
//!
//! ## Test Definitions
//! The `stepcase` binary reads a `stepcase.toml` file:
//! ```toml
//! ver = "0.1.0"
//! # (Optional) Substitutions shared by every case.
//! [substitutions]
//! out = "target/out"
//! # (Optional) More files holding [[cases]].
//! # case_files = [ "cases/*.toml" ]
//!
//! [[cases]]
//! name = "Build artifacts"
//!
//! [[cases.steps]]
//! type = "ExecuteCommandStep"
//! process_name = "make"
//! process_params = "OUT=${out}"
//! # (Optional) Timeout in seconds. Defaults to 1200 seconds.
//! timeout_secs = 600
//!
//! [[cases.steps]]
//! type = "FileExistsStep"
//! path = "${out}/app.bin"
//! ```
//! Every key of a step other than `type` and `module` is a parameter of the
//! step. `${host}` is bound to the local machine unless overridden.
//!
//! ## Failure Policy
//! Every step of a case is validated before any step executes. The first
//! validation failure fails the case without executing anything; the first
//! execution failure stops the remaining steps. The result always carries
//! the full log so a partial run can be diagnosed.
//!
//! ## Extending
//! New step types implement [Step](step::Step) and are registered by name
//! in a [StepRegistry](resolver::StepRegistry), either in the core catalog
//! or in a named module that test definitions select with `module = "..."`.
//! ```
//! use serde::Deserialize;
//! use stepcase::{context::RunContext, errors::StepError, resolver, step::Step};
//!
//! #[derive(Default, Deserialize)]
//! struct Ping { target: Option<String> }
//!
//! impl Step for Ping {
//!     fn type_name(&self) -> &str { "Ping" }
//!     fn validate(&mut self, ctx: &mut RunContext) -> Result<(), StepError> {
//!         let target = stepcase::step::validation::require(&self.target, "target", ctx)?;
//!         self.target = Some(target);
//!         Ok(())
//!     }
//!     fn execute(&mut self, ctx: &mut RunContext) -> Result<(), StepError> {
//!         ctx.log_info(format!("pinging {:?}", self.target));
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = resolver::StepRegistry::with_builtins();
//! registry.register_module("net", |m| {
//!     m.register("Ping", resolver::factory_for::<Ping>());
//! });
//! assert!(registry.resolve("Ping", Some("net")).is_ok());
//! ```
//!
//! ## Running
//! `stepcase <dir>` runs every case, several at a time, and prints one line
//! per case followed by a summary. `-v` shows per-step outcomes and logs,
//! `-o fail` shows only failing cases, `-i`/`-e` select cases by a regex over
//! their names, and `-n` resolves everything without running it. The exit
//! code is the number of failing cases.
pub mod cli;
pub mod context;
pub mod diff;
pub mod errors;
pub mod executor;
pub mod logging;
pub mod picker;
pub mod resolver;
pub mod step;

pub use context::RunContext;
pub use errors::{ErrorKind, StepError};
pub use executor::results;
pub use resolver::StepRegistry;
pub use step::Step;
