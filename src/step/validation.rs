//! Helpers shared by step `validate` implementations.
use crate::{context::RunContext, errors::StepError};
use std::time::Duration;

/// Default timeout for steps that wait on something external.
pub const DEFAULT_TIMEOUT_SECS: u64 = 1200;

/// Return the substituted value of a required string parameter. Missing and
/// blank values are validation errors.
pub fn require(
    value: &Option<String>,
    field: &str,
    ctx: &RunContext,
) -> Result<String, StepError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(ctx.substitute_wildcards(v)),
        Some(_) => Err(StepError::validation(format!(
            "{} must not be empty",
            field
        ))),
        None => Err(StepError::validation(format!("{} is required", field))),
    }
}

/// Substitute an optional string parameter. Blank values count as unset.
pub fn optional(value: &Option<String>, ctx: &RunContext) -> Option<String> {
    value
        .as_ref()
        .filter(|v| !v.trim().is_empty())
        .map(|v| ctx.substitute_wildcards(v))
}

/// A required numeric parameter.
pub fn require_value<T: Copy>(
    value: Option<T>,
    field: &str,
) -> Result<T, StepError> {
    value.ok_or_else(|| StepError::validation(format!("{} is required", field)))
}

/// A strictly positive duration in the given unit.
pub fn positive_duration(
    value: u64,
    field: &str,
    unit: fn(u64) -> Duration,
) -> Result<Duration, StepError> {
    if value == 0 {
        return Err(StepError::validation(format!(
            "{} must be greater than zero",
            field
        )));
    }
    Ok(unit(value))
}

/// Identity of the machine running the test. Bound to the `host`
/// substitution and used as the default target server.
pub fn local_host() -> String {
    ["HOSTNAME", "COMPUTERNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// Target server for a step: the substituted parameter if set, the `host`
/// substitution otherwise, falling back to [local_host].
pub fn server_or_local(value: &Option<String>, ctx: &RunContext) -> String {
    optional(value, ctx).unwrap_or_else(|| {
        ctx.substitution("host")
            .map(str::to_string)
            .unwrap_or_else(local_host)
    })
}
