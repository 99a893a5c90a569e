//! The run context threaded through every step of one test case.
//!
//! A [RunContext] owns the ordered log and the substitution table for a
//! single test case. It is created by the runner when the case starts and
//! consumed when the case result is built, so no step can keep hold of it.
use crate::errors::StepError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

/// Placeholders look like `${name}`.
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_.\-]*)\}")
        .expect("placeholder pattern is valid")
});

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One entry in the run log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub severity: Severity,
    pub message: String,
    /// Index of the step that was active when the entry was written.
    pub step: Option<usize>,
    /// Error associated with the entry, if any.
    pub error: Option<StepError>,
}

/// Mutable state shared by all steps of a single test case.
#[derive(Debug)]
pub struct RunContext {
    case_name: String,
    current_step: Option<usize>,
    substitutions: HashMap<String, String>,
    log: Vec<LogEntry>,
}

impl RunContext {
    /// Construct an empty context for the test case `case_name`.
    pub fn new<S: Into<String>>(case_name: S) -> Self {
        Self {
            case_name: case_name.into(),
            current_step: None,
            substitutions: HashMap::new(),
            log: Vec::new(),
        }
    }

    /// Replace the substitution table.
    pub fn with_substitutions(mut self, subs: HashMap<String, String>) -> Self {
        self.substitutions = subs;
        self
    }

    /// Bind `name` to `value`. Used by the runner during case setup; steps
    /// only read the table.
    pub fn set_substitution<K, V>(&mut self, name: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.substitutions.insert(name.into(), value.into());
    }

    pub fn substitution(&self, name: &str) -> Option<&str> {
        self.substitutions.get(name).map(String::as_str)
    }

    pub fn case_name(&self) -> &str {
        &self.case_name
    }

    pub fn current_step(&self) -> Option<usize> {
        self.current_step
    }

    pub(crate) fn set_current_step(&mut self, idx: Option<usize>) {
        self.current_step = idx;
    }

    /// Replace every `${name}` whose name is bound in the substitution table.
    /// Unbound placeholders are left as they are. A single pass is made, so
    /// placeholders produced by a substituted value are not expanded again.
    pub fn substitute_wildcards(&self, text: &str) -> String {
        PLACEHOLDER
            .replace_all(text, |caps: &Captures| {
                match self.substitutions.get(&caps[1]) {
                    Some(value) => value.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    pub fn log_info<S: Into<String>>(&mut self, message: S) {
        self.push(Severity::Info, message.into(), None);
    }

    pub fn log_warning<S: Into<String>>(&mut self, message: S) {
        self.push(Severity::Warning, message.into(), None);
    }

    /// Record an error in the log.
    pub fn log_error(&mut self, error: &StepError) {
        self.push(Severity::Error, error.to_string(), Some(error.clone()));
    }

    /// All entries logged so far, oldest first.
    pub fn entries(&self) -> &[LogEntry] {
        &self.log
    }

    /// Consume the context and return its log.
    pub fn into_log(self) -> Vec<LogEntry> {
        self.log
    }

    fn push(
        &mut self,
        severity: Severity,
        message: String,
        error: Option<StepError>,
    ) {
        let case = self.case_name.as_str();
        let step = self.current_step;
        match severity {
            Severity::Info => tracing::info!(case, ?step, "{}", message),
            Severity::Warning => tracing::warn!(case, ?step, "{}", message),
            Severity::Error => tracing::error!(case, ?step, "{}", message),
        }
        self.log.push(LogEntry {
            severity,
            message,
            step,
            error,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RunContext {
        let mut ctx = RunContext::new("subs");
        ctx.set_substitution("host", "build-01");
        ctx.set_substitution("dir", "/tmp/out");
        ctx
    }

    #[test]
    fn replaces_bound_placeholders() {
        assert_eq!(
            ctx().substitute_wildcards("ssh ${host} ls ${dir}/${host}"),
            "ssh build-01 ls /tmp/out/build-01"
        );
    }

    #[test]
    fn leaves_unbound_and_malformed_tokens() {
        let text = "${missing} $host ${ host} ${1bad} {dir}";
        assert_eq!(ctx().substitute_wildcards(text), text);
    }

    #[test]
    fn substitution_is_idempotent() {
        let ctx = ctx();
        let once = ctx.substitute_wildcards("${host}:${dir}:${nope}");
        assert_eq!(ctx.substitute_wildcards(&once), once);
    }

    #[test]
    fn single_pass_does_not_expand_produced_placeholders() {
        let mut ctx = RunContext::new("loop");
        ctx.set_substitution("a", "${a}");
        ctx.set_substitution("b", "${c}");
        ctx.set_substitution("c", "C");
        assert_eq!(ctx.substitute_wildcards("${a}-${b}"), "${a}-${c}");
    }

    #[test]
    fn log_records_step_and_error() {
        let mut ctx = RunContext::new("log");
        ctx.log_info("setup");
        ctx.set_current_step(Some(2));
        let err = StepError::execution("exit code 3");
        ctx.log_error(&err);

        let log = ctx.into_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].severity, Severity::Info);
        assert_eq!(log[0].step, None);
        assert_eq!(log[1].severity, Severity::Error);
        assert_eq!(log[1].step, Some(2));
        assert_eq!(log[1].error, Some(err));
    }
}
