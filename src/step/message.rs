use super::{not_validated, validation, Step};
use crate::{
    context::{RunContext, Severity},
    errors::StepError,
};
use serde::Deserialize;

/// Writes a message to the run log. Useful for annotating long cases.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogMessageStep {
    pub message: Option<String>,
    /// `info` (default) or `warning`.
    pub severity: Option<String>,
    #[serde(skip)]
    resolved: Option<(Severity, String)>,
}

impl Step for LogMessageStep {
    fn type_name(&self) -> &str {
        "LogMessageStep"
    }

    fn validate(&mut self, ctx: &mut RunContext) -> Result<(), StepError> {
        self.resolved = None;
        let message = validation::require(&self.message, "message", ctx)?;
        let severity = match self.severity.as_deref() {
            None | Some("info") => Severity::Info,
            Some("warning") => Severity::Warning,
            Some(other) => {
                return Err(StepError::validation(format!(
                    "severity must be one of info, warning; got {}",
                    other
                )))
            }
        };
        self.resolved = Some((severity, message));
        Ok(())
    }

    fn execute(&mut self, ctx: &mut RunContext) -> Result<(), StepError> {
        match &self.resolved {
            Some((Severity::Warning, msg)) => ctx.log_warning(msg.clone()),
            Some((_, msg)) => ctx.log_info(msg.clone()),
            None => return Err(not_validated(self.type_name())),
        }
        Ok(())
    }
}
