use super::{not_validated, validation, Step};
use crate::{context::RunContext, errors::StepError};
use serde::Deserialize;
use std::{thread, time::Duration};

/// Blocks the case for a fixed time, e.g. to let an external system settle.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DelayStep {
    /// Length of the delay in milliseconds.
    pub delay_ms: Option<u64>,
    #[serde(skip)]
    delay: Option<Duration>,
}

impl Step for DelayStep {
    fn type_name(&self) -> &str {
        "DelayStep"
    }

    fn validate(&mut self, _ctx: &mut RunContext) -> Result<(), StepError> {
        self.delay = None;
        let ms = validation::require_value(self.delay_ms, "delay_ms")?;
        self.delay = Some(validation::positive_duration(
            ms,
            "delay_ms",
            Duration::from_millis,
        )?);
        Ok(())
    }

    fn execute(&mut self, ctx: &mut RunContext) -> Result<(), StepError> {
        let delay = self.delay.ok_or_else(|| not_validated(self.type_name()))?;
        ctx.log_info(format!("about to wait for {}ms", delay.as_millis()));
        thread::sleep(delay);
        ctx.log_info(format!("waited {}ms", delay.as_millis()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn sleeps_for_configured_time() {
        let mut ctx = RunContext::new("t");
        let mut step = DelayStep {
            delay_ms: Some(30),
            ..Default::default()
        };
        step.validate(&mut ctx).unwrap();
        let start = Instant::now();
        step.execute(&mut ctx).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(ctx.entries().len(), 2);
    }

    #[test]
    fn requires_delay() {
        let mut ctx = RunContext::new("t");
        assert!(DelayStep::default().validate(&mut ctx).is_err());
    }
}
