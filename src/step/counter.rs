use super::{not_validated, validation, Step};
use crate::{context::RunContext, errors::StepError};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

const DEFAULT_SLEEP_MS: u64 = 100;

/// Polls a numeric counter until it reaches a target value.
///
/// The counter is read from a file holding a single number, which makes the
/// step usable against anything that can publish a value to disk (a metrics
/// exporter, a test double, a queue depth dumped by a script). The wait is
/// bounded by `timeout_secs`; waiting without a bound must be requested
/// explicitly with `wait_forever`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CounterMonitorStep {
    /// Machine the counter belongs to. Defaults to the local host.
    pub server: Option<String>,
    /// File the counter value is read from.
    pub counter_path: Option<String>,
    /// Value that completes the step.
    pub target_value: Option<f64>,
    /// Delay between reads in milliseconds. Defaults to 100.
    pub sleep_time_ms: Option<u64>,
    /// Maximum time to wait in seconds.
    pub timeout_secs: Option<u64>,
    /// Wait with no timeout.
    pub wait_forever: bool,
    #[serde(skip)]
    resolved: Option<Resolved>,
}

#[derive(Debug)]
struct Resolved {
    server: String,
    path: PathBuf,
    target: f64,
    sleep: Duration,
    timeout: Option<Duration>,
}

impl Step for CounterMonitorStep {
    fn type_name(&self) -> &str {
        "CounterMonitorStep"
    }

    fn validate(&mut self, ctx: &mut RunContext) -> Result<(), StepError> {
        self.resolved = None;
        let path = validation::require(&self.counter_path, "counter_path", ctx)?;
        let target = validation::require_value(self.target_value, "target_value")?;
        if !target.is_finite() {
            return Err(StepError::validation("target_value must be finite"));
        }
        let sleep = validation::positive_duration(
            self.sleep_time_ms.unwrap_or(DEFAULT_SLEEP_MS),
            "sleep_time_ms",
            Duration::from_millis,
        )?;
        let timeout = match (self.timeout_secs, self.wait_forever) {
            (Some(_), true) => {
                return Err(StepError::validation(
                    "timeout_secs and wait_forever are mutually exclusive",
                ))
            }
            (Some(secs), false) => Some(validation::positive_duration(
                secs,
                "timeout_secs",
                Duration::from_secs,
            )?),
            (None, true) => None,
            (None, false) => {
                return Err(StepError::validation(
                    "timeout_secs is required unless wait_forever is set",
                ))
            }
        };

        self.resolved = Some(Resolved {
            server: validation::server_or_local(&self.server, ctx),
            path: PathBuf::from(path),
            target,
            sleep,
            timeout,
        });
        Ok(())
    }

    fn execute(&mut self, ctx: &mut RunContext) -> Result<(), StepError> {
        let res = self
            .resolved
            .as_ref()
            .ok_or_else(|| not_validated(self.type_name()))?;

        ctx.log_info(format!(
            "about to start monitoring: {}\\{} for the target value: {}",
            res.server,
            res.path.display(),
            res.target
        ));
        if res.timeout.is_none() {
            ctx.log_warning("counter monitor is waiting with no timeout");
        }

        let start = Instant::now();
        let mut last = None;
        let mut reads = 0u64;
        loop {
            reads += 1;
            if let Some(value) = read_counter(&res.path) {
                if (value - res.target).abs() <= f64::EPSILON {
                    ctx.log_info(format!(
                        "target hit after {} reads in {:.1}s",
                        reads,
                        start.elapsed().as_secs_f64()
                    ));
                    return Ok(());
                }
                last = Some(value);
            }

            let wait = match res.timeout {
                Some(timeout) => match timeout.checked_sub(start.elapsed()) {
                    Some(left) if !left.is_zero() => res.sleep.min(left),
                    _ => {
                        return Err(StepError::execution(format!(
                            "the target counter value {} was not hit within {}s (last value: {})",
                            res.target,
                            timeout.as_secs(),
                            last.map(|v| v.to_string())
                                .unwrap_or_else(|| "unavailable".to_string())
                        )))
                    }
                },
                None => res.sleep,
            };
            thread::sleep(wait);
        }
    }
}

/// Current counter value, or `None` if the file is missing or unparsable.
fn read_counter(path: &Path) -> Option<f64> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}
