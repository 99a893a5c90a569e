use crate::{
    cli,
    context::{LogEntry, Severity},
    errors::StepError,
};
use std::{fmt, time::Duration};

/// Overall status of a test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Passed,
    Failed,
}

/// What happened to one step of a case.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The step validated and executed successfully.
    Passed,
    /// The step failed to resolve, validate, or execute.
    Failed(StepError),
    /// The case stopped before this step ran.
    NotRun,
}

/// Outcome of a single step, in declared order.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// Position of the step in the case.
    pub index: usize,
    /// Configured type name of the step.
    pub type_name: String,
    pub outcome: Outcome,
}

/// Result of running one test case.
#[derive(Debug)]
pub struct Case {
    /// Name of the test case.
    pub name: String,
    pub status: Status,
    /// One entry per declared step.
    pub steps: Vec<StepResult>,
    /// Everything the case logged, including on failure.
    pub log: Vec<LogEntry>,
    /// Wall time spent in the case.
    pub duration: Duration,
}

impl Case {
    /// Result for a case whose runner died before producing a result.
    pub fn aborted(name: String, reason: String) -> Self {
        let message = format!("test case aborted: {}", reason);
        Self {
            name,
            status: Status::Failed,
            steps: Vec::new(),
            log: vec![LogEntry {
                severity: Severity::Error,
                error: Some(StepError::execution(message.clone())),
                message,
                step: None,
            }],
            duration: Duration::default(),
        }
    }

    pub fn passed(&self) -> bool {
        self.status == Status::Passed
    }

    /// The step that failed the case, if any.
    pub fn failure(&self) -> Option<(&StepResult, &StepError)> {
        self.steps.iter().find_map(|step| match &step.outcome {
            Outcome::Failed(err) => Some((step, err)),
            _ => None,
        })
    }

    fn matches_only(&self, only: &cli::OnlyOpt) -> bool {
        use cli::OnlyOpt as O;
        match only {
            O::Fail => !self.passed(),
            O::Pass => self.passed(),
        }
    }

    /// Returns true if this case should be printed with the current options.
    pub fn should_print(&self, opts: &cli::Opts) -> bool {
        match &opts.post_filter {
            Some(only) => self.matches_only(only),
            None => true,
        }
    }

    /// Generate colorized string to report the results of this case.
    pub fn report_str(&self, show_log: bool) -> String {
        use colored::*;

        let mut buf = String::new();
        let secs = format!(" ({:.2}s)", self.duration.as_secs_f64());
        match self.status {
            Status::Passed => {
                buf.push_str(&"✓ ".green().to_string());
                buf.push_str(&self.name.green().to_string());
                buf.push_str(&secs.dimmed().to_string());
            }
            Status::Failed => {
                buf.push_str(&"✗ ".red().to_string());
                buf.push_str(&self.name.red().to_string());
                buf.push_str(&secs.dimmed().to_string());
                if let Some((step, err)) = self.failure() {
                    buf.push_str(&format!(
                        "\n  step {} ({}): {}",
                        step.index, step.type_name, err
                    ));
                }
            }
        }

        if show_log {
            for step in &self.steps {
                let mark = match step.outcome {
                    Outcome::Passed => "pass".green(),
                    Outcome::Failed(_) => "fail".red(),
                    Outcome::NotRun => "not run".dimmed(),
                };
                buf.push_str(&format!(
                    "\n  [{}] {} {}",
                    step.index, step.type_name, mark
                ));
            }
            for entry in &self.log {
                let line = match entry.severity {
                    Severity::Info => entry.message.normal(),
                    Severity::Warning => entry.message.yellow(),
                    Severity::Error => entry.message.red(),
                };
                buf.push_str("\n    ");
                buf.push_str(&line.to_string());
            }
        }
        buf
    }
}

/// Pass/fail counts over a run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub passed: i32,
    pub failed: i32,
}

impl Summary {
    pub fn add(&mut self, case: &Case) {
        if case.passed() {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use colored::*;
        write!(
            f,
            "  {} / {}",
            format!("{} passing", self.passed).green(),
            format!("{} failing", self.failed).red()
        )
    }
}
