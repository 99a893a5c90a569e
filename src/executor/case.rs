//! Sequencing of the steps of one test case.
use super::results::{self, Outcome, Status, StepResult};
use crate::{
    context::RunContext,
    errors::StepError,
    resolver::{Params, StepRegistry},
    step::{validation, Step},
};
use std::{
    any::Any,
    collections::HashMap,
    panic::{self, AssertUnwindSafe},
    time::Instant,
};

/// A step as named by a test definition.
#[derive(Debug, Clone)]
pub struct StepDefinition {
    /// Registered type name of the step.
    pub type_name: String,
    /// Extension module to resolve the type in.
    pub module: Option<String>,
    /// Parameters bound onto the step before validation.
    pub params: Params,
}

/// A test case as named by a test definition.
#[derive(Debug, Clone, Default)]
pub struct CaseDefinition {
    pub name: String,
    /// Substitutions for this case only. They override suite-wide values.
    pub substitutions: HashMap<String, String>,
    pub steps: Vec<StepDefinition>,
}

/// Where a case is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    Validating,
    Executing,
    Completed(Status),
}

/// An ordered sequence of constructed steps, run as one unit of pass/fail.
pub struct TestCase {
    name: String,
    steps: Vec<Box<dyn Step>>,
    phase: Phase,
}

impl TestCase {
    pub fn new<S: Into<String>>(name: S, steps: Vec<Box<dyn Step>>) -> Self {
        Self {
            name: name.into(),
            steps,
            phase: Phase::NotStarted,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Construct every step of `def`. Fails with the index of the first step
    /// that could not be resolved or bound; nothing is kept in that case.
    pub fn resolve(
        def: &CaseDefinition,
        registry: &StepRegistry,
    ) -> Result<Self, (usize, StepError)> {
        let steps = def
            .steps
            .iter()
            .enumerate()
            .map(|(idx, step)| {
                registry
                    .instantiate(
                        &step.type_name,
                        step.module.as_deref(),
                        step.params.clone(),
                    )
                    .map_err(|err| (idx, err))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(def.name.clone(), steps))
    }

    fn enter(&mut self, phase: Phase) {
        tracing::debug!(case = %self.name, ?phase, "phase change");
        self.phase = phase;
    }

    /// Validate every step, then execute them in order. The first failure in
    /// either pass stops the case; the log is returned whatever happens.
    pub fn run(mut self, mut ctx: RunContext) -> results::Case {
        let start = Instant::now();
        let mut outcomes = vec![Outcome::NotRun; self.steps.len()];

        self.enter(Phase::Validating);
        ctx.log_info(format!(
            "validating {} steps of {}",
            self.steps.len(),
            self.name
        ));
        let mut failed = false;
        for (idx, step) in self.steps.iter_mut().enumerate() {
            ctx.set_current_step(Some(idx));
            if let Err(err) = guarded(|| step.validate(&mut ctx)) {
                ctx.log_error(&err);
                outcomes[idx] = Outcome::Failed(err);
                failed = true;
                break;
            }
        }

        if !failed {
            self.enter(Phase::Executing);
            for (idx, step) in self.steps.iter_mut().enumerate() {
                ctx.set_current_step(Some(idx));
                ctx.log_info(format!("step {}: {}", idx, step.type_name()));
                match guarded(|| step.execute(&mut ctx)) {
                    Ok(()) => outcomes[idx] = Outcome::Passed,
                    Err(err) => {
                        ctx.log_error(&err);
                        outcomes[idx] = Outcome::Failed(err);
                        failed = true;
                        break;
                    }
                }
            }
        }

        ctx.set_current_step(None);
        let status = if failed { Status::Failed } else { Status::Passed };
        self.enter(Phase::Completed(status));

        let steps = self
            .steps
            .iter()
            .zip(outcomes)
            .enumerate()
            .map(|(index, (step, outcome))| StepResult {
                index,
                type_name: step.type_name().to_string(),
                outcome,
            })
            .collect();

        results::Case {
            name: self.name,
            status,
            steps,
            log: ctx.into_log(),
            duration: start.elapsed(),
        }
    }
}

/// Run one phase of a step, turning a panic into an execution error so the
/// case still reports its log and per-step outcomes.
fn guarded<F>(phase: F) -> Result<(), StepError>
where
    F: FnOnce() -> Result<(), StepError>,
{
    panic::catch_unwind(AssertUnwindSafe(phase)).unwrap_or_else(|payload| {
        Err(StepError::execution(format!(
            "step panicked: {}",
            panic_message(payload.as_ref())
        )))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}

/// Build the run context for `def`: suite-wide substitutions, overridden by
/// the case's own, with `host` bound to the local machine unless set.
pub fn case_context(
    def: &CaseDefinition,
    globals: &HashMap<String, String>,
) -> RunContext {
    let mut ctx = RunContext::new(def.name.clone());
    ctx.set_substitution("host", validation::local_host());
    for (name, value) in globals.iter().chain(def.substitutions.iter()) {
        ctx.set_substitution(name.clone(), value.clone());
    }
    ctx
}

/// Resolve, validate, and execute the case `def`. Never fails: resolution,
/// validation, and execution errors all become a failed result.
pub fn run_case(
    def: &CaseDefinition,
    registry: &StepRegistry,
    globals: &HashMap<String, String>,
) -> results::Case {
    let start = Instant::now();
    let mut ctx = case_context(def, globals);

    match TestCase::resolve(def, registry) {
        Ok(case) => case.run(ctx),
        Err((failed_idx, err)) => {
            ctx.set_current_step(Some(failed_idx));
            ctx.log_error(&err);
            let mut err = Some(err);
            let steps = def
                .steps
                .iter()
                .enumerate()
                .map(|(index, step)| {
                    let failed = if index == failed_idx { err.take() } else { None };
                    StepResult {
                        index,
                        type_name: step.type_name.clone(),
                        outcome: failed.map_or(Outcome::NotRun, Outcome::Failed),
                    }
                })
                .collect();
            results::Case {
                name: def.name.clone(),
                status: Status::Failed,
                steps,
                log: ctx.into_log(),
                duration: start.elapsed(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use std::sync::{Arc, Mutex};

    /// Records every call made on it into a shared journal.
    struct Recorder {
        id: usize,
        journal: Arc<Mutex<Vec<String>>>,
        fail_validate: bool,
        fail_execute: bool,
        panic_execute: bool,
    }

    impl Step for Recorder {
        fn type_name(&self) -> &str {
            "Recorder"
        }

        fn validate(&mut self, _: &mut RunContext) -> Result<(), StepError> {
            self.journal.lock().unwrap().push(format!("validate {}", self.id));
            if self.fail_validate {
                return Err(StepError::validation("required param unset"));
            }
            Ok(())
        }

        fn execute(&mut self, ctx: &mut RunContext) -> Result<(), StepError> {
            self.journal.lock().unwrap().push(format!("execute {}", self.id));
            ctx.log_info(format!("recorder {}", self.id));
            if self.panic_execute {
                panic!("recorder {} blew up", self.id);
            }
            if self.fail_execute {
                return Err(StepError::execution("recorder failed"));
            }
            Ok(())
        }
    }

    fn recorders(
        n: usize,
        journal: &Arc<Mutex<Vec<String>>>,
    ) -> Vec<Recorder> {
        (0..n)
            .map(|id| Recorder {
                id,
                journal: Arc::clone(journal),
                fail_validate: false,
                fail_execute: false,
                panic_execute: false,
            })
            .collect()
    }

    fn boxed(recorders: Vec<Recorder>) -> Vec<Box<dyn Step>> {
        recorders
            .into_iter()
            .map(|p| Box::new(p) as Box<dyn Step>)
            .collect()
    }

    #[test]
    fn all_steps_pass_in_order() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let case = TestCase::new("ok", boxed(recorders(3, &journal)));
        let res = case.run(RunContext::new("ok"));

        assert_eq!(res.status, Status::Passed);
        assert_eq!(res.steps.len(), 3);
        assert!(res.steps.iter().all(|s| s.outcome == Outcome::Passed));
        assert_eq!(
            *journal.lock().unwrap(),
            vec![
                "validate 0", "validate 1", "validate 2", "execute 0",
                "execute 1", "execute 2"
            ]
        );
    }

    #[test]
    fn validation_failure_executes_nothing() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut steps = recorders(3, &journal);
        steps[1].fail_validate = true;
        let res = TestCase::new("bad", boxed(steps)).run(RunContext::new("bad"));

        assert_eq!(res.status, Status::Failed);
        assert_eq!(*journal.lock().unwrap(), vec!["validate 0", "validate 1"]);
        assert_eq!(res.steps[0].outcome, Outcome::NotRun);
        match &res.steps[1].outcome {
            Outcome::Failed(err) => assert_eq!(err.kind, ErrorKind::Validation),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(res.steps[2].outcome, Outcome::NotRun);
    }

    #[test]
    fn execution_failure_stops_remaining_steps() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut steps = recorders(3, &journal);
        steps[1].fail_execute = true;
        let res = TestCase::new("stop", boxed(steps)).run(RunContext::new("stop"));

        assert_eq!(res.status, Status::Failed);
        assert!(!journal.lock().unwrap().contains(&"execute 2".to_string()));
        assert_eq!(res.steps[0].outcome, Outcome::Passed);
        assert_eq!(
            res.steps[1].outcome,
            Outcome::Failed(StepError::execution("recorder failed"))
        );
        assert_eq!(res.steps[2].outcome, Outcome::NotRun);
        // The log survives the failure.
        assert!(res.log.iter().any(|e| e.message == "recorder 0"));
        assert!(res.log.iter().any(|e| e.error.is_some()));
    }

    #[test]
    fn panicking_step_keeps_log_and_outcomes() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut steps = recorders(3, &journal);
        steps[1].panic_execute = true;
        let res = TestCase::new("panic", boxed(steps)).run(RunContext::new("panic"));

        assert_eq!(res.status, Status::Failed);
        assert_eq!(res.steps.len(), 3);
        assert_eq!(res.steps[0].outcome, Outcome::Passed);
        match &res.steps[1].outcome {
            Outcome::Failed(err) => {
                assert_eq!(err.kind, ErrorKind::Execution);
                assert!(err.message.contains("recorder 1 blew up"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(res.steps[2].outcome, Outcome::NotRun);
        assert!(res.log.iter().any(|e| e.message == "recorder 0"));
        assert!(!journal.lock().unwrap().contains(&"execute 2".to_string()));
    }

    #[test]
    fn phases_advance() {
        let case = TestCase::new("empty", Vec::new());
        assert_eq!(case.phase(), Phase::NotStarted);
        let res = case.run(RunContext::new("empty"));
        assert_eq!(res.status, Status::Passed);
        assert!(res.steps.is_empty());
    }

    #[test]
    fn unresolvable_step_fails_case_before_running() {
        let registry = StepRegistry::with_builtins();
        let def = CaseDefinition {
            name: "unresolved".to_string(),
            substitutions: HashMap::new(),
            steps: vec![
                StepDefinition {
                    type_name: "LogMessageStep".to_string(),
                    module: None,
                    params: toml::from_str("message = 'hi'").unwrap(),
                },
                StepDefinition {
                    type_name: "Missing".to_string(),
                    module: None,
                    params: Params::new(),
                },
            ],
        };
        let res = run_case(&def, &registry, &HashMap::new());

        assert_eq!(res.status, Status::Failed);
        assert_eq!(res.steps[0].outcome, Outcome::NotRun);
        match &res.steps[1].outcome {
            Outcome::Failed(err) => {
                assert_eq!(err.kind, ErrorKind::TypeResolution)
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(!res.log.iter().any(|e| e.message == "hi"));
    }

    #[test]
    fn case_substitutions_override_globals() {
        let mut globals = HashMap::new();
        globals.insert("env".to_string(), "staging".to_string());
        globals.insert("region".to_string(), "eu".to_string());
        let mut def = CaseDefinition::default();
        def.substitutions.insert("env".to_string(), "prod".to_string());

        let ctx = case_context(&def, &globals);
        assert_eq!(ctx.substitute_wildcards("${env}/${region}"), "prod/eu");
        assert!(ctx.substitution("host").is_some());
    }
}
