use super::{case, results, suite::Suite};
use crate::{cli, errors::HarnessError, resolver::StepRegistry};
use futures::{
    io::{AllowStdIo, AsyncWriteExt},
    stream, StreamExt,
};
use std::{collections::HashMap, sync::Arc};
use tokio::task;

/// A harness runs independent test cases concurrently. Every case gets its
/// own run context on a blocking worker thread; nothing is shared between
/// cases except the read-only registry and suite-wide substitutions.
pub struct Harness {
    registry: Arc<StepRegistry>,
    substitutions: Arc<HashMap<String, String>>,
    cases: Vec<case::CaseDefinition>,
}

impl Harness {
    pub fn new(registry: StepRegistry, suite: Suite) -> Self {
        Self {
            registry: Arc::new(registry),
            substitutions: Arc::new(suite.substitutions),
            cases: suite.cases,
        }
    }

    pub fn num_cases(&self) -> usize {
        self.cases.len()
    }

    /// Execute the test cases and produce results in completion order, with
    /// at most `jobs` cases in flight. A case whose worker panics is
    /// reported as a failed case; the remaining cases still run.
    pub fn execute_all(
        self,
        jobs: usize,
    ) -> impl stream::Stream<Item = results::Case> {
        let Harness {
            registry,
            substitutions,
            cases,
        } = self;

        stream::iter(cases.into_iter().map(move |def| {
            let registry = Arc::clone(&registry);
            let substitutions = Arc::clone(&substitutions);
            async move {
                let name = def.name.clone();
                task::spawn_blocking(move || {
                    case::run_case(&def, &registry, &substitutions)
                })
                .await
                .unwrap_or_else(|err| {
                    results::Case::aborted(name, err.to_string())
                })
            }
        }))
        .buffer_unordered(jobs.max(1))
    }

    /// Stream the results to stdout as they become available. Returns the
    /// number of failed cases.
    pub async fn flat_summary(
        self,
        opts: &cli::Opts,
    ) -> Result<i32, HarnessError> {
        let jobs = opts.jobs_limit.unwrap_or_else(num_cpus::get);
        let mut tasks = self.execute_all(jobs);
        let stdout_buf = std::io::BufWriter::new(std::io::stdout());
        let mut handle = AllowStdIo::new(stdout_buf);
        let mut summary = results::Summary::default();

        while let Some(res) = tasks.next().await {
            summary.add(&res);
            if res.should_print(opts) {
                let buf = res.report_str(opts.verbose) + "\n";
                handle.write_all(buf.as_bytes()).await?;
                handle.flush().await?;
            }
        }

        let buf = format!("{}\n", summary);
        handle.write_all(buf.as_bytes()).await?;
        handle.flush().await?;

        Ok(summary.failed)
    }
}
