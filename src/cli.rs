use crate::errors;
use std::path::PathBuf;
use structopt::StructOpt;

/// Options for the CLI.
#[derive(StructOpt, Debug, Default)]
#[structopt(name = "stepcase", about = "Run step-based test cases.")]
pub struct Opts {
    /// Directory containing stepcase.toml.
    #[structopt(name = "TEST_DIR", parse(from_os_str))]
    pub dir: PathBuf,

    /// Only run cases whose name matches this regex.
    #[structopt(short = "i", long = "include")]
    pub include_filter: Option<String>,

    /// Skip cases whose name matches this regex.
    #[structopt(short = "e", long = "exclude")]
    pub exclude_filter: Option<String>,

    /// Only display cases with this outcome (pass or fail).
    #[structopt(short = "o", long = "only")]
    pub post_filter: Option<OnlyOpt>,

    /// Show per-step outcomes and the full log of every displayed case.
    #[structopt(short, long)]
    pub verbose: bool,

    /// Maximum number of cases run at the same time. Defaults to the number
    /// of CPUs.
    #[structopt(short = "j", long = "jobs")]
    pub jobs_limit: Option<usize>,

    /// Resolve every case and print its steps without running anything.
    #[structopt(short = "n", long)]
    pub dry_run: bool,

    /// List the registered step types and exit.
    #[structopt(short, long)]
    pub list_steps: bool,
}

/// Possible values for the --only flag.
#[derive(Debug)]
pub enum OnlyOpt {
    /// Failing cases.
    Fail,
    /// Passing cases.
    Pass,
}

impl std::str::FromStr for OnlyOpt {
    type Err = errors::HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail" => Ok(OnlyOpt::Fail),
            "pass" => Ok(OnlyOpt::Pass),
            _ => Err(errors::HarnessError(
                "Must be one of fail, pass.".to_string(),
            )),
        }
    }
}
