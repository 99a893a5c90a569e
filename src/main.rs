use stepcase::{
    cli, errors, executor, logging, picker::toml::Config,
    resolver::StepRegistry,
};

use cli::Opts;
use errors::HarnessError;
use executor::{suite::Suite, Harness, TestCase};
use regex::Regex;
use structopt::StructOpt;
use tokio::runtime;

fn dry_run(registry: &StepRegistry, suite: &Suite) {
    use colored::*;
    for case in &suite.cases {
        println!("{}", case.name.blue());
        let err = TestCase::resolve(case, registry).err();
        for (idx, step) in case.steps.iter().enumerate() {
            let name = match &step.module {
                Some(module) => format!("{}::{}", module, step.type_name),
                None => step.type_name.clone(),
            };
            match &err {
                Some((failed, e)) if *failed == idx => {
                    println!("  {} {} {}", idx, name.red(), e.to_string().red())
                }
                _ => println!("  {} {}", idx, name),
            }
        }
    }
}

fn regex_opt(
    pattern: &Option<String>,
    flag: &str,
) -> Result<Option<Regex>, HarnessError> {
    pattern
        .as_ref()
        .map(|reg| {
            Regex::new(reg).map_err(|err| {
                HarnessError(format!("Invalid {} regex: {}", flag, err))
            })
        })
        .transpose()
}

fn run() -> Result<i32, HarnessError> {
    let opts = Opts::from_args();
    logging::init(opts.verbose);
    let registry = StepRegistry::with_builtins();

    if opts.list_steps {
        for name in registry.type_names() {
            println!("{}", name);
        }
        return Ok(0);
    }

    let suite = Config::from_path(&opts.dir)?.into_suite(&opts.dir)?;

    // Get the include and exclude regexes.
    let include = regex_opt(&opts.include_filter, "--include")?;
    let exclude = regex_opt(&opts.exclude_filter, "--exclude")?;
    let suite = suite.with_filters(include.as_ref(), exclude.as_ref());

    // Switch to the test directory so relative paths in steps resolve there.
    std::env::set_current_dir(&opts.dir)?;

    // Print out the steps of each case in dry run mode.
    if opts.dry_run {
        dry_run(&registry, &suite);
        return Ok(0);
    }

    let harness = Harness::new(registry, suite);
    let runtime = runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    // Run all the test cases.
    runtime.block_on(harness.flat_summary(&opts))
}

fn main() {
    std::process::exit(match run() {
        Err(HarnessError(msg)) => {
            println!("error: {}", msg);
            1
        }
        Ok(failed_cases) => failed_cases,
    })
}
