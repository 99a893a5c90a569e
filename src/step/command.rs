use super::{not_validated, validation, Step};
use crate::{context::RunContext, diff, errors::StepError};
use serde::Deserialize;
use std::{
    io::Read,
    path::PathBuf,
    process::{Child, Command, Stdio},
    thread,
    time::{Duration, Instant},
};

/// How often a running child is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Runs a program and checks its exit code (and optionally its output).
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecuteCommandStep {
    /// Program to execute.
    pub process_name: Option<String>,
    /// Command line arguments. Split on whitespace; single or double quotes
    /// group words.
    pub process_params: Option<String>,
    /// Directory to run the program from.
    pub working_directory: Option<String>,
    /// Seconds to wait for the program. Defaults to 1200.
    pub timeout_secs: Option<u64>,
    /// Exit code that counts as success. Defaults to 0.
    pub expected_exit_code: Option<i32>,
    /// If set, stdout must match exactly.
    pub expected_output: Option<String>,
    #[serde(skip)]
    resolved: Option<Resolved>,
}

#[derive(Debug)]
struct Resolved {
    program: String,
    params: String,
    args: Vec<String>,
    working_directory: Option<PathBuf>,
    timeout: Duration,
    exit_code: i32,
    expected_output: Option<String>,
}

impl Step for ExecuteCommandStep {
    fn type_name(&self) -> &str {
        "ExecuteCommandStep"
    }

    fn validate(&mut self, ctx: &mut RunContext) -> Result<(), StepError> {
        self.resolved = None;
        let program = validation::require(&self.process_name, "process_name", ctx)?;
        let params =
            validation::optional(&self.process_params, ctx).unwrap_or_default();
        let args = split_args(&params)?;
        let timeout = validation::positive_duration(
            self.timeout_secs.unwrap_or(validation::DEFAULT_TIMEOUT_SECS),
            "timeout_secs",
            Duration::from_secs,
        )?;

        self.resolved = Some(Resolved {
            program,
            params,
            args,
            working_directory: validation::optional(&self.working_directory, ctx)
                .map(PathBuf::from),
            timeout,
            exit_code: self.expected_exit_code.unwrap_or(0),
            expected_output: self
                .expected_output
                .as_ref()
                .map(|out| ctx.substitute_wildcards(out)),
        });
        Ok(())
    }

    fn execute(&mut self, ctx: &mut RunContext) -> Result<(), StepError> {
        let cmd = self
            .resolved
            .as_ref()
            .ok_or_else(|| not_validated(self.type_name()))?;

        ctx.log_info(format!(
            "about to execute the command: {} params: {}, working directory: {}",
            cmd.program,
            cmd.params,
            cmd.working_directory
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| ".".to_string())
        ));

        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &cmd.working_directory {
            command.current_dir(dir);
        }
        // Own process group, so a timeout also reaches grandchildren.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command.spawn().map_err(|err| {
            StepError::execution(format!(
                "failed to start {}: {}",
                cmd.program, err
            ))
        })?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        // The drain threads are only joined once the child exited. After a
        // timeout a surviving grandchild may still hold the pipes open.
        let status = match wait_with_timeout(&mut child, cmd.timeout)? {
            Some(status) => status,
            None => {
                return Err(StepError::execution(format!(
                    "{} {} did not finish within {} seconds",
                    cmd.program,
                    cmd.params,
                    cmd.timeout.as_secs()
                )))
            }
        };
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        // Killed by a signal counts as -1.
        let code = status.code().unwrap_or(-1);
        if code != cmd.exit_code {
            return Err(StepError::execution(format!(
                "received exit code {} (expected {}) while executing {} {}\n\nOutput: {}{}",
                code,
                cmd.exit_code,
                cmd.program,
                cmd.params,
                stdout,
                if stderr.is_empty() {
                    String::new()
                } else {
                    format!("\nStderr: {}", stderr)
                }
            )));
        }

        if let Some(expected) = &cmd.expected_output {
            if *expected != stdout {
                return Err(StepError::execution(format!(
                    "output of {} did not match the expected output:\n{}",
                    cmd.program,
                    diff::gen_diff(expected, &stdout)
                )));
            }
        }

        ctx.log_info(format!("{} output:\n{}", cmd.program, stdout));
        Ok(())
    }
}

/// Read a child pipe to completion on its own thread so a chatty child never
/// blocks on a full pipe while we poll it.
fn drain<R: Read + Send + 'static>(
    pipe: Option<R>,
) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Poll `child` until it exits or `timeout` elapses. On timeout the child and
/// its process group are killed and `None` is returned. A timeout too large
/// to represent as a deadline waits for as long as the child runs.
fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
) -> Result<Option<std::process::ExitStatus>, StepError> {
    let deadline = Instant::now().checked_add(timeout);
    loop {
        let polled = child.try_wait().map_err(|err| {
            StepError::execution(format!("failed to wait for process: {}", err))
        })?;
        if let Some(status) = polled {
            return Ok(Some(status));
        }
        let remaining = match deadline {
            Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                Some(left) if left > Duration::from_millis(0) => left,
                _ => {
                    kill_tree(child);
                    return Ok(None);
                }
            },
            None => POLL_INTERVAL,
        };
        thread::sleep(POLL_INTERVAL.min(remaining));
    }
}

/// Kill `child` and, on unix, every process left in its group.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        let group = format!("-{}", child.id());
        let _ = Command::new("kill")
            .args(&["-KILL", "--", group.as_str()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
    }
    let _ = child.kill();
    let _ = child.wait();
}

/// Split a parameter string into arguments. Quotes group words and are
/// removed; there is no escape syntax.
fn split_args(params: &str) -> Result<Vec<String>, StepError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in params.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '"') | (None, '\'') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    args.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err(StepError::validation(format!(
            "process_params has an unterminated quote: {}",
            params
        )));
    }
    if in_word {
        args.push(current);
    }
    Ok(args)
}
