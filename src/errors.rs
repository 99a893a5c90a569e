use std::{error, fmt, string};
use thiserror::Error;

/// An error from the stepcase harness: configuration, filesystem, or CLI
/// problems that stop a run before any test case is attempted.
pub struct HarnessError(pub String);

impl fmt::Debug for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl error::Error for HarnessError {}

impl From<string::FromUtf8Error> for HarnessError {
    fn from(err: string::FromUtf8Error) -> Self {
        HarnessError(err.to_string())
    }
}

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        HarnessError(err.to_string())
    }
}

/// Which phase of a step's life produced a [StepError].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed step configuration, found during `validate`.
    Validation,
    /// The step ran but its success condition was not met.
    Execution,
    /// The named step type (or its module) could not be located.
    TypeResolution,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation error",
            ErrorKind::Execution => "execution error",
            ErrorKind::TypeResolution => "type resolution error",
        };
        f.write_str(name)
    }
}

/// The error returned by every step operation and by the type resolver.
/// Always fatal to the owning test case.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct StepError {
    pub kind: ErrorKind,
    pub message: String,
}

impl StepError {
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn execution<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Execution, message)
    }

    pub fn resolution<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::TypeResolution, message)
    }
}
