use super::{not_validated, validation, Step};
use crate::{context::RunContext, errors::StepError};
use serde::Deserialize;
use std::path::PathBuf;

/// Checks that a path exists (or, with `expect_exists = false`, that it
/// does not).
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileExistsStep {
    pub path: Option<String>,
    pub expect_exists: bool,
    #[serde(skip)]
    resolved: Option<PathBuf>,
}

impl Default for FileExistsStep {
    fn default() -> Self {
        Self {
            path: None,
            expect_exists: true,
            resolved: None,
        }
    }
}

impl Step for FileExistsStep {
    fn type_name(&self) -> &str {
        "FileExistsStep"
    }

    fn validate(&mut self, ctx: &mut RunContext) -> Result<(), StepError> {
        self.resolved = None;
        let path = validation::require(&self.path, "path", ctx)?;
        self.resolved = Some(PathBuf::from(path));
        Ok(())
    }

    fn execute(&mut self, ctx: &mut RunContext) -> Result<(), StepError> {
        let path = self
            .resolved
            .as_ref()
            .ok_or_else(|| not_validated(self.type_name()))?;
        ctx.log_info(format!(
            "checking that {} {}",
            path.display(),
            if self.expect_exists { "exists" } else { "does not exist" }
        ));

        let exists = path.exists();
        if exists != self.expect_exists {
            return Err(StepError::execution(format!(
                "{} {}",
                path.display(),
                if exists { "exists" } else { "does not exist" }
            )));
        }
        ctx.log_info(format!(
            "{} {} as expected",
            path.display(),
            if exists { "exists" } else { "does not exist" }
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn checks_presence_and_absence() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = RunContext::new("t");
        ctx.set_substitution("dir", dir.path().to_string_lossy());

        let mut present = FileExistsStep {
            path: Some("${dir}".to_string()),
            ..Default::default()
        };
        present.validate(&mut ctx).unwrap();
        present.execute(&mut ctx).unwrap();
        let summary = format!("{} exists as expected", dir.path().display());
        assert_eq!(ctx.entries().last().unwrap().message, summary);

        let mut absent = FileExistsStep {
            path: Some("${dir}/missing".to_string()),
            ..Default::default()
        };
        absent.validate(&mut ctx).unwrap();
        let err = absent.execute(&mut ctx).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Execution);

        absent.expect_exists = false;
        absent.execute(&mut ctx).unwrap();
        assert!(ctx
            .entries()
            .last()
            .unwrap()
            .message
            .ends_with("missing does not exist as expected"));
    }
}
