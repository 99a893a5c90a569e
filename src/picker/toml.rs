//! The default picker for stepcase test cases, read from a `stepcase.toml`
//! file and any case files it references.
use serde::Deserialize;
use std::{collections::HashMap, path::Path};

use crate::{
    errors::HarnessError,
    executor::{suite::Suite, CaseDefinition, StepDefinition},
    resolver::Params,
};

/// Name of the configuration file in a test directory.
pub const CONFIG_FILE: &str = "stepcase.toml";

/// Configuration for a single stepcase run.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Version of stepcase this configuration is compatible with.
    pub ver: String,
    /// Substitutions shared by every case.
    #[serde(default)]
    pub substitutions: HashMap<String, String>,
    /// Glob patterns, relative to the config directory, of additional TOML
    /// files holding `[[cases]]`.
    #[serde(default)]
    pub case_files: Vec<String>,
    /// Test cases defined inline.
    #[serde(default)]
    pub cases: Vec<CaseConfig>,
}

/// A file of additional test cases.
#[derive(Debug, Deserialize)]
struct CaseFile {
    #[serde(default)]
    cases: Vec<CaseConfig>,
}

/// Configuration for a test case.
#[derive(Debug, Deserialize)]
pub struct CaseConfig {
    /// Name of this test case.
    pub name: String,
    /// Substitutions for this case. Override the shared ones.
    #[serde(default)]
    pub substitutions: HashMap<String, String>,
    /// Steps in execution order.
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

/// Configuration for a step: its type, optional module, and the remaining
/// keys as parameters.
#[derive(Debug, Deserialize)]
pub struct StepConfig {
    #[serde(rename = "type")]
    pub type_name: String,
    pub module: Option<String>,
    #[serde(flatten)]
    pub params: Params,
}

fn read_toml<T>(path: &Path) -> Result<T, HarnessError>
where
    T: serde::de::DeserializeOwned,
{
    let contents = std::fs::read_to_string(path).map_err(|err| {
        HarnessError(format!("Failed to read {}: {}", path.display(), err))
    })?;
    toml::from_str(&contents).map_err(|err| {
        HarnessError(format!("Failed to parse {}: {}", path.display(), err))
    })
}

impl Config {
    /// Create a configuration by reading a `stepcase.toml` file.
    /// Ensures that the version number specified in the `stepcase.toml`
    /// matches the version of the running `stepcase`.
    pub fn from_path(conf_dir: &Path) -> Result<Self, HarnessError> {
        let conf_path = conf_dir.join(CONFIG_FILE);
        if !conf_path.exists() {
            return Err(HarnessError(format!(
                "{} is missing. stepcase expects a directory with a {} file.",
                conf_path.display(),
                CONFIG_FILE
            )));
        }
        let conf: Config = read_toml(&conf_path)?;

        if env!("CARGO_PKG_VERSION") != conf.ver {
            return Err(HarnessError(format!(
                "stepcase version mismatch. Configuration requires: {}, tool version: {}.",
                conf.ver,
                env!("CARGO_PKG_VERSION")
            )));
        }

        Ok(conf)
    }

    /// Collect the inline cases and those from `case_files` into a [Suite].
    /// Case files are read in sorted path order after the inline cases.
    pub fn into_suite(self, conf_dir: &Path) -> Result<Suite, HarnessError> {
        let Config {
            substitutions,
            case_files,
            mut cases,
            ..
        } = self;

        for pattern in case_files {
            let full = conf_dir.join(&pattern);
            let paths = glob::glob(&full.to_string_lossy()).map_err(|err| {
                HarnessError(format!("Glob pattern {}: {}", pattern, err))
            })?;
            let mut paths = paths
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| HarnessError(err.to_string()))?;
            paths.sort();
            for path in paths {
                let file: CaseFile = read_toml(&path)?;
                cases.extend(file.cases);
            }
        }

        Ok(Suite {
            substitutions,
            cases: cases.into_iter().map(CaseDefinition::from).collect(),
        })
    }
}

impl From<CaseConfig> for CaseDefinition {
    fn from(conf: CaseConfig) -> Self {
        CaseDefinition {
            name: conf.name,
            substitutions: conf.substitutions,
            steps: conf
                .steps
                .into_iter()
                .map(|step| StepDefinition {
                    type_name: step.type_name,
                    module: step.module,
                    params: step.params,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_config(dir: &Path, body: &str) {
        let text = format!("ver = \"{}\"\n{}", env!("CARGO_PKG_VERSION"), body);
        fs::write(dir.join(CONFIG_FILE), text).unwrap();
    }

    #[test]
    fn missing_config_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let HarnessError(msg) = Config::from_path(dir.path()).unwrap_err();
        assert!(msg.contains("is missing"));
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "ver = \"0.0.0-old\"\n").unwrap();
        let HarnessError(msg) = Config::from_path(dir.path()).unwrap_err();
        assert!(msg.contains("version mismatch"));
    }

    #[test]
    fn parses_cases_steps_and_params() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            r#"
[substitutions]
root = "/srv"

[[cases]]
name = "smoke"
substitutions = { env = "dev" }

[[cases.steps]]
type = "ExecuteCommandStep"
process_name = "echo"
process_params = "${env}"
timeout_secs = 5

[[cases.steps]]
type = "Ping"
module = "ext"
"#,
        );
        let suite = Config::from_path(dir.path())
            .unwrap()
            .into_suite(dir.path())
            .unwrap();

        assert_eq!(suite.substitutions["root"], "/srv");
        let case = &suite.cases[0];
        assert_eq!(case.name, "smoke");
        assert_eq!(case.substitutions["env"], "dev");
        assert_eq!(case.steps[0].type_name, "ExecuteCommandStep");
        assert_eq!(case.steps[0].module, None);
        assert_eq!(
            case.steps[0].params.get("timeout_secs"),
            Some(&toml::Value::Integer(5))
        );
        assert!(!case.steps[0].params.contains_key("type"));
        assert_eq!(case.steps[1].module.as_deref(), Some("ext"));
        assert!(case.steps[1].params.is_empty());
    }

    #[test]
    fn loads_case_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("cases")).unwrap();
        fs::write(
            dir.path().join("cases/b.toml"),
            "[[cases]]\nname = \"b\"\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("cases/a.toml"),
            "[[cases]]\nname = \"a\"\n",
        )
        .unwrap();
        write_config(
            dir.path(),
            "case_files = [\"cases/*.toml\"]\n[[cases]]\nname = \"inline\"\n",
        );

        let suite = Config::from_path(dir.path())
            .unwrap()
            .into_suite(dir.path())
            .unwrap();
        let names: Vec<_> = suite.cases.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["inline", "a", "b"]);
    }
}
