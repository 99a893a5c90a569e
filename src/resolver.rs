//! Resolution of step implementations from their configured type names.
//!
//! Test definitions refer to steps by name. A [StepRegistry] maps those names
//! to factories that bind a parameter table onto a fresh step instance. The
//! core catalog holds the built-in steps; extension modules register their
//! own named catalogs, and a step definition may pin its lookup to one of
//! them with a module name.
use crate::{
    errors::StepError,
    step::{self, Step},
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use toml::value::Table;

/// Parameters bound onto a step before validation.
pub type Params = Table;

/// Builds a parameter-bound step instance.
pub type StepFactory = fn(Params) -> Result<Box<dyn Step>, StepError>;

/// Factory for any step that can be deserialized from its parameters.
/// Binding failures (unknown field, wrong type) are validation errors.
pub fn factory_for<T>() -> StepFactory
where
    T: Step + DeserializeOwned + 'static,
{
    |params| {
        toml::Value::Table(params)
            .try_into::<T>()
            .map(|step| Box::new(step) as Box<dyn Step>)
            .map_err(|err| {
                StepError::validation(format!("invalid parameters: {}", err))
            })
    }
}

/// A named set of step types contributed by an extension.
#[derive(Default)]
pub struct Module {
    name: String,
    factories: HashMap<String, StepFactory>,
}

impl Module {
    /// Register `type_name` in this module.
    pub fn register<S: Into<String>>(
        &mut self,
        type_name: S,
        factory: StepFactory,
    ) -> &mut Self {
        self.factories.insert(type_name.into(), factory);
        self
    }
}

/// Mapping from step type names to their factories.
#[derive(Default)]
pub struct StepRegistry {
    core: HashMap<String, StepFactory>,
    /// Extension modules in registration order.
    modules: Vec<Module>,
}

impl StepRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in step catalog.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        reg.register("ExecuteCommandStep", factory_for::<step::ExecuteCommandStep>())
            .register("CounterMonitorStep", factory_for::<step::CounterMonitorStep>())
            .register("DelayStep", factory_for::<step::DelayStep>())
            .register("FileExistsStep", factory_for::<step::FileExistsStep>())
            .register("LogMessageStep", factory_for::<step::LogMessageStep>());
        reg
    }

    /// Register a step type in the core catalog.
    pub fn register<S: Into<String>>(
        &mut self,
        type_name: S,
        factory: StepFactory,
    ) -> &mut Self {
        self.core.insert(type_name.into(), factory);
        self
    }

    /// Register (or extend) the extension module `name`.
    pub fn register_module<S, F>(&mut self, name: S, build: F) -> &mut Self
    where
        S: Into<String>,
        F: FnOnce(&mut Module),
    {
        let name = name.into();
        let idx = match self.modules.iter().position(|m| m.name == name) {
            Some(idx) => idx,
            None => {
                self.modules.push(Module {
                    name,
                    factories: HashMap::new(),
                });
                self.modules.len() - 1
            }
        };
        build(&mut self.modules[idx]);
        self
    }

    /// Find the factory for `type_name`. With a module name the lookup is
    /// confined to that module; without one the core catalog is searched
    /// first and then every module in registration order.
    pub fn resolve(
        &self,
        type_name: &str,
        module: Option<&str>,
    ) -> Result<StepFactory, StepError> {
        match module {
            Some(module_name) => {
                let module = self
                    .modules
                    .iter()
                    .find(|m| m.name == module_name)
                    .ok_or_else(|| {
                        StepError::resolution(format!(
                            "module {} could not be loaded: it is not registered",
                            module_name
                        ))
                    })?;
                module.factories.get(type_name).copied().ok_or_else(|| {
                    StepError::resolution(format!(
                        "module {} has no step type {}",
                        module_name, type_name
                    ))
                })
            }
            None => self
                .core
                .get(type_name)
                .or_else(|| {
                    self.modules
                        .iter()
                        .find_map(|m| m.factories.get(type_name))
                })
                .copied()
                .ok_or_else(|| {
                    StepError::resolution(format!(
                        "unknown step type {}",
                        type_name
                    ))
                }),
        }
    }

    /// Resolve `type_name` and bind `params` onto a new instance.
    pub fn instantiate(
        &self,
        type_name: &str,
        module: Option<&str>,
        params: Params,
    ) -> Result<Box<dyn Step>, StepError> {
        let factory = self.resolve(type_name, module)?;
        factory(params)
    }

    /// Every resolvable name, qualified with its module where it has one.
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.core.keys().cloned().collect();
        names.sort();
        for module in &self.modules {
            let mut qualified: Vec<String> = module
                .factories
                .keys()
                .map(|name| format!("{}::{}", module.name, name))
                .collect();
            qualified.sort();
            names.extend(qualified);
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{context::RunContext, errors::ErrorKind};
    use serde::Deserialize;

    #[derive(Default, Deserialize)]
    #[serde(default)]
    struct Noop {
        label: String,
    }

    impl Step for Noop {
        fn type_name(&self) -> &str {
            "Noop"
        }
        fn validate(&mut self, _: &mut RunContext) -> Result<(), StepError> {
            Ok(())
        }
        fn execute(&mut self, ctx: &mut RunContext) -> Result<(), StepError> {
            ctx.log_info(self.label.clone());
            Ok(())
        }
    }

    fn params(src: &str) -> Params {
        toml::from_str(src).unwrap()
    }

    #[test]
    fn resolves_builtin_without_module() {
        let reg = StepRegistry::with_builtins();
        let step = reg
            .instantiate("DelayStep", None, params("delay_ms = 5"))
            .unwrap();
        assert_eq!(step.type_name(), "DelayStep");
    }

    #[test]
    fn unknown_type_is_resolution_error() {
        let reg = StepRegistry::with_builtins();
        let err = reg.resolve("NoSuchStep", None).err().unwrap();
        assert_eq!(err.kind, ErrorKind::TypeResolution);

        let err = reg.resolve("NoSuchStep", Some("ext")).err().unwrap();
        assert_eq!(err.kind, ErrorKind::TypeResolution);
        assert!(err.message.contains("could not be loaded"));
    }

    #[test]
    fn module_lookup_is_strict() {
        let mut reg = StepRegistry::with_builtins();
        reg.register_module("ext", |m| {
            m.register("Noop", factory_for::<Noop>());
        });

        assert!(reg.resolve("Noop", Some("ext")).is_ok());
        // Built-ins are not visible through a module.
        let err = reg.resolve("DelayStep", Some("ext")).err().unwrap();
        assert_eq!(err.kind, ErrorKind::TypeResolution);
        // Loaded modules are searched when no module is given.
        assert!(reg.resolve("Noop", None).is_ok());
    }

    #[test]
    fn binding_errors_are_validation_errors() {
        let reg = StepRegistry::with_builtins();
        let err = reg
            .instantiate("DelayStep", None, params("delay_ms = \"soon\""))
            .err()
            .unwrap();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = reg
            .instantiate("DelayStep", None, params("delay = 5"))
            .err()
            .unwrap();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn lists_qualified_names() {
        let mut reg = StepRegistry::new();
        reg.register("B", factory_for::<Noop>())
            .register("A", factory_for::<Noop>());
        reg.register_module("ext", |m| {
            m.register("Noop", factory_for::<Noop>());
        });
        assert_eq!(reg.type_names(), vec!["A", "B", "ext::Noop"]);
    }
}
