//! Pickers gather test case definitions from configuration.
pub mod toml;
