use super::case::CaseDefinition;
use regex::Regex;
use std::collections::HashMap;

/// A collection of test cases together with the substitutions they share.
#[derive(Debug, Default)]
pub struct Suite {
    /// Substitutions visible to every case.
    pub substitutions: HashMap<String, String>,
    /// Cases in declaration order.
    pub cases: Vec<CaseDefinition>,
}

impl Suite {
    /// Keep only the cases whose names pass the include and exclude filters.
    pub fn with_filters(
        mut self,
        include: Option<&Regex>,
        exclude: Option<&Regex>,
    ) -> Self {
        self.cases = NameStream::from(self.cases)
            .with_include_filter(include)
            .with_exclude_filter(exclude)
            .into_cases();
        self
    }
}

/// Wrapper struct to manage filtering case names in a [Suite].
struct NameStream<'a> {
    cases: Vec<CaseDefinition>,
    exclude: Option<&'a Regex>,
    include: Option<&'a Regex>,
}

impl<'a> NameStream<'a> {
    /// Remove cases whose name matches the filter.
    pub fn with_exclude_filter(mut self, exclude: Option<&'a Regex>) -> Self {
        self.exclude = exclude;
        self
    }

    /// Keep only cases whose name matches the filter.
    pub fn with_include_filter(mut self, include: Option<&'a Regex>) -> Self {
        self.include = include;
        self
    }

    pub fn into_cases(self) -> Vec<CaseDefinition> {
        let NameStream {
            cases,
            exclude,
            include,
        } = self;
        cases
            .into_iter()
            .filter(|case| {
                let excluded =
                    exclude.map_or(false, |ex| ex.is_match(&case.name));
                let included =
                    include.map_or(true, |inc| inc.is_match(&case.name));
                included && !excluded
            })
            .collect()
    }
}

impl From<Vec<CaseDefinition>> for NameStream<'_> {
    fn from(cases: Vec<CaseDefinition>) -> Self {
        Self {
            cases,
            exclude: None,
            include: None,
        }
    }
}
