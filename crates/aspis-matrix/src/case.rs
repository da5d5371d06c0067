//! Test case and test matrix types
//!
//! A [`TestMatrix`] is keyed by `test_name`; the key is the primary key of
//! the persisted store and is unique by construction. Iteration follows
//! insertion order so saved stores diff cleanly, but equality ignores order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One (fixture, profile) pairing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestCase {
    /// Unique name, `<fixture stem>_v<profile index>`
    pub test_name: String,

    /// Fixture path relative to the test root, `/`-separated
    pub source_file: String,

    /// Expected stdout of the compiled fixture, already trimmed
    pub expected_output: String,

    /// Instrumentation flags, space-separated
    #[serde(alias = "aspis_options")]
    pub options: String,
}

impl TestCase {
    /// Create a new test case
    #[must_use]
    pub fn new(
        test_name: impl Into<String>,
        source_file: impl Into<String>,
        expected_output: impl Into<String>,
        options: impl Into<String>,
    ) -> Self {
        Self {
            test_name: test_name.into(),
            source_file: source_file.into(),
            expected_output: expected_output.into(),
            options: options.into(),
        }
    }

    /// Name of the artifact the compiler writes for this case
    #[inline]
    #[must_use]
    pub fn output_name(&self) -> String {
        format!("{}.out", self.test_name)
    }

    /// Options with a global suffix appended
    #[must_use]
    pub fn options_with_suffix(&self, suffix: &str) -> String {
        match (self.options.trim(), suffix.trim()) {
            (base, "") => base.to_string(),
            ("", extra) => extra.to_string(),
            (base, extra) => format!("{base} {extra}"),
        }
    }
}

/// Keyed collection of test cases
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestMatrix {
    cases: IndexMap<String, TestCase>,
}

impl TestMatrix {
    /// Create an empty matrix
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cases
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Whether the matrix has no cases
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Look up a case by name
    #[inline]
    #[must_use]
    pub fn get(&self, test_name: &str) -> Option<&TestCase> {
        self.cases.get(test_name)
    }

    /// Whether a case with this name exists
    #[inline]
    #[must_use]
    pub fn contains(&self, test_name: &str) -> bool {
        self.cases.contains_key(test_name)
    }

    /// Insert or replace a case, returning the previous value.
    ///
    /// A replaced case keeps its original position.
    pub fn insert(&mut self, case: TestCase) -> Option<TestCase> {
        self.cases.insert(case.test_name.clone(), case)
    }

    /// Remove a case by name
    pub fn remove(&mut self, test_name: &str) -> Option<TestCase> {
        self.cases.shift_remove(test_name)
    }

    /// Iterate cases in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &TestCase> {
        self.cases.values()
    }

    /// Iterate names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cases.keys().map(String::as_str)
    }

    /// Consume into a list of cases in insertion order
    #[must_use]
    pub fn into_cases(self) -> Vec<TestCase> {
        self.cases.into_values().collect()
    }

    /// Build from cases, reporting names that appeared more than once.
    ///
    /// The last occurrence of a duplicated name wins.
    #[must_use]
    pub fn from_cases_lossy(cases: impl IntoIterator<Item = TestCase>) -> (Self, Vec<String>) {
        let mut matrix = Self::new();
        let mut duplicates = Vec::new();
        for case in cases {
            let name = case.test_name.clone();
            if matrix.insert(case).is_some() {
                duplicates.push(name);
            }
        }
        (matrix, duplicates)
    }
}

impl FromIterator<TestCase> for TestMatrix {
    fn from_iter<I: IntoIterator<Item = TestCase>>(iter: I) -> Self {
        Self::from_cases_lossy(iter).0
    }
}

impl IntoIterator for TestMatrix {
    type Item = TestCase;
    type IntoIter = indexmap::map::IntoValues<String, TestCase>;

    fn into_iter(self) -> Self::IntoIter {
        self.cases.into_values()
    }
}

impl<'a> IntoIterator for &'a TestMatrix {
    type Item = &'a TestCase;
    type IntoIter = indexmap::map::Values<'a, String, TestCase>;

    fn into_iter(self) -> Self::IntoIter {
        self.cases.values()
    }
}
