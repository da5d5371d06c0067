//! Candidate matrix expansion
//!
//! Every annotated fixture is paired with every option profile. The profile
//! index is part of the test name, so the expansion is deterministic: the
//! same fixtures and profiles always produce the same names in the same
//! order, which is what makes key-based merging predictable.

use crate::case::{TestCase, TestMatrix};
use crate::error::BuildError;
use crate::fixture::{Annotation, Fixture};
use crate::profile::OptionProfile;
use std::collections::HashMap;

/// Why a fixture produced no candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No expected-output annotation
    NotAnnotated,

    /// Marker on the last line with no value after it
    DanglingMarker {
        /// Line of the marker
        line: usize,
    },

    /// The file could not be read
    Unreadable(String),

    /// File name has no usable stem
    NoStem,

    /// Another fixture already produced this test name
    DuplicateName {
        /// Colliding name
        test_name: String,
        /// Fixture that claimed the name first
        first_source: String,
    },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnnotated => write!(f, "no expected output found"),
            Self::DanglingMarker { line } => {
                write!(f, "expected output marker on line {line} has no value line")
            }
            Self::Unreadable(reason) => write!(f, "unreadable: {reason}"),
            Self::NoStem => write!(f, "file name has no stem"),
            Self::DuplicateName {
                test_name,
                first_source,
            } => write!(f, "test name '{test_name}' already generated from {first_source}"),
        }
    }
}

/// A fixture excluded from the candidate set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFixture {
    /// Fixture path relative to the test root
    pub source_file: String,
    /// Reason for exclusion
    pub reason: SkipReason,
}

/// Candidates produced by one build, plus what was left out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    /// Candidate cases in generation order
    pub candidates: TestMatrix,
    /// Fixtures excluded, in scan order
    pub skipped: Vec<SkippedFixture>,
}

/// Expands fixtures against option profiles
#[derive(Debug, Clone)]
pub struct MatrixBuilder {
    profiles: Vec<OptionProfile>,
}

impl MatrixBuilder {
    /// Create a builder
    ///
    /// # Errors
    /// `BuildError::NoProfiles` if `profiles` is empty
    pub fn new(profiles: Vec<OptionProfile>) -> Result<Self, BuildError> {
        if profiles.is_empty() {
            return Err(BuildError::NoProfiles);
        }
        Ok(Self { profiles })
    }

    /// Profiles in index order
    #[inline]
    #[must_use]
    pub fn profiles(&self) -> &[OptionProfile] {
        &self.profiles
    }

    /// Test name for a fixture stem and profile index
    #[inline]
    #[must_use]
    pub fn test_name(stem: &str, index: usize) -> String {
        format!("{stem}_v{index}")
    }

    /// Expand fixtures into candidates.
    ///
    /// Fixtures are expected in scan order. Unannotated fixtures, and
    /// fixtures whose stem collides with an earlier fixture, are skipped
    /// with a warning.
    ///
    /// # Errors
    /// `BuildError::NoCandidates` if every fixture was skipped
    pub fn build(&self, fixtures: &[Fixture]) -> Result<BuildOutcome, BuildError> {
        let mut candidates = TestMatrix::new();
        let mut skipped = Vec::new();
        let mut claimed: HashMap<String, &str> = HashMap::new();

        for fixture in fixtures {
            let reason = match (&fixture.annotation, fixture.stem()) {
                (Annotation::Found(_), Some(stem)) => match claimed.get(stem) {
                    Some(first) => Some(SkipReason::DuplicateName {
                        test_name: Self::test_name(stem, 0),
                        first_source: (*first).to_string(),
                    }),
                    None => None,
                },
                (Annotation::Found(_), None) => Some(SkipReason::NoStem),
                (Annotation::Missing, _) => Some(SkipReason::NotAnnotated),
                (Annotation::Dangling { line }, _) => Some(SkipReason::DanglingMarker { line: *line }),
                (Annotation::Unreadable(e), _) => Some(SkipReason::Unreadable(e.clone())),
            };

            if let Some(reason) = reason {
                tracing::warn!(source_file = %fixture.source_file, %reason, "skipping fixture");
                skipped.push(SkippedFixture {
                    source_file: fixture.source_file.clone(),
                    reason,
                });
                continue;
            }

            // Found + stem guaranteed by the match above
            let Some(stem) = fixture.stem() else { continue };
            claimed.insert(stem.to_string(), &fixture.source_file);

            for (index, profile) in self.profiles.iter().enumerate() {
                candidates.insert(TestCase::new(
                    Self::test_name(stem, index),
                    fixture.source_file.clone(),
                    fixture.expected_output(),
                    profile.option_string(),
                ));
            }
        }

        if candidates.is_empty() {
            return Err(BuildError::NoCandidates { skipped });
        }

        tracing::info!(
            candidates = candidates.len(),
            skipped = skipped.len(),
            profiles = self.profiles.len(),
            "expanded test matrix"
        );
        Ok(BuildOutcome {
            candidates,
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture(source_file: &str, annotation: Annotation) -> Fixture {
        Fixture {
            path: PathBuf::from("/t").join(source_file),
            source_file: source_file.to_string(),
            annotation,
        }
    }

    fn two_profiles() -> Vec<OptionProfile> {
        vec![
            OptionProfile::new("a", ["--eddi"]),
            OptionProfile::new("b", ["--eddi", "--cfcss"]),
        ]
    }

    #[test]
    fn builder_rejects_empty_profiles() {
        assert!(matches!(MatrixBuilder::new(vec![]), Err(BuildError::NoProfiles)));
    }

    #[test]
    fn expands_each_fixture_per_profile() {
        let builder = MatrixBuilder::new(two_profiles()).unwrap();
        let outcome = builder
            .build(&[fixture("c/add.c", Annotation::Found("7".to_string()))])
            .unwrap();

        let names: Vec<_> = outcome.candidates.names().collect();
        assert_eq!(names, vec!["add_v0", "add_v1"]);
        let v1 = outcome.candidates.get("add_v1").unwrap();
        assert_eq!(v1.options, "--eddi --cfcss");
        assert_eq!(v1.expected_output, "7");
        assert_eq!(v1.source_file, "c/add.c");
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn skips_unannotated_and_dangling() {
        let builder = MatrixBuilder::new(two_profiles()).unwrap();
        let outcome = builder
            .build(&[
                fixture("c/a.c", Annotation::Missing),
                fixture("c/b.c", Annotation::Dangling { line: 9 }),
                fixture("c/c.c", Annotation::Found("ok".to_string())),
            ])
            .unwrap();

        assert_eq!(outcome.candidates.len(), 2);
        assert_eq!(outcome.skipped.len(), 2);
        assert_eq!(outcome.skipped[0].reason, SkipReason::NotAnnotated);
        assert_eq!(outcome.skipped[1].reason, SkipReason::DanglingMarker { line: 9 });
    }

    #[test]
    fn all_skipped_is_no_candidates() {
        let builder = MatrixBuilder::new(two_profiles()).unwrap();
        let err = builder.build(&[fixture("c/a.c", Annotation::Missing)]).unwrap_err();
        match err {
            BuildError::NoCandidates { skipped } => assert_eq!(skipped.len(), 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn colliding_stems_keep_first_fixture() {
        let builder = MatrixBuilder::new(two_profiles()).unwrap();
        let outcome = builder
            .build(&[
                fixture("c/x/func.c", Annotation::Found("1".to_string())),
                fixture("c/y/func.c", Annotation::Found("2".to_string())),
            ])
            .unwrap();

        assert_eq!(outcome.candidates.len(), 2);
        assert_eq!(outcome.candidates.get("func_v0").unwrap().expected_output, "1");
        assert!(matches!(
            &outcome.skipped[0].reason,
            SkipReason::DuplicateName { first_source, .. } if first_source == "c/x/func.c"
        ));
    }
}
