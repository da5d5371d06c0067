//! Merge engine
//!
//! Reconciles a candidate matrix against the persisted one. The algorithm
//! performs no I/O: every collision is handed to an injected
//! [`DecisionProvider`], which may be an interactive prompt or a scripted
//! sequence.
//!
//! # Semantics
//!
//! Candidates are walked in generation order:
//! - new name → inserted (`added`)
//! - same name, identical case → left alone (`unchanged`)
//! - same name, different case → a conflict, resolved by [`MergeDecision`]

use crate::case::{TestCase, TestMatrix};
use crate::error::MergeError;
use std::collections::VecDeque;
use std::str::FromStr;

/// Resolution chosen for one conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeDecision {
    /// Keep the existing case
    Skip,

    /// Replace with the candidate
    Overwrite,

    /// Replace this and every later conflict without asking
    OverwriteAll,

    /// Abandon the merge; the store must not be written
    Abort,

    /// Stop now; remaining candidates are dropped
    KeepExisting,
}

impl MergeDecision {
    /// Short key used by the interactive prompt
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Skip => "s",
            Self::Overwrite => "o",
            Self::OverwriteAll => "oa",
            Self::Abort => "a",
            Self::KeepExisting => "k",
        }
    }
}

/// Unrecognized decision text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown merge decision '{0}' (expected skip, overwrite, overwrite-all, abort or keep)")]
pub struct ParseDecisionError(pub String);

impl FromStr for MergeDecision {
    type Err = ParseDecisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "s" | "skip" => Ok(Self::Skip),
            "o" | "overwrite" => Ok(Self::Overwrite),
            "oa" | "overwrite-all" => Ok(Self::OverwriteAll),
            "a" | "abort" => Ok(Self::Abort),
            "k" | "keep" | "keep-existing" => Ok(Self::KeepExisting),
            other => Err(ParseDecisionError(other.to_string())),
        }
    }
}

/// A candidate whose name already exists with a different value
#[derive(Debug, Clone, Copy)]
pub struct Conflict<'a> {
    /// Case currently in the matrix
    pub existing: &'a TestCase,
    /// Case proposed by the build
    pub candidate: &'a TestCase,
}

impl Conflict<'_> {
    /// Name shared by both cases
    #[inline]
    #[must_use]
    pub fn test_name(&self) -> &str {
        &self.candidate.test_name
    }
}

/// Source of conflict resolutions
pub trait DecisionProvider {
    /// Decide how to resolve one conflict
    fn decide(&mut self, conflict: &Conflict<'_>) -> MergeDecision;
}

/// Replays a fixed sequence of decisions
///
/// Once the script runs out every further conflict aborts, so a test that
/// under-specifies its script fails loudly instead of silently skipping.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDecisions {
    script: VecDeque<MergeDecision>,
    asked: Vec<String>,
}

impl ScriptedDecisions {
    /// Create from decisions in conflict order
    #[must_use]
    pub fn new(script: impl IntoIterator<Item = MergeDecision>) -> Self {
        Self {
            script: script.into_iter().collect(),
            asked: Vec::new(),
        }
    }

    /// Names of conflicts presented so far, in order
    #[inline]
    #[must_use]
    pub fn asked(&self) -> &[String] {
        &self.asked
    }

    /// Decisions not yet consumed
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl DecisionProvider for ScriptedDecisions {
    fn decide(&mut self, conflict: &Conflict<'_>) -> MergeDecision {
        self.asked.push(conflict.test_name().to_string());
        self.script.pop_front().unwrap_or_else(|| {
            tracing::warn!(test_name = conflict.test_name(), "decision script exhausted, aborting");
            MergeDecision::Abort
        })
    }
}

/// Answers every conflict the same way
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDecision(pub MergeDecision);

impl DecisionProvider for FixedDecision {
    fn decide(&mut self, _conflict: &Conflict<'_>) -> MergeDecision {
        self.0
    }
}

/// Result of a completed merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Matrix to persist
    pub matrix: TestMatrix,
    /// Candidates inserted under new names
    pub added: usize,
    /// Existing cases replaced by candidates
    pub updated: usize,
    /// Candidates identical to the existing case
    pub unchanged: usize,
    /// Conflicts resolved by keeping the existing case
    pub skipped: usize,
    /// Candidates left unapplied by a keep-existing decision, including the
    /// conflict that triggered it
    pub dropped: usize,
}

/// Merge candidates into an existing matrix.
///
/// # Errors
/// `MergeError::Aborted` if the provider answers [`MergeDecision::Abort`];
/// the caller must then leave the store untouched.
pub fn merge(
    existing: TestMatrix,
    candidates: &TestMatrix,
    decisions: &mut dyn DecisionProvider,
) -> Result<MergeReport, MergeError> {
    let mut matrix = existing;
    let mut added = 0;
    let mut updated = 0;
    let mut unchanged = 0;
    let mut skipped = 0;
    let mut overwrite_all = false;

    for (position, candidate) in candidates.iter().enumerate() {
        let decision = match matrix.get(&candidate.test_name) {
            None => {
                matrix.insert(candidate.clone());
                added += 1;
                continue;
            }
            Some(current) if current == candidate => {
                unchanged += 1;
                continue;
            }
            Some(_) if overwrite_all => MergeDecision::Overwrite,
            Some(current) => decisions.decide(&Conflict {
                existing: current,
                candidate,
            }),
        };

        tracing::debug!(test_name = %candidate.test_name, ?decision, "resolved conflict");
        match decision {
            MergeDecision::Skip => skipped += 1,
            MergeDecision::Overwrite => {
                matrix.insert(candidate.clone());
                updated += 1;
            }
            MergeDecision::OverwriteAll => {
                overwrite_all = true;
                matrix.insert(candidate.clone());
                updated += 1;
            }
            MergeDecision::Abort => {
                return Err(MergeError::Aborted {
                    test_name: candidate.test_name.clone(),
                });
            }
            MergeDecision::KeepExisting => {
                let dropped = candidates.len() - position;
                tracing::info!(dropped, "keeping existing cases, remaining candidates dropped");
                return Ok(MergeReport {
                    matrix,
                    added,
                    updated,
                    unchanged,
                    skipped,
                    dropped,
                });
            }
        }
    }

    Ok(MergeReport {
        matrix,
        added,
        updated,
        unchanged,
        skipped,
        dropped: 0,
    })
}
