//! Terminal interaction: confirmations, previews, conflict prompts and run
//! reports
//!
//! Generic over the reader and writer so every dialogue can be driven from
//! a byte buffer in tests.

use aspis_exec::{CaseOutcome, CaseReport, RunSummary};
use aspis_matrix::{Conflict, DecisionProvider, MergeDecision, TestCase, TestMatrix};
use std::io::{self, BufRead, Write};

/// Reader/writer pair the harness talks through
pub struct Console<R, W> {
    input: R,
    output: W,
    assume_yes: bool,
}

impl<R: BufRead, W: Write> Console<R, W> {
    /// Create a console
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            assume_yes: false,
        }
    }

    /// Answer every `[y/N]` question with yes
    #[must_use]
    pub fn assume_yes(mut self, yes: bool) -> Self {
        self.assume_yes = yes;
        self
    }

    /// Writer, for plain output
    pub fn out(&mut self) -> &mut W {
        &mut self.output
    }

    /// Consume the console, returning the writer
    pub fn into_output(self) -> W {
        self.output
    }

    /// Read one trimmed line; `None` at end of input
    ///
    /// # Errors
    /// Propagates read failures.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Ask a `[y/N]` question; only `y`/`yes` confirm.
    ///
    /// # Errors
    /// Propagates IO failures.
    pub fn confirm(&mut self, question: &str) -> io::Result<bool> {
        if self.assume_yes {
            writeln!(self.output, "{question} [y/N]: y")?;
            return Ok(true);
        }
        write!(self.output, "{question} [y/N]: ")?;
        self.output.flush()?;
        let answer = self.read_line()?.unwrap_or_default();
        Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
    }

    /// Print the first `limit` candidates as JSON and a count of the rest
    ///
    /// # Errors
    /// Propagates IO failures.
    pub fn preview(&mut self, candidates: &TestMatrix, limit: usize) -> io::Result<()> {
        writeln!(self.output, "\nGenerated {} test cases. Preview:", candidates.len())?;
        for case in candidates.iter().take(limit) {
            writeln!(self.output, "{}", case_json(case))?;
        }
        if candidates.len() > limit {
            writeln!(self.output, "... and {} more", candidates.len() - limit)?;
        }
        Ok(())
    }

    fn ask_decision(&mut self, conflict: &Conflict<'_>) -> io::Result<MergeDecision> {
        writeln!(self.output, "\nConflict for test '{}':", conflict.test_name())?;
        writeln!(self.output, "Existing:\n{}", case_json(conflict.existing))?;
        writeln!(self.output, "New:\n{}", case_json(conflict.candidate))?;
        write!(
            self.output,
            "Choose: [s]kip, [o]verwrite, [oa] overwrite all, [a]bort, [k]eep all existing: "
        )?;
        self.output.flush()?;

        let Some(answer) = self.read_line()? else {
            writeln!(self.output)?;
            tracing::warn!(test_name = conflict.test_name(), "input closed at conflict prompt, aborting");
            return Ok(MergeDecision::Abort);
        };
        Ok(answer.parse().unwrap_or_else(|_| {
            tracing::warn!(test_name = conflict.test_name(), %answer, "unrecognized choice, skipping");
            MergeDecision::Skip
        }))
    }
}

impl<R: BufRead, W: Write> DecisionProvider for Console<R, W> {
    fn decide(&mut self, conflict: &Conflict<'_>) -> MergeDecision {
        self.ask_decision(conflict).unwrap_or_else(|e| {
            tracing::warn!(test_name = conflict.test_name(), error = %e, "conflict prompt failed, aborting");
            MergeDecision::Abort
        })
    }
}

fn case_json(case: &TestCase) -> String {
    serde_json::to_string_pretty(case).unwrap_or_else(|_| format!("{case:?}"))
}

/// One report line: `PASS name` or `FAIL name: detail`
#[must_use]
pub fn report_line(report: &CaseReport) -> String {
    match &report.outcome {
        CaseOutcome::Pass { .. } => format!("PASS {}", report.test_name),
        CaseOutcome::Mismatch { actual, expected } => format!(
            "FAIL {}: expected {expected:?}, got {actual:?}",
            report.test_name
        ),
        CaseOutcome::CompileFailure { reason, stderr } => format!(
            "FAIL {}: compilation failed ({reason}){}",
            report.test_name,
            stderr_suffix(stderr)
        ),
        CaseOutcome::RunFailure { reason, stderr } => format!(
            "FAIL {}: execution failed ({reason}){}",
            report.test_name,
            stderr_suffix(stderr)
        ),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let stderr = stderr.trim_end();
    if stderr.is_empty() {
        String::new()
    } else {
        format!("\n{stderr}")
    }
}

/// Write every report line followed by totals
///
/// # Errors
/// Propagates IO failures.
pub fn write_summary(out: &mut impl Write, summary: &RunSummary) -> io::Result<()> {
    for report in &summary.reports {
        writeln!(out, "{}", report_line(report))?;
    }
    writeln!(
        out,
        "\n{} passed, {} failed, {} total",
        summary.passed(),
        summary.failed(),
        summary.total()
    )
}
