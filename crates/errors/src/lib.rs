//! `braze-errors` provides the shared diagnostic plumbing of the
//! toolchain.
//!
//! Both tools keep going after a recoverable error so that one run
//! reports as many problems as possible; the [`Reporter`] carries the
//! error and warning counters that decide the process exit code. Fatal
//! errors still travel as `Result`s, for which [`Result`] (re-exported
//! from `miette`) is the right top-level type.

#![deny(unused)]
#![deny(warnings)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::missing_crate_level_docs)]
#![deny(rustdoc::invalid_codeblock_attributes)]
#![deny(rustdoc::invalid_rust_codeblocks)]

use std::fmt::Display;

pub use miette::Result;

/// Severity of a reported diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Counts toward the failure exit code.
    Error,
    /// Reported but never fails the run.
    Warning,
}

impl Severity {
    fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

/// Collects diagnostics on standard error and counts them.
///
/// Source-anchored messages are printed as `FILE:LINE: error|warning: MSG`;
/// tool-level messages drop the location prefix.
#[derive(Debug, Default)]
pub struct Reporter {
    errors: usize,
    warnings: usize,
}

impl Reporter {
    /// Create a reporter with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a diagnostic anchored at `file:line`.
    pub fn diagnose(&mut self, severity: Severity, file: &str, line: u32, message: impl Display) {
        self.count(severity);
        eprintln!("{file}:{line}: {}: {message}", severity.label());
    }

    /// Report a diagnostic with no source location.
    pub fn message(&mut self, severity: Severity, message: impl Display) {
        self.count(severity);
        eprintln!("{}: {message}", severity.label());
    }

    /// Bump a counter without printing. Used when a condition was already
    /// reported by an earlier pass.
    pub fn count(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
        }
    }

    /// Number of errors reported so far.
    pub fn error_count(&self) -> usize {
        self.errors
    }

    /// Number of warnings reported so far.
    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    /// Whether any error has been reported.
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let mut reporter = Reporter::new();

        assert!(!reporter.has_errors());

        reporter.count(Severity::Warning);
        assert!(!reporter.has_errors());
        assert_eq!(reporter.warning_count(), 1);

        reporter.count(Severity::Error);
        reporter.count(Severity::Error);
        assert!(reporter.has_errors());
        assert_eq!(reporter.error_count(), 2);
    }
}
