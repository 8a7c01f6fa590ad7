//! Check report types: results, severity levels and report aggregation.

use serde::Serialize;

/// Severity level of a check result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The check passed.
    Pass,
    /// The check found something worth a look but not wrong.
    Warning,
    /// The check failed.
    Failure,
}

impl Severity {
    /// Short tag used in printed reports.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Severity::Pass => "PASS",
            Severity::Warning => "WARN",
            Severity::Failure => "FAIL",
        }
    }
}

/// A single check result.
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    /// Short identifier of the check that produced this result.
    pub validator: String,
    /// Human-readable outcome.
    pub message: String,
    /// Severity of the result.
    pub severity: Severity,
    /// Optional detail lines.
    pub details: Vec<String>,
}

impl TestResult {
    fn with(validator: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            validator: validator.into(),
            message: message.into(),
            severity,
            details: Vec::new(),
        }
    }

    /// Creates a passing result.
    pub fn pass(validator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with(validator, message, Severity::Pass)
    }

    /// Creates a failure result.
    pub fn fail(validator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with(validator, message, Severity::Failure)
    }

    /// Creates a failure result with detail lines.
    pub fn fail_with_details(
        validator: impl Into<String>,
        message: impl Into<String>,
        details: Vec<String>,
    ) -> Self {
        Self {
            details,
            ..Self::fail(validator, message)
        }
    }

    /// Creates a warning result.
    pub fn warn(validator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with(validator, message, Severity::Warning)
    }

    /// Passes when `details` is empty, fails with them otherwise.
    pub fn from_details(
        validator: impl Into<String>,
        ok: impl Into<String>,
        failed: impl Into<String>,
        details: Vec<String>,
    ) -> Self {
        if details.is_empty() {
            Self::pass(validator, ok)
        } else {
            Self::fail_with_details(validator, failed, details)
        }
    }

    /// Returns true if this result is a failure.
    pub fn is_failure(&self) -> bool {
        self.severity == Severity::Failure
    }
}

/// Aggregated results of a check run.
#[derive(Debug, Default, Serialize)]
pub struct ConformanceReport {
    /// Every individual result, in check order.
    pub results: Vec<TestResult>,
}

impl ConformanceReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a result.
    pub fn push(&mut self, result: TestResult) {
        self.results.push(result);
    }

    /// Number of results with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.results.iter().filter(|r| r.severity == severity).count()
    }

    /// Number of failed checks.
    pub fn failure_count(&self) -> usize {
        self.count(Severity::Failure)
    }

    /// True if no check failed.
    pub fn all_passed(&self) -> bool {
        self.failure_count() == 0
    }
}
