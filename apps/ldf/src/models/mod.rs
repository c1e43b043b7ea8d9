//! Shared data models for diagnostics, coverage and lint results.

pub mod document;
pub mod guardrail;
pub mod policy;

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Diagnostic severity. Only `Error` fails a run unless strict mode is on.
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Stable diagnostic categories consumed by CI and MCP tooling.
pub enum Category {
    SpecNotFound,
    MissingFile,
    UnreadableFile,
    MissingSection,
    EmptyDocument,
    MalformedTable,
    GuardrailMatrixMissing,
    GuardrailMatrixIncomplete,
    GuardrailNaWithoutReason,
    UnmatchedMatrixRow,
    GuardrailNameMismatch,
    MissingOwner,
    PlaceholderMarker,
    IncompleteUserStory,
    NoUserStories,
    VagueCriterion,
    IncompleteAnswerpack,
    NoTasks,
    TaskWithoutChecklist,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::SpecNotFound => "spec-not-found",
            Category::MissingFile => "missing-file",
            Category::UnreadableFile => "unreadable-file",
            Category::MissingSection => "missing-section",
            Category::EmptyDocument => "empty-document",
            Category::MalformedTable => "malformed-table",
            Category::GuardrailMatrixMissing => "guardrail-matrix-missing",
            Category::GuardrailMatrixIncomplete => "guardrail-matrix-incomplete",
            Category::GuardrailNaWithoutReason => "guardrail-na-without-reason",
            Category::UnmatchedMatrixRow => "unmatched-matrix-row",
            Category::GuardrailNameMismatch => "guardrail-name-mismatch",
            Category::MissingOwner => "missing-owner",
            Category::PlaceholderMarker => "placeholder-marker",
            Category::IncompleteUserStory => "incomplete-user-story",
            Category::NoUserStories => "no-user-stories",
            Category::VagueCriterion => "vague-criterion",
            Category::IncompleteAnswerpack => "incomplete-answerpack",
            Category::NoTasks => "no-tasks",
            Category::TaskWithoutChecklist => "task-without-checklist",
        }
    }

    /// Severity used when neither the rule nor the policy says otherwise.
    pub fn default_severity(&self) -> Severity {
        match self {
            Category::EmptyDocument
            | Category::MalformedTable
            | Category::UnmatchedMatrixRow
            | Category::GuardrailNameMismatch
            | Category::MissingOwner
            | Category::VagueCriterion
            | Category::NoTasks
            | Category::TaskWithoutChecklist => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Where a diagnostic points: a file, a 1-based line, or a table cell.
pub struct Location {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell: Option<String>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        match (&self.file, self.line) {
            (Some(file), Some(line)) => parts.push(format!("{}:{}", file, line)),
            (Some(file), None) => parts.push(file.clone()),
            (None, Some(line)) => parts.push(format!("line {}", line)),
            (None, None) => {}
        }
        if let Some(cell) = &self.cell {
            parts.push(format!("[{}]", cell));
        }
        f.write_str(&parts.join(" "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A single finding. Pure value; never retained across runs.
pub struct Diagnostic {
    pub severity: Severity,
    pub category: Category,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guardrail: Option<u32>,
}

impl Diagnostic {
    /// Create a diagnostic with the category's default severity.
    pub fn new(category: Category, message: impl Into<String>) -> Self {
        Self {
            severity: category.default_severity(),
            category,
            message: message.into(),
            location: None,
            guardrail: None,
        }
    }

    pub fn warning(category: Category, message: impl Into<String>) -> Self {
        Self::new(category, message).with_severity(Severity::Warning)
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.location.get_or_insert_with(Location::default).line = Some(line);
        self
    }

    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.location.get_or_insert_with(Location::default).file = Some(file.into());
        self
    }

    pub fn with_cell(mut self, cell: impl Into<String>) -> Self {
        self.location.get_or_insert_with(Location::default).cell = Some(cell.into());
        self
    }

    pub fn for_guardrail(mut self, id: u32) -> Self {
        self.guardrail = Some(id);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
/// Per-guardrail verdict in the coverage matrix.
pub enum Verdict {
    Applicable,
    NotApplicable,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// One row of the resolved coverage matrix, one per active guardrail.
pub struct CoverageEntry {
    pub guardrail_id: u32,
    pub guardrail_name: String,
    pub verdict: Verdict,
    pub requirements: Option<String>,
    pub design: Option<String>,
    pub tasks: Option<String>,
    pub owner: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
/// Diagnostics and coverage for one spec, with its verdict triple.
pub struct SpecReport {
    pub spec: String,
    pub errors: usize,
    pub warnings: usize,
    pub passed: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub coverage: Vec<CoverageEntry>,
}

impl SpecReport {
    pub fn new(
        spec: impl Into<String>,
        diagnostics: Vec<Diagnostic>,
        coverage: Vec<CoverageEntry>,
        strict: bool,
    ) -> Self {
        let (errors, warnings) = count_severities(&diagnostics);
        Self {
            spec: spec.into(),
            errors,
            warnings,
            passed: verdict(errors, warnings, strict),
            diagnostics,
            coverage,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
/// Aggregated summary used by printers and exit-code logic.
pub struct Summary {
    pub specs: usize,
    pub errors: usize,
    pub warnings: usize,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize)]
/// Lint results container for one invocation.
pub struct LintResult {
    pub passed: bool,
    pub strict: bool,
    /// Run-level timestamp; never part of any diagnostic.
    pub generated_at: String,
    pub summary: Summary,
    pub specs: Vec<SpecReport>,
}

impl LintResult {
    pub fn from_reports(specs: Vec<SpecReport>, strict: bool, generated_at: String) -> Self {
        let errors = specs.iter().map(|s| s.errors).sum();
        let warnings = specs.iter().map(|s| s.warnings).sum();
        let passed = verdict(errors, warnings, strict);
        LintResult {
            passed,
            strict,
            generated_at,
            summary: Summary {
                specs: specs.len(),
                errors,
                warnings,
                passed,
            },
            specs,
        }
    }
}

fn count_severities(diagnostics: &[Diagnostic]) -> (usize, usize) {
    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    (errors, diagnostics.len() - errors)
}

/// Pass iff no errors; strict mode also fails on warnings.
pub fn verdict(errors: usize, warnings: usize, strict: bool) -> bool {
    errors == 0 && (!strict || warnings == 0)
}
