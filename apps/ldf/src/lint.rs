//! Lint runner for spec documents.
//!
//! For each targeted spec this parses `requirements.md`, `design.md` and
//! `tasks.md`, runs the rule engine, analyzes the guardrail coverage matrix
//! and checks the spec's answerpacks. Spec content defects only ever become
//! diagnostics; one broken spec never stops the batch.

use crate::config::Effective;
use crate::coverage::analyze;
use crate::models::guardrail::GuardrailSet;
use crate::models::policy::LintPolicy;
use crate::models::{Category, CoverageEntry, Diagnostic, LintResult, SpecReport};
use crate::parse::parse_document;
use crate::rules::{check_answerpacks, check_document, DocumentKind, PackRequirement};
use crate::utils::display_path;
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Which specs a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecSelection<'a> {
    All,
    Named(&'a str),
}

/// Everything one lint run reads; shared read-only across worker threads.
#[derive(Debug, Clone, Copy)]
pub struct LintContext<'a> {
    pub root: &'a Path,
    pub specs_dir: &'a Path,
    pub answerpacks_dir: &'a Path,
    pub set: &'a GuardrailSet,
    pub policy: &'a LintPolicy,
    pub packs: &'a [PackRequirement],
    pub strict: bool,
}

impl<'a> LintContext<'a> {
    pub fn new(eff: &'a Effective, set: &'a GuardrailSet) -> Self {
        Self {
            root: &eff.repo_root,
            specs_dir: &eff.specs_dir,
            answerpacks_dir: &eff.answerpacks_dir,
            set,
            policy: &eff.policy,
            packs: &eff.packs,
            strict: eff.strict,
        }
    }
}

/// Diagnostics and coverage produced from one document's text.
#[derive(Debug, Clone, Default)]
pub struct DocumentLint {
    pub diagnostics: Vec<Diagnostic>,
    pub coverage: Vec<CoverageEntry>,
}

/// Lint one document held in memory. Pure: no file access.
pub fn lint_document(
    kind: DocumentKind,
    text: &str,
    set: &GuardrailSet,
    policy: &LintPolicy,
) -> DocumentLint {
    let doc = parse_document(text);
    let mut diagnostics = doc.diagnostics.clone();
    diagnostics.extend(check_document(kind, &doc, &policy.vague_terms));
    let mut coverage = Vec::new();
    if kind == DocumentKind::Requirements {
        let cov = analyze(&doc, set);
        diagnostics.extend(cov.diagnostics);
        coverage = cov.entries;
    }
    DocumentLint {
        diagnostics: diagnostics.into_iter().map(|d| policy.apply(d)).collect(),
        coverage,
    }
}

/// Spec directory names under `specs_dir`, sorted. A missing directory
/// means no specs.
pub fn discover_specs(specs_dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(specs_dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().to_str().map(|s| s.to_string()))
        .filter(|n| !n.starts_with('.'))
        .collect();
    names.sort();
    names
}

/// Lint the selected specs and assemble the run result.
pub fn run_lint(ctx: &LintContext<'_>, selection: SpecSelection<'_>) -> LintResult {
    let names: Vec<String> = match selection {
        SpecSelection::All => discover_specs(ctx.specs_dir),
        SpecSelection::Named(name) => vec![name.to_string()],
    };
    info!(specs = names.len(), guardrails = ctx.set.len(), "linting");
    // Parallel across specs; collect keeps input order
    let reports: Vec<SpecReport> = names.par_iter().map(|n| lint_spec(ctx, n)).collect();
    let generated_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    LintResult::from_reports(reports, ctx.strict, generated_at)
}

/// Lint a single spec directory into its report.
pub fn lint_spec(ctx: &LintContext<'_>, name: &str) -> SpecReport {
    let spec_dir = ctx.specs_dir.join(name);
    if !spec_dir.is_dir() {
        let diag = Diagnostic::new(
            Category::SpecNotFound,
            format!(
                "spec not found: {}",
                display_path(&spec_dir, ctx.root)
            ),
        );
        return SpecReport::new(name, vec![ctx.policy.apply(diag)], Vec::new(), ctx.strict);
    }

    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut coverage: Vec<CoverageEntry> = Vec::new();
    for kind in DocumentKind::ALL {
        let path = spec_dir.join(kind.file_name());
        let rel = display_path(&path, ctx.root);
        if !path.is_file() {
            let diag = Diagnostic::new(Category::MissingFile, format!("missing file: {}", kind.file_name()))
                .in_file(rel);
            diagnostics.push(ctx.policy.apply(diag));
            continue;
        }
        let text = match fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) => {
                let diag = Diagnostic::new(Category::UnreadableFile, format!("cannot read file: {}", e))
                    .in_file(rel);
                diagnostics.push(ctx.policy.apply(diag));
                continue;
            }
        };
        let linted = lint_document(kind, &text, ctx.set, ctx.policy);
        debug!(
            spec = name,
            file = %rel,
            diagnostics = linted.diagnostics.len(),
            "linted document"
        );
        diagnostics.extend(linted.diagnostics.into_iter().map(|d| d.in_file(rel.clone())));
        if kind == DocumentKind::Requirements {
            coverage = linted.coverage;
        }
    }

    let packs_dir = ctx.answerpacks_dir.join(name);
    diagnostics.extend(
        check_answerpacks(&packs_dir, ctx.packs, ctx.root)
            .into_iter()
            .map(|d| ctx.policy.apply(d)),
    );

    SpecReport::new(name, diagnostics, coverage, ctx.strict)
}
