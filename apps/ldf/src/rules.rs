//! Rule engine: independent structural checks over parsed spec documents.
//!
//! Every check is a pure function from a [`ParsedDocument`] (or, for the
//! answerpack check, a directory listing) to zero or more diagnostics.
//! Checks never read each other's output, so their order is irrelevant.
//! Severity overrides are applied later by the lint pipeline.

use crate::models::document::{ParsedDocument, UserStory};
use crate::models::{Category, Diagnostic, Severity};
use crate::parse::PLACEHOLDER_MARKERS;
use crate::utils::{display_path, static_regex};
use glob::glob;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The three per-feature spec documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Requirements,
    Design,
    Tasks,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [
        DocumentKind::Requirements,
        DocumentKind::Design,
        DocumentKind::Tasks,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            DocumentKind::Requirements => "requirements.md",
            DocumentKind::Design => "design.md",
            DocumentKind::Tasks => "tasks.md",
        }
    }
}

/// A question pack the project expects an answerpack for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackRequirement {
    pub name: String,
    pub critical: bool,
}

/// Run the battery of checks that applies to `kind`.
///
/// The coverage matrix is analyzed separately since it also needs the
/// active guardrail set.
pub fn check_document(
    kind: DocumentKind,
    doc: &ParsedDocument,
    vague_terms: &[String],
) -> Vec<Diagnostic> {
    let mut out = check_placeholders(doc);
    match kind {
        DocumentKind::Requirements => {
            out.extend(check_requirements_sections(doc));
            out.extend(check_no_user_stories(doc));
            out.extend(check_user_stories(doc));
            out.extend(check_vague_criteria(doc, vague_terms));
        }
        DocumentKind::Design => out.extend(check_design_sections(doc)),
        DocumentKind::Tasks => out.extend(check_tasks(doc)),
    }
    out
}

/// One error per placeholder marker outside fenced code blocks.
pub fn check_placeholders(doc: &ParsedDocument) -> Vec<Diagnostic> {
    doc.live_markers()
        .map(|hit| {
            Diagnostic::new(
                Category::PlaceholderMarker,
                format!(
                    "placeholder marker '{}' at column {}: {}",
                    hit.marker, hit.column, hit.context
                ),
            )
            .at_line(hit.line)
        })
        .collect()
}

pub fn check_no_user_stories(doc: &ParsedDocument) -> Vec<Diagnostic> {
    if doc.stories.is_empty() {
        vec![Diagnostic::new(
            Category::NoUserStories,
            "no user stories found (expected headings like '### US-1: Title')",
        )]
    } else {
        Vec::new()
    }
}

/// Every story needs role, capability, benefit and at least one criterion.
pub fn check_user_stories(doc: &ParsedDocument) -> Vec<Diagnostic> {
    doc.stories
        .iter()
        .filter_map(|story| {
            let missing = missing_story_parts(story);
            if missing.is_empty() {
                return None;
            }
            Some(
                Diagnostic::new(
                    Category::IncompleteUserStory,
                    format!("{} is missing: {}", story.id, missing.join(", ")),
                )
                .at_line(story.line),
            )
        })
        .collect()
}

fn missing_story_parts(story: &UserStory) -> Vec<&'static str> {
    let blank = |f: &Option<String>| f.as_deref().map(str::trim).unwrap_or("").is_empty();
    let mut missing = Vec::new();
    if blank(&story.role) {
        missing.push("**As a** role");
    }
    if blank(&story.capability) {
        missing.push("**I want to** capability");
    }
    if blank(&story.benefit) {
        missing.push("**So that** benefit");
    }
    if story.criteria.is_empty() {
        missing.push("acceptance criteria");
    }
    missing
}

/// Advisory: criteria built on a vague phrase with nothing measurable.
pub fn check_vague_criteria(doc: &ParsedDocument, vague_terms: &[String]) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for story in &doc.stories {
        for ac in &story.criteria {
            let lowered = ac.text.to_lowercase();
            let Some(term) = vague_terms.iter().find(|t| lowered.contains(t.as_str())) else {
                continue;
            };
            if is_quantifiable(&ac.text) {
                continue;
            }
            let label = ac.id.clone().unwrap_or_else(|| story.id.clone());
            out.push(
                Diagnostic::new(
                    Category::VagueCriterion,
                    format!(
                        "{} is not testable: '{}' has no measurable condition",
                        label, term
                    ),
                )
                .at_line(ac.line),
            );
        }
    }
    out
}

/// Contains a digit (counts, limits, status codes) or a comparison operator.
fn is_quantifiable(text: &str) -> bool {
    text.chars()
        .any(|c| c.is_ascii_digit() || matches!(c, '<' | '>' | '=' | '≤' | '≥'))
}

pub fn check_requirements_sections(doc: &ParsedDocument) -> Vec<Diagnostic> {
    if doc.has_section("question-pack answers") {
        return Vec::new();
    }
    vec![Diagnostic::new(
        Category::MissingSection,
        "missing '## Question-Pack Answers' section",
    )]
}

/// Design documents should map guardrails and describe architecture and
/// interfaces; each gap is a warning.
pub fn check_design_sections(doc: &ParsedDocument) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    if !doc.has_section("guardrail mapping") {
        out.push(Diagnostic::warning(
            Category::MissingSection,
            "missing '## Guardrail Mapping' section",
        ));
    }
    if !doc.has_section("architecture") && !doc.has_section("components") {
        out.push(Diagnostic::warning(
            Category::MissingSection,
            "no Architecture or Components section",
        ));
    }
    let interface = static_regex!(r"(?i)\b(api|endpoints?|routes?|data|schema|models?|database)\b");
    if !doc.sections.iter().any(|s| interface.is_match(&s.title)) {
        out.push(Diagnostic::warning(
            Category::MissingSection,
            "no API or Data Model section found",
        ));
    }
    out
}

/// A task found in `tasks.md`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRef {
    pub id: String,
    pub line: usize,
    /// Heading-form tasks carry their section index.
    pub section: Option<usize>,
}

/// Collect heading-form (`### Task 1.1: ...`) and checklist-form
/// (`- [ ] **Task 1.1:** ...`) tasks, first occurrence per id.
pub fn extract_tasks(doc: &ParsedDocument) -> Vec<TaskRef> {
    let heading = static_regex!(r"^(?:Task\s+)?(\d+\.\d+(?:\.\d+)?)\s*[:.)\-]");
    let item = static_regex!(r"^\*{0,2}Task\s+(\d+(?:\.\d+)+)\b");
    let mut tasks: Vec<TaskRef> = Vec::new();
    for (idx, s) in doc.sections.iter().enumerate() {
        let title = s.title.trim_matches('*').trim();
        if let Some(c) = heading.captures(title) {
            tasks.push(TaskRef {
                id: c[1].to_string(),
                line: s.line,
                section: Some(idx),
            });
        }
    }
    for li in doc.list_items.iter().filter(|li| li.checked.is_some()) {
        if let Some(c) = item.captures(li.text.trim()) {
            tasks.push(TaskRef {
                id: c[1].to_string(),
                line: li.line,
                section: None,
            });
        }
    }
    tasks.sort_by_key(|t| t.line);
    let mut seen: Vec<String> = Vec::new();
    tasks.retain(|t| {
        if seen.contains(&t.id) {
            false
        } else {
            seen.push(t.id.clone());
            true
        }
    });
    tasks
}

pub fn check_tasks(doc: &ParsedDocument) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    if !doc.has_section("per-task guardrail checklist") {
        out.push(Diagnostic::new(
            Category::MissingSection,
            "missing '## Per-Task Guardrail Checklist' section",
        ));
    }
    let tasks = extract_tasks(doc);
    if tasks.is_empty() {
        out.push(Diagnostic::new(Category::NoTasks, "no tasks found"));
        return out;
    }
    for task in &tasks {
        let Some(idx) = task.section else {
            continue;
        };
        let level = doc.sections[idx].level;
        let end = doc.sections[idx + 1..]
            .iter()
            .position(|s| s.level <= level)
            .map(|p| idx + 1 + p)
            .unwrap_or(doc.sections.len());
        let has_checklist = doc.list_items.iter().any(|li| {
            li.checked.is_some() && li.section.is_some_and(|s| s >= idx && s < end)
        });
        if !has_checklist {
            out.push(
                Diagnostic::new(
                    Category::TaskWithoutChecklist,
                    format!("task {} has no checklist items", task.id),
                )
                .at_line(task.line),
            );
        }
    }
    out
}

fn answerpack_files(dir: &Path) -> Vec<PathBuf> {
    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let mut files: Vec<PathBuf> = ["yaml", "yml"]
        .iter()
        .filter_map(|ext| glob(&format!("{}/*.{}", base, ext)).ok())
        .flat_map(|paths| paths.filter_map(Result::ok))
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    files
}

/// Cross-file check of `dir` (the spec's answerpack directory).
///
/// A missing or empty directory is one diagnostic, an error when any pack
/// is critical. Otherwise each expected pack must have a `<name>.yaml` or
/// `<name>.yml`, and every answerpack is scanned for placeholder markers.
pub fn check_answerpacks(dir: &Path, packs: &[PackRequirement], root: &Path) -> Vec<Diagnostic> {
    let rel_dir = display_path(dir, root);
    let any_critical = packs.iter().any(|p| p.critical);
    let severity_for = |critical: bool| {
        if critical {
            Severity::Error
        } else {
            Severity::Warning
        }
    };

    let files = if dir.is_dir() {
        answerpack_files(dir)
    } else {
        Vec::new()
    };
    debug!(dir = %rel_dir, files = files.len(), "answerpacks");
    if files.is_empty() {
        let message = if dir.is_dir() {
            format!("answerpack directory {}/ contains no YAML files", rel_dir)
        } else {
            format!("no answerpacks found at {}/", rel_dir)
        };
        return vec![
            Diagnostic::new(Category::IncompleteAnswerpack, message)
                .with_severity(severity_for(any_critical)),
        ];
    }

    let mut out = Vec::new();
    for pack in packs {
        let present = files.iter().any(|f| {
            f.file_stem().and_then(|s| s.to_str()) == Some(pack.name.as_str())
        });
        if !present {
            let kind = if pack.critical { "critical" } else { "question" };
            out.push(
                Diagnostic::new(
                    Category::IncompleteAnswerpack,
                    format!(
                        "missing answerpack for {} pack '{}' (expected {}/{}.yaml)",
                        kind, pack.name, rel_dir, pack.name
                    ),
                )
                .with_severity(severity_for(pack.critical)),
            );
        }
    }

    for file in &files {
        let rel = display_path(file, root);
        match fs::read_to_string(file) {
            Ok(text) => out.extend(scan_text_markers(&text, &rel)),
            Err(e) => out.push(
                Diagnostic::new(
                    Category::UnreadableFile,
                    format!("cannot read answerpack: {}", e),
                )
                .in_file(rel),
            ),
        }
    }
    out
}

/// Marker scan for non-markdown files: every occurrence, no fence handling.
fn scan_text_markers(text: &str, file: &str) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let mut hits: Vec<(usize, &str)> = PLACEHOLDER_MARKERS
            .iter()
            .flat_map(|m| line.match_indices(m))
            .collect();
        hits.sort_unstable();
        for (_, marker) in hits {
            out.push(
                Diagnostic::new(
                    Category::PlaceholderMarker,
                    format!("unfilled template marker '{}': {}", marker, line.trim()),
                )
                .in_file(file)
                .at_line(idx + 1),
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::policy::LintPolicy;
    use crate::parse::parse_document;
    use tempfile::tempdir;

    const REQUIREMENTS: &str = "# Requirements: auth

## Question-Pack Answers

Security pack answered.

## User Stories

### US-1: Login

**As a** registered user
**I want to** sign in with my email
**So that** I can reach my dashboard

**Acceptance Criteria:**
- [ ] **AC-1.1:** Valid credentials return HTTP 200
- [ ] **AC-1.2:** Invalid credentials show an error message
";

    fn terms() -> Vec<String> {
        LintPolicy::default().vague_terms
    }

    fn categories(diags: &[Diagnostic]) -> Vec<Category> {
        diags.iter().map(|d| d.category).collect()
    }

    #[test]
    fn test_complete_story_yields_no_story_diagnostics() {
        let doc = parse_document(REQUIREMENTS);
        let diags = check_document(DocumentKind::Requirements, &doc, &terms());
        assert!(diags.is_empty(), "{:?}", diags);
    }

    #[test]
    fn test_placeholder_count_matches_unfenced_occurrences() {
        let md = "# Doc\n\n[TBD] owner\nsee [TBD] and [TBD]\n\n```\n[TBD]\n```\n";
        let diags = check_placeholders(&parse_document(md));
        assert_eq!(diags.len(), 3);
        assert!(diags.iter().all(|d| d.category == Category::PlaceholderMarker));
        assert!(diags.iter().all(|d| d.is_error()));
        let lines: Vec<Option<usize>> = diags
            .iter()
            .map(|d| d.location.as_ref().and_then(|l| l.line))
            .collect();
        assert_eq!(lines, vec![Some(3), Some(4), Some(4)]);
    }

    #[test]
    fn test_incomplete_story_names_story_and_missing_parts() {
        let md = "## User Stories\n\n### US-4: Export\n\n**As a** admin\n";
        let diags = check_user_stories(&parse_document(md));
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.starts_with("US-4"));
        assert!(diags[0].message.contains("benefit"));
        assert!(diags[0].message.contains("acceptance criteria"));
        assert!(!diags[0].message.contains("role"));
    }

    #[test]
    fn test_no_user_stories_is_error() {
        let diags = check_no_user_stories(&parse_document("# Requirements\n\ntext\n"));
        assert_eq!(categories(&diags), vec![Category::NoUserStories]);
        assert!(diags[0].is_error());
    }

    #[test]
    fn test_vague_criterion_warns_unless_quantified() {
        let md = REQUIREMENTS.replace(
            "Invalid credentials show an error message",
            "Login works correctly",
        );
        let diags = check_vague_criteria(&parse_document(&md), &terms());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Warning);
        assert!(diags[0].message.contains("AC-1.2"));

        let md = REQUIREMENTS.replace(
            "Invalid credentials show an error message",
            "Search is fast (p95 < 200ms)",
        );
        assert!(check_vague_criteria(&parse_document(&md), &terms()).is_empty());
    }

    #[test]
    fn test_design_section_warnings() {
        let doc = parse_document("# Design\n\n## Overview\n\ntext\n");
        let diags = check_design_sections(&doc);
        assert_eq!(diags.len(), 3);
        assert!(diags.iter().all(|d| !d.is_error()));

        let doc = parse_document(
            "# Design\n\n## Architecture\n\n## API Endpoints\n\n## Guardrail Mapping\n",
        );
        assert!(check_design_sections(&doc).is_empty());
    }

    #[test]
    fn test_tasks_checks_both_task_forms() {
        let md = "# Tasks

## Per-Task Guardrail Checklist

- [ ] Testing Coverage

## Phase 1

### Task 1.1: Create schema

- [ ] Write migration

### Task 1.2: Wire API

Just prose here.

## Phase 2

- [ ] **Task 2.1:** Add docs
";
        let doc = parse_document(md);
        let ids: Vec<String> = extract_tasks(&doc).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["1.1", "1.2", "2.1"]);
        let diags = check_tasks(&doc);
        assert_eq!(categories(&diags), vec![Category::TaskWithoutChecklist]);
        assert!(diags[0].message.contains("1.2"));
    }

    #[test]
    fn test_tasks_without_checklist_section_or_tasks() {
        let diags = check_tasks(&parse_document("# Tasks\n\nnothing yet\n"));
        assert_eq!(
            categories(&diags),
            vec![Category::MissingSection, Category::NoTasks]
        );
        assert!(diags[0].is_error());
        assert!(!diags[1].is_error());
    }

    #[test]
    fn test_answerpacks_missing_dir_severity_follows_criticality() {
        let dir = tempdir().unwrap();
        let packs_dir = dir.path().join(".ldf/answerpacks/auth");
        let lenient = check_answerpacks(&packs_dir, &[], dir.path());
        assert_eq!(lenient.len(), 1);
        assert_eq!(lenient[0].severity, Severity::Warning);
        assert!(lenient[0].message.contains(".ldf/answerpacks/auth/"));

        let critical = vec![PackRequirement {
            name: "security".into(),
            critical: true,
        }];
        let strict = check_answerpacks(&packs_dir, &critical, dir.path());
        assert_eq!(strict.len(), 1);
        assert_eq!(strict[0].severity, Severity::Error);
    }

    #[test]
    fn test_answerpacks_dir_without_yaml_is_one_diagnostic() {
        let dir = tempdir().unwrap();
        let packs_dir = dir.path().join(".ldf/answerpacks/auth");
        fs::create_dir_all(&packs_dir).unwrap();
        fs::write(packs_dir.join("notes.md"), "security: done\n").unwrap();
        let packs = vec![PackRequirement {
            name: "security".into(),
            critical: false,
        }];
        let diags = check_answerpacks(&packs_dir, &packs, dir.path());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].category, Category::IncompleteAnswerpack);
        assert_eq!(diags[0].severity, Severity::Warning);
        assert!(diags[0].message.contains("contains no YAML files"));
    }

    #[test]
    fn test_answerpacks_missing_packs_and_markers() {
        let dir = tempdir().unwrap();
        let packs_dir = dir.path().join(".ldf/answerpacks/auth");
        fs::create_dir_all(&packs_dir).unwrap();
        fs::write(
            packs_dir.join("security.yaml"),
            "auth_method: oauth\nsecret_store: YOUR_VAULT\nnotes: \"[TODO: fill]\"\n",
        )
        .unwrap();
        let packs = vec![
            PackRequirement {
                name: "security".into(),
                critical: true,
            },
            PackRequirement {
                name: "billing".into(),
                critical: true,
            },
            PackRequirement {
                name: "ux".into(),
                critical: false,
            },
        ];
        let diags = check_answerpacks(&packs_dir, &packs, dir.path());
        let missing: Vec<&Diagnostic> = diags
            .iter()
            .filter(|d| d.category == Category::IncompleteAnswerpack)
            .collect();
        assert_eq!(missing.len(), 2);
        assert!(missing[0].message.contains("billing") && missing[0].is_error());
        assert!(missing[1].message.contains("ux") && !missing[1].is_error());
        let markers: Vec<&Diagnostic> = diags
            .iter()
            .filter(|d| d.category == Category::PlaceholderMarker)
            .collect();
        assert_eq!(markers.len(), 2);
        let loc = markers[0].location.as_ref().unwrap();
        assert_eq!(
            loc.file.as_deref(),
            Some(".ldf/answerpacks/auth/security.yaml")
        );
        assert_eq!(loc.line, Some(2));
    }
}
