//! Coverage matrix analyzer.
//!
//! Finds the guardrail coverage table in a parsed requirements document and
//! cross-references its rows against the active [`GuardrailSet`]. Rows are
//! matched by the numeric id they carry (an `#`/`id` column or a leading
//! numeral in the guardrail cell). Rows without an id fall back to an exact
//! normalized name match; anything else is reported as unmatched rather
//! than guessed.

use crate::models::document::{ParsedDocument, Table, TableRow};
use crate::models::guardrail::{GuardrailDefinition, GuardrailSet};
use crate::models::{Category, CoverageEntry, Diagnostic, Verdict};
use crate::utils::static_regex;
use std::collections::BTreeSet;

/// Result of analyzing one document against a guardrail set.
#[derive(Debug, Clone, Default)]
pub struct Coverage {
    /// One entry per active guardrail in registry order; empty when the
    /// matrix table is missing.
    pub entries: Vec<CoverageEntry>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Column positions of a recognized matrix header.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MatrixLayout {
    id: Option<usize>,
    guardrail: usize,
    requirements: usize,
    design: usize,
    tasks: usize,
    owner: Option<usize>,
    status: Option<usize>,
}

impl MatrixLayout {
    /// Detect column roles from header text. Requires guardrail,
    /// requirements, design and tasks columns; owner, status and a leading
    /// id column are optional. Column order is irrelevant.
    fn detect(header: &[String]) -> Option<Self> {
        let mut id = None;
        let mut guardrail = None;
        let mut requirements = None;
        let mut design = None;
        let mut tasks = None;
        let mut owner = None;
        let mut status = None;
        for (idx, raw) in header.iter().enumerate() {
            let h = normalize(raw);
            let slot = if matches!(h.as_str(), "#" | "id" | "no" | "no.") {
                &mut id
            } else if h.contains("guardrail") {
                &mut guardrail
            } else if h.contains("requirement") {
                &mut requirements
            } else if h.contains("design") {
                &mut design
            } else if h.contains("task") || h.contains("test") {
                &mut tasks
            } else if h.contains("owner") {
                &mut owner
            } else if h.contains("status") {
                &mut status
            } else {
                continue;
            };
            if slot.is_none() {
                *slot = Some(idx);
            }
        }
        Some(Self {
            id,
            guardrail: guardrail?,
            requirements: requirements?,
            design: design?,
            tasks: tasks?,
            owner,
            status,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellClass {
    Blank,
    Na,
    NaWithReason,
    Placeholder,
    Value,
}

fn classify_cell(text: &str) -> CellClass {
    let t = strip_emphasis(text);
    if t.is_empty() || matches!(t, "-" | "–" | "—") {
        return CellClass::Blank;
    }
    let placeholder = static_regex!(r"\[(?:TBD|TODO|PLACEHOLDER)[^\]]*\]|YOUR_\w*");
    if placeholder.is_match(t) {
        let rest = placeholder.replace_all(t, "");
        if rest.chars().all(|c| !c.is_alphanumeric()) {
            return CellClass::Placeholder;
        }
    }
    if t.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("n/a")) {
        let reason = t[3..]
            .trim_start_matches(|c: char| {
                c.is_whitespace() || matches!(c, '-' | '–' | '—' | ':' | ',' | ';' | '(')
            })
            .trim_end_matches(|c: char| c.is_whitespace() || c == ')');
        return if reason.is_empty() {
            CellClass::Na
        } else {
            CellClass::NaWithReason
        };
    }
    CellClass::Value
}

fn strip_emphasis(text: &str) -> &str {
    text.trim().trim_matches(|c| c == '*' || c == '_' || c == '`').trim()
}

/// Whitespace-collapsed, lowercased text without emphasis markers.
fn normalize(text: &str) -> String {
    strip_emphasis(text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A matrix data row reduced to its identity and phase cells.
#[derive(Debug)]
struct MatrixRow<'a> {
    row: &'a TableRow,
    id: Option<u32>,
    /// Guardrail cell with any leading id removed.
    name: String,
    label: String,
}

impl<'a> MatrixRow<'a> {
    fn read(row: &'a TableRow, layout: &MatrixLayout) -> Self {
        let label = cell_at(row, Some(layout.guardrail)).to_string();
        let leading = static_regex!(r"^(\d+)\s*[.):\-]?\s*(.*)$");
        let stripped = strip_emphasis(&label);
        let (mut id, name) = match leading.captures(stripped) {
            Some(caps) => (
                caps[1].parse::<u32>().ok(),
                strip_emphasis(&caps[2]).to_string(),
            ),
            None => (None, stripped.to_string()),
        };
        if let Some(col) = layout.id {
            let digits = static_regex!(r"\d+");
            if let Some(m) = digits.find(cell_at(row, Some(col))) {
                id = m.as_str().parse::<u32>().ok().or(id);
            }
        }
        Self {
            row,
            id,
            name,
            label,
        }
    }

    fn is_blank(&self) -> bool {
        self.row.cells.iter().all(|(_, c)| c.trim().is_empty())
    }

    fn matches(&self, g: &GuardrailDefinition) -> bool {
        match self.id {
            Some(id) => id == g.id,
            None => !self.name.is_empty() && normalize(&self.name) == normalize(&g.name),
        }
    }
}

fn cell_at(row: &TableRow, col: Option<usize>) -> &str {
    col.and_then(|c| row.cells.get(c))
        .map(|(_, text)| text.trim())
        .unwrap_or("")
}

fn non_empty(text: &str) -> Option<String> {
    let t = text.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// Locate the first table whose header carries the matrix signature.
fn find_matrix(doc: &ParsedDocument) -> Option<(&Table, MatrixLayout)> {
    doc.tables
        .iter()
        .find_map(|t| MatrixLayout::detect(&t.header).map(|layout| (t, layout)))
}

/// Analyze the coverage matrix of `doc` against `set`.
pub fn analyze(doc: &ParsedDocument, set: &GuardrailSet) -> Coverage {
    let Some((table, layout)) = find_matrix(doc) else {
        return Coverage {
            entries: Vec::new(),
            diagnostics: vec![Diagnostic::new(
                Category::GuardrailMatrixMissing,
                "guardrail coverage matrix not found (expected a table with Guardrail, \
                 Requirements, Design and Tasks columns)",
            )],
        };
    };

    let rows: Vec<MatrixRow> = table
        .rows
        .iter()
        .map(|r| MatrixRow::read(r, &layout))
        .filter(|r| !r.is_blank())
        .collect();
    let mut consumed = vec![false; rows.len()];
    let mut entries = Vec::with_capacity(set.len());
    let mut diagnostics = Vec::new();

    for g in set {
        let found = rows
            .iter()
            .enumerate()
            .find(|(idx, r)| !consumed[*idx] && r.matches(g));
        let Some((idx, row)) = found else {
            // Opt-in guardrails only need a row when a spec claims them.
            let verdict = if g.applicable_by_default {
                diagnostics.push(
                    Diagnostic::new(
                        Category::GuardrailMatrixIncomplete,
                        format!("guardrail {} has no row in the coverage matrix", g.label()),
                    )
                    .at_line(table.line)
                    .for_guardrail(g.id),
                );
                Verdict::NotFound
            } else {
                Verdict::NotApplicable
            };
            entries.push(CoverageEntry {
                guardrail_id: g.id,
                guardrail_name: g.name.clone(),
                verdict,
                requirements: None,
                design: None,
                tasks: None,
                owner: None,
                status: None,
            });
            continue;
        };
        consumed[idx] = true;

        if row.id.is_some() && !row.name.is_empty() && normalize(&row.name) != normalize(&g.name)
        {
            diagnostics.push(
                Diagnostic::new(
                    Category::GuardrailNameMismatch,
                    format!(
                        "matrix row {} is labelled '{}' but guardrail {} is '{}'",
                        g.id, row.name, g.id, g.name
                    ),
                )
                .at_line(row.row.line)
                .for_guardrail(g.id),
            );
        }

        let (verdict, found_diags) = judge_row(row, &layout, g, table);
        diagnostics.extend(found_diags);
        entries.push(CoverageEntry {
            guardrail_id: g.id,
            guardrail_name: g.name.clone(),
            verdict,
            requirements: non_empty(cell_at(row.row, Some(layout.requirements))),
            design: non_empty(cell_at(row.row, Some(layout.design))),
            tasks: non_empty(cell_at(row.row, Some(layout.tasks))),
            owner: non_empty(cell_at(row.row, layout.owner)),
            status: non_empty(cell_at(row.row, layout.status)),
        });
    }

    for (idx, row) in rows.iter().enumerate() {
        if consumed[idx] {
            continue;
        }
        let duplicate = rows[..idx]
            .iter()
            .zip(&consumed)
            .any(|(prev, used)| *used && prev.id.is_some() && prev.id == row.id);
        let message = if duplicate {
            format!("duplicate matrix row '{}'; the first row wins", row.label)
        } else {
            format!("matrix row '{}' does not match any active guardrail", row.label)
        };
        diagnostics
            .push(Diagnostic::new(Category::UnmatchedMatrixRow, message).at_line(row.row.line));
    }

    Coverage {
        entries,
        diagnostics: dedupe(diagnostics),
    }
}

/// Decide the verdict for a matched row and collect its diagnostics.
///
/// Exclusion is decided by the phase cells and status alone: a row where
/// none of them holds a real reference is N/A, and must give a reason in
/// some cell. Applicable rows need a reference in every phase and an owner
/// when the matrix has an owner column.
fn judge_row(
    row: &MatrixRow,
    layout: &MatrixLayout,
    g: &GuardrailDefinition,
    table: &Table,
) -> (Verdict, Vec<Diagnostic>) {
    let phases = [layout.requirements, layout.design, layout.tasks];
    let class_of = |col: usize| classify_cell(cell_at(row.row, Some(col)));
    let deciding: Vec<CellClass> = phases
        .iter()
        .copied()
        .chain(layout.status)
        .map(class_of)
        .collect();

    let excluded = !deciding
        .iter()
        .any(|c| matches!(c, CellClass::Value | CellClass::Placeholder))
        && deciding
            .iter()
            .any(|c| matches!(c, CellClass::Na | CellClass::NaWithReason));
    if excluded {
        let reasoned = deciding.contains(&CellClass::NaWithReason)
            || layout
                .owner
                .is_some_and(|c| class_of(c) == CellClass::NaWithReason);
        if reasoned {
            return (Verdict::NotApplicable, Vec::new());
        }
        let diag = Diagnostic::new(
            Category::GuardrailNaWithoutReason,
            format!(
                "guardrail {} is marked N/A without a reason (write e.g. 'N/A - no database access')",
                g.label()
            ),
        )
        .at_line(row.row.line)
        .for_guardrail(g.id);
        return (Verdict::NotApplicable, vec![diag]);
    }

    let mut diagnostics = Vec::new();
    let gaps: Vec<&str> = phases
        .iter()
        .filter(|col| {
            matches!(
                class_of(**col),
                CellClass::Blank | CellClass::Placeholder | CellClass::Na
            )
        })
        .map(|col| table.header[*col].as_str())
        .collect();
    if !gaps.is_empty() {
        diagnostics.push(
            Diagnostic::new(
                Category::GuardrailMatrixIncomplete,
                format!(
                    "guardrail {} is missing references for: {}",
                    g.label(),
                    gaps.join(", ")
                ),
            )
            .at_line(row.row.line)
            .with_cell(gaps.join(", "))
            .for_guardrail(g.id),
        );
    }
    if let Some(col) = layout.owner {
        if matches!(class_of(col), CellClass::Blank | CellClass::Placeholder) {
            diagnostics.push(
                Diagnostic::new(
                    Category::MissingOwner,
                    format!("guardrail {} has no owner", g.label()),
                )
                .at_line(row.row.line)
                .with_cell(table.header[col].as_str())
                .for_guardrail(g.id),
            );
        }
    }
    (Verdict::Applicable, diagnostics)
}

/// Drop repeated `(category, guardrail)` pairs; diagnostics without a
/// guardrail are kept as-is.
fn dedupe(diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
    let mut seen: BTreeSet<(Category, u32)> = BTreeSet::new();
    diagnostics
        .into_iter()
        .filter(|d| match d.guardrail {
            Some(id) => seen.insert((d.category, id)),
            None => true,
        })
        .collect()
}
