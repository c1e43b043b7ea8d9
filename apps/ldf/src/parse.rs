//! Markdown spec parser.
//!
//! Every line is classified once into a [`LineKind`], tracking fenced code
//! blocks, and the structure passes (sections, tables, list items, user
//! stories) work over that classification. Fenced content never produces
//! structure. Placeholder markers are recorded everywhere, with a `fenced`
//! flag so rules can exclude documentation-about-placeholders.
//!
//! Parsing never fails: local defects become diagnostics on the returned
//! document.

use crate::models::document::{
    AcceptanceCriterion, ListItem, MarkerHit, ParsedDocument, Section, Table, TableRow, UserStory,
};
use crate::models::{Category, Diagnostic};
use crate::utils::static_regex;

/// Reserved tokens marking unfinished content (case-sensitive).
pub const PLACEHOLDER_MARKERS: &[&str] = &["[TBD]", "[TODO", "[PLACEHOLDER", "YOUR_"];

const CONTEXT_WIDTH: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Tagged classification of a single source line.
pub enum LineKind {
    Blank,
    FenceBoundary,
    FenceContent,
    Heading { level: u8, text: String },
    TableRow(Vec<String>),
    ListItem {
        indent: usize,
        checked: Option<bool>,
        text: String,
    },
    Text,
}

/// Classify all lines, tracking fence state across them.
pub fn classify_lines(text: &str) -> Vec<LineKind> {
    let mut fence: Option<(char, usize)> = None;
    let mut out = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim_start();
        if let Some((ch, len)) = fence {
            if closes_fence(trimmed, ch, len) {
                fence = None;
                out.push(LineKind::FenceBoundary);
            } else {
                out.push(LineKind::FenceContent);
            }
            continue;
        }
        if let Some(open) = fence_run(trimmed) {
            fence = Some(open);
            out.push(LineKind::FenceBoundary);
            continue;
        }
        out.push(classify(line));
    }
    out
}

/// Marker character and run length of a fence line (three or more).
fn fence_run(trimmed: &str) -> Option<(char, usize)> {
    let ch = trimmed.chars().next().filter(|c| matches!(c, '`' | '~'))?;
    let len = trimmed.chars().take_while(|c| *c == ch).count();
    (len >= 3).then_some((ch, len))
}

/// A closing fence uses the opening character, is at least as long, and
/// carries nothing after the run.
fn closes_fence(trimmed: &str, ch: char, len: usize) -> bool {
    match fence_run(trimmed) {
        Some((c, n)) => c == ch && n >= len && trimmed[n * c.len_utf8()..].trim().is_empty(),
        None => false,
    }
}

/// Classify one line outside a fence.
pub fn classify(line: &str) -> LineKind {
    if line.trim().is_empty() {
        return LineKind::Blank;
    }
    let heading = static_regex!(r"^ {0,3}(#{1,6})(?:[ \t]+(.*?))?(?:[ \t]+#+)?[ \t]*$");
    if let Some(c) = heading.captures(line) {
        let level = c.get(1).map(|m| m.as_str().len()).unwrap_or(1) as u8;
        let text = c.get(2).map(|m| m.as_str().trim()).unwrap_or("");
        return LineKind::Heading {
            level,
            text: text.to_string(),
        };
    }
    let trimmed = line.trim();
    if trimmed.starts_with('|') {
        return LineKind::TableRow(split_cells(trimmed));
    }
    let list = static_regex!(r"^(\s*)(?:[-*+]|\d+[.)])\s+(?:\[([ xX])\]\s*)?(.*)$");
    if let Some(c) = list.captures(line) {
        let indent = c.get(1).map(|m| m.as_str().replace('\t', "    ").len()).unwrap_or(0);
        let checked = c.get(2).map(|m| !m.as_str().trim().is_empty());
        let text = c.get(3).map(|m| m.as_str().trim()).unwrap_or("");
        return LineKind::ListItem {
            indent,
            checked,
            text: text.to_string(),
        };
    }
    LineKind::Text
}

/// Split a pipe-table line into trimmed cells, honoring `\|` escapes.
pub fn split_cells(line: &str) -> Vec<String> {
    let inner = line.trim();
    let inner = inner.strip_prefix('|').unwrap_or(inner);
    let inner = if inner.ends_with('|') && !inner.ends_with("\\|") {
        &inner[..inner.len() - 1]
    } else {
        inner
    };
    let mut cells = Vec::new();
    let mut cur = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' if chars.peek() == Some(&'|') => {
                cur.push('|');
                chars.next();
            }
            '|' => {
                cells.push(cur.trim().to_string());
                cur.clear();
            }
            _ => cur.push(ch),
        }
    }
    cells.push(cur.trim().to_string());
    cells
}

fn is_separator_row(cells: &[String]) -> bool {
    let sep = static_regex!(r"^:?-{1,}:?$");
    !cells.is_empty() && cells.iter().all(|c| sep.is_match(c))
}

/// Parse raw markdown into a [`ParsedDocument`].
pub fn parse_document(text: &str) -> ParsedDocument {
    let lines: Vec<&str> = text.lines().collect();
    let kinds = classify_lines(text);
    let mut doc = ParsedDocument {
        markers: scan_markers(&lines, &kinds),
        ..Default::default()
    };

    let mut current: Option<usize> = None;
    let mut i = 0;
    while i < kinds.len() {
        let line_no = i + 1;
        match &kinds[i] {
            LineKind::Heading { level, text } => {
                doc.sections.push(Section {
                    level: *level,
                    title: text.clone(),
                    line: line_no,
                    body: String::new(),
                });
                current = Some(doc.sections.len() - 1);
                i += 1;
                continue;
            }
            LineKind::TableRow(header) => {
                if let Some(LineKind::TableRow(sep)) = kinds.get(i + 1) {
                    if is_separator_row(sep) {
                        let end = read_table(&mut doc, &kinds, i, header, sep, current);
                        append_body(&mut doc, current, &lines[i..end]);
                        i = end;
                        continue;
                    }
                }
            }
            LineKind::ListItem {
                indent,
                checked,
                text,
            } => doc.list_items.push(ListItem {
                line: line_no,
                indent: *indent,
                checked: *checked,
                text: text.clone(),
                section: current,
            }),
            _ => {}
        }
        append_body(&mut doc, current, &lines[i..i + 1]);
        i += 1;
    }

    doc.stories = extract_user_stories(&doc.sections, &lines, &kinds);

    if doc.sections.is_empty() && doc.tables.is_empty() && doc.list_items.is_empty() {
        doc.diagnostics.push(Diagnostic::new(
            Category::EmptyDocument,
            "no markdown structure found (no headings, tables or lists)",
        ));
    }
    doc
}

fn append_body(doc: &mut ParsedDocument, section: Option<usize>, lines: &[&str]) {
    if let Some(idx) = section {
        let body = &mut doc.sections[idx].body;
        for l in lines {
            if !body.is_empty() {
                body.push('\n');
            }
            body.push_str(l);
        }
    }
}

/// Consume a table starting at `start` (header row). Returns the index of
/// the first line after the table.
fn read_table(
    doc: &mut ParsedDocument,
    kinds: &[LineKind],
    start: usize,
    header: &[String],
    sep: &[String],
    section: Option<usize>,
) -> usize {
    let table_line = start + 1;
    if sep.len() != header.len() {
        doc.diagnostics.push(
            Diagnostic::new(
                Category::MalformedTable,
                format!(
                    "table separator has {} columns, header has {}",
                    sep.len(),
                    header.len()
                ),
            )
            .at_line(table_line + 1),
        );
    }
    let mut rows = Vec::new();
    let mut i = start + 2;
    while let Some(LineKind::TableRow(cells)) = kinds.get(i) {
        if cells.len() != header.len() {
            doc.diagnostics.push(
                Diagnostic::new(
                    Category::MalformedTable,
                    format!(
                        "table row has {} cells, header has {}",
                        cells.len(),
                        header.len()
                    ),
                )
                .at_line(i + 1),
            );
        }
        let paired = header
            .iter()
            .enumerate()
            .map(|(col, h)| (h.clone(), cells.get(col).cloned().unwrap_or_default()))
            .collect();
        rows.push(TableRow {
            line: i + 1,
            cells: paired,
        });
        i += 1;
    }
    doc.tables.push(Table {
        line: table_line,
        section,
        header: header.to_vec(),
        rows,
    });
    i
}

fn scan_markers(lines: &[&str], kinds: &[LineKind]) -> Vec<MarkerHit> {
    let mut hits = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        let fenced = matches!(
            kinds.get(idx),
            Some(LineKind::FenceContent | LineKind::FenceBoundary)
        );
        let mut found: Vec<(usize, &str)> = Vec::new();
        for marker in PLACEHOLDER_MARKERS {
            for (byte, _) in line.match_indices(marker) {
                found.push((byte, *marker));
            }
        }
        found.sort_by_key(|(byte, _)| *byte);
        for (byte, marker) in found {
            hits.push(MarkerHit {
                marker: marker.to_string(),
                line: idx + 1,
                column: line[..byte].chars().count() + 1,
                context: line.trim().chars().take(CONTEXT_WIDTH).collect(),
                fenced,
            });
        }
    }
    hits
}

fn clean_field(raw: &str) -> Option<String> {
    let t = raw.replace('*', "");
    let t = t.split_whitespace().collect::<Vec<_>>().join(" ");
    let t = t.trim_end_matches(',').trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoryField {
    Role,
    Capability,
    Benefit,
}

/// Split a line on its bold story labels. Each field runs to the next label
/// or the end of the line, so emphasis inside the text is kept.
fn story_fields(line: &str) -> Vec<(StoryField, Option<String>)> {
    let label = static_regex!(r"(?i)\*\*(As an?|I want(?: to)?|So that)\*\*");
    let found: Vec<(StoryField, usize, usize)> = label
        .captures_iter(line)
        .filter_map(|c| {
            let whole = c.get(0)?;
            let word = c[1].to_lowercase();
            let field = if word.starts_with("as") {
                StoryField::Role
            } else if word.starts_with("i want") {
                StoryField::Capability
            } else {
                StoryField::Benefit
            };
            Some((field, whole.start(), whole.end()))
        })
        .collect();
    found
        .iter()
        .enumerate()
        .map(|(i, (field, _, end))| {
            let stop = found.get(i + 1).map(|(_, start, _)| *start).unwrap_or(line.len());
            (*field, clean_field(&line[*end..stop]))
        })
        .collect()
}

/// Find `US-<n>` headings and read their role/capability/benefit lines and
/// acceptance-criteria checklist, scoped to the heading's section (until the
/// next heading of the same or a higher level).
fn extract_user_stories(sections: &[Section], lines: &[&str], kinds: &[LineKind]) -> Vec<UserStory> {
    let story_id = static_regex!(r"\bUS-(\d+)\b");
    let ac_id = static_regex!(r"^\*{0,2}(AC-\d+(?:\.\d+)*)\*{0,2}\s*[:.)\-]?\*{0,2}\s*");

    let mut stories = Vec::new();
    for (si, section) in sections.iter().enumerate() {
        let Some(c) = story_id.captures(&section.title) else {
            continue;
        };
        let number: u32 = match c[1].parse() {
            Ok(n) => n,
            Err(_) => continue,
        };
        let end_line = sections[si + 1..]
            .iter()
            .find(|s| s.level <= section.level)
            .map(|s| s.line)
            .unwrap_or(lines.len() + 1);

        let mut story = UserStory {
            id: format!("US-{}", number),
            number,
            title: section.title.clone(),
            line: section.line,
            role: None,
            capability: None,
            benefit: None,
            criteria: Vec::new(),
        };
        let mut in_criteria = false;
        let mut base_indent: Option<usize> = None;
        for idx in section.line..end_line.saturating_sub(1) {
            let line = lines[idx];
            match &kinds[idx] {
                LineKind::Heading { text, .. } => {
                    in_criteria = text.to_lowercase().contains("acceptance criteria");
                    base_indent = None;
                    continue;
                }
                LineKind::FenceBoundary | LineKind::FenceContent | LineKind::Blank => continue,
                LineKind::ListItem {
                    indent,
                    checked,
                    text,
                } if in_criteria => {
                    let base = *base_indent.get_or_insert(*indent);
                    if *indent > base {
                        continue;
                    }
                    let (id, rest) = match ac_id.captures(text) {
                        Some(m) => (
                            Some(m[1].to_string()),
                            text[m.get(0).map(|g| g.end()).unwrap_or(0)..].trim(),
                        ),
                        None => (None, text.trim()),
                    };
                    story.criteria.push(AcceptanceCriterion {
                        id,
                        text: rest.trim_matches('*').trim().to_string(),
                        line: idx + 1,
                        checked: *checked,
                    });
                    continue;
                }
                _ => {}
            }
            if line.to_lowercase().contains("acceptance criteria") {
                in_criteria = true;
                base_indent = None;
                continue;
            }
            if in_criteria && line.trim_start().starts_with("**") {
                in_criteria = false;
            }
            for (field, value) in story_fields(line) {
                let slot = match field {
                    StoryField::Role => &mut story.role,
                    StoryField::Capability => &mut story.capability,
                    StoryField::Benefit => &mut story.benefit,
                };
                if slot.is_none() {
                    *slot = value;
                }
            }
        }
        stories.push(story);
    }
    stories
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORY: &str = "# Requirements

## User Stories

### US-1: Login

**As a** registered user,
**I want to** sign in with my email
**So that** I can reach my dashboard

**Acceptance Criteria:**
- [ ] **AC-1.1:** Valid credentials return HTTP 200
- [ ] AC-1.2: Five failed attempts lock the account
  - nested note, not a criterion

### US-2: Logout

**As a** user
";

    #[test]
    fn test_classify_basic_kinds() {
        assert_eq!(classify(""), LineKind::Blank);
        assert_eq!(
            classify("## Guardrail Coverage Matrix ##"),
            LineKind::Heading {
                level: 2,
                text: "Guardrail Coverage Matrix".into()
            }
        );
        assert_eq!(
            classify("#hashtag"),
            LineKind::Text,
            "a heading needs a space after the hashes"
        );
        assert_eq!(
            classify("  - [x] done"),
            LineKind::ListItem {
                indent: 2,
                checked: Some(true),
                text: "done".into()
            }
        );
        assert!(matches!(classify("| a | b |"), LineKind::TableRow(c) if c == vec!["a", "b"]));
    }

    #[test]
    fn test_split_cells_keeps_escaped_pipes() {
        assert_eq!(split_cells(r"| a \| b | c |"), vec!["a | b", "c"]);
        assert_eq!(split_cells("| x |  |"), vec!["x", ""]);
    }

    #[test]
    fn test_parses_user_story_fields_and_criteria() {
        let doc = parse_document(STORY);
        assert_eq!(doc.stories.len(), 2);
        let us1 = &doc.stories[0];
        assert_eq!(us1.id, "US-1");
        assert_eq!(us1.role.as_deref(), Some("registered user"));
        assert_eq!(us1.capability.as_deref(), Some("sign in with my email"));
        assert_eq!(us1.benefit.as_deref(), Some("I can reach my dashboard"));
        assert_eq!(us1.criteria.len(), 2);
        assert_eq!(us1.criteria[0].id.as_deref(), Some("AC-1.1"));
        assert_eq!(us1.criteria[0].text, "Valid credentials return HTTP 200");
        assert_eq!(us1.criteria[1].id.as_deref(), Some("AC-1.2"));
        let us2 = &doc.stories[1];
        assert!(us2.capability.is_none());
        assert!(us2.criteria.is_empty());
    }

    #[test]
    fn test_story_fields_keep_inline_emphasis() {
        let md = "## US-1: Export\n\n\
                  **As a** *finance* analyst\n\
                  **I want to** *export* reports as **CSV**\n\
                  **So that** I can _reconcile_ them in *my* spreadsheet\n";
        let doc = parse_document(md);
        let us1 = &doc.stories[0];
        assert_eq!(us1.role.as_deref(), Some("finance analyst"));
        assert_eq!(us1.capability.as_deref(), Some("export reports as CSV"));
        assert_eq!(
            us1.benefit.as_deref(),
            Some("I can _reconcile_ them in my spreadsheet")
        );
    }

    #[test]
    fn test_story_fields_on_one_line_split_at_labels() {
        let md = "## US-2: Audit\n\n**As an** admin, **I want** an *audit* log, **So that** changes are traceable\n";
        let us2 = &parse_document(md).stories[0];
        assert_eq!(us2.role.as_deref(), Some("admin"));
        assert_eq!(us2.capability.as_deref(), Some("an audit log"));
        assert_eq!(us2.benefit.as_deref(), Some("changes are traceable"));
    }

    #[test]
    fn test_longer_fence_is_not_closed_by_shorter_run() {
        let md = "````md\n```\n## Inside\n```\n````\n## Outside\n";
        let kinds = classify_lines(md);
        assert_eq!(kinds[0], LineKind::FenceBoundary);
        assert_eq!(kinds[1], LineKind::FenceContent);
        assert_eq!(kinds[2], LineKind::FenceContent);
        assert_eq!(kinds[3], LineKind::FenceContent);
        assert_eq!(kinds[4], LineKind::FenceBoundary);
        assert!(matches!(&kinds[5], LineKind::Heading { text, .. } if text == "Outside"));

        let doc = parse_document(md);
        let titles: Vec<&str> = doc.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Outside"]);
    }

    #[test]
    fn test_fence_closes_only_on_matching_character() {
        let kinds = classify_lines("~~~\n```\n~~~\ntext\n");
        assert_eq!(kinds[1], LineKind::FenceContent);
        assert_eq!(kinds[2], LineKind::FenceBoundary);
        assert_eq!(kinds[3], LineKind::Text);
    }

    #[test]
    fn test_table_rows_map_headers_and_flag_column_mismatch() {
        let md = "## Matrix\n\n| A | B |\n|---|---|\n| 1 | 2 |\n| 3 |\n\nafter\n";
        let doc = parse_document(md);
        assert_eq!(doc.tables.len(), 1);
        let t = &doc.tables[0];
        assert_eq!(t.section, Some(0));
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.rows[0].cell("b"), Some("2"));
        assert_eq!(t.rows[1].cell("B"), Some(""));
        assert_eq!(doc.diagnostics.len(), 1);
        assert_eq!(doc.diagnostics[0].category, Category::MalformedTable);
        assert_eq!(doc.diagnostics[0].location.as_ref().unwrap().line, Some(6));
        assert!(doc.sections[0].body.contains("after"));
    }

    #[test]
    fn test_fenced_content_is_not_structure_but_markers_are_flagged() {
        let md = "# Doc\n\n```md\n## Not a heading\n| a | b |\n|---|---|\nOwner: [TBD]\n```\n\nReal [TBD] here and [TBD] again\n";
        let doc = parse_document(md);
        assert_eq!(doc.sections.len(), 1);
        assert!(doc.tables.is_empty());
        assert_eq!(doc.markers.len(), 3);
        assert!(doc.markers[0].fenced);
        let live: Vec<_> = doc.live_markers().collect();
        assert_eq!(live.len(), 2);
        assert_eq!(live[0].line, 10);
        assert_eq!(live[0].column, 6);
    }

    #[test]
    fn test_marker_tokens_are_case_sensitive() {
        let doc = parse_document("# T\n[tbd] your_name [TODO: x] YOUR_KEY [PLACEHOLDER]\n");
        let found: Vec<&str> = doc.markers.iter().map(|m| m.marker.as_str()).collect();
        assert_eq!(found, vec!["[TODO", "YOUR_", "[PLACEHOLDER"]);
    }

    #[test]
    fn test_empty_input_yields_empty_document_with_note() {
        let doc = parse_document("");
        assert!(doc.is_empty());
        assert_eq!(doc.diagnostics.len(), 1);
        assert_eq!(doc.diagnostics[0].category, Category::EmptyDocument);
    }

    #[test]
    fn test_garbage_input_never_panics() {
        let inputs = [
            "|",
            "||\n|-|",
            "### US-\n**As a**",
            "```\nunterminated fence [TBD]",
            "### US-99999999999999999999: overflow",
            "| a |\n|---|\n| é | ü | ß |",
        ];
        for input in inputs {
            let _ = parse_document(input);
        }
    }
}
