//! Normalized structure extracted from one markdown spec file.

use super::Diagnostic;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub level: u8,
    pub title: String,
    pub line: usize,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A data row as ordered `(header, cell)` pairs.
pub struct TableRow {
    pub line: usize,
    pub cells: Vec<(String, String)>,
}

impl TableRow {
    /// Cell text under a header, matched case-insensitively.
    pub fn cell(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h.eq_ignore_ascii_case(header))
            .map(|(_, c)| c.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub line: usize,
    /// Index into `ParsedDocument::sections` of the enclosing section.
    pub section: Option<usize>,
    pub header: Vec<String>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListItem {
    pub line: usize,
    pub indent: usize,
    /// `Some(done)` for checklist items, `None` for plain bullets.
    pub checked: Option<bool>,
    pub text: String,
    pub section: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptanceCriterion {
    pub id: Option<String>,
    pub text: String,
    pub line: usize,
    pub checked: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserStory {
    /// e.g. `US-3`
    pub id: String,
    pub number: u32,
    pub title: String,
    pub line: usize,
    pub role: Option<String>,
    pub capability: Option<String>,
    pub benefit: Option<String>,
    pub criteria: Vec<AcceptanceCriterion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// One occurrence of a reserved placeholder token.
pub struct MarkerHit {
    pub marker: String,
    pub line: usize,
    /// 1-based character column of the marker start.
    pub column: usize,
    pub context: String,
    /// Inside a fenced code block.
    pub fenced: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
/// Read-only result of parsing; built fresh per lint invocation.
pub struct ParsedDocument {
    pub sections: Vec<Section>,
    pub tables: Vec<Table>,
    pub list_items: Vec<ListItem>,
    pub stories: Vec<UserStory>,
    pub markers: Vec<MarkerHit>,
    /// Local structure defects found while parsing (malformed tables, no structure).
    pub diagnostics: Vec<Diagnostic>,
}

impl ParsedDocument {
    /// True when any heading title contains `needle` (case-insensitive).
    pub fn has_section(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.sections
            .iter()
            .any(|s| s.title.to_lowercase().contains(&needle))
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
            && self.tables.is_empty()
            && self.list_items.is_empty()
            && self.stories.is_empty()
            && self.markers.is_empty()
    }

    /// Markers outside fenced code blocks.
    pub fn live_markers(&self) -> impl Iterator<Item = &MarkerHit> {
        self.markers.iter().filter(|m| !m.fenced)
    }
}
