//! Lint policy: severity assignments and the vague-term denylist.
//!
//! The severity of each diagnostic category is a default, not a law. The
//! `lint.severity` map in `.ldf/config.yaml` overrides it per category, for
//! example to make `vague-criterion` blocking or to soften
//! `guardrail-na-without-reason` to a warning.

use super::{Category, Diagnostic, Severity};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Phrases that make an acceptance criterion untestable on their own.
pub const DEFAULT_VAGUE_TERMS: &[&str] = &[
    "works correctly",
    "works as expected",
    "works properly",
    "works well",
    "is fast",
    "is quick",
    "looks good",
    "is user-friendly",
    "is intuitive",
    "performs well",
    "handles errors gracefully",
];

#[derive(Debug, Clone, Default, Deserialize)]
/// `lint` section of the project configuration.
pub struct LintCfg {
    pub strict: Option<bool>,
    #[serde(default)]
    pub critical_packs: Vec<String>,
    #[serde(default)]
    pub vague_terms: Vec<String>,
    #[serde(default)]
    pub severity: BTreeMap<Category, Severity>,
}

#[derive(Debug, Clone)]
/// Resolved policy applied to every diagnostic before reporting.
pub struct LintPolicy {
    pub severity_overrides: BTreeMap<Category, Severity>,
    /// Lowercased denylist entries.
    pub vague_terms: Vec<String>,
}

impl Default for LintPolicy {
    fn default() -> Self {
        Self {
            severity_overrides: BTreeMap::new(),
            vague_terms: DEFAULT_VAGUE_TERMS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl LintPolicy {
    pub fn from_cfg(cfg: &LintCfg) -> Self {
        let mut policy = Self::default();
        policy.severity_overrides = cfg.severity.clone();
        for term in &cfg.vague_terms {
            let t = term.trim().to_lowercase();
            if !t.is_empty() && !policy.vague_terms.contains(&t) {
                policy.vague_terms.push(t);
            }
        }
        policy
    }

    /// Apply the configured severity for the diagnostic's category, if any.
    pub fn apply(&self, diag: Diagnostic) -> Diagnostic {
        match self.severity_overrides.get(&diag.category) {
            Some(sev) => diag.with_severity(*sev),
            None => diag,
        }
    }
}
