//! Guardrail registry schema: definitions, the resolved set, and the
//! `.ldf/guardrails.yaml` file layout.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardrailSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl fmt::Display for GuardrailSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            GuardrailSeverity::Critical => "critical",
            GuardrailSeverity::High => "high",
            GuardrailSeverity::Medium => "medium",
            GuardrailSeverity::Low => "low",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardrailSource {
    Core,
    #[default]
    Preset,
}

impl fmt::Display for GuardrailSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            GuardrailSource::Core => "core",
            GuardrailSource::Preset => "preset",
        })
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A named quality concern every spec must address or explicitly exclude.
pub struct GuardrailDefinition {
    pub id: u32,
    pub name: String,
    pub severity: GuardrailSeverity,
    #[serde(default = "default_true")]
    pub applicable_by_default: bool,
    #[serde(default)]
    pub source: GuardrailSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl GuardrailDefinition {
    pub fn new(id: u32, name: &str, severity: GuardrailSeverity, source: GuardrailSource) -> Self {
        Self {
            id,
            name: name.to_string(),
            severity,
            applicable_by_default: true,
            source,
            description: None,
        }
    }

    /// Display label used in matrices and messages, e.g. `7. Database Migrations`.
    pub fn label(&self) -> String {
        format!("{}. {}", self.id, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Resolved, ordered, id-unique guardrails active for one run.
///
/// Built only by the loader; core guardrails come first in id order,
/// followed by preset guardrails in declaration order.
pub struct GuardrailSet {
    guardrails: Vec<GuardrailDefinition>,
}

impl GuardrailSet {
    pub(crate) fn from_ordered(guardrails: Vec<GuardrailDefinition>) -> Self {
        debug_assert!({
            let mut ids: Vec<u32> = guardrails.iter().map(|g| g.id).collect();
            ids.sort_unstable();
            ids.windows(2).all(|w| w[0] != w[1])
        });
        Self { guardrails }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GuardrailDefinition> {
        self.guardrails.iter()
    }

    pub fn len(&self) -> usize {
        self.guardrails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guardrails.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&GuardrailDefinition> {
        self.guardrails.iter().find(|g| g.id == id)
    }

    pub fn as_slice(&self) -> &[GuardrailDefinition] {
        &self.guardrails
    }
}

impl<'a> IntoIterator for &'a GuardrailSet {
    type Item = &'a GuardrailDefinition;
    type IntoIter = std::slice::Iter<'a, GuardrailDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.guardrails.iter()
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
/// Layout of `.ldf/guardrails.yaml`.
///
/// Definitions listed under `guardrails` (alias `custom`) that no entry of
/// `presets` references are always active.
pub struct GuardrailsFile {
    /// Informational; the core set is always the base.
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub active: Option<Vec<String>>,
    #[serde(default)]
    pub disabled: Vec<u32>,
    #[serde(default, alias = "custom")]
    pub guardrails: Vec<GuardrailDefinition>,
    /// Extra preset catalog entries: preset name -> guardrail ids.
    #[serde(default)]
    pub presets: BTreeMap<String, Vec<u32>>,
}

impl GuardrailsFile {
    /// Presets this file activates, in declaration order.
    pub fn active_presets(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        if let Some(p) = &self.preset {
            out.push(p.clone());
        }
        for p in self.active.iter().flatten() {
            if !out.contains(p) {
                out.push(p.clone());
            }
        }
        out
    }
}
