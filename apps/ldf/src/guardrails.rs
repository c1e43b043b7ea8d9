//! Guardrail registry loader.
//!
//! The core 8 guardrails are an explicit value handed to [`GuardrailLoader`]
//! at construction; the built-in preset catalog and an optional
//! `.ldf/guardrails.yaml` contribute preset guardrails on top. Ambiguous
//! merges (id collisions with core, conflicting definitions, redefined
//! presets) are configuration errors, never silent overrides.

use crate::error::{ConfigError, Result};
use crate::models::guardrail::{
    GuardrailDefinition, GuardrailSet, GuardrailSeverity, GuardrailSource, GuardrailsFile,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Preset name meaning "core guardrails only".
pub const CUSTOM_PRESET: &str = "custom";

const CORE: &[(u32, &str, GuardrailSeverity)] = &[
    (1, "Testing Coverage", GuardrailSeverity::Critical),
    (2, "Security Basics", GuardrailSeverity::Critical),
    (3, "Error Handling", GuardrailSeverity::High),
    (4, "Logging & Observability", GuardrailSeverity::High),
    (5, "API Design", GuardrailSeverity::High),
    (6, "Data Validation", GuardrailSeverity::Critical),
    (7, "Database Migrations", GuardrailSeverity::High),
    (8, "Documentation", GuardrailSeverity::Medium),
];

type PresetSpec = (&'static str, &'static [(u32, &'static str, GuardrailSeverity)]);

const BUILTIN_PRESETS: &[PresetSpec] = &[
    (
        "saas",
        &[
            (9, "Multi-Tenancy", GuardrailSeverity::Critical),
            (10, "Subscription Billing", GuardrailSeverity::High),
            (11, "Tenant Data Export", GuardrailSeverity::Medium),
        ],
    ),
    (
        "fintech",
        &[
            (12, "Double-Entry Ledger", GuardrailSeverity::Critical),
            (13, "Idempotent Transactions", GuardrailSeverity::Critical),
            (14, "Audit Trail", GuardrailSeverity::Critical),
            (15, "Decimal Precision", GuardrailSeverity::High),
        ],
    ),
    (
        "healthcare",
        &[
            (16, "PHI Protection", GuardrailSeverity::Critical),
            (17, "Access Audit Logging", GuardrailSeverity::Critical),
            (18, "Consent Management", GuardrailSeverity::High),
        ],
    ),
    (
        "api-only",
        &[
            (19, "Rate Limiting", GuardrailSeverity::High),
            (20, "API Versioning", GuardrailSeverity::High),
            (21, "Webhook Reliability", GuardrailSeverity::Medium),
        ],
    ),
];

/// The fixed core guardrail definitions, ids 1..=8.
pub fn core_guardrails() -> Vec<GuardrailDefinition> {
    CORE.iter()
        .map(|(id, name, sev)| GuardrailDefinition::new(*id, name, *sev, GuardrailSource::Core))
        .collect()
}

pub struct GuardrailLoader {
    core: Vec<GuardrailDefinition>,
    /// Preset guardrail definitions by id.
    pool: BTreeMap<u32, GuardrailDefinition>,
    /// Preset name -> member ids, in declaration order.
    catalog: BTreeMap<String, Vec<u32>>,
}

impl GuardrailLoader {
    /// Loader over the given core set and the built-in preset catalog.
    pub fn new(core: Vec<GuardrailDefinition>) -> Self {
        let mut pool = BTreeMap::new();
        let mut catalog = BTreeMap::new();
        for (name, members) in BUILTIN_PRESETS {
            let mut ids = Vec::new();
            for (id, gname, sev) in members.iter() {
                pool.insert(
                    *id,
                    GuardrailDefinition::new(*id, gname, *sev, GuardrailSource::Preset),
                );
                ids.push(*id);
            }
            catalog.insert(name.to_string(), ids);
        }
        Self {
            core,
            pool,
            catalog,
        }
    }

    pub fn builtin() -> Self {
        Self::new(core_guardrails())
    }

    /// Read and parse `guardrails.yaml`, then resolve.
    ///
    /// Preset precedence: `explicit` > the file's own selection > `fallback`.
    /// A missing file means no file contributions; an unparsable one is a
    /// [`ConfigError::Malformed`].
    pub fn load_path(
        &self,
        path: &Path,
        explicit: &[String],
        fallback: &[String],
    ) -> Result<GuardrailSet> {
        if !path.exists() {
            debug!(path = %path.display(), "no guardrails file");
            let active = if explicit.is_empty() { fallback } else { explicit };
            return self.resolve(None, active);
        }
        let raw = fs::read_to_string(path)?;
        let file: GuardrailsFile = if raw.trim().is_empty() {
            GuardrailsFile::default()
        } else {
            serde_yaml::from_str(&raw).map_err(|e| ConfigError::Malformed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        };
        let mut active: Vec<String> = explicit.to_vec();
        if active.is_empty() {
            active = file.active_presets();
        }
        if active.is_empty() {
            active = fallback.to_vec();
        }
        self.resolve(Some(&file), &active)
    }

    /// Build the active set: core (minus disabled), then each named preset's
    /// guardrails, then standalone file guardrails, deduplicated by id.
    pub fn resolve(&self, file: Option<&GuardrailsFile>, presets: &[String]) -> Result<GuardrailSet> {
        let mut pool = self.pool.clone();
        let mut catalog = self.catalog.clone();
        let mut standalone: Vec<u32> = Vec::new();

        if let Some(file) = file {
            let mut seen: Vec<u32> = Vec::new();
            for def in &file.guardrails {
                if seen.contains(&def.id) {
                    return Err(ConfigError::DuplicateGuardrail(def.id));
                }
                seen.push(def.id);
                if let Some(core) = self.core.iter().find(|c| c.id == def.id) {
                    if def.source == GuardrailSource::Core && same_definition(core, def) {
                        continue;
                    }
                    return Err(ConfigError::CoreIdCollision {
                        id: def.id,
                        name: def.name.clone(),
                    });
                }
                if def.source == GuardrailSource::Core {
                    return Err(ConfigError::CoreGuardrailModified(def.id));
                }
                if let Some(existing) = pool.get(&def.id) {
                    if !same_definition(existing, def) {
                        return Err(ConfigError::ConflictingGuardrail(def.id));
                    }
                }
                pool.insert(def.id, def.clone());
            }
            for (name, ids) in &file.presets {
                if catalog.contains_key(name) || name == CUSTOM_PRESET {
                    return Err(ConfigError::PresetRedefined(name.clone()));
                }
                for id in ids {
                    if !pool.contains_key(id) {
                        return Err(ConfigError::UnknownGuardrail {
                            id: *id,
                            context: format!("preset '{}'", name),
                        });
                    }
                }
                catalog.insert(name.clone(), ids.clone());
            }
            let referenced: Vec<u32> = file.presets.values().flatten().copied().collect();
            standalone = file
                .guardrails
                .iter()
                .filter(|g| g.source == GuardrailSource::Preset && !referenced.contains(&g.id))
                .map(|g| g.id)
                .collect();
        }

        let disabled: &[u32] = file.map(|f| f.disabled.as_slice()).unwrap_or(&[]);
        for id in disabled {
            let known = self.core.iter().any(|c| c.id == *id) || pool.contains_key(id);
            if !known {
                return Err(ConfigError::UnknownGuardrail {
                    id: *id,
                    context: "disabled".to_string(),
                });
            }
        }

        let mut core = self.core.clone();
        core.sort_by_key(|g| g.id);
        let mut out: Vec<GuardrailDefinition> = core
            .into_iter()
            .filter(|g| !disabled.contains(&g.id))
            .collect();

        let push = |id: u32, out: &mut Vec<GuardrailDefinition>| {
            if disabled.contains(&id) || out.iter().any(|g| g.id == id) {
                return;
            }
            if let Some(def) = pool.get(&id) {
                out.push(def.clone());
            }
        };
        for name in presets {
            let name = name.trim();
            if name.is_empty() || name == CUSTOM_PRESET {
                continue;
            }
            let Some(ids) = catalog.get(name) else {
                let mut known: Vec<String> = catalog.keys().cloned().collect();
                known.push(CUSTOM_PRESET.to_string());
                return Err(ConfigError::UnknownPreset(name.to_string(), known.join(", ")));
            };
            for id in ids {
                push(*id, &mut out);
            }
        }
        for id in standalone {
            push(id, &mut out);
        }

        debug!(count = out.len(), presets = ?presets, "resolved guardrail set");
        Ok(GuardrailSet::from_ordered(out))
    }
}

fn same_definition(a: &GuardrailDefinition, b: &GuardrailDefinition) -> bool {
    a.id == b.id && a.name == b.name && a.severity == b.severity
}
