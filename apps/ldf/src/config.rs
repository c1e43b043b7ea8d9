//! Configuration discovery and effective settings resolution.
//!
//! ldf reads `.ldf/config.yaml|yml|toml` from the project root (the closest
//! ancestor holding a `.ldf` directory) and merges it with CLI flags to
//! produce an `Effective` config.
//! Defaults:
//! - `project.specs_dir`: `.ldf/specs`
//! - `guardrails.preset`: none (core guardrails only)
//! - `output`: `human`
//! - `lint.strict`: false
//!
//! Overrides precedence: CLI > config file > defaults.

use crate::error::{ConfigError, Result};
use crate::models::policy::{LintCfg, LintPolicy};
use crate::rules::PackRequirement;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Project metadata directory at the root.
pub const LDF_DIR: &str = ".ldf";
pub const DEFAULT_SPECS_DIR: &str = ".ldf/specs";

#[derive(Debug, Default, Deserialize, Clone)]
/// `project` section.
pub struct ProjectCfg {
    pub name: Option<String>,
    pub specs_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// `guardrails` section; selects the preset when `guardrails.yaml` does not.
pub struct GuardrailsCfg {
    pub preset: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
/// Entry of `question_packs`: a bare name or `{name, critical}`.
pub enum QuestionPackRef {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        critical: bool,
    },
}

impl QuestionPackRef {
    pub fn name(&self) -> &str {
        match self {
            QuestionPackRef::Name(n) => n,
            QuestionPackRef::Detailed { name, .. } => name,
        }
    }

    pub fn critical(&self) -> bool {
        matches!(self, QuestionPackRef::Detailed { critical: true, .. })
    }
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `.ldf/config.{yaml,yml,toml}`.
pub struct LdfConfig {
    pub project: Option<ProjectCfg>,
    pub guardrails: Option<GuardrailsCfg>,
    #[serde(default)]
    pub question_packs: Vec<QuestionPackRef>,
    pub output: Option<String>,
    pub lint: Option<LintCfg>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub repo_root: PathBuf,
    pub specs_dir: PathBuf,
    pub answerpacks_dir: PathBuf,
    pub guardrails_file: PathBuf,
    pub output: String,
    pub strict: bool,
    /// `--preset` flags, highest precedence.
    pub cli_presets: Vec<String>,
    /// `guardrails.preset` from the config file, lowest precedence.
    pub config_presets: Vec<String>,
    pub packs: Vec<PackRequirement>,
    pub policy: LintPolicy,
    pub config_found: bool,
}

/// CLI-provided overrides; `None` means "not given on the command line".
#[derive(Debug, Default, Clone)]
pub struct CliOverrides<'a> {
    pub repo_root: Option<&'a str>,
    pub output: Option<&'a str>,
    pub strict: Option<bool>,
    pub presets: &'a [String],
}

/// Walk upward from `start` to detect the project root.
///
/// Stops at the first directory holding `.ldf/` or `.git`; falls back to
/// `start`.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if cur.join(LDF_DIR).is_dir() || cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Load `LdfConfig` from `.ldf/config.yaml|yml|toml` if present.
///
/// A file that exists but does not parse is a [`ConfigError::Malformed`].
pub fn load_config(root: &Path) -> Result<Option<LdfConfig>> {
    let dir = root.join(LDF_DIR);
    for name in ["config.yaml", "config.yml"] {
        let p = dir.join(name);
        if p.is_file() {
            let s = fs::read_to_string(&p)?;
            if s.trim().is_empty() {
                return Ok(Some(LdfConfig::default()));
            }
            let cfg: LdfConfig = serde_yaml::from_str(&s).map_err(|e| malformed(&p, e))?;
            return Ok(Some(cfg));
        }
    }
    let p = dir.join("config.toml");
    if p.is_file() {
        let s = fs::read_to_string(&p)?;
        let cfg: LdfConfig = toml::from_str(&s).map_err(|e| malformed(&p, e))?;
        return Ok(Some(cfg));
    }
    Ok(None)
}

fn malformed(path: &Path, e: impl std::fmt::Display) -> ConfigError {
    ConfigError::Malformed {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Merge `question_packs` and `lint.critical_packs` into pack requirements.
fn pack_requirements(cfg: &LdfConfig) -> Vec<PackRequirement> {
    let critical_names: Vec<String> = cfg
        .lint
        .as_ref()
        .map(|l| l.critical_packs.clone())
        .unwrap_or_default();
    let mut packs: Vec<PackRequirement> = Vec::new();
    for qp in &cfg.question_packs {
        let name = qp.name().trim();
        if name.is_empty() || packs.iter().any(|p| p.name == name) {
            continue;
        }
        packs.push(PackRequirement {
            name: name.to_string(),
            critical: qp.critical() || critical_names.iter().any(|c| c == name),
        });
    }
    for name in &critical_names {
        if !packs.iter().any(|p| &p.name == name) {
            packs.push(PackRequirement {
                name: name.clone(),
                critical: true,
            });
        }
    }
    packs
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
///
/// Fails with [`ConfigError::NotInitialized`] when the root has no `.ldf/`.
pub fn resolve_effective(cli: &CliOverrides<'_>) -> Result<Effective> {
    let start = PathBuf::from(cli.repo_root.unwrap_or("."));
    let repo_root = detect_repo_root(&start);
    let ldf_dir = repo_root.join(LDF_DIR);
    if !ldf_dir.is_dir() {
        return Err(ConfigError::NotInitialized(repo_root));
    }
    let loaded = load_config(&repo_root)?;
    let config_found = loaded.is_some();
    let cfg = loaded.unwrap_or_default();
    debug!(root = %repo_root.display(), config_found, "resolved project root");

    let specs_dir = cfg
        .project
        .as_ref()
        .and_then(|p| p.specs_dir.clone())
        .unwrap_or_else(|| DEFAULT_SPECS_DIR.to_string());

    let output = cli
        .output
        .map(|s| s.to_string())
        .or(cfg.output.clone())
        .unwrap_or_else(|| "human".to_string());

    let strict = cli
        .strict
        .or_else(|| cfg.lint.as_ref().and_then(|l| l.strict))
        .unwrap_or(false);

    let config_presets = cfg
        .guardrails
        .as_ref()
        .and_then(|g| g.preset.clone())
        .into_iter()
        .collect();

    let policy = cfg
        .lint
        .as_ref()
        .map(LintPolicy::from_cfg)
        .unwrap_or_default();

    Ok(Effective {
        specs_dir: repo_root.join(specs_dir),
        answerpacks_dir: ldf_dir.join("answerpacks"),
        guardrails_file: ldf_dir.join("guardrails.yaml"),
        output,
        strict,
        cli_presets: cli.presets.to_vec(),
        config_presets,
        packs: pack_requirements(&cfg),
        policy,
        config_found,
        repo_root,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Severity};
    use std::io::Write;
    use tempfile::tempdir;

    fn init(root: &Path) {
        fs::create_dir_all(root.join(LDF_DIR)).unwrap();
    }

    #[test]
    fn test_detect_and_load_yaml() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        init(root);
        let mut f = fs::File::create(root.join(".ldf/config.yaml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
project:
  name: shop
  specs_dir: docs/specs
guardrails:
  preset: saas
question_packs:
  - security
  - name: billing
    critical: true
lint:
  strict: true
  critical_packs: [security]
  severity:
    vague-criterion: error
"#
        )
        .unwrap();

        // Resolve using explicit repo_root to avoid global CWD races
        let eff = resolve_effective(&CliOverrides {
            repo_root: root.to_str(),
            ..Default::default()
        })
        .unwrap();
        assert!(eff.config_found);
        assert_eq!(eff.specs_dir, root.join("docs/specs"));
        assert_eq!(eff.config_presets, vec!["saas".to_string()]);
        assert!(eff.strict);
        assert_eq!(eff.output, "human");
        assert_eq!(
            eff.packs,
            vec![
                PackRequirement {
                    name: "security".into(),
                    critical: true
                },
                PackRequirement {
                    name: "billing".into(),
                    critical: true
                },
            ]
        );
        assert_eq!(
            eff.policy.severity_overrides.get(&Category::VagueCriterion),
            Some(&Severity::Error)
        );
    }

    #[test]
    fn test_cli_overrides_config_and_defaults_apply() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        init(root);
        fs::write(
            root.join(".ldf/config.toml"),
            "output = \"json\"\n[lint]\nstrict = true\n",
        )
        .unwrap();
        let presets = vec!["fintech".to_string()];
        let eff = resolve_effective(&CliOverrides {
            repo_root: root.to_str(),
            output: Some("ci"),
            strict: Some(false),
            presets: &presets,
        })
        .unwrap();
        assert_eq!(eff.output, "ci");
        assert!(!eff.strict);
        assert_eq!(eff.cli_presets, presets);
        assert_eq!(eff.specs_dir, root.join(DEFAULT_SPECS_DIR));
        assert!(eff.packs.is_empty());
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = tempdir().unwrap();
        init(dir.path());
        let eff = resolve_effective(&CliOverrides {
            repo_root: dir.path().to_str(),
            ..Default::default()
        })
        .unwrap();
        assert!(!eff.config_found);
        assert!(!eff.strict);
        assert!(eff.config_presets.is_empty());
        assert_eq!(eff.guardrails_file, dir.path().join(".ldf/guardrails.yaml"));
    }

    #[test]
    fn test_uninitialized_and_malformed_are_errors() {
        let dir = tempdir().unwrap();
        // .git stops the upward walk so an ancestor .ldf is never picked up
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        let err = resolve_effective(&CliOverrides {
            repo_root: dir.path().to_str(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::NotInitialized(_)));

        init(dir.path());
        fs::write(dir.path().join(".ldf/config.yaml"), "lint: [unclosed\n").unwrap();
        let err = load_config(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[test]
    fn test_detect_repo_root_walks_up_to_ldf_dir() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        init(root);
        let nested = root.join("src/deep");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(detect_repo_root(&nested), root.to_path_buf());
    }
}
