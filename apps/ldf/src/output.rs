//! Output rendering for lint results and the guardrail listing.
//!
//! Supports `human` (default), `ci` and `json`. Every format reports, per
//! spec, the error count, the warning count and the pass/fail verdict. The
//! JSON form is the serialized `LintResult`, one record per diagnostic.

use crate::models::guardrail::GuardrailSet;
use crate::models::{Diagnostic, LintResult, Severity, SpecReport};
use owo_colors::OwoColorize;
use serde_json::Value as JsonVal;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

const RULE: &str = "==================================================";

fn use_colors(output: &str) -> bool {
    output == "human" && std::env::var_os("NO_COLOR").is_none()
}

/// Print lint results in the requested format.
pub fn print_lint(res: &LintResult, output: &str) -> serde_json::Result<()> {
    match output {
        "json" => println!("{}", serde_json::to_string_pretty(&compose_lint_json(res)?)?),
        "ci" => print!("{}", render_ci(res)),
        _ => print!("{}", render_human(res, use_colors(output))),
    }
    Ok(())
}

/// Compose lint JSON object (pure) for testing/snapshot purposes.
pub fn compose_lint_json(res: &LintResult) -> serde_json::Result<JsonVal> {
    serde_json::to_value(res)
}

/// Write the JSON report to `path`, newline-terminated.
pub fn write_report(res: &LintResult, path: &Path) -> io::Result<()> {
    let body = serde_json::to_string_pretty(&compose_lint_json(res)?)?;
    fs::write(path, body + "\n")
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

fn location_of(d: &Diagnostic) -> String {
    d.location
        .as_ref()
        .map(|l| l.to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_default()
}

/// Human report: specs in order, errors before warnings, then a summary.
pub fn render_human(res: &LintResult, color: bool) -> String {
    let mut out = String::new();
    if res.specs.is_empty() {
        out.push_str("0 specs processed, nothing to check\n");
        return out;
    }
    for spec in &res.specs {
        write_human_spec(&mut out, spec, color);
    }
    let verdict = if res.passed { "PASSED" } else { "FAILED" };
    let summary = format!(
        "— Summary — specs={} errors={} warnings={} {}{}",
        res.summary.specs,
        res.summary.errors,
        res.summary.warnings,
        verdict,
        if res.strict { " (strict)" } else { "" }
    );
    if color {
        let _ = writeln!(out, "{}", summary.bold());
    } else {
        let _ = writeln!(out, "{}", summary);
    }
    out
}

fn write_human_spec(out: &mut String, spec: &SpecReport, color: bool) {
    let verdict = if spec.passed { "PASSED" } else { "FAILED" };
    let header = format!(
        "{}: {}, {} — {}",
        spec.spec,
        plural(spec.errors, "error"),
        plural(spec.warnings, "warning"),
        verdict
    );
    if color {
        let styled = if spec.passed {
            header.green().bold().to_string()
        } else {
            header.red().bold().to_string()
        };
        let _ = writeln!(out, "{}", styled);
    } else {
        let _ = writeln!(out, "{}", header);
    }
    for severity in [Severity::Error, Severity::Warning] {
        for d in spec.diagnostics.iter().filter(|d| d.severity == severity) {
            let (icon, tag) = match severity {
                Severity::Error => ("✖", "⟦error⟧"),
                Severity::Warning => ("▲", "⟦warn⟧"),
            };
            let (icon, tag) = if color {
                match severity {
                    Severity::Error => (icon.red().to_string(), tag.red().bold().to_string()),
                    Severity::Warning => {
                        (icon.yellow().to_string(), tag.yellow().bold().to_string())
                    }
                }
            } else {
                (icon.to_string(), tag.to_string())
            };
            let loc = location_of(d);
            let loc = if loc.is_empty() {
                String::new()
            } else if color {
                format!("{} ", loc.bold())
            } else {
                format!("{} ", loc)
            };
            let _ = writeln!(
                out,
                "  {} {} {}❲{}❳ {}",
                icon, tag, loc, d.category, d.message
            );
        }
    }
}

/// CI report: one prefixed line per diagnostic, then a fixed summary block.
pub fn render_ci(res: &LintResult) -> String {
    let mut out = String::new();
    for spec in &res.specs {
        for d in &spec.diagnostics {
            let prefix = match d.severity {
                Severity::Error => "✗ Error",
                Severity::Warning => "⚠ Warning",
            };
            let loc = location_of(d);
            if loc.is_empty() {
                let _ = writeln!(out, "{}: {}: [{}] {}", prefix, spec.spec, d.category, d.message);
            } else {
                let _ = writeln!(
                    out,
                    "{}: {}: {}: [{}] {}",
                    prefix, spec.spec, loc, d.category, d.message
                );
            }
        }
        if spec.diagnostics.is_empty() {
            let _ = writeln!(out, "✅ Pass: {}", spec.spec);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "LINT SUMMARY");
    let _ = writeln!(out, "{}", RULE);
    if res.specs.is_empty() {
        let _ = writeln!(out, "0 specs processed, nothing to check");
    }
    for spec in &res.specs {
        if !spec.passed {
            let _ = writeln!(
                out,
                "❌ {}: {} error(s), {} warning(s)",
                spec.spec, spec.errors, spec.warnings
            );
        } else if spec.warnings > 0 {
            let _ = writeln!(out, "⚠️  {}: {} warning(s)", spec.spec, spec.warnings);
        } else {
            let _ = writeln!(out, "✅ {}: PASSED", spec.spec);
        }
    }
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(
        out,
        "errors={} warnings={} passed={}{}",
        res.summary.errors,
        res.summary.warnings,
        res.passed,
        if res.strict { " strict=true" } else { "" }
    );
    out
}

/// Print the active guardrail set.
pub fn print_guardrails(set: &GuardrailSet, output: &str) -> serde_json::Result<()> {
    match output {
        "json" => println!("{}", serde_json::to_string_pretty(set)?),
        _ => print!("{}", render_guardrails(set, use_colors(output))),
    }
    Ok(())
}

pub fn render_guardrails(set: &GuardrailSet, color: bool) -> String {
    let width = set.iter().map(|g| g.label().chars().count()).max().unwrap_or(0);
    let mut out = String::new();
    for g in set {
        let label = format!("{:<width$}", g.label(), width = width);
        let label = if color {
            label.bold().to_string()
        } else {
            label
        };
        let _ = writeln!(out, "{}  {:<8}  {}", label, g.severity, g.source);
        if let Some(desc) = g.description.as_deref().filter(|d| !d.trim().is_empty()) {
            let _ = writeln!(out, "    {}", desc.trim());
        }
    }
    let _ = writeln!(out, "{} active guardrails", set.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guardrails::GuardrailLoader;
    use crate::models::guardrail::GuardrailsFile;
    use crate::models::{Category, CoverageEntry};

    fn sample() -> LintResult {
        let auth = SpecReport::new(
            "auth",
            vec![
                Diagnostic::new(Category::VagueCriterion, "AC-1.2 is not testable")
                    .in_file(".ldf/specs/auth/requirements.md")
                    .at_line(14),
                Diagnostic::new(Category::GuardrailMatrixIncomplete, "guardrail 7 has no row")
                    .in_file(".ldf/specs/auth/requirements.md")
                    .at_line(20)
                    .for_guardrail(7),
            ],
            Vec::<CoverageEntry>::new(),
            false,
        );
        let search = SpecReport::new("search", Vec::new(), Vec::new(), false);
        LintResult::from_reports(vec![auth, search], false, "2026-01-01T00:00:00Z".into())
    }

    #[test]
    fn test_compose_lint_json_shape() {
        let out = compose_lint_json(&sample()).unwrap();
        assert_eq!(out["passed"], false);
        assert_eq!(out["summary"]["errors"], 1);
        assert_eq!(out["summary"]["warnings"], 1);
        let d = &out["specs"][0]["diagnostics"][1];
        assert_eq!(d["category"], "guardrail-matrix-incomplete");
        assert_eq!(d["severity"], "error");
        assert_eq!(d["location"]["line"], 20);
        assert_eq!(d["guardrail"], 7);
        assert_eq!(out["specs"][1]["passed"], true);
    }

    #[test]
    fn test_write_report_matches_composed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lint-report.json");
        write_report(&sample(), &path).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.ends_with("}\n"));
        let parsed: JsonVal = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, compose_lint_json(&sample()).unwrap());
        assert_eq!(parsed["generated_at"], "2026-01-01T00:00:00Z");
    }

    #[test]
    fn test_write_report_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("report.json");
        assert!(write_report(&sample(), &path).is_err());
    }

    #[test]
    fn test_human_groups_errors_before_warnings() {
        let text = render_human(&sample(), false);
        let err = text.find("guardrail-matrix-incomplete").unwrap();
        let warn = text.find("vague-criterion").unwrap();
        assert!(err < warn);
        assert!(text.contains("auth: 1 error, 1 warning — FAILED"));
        assert!(text.contains("search: 0 errors, 0 warnings — PASSED"));
        assert!(text.contains("specs=2 errors=1 warnings=1 FAILED"));
    }

    #[test]
    fn test_ci_lines_and_summary_block() {
        let text = render_ci(&sample());
        assert!(text.contains(
            "✗ Error: auth: .ldf/specs/auth/requirements.md:20: [guardrail-matrix-incomplete] guardrail 7 has no row"
        ));
        assert!(text.contains("⚠ Warning: auth: .ldf/specs/auth/requirements.md:14:"));
        assert!(text.contains("✅ Pass: search"));
        assert!(text.contains("❌ auth: 1 error(s), 1 warning(s)"));
        assert!(text.contains("✅ search: PASSED"));
        assert!(text.trim_end().ends_with("errors=1 warnings=1 passed=false"));
    }

    #[test]
    fn test_empty_run_still_prints_summary() {
        let res = LintResult::from_reports(Vec::new(), false, "t".into());
        assert_eq!(render_human(&res, false), "0 specs processed, nothing to check\n");
        assert!(render_ci(&res).contains("0 specs processed, nothing to check"));
        assert!(render_ci(&res).contains("passed=true"));
    }

    #[test]
    fn test_render_guardrails_lists_core_set() {
        let set = GuardrailLoader::builtin().resolve(None, &[]).unwrap();
        let text = render_guardrails(&set, false);
        assert!(text.starts_with("1. Testing Coverage"));
        assert!(text.contains("critical"));
        assert!(text.ends_with("8 active guardrails\n"));
    }

    #[test]
    fn test_render_guardrails_shows_custom_description() {
        let file: GuardrailsFile = serde_yaml::from_str(
            "guardrails:\n  - id: 30\n    name: Feature Flags\n    severity: medium\n    description: Every rollout sits behind a flag\n",
        )
        .unwrap();
        let set = GuardrailLoader::builtin().resolve(Some(&file), &[]).unwrap();
        let text = render_guardrails(&set, false);
        assert!(text.contains("30. Feature Flags"));
        assert!(text.contains("\n    Every rollout sits behind a flag\n"));
        assert!(text.ends_with("9 active guardrails\n"));
    }
}
