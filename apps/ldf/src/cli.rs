//! CLI argument parsing via `clap`.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ldf",
    version,
    about = "Spec linter and guardrail coverage validator",
    long_about = "ldf validates requirements.md, design.md and tasks.md of each spec against the active guardrail set.\n\nConfiguration precedence: CLI > .ldf/config.yaml > defaults.",
    after_help = "Examples:\n  ldf lint auth\n  ldf lint --all --output ci --strict\n  ldf lint --all --preset fintech --report lint-report.json\n  ldf guardrails --output json",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    /// Raise log verbosity to debug (RUST_LOG also honored)
    #[arg(short, long, global = true, action = clap::ArgAction::SetTrue)]
    pub verbose: bool,
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current ldf version.")]
    Version,
    /// Lint one spec or all specs
    #[command(
        about = "Run lint checks",
        long_about = "Check spec documents for required sections, user stories, placeholder markers, answerpacks and guardrail coverage. Exits 1 when any spec fails, 2 on configuration errors.",
        after_help = "Examples:\n  ldf lint auth\n  ldf lint --all --output json"
    )]
    Lint {
        #[arg(
            help = "Spec name (directory under the specs dir)",
            required_unless_present = "all",
            conflicts_with = "all"
        )]
        spec: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Lint every spec")]
        all: bool,
        #[arg(long, help = "Repository root (default: auto-detect from .ldf/ or .git/)")]
        repo_root: Option<String>,
        #[arg(long, help = "Output mode: human|ci|json (default: human)")]
        output: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Fail on warnings too")]
        strict: bool,
        #[arg(long = "preset", help = "Activate a guardrail preset (repeatable; overrides config)")]
        presets: Vec<String>,
        #[arg(long, help = "Also write the JSON report to this path")]
        report: Option<String>,
    },
    /// List the active guardrails
    #[command(
        about = "List active guardrails",
        long_about = "Resolve the core guardrails plus the active presets and print them in order."
    )]
    Guardrails {
        #[arg(long, help = "Repository root (default: auto-detect from .ldf/ or .git/)")]
        repo_root: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
        #[arg(long = "preset", help = "Activate a guardrail preset (repeatable; overrides config)")]
        presets: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lint_args_parse() {
        let cli = Cli::try_parse_from([
            "ldf", "-v", "lint", "--all", "--strict", "--preset", "saas", "--preset", "fintech",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.cmd {
            Commands::Lint {
                spec,
                all,
                strict,
                presets,
                ..
            } => {
                assert!(spec.is_none());
                assert!(all);
                assert!(strict);
                assert_eq!(presets, vec!["saas", "fintech"]);
            }
            _ => panic!("expected lint"),
        }
    }

    #[test]
    fn test_lint_requires_spec_or_all() {
        assert!(Cli::try_parse_from(["ldf", "lint"]).is_err());
        assert!(Cli::try_parse_from(["ldf", "lint", "auth", "--all"]).is_err());
        assert!(Cli::try_parse_from(["ldf", "lint", "auth"]).is_ok());
    }
}
