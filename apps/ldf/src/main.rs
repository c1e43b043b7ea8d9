//! ldf CLI binary entry point.
//! Resolves configuration, runs the lint pipeline and prints results.
//!
//! Exit codes: 0 pass, 1 lint failure, 2 configuration or environment error.

use clap::Parser;
use ldf::cli::{Cli, Commands};
use ldf::config::{self, CliOverrides, Effective};
use ldf::error::ConfigError;
use ldf::guardrails::GuardrailLoader;
use ldf::lint::{self, LintContext, SpecSelection};
use ldf::models::guardrail::GuardrailSet;
use ldf::output;
use ldf::utils::{error_prefix, info_prefix, note_prefix};
use std::path::Path;

fn exit_config(err: &ConfigError) -> ! {
    eprintln!("{} {}", error_prefix(), err);
    if matches!(err, ConfigError::NotInitialized(_)) {
        eprintln!("{} run 'ldf init' to create .ldf/", note_prefix());
    }
    std::process::exit(2);
}

fn resolve(cli: &CliOverrides<'_>) -> (Effective, GuardrailSet) {
    let eff = config::resolve_effective(cli).unwrap_or_else(|e| exit_config(&e));
    let set = GuardrailLoader::builtin()
        .load_path(&eff.guardrails_file, &eff.cli_presets, &eff.config_presets)
        .unwrap_or_else(|e| exit_config(&e));
    (eff, set)
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Lint {
            spec,
            all: _,
            repo_root,
            output,
            strict,
            presets,
            report,
        } => {
            let (eff, set) = resolve(&CliOverrides {
                repo_root: repo_root.as_deref(),
                output: output.as_deref(),
                strict: if strict { Some(true) } else { None },
                presets: &presets,
            });
            if eff.output == "human" {
                if !eff.config_found {
                    eprintln!(
                        "{} No .ldf/config.yaml found; using defaults.",
                        note_prefix()
                    );
                }
                eprintln!("{} Active guardrails: {}", info_prefix(), set.len());
            }
            let selection = match spec.as_deref() {
                Some(name) => SpecSelection::Named(name),
                None => SpecSelection::All,
            };
            let result = lint::run_lint(&LintContext::new(&eff, &set), selection);

            if let Some(path) = report {
                if let Err(e) = output::write_report(&result, Path::new(&path)) {
                    eprintln!("{} cannot write report {}: {}", error_prefix(), path, e);
                    std::process::exit(2);
                }
            }
            if let Err(e) = output::print_lint(&result, &eff.output) {
                eprintln!("{} {}", error_prefix(), e);
                std::process::exit(2);
            }
            if !result.passed {
                std::process::exit(1);
            }
        }
        Commands::Guardrails {
            repo_root,
            output,
            presets,
        } => {
            let (eff, set) = resolve(&CliOverrides {
                repo_root: repo_root.as_deref(),
                output: output.as_deref(),
                strict: None,
                presets: &presets,
            });
            if let Err(e) = output::print_guardrails(&set, &eff.output) {
                eprintln!("{} {}", error_prefix(), e);
                std::process::exit(2);
            }
        }
    }
}
