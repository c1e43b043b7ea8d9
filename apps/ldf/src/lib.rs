//! ldf core library.
//!
//! This crate lints spec-driven-development documents (`requirements.md`,
//! `design.md`, `tasks.md`) against a configurable guardrail set and reports
//! categorized diagnostics for humans and CI.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Project discovery and effective configuration resolution.
//! - `error`: Fatal configuration errors.
//! - `guardrails`: Guardrail registry loader (core set, presets, guardrails.yaml).
//! - `parse`: Line-oriented markdown parser.
//! - `coverage`: Guardrail coverage matrix analysis.
//! - `rules`: Structural checks per document, plus answerpacks.
//! - `lint`: Pipeline across one or many specs.
//! - `models`: Diagnostics, documents, guardrails and lint output structs.
//! - `output`: Human/CI/JSON printers.
//! - `utils`: Supporting helpers.
pub mod cli;
pub mod config;
pub mod coverage;
pub mod error;
pub mod guardrails;
pub mod lint;
pub mod models;
pub mod output;
pub mod parse;
pub mod rules;
pub mod utils;
