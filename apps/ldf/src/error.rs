//! Fatal configuration and environment errors.
//!
//! Defects in spec *content* never surface here; they become diagnostics.
//! Anything in this enum aborts the run before a spec is processed.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("not initialized: .ldf/ not found under {0}")]
    NotInitialized(PathBuf),

    #[error("unknown preset '{0}' (known: {1})")]
    UnknownPreset(String, String),

    #[error("guardrail #{id} ({name}) collides with core guardrail #{id}")]
    CoreIdCollision { id: u32, name: String },

    #[error("core guardrail #{0} cannot be redefined in guardrails.yaml")]
    CoreGuardrailModified(u32),

    #[error("guardrail #{0} is declared more than once in guardrails.yaml")]
    DuplicateGuardrail(u32),

    #[error("guardrail #{0} has conflicting definitions")]
    ConflictingGuardrail(u32),

    #[error("unknown guardrail #{id} referenced by {context}")]
    UnknownGuardrail { id: u32, context: String },

    #[error("preset '{0}' redefines a built-in preset")]
    PresetRedefined(String),

    #[error("malformed configuration {}: {message}", path.display())]
    Malformed { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
