//! Supporting helpers: colored message prefixes, path display, and
//! lazily compiled static regexes.

use owo_colors::OwoColorize;
use std::path::Path;

fn colors_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

pub fn error_prefix() -> String {
    if colors_enabled() {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    }
}

pub fn note_prefix() -> String {
    if colors_enabled() {
        "note:".cyan().bold().to_string()
    } else {
        "note:".to_string()
    }
}

pub fn info_prefix() -> String {
    if colors_enabled() {
        "info:".blue().bold().to_string()
    } else {
        "info:".to_string()
    }
}

/// Render `path` relative to `root` when possible, using `/` separators.
pub fn display_path(path: &Path, root: &Path) -> String {
    let rel = pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf());
    let s = rel.to_string_lossy().replace('\\', "/");
    if s.is_empty() {
        ".".to_string()
    } else {
        s
    }
}

/// Compile a literal regex once and hand out a `&'static Regex`.
macro_rules! static_regex {
    ($re:literal) => {{
        static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
        RE.get_or_init(|| regex::Regex::new($re).expect("static regex must compile"))
    }};
}
pub(crate) use static_regex;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_display_path_relative_to_root() {
        let root = PathBuf::from("/work/project");
        let p = root.join(".ldf/specs/auth/requirements.md");
        assert_eq!(display_path(&p, &root), ".ldf/specs/auth/requirements.md");
        assert_eq!(display_path(&root, &root), ".");
    }
}
