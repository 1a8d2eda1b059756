//! Single-pass classification of requirements file lines

use regex::Regex;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Classified form of one line of a requirements file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RequirementLine {
    /// Empty or whitespace-only line
    Blank,
    /// Comment that carries no install options
    Comment(String),
    /// `# [--opt ...]` directive for the next package line
    Annotation(Vec<String>),
    /// `-r <path>` include directive, path as written
    Include(PathBuf),
    /// Installer option passed through untouched (`--extra-index-url ...`, `-f ...`)
    Option(String),
    /// Package specification (`name==1.2.3`, `name @ git+URL`)
    Package(String),
}

fn annotation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#\s*\[([^\]]+)\]\s*$").expect("valid regex"))
}

impl RequirementLine {
    /// Classifies a raw line. Surrounding whitespace is ignored.
    pub fn classify(raw: &str) -> Self {
        let line = raw.trim();

        if line.is_empty() {
            return RequirementLine::Blank;
        }

        if line.starts_with('#') {
            return match annotation_options(line) {
                Some(options) => RequirementLine::Annotation(options),
                None => RequirementLine::Comment(line.to_string()),
            };
        }

        if let Some(target) = include_target(line) {
            return RequirementLine::Include(PathBuf::from(target));
        }

        if line.starts_with('-') {
            return RequirementLine::Option(line.to_string());
        }

        RequirementLine::Package(line.to_string())
    }

    pub fn is_package(&self) -> bool {
        matches!(self, RequirementLine::Package(_))
    }

    pub fn is_annotation(&self) -> bool {
        matches!(self, RequirementLine::Annotation(_))
    }
}

/// Extracts the option tokens of an annotation comment.
///
/// Returns `None` when the bracket body holds any token that is not
/// `--`-prefixed; such a comment is an ordinary comment.
fn annotation_options(line: &str) -> Option<Vec<String>> {
    let caps = annotation_regex().captures(line)?;
    let tokens: Vec<String> = caps[1].split_whitespace().map(str::to_string).collect();

    if tokens.is_empty() || !tokens.iter().all(|t| t.starts_with("--")) {
        return None;
    }

    Some(tokens)
}

/// Returns the include target of `-r <path>`, `--requirement <path>` or
/// `--requirement=<path>`.
fn include_target(line: &str) -> Option<&str> {
    let rest = if let Some(rest) = line.strip_prefix("--requirement=") {
        rest
    } else if let Some(rest) = line.strip_prefix("--requirement") {
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        rest
    } else if let Some(rest) = line.strip_prefix("-r") {
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        rest
    } else {
        return None;
    };

    let target = rest.trim();
    if target.is_empty() {
        None
    } else {
        Some(target)
    }
}
