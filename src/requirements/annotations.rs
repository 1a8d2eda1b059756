//! Per-package option annotations
//!
//! A comment of the form `# [--opt1 --opt2]` attaches its options to the next
//! package line of the same file. Consecutive annotations stack. The file stays
//! valid input for `pip install -r` because annotations are plain comments.

use super::document::{RequirementsDocument, RequirementsFile};
use super::line::RequirementLine;
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

/// File and 1-based line number of a package line
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LineOrigin {
    pub path: PathBuf,
    pub line: usize,
}

/// A package specification with the options annotated onto it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageDirective {
    pub spec: String,
    pub options: Vec<String>,
    pub origin: LineOrigin,
}

impl PackageDirective {
    /// Distribution name without version or URL, for log messages
    pub fn name(&self) -> &str {
        let end = self
            .spec
            .find(|c: char| matches!(c, '@' | '=' | '<' | '>' | '!' | '~' | '[' | ';' | ' '))
            .unwrap_or(self.spec.len());
        self.spec[..end].trim()
    }
}

/// Pending options waiting for the next package line
#[derive(Debug, Default, Clone)]
pub struct AnnotationBlock {
    options: Vec<String>,
}

impl AnnotationBlock {
    pub fn push(&mut self, options: &[String]) {
        self.options.extend(options.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.options)
    }
}

/// Collects every annotated package across the include tree, in file order.
pub fn parse_annotations(document: &RequirementsDocument) -> Vec<PackageDirective> {
    let mut out = Vec::new();
    scan(document.root(), &mut out);
    out
}

// Each file gets its own accumulator; an include neither reads nor clears
// the caller's pending options.
fn scan(file: &RequirementsFile, out: &mut Vec<PackageDirective>) {
    let mut pending = AnnotationBlock::default();

    for line in &file.lines {
        match &line.kind {
            RequirementLine::Annotation(options) => pending.push(options),
            RequirementLine::Include(_) => {
                if let Some(nested) = &line.nested {
                    scan(nested, out);
                }
            }
            RequirementLine::Package(spec) => {
                if !pending.is_empty() {
                    out.push(PackageDirective {
                        spec: spec.clone(),
                        options: pending.take(),
                        origin: LineOrigin {
                            path: file.path.clone(),
                            line: line.number,
                        },
                    });
                }
            }
            RequirementLine::Blank | RequirementLine::Comment(_) | RequirementLine::Option(_) => {}
        }
    }

    if !pending.is_empty() {
        debug!(
            file = %file.path.display(),
            options = ?pending.take(),
            "Annotation at end of file has no package line, ignoring"
        );
    }
}
