//! Requirements file processing
//!
//! Requirements files follow the pip grammar, extended with annotation
//! comments that carry per-package install options:
//!
//! | Line form | Meaning |
//! |-----------|---------|
//! | empty / whitespace | blank |
//! | `# [--opt1 --opt2]` | options for the next package line |
//! | `# anything else` | comment |
//! | `-r <path>` | include, relative to the containing file |
//! | `-<anything else>` | installer option, passed through |
//! | anything else | package specification |
//!
//! Processing is split into three passes over one [`RequirementsDocument`]:
//!
//! - [`RequirementsDocument::load`] expands includes
//! - [`parse_annotations`] collects annotated packages
//! - [`filter_document`] renders the bulk-install file

mod annotations;
mod document;
mod filter;
mod line;

pub use annotations::{parse_annotations, AnnotationBlock, LineOrigin, PackageDirective};
pub use document::{ExpandedLine, RequirementsDocument, RequirementsFile, SourceLine};
pub use filter::{filter_document, SKIP_MARKER};
pub use line::RequirementLine;

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading a requirements tree
#[derive(Debug, Error)]
pub enum RequirementsError {
    /// The top-level requirements file does not exist
    #[error("Requirements file not found: {}", .0.display())]
    MissingFile(PathBuf),

    /// An include chain refers back to a file that is still being expanded
    #[error("Include cycle detected: {}", format_chain(.chain))]
    IncludeCycle { chain: Vec<PathBuf> },

    #[error("Failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
