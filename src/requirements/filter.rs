//! Derivation of the bulk-install requirements file

use super::annotations::{LineOrigin, PackageDirective};
use super::document::RequirementsDocument;
use super::line::RequirementLine;
use std::collections::HashSet;
use std::path::Path;

/// Prefix written in place of a package that is installed separately
pub const SKIP_MARKER: &str = "# [skipped by installer]";

/// Renders the expanded document with annotated packages elided.
///
/// Annotation comments are dropped, annotated package lines become
/// `# [skipped by installer] <spec>`, and everything else is copied verbatim.
/// Each output line ends with `\n`, so filtering the output again yields the
/// same bytes.
///
/// Option lines from included files in another directory get their relative
/// path arguments made absolute, since the output is read from the root
/// file's directory rather than theirs.
pub fn filter_document(document: &RequirementsDocument, annotated: &[PackageDirective]) -> String {
    let skip: HashSet<&LineOrigin> = annotated.iter().map(|d| &d.origin).collect();
    let root_dir = document.path().parent();
    let mut out = String::new();

    for expanded in document.lines() {
        let line = expanded.line;
        match &line.kind {
            RequirementLine::Annotation(_) => continue,
            RequirementLine::Package(spec) => {
                let origin = LineOrigin {
                    path: expanded.path.to_path_buf(),
                    line: line.number,
                };
                if skip.contains(&origin) {
                    out.push_str(SKIP_MARKER);
                    out.push(' ');
                    out.push_str(spec);
                } else {
                    out.push_str(&line.text);
                }
            }
            RequirementLine::Option(option) => {
                let dir = expanded.path.parent();
                match dir.filter(|dir| Some(*dir) != root_dir) {
                    Some(dir) => match rebase_option(option, dir) {
                        Some(rebased) => out.push_str(&rebased),
                        None => out.push_str(&line.text),
                    },
                    None => out.push_str(&line.text),
                }
            }
            _ => out.push_str(&line.text),
        }
        out.push('\n');
    }

    out
}

/// Options whose argument is a path relative to the file they appear in
const PATH_FLAGS: [&str; 6] = ["-c", "--constraint", "-f", "--find-links", "-e", "--editable"];

/// Rewrites the relative path argument of `option` against `dir`.
///
/// Returns `None` when the option takes no path, or its argument is already
/// absolute or a URL.
fn rebase_option(option: &str, dir: &Path) -> Option<String> {
    let (flag, separator, rest) = match option.split_once(|c: char| c.is_whitespace() || c == '=') {
        Some((flag, rest)) if option[flag.len()..].starts_with('=') => (flag, "=", rest),
        Some((flag, rest)) => (flag, " ", rest.trim_start()),
        None => return None,
    };
    if !PATH_FLAGS.contains(&flag) {
        return None;
    }

    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let (value, tail) = rest.split_at(end);
    if value.is_empty() || value.contains("://") || value.starts_with("file:") || Path::new(value).is_absolute() {
        return None;
    }

    Some(format!("{}{}{}{}", flag, separator, dir.join(value).display(), tail))
}
