//! Recursive include expansion
//!
//! A [`RequirementsDocument`] keeps the include hierarchy as a tree of
//! [`RequirementsFile`]s so that per-file passes (annotations) and flattened
//! passes (filtering, package listing) can both run over the same load.

use super::line::RequirementLine;
use super::RequirementsError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One line of a requirements file with its position and classification
#[derive(Debug, Clone)]
pub struct SourceLine {
    /// 1-based line number within its file
    pub number: usize,
    /// Line text as read, without the line terminator
    pub text: String,
    pub kind: RequirementLine,
    /// Expansion of an include directive; `None` for other lines and for
    /// includes whose target does not exist
    pub nested: Option<RequirementsFile>,
}

/// A single parsed requirements file
#[derive(Debug, Clone)]
pub struct RequirementsFile {
    pub path: PathBuf,
    pub lines: Vec<SourceLine>,
}

/// A line of the flattened document together with the file it came from
#[derive(Debug, Clone, Copy)]
pub struct ExpandedLine<'a> {
    pub path: &'a Path,
    pub line: &'a SourceLine,
}

/// Fully expanded requirements document rooted at one file
#[derive(Debug, Clone)]
pub struct RequirementsDocument {
    root: RequirementsFile,
}

impl RequirementsDocument {
    /// Loads `path` and every file it includes.
    ///
    /// # Errors
    ///
    /// - [`RequirementsError::MissingFile`] if `path` itself does not exist
    /// - [`RequirementsError::IncludeCycle`] if an include chain loops back
    /// - [`RequirementsError::Read`] on I/O failure
    ///
    /// A missing nested include is not an error; it expands to nothing.
    pub fn load(path: &Path) -> Result<Self, RequirementsError> {
        if !path.is_file() {
            return Err(RequirementsError::MissingFile(path.to_path_buf()));
        }

        let root_path = canonical(path);
        let mut chain = vec![root_path.clone()];
        let root = load_file(&root_path, &mut chain)?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &RequirementsFile {
        &self.root
    }

    pub fn path(&self) -> &Path {
        &self.root.path
    }

    /// Lines in expansion order. Include directives are replaced by the lines
    /// of the file they reference.
    pub fn lines(&self) -> Vec<ExpandedLine<'_>> {
        let mut out = Vec::new();
        flatten(&self.root, &mut out);
        out
    }

    /// Every package specification in expansion order
    pub fn packages(&self) -> Vec<&str> {
        self.lines()
            .into_iter()
            .filter_map(|l| match &l.line.kind {
                RequirementLine::Package(spec) => Some(spec.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Pass-through installer options in first-seen order, without duplicates
    pub fn pip_options(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for l in self.lines() {
            if let RequirementLine::Option(text) = &l.line.kind {
                if !seen.contains(&text.as_str()) {
                    seen.push(text.as_str());
                }
            }
        }
        seen
    }

    /// Every file that took part in the expansion, root first
    pub fn files(&self) -> Vec<&Path> {
        let mut out = Vec::new();
        collect_files(&self.root, &mut out);
        out
    }
}

fn load_file(path: &Path, chain: &mut Vec<PathBuf>) -> Result<RequirementsFile, RequirementsError> {
    let content = fs::read_to_string(path).map_err(|source| RequirementsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(file = %path.display(), "Loading requirements file");

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut lines = Vec::new();

    for (idx, text) in content.lines().enumerate() {
        let kind = RequirementLine::classify(text);
        let nested = match &kind {
            RequirementLine::Include(target) => include(base_dir, target, path, chain)?,
            _ => None,
        };

        lines.push(SourceLine {
            number: idx + 1,
            text: text.to_string(),
            kind,
            nested,
        });
    }

    Ok(RequirementsFile {
        path: path.to_path_buf(),
        lines,
    })
}

fn include(
    base_dir: &Path,
    target: &Path,
    from: &Path,
    chain: &mut Vec<PathBuf>,
) -> Result<Option<RequirementsFile>, RequirementsError> {
    let resolved = if target.is_absolute() {
        target.to_path_buf()
    } else {
        base_dir.join(target)
    };

    if !resolved.is_file() {
        warn!(
            include = %resolved.display(),
            from = %from.display(),
            "Included requirements file not found, skipping"
        );
        return Ok(None);
    }

    let resolved = canonical(&resolved);
    if chain.contains(&resolved) {
        let mut cycle = chain.clone();
        cycle.push(resolved);
        return Err(RequirementsError::IncludeCycle { chain: cycle });
    }

    chain.push(resolved.clone());
    let file = load_file(&resolved, chain);
    chain.pop();

    file.map(Some)
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn flatten<'a>(file: &'a RequirementsFile, out: &mut Vec<ExpandedLine<'a>>) {
    for line in &file.lines {
        match (&line.kind, &line.nested) {
            (RequirementLine::Include(_), Some(nested)) => flatten(nested, out),
            (RequirementLine::Include(_), None) => {}
            _ => out.push(ExpandedLine {
                path: &file.path,
                line,
            }),
        }
    }
}

fn collect_files<'a>(file: &'a RequirementsFile, out: &mut Vec<&'a Path>) {
    out.push(&file.path);
    for nested in file.lines.iter().filter_map(|l| l.nested.as_ref()) {
        collect_files(nested, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = RequirementsDocument::load(&dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, RequirementsError::MissingFile(_)));
    }

    #[test]
    fn test_simple_file() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "req.txt", "# comment\nnumpy==1.26.4\n\nscipy==1.14.1\n");

        let doc = RequirementsDocument::load(&path).unwrap();
        assert_eq!(doc.packages(), vec!["numpy==1.26.4", "scipy==1.14.1"]);
        assert!(doc.pip_options().is_empty());
        assert_eq!(doc.lines().len(), 4);
    }

    #[test]
    fn test_includes_are_spliced_in_place() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "common.txt", "typer>=0.9.0\npyyaml==6.0.2\n");
        let base = write(
            dir.path(),
            "base.txt",
            "--extra-index-url https://example.com/whl\n-r common.txt\ntorch==2.9.1\n",
        );

        let doc = RequirementsDocument::load(&base).unwrap();
        assert_eq!(
            doc.packages(),
            vec!["typer>=0.9.0", "pyyaml==6.0.2", "torch==2.9.1"]
        );
        assert_eq!(doc.pip_options(), vec!["--extra-index-url https://example.com/whl"]);
    }

    #[test]
    fn test_nested_includes_resolve_relative_to_including_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "common.txt", "numpy==1.26.4\n");
        write(
            dir.path(),
            "cuda/base.txt",
            "--extra-index-url https://download.pytorch.org/whl/cu128\n-r ../common.txt\ntorch==2.9.1\n",
        );
        let train = write(dir.path(), "cuda/train.txt", "-r ./base.txt\nmegatron-core\n");

        let doc = RequirementsDocument::load(&train).unwrap();
        assert_eq!(
            doc.packages(),
            vec!["numpy==1.26.4", "torch==2.9.1", "megatron-core"]
        );
        assert_eq!(doc.files().len(), 3);
    }

    #[test]
    fn test_absolute_include() {
        let dir = TempDir::new().unwrap();
        let shared = write(dir.path(), "shared/pins.txt", "packaging==24.0\n");
        let root = write(
            dir.path(),
            "app/req.txt",
            &format!("-r {}\nrich\n", shared.display()),
        );

        let doc = RequirementsDocument::load(&root).unwrap();
        assert_eq!(doc.packages(), vec!["packaging==24.0", "rich"]);
    }

    #[test]
    fn test_missing_nested_include_expands_to_nothing() {
        let dir = TempDir::new().unwrap();
        let root = write(dir.path(), "req.txt", "a==1\n-r missing.txt\nb==2\n");

        let doc = RequirementsDocument::load(&root).unwrap();
        assert_eq!(doc.packages(), vec!["a==1", "b==2"]);
        assert_eq!(doc.files().len(), 1);
    }

    #[test]
    fn test_duplicate_options_are_collapsed() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.txt", "--pre\nx\n");
        let root = write(dir.path(), "root.txt", "--pre\n-r a.txt\n--trusted-host example.com\n");

        let doc = RequirementsDocument::load(&root).unwrap();
        assert_eq!(doc.pip_options(), vec!["--pre", "--trusted-host example.com"]);
    }

    #[test]
    fn test_include_cycle_is_detected() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.txt", "pkg-a\n-r b.txt\n");
        write(dir.path(), "b.txt", "pkg-b\n-r a.txt\n");

        let err = RequirementsDocument::load(&dir.path().join("a.txt")).unwrap_err();
        match err {
            RequirementsError::IncludeCycle { chain } => {
                assert_eq!(chain.len(), 3);
                assert_eq!(chain.first(), chain.last());
            }
            other => panic!("Expected IncludeCycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_include_is_a_cycle() {
        let dir = TempDir::new().unwrap();
        let root = write(dir.path(), "loop.txt", "-r loop.txt\n");

        let err = RequirementsDocument::load(&root).unwrap_err();
        assert!(matches!(err, RequirementsError::IncludeCycle { .. }));
    }

    #[test]
    fn test_diamond_include_is_not_a_cycle() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "common.txt", "numpy\n");
        write(dir.path(), "left.txt", "-r common.txt\nleft\n");
        write(dir.path(), "right.txt", "-r common.txt\nright\n");
        let root = write(dir.path(), "root.txt", "-r left.txt\n-r right.txt\n");

        let doc = RequirementsDocument::load(&root).unwrap();
        assert_eq!(doc.packages(), vec!["numpy", "left", "numpy", "right"]);
    }

    #[test]
    fn test_line_numbers_and_origin() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "inc.txt", "\ninner\n");
        let root = write(dir.path(), "root.txt", "outer\n-r inc.txt\n");

        let doc = RequirementsDocument::load(&root).unwrap();
        let lines = doc.lines();
        let inner = lines
            .iter()
            .find(|l| l.line.kind == RequirementLine::Package("inner".to_string()))
            .unwrap();
        assert_eq!(inner.line.number, 2);
        assert!(inner.path.ends_with("inc.txt"));
    }
}
