//! Ordered install actions derived from one requirements document

use crate::requirements::{filter_document, parse_annotations, PackageDirective, RequirementsDocument};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Option flags that select where packages come from. These are carried over
/// from the requirements tree onto every individual install.
const INDEX_FLAGS: [&str; 8] = [
    "-i",
    "--index-url",
    "--extra-index-url",
    "--no-index",
    "-f",
    "--find-links",
    "--trusted-host",
    "--pre",
];

/// One step of an install
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum InstallAction {
    /// `install -r` over the requirements file, or over its filtered copy
    Bulk { requirements: PathBuf, filtered: bool },

    /// Single package installed with its annotated options
    Package { spec: String, options: Vec<String> },
}

impl InstallAction {
    /// Arguments that follow `<program> install`
    ///
    /// `requirements` replaces the bulk file path, which is how the
    /// temporary filtered copy gets substituted at run time.
    pub fn install_args(&self, requirements: &Path, index_options: &[String]) -> Vec<String> {
        match self {
            InstallAction::Bulk { .. } => {
                vec!["-r".to_string(), requirements.display().to_string()]
            }
            InstallAction::Package { spec, options } => index_options
                .iter()
                .chain(options.iter())
                .cloned()
                .chain(std::iter::once(spec.clone()))
                .collect(),
        }
    }
}

/// Everything an install would do, computed without running anything
#[derive(Debug, Clone, Serialize)]
pub struct InstallPlan {
    /// Requirements file as given by the caller
    pub source: PathBuf,

    /// Every file reached through includes, root first
    pub files: Vec<PathBuf>,

    pub packages: Vec<String>,

    /// Pass-through option lines, de-duplicated
    pub pip_options: Vec<String>,

    /// Index options split into arguments for individual installs
    pub index_options: Vec<String>,

    pub annotated: Vec<PackageDirective>,

    pub actions: Vec<InstallAction>,

    /// Content of the bulk-install file when annotations were found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtered: Option<String>,
}

impl InstallPlan {
    pub fn build(source: &Path, document: &RequirementsDocument) -> Self {
        let annotated = parse_annotations(document);
        let pip_options: Vec<String> = document.pip_options().into_iter().map(String::from).collect();
        let index_options = index_arguments(&pip_options);

        let filtered = if annotated.is_empty() {
            None
        } else {
            Some(filter_document(document, &annotated))
        };

        let mut actions = vec![InstallAction::Bulk {
            requirements: source.to_path_buf(),
            filtered: filtered.is_some(),
        }];
        // A file reached through two include paths yields its directives twice
        {
            let mut seen = HashSet::new();
            actions.extend(
                annotated
                    .iter()
                    .filter(|d| seen.insert((d.spec.as_str(), d.options.as_slice())))
                    .map(|d| InstallAction::Package {
                        spec: d.spec.clone(),
                        options: d.options.clone(),
                    }),
            );
        }

        Self {
            source: source.to_path_buf(),
            files: document.files().into_iter().map(Path::to_path_buf).collect(),
            packages: document.packages().into_iter().map(String::from).collect(),
            pip_options,
            index_options,
            annotated,
            actions,
            filtered,
        }
    }

    /// No annotations: the file is installed as-is in one invocation
    pub fn is_fast_path(&self) -> bool {
        self.annotated.is_empty()
    }

    /// Directory holding the root requirements file, after symlinks
    pub fn root_dir(&self) -> Option<&Path> {
        self.files.first().and_then(|root| root.parent())
    }
}

/// Splits the index-selecting option lines into command-line arguments
fn index_arguments(pip_options: &[String]) -> Vec<String> {
    pip_options
        .iter()
        .filter(|line| {
            let flag = line.split(|c: char| c.is_whitespace() || c == '=').next().unwrap_or("");
            INDEX_FLAGS.contains(&flag)
        })
        .flat_map(|line| line.split_whitespace().map(String::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn plan_for(content: &str) -> (TempDir, InstallPlan) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("requirements.txt");
        fs::write(&path, content).unwrap();
        let document = RequirementsDocument::load(&path).unwrap();
        let plan = InstallPlan::build(&path, &document);
        (dir, plan)
    }

    #[test]
    fn test_plan_without_annotations_is_fast_path() {
        let (_dir, plan) = plan_for("numpy\nscipy>=1.10\n");

        assert!(plan.is_fast_path());
        assert!(plan.filtered.is_none());
        assert_eq!(plan.actions.len(), 1);
        assert!(matches!(
            plan.actions[0],
            InstallAction::Bulk { filtered: false, .. }
        ));
        assert_eq!(plan.packages, vec!["numpy", "scipy>=1.10"]);
    }

    #[test]
    fn test_plan_orders_bulk_then_packages() {
        let (_dir, plan) = plan_for(
            "requests==2.0\n# [--no-build-isolation]\nfoo @ git+https://example.com/foo\nbar==1.0\n",
        );

        assert!(!plan.is_fast_path());
        assert_eq!(plan.actions.len(), 2);
        assert!(matches!(
            plan.actions[0],
            InstallAction::Bulk { filtered: true, .. }
        ));
        assert_eq!(
            plan.actions[1],
            InstallAction::Package {
                spec: "foo @ git+https://example.com/foo".to_string(),
                options: vec!["--no-build-isolation".to_string()],
            }
        );
        assert_eq!(
            plan.filtered.as_deref(),
            Some("requests==2.0\n# [skipped by installer] foo @ git+https://example.com/foo\nbar==1.0\n")
        );
    }

    #[test]
    fn test_diamond_include_installs_shared_package_once() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("shared.txt"), "# [--no-build-isolation]\napex\n").unwrap();
        fs::write(dir.path().join("left.txt"), "-r shared.txt\n").unwrap();
        fs::write(dir.path().join("right.txt"), "-r shared.txt\n# [--no-deps]\napex\n").unwrap();
        let path = dir.path().join("requirements.txt");
        fs::write(&path, "-r left.txt\n-r right.txt\n").unwrap();

        let document = RequirementsDocument::load(&path).unwrap();
        let plan = InstallPlan::build(&path, &document);

        assert_eq!(plan.annotated.len(), 3);
        assert_eq!(
            plan.actions[1..],
            [
                InstallAction::Package {
                    spec: "apex".to_string(),
                    options: vec!["--no-build-isolation".to_string()],
                },
                InstallAction::Package {
                    spec: "apex".to_string(),
                    options: vec!["--no-deps".to_string()],
                },
            ]
        );
        assert_eq!(
            plan.filtered.as_deref(),
            Some("# [skipped by installer] apex\n# [skipped by installer] apex\n# [skipped by installer] apex\n")
        );
    }

    #[test]
    fn test_index_options_are_carried() {
        let (_dir, plan) = plan_for(
            "--extra-index-url https://download.example.com/whl\n-e ./local\n--pre\n# [--no-deps]\napex\n",
        );

        assert_eq!(
            plan.pip_options,
            vec!["--extra-index-url https://download.example.com/whl", "-e ./local", "--pre"]
        );
        assert_eq!(
            plan.index_options,
            vec!["--extra-index-url", "https://download.example.com/whl", "--pre"]
        );

        let args = plan.actions[1].install_args(Path::new("unused"), &plan.index_options);
        assert_eq!(
            args,
            vec![
                "--extra-index-url",
                "https://download.example.com/whl",
                "--pre",
                "--no-deps",
                "apex"
            ]
        );
    }

    #[test]
    fn test_index_option_with_equals() {
        let options = vec!["--index-url=https://pypi.example.com/simple".to_string()];
        assert_eq!(
            index_arguments(&options),
            vec!["--index-url=https://pypi.example.com/simple"]
        );
        assert!(index_arguments(&["--prefer-binary".to_string()]).is_empty());
    }

    #[test]
    fn test_bulk_args_use_given_path() {
        let action = InstallAction::Bulk {
            requirements: PathBuf::from("requirements.txt"),
            filtered: true,
        };
        assert_eq!(
            action.install_args(Path::new("/tmp/.reqsmith-x.txt"), &[]),
            vec!["-r", "/tmp/.reqsmith-x.txt"]
        );
    }

    #[test]
    fn test_plan_serializes_actions() {
        let (_dir, plan) = plan_for("# [--no-build-isolation]\napex\n");
        let json = serde_json::to_value(&plan).unwrap();

        assert_eq!(json["actions"][0]["action"], "bulk");
        assert_eq!(json["actions"][1]["action"], "package");
        assert_eq!(json["actions"][1]["spec"], "apex");
        assert_eq!(json["annotated"][0]["origin"]["line"], 2);
    }
}
