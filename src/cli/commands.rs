use crate::config::{InstallerConfig, OverrideList, PackageManager, Phase};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Annotation-aware requirements installer with phase control and retries
#[derive(Parser, Debug)]
#[command(
    name = "reqsmith",
    about = "Annotation-aware requirements installer with phase control and retries",
    version,
    long_about = "reqsmith installs pip requirements files whose packages may carry \
                  per-package install options in `# [--opt ...]` comments. Annotated \
                  packages are installed one by one after a bulk install of the rest. \
                  Phases (system, dev, base, task), override lists and retry behaviour \
                  are configured through REQSMITH_* environment variables or flags."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only log errors"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Install a requirements file",
        long_about = "Installs a requirements file and everything it includes. Packages \
                      preceded by an annotation comment are skipped in the bulk install \
                      and installed individually with the annotated options.\n\n\
                      Examples:\n  \
                      reqsmith install requirements/cuda/train.txt\n  \
                      reqsmith install requirements.txt --attempts 5 --dry-run"
    )]
    Install(InstallArgs),

    #[command(
        about = "Install the requirements of every enabled phase",
        long_about = "Runs the dev, base and task phases against a requirements/ tree:\n  \
                      requirements/dev.txt\n  \
                      requirements/<platform>/base.txt\n  \
                      requirements/<platform>/<task>.txt\n\n\
                      Examples:\n  \
                      reqsmith setup --platform cuda --task train\n  \
                      reqsmith setup --task all --no-dev"
    )]
    Setup(SetupArgs),

    #[command(
        about = "Show what an install would do",
        long_about = "Expands includes, collects annotations and prints the resulting \
                      install actions and filtered requirements without running anything.\n\n\
                      Examples:\n  \
                      reqsmith plan requirements.txt\n  \
                      reqsmith plan requirements.txt --format json"
    )]
    Plan(PlanArgs),

    #[command(
        about = "Clone a git repository with retries",
        long_about = "Clones a repository, retrying transient failures. An existing \
                      checkout at the target directory is left untouched.\n\n\
                      Examples:\n  \
                      reqsmith clone https://github.com/NVIDIA/apex.git third_party/apex\n  \
                      reqsmith clone URL DIR --branch v1.0 --depth 1 --recursive"
    )]
    Clone(CloneArgs),

    #[command(
        about = "Decide whether an item is installed from source",
        long_about = "Prints true or false and exits with 0 or 1 accordingly.\n\n\
                      Examples:\n  \
                      reqsmith resolve task apex\n  \
                      REQSMITH_ONLY_PIP=true reqsmith resolve base flash-attn"
    )]
    Resolve(ResolveArgs),

    #[command(
        about = "Check whether a package needs to be built",
        long_about = "Exits with 0 when the package is missing or a rebuild is forced, \
                      1 when it is already installed."
    )]
    NeedsBuild(NeedsBuildArgs),

    #[command(about = "Show the effective configuration")]
    Config(ConfigArgs),
}

/// Flags layered over the `REQSMITH_*` environment
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    #[arg(long, value_enum, help = "Package manager used for installs")]
    pub pkg_mgr: Option<PackageManagerArg>,

    #[arg(long, value_name = "DIR", help = "Conda installation root")]
    pub conda_root: Option<PathBuf>,

    #[arg(long, value_name = "NAME", help = "Conda environment name")]
    pub conda_env: Option<String>,

    #[arg(long, help = "Disable the system phase")]
    pub no_system: bool,

    #[arg(long, help = "Disable the dev phase")]
    pub no_dev: bool,

    #[arg(long, help = "Disable the base phase")]
    pub no_base: bool,

    #[arg(long, help = "Disable the task phase")]
    pub no_task: bool,

    #[arg(long, help = "Never build from source unless source-overridden")]
    pub only_pip: bool,

    #[arg(long, help = "Rebuild packages that are already installed")]
    pub force_rebuild: bool,

    #[arg(long, value_name = "LIST", help = "Comma-separated pip override list")]
    pub pip_deps: Option<String>,

    #[arg(long, value_name = "LIST", help = "Comma-separated source override list")]
    pub src_deps: Option<String>,
}

impl ConfigOverrides {
    /// Applies the flags that were given; absent flags keep the environment value
    pub fn apply(&self, config: &mut InstallerConfig) {
        if let Some(pkg_mgr) = self.pkg_mgr {
            config.package_manager = pkg_mgr.into();
        }
        if let Some(root) = &self.conda_root {
            config.conda_root = Some(root.clone());
        }
        if let Some(env) = &self.conda_env {
            config.conda_env = Some(env.clone());
        }

        for (disabled, phase) in [
            (self.no_system, Phase::System),
            (self.no_dev, Phase::Dev),
            (self.no_base, Phase::Base),
            (self.no_task, Phase::Task),
        ] {
            if disabled {
                config.phases.set(phase, false);
            }
        }

        if self.only_pip {
            config.only_pip = true;
        }
        if self.force_rebuild {
            config.force_rebuild = true;
        }
        if let Some(list) = &self.pip_deps {
            config.pip_overrides = OverrideList::parse(list);
        }
        if let Some(list) = &self.src_deps {
            config.source_overrides = OverrideList::parse(list);
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct InstallArgs {
    #[arg(value_name = "FILE", help = "Requirements file to install")]
    pub file: PathBuf,

    #[arg(
        short = 'n',
        long,
        value_name = "N",
        help = "Attempts per command (defaults to REQSMITH_RETRY_COUNT)"
    )]
    pub attempts: Option<u32>,

    #[arg(long, help = "Log commands instead of running them")]
    pub dry_run: bool,

    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

#[derive(Parser, Debug, Clone)]
pub struct SetupArgs {
    #[arg(
        long,
        value_name = "DIR",
        default_value = ".",
        help = "Project root containing requirements/"
    )]
    pub root: PathBuf,

    #[arg(long, default_value = "cuda", help = "Platform subdirectory of requirements/")]
    pub platform: String,

    #[arg(long, help = "Task requirements to install, or 'all'")]
    pub task: Option<String>,

    #[arg(short = 'n', long, value_name = "N", help = "Attempts per command")]
    pub attempts: Option<u32>,

    #[arg(long, help = "Log commands instead of running them")]
    pub dry_run: bool,

    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

#[derive(Parser, Debug, Clone)]
pub struct PlanArgs {
    #[arg(value_name = "FILE", help = "Requirements file to inspect")]
    pub file: PathBuf,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

#[derive(Parser, Debug, Clone)]
pub struct CloneArgs {
    #[arg(value_name = "URL", help = "Repository URL")]
    pub url: String,

    #[arg(value_name = "DIR", help = "Target directory")]
    pub target_dir: PathBuf,

    #[arg(short = 'b', long, help = "Branch or tag to check out")]
    pub branch: Option<String>,

    #[arg(long, value_name = "N", help = "Create a shallow clone with N commits")]
    pub depth: Option<u32>,

    #[arg(long, help = "Clone submodules too")]
    pub recursive: bool,

    #[arg(short = 'n', long, value_name = "N", help = "Attempts before giving up")]
    pub attempts: Option<u32>,

    #[arg(long, help = "Log the command instead of running it")]
    pub dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ResolveArgs {
    #[arg(value_name = "PHASE", help = "Phase name (system, dev, base, task)")]
    pub phase: String,

    #[arg(value_name = "ITEM", help = "Item to resolve")]
    pub item: String,

    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

#[derive(Parser, Debug, Clone)]
pub struct NeedsBuildArgs {
    #[arg(value_name = "NAME", help = "Installed package name")]
    pub name: String,

    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManagerArg {
    Uv,
    Pip,
    Conda,
}

impl From<PackageManagerArg> for PackageManager {
    fn from(arg: PackageManagerArg) -> Self {
        match arg {
            PackageManagerArg::Uv => PackageManager::Uv,
            PackageManagerArg::Pip => PackageManager::Pip,
            PackageManagerArg::Conda => PackageManager::Conda,
        }
    }
}
