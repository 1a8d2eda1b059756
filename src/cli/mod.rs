pub mod commands;
pub mod output;

pub use commands::{
    CliArgs, CloneArgs, Commands, ConfigArgs, ConfigOverrides, InstallArgs, NeedsBuildArgs,
    PlanArgs, ResolveArgs, SetupArgs,
};
pub use output::{OutputFormat, OutputFormatter};
