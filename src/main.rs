use reqsmith::cli::commands::{
    CliArgs, CloneArgs, Commands, ConfigArgs, ConfigOverrides, InstallArgs, NeedsBuildArgs,
    PlanArgs, ResolveArgs, SetupArgs,
};
use reqsmith::cli::output::{OutputFormat, OutputFormatter};
use reqsmith::exec::{ExitStatus, SystemExecutor, ThreadSleeper};
use reqsmith::git::CloneRequest;
use reqsmith::installer::{Installer, PhaseLayout};
use reqsmith::util::logging::{self, LoggingConfig};
use reqsmith::{ConfigError, InstallerConfig, NAME, VERSION};

use clap::Parser;
use std::env;
use std::process;
use tracing::{debug, error, info};

/// Exit code for configuration and usage errors
const CONFIG_ERROR_CODE: i32 = 2;

fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("{} v{} starting", NAME, VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Install(install_args) => handle_install(install_args),
        Commands::Setup(setup_args) => handle_setup(setup_args, args.quiet),
        Commands::Plan(plan_args) => handle_plan(plan_args),
        Commands::Clone(clone_args) => handle_clone(clone_args),
        Commands::Resolve(resolve_args) => handle_resolve(resolve_args),
        Commands::NeedsBuild(needs_build_args) => handle_needs_build(needs_build_args),
        Commands::Config(config_args) => handle_config(config_args),
    };

    process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let env_level = env::var("REQSMITH_LOG_LEVEL").ok();
    let config = LoggingConfig::from_flags(
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
        env_level.as_deref(),
    )
    .json(logging::json_from_env());

    logging::init_logging(config);
}

/// Environment configuration with the command-line flags applied
fn load_config(overrides: &ConfigOverrides) -> Result<InstallerConfig, ConfigError> {
    let mut config = InstallerConfig::from_env()?;
    overrides.apply(&mut config);
    config.validate()?;
    debug!("Configuration: {:?}", config);
    Ok(config)
}

fn exit_code(status: ExitStatus) -> i32 {
    match status.code() {
        0 => 0,
        code @ 1..=255 => code,
        _ => 1,
    }
}

fn bool_exit_code(value: bool) -> i32 {
    if value {
        0
    } else {
        1
    }
}

fn handle_install(args: &InstallArgs) -> i32 {
    let config = match load_config(&args.overrides) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return CONFIG_ERROR_CODE;
        }
    };

    let installer = Installer::new(&config, &SystemExecutor, &ThreadSleeper);
    let attempts = args.attempts.unwrap_or(config.retry_count);

    match installer.install_requirements(&args.file, attempts, args.dry_run) {
        Ok(status) if status.success() => {
            info!(file = %args.file.display(), "Requirements installed");
            0
        }
        Ok(status) => {
            error!(file = %args.file.display(), %status, "Requirements install failed");
            exit_code(status)
        }
        Err(e) => {
            error!("{}", e);
            1
        }
    }
}

fn handle_setup(args: &SetupArgs, quiet: bool) -> i32 {
    let config = match load_config(&args.overrides) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return CONFIG_ERROR_CODE;
        }
    };

    let mut layout = PhaseLayout::new(&args.root, &args.platform);
    if let Some(task) = &args.task {
        layout = layout.with_task(task);
    }

    let installer = Installer::new(&config, &SystemExecutor, &ThreadSleeper);
    let attempts = args.attempts.unwrap_or(config.retry_count);
    let report = installer.install_phases(&layout, attempts, args.dry_run);

    if !quiet {
        match OutputFormatter::new(OutputFormat::Human).format_setup(&report) {
            Ok(summary) => print!("{}", summary),
            Err(e) => error!("Failed to format setup summary: {}", e),
        }
    }

    let status = report.status();
    if !status.success() {
        let failed: Vec<String> = report
            .failed()
            .map(|r| r.file.display().to_string())
            .collect();
        error!("Setup failed for: {}", failed.join(", "));
    }
    exit_code(status)
}

fn handle_plan(args: &PlanArgs) -> i32 {
    let config = match load_config(&args.overrides) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return CONFIG_ERROR_CODE;
        }
    };

    let installer = Installer::new(&config, &SystemExecutor, &ThreadSleeper);
    let plan = match installer.plan(&args.file) {
        Ok(plan) => plan,
        Err(e) => {
            error!("{}", e);
            return 1;
        }
    };

    let formatter = OutputFormatter::new(args.format.into());
    match formatter.format_plan(&plan) {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            error!("Failed to format install plan: {}", e);
            1
        }
    }
}

fn handle_clone(args: &CloneArgs) -> i32 {
    // Only the retry settings matter here, so the package manager is not validated
    let config = match InstallerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return CONFIG_ERROR_CODE;
        }
    };

    let mut request = CloneRequest::new(&args.url, &args.target_dir).recursive(args.recursive);
    if let Some(branch) = &args.branch {
        request = request.branch(branch);
    }
    if let Some(depth) = args.depth {
        request = request.depth(depth);
    }

    let installer = Installer::new(&config, &SystemExecutor, &ThreadSleeper);
    let attempts = args.attempts.unwrap_or(config.retry_count);
    exit_code(installer.clone_with_retry(&request, attempts, args.dry_run))
}

fn handle_resolve(args: &ResolveArgs) -> i32 {
    let config = match load_config(&args.overrides) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return CONFIG_ERROR_CODE;
        }
    };

    let installer = Installer::new(&config, &SystemExecutor, &ThreadSleeper);
    let from_source = installer.should_install_from_source(&args.phase, &args.item);
    println!("{}", from_source);
    bool_exit_code(from_source)
}

fn handle_needs_build(args: &NeedsBuildArgs) -> i32 {
    let config = match load_config(&args.overrides) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return CONFIG_ERROR_CODE;
        }
    };

    let installer = Installer::new(&config, &SystemExecutor, &ThreadSleeper);
    let needs_build = installer.should_build_package(&args.name);
    println!("{}", needs_build);
    bool_exit_code(needs_build)
}

fn handle_config(args: &ConfigArgs) -> i32 {
    let config = match load_config(&args.overrides) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return CONFIG_ERROR_CODE;
        }
    };

    match OutputFormatter::new(args.format.into()).format_config(&config) {
        Ok(output) => {
            print!("{}", output);
            0
        }
        Err(e) => {
            error!("Failed to format configuration: {}", e);
            1
        }
    }
}
