//! Output formatting for JSON, YAML and human-readable text
//!
//! ```ignore
//! use reqsmith::cli::output::{OutputFormat, OutputFormatter};
//!
//! let plan = installer.plan(Path::new("requirements.txt"))?;
//! let formatter = OutputFormatter::new(OutputFormat::Json);
//! println!("{}", formatter.format_plan(&plan)?);
//! ```

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::config::InstallerConfig;
use crate::installer::{InstallAction, InstallPlan, SetupReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_plan(&self, plan: &InstallPlan) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(plan).context("Failed to serialize install plan to JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(plan).context("Failed to serialize install plan to YAML")
            }
            OutputFormat::Human => Ok(self.format_plan_human(plan)),
        }
    }

    pub fn format_config(&self, config: &InstallerConfig) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                // Sorted keys keep the output stable
                let map: BTreeMap<_, _> = config.to_display_map().into_iter().collect();
                serde_json::to_string_pretty(&map).context("Failed to serialize config to JSON")
            }
            OutputFormat::Yaml => {
                let map: BTreeMap<_, _> = config.to_display_map().into_iter().collect();
                serde_yaml::to_string(&map).context("Failed to serialize config to YAML")
            }
            OutputFormat::Human => Ok(config.to_string()),
        }
    }

    pub fn format_setup(&self, report: &SetupReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(report).context("Failed to serialize setup report to JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(report).context("Failed to serialize setup report to YAML")
            }
            OutputFormat::Human => Ok(self.format_setup_human(report)),
        }
    }

    fn format_plan_human(&self, plan: &InstallPlan) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "Install plan for {}", plan.source.display());
        let _ = writeln!(out);

        if plan.files.len() > 1 {
            let _ = writeln!(out, "Files:");
            for file in &plan.files {
                let _ = writeln!(out, "  {}", file.display());
            }
            let _ = writeln!(out);
        }

        let _ = writeln!(out, "Packages: {}", plan.packages.len());
        if !plan.pip_options.is_empty() {
            let _ = writeln!(out, "Options:");
            for option in &plan.pip_options {
                let _ = writeln!(out, "  {}", option);
            }
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "Actions:");
        for (i, action) in plan.actions.iter().enumerate() {
            match action {
                InstallAction::Bulk {
                    requirements,
                    filtered,
                } => {
                    let suffix = if *filtered { " (filtered)" } else { "" };
                    let _ = writeln!(
                        out,
                        "  {}. install -r {}{}",
                        i + 1,
                        requirements.display(),
                        suffix
                    );
                }
                InstallAction::Package { spec, options } => {
                    let _ = writeln!(out, "  {}. install {} {}", i + 1, options.join(" "), spec);
                }
            }
        }

        if let Some(filtered) = &plan.filtered {
            let _ = writeln!(out);
            let _ = writeln!(out, "Filtered requirements:");
            for line in filtered.lines() {
                let _ = writeln!(out, "  {}", line);
            }
        }

        out
    }

    fn format_setup_human(&self, report: &SetupReport) -> String {
        let mut out = String::new();

        for result in &report.results {
            let marker = if result.status.success() { "ok" } else { "FAILED" };
            let _ = writeln!(
                out,
                "{:<6} {:<6} {} ({})",
                result.phase,
                marker,
                result.file.display(),
                result.status
            );
        }
        for phase in &report.disabled {
            let _ = writeln!(out, "{:<6} disabled", phase);
        }
        for file in &report.missing {
            let _ = writeln!(out, "missing {}", file.display());
        }

        out
    }
}
