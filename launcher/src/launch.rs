//! Orchestration for `launcher run`.
//!
//! A launch reports the startup context, then executes the plan one step at a
//! time in the base directory. Each step blocks until its child exits; a failed
//! step either ends the run or is reported and passed over, depending on its
//! [`FailurePolicy`](crate::core::plan::FailurePolicy).

use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use crate::core::context::RuntimeContext;
use crate::core::outcome::{LaunchReport, StepState, should_continue};
use crate::core::plan::LaunchPlan;
use crate::io::config::{LauncherConfig, load_config};
use crate::io::interpreter::InterpreterProbe;
use crate::io::process::ProcessRunner;
use crate::io::workdir::config_path;

/// Command-line values that take precedence over `launcher.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub python: Option<String>,
    pub skip_install: bool,
}

/// Load the config for `base_dir` and apply CLI overrides on top.
pub fn load_launch_config(
    base_dir: &Path,
    explicit_config: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<LauncherConfig> {
    let path = config_path(base_dir, explicit_config);
    let mut cfg = load_config(&path)?;
    if overrides.python.is_some() && cfg.uses_custom_steps() {
        bail!(
            "--python cannot be combined with [[steps]] in {}; set each step's program instead",
            path.display()
        );
    }
    if let Some(python) = &overrides.python {
        cfg.python.clone_from(python);
    }
    if overrides.skip_install {
        cfg.install.skip = true;
    }
    cfg.validate().context("apply command-line overrides")?;
    debug!(config = %path.display(), custom_steps = cfg.uses_custom_steps(), "config loaded");
    Ok(cfg)
}

/// Read the runtime context variable from the process environment.
pub fn read_context(var: &str) -> RuntimeContext {
    let value = env::var_os(var).map(|raw| raw.to_string_lossy().into_owned());
    RuntimeContext::from_value(var, value.as_deref())
}

/// Everything a launch needs, resolved up front.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub base_dir: PathBuf,
    pub config: LauncherConfig,
    pub context: RuntimeContext,
}

/// Print the startup report and execute the configured plan.
pub fn run_launch<R: ProcessRunner, P: InterpreterProbe, W: Write>(
    request: &LaunchRequest,
    runner: &R,
    probe: &P,
    out: &mut W,
) -> Result<LaunchReport> {
    let cfg = &request.config;
    let plan = cfg.plan()?;

    writeln!(out, "Starting {}...", cfg.app_name)?;
    if !cfg.uses_custom_steps() {
        let version = probe
            .version(&cfg.python, &request.base_dir)
            .unwrap_or_else(|| "unknown".to_string());
        writeln!(out, "Python executable: {}", cfg.python)?;
        writeln!(out, "Python version: {version}")?;
    }
    writeln!(out, "{}", request.context)?;
    if !request.context.is_active() {
        debug!("no runtime context detected");
    }

    execute_plan(&plan, &request.base_dir, runner, out)
}

/// Run every step of `plan` in order with `workdir` as the working directory.
pub fn execute_plan<R: ProcessRunner, W: Write>(
    plan: &LaunchPlan,
    workdir: &Path,
    runner: &R,
    out: &mut W,
) -> Result<LaunchReport> {
    let mut report = LaunchReport::default();
    let mut stopped = false;

    for (idx, step) in plan.steps().iter().enumerate() {
        if stopped {
            debug!(step = %step.name, "skipping step after earlier failure");
            report.record(&step.name, StepState::Skipped);
            continue;
        }

        match &step.banner {
            Some(banner) => writeln!(out, "{banner}")?,
            None => writeln!(out, "Running {}: {}", step.name, step.command_line())?,
        }
        // Our lines must reach the terminal before the child's output does.
        out.flush().context("flush output")?;

        let termination = runner
            .run(step, workdir)
            .with_context(|| format!("run step '{}'", step.name))?;

        if termination.success() {
            if let Some(message) = &step.success_message {
                writeln!(out, "{message}")?;
            }
        } else if termination.is_interrupt() && idx == plan.last_index() {
            writeln!(out, "\nApp stopped by user")?;
        } else {
            writeln!(out, "Error: {} failed: {termination}", step.name)?;
        }

        if !should_continue(step.on_failure, &termination) {
            info!(step = %step.name, %termination, "stopping after failed step");
            stopped = true;
        } else if !termination.success() {
            warn!(step = %step.name, %termination, "continuing after failed step");
        }
        report.record(&step.name, StepState::Ran(termination));
    }

    out.flush().context("flush output")?;
    Ok(report)
}
