//! Orchestration for `launcher plan`: show what a run would do without running it.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::context::RuntimeContext;
use crate::core::plan::FailurePolicy;
use crate::io::config::LauncherConfig;

/// Serializable description of a resolved launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanView {
    pub app_name: String,
    pub base_dir: PathBuf,
    pub config_path: PathBuf,
    pub config_found: bool,
    pub context: String,
    pub steps: Vec<StepView>,
    /// Files the derived plan hands to external tools. Empty for `[[steps]]` plans.
    pub files: Vec<FileCheck>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepView {
    pub name: String,
    pub argv: Vec<String>,
    /// `argv` quoted for display.
    pub command_line: String,
    pub on_failure: FailurePolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileCheck {
    pub role: String,
    pub path: String,
    pub exists: bool,
}

/// Resolve the plan for display. Missing files are reported, never fatal.
pub fn describe_plan(
    base_dir: &Path,
    config_path: &Path,
    cfg: &LauncherConfig,
    context: &RuntimeContext,
) -> anyhow::Result<PlanView> {
    let plan = cfg.plan()?;
    let steps = plan
        .steps()
        .iter()
        .map(|step| StepView {
            name: step.name.clone(),
            argv: step.argv(),
            command_line: step.command_line(),
            on_failure: step.on_failure,
            timeout_secs: step.timeout_secs,
        })
        .collect();

    let files = if cfg.uses_custom_steps() {
        Vec::new()
    } else {
        let mut files = Vec::new();
        if !cfg.install.skip {
            files.push(check_file(base_dir, "manifest", &cfg.manifest));
        }
        files.push(check_file(base_dir, "entry_point", &cfg.entry_point));
        files
    };

    Ok(PlanView {
        app_name: cfg.app_name.clone(),
        base_dir: base_dir.to_path_buf(),
        config_path: config_path.to_path_buf(),
        config_found: config_path.exists(),
        context: context.message(),
        steps,
        files,
    })
}

fn check_file(base_dir: &Path, role: &str, path: &str) -> FileCheck {
    FileCheck {
        role: role.to_string(),
        path: path.to_string(),
        exists: base_dir.join(path).is_file(),
    }
}

/// Human-readable rendering, used by `launcher plan` without `--json`.
impl fmt::Display for PlanView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "app: {}", self.app_name)?;
        writeln!(f, "base dir: {}", self.base_dir.display())?;
        let config_note = if self.config_found {
            ""
        } else {
            " (not found, using defaults)"
        };
        writeln!(f, "config: {}{config_note}", self.config_path.display())?;
        writeln!(f, "{}", self.context)?;
        writeln!(f, "steps:")?;
        for (idx, step) in self.steps.iter().enumerate() {
            let policy = match step.on_failure {
                FailurePolicy::Stop => "stop",
                FailurePolicy::Continue => "continue",
            };
            let timeout = step
                .timeout_secs
                .map(|secs| format!(", timeout {secs}s"))
                .unwrap_or_default();
            writeln!(
                f,
                "  {}. {} [on failure: {policy}{timeout}]\n     {}",
                idx + 1,
                step.name,
                step.command_line
            )?;
        }
        if !self.files.is_empty() {
            writeln!(f, "files:")?;
            for file in &self.files {
                let state = if file.exists { "ok" } else { "missing" };
                writeln!(f, "  {}: {} ({state})", file.role, file.path)?;
            }
        }
        Ok(())
    }
}
