//! Launcher configuration stored in `launcher.toml` next to the application.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::context::DEFAULT_CONTEXT_VAR;
use crate::core::plan::{
    FailurePolicy, INSTALL_STEP, LaunchPlan, PythonAppInputs, StepSpec, python_app_plan,
};

/// File name looked up in the base directory when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "launcher.toml";

/// Launcher configuration (TOML).
///
/// Every field is optional; a missing file behaves like an empty one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LauncherConfig {
    /// Shown in the startup banner.
    pub app_name: String,

    /// Interpreter used for `-m pip` and `-m streamlit`.
    pub python: String,

    /// Requirements manifest, relative to the base directory.
    pub manifest: String,

    /// Streamlit entry point, relative to the base directory.
    pub entry_point: String,

    pub context: ContextConfig,
    pub install: InstallConfig,
    pub launch: LaunchConfig,

    /// When non-empty, replaces the derived install/launch plan entirely.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContextConfig {
    /// Environment variable holding the active environment name.
    pub env_var: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InstallConfig {
    pub skip: bool,
    pub on_failure: FailurePolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Appended after `-r <manifest>`.
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LaunchConfig {
    /// Appended after the entry point (e.g. `["--server.port", "8502"]`).
    pub extra_args: Vec<String>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            env_var: DEFAULT_CONTEXT_VAR.to_string(),
        }
    }
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            app_name: "DOCX Translator App".to_string(),
            python: "python3".to_string(),
            manifest: "requirements.txt".to_string(),
            entry_point: "app.py".to_string(),
            context: ContextConfig::default(),
            install: InstallConfig::default(),
            launch: LaunchConfig::default(),
            steps: Vec::new(),
        }
    }
}

impl LauncherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.python.trim().is_empty() {
            return Err(anyhow!("python must be non-empty"));
        }
        if self.manifest.trim().is_empty() {
            return Err(anyhow!("manifest must be non-empty"));
        }
        if self.entry_point.trim().is_empty() {
            return Err(anyhow!("entry_point must be non-empty"));
        }
        if self.context.env_var.trim().is_empty() {
            return Err(anyhow!("context.env_var must be non-empty"));
        }
        if self.install.timeout_secs == Some(0) {
            return Err(anyhow!("install.timeout_secs must be > 0"));
        }
        if self.uses_custom_steps() {
            self.plan().context("invalid [[steps]]")?;
        }
        Ok(())
    }

    /// True when `[[steps]]` replaces the derived Python plan.
    pub fn uses_custom_steps(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Resolve the plan this config describes.
    ///
    /// `install.skip` drops the step named `install` from a custom plan too.
    pub fn plan(&self) -> Result<LaunchPlan> {
        if self.uses_custom_steps() {
            let steps = self
                .steps
                .iter()
                .filter(|step| !(self.install.skip && step.name == INSTALL_STEP))
                .cloned()
                .collect();
            return LaunchPlan::new(steps);
        }
        python_app_plan(&PythonAppInputs {
            python: self.python.clone(),
            manifest: self.manifest.clone(),
            entry_point: self.entry_point.clone(),
            skip_install: self.install.skip,
            install_policy: self.install.on_failure,
            install_timeout_secs: self.install.timeout_secs,
            install_extra_args: self.install.extra_args.clone(),
            launch_extra_args: self.launch.extra_args.clone(),
        })
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `LauncherConfig::default()`.
pub fn load_config(path: &Path) -> Result<LauncherConfig> {
    if !path.exists() {
        let cfg = LauncherConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: LauncherConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &LauncherConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
