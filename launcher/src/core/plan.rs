//! Declarative launch plans.
//!
//! A [`LaunchPlan`] is an ordered list of [`StepSpec`] process descriptors.
//! Each step names its program, arguments, optional timeout and what happens
//! to the rest of the plan when it fails. Plans are validated on construction
//! so the orchestrator never has to re-check them.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Name of the dependency installation step in the derived plan.
pub const INSTALL_STEP: &str = "install";
/// Name of the application step in the derived plan.
pub const LAUNCH_STEP: &str = "launch";

/// What to do with the remaining steps when a step fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Skip every later step and exit with the failed step's status.
    #[default]
    Stop,
    /// Report the failure and run the next step anyway.
    Continue,
}

/// A single process invocation within a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSpec {
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub on_failure: FailurePolicy,
    /// Kill the step after this many seconds. `None` waits indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Printed before the step starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    /// Printed after the step exits successfully.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_message: Option<String>,
}

impl StepSpec {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            on_failure: FailurePolicy::Stop,
            timeout_secs: None,
            banner: None,
            success_message: None,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn on_failure(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    pub fn timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = Some(banner.into());
        self
    }

    pub fn success_message(mut self, message: impl Into<String>) -> Self {
        self.success_message = Some(message.into());
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Shell-like rendering for display. Not meant to be fed back to a shell.
    pub fn command_line(&self) -> String {
        self.argv()
            .iter()
            .map(|part| quote_for_display(part))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("step name must be non-empty");
        }
        if self.program.trim().is_empty() {
            bail!("step '{}': program must be non-empty", self.name);
        }
        if self.timeout_secs == Some(0) {
            bail!("step '{}': timeout_secs must be > 0", self.name);
        }
        Ok(())
    }
}

fn quote_for_display(part: &str) -> String {
    let needs_quotes = part.is_empty()
        || part
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | '$' | '`' | '\\'));
    if needs_quotes {
        format!("'{}'", part.replace('\'', r"'\''"))
    } else {
        part.to_string()
    }
}

/// Ordered, validated list of steps. Never empty; step names are unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    steps: Vec<StepSpec>,
}

impl LaunchPlan {
    pub fn new(steps: Vec<StepSpec>) -> Result<Self> {
        if steps.is_empty() {
            bail!("launch plan must contain at least one step");
        }
        let mut seen = HashSet::new();
        for step in &steps {
            step.validate()?;
            if !seen.insert(step.name.as_str()) {
                bail!("duplicate step name '{}'", step.name);
            }
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[StepSpec] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, name: &str) -> Option<&StepSpec> {
        self.steps.iter().find(|step| step.name == name)
    }

    /// Index of the step that hands the terminal to the application.
    pub fn last_index(&self) -> usize {
        self.steps.len() - 1
    }
}

/// Inputs for the standard "install requirements, then run a Streamlit app" plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PythonAppInputs {
    pub python: String,
    pub manifest: String,
    pub entry_point: String,
    pub skip_install: bool,
    pub install_policy: FailurePolicy,
    pub install_timeout_secs: Option<u64>,
    pub install_extra_args: Vec<String>,
    pub launch_extra_args: Vec<String>,
}

/// Build the two-step plan: `<python> -m pip install -r <manifest>` followed by
/// `<python> -m streamlit run <entry_point>`.
pub fn python_app_plan(inputs: &PythonAppInputs) -> Result<LaunchPlan> {
    let mut steps = Vec::with_capacity(2);
    if !inputs.skip_install {
        steps.push(
            StepSpec::new(INSTALL_STEP, &inputs.python)
                .args(["-m", "pip", "install", "-r"])
                .args([inputs.manifest.as_str()])
                .args(inputs.install_extra_args.iter().map(String::as_str))
                .on_failure(inputs.install_policy)
                .timeout_secs(inputs.install_timeout_secs)
                .banner("Installing/updating dependencies...")
                .success_message("Dependencies installed successfully"),
        );
    }
    steps.push(
        StepSpec::new(LAUNCH_STEP, &inputs.python)
            .args(["-m", "streamlit", "run"])
            .args([inputs.entry_point.as_str()])
            .args(inputs.launch_extra_args.iter().map(String::as_str))
            .banner("Starting Streamlit app..."),
    );
    LaunchPlan::new(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> PythonAppInputs {
        PythonAppInputs {
            python: "python3".to_string(),
            manifest: "requirements.txt".to_string(),
            entry_point: "app.py".to_string(),
            skip_install: false,
            install_policy: FailurePolicy::Stop,
            install_timeout_secs: None,
            install_extra_args: Vec::new(),
            launch_extra_args: Vec::new(),
        }
    }

    #[test]
    fn python_plan_installs_then_launches() {
        let plan = python_app_plan(&inputs()).expect("plan");
        let names: Vec<&str> = plan.steps().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec![INSTALL_STEP, LAUNCH_STEP]);

        let install = plan.step(INSTALL_STEP).expect("install step");
        assert_eq!(
            install.argv(),
            vec!["python3", "-m", "pip", "install", "-r", "requirements.txt"]
        );
        assert_eq!(install.on_failure, FailurePolicy::Stop);

        let launch = &plan.steps()[plan.last_index()];
        assert_eq!(
            launch.argv(),
            vec!["python3", "-m", "streamlit", "run", "app.py"]
        );
    }

    #[test]
    fn python_plan_appends_extra_args_after_fixed_ones() {
        let mut inputs = inputs();
        inputs.install_extra_args = vec!["--quiet".to_string()];
        inputs.launch_extra_args = vec!["--server.port".to_string(), "8502".to_string()];
        inputs.install_timeout_secs = Some(600);

        let plan = python_app_plan(&inputs).expect("plan");
        let install = plan.step(INSTALL_STEP).expect("install");
        assert_eq!(install.args.last().map(String::as_str), Some("--quiet"));
        assert_eq!(install.timeout(), Some(Duration::from_secs(600)));
        let launch = plan.step(LAUNCH_STEP).expect("launch");
        assert_eq!(&launch.args[3..], ["app.py", "--server.port", "8502"]);
    }

    #[test]
    fn skip_install_leaves_only_launch() {
        let mut inputs = inputs();
        inputs.skip_install = true;
        let plan = python_app_plan(&inputs).expect("plan");
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.steps()[0].name, LAUNCH_STEP);
    }

    #[test]
    fn plan_rejects_empty_and_duplicate_steps() {
        let err = LaunchPlan::new(Vec::new()).unwrap_err();
        assert!(err.to_string().contains("at least one step"));

        let err = LaunchPlan::new(vec![StepSpec::new("a", "true"), StepSpec::new("a", "false")])
            .unwrap_err();
        assert!(err.to_string().contains("duplicate step name 'a'"));
    }

    #[test]
    fn plan_rejects_blank_program_and_zero_timeout() {
        let err = LaunchPlan::new(vec![StepSpec::new("a", "  ")]).unwrap_err();
        assert!(err.to_string().contains("program must be non-empty"));

        let err =
            LaunchPlan::new(vec![StepSpec::new("a", "true").timeout_secs(Some(0))]).unwrap_err();
        assert!(err.to_string().contains("timeout_secs must be > 0"));
    }

    #[test]
    fn command_line_quotes_only_when_needed() {
        let step = StepSpec::new("s", "sh").args(["-c", "echo 'hi' there", ""]);
        assert_eq!(
            step.command_line(),
            r#"sh -c 'echo '\''hi'\'' there' ''"#
        );
    }
}
