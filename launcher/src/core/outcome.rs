//! Step termination classification and the run report.

use std::fmt;

use crate::core::plan::FailurePolicy;
use crate::exit_codes;

/// Signal number delivered by Ctrl-C.
pub const SIGINT: i32 = 2;

/// How a step's child process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The process exited with this code.
    Exited(i32),
    /// The process was terminated by this signal (Unix only).
    Signaled(i32),
    /// The process outlived its timeout and was killed.
    TimedOut { secs: u64 },
    /// The process could not be started.
    SpawnFailed { reason: String },
}

impl Termination {
    pub fn success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }

    pub fn is_interrupt(&self) -> bool {
        matches!(self, Self::Signaled(SIGINT))
    }

    /// Exit code the launcher reports when this was the last executed step.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Exited(code) => *code,
            Self::Signaled(signal) => exit_codes::SIGNAL_BASE + signal,
            Self::TimedOut { .. } => exit_codes::TIMED_OUT,
            Self::SpawnFailed { .. } => exit_codes::SPAWN_FAILED,
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited with status {code}"),
            Self::Signaled(signal) => write!(f, "terminated by signal {signal}"),
            Self::TimedOut { secs } => write!(f, "timed out after {secs}s"),
            Self::SpawnFailed { reason } => write!(f, "could not be started: {reason}"),
        }
    }
}

/// Whether the plan proceeds past a step that ended with `termination`.
pub fn should_continue(policy: FailurePolicy, termination: &Termination) -> bool {
    termination.success() || policy == FailurePolicy::Continue
}

/// What happened to one step of the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepState {
    Ran(Termination),
    /// Not started because an earlier step failed with [`FailurePolicy::Stop`].
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub name: String,
    pub state: StepState,
}

impl StepRecord {
    pub fn termination(&self) -> Option<&Termination> {
        match &self.state {
            StepState::Ran(termination) => Some(termination),
            StepState::Skipped => None,
        }
    }
}

/// Per-step results of a launch, in plan order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchReport {
    pub steps: Vec<StepRecord>,
}

impl LaunchReport {
    pub fn record(&mut self, name: &str, state: StepState) {
        self.steps.push(StepRecord {
            name: name.to_string(),
            state,
        });
    }

    pub fn get(&self, name: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|record| record.name == name)
    }

    /// The last step that actually ran.
    pub fn last_executed(&self) -> Option<&StepRecord> {
        self.steps
            .iter()
            .rev()
            .find(|record| record.termination().is_some())
    }

    /// Name of the step that ended the run early, if any.
    pub fn stopped_at(&self) -> Option<&str> {
        let first_skipped = self
            .steps
            .iter()
            .position(|record| record.state == StepState::Skipped)?;
        self.steps[..first_skipped]
            .iter()
            .rev()
            .find(|record| record.termination().is_some())
            .map(|record| record.name.as_str())
    }

    /// Exit status of the last executed step (0 when nothing ran).
    pub fn exit_code(&self) -> i32 {
        self.last_executed()
            .and_then(StepRecord::termination)
            .map_or(exit_codes::OK, Termination::exit_code)
    }

    pub fn all_succeeded(&self) -> bool {
        self.steps
            .iter()
            .all(|record| record.termination().is_some_and(Termination::success))
    }
}
