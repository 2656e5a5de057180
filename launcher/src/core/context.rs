//! Runtime context reporting (which conda environment is active).

use std::fmt;

/// Environment variable conda sets to the name of the active environment.
pub const DEFAULT_CONTEXT_VAR: &str = "CONDA_DEFAULT_ENV";

/// The runtime context observed at startup. Informational only: nothing
/// downstream branches on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeContext {
    /// The variable holds a non-empty environment name.
    Active(String),
    /// The variable is unset, empty or whitespace.
    Missing { var: String },
}

impl RuntimeContext {
    /// Classify the raw value of `var`.
    pub fn from_value(var: &str, value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(name) if !name.is_empty() => Self::Active(name.to_string()),
            _ => Self::Missing {
                var: var.to_string(),
            },
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    /// Human-readable line printed before any step runs.
    pub fn message(&self) -> String {
        match self {
            Self::Active(name) => format!("Conda environment: {name}"),
            Self::Missing { var } => {
                format!("Warning: no conda environment is active ({var} is not set)")
            }
        }
    }
}

impl fmt::Display for RuntimeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}
