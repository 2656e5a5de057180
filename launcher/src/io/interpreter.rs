//! Interpreter version probe for the startup report.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use tracing::{debug, warn};

use crate::io::process::run_captured;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const PROBE_OUTPUT_LIMIT_BYTES: usize = 4096;

/// Looks up an interpreter's version string.
pub trait InterpreterProbe {
    /// `None` when the version cannot be determined. Never fatal.
    fn version(&self, program: &str, workdir: &Path) -> Option<String>;
}

/// Runs `<program> --version`.
pub struct VersionFlagProbe;

impl InterpreterProbe for VersionFlagProbe {
    fn version(&self, program: &str, workdir: &Path) -> Option<String> {
        let mut cmd = Command::new(program);
        cmd.arg("--version").current_dir(workdir);
        let output = match run_captured(cmd, PROBE_TIMEOUT, PROBE_OUTPUT_LIMIT_BYTES) {
            Ok(output) => output,
            Err(err) => {
                let err = format!("{err:#}");
                warn!(program, %err, "interpreter probe failed");
                return None;
            }
        };
        if output.timed_out || !output.status.success() {
            warn!(program, exit_code = ?output.status.code(), "interpreter probe unsuccessful");
            return None;
        }
        // Python 2 prints its version on stderr.
        let version = parse_version_output(&output.stdout)
            .or_else(|| parse_version_output(&output.stderr));
        debug!(program, ?version, "interpreter probed");
        version
    }
}

/// First non-empty line of `raw`, trimmed.
pub fn parse_version_output(raw: &[u8]) -> Option<String> {
    String::from_utf8_lossy(raw)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}
