//! Test-only helpers: scripted process runners and throwaway app directories.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::core::outcome::Termination;
use crate::core::plan::StepSpec;
use crate::io::config::CONFIG_FILE_NAME;
use crate::io::interpreter::InterpreterProbe;
use crate::io::process::ProcessRunner;

/// One recorded call to [`ScriptedRunner::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub step: String,
    pub argv: Vec<String>,
    pub workdir: PathBuf,
}

/// Process runner that returns queued terminations and records every call.
pub struct ScriptedRunner {
    queue: RefCell<VecDeque<Termination>>,
    calls: RefCell<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new(terminations: Vec<Termination>) -> Self {
        Self {
            queue: RefCell::new(terminations.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    pub fn assert_drained(&self) -> Result<()> {
        let remaining = self.queue.borrow().len();
        if remaining > 0 {
            return Err(anyhow!("scripted runner has {remaining} unused terminations"));
        }
        Ok(())
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, step: &StepSpec, workdir: &Path) -> Result<Termination> {
        self.calls.borrow_mut().push(Invocation {
            step: step.name.clone(),
            argv: step.argv(),
            workdir: workdir.to_path_buf(),
        });
        self.queue
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted runner queue empty at step '{}'", step.name))
    }
}

/// Probe that always answers with the same version.
pub struct FixedProbe {
    version: Option<String>,
}

impl FixedProbe {
    pub fn new(version: Option<&str>) -> Self {
        Self {
            version: version.map(str::to_string),
        }
    }
}

impl InterpreterProbe for FixedProbe {
    fn version(&self, _program: &str, _workdir: &Path) -> Option<String> {
        self.version.clone()
    }
}

/// Temporary application directory with `requirements.txt` and `app.py`.
pub struct TempApp {
    dir: TempDir,
}

impl TempApp {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp dir")?;
        fs::write(dir.path().join("requirements.txt"), "streamlit\n")
            .context("write requirements.txt")?;
        fs::write(dir.path().join("app.py"), "import streamlit as st\n").context("write app.py")?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `launcher.toml` with the given contents.
    pub fn write_config(&self, contents: &str) -> Result<PathBuf> {
        let path = self.path().join(CONFIG_FILE_NAME);
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }
}

/// Write an executable `/bin/sh` script at `path`.
#[cfg(unix)]
pub fn write_script(path: &Path, body: &str) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o755)
        .open(path)
        .with_context(|| format!("create {}", path.display()))?;
    writeln!(file, "#!/bin/sh\n{body}").with_context(|| format!("write {}", path.display()))?;
    file.sync_all()
        .with_context(|| format!("sync {}", path.display()))?;
    Ok(())
}
