//! Base directory resolution.
//!
//! Every step runs with the base directory as its working directory, so the
//! manifest and entry point resolve relative to the application rather than
//! to wherever the launcher was invoked from.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::io::config::CONFIG_FILE_NAME;

/// Canonical base directory: `explicit` if given, else the directory that
/// contains the launcher executable.
pub fn resolve_base_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    let candidate = match explicit {
        Some(dir) => dir.to_path_buf(),
        None => launcher_dir()?,
    };
    let base = candidate
        .canonicalize()
        .with_context(|| format!("resolve base directory {}", candidate.display()))?;
    if !base.is_dir() {
        bail!("base directory {} is not a directory", base.display());
    }
    debug!(base_dir = %base.display(), "resolved base directory");
    Ok(base)
}

/// Directory containing the running executable (symlinks resolved).
pub fn launcher_dir() -> Result<PathBuf> {
    let exe = env::current_exe().context("locate launcher executable")?;
    let exe = exe
        .canonicalize()
        .with_context(|| format!("resolve {}", exe.display()))?;
    exe.parent()
        .map(Path::to_path_buf)
        .with_context(|| format!("executable {} has no parent directory", exe.display()))
}

/// Config path: `explicit` if given, else `launcher.toml` in `base_dir`.
pub fn config_path(base_dir: &Path, explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => base_dir.join(CONFIG_FILE_NAME),
    }
}
