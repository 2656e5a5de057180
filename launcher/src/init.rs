//! Orchestration for `launcher init`: scaffold a `launcher.toml`.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use tracing::info;

use crate::io::config::{LauncherConfig, write_config};
use crate::io::workdir::config_path;

/// Options for `init_config`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite an existing config file.
    pub force: bool,
}

/// Write the default config for `base_dir` and return its path.
pub fn init_config(
    base_dir: &Path,
    explicit_config: Option<&Path>,
    options: &InitOptions,
) -> Result<PathBuf> {
    let path = config_path(base_dir, explicit_config);
    if path.exists() && !options.force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    write_config(&path, &LauncherConfig::default())?;
    info!(config = %path.display(), "wrote default config");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::load_config;

    #[test]
    fn init_writes_loadable_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = init_config(temp.path(), None, &InitOptions { force: false }).expect("init");
        assert_eq!(path, temp.path().join("launcher.toml"));
        assert_eq!(load_config(&path).expect("load"), LauncherConfig::default());
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("launcher.toml");
        std::fs::write(&path, "python = \"pypy3\"\n").expect("write");

        let err = init_config(temp.path(), None, &InitOptions { force: false }).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        let kept = std::fs::read_to_string(&path).expect("read");
        assert!(kept.contains("pypy3"));

        init_config(temp.path(), None, &InitOptions { force: true }).expect("force init");
        assert_eq!(load_config(&path).expect("load"), LauncherConfig::default());
    }
}
