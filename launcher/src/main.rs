//! Application launcher.
//!
//! Resolves the application's base directory, reports the active conda
//! environment, installs `requirements.txt`, then runs the Streamlit entry
//! point in the foreground. The exit status is the last executed step's.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use launcher::exit_codes;
use launcher::init::{InitOptions, init_config};
use launcher::io::interpreter::VersionFlagProbe;
use launcher::io::process::SystemProcessRunner;
use launcher::io::workdir::{config_path, resolve_base_dir};
use launcher::launch::{
    ConfigOverrides, LaunchRequest, load_launch_config, read_context, run_launch,
};
use launcher::plan::describe_plan;
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "launcher",
    version,
    about = "Install an app's dependencies and launch it"
)]
struct Cli {
    /// Application directory (defaults to the directory containing this executable).
    #[arg(long, global = true)]
    dir: Option<PathBuf>,
    /// Config file (defaults to `launcher.toml` in the application directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Python interpreter to use instead of the configured one.
    #[arg(long, global = true)]
    python: Option<String>,
    /// Do not install dependencies before launching.
    #[arg(long, global = true)]
    skip_install: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Install dependencies, then launch the app (default).
    Run,
    /// Show the resolved steps without running them.
    Plan {
        /// Print the plan as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Write a default `launcher.toml`.
    Init {
        /// Overwrite an existing config file.
        #[arg(short, long)]
        force: bool,
    },
}

fn main() {
    launcher::logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let base_dir = resolve_base_dir(cli.dir.as_deref())?;
    let overrides = ConfigOverrides {
        python: cli.python.clone(),
        skip_install: cli.skip_install,
    };

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => cmd_run(&base_dir, cli.config.as_deref(), &overrides),
        Command::Plan { json } => cmd_plan(&base_dir, cli.config.as_deref(), &overrides, json),
        Command::Init { force } => cmd_init(&base_dir, cli.config.as_deref(), force),
    }
}

fn cmd_run(base_dir: &Path, config: Option<&Path>, overrides: &ConfigOverrides) -> Result<i32> {
    let cfg = load_launch_config(base_dir, config, overrides)?;
    let context = read_context(&cfg.context.env_var);
    let request = LaunchRequest {
        base_dir: base_dir.to_path_buf(),
        config: cfg,
        context,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let report = run_launch(&request, &SystemProcessRunner, &VersionFlagProbe, &mut out)?;
    debug!(exit_code = report.exit_code(), "launch finished");
    Ok(report.exit_code())
}

fn cmd_plan(
    base_dir: &Path,
    config: Option<&Path>,
    overrides: &ConfigOverrides,
    json: bool,
) -> Result<i32> {
    let cfg = load_launch_config(base_dir, config, overrides)?;
    let context = read_context(&cfg.context.env_var);
    let path = config_path(base_dir, config);
    let view = describe_plan(base_dir, &path, &cfg, &context)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        let payload = serde_json::to_string_pretty(&view).context("serialize plan json")?;
        writeln!(out, "{payload}")?;
    } else {
        write!(out, "{view}")?;
    }
    Ok(exit_codes::OK)
}

fn cmd_init(base_dir: &Path, config: Option<&Path>, force: bool) -> Result<i32> {
    let path = init_config(base_dir, config, &InitOptions { force })?;
    println!("{}", path.display());
    Ok(exit_codes::OK)
}
