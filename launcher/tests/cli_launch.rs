//! CLI tests for the launcher binary.
//!
//! Spawns the real binary against temporary app directories whose steps are
//! small shell scripts, and checks ordering, working directory, exit status
//! and console output.

#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use launcher::exit_codes;
use launcher::test_support::{TempApp, write_script};

fn launcher(app: &TempApp, args: &[&str]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_launcher"));
    cmd.arg("--dir").arg(app.path()).args(args);
    // Run from somewhere other than the app so relative paths would break.
    cmd.current_dir(std::env::temp_dir());
    cmd.env_remove("CONDA_DEFAULT_ENV").env_remove("RUST_LOG");
    cmd
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("spawn launcher")
}

fn read_trace(app: &TempApp) -> String {
    fs::read_to_string(app.path().join("trace.log")).unwrap_or_default()
}

fn sh_steps(install: &str, launch: &str) -> String {
    format!(
        r#"
[[steps]]
name = "install"
program = "sh"
args = ["-c", "{install}"]

[[steps]]
name = "launch"
program = "sh"
args = ["-c", "{launch}"]
"#
    )
}

#[test]
fn steps_run_in_order_inside_base_dir() {
    let app = TempApp::new().expect("app");
    app.write_config(&sh_steps(
        "echo install >> trace.log",
        "echo launch >> trace.log; pwd -P > cwd.txt",
    ))
    .expect("config");

    let output = run(&mut launcher(&app, &[]));

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(read_trace(&app), "install\nlaunch\n");
    let cwd = fs::read_to_string(app.path().join("cwd.txt")).expect("cwd");
    assert_eq!(
        Path::new(cwd.trim()),
        app.path().canonicalize().expect("canonicalize")
    );
}

#[test]
fn failed_install_stops_before_launch() {
    let app = TempApp::new().expect("app");
    app.write_config(&sh_steps(
        "echo install >> trace.log; exit 3",
        "echo launch >> trace.log",
    ))
    .expect("config");

    let output = run(&mut launcher(&app, &[]));

    assert_eq!(output.status.code(), Some(3));
    assert_eq!(read_trace(&app), "install\n");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Error: install failed: exited with status 3"));
}

#[test]
fn continue_policy_reaches_launch() {
    let app = TempApp::new().expect("app");
    let config = sh_steps("exit 9", "echo launch >> trace.log").replacen(
        "args = [\"-c\", \"exit 9\"]",
        "args = [\"-c\", \"exit 9\"]\non_failure = \"continue\"",
        1,
    );
    app.write_config(&config).expect("config");

    let output = run(&mut launcher(&app, &[]));

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(read_trace(&app), "launch\n");
}

#[test]
fn exit_status_of_launch_step_is_propagated() {
    let app = TempApp::new().expect("app");
    app.write_config(&sh_steps("true", "exit 42")).expect("config");

    let output = run(&mut launcher(&app, &[]));
    assert_eq!(output.status.code(), Some(42));
}

#[test]
fn signal_terminated_step_maps_to_128_plus_signal() {
    let app = TempApp::new().expect("app");
    app.write_config(&sh_steps("true", "kill -TERM $$")).expect("config");

    let output = run(&mut launcher(&app, &[]));
    assert_eq!(output.status.code(), Some(exit_codes::SIGNAL_BASE + 15));
}

#[test]
fn missing_program_exits_with_spawn_failure() {
    let app = TempApp::new().expect("app");
    app.write_config(
        "[[steps]]\nname = \"launch\"\nprogram = \"definitely-not-a-real-program-xyz\"\n",
    )
    .expect("config");

    let output = run(&mut launcher(&app, &[]));
    assert_eq!(output.status.code(), Some(exit_codes::SPAWN_FAILED));
}

#[test]
fn context_line_reports_conda_environment() {
    let app = TempApp::new().expect("app");
    app.write_config(&sh_steps("true", "true")).expect("config");

    let output = run(launcher(&app, &[]).env("CONDA_DEFAULT_ENV", "translator"));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Conda environment: translator"));

    let output = run(&mut launcher(&app, &[]));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Warning: no conda environment is active"));
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    // Reported once on stdout; the default log level stays quiet about it.
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("no runtime context detected"));
}

#[test]
fn default_plan_invokes_pip_then_streamlit() {
    let app = TempApp::new().expect("app");
    let fake_python = app.path().join("fake-python");
    write_script(
        &fake_python,
        r#"if [ "$1" = "--version" ]; then echo "Python 3.11.4"; exit 0; fi
echo "$*" >> trace.log"#,
    )
    .expect("fake python");
    app.write_config(&format!("python = \"{}\"\n", fake_python.display()))
        .expect("config");

    let output = run(&mut launcher(&app, &[]));

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(
        read_trace(&app),
        "-m pip install -r requirements.txt\n-m streamlit run app.py\n"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Python version: Python 3.11.4"));
    assert!(stdout.contains("Dependencies installed successfully"));
}

#[test]
fn skip_install_flag_runs_only_launch() {
    let app = TempApp::new().expect("app");
    let fake_python = app.path().join("fake-python");
    write_script(&fake_python, r#"echo "$*" >> trace.log"#).expect("fake python");
    let python = fake_python.to_string_lossy().into_owned();

    let output = run(&mut launcher(
        &app,
        &["--python", python.as_str(), "--skip-install"],
    ));

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let trace = read_trace(&app);
    assert!(!trace.contains("pip"));
    assert!(trace.ends_with("-m streamlit run app.py\n"));
}

#[test]
fn skip_install_flag_drops_custom_install_step() {
    let app = TempApp::new().expect("app");
    app.write_config(&sh_steps(
        "echo install >> trace.log",
        "echo launch >> trace.log",
    ))
    .expect("config");

    let output = run(&mut launcher(&app, &["--skip-install"]));

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(read_trace(&app), "launch\n");
}

#[test]
fn python_flag_with_custom_steps_exits_invalid() {
    let app = TempApp::new().expect("app");
    app.write_config(&sh_steps(
        "echo install >> trace.log",
        "echo launch >> trace.log",
    ))
    .expect("config");

    let output = run(&mut launcher(&app, &["--python", "/nonexistent/python"]));

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert_eq!(read_trace(&app), "");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--python cannot be combined with [[steps]]"));
}

#[test]
fn invalid_config_exits_invalid() {
    let app = TempApp::new().expect("app");
    app.write_config("python = [\n").expect("config");

    let output = run(&mut launcher(&app, &[]));
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("parse"));
}

#[test]
fn missing_base_dir_exits_invalid() {
    let app = TempApp::new().expect("app");
    let output = run(Command::new(env!("CARGO_BIN_EXE_launcher"))
        .arg("--dir")
        .arg(app.path().join("does-not-exist")));
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
}

#[test]
fn plan_json_describes_steps_without_running_them() {
    let app = TempApp::new().expect("app");

    let output = run(&mut launcher(&app, &["plan", "--json"]));

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let view: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(view["steps"][0]["name"], "install");
    assert_eq!(view["steps"][1]["argv"][4], "app.py");
    assert_eq!(view["files"][0]["exists"], true);
    assert_eq!(view["config_found"], false);
    assert_eq!(read_trace(&app), "");
}

#[test]
fn init_writes_config_once() {
    let app = TempApp::new().expect("app");

    let output = run(&mut launcher(&app, &["init"]));
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(app.path().join("launcher.toml").exists());

    let output = run(&mut launcher(&app, &["init"]));
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));

    let output = run(&mut launcher(&app, &["init", "--force"]));
    assert_eq!(output.status.code(), Some(exit_codes::OK));
}
