//! Declarative application launcher.
//!
//! Prepares an application's environment and hands the terminal over to it:
//! resolve a base directory, report the active runtime context, install
//! dependencies, then start the application. The steps are described as an
//! ordered [`core::plan::LaunchPlan`] with an explicit failure policy per step.
//!
//! - **[`core`]**: Pure logic (plan construction, context reporting, exit
//!   status mapping). No I/O.
//! - **[`io`]**: Side-effecting operations (config files, base directory
//!   resolution, child processes). Isolated behind traits for tests.
//!
//! Orchestration modules ([`launch`], [`plan`], [`init`]) coordinate core logic
//! with I/O to implement CLI commands.

pub mod core;
pub mod exit_codes;
pub mod init;
pub mod io;
pub mod launch;
pub mod logging;
pub mod plan;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
