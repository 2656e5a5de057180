//! I/O helpers for launcher commands.

pub mod config;
pub mod interpreter;
pub mod process;
pub mod workdir;
