//! Stable exit codes for the launcher binary.
//!
//! When a step ran, the launcher exits with that step's own status, so these
//! only cover the cases where the launcher has to pick a code itself.

/// Every executed step succeeded (or nothing needed to run).
pub const OK: i32 = 0;
/// Invalid config, unusable base directory, or another launcher-side error.
pub const INVALID: i32 = 1;
/// A step exceeded its configured timeout and was killed.
pub const TIMED_OUT: i32 = 124;
/// A step's program could not be spawned (missing binary, permissions).
pub const SPAWN_FAILED: i32 = 127;
/// Added to the signal number when a step was terminated by a signal.
pub const SIGNAL_BASE: i32 = 128;
