//! Stable exit codes for flotilla CLI commands.

/// Every selected (project, runner) pair succeeded or was intentionally skipped.
pub const OK: i32 = 0;
/// At least one pair ended in `check-failed` or `error`.
pub const FAILED: i32 = 1;
/// Fatal problem before or after execution: discovery, configuration, or
/// report-write failure.
pub const INVALID: i32 = 2;
