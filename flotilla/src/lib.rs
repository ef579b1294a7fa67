//! Multi-project build/CI orchestrator.
//!
//! Discovers every buildable project under a repository root, folds presets
//! and per-project overrides into an effective configuration, then runs a
//! configurable set of verification runners (type checker, tests, formatter,
//! packaging self-checks, custom linters) against each project as opaque
//! subprocesses. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (configuration merging, runner
//!   registry, outcome classification, project graph). No I/O, fully testable
//!   in isolation.
//! - **[`io`]**: Side-effecting operations (repository discovery, subprocess
//!   execution, report writing). Isolated to enable fakes in tests.
//!
//! Orchestration modules ([`ci`], [`engine`], [`aggregate`], [`locate`])
//! coordinate core logic with I/O to implement CLI commands.

pub mod aggregate;
pub mod ci;
pub mod context;
pub mod core;
pub mod engine;
pub mod errors;
pub mod exit_codes;
pub mod io;
pub mod locate;
pub mod logging;
pub mod summary;
