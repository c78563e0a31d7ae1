//! Command implementations for the `obs-copilot` binary.
//!
//! `scan`, `plan`, `apply` and `toggle-spec` expose one pipeline stage each;
//! `submit` runs the whole pipeline against a GitHub repository and opens a
//! pull request.

/// Helpers shared by several commands.
pub mod common;

/// Apply a plan JSON file to a working tree.
pub mod apply;

/// Generate a plan, optionally narrowed by a prior scan.
pub mod plan;

/// Scan a remote repository or a local working tree.
pub mod scan;

/// Clone, instrument, push and open a pull request.
pub mod submit;

/// Render the per-environment toggle spec.
pub mod toggle;
