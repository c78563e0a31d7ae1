//! Pull request submission for generated instrumentation.
//!
//! Git transport (branch, commit, push) lives on [`crate::repo::Checkout`];
//! this module only talks to the forge API and names things.

/// Remote repository parsing and token resolution.
pub mod config;

/// GitHub implementation backed by Octocrab.
pub mod github;

/// Branch names, commit messages and PR bodies.
pub mod pr;

/// Forge abstraction.
pub mod traits;

/// Request and response types shared by forge implementations.
pub mod types;
