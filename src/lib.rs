// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Pre-commit gate for static site theme repositories.
//!
//! The gate runs as a Git pre-commit hook. It refuses commits that carry
//! drafts, placeholder markers, unminified or under-minified scripts, or
//! drifting paired configuration files. It also keeps repository hygiene
//! automatic: PNG images get compressed, the `updated` front matter field of
//! edited content tracks its last-modified date, and derived artifacts such
//! as social cards and font subsets get regenerated and staged.
//!
//! # See Also
//!
//! 1. [`gate`] for pass order and failure semantics.
//! 2. [`front_matter`] for the front matter record.
//! 3. [`tools`] for external tool capabilities.

pub mod checks;
pub mod config;
pub mod diff;
pub mod front_matter;
pub mod gate;
pub mod install;
pub mod path;
pub mod repo;
pub mod staged;
pub mod tools;

pub use config::GateConfig;
pub use gate::{Gate, GateError, GateReport};
pub use repo::RepoHandle;
pub use tools::{Capability, Toolbox};
