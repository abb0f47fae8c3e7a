// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Hook installation.
//!
//! Git runs whatever executable sits at `pre-commit` in its hooks directory.
//! Installation writes a small shell shim there that hands control to
//! `commit-gate run`. The hooks directory is either the one Git already uses,
//! i.e., `core.hooksPath` or `$GIT_DIR/hooks`, or a tracked directory inside
//! the work tree that `core.hooksPath` is then pointed at. The latter lets a
//! repository ship its hook alongside its content.

use crate::repo::{RepoError, RepoHandle};

use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, instrument};

/// Comment line that marks a hook as written by us.
const SHIM_MARKER: &str = "# installed by commit-gate";

/// Installation settings.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    /// Directory to install into and point `core.hooksPath` at.
    pub hooks_path: Option<PathBuf>,

    /// Overwrite an existing hook that we did not write.
    pub force: bool,
}

/// Render hook shim for target program.
pub fn shim(program: &str) -> String {
    format!("#!/bin/sh\n{SHIM_MARKER}\nexec {program} run\n")
}

/// Install pre-commit hook shim.
///
/// Returns path of the written hook.
///
/// # Errors
///
/// - Return [`InstallError::HookExists`] if a foreign hook is in the way and
///   `force` is not set.
/// - Return [`InstallError::Io`] if hook cannot be written.
/// - Return [`InstallError::Repo`] if repository config cannot be updated.
#[instrument(skip(repo), level = "debug")]
pub fn install(repo: &RepoHandle, program: &str, options: &InstallOptions) -> Result<PathBuf> {
    let hooks_dir = match &options.hooks_path {
        Some(path) if path.is_absolute() => path.clone(),
        Some(path) => repo.resolve(path),
        None => repo.hooks_dir(),
    };

    mkdirp::mkdirp(&hooks_dir).map_err(|source| InstallError::Io {
        source,
        path: hooks_dir.clone(),
    })?;

    let hook = hooks_dir.join("pre-commit");
    if hook.exists() && !options.force && !is_ours(&hook) {
        return Err(InstallError::HookExists(hook));
    }

    fs::write(&hook, shim(program)).map_err(|source| InstallError::Io {
        source,
        path: hook.clone(),
    })?;
    make_executable(&hook)?;
    info!("installed pre-commit hook at {:?}", hook.display());

    if let Some(path) = &options.hooks_path {
        let value = path.to_string_lossy();
        repo.set_config("core.hooksPath", value.as_ref())?;
        info!("set core.hooksPath = {value}");
    }

    Ok(hook)
}

fn is_ours(hook: &Path) -> bool {
    fs::read_to_string(hook)
        .map(|content| content.lines().any(|line| line == SHIM_MARKER))
        .unwrap_or(false)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(|source| {
        InstallError::Io {
            source,
            path: path.to_path_buf(),
        }
    })
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Hook installation error types.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// A hook we did not write already exists.
    #[error("hook {:?} already exists, use --force to replace it", .0.display())]
    HookExists(PathBuf),

    /// Hook file or directory cannot be written.
    #[error("failed to write {:?}", path.display())]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Repository access fails.
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Friendly result alias :3
pub type Result<T, E = InstallError> = std::result::Result<T, E>;
