// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for configuration files and external
//! programs that the gate needs to interact with.

use std::{
    env,
    path::{Path, PathBuf},
};

/// File name of repository-local gate configuration.
pub const REPO_CONFIG_FILE: &str = ".commit-gate.toml";

/// Determine absolute path to user-level gate configuration file.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/commit-gate/config.toml`.
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if configuration directory cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn user_config_file() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("commit-gate").join("config.toml"))
        .ok_or(NoWayHome)
}

/// Determine path to repository-local gate configuration file.
pub fn repo_config_file(workdir: impl AsRef<Path>) -> PathBuf {
    workdir.as_ref().join(REPO_CONFIG_FILE)
}

/// Locate configuration file to load.
///
/// First existing file wins: repository-local file, then user-level file.
/// Returns [`None`] if neither exists, meaning built-in defaults apply.
pub fn locate_config(workdir: impl AsRef<Path>) -> Option<PathBuf> {
    let local = repo_config_file(workdir);
    if local.is_file() {
        return Some(local);
    }

    user_config_file().ok().filter(|path| path.is_file())
}

/// Resolve program name to executable path.
///
/// Names containing a path separator are checked as-is. Bare names are
/// searched for in each directory of `$PATH`. Returns [`None`] if the program
/// is not installed.
pub fn find_program(program: impl AsRef<Path>) -> Option<PathBuf> {
    let program = program.as_ref();
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }

    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(windows)]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

/// No way to determine user's configuration directory.
///
/// # See Also
///
/// - [`dirs::config_dir`](https://docs.rs/dirs/latest/dirs/fn.config_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's configuration directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
