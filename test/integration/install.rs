// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::RepoFixture;

use anyhow::Result;
use commit_gate::{
    install::{install, shim, InstallError, InstallOptions},
    RepoHandle,
};
use git2::Repository;
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use std::{env, fs, path::PathBuf};

#[sealed_test]
fn install_writes_shim_into_git_hooks() -> Result<()> {
    let fixture = RepoFixture::new(env::current_dir()?.join("site"))?;
    let repo = RepoHandle::discover(fixture.root())?;

    let hook = install(&repo, "commit-gate", &InstallOptions::default())?;

    assert_eq!(hook, repo.gitdir().join("hooks").join("pre-commit"));
    assert_eq!(fs::read_to_string(&hook)?, shim("commit-gate"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&hook)?.permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    Ok(())
}

#[sealed_test]
fn install_refuses_foreign_hook() -> Result<()> {
    let fixture = RepoFixture::new(env::current_dir()?.join("site"))?;
    let repo = RepoHandle::discover(fixture.root())?;
    let hooks = repo.gitdir().join("hooks");
    fs::create_dir_all(&hooks)?;
    fs::write(hooks.join("pre-commit"), "#!/bin/sh\nexit 0\n")?;

    let result = install(&repo, "commit-gate", &InstallOptions::default());
    assert!(matches!(result, Err(InstallError::HookExists(_))));
    assert_eq!(
        fs::read_to_string(hooks.join("pre-commit"))?,
        "#!/bin/sh\nexit 0\n"
    );

    let options = InstallOptions {
        force: true,
        ..Default::default()
    };
    let hook = install(&repo, "commit-gate", &options)?;
    assert_eq!(fs::read_to_string(hook)?, shim("commit-gate"));

    Ok(())
}

#[sealed_test]
fn reinstall_replaces_own_hook() -> Result<()> {
    let fixture = RepoFixture::new(env::current_dir()?.join("site"))?;
    let repo = RepoHandle::discover(fixture.root())?;

    install(&repo, "old-gate", &InstallOptions::default())?;
    let hook = install(&repo, "commit-gate", &InstallOptions::default())?;

    assert_eq!(fs::read_to_string(hook)?, shim("commit-gate"));

    Ok(())
}

#[sealed_test]
fn install_into_tracked_hooks_path() -> Result<()> {
    let fixture = RepoFixture::new(env::current_dir()?.join("site"))?;
    let repo = RepoHandle::discover(fixture.root())?;

    let options = InstallOptions {
        hooks_path: Some(PathBuf::from(".githooks")),
        force: false,
    };
    let hook = install(&repo, "commit-gate", &options)?;

    assert_eq!(hook, fixture.root().join(".githooks").join("pre-commit"));
    assert!(hook.is_file());

    let config = Repository::open(fixture.root())?.config()?.snapshot()?;
    assert_eq!(config.get_str("core.hooksPath")?, ".githooks");

    // Freshly configured hooks path is picked up by later lookups.
    let repo = RepoHandle::discover(fixture.root())?;
    assert_eq!(repo.hooks_dir(), fixture.root().join(".githooks"));

    Ok(())
}
