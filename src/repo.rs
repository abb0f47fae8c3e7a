// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Repository handle.
//!
//! The gate reads and mutates two pieces of shared state: the work tree and
//! the index of the repository being committed to. Both are reached through a
//! single [`RepoHandle`] that every check receives explicitly.
//!
//! # Hook Environment
//!
//! Git exports `GIT_DIR` and `GIT_INDEX_FILE` while running hooks. The latter
//! matters for `git commit <paths>` and `git commit -a`, where Git commits from
//! a temporary index rather than the regular one. Use
//! [`RepoHandle::from_env`] inside the hook so libgit2 honors both.

use crate::{
    config::ScriptSettings,
    diff::LineChanges,
    staged::{ChangeKind, StagedFile},
};

use chrono::{DateTime, Local, NaiveDate};
use git2::{Delta, DiffOptions, ErrorCode, Index, Repository, Tree};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// Handle to the work tree and index of a repository.
pub struct RepoHandle {
    repository: Repository,
    workdir: PathBuf,
}

impl RepoHandle {
    /// Open repository from hook environment.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::Git2`] if libgit2 cannot find a repository.
    /// - Return [`RepoError::Bare`] if repository has no work tree.
    pub fn from_env() -> Result<Self> {
        Self::new(Repository::open_from_env()?)
    }

    /// Open repository containing target path.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::Git2`] if libgit2 cannot find a repository.
    /// - Return [`RepoError::Bare`] if repository has no work tree.
    pub fn discover(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(Repository::discover(path.as_ref())?)
    }

    fn new(repository: Repository) -> Result<Self> {
        let workdir = repository
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| RepoError::Bare(repository.path().to_path_buf()))?;

        Ok(Self {
            repository,
            workdir,
        })
    }

    /// Absolute path to work tree.
    pub fn workdir(&self) -> &Path {
        self.workdir.as_path()
    }

    /// Absolute path to the git directory.
    pub fn gitdir(&self) -> &Path {
        self.repository.path()
    }

    /// Resolve work tree relative path to absolute path.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.workdir.join(path)
    }

    fn head_tree(&self) -> Option<Tree<'_>> {
        self.repository
            .head()
            .ok()
            .and_then(|head| head.peel_to_tree().ok())
    }

    // INVARIANT: Pick up index changes made on disk by other processes.
    fn index(&self) -> Result<Index> {
        let mut index = self.repository.index()?;
        index.read(false)?;
        Ok(index)
    }

    /// List files recorded by the pending commit.
    ///
    /// Compares HEAD tree to index. Deleted paths are skipped. An unborn HEAD
    /// makes every index entry an added file.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::Git2`] if libgit2 operations fail.
    #[instrument(skip(self, scripts), level = "debug")]
    pub fn staged_files(&self, scripts: &ScriptSettings) -> Result<Vec<StagedFile>> {
        let head = self.head_tree();
        let index = self.index()?;
        let diff = self
            .repository
            .diff_tree_to_index(head.as_ref(), Some(&index), None)?;

        let mut staged = Vec::new();
        for delta in diff.deltas() {
            let change = match delta.status() {
                Delta::Added | Delta::Copied | Delta::Renamed => ChangeKind::Added,
                Delta::Modified | Delta::Typechange => ChangeKind::Modified,
                _ => continue,
            };

            if let Some(path) = delta.new_file().path() {
                debug!("staged {:?} as {change:?}", path.display());
                staged.push(StagedFile::new(path, change, scripts));
            }
        }

        Ok(staged)
    }

    /// Content of path as recorded in HEAD.
    ///
    /// Returns [`None`] if HEAD is unborn or does not track the path.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::Git2`] if libgit2 operations fail.
    pub fn head_content(&self, path: impl AsRef<Path>) -> Result<Option<Vec<u8>>> {
        let Some(tree) = self.head_tree() else {
            return Ok(None);
        };

        let entry = match tree.get_path(path.as_ref()) {
            Ok(entry) => entry,
            Err(error) if error.code() == ErrorCode::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        let blob = entry.to_object(&self.repository)?.peel_to_blob()?;

        Ok(Some(blob.content().to_vec()))
    }

    /// Content of path as recorded in the index.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::Git2`] if libgit2 operations fail.
    pub fn staged_content(&self, path: impl AsRef<Path>) -> Result<Option<Vec<u8>>> {
        let index = self.index()?;
        let Some(entry) = index.get_path(path.as_ref(), 0) else {
            return Ok(None);
        };
        let blob = self.repository.find_blob(entry.id)?;

        Ok(Some(blob.content().to_vec()))
    }

    /// Line changes between HEAD and index for a single path.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::Git2`] if libgit2 operations fail.
    pub fn line_changes(&self, path: impl AsRef<Path>) -> Result<LineChanges> {
        let head = self.head_tree();
        let index = self.index()?;
        let mut opts = DiffOptions::new();
        opts.pathspec(path.as_ref())
            .disable_pathspec_match(true)
            .context_lines(0);
        let diff = self
            .repository
            .diff_tree_to_index(head.as_ref(), Some(&index), Some(&mut opts))?;

        let mut changes = LineChanges::default();
        diff.foreach(
            &mut |_delta, _progress| true,
            None,
            None,
            Some(&mut |_delta, _hunk, line| {
                match line.origin() {
                    '+' => changes.added.extend(line.new_lineno()),
                    '-' => changes.removed.extend(line.old_lineno()),
                    _ => {}
                }
                true
            }),
        )?;

        Ok(changes)
    }

    /// Read file from work tree.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::Io`] if file cannot be read.
    pub fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>> {
        let full_path = self.resolve(path.as_ref());
        fs::read(&full_path).map_err(|source| RepoError::Io {
            source,
            path: full_path,
        })
    }

    /// Replace file content in work tree.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::Io`] if file cannot be written.
    pub fn write(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<()> {
        let full_path = self.resolve(path.as_ref());
        fs::write(&full_path, contents).map_err(|source| RepoError::Io {
            source,
            path: full_path,
        })
    }

    /// Check if work tree path exists as a regular file.
    pub fn is_file(&self, path: impl AsRef<Path>) -> bool {
        self.resolve(path).is_file()
    }

    /// Last-modified date of work tree file in local time.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::Io`] if file metadata cannot be read.
    pub fn modified_date(&self, path: impl AsRef<Path>) -> Result<NaiveDate> {
        let full_path = self.resolve(path.as_ref());
        let modified = fs::metadata(&full_path)
            .and_then(|metadata| metadata.modified())
            .map_err(|source| RepoError::Io {
                source,
                path: full_path,
            })?;

        Ok(DateTime::<Local>::from(modified).date_naive())
    }

    /// Add work tree paths to index and write index to disk.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::Git2`] if libgit2 operations fail.
    #[instrument(skip(self, paths), level = "debug")]
    pub fn stage(&self, paths: impl IntoIterator<Item = impl AsRef<Path>>) -> Result<()> {
        let mut index = self.index()?;
        for path in paths {
            debug!("stage {:?}", path.as_ref().display());
            index.add_path(path.as_ref())?;
        }
        index.write()?;

        Ok(())
    }

    /// Directory Git looks up hooks in.
    ///
    /// Honors `core.hooksPath`, resolving relative values against the work
    /// tree. Falls back to `$GIT_DIR/hooks`.
    pub fn hooks_dir(&self) -> PathBuf {
        let configured = self
            .repository
            .config()
            .and_then(|config| config.get_path("core.hooksPath"));

        match configured {
            Ok(path) if path.is_absolute() => path,
            Ok(path) => self.workdir.join(path),
            Err(_) => self.repository.path().join("hooks"),
        }
    }

    /// Set string entry in repository-local configuration.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::Git2`] if libgit2 operations fail.
    pub fn set_config(&self, key: &str, value: &str) -> Result<()> {
        let mut config = self.repository.config()?.open_level(git2::ConfigLevel::Local)?;
        config.set_str(key, value)?;

        Ok(())
    }
}

impl std::fmt::Debug for RepoHandle {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("RepoHandle")
            .field("gitdir", &self.repository.path())
            .field("workdir", &self.workdir)
            .finish()
    }
}

/// Repository access error types.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Repository has no work tree to check.
    #[error("repository at {:?} is bare", .0.display())]
    Bare(PathBuf),

    /// Work tree file cannot be accessed.
    #[error("failed to access {:?}", path.display())]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),
}

/// Friendly result alias :3
pub type Result<T, E = RepoError> = std::result::Result<T, E>;
