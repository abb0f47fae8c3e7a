// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Staged file representation.
//!
//! A __staged file__ is any file that will be recorded by the pending commit.
//! Deleted paths are never enumerated, because there is nothing left on disk
//! to check. Each staged file is classified once by its name so that the gate
//! can decide which predicates apply to it.

use crate::config::ScriptSettings;

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};

/// How a staged file differs from HEAD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Path does not exist in HEAD, or HEAD is unborn.
    Added,

    /// Path exists in HEAD with different content.
    Modified,
}

/// File-type classification derived from file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Markdown,
    Png,
    Script,
    MinifiedScript,
    Config,
    Other,
}

impl FileKind {
    /// Classify path by its file name.
    pub fn classify(path: impl AsRef<Path>, scripts: &ScriptSettings) -> Self {
        let path = path.as_ref();
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy().to_ascii_lowercase(),
            None => return Self::Other,
        };
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        if extension == scripts.extension.to_ascii_lowercase() {
            if name.ends_with(minified_tail(scripts).as_str()) {
                return Self::MinifiedScript;
            }
            return Self::Script;
        }

        match extension.as_str() {
            "md" => Self::Markdown,
            "png" => Self::Png,
            "toml" => Self::Config,
            _ => Self::Other,
        }
    }
}

/// A file recorded by the pending commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    path: PathBuf,
    change: ChangeKind,
    kind: FileKind,
}

impl StagedFile {
    /// Construct new staged file entry.
    pub fn new(path: impl Into<PathBuf>, change: ChangeKind, scripts: &ScriptSettings) -> Self {
        let path = path.into();
        let kind = FileKind::classify(&path, scripts);
        Self { path, change, kind }
    }

    /// Path relative to the work tree.
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn is_added(&self) -> bool {
        self.change == ChangeKind::Added
    }

    /// Check if file sits at the top-level of the work tree.
    pub fn is_top_level(&self) -> bool {
        self.path.components().count() == 1
    }
}

impl Display for StagedFile {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.path.to_string_lossy().as_ref())
    }
}

/// Determine path of minified sibling for a non-minified script.
///
/// Inserts the minified suffix before the extension, e.g., `js/main.js`
/// becomes `js/main.min.js`.
pub fn minified_sibling(script: impl AsRef<Path>, scripts: &ScriptSettings) -> PathBuf {
    let script = script.as_ref();
    let stem = script
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    script.with_file_name(format!(
        "{stem}.{}.{}",
        scripts.minified_suffix, scripts.extension
    ))
}

/// Determine path of non-minified source for a minified script.
///
/// Returns [`None`] if path does not carry the minified suffix.
pub fn unminified_source(minified: impl AsRef<Path>, scripts: &ScriptSettings) -> Option<PathBuf> {
    let minified = minified.as_ref();
    let name = minified.file_name()?.to_string_lossy();
    let tail = minified_tail(scripts);
    if !name.to_ascii_lowercase().ends_with(tail.as_str()) {
        return None;
    }

    // Keep the extension as spelled in the minified name.
    let base = &name[..name.len() - tail.len()];
    let extension = &name[name.len() - scripts.extension.len()..];
    Some(minified.with_file_name(format!("{base}.{extension}")))
}

/// Lowercase `.min.js` style tail of minified script names.
fn minified_tail(scripts: &ScriptSettings) -> String {
    format!(".{}.{}", scripts.minified_suffix, scripts.extension).to_ascii_lowercase()
}
