// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Per-file content policy checks.
//!
//! Each check is a predicate over a single staged file, evaluated against the
//! work tree through a [`RepoHandle`]. A check either passes, or fails with a
//! [`CheckError`] that names the offending file. Checks never mutate
//! anything; rewriting is the business of [`crate::gate`].

use crate::{
    config::{ParitySettings, ScriptSettings},
    front_matter::{Document, FrontMatterError},
    repo::{RepoError, RepoHandle},
    staged::{minified_sibling, unminified_source, FileKind, StagedFile},
    tools::{Capability, Minifier, ToolError},
};

use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Fail if file content contains the forbidden marker.
///
/// An empty marker disables the check.
///
/// # Errors
///
/// - Return [`CheckError::ForbiddenMarker`] if marker is found.
/// - Return [`CheckError::Repo`] if file cannot be read.
pub fn forbidden_marker(repo: &RepoHandle, file: &StagedFile, marker: &str) -> Result<()> {
    if marker.is_empty() {
        return Ok(());
    }

    let content = repo.read(file.path())?;
    if contains(&content, marker.as_bytes()) {
        return Err(CheckError::ForbiddenMarker {
            path: file.path().to_path_buf(),
            marker: marker.to_string(),
        });
    }

    Ok(())
}

/// Fail if a non-minified script has no minified sibling on disk.
///
/// # Errors
///
/// - Return [`CheckError::MissingMinified`] if sibling is absent.
pub fn script_pairing(repo: &RepoHandle, file: &StagedFile, scripts: &ScriptSettings) -> Result<()> {
    if file.kind() != FileKind::Script {
        return Ok(());
    }

    let expected = minified_sibling(file.path(), scripts);
    if !repo.is_file(&expected) {
        return Err(CheckError::MissingMinified {
            path: file.path().to_path_buf(),
            expected,
        });
    }

    Ok(())
}

/// Fail if a minified script is larger than what available minifiers produce.
///
/// Minifies the non-minified sibling when it exists, or the minified file
/// itself otherwise, with every available minifier. The committed file must
/// not be larger than the smallest result. Passes when no minifier is
/// installed.
///
/// # Errors
///
/// - Return [`CheckError::UnderOptimized`] if a minifier does better.
/// - Return [`CheckError::Tool`] if a minifier fails to run.
/// - Return [`CheckError::Repo`] if file cannot be read.
pub fn minification_quality(
    repo: &RepoHandle,
    file: &StagedFile,
    scripts: &ScriptSettings,
    minifiers: &[Capability<Box<dyn Minifier>>],
) -> Result<()> {
    if file.kind() != FileKind::MinifiedScript {
        return Ok(());
    }

    let available = minifiers
        .iter()
        .filter_map(|minifier| match minifier {
            Capability::Available(minifier) => Some(&**minifier),
            Capability::Unavailable { .. } => None,
        })
        .collect::<Vec<_>>();
    if available.is_empty() {
        info!("no minifier installed, skip minification check of {file}");
        return Ok(());
    }

    let source = unminified_source(file.path(), scripts)
        .filter(|source| repo.is_file(source))
        .unwrap_or_else(|| file.path().to_path_buf());
    let committed = repo.read(file.path())?.len();

    let mut best: Option<(&str, usize)> = None;
    for minifier in available {
        let size = minifier.minify(&repo.resolve(&source))?.len();
        debug!("{} minifies {:?} to {size} bytes", minifier.name(), source.display());
        if best.is_none_or(|(_, smallest)| size < smallest) {
            best = Some((minifier.name(), size));
        }
    }

    match best {
        Some((tool, size)) if committed > size => Err(CheckError::UnderOptimized {
            path: file.path().to_path_buf(),
            tool: tool.to_string(),
            committed,
            best: size,
        }),
        _ => Ok(()),
    }
}

/// Fail if paired configuration files disagree on section length.
///
/// Only runs when the staged file is one of the paired top-level files.
/// Counts lines from the section marker to end of file in every paired file
/// that exists on disk.
///
/// # Errors
///
/// - Return [`CheckError::MissingSection`] if a file lacks the marker.
/// - Return [`CheckError::SectionMismatch`] if line counts differ.
/// - Return [`CheckError::Repo`] if a file cannot be read.
pub fn config_parity(repo: &RepoHandle, file: &StagedFile, parity: &ParitySettings) -> Result<()> {
    let is_paired = file.is_top_level()
        && parity
            .files
            .iter()
            .any(|paired| Path::new(paired) == file.path());
    if !is_paired {
        return Ok(());
    }

    let mut lengths = Vec::new();
    for paired in &parity.files {
        if !repo.is_file(paired) {
            debug!("paired config {paired:?} does not exist, leave it out");
            continue;
        }

        let text = read_text(repo, Path::new(paired))?;
        let length =
            section_length(&text, &parity.section).ok_or_else(|| CheckError::MissingSection {
                path: PathBuf::from(paired),
                section: parity.section.clone(),
            })?;
        lengths.push((PathBuf::from(paired), length));
    }

    if let Some(((left, left_lines), rest)) = lengths.split_first() {
        if let Some((right, right_lines)) = rest.iter().find(|(_, lines)| lines != left_lines) {
            return Err(CheckError::SectionMismatch {
                section: parity.section.clone(),
                left: left.clone(),
                left_lines: *left_lines,
                right: right.clone(),
                right_lines: *right_lines,
            });
        }
    }

    Ok(())
}

/// Fail if markdown file is flagged as a draft.
///
/// # Errors
///
/// - Return [`CheckError::DraftCommitted`] if front matter sets `draft`.
/// - Return [`CheckError::FrontMatter`] if front matter is malformed.
pub fn draft(repo: &RepoHandle, file: &StagedFile, delimiter: &str) -> Result<()> {
    let document = read_document(repo, file.path(), delimiter)?;
    if document.front_matter().is_some_and(|fm| fm.is_draft()) {
        return Err(CheckError::DraftCommitted {
            path: file.path().to_path_buf(),
        });
    }

    Ok(())
}

/// Read work tree file as UTF-8 text.
///
/// # Errors
///
/// - Return [`CheckError::Encoding`] if file is not valid UTF-8.
/// - Return [`CheckError::Repo`] if file cannot be read.
pub fn read_text(repo: &RepoHandle, path: &Path) -> Result<String> {
    String::from_utf8(repo.read(path)?).map_err(|_| CheckError::Encoding {
        path: path.to_path_buf(),
    })
}

/// Read and parse markdown document from work tree.
///
/// # Errors
///
/// - Return [`CheckError::FrontMatter`] if front matter is malformed.
/// - Return [`CheckError::Encoding`] if file is not valid UTF-8.
/// - Return [`CheckError::Repo`] if file cannot be read.
pub fn read_document(repo: &RepoHandle, path: &Path, delimiter: &str) -> Result<Document> {
    let text = read_text(repo, path)?;
    Document::parse(&text, delimiter).map_err(|source| CheckError::FrontMatter {
        source,
        path: path.to_path_buf(),
    })
}

/// Count lines from section marker line to end of text, marker included.
pub fn section_length(text: &str, section: &str) -> Option<usize> {
    let lines = text.lines().collect::<Vec<_>>();
    let start = lines.iter().position(|line| line.trim_end() == section)?;
    Some(lines.len() - start)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Content policy error types.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// File contains the placeholder marker.
    #[error("{:?} contains {marker:?}, resolve it before committing", path.display())]
    ForbiddenMarker { path: PathBuf, marker: String },

    /// Markdown file is flagged as draft.
    #[error("{:?} is marked as draft, drafts must not be committed", path.display())]
    DraftCommitted { path: PathBuf },

    /// Script has no minified sibling.
    #[error("{:?} has no minified version, expected {:?}", path.display(), expected.display())]
    MissingMinified { path: PathBuf, expected: PathBuf },

    /// Minified script is larger than a minifier can make it.
    #[error(
        "{:?} is {committed} bytes, but {tool} minifies it to {best} bytes",
        path.display()
    )]
    UnderOptimized {
        path: PathBuf,
        tool: String,
        committed: usize,
        best: usize,
    },

    /// Paired configuration sections differ in length.
    #[error(
        "{section} section spans {left_lines} lines in {:?} but {right_lines} lines in {:?}",
        left.display(),
        right.display()
    )]
    SectionMismatch {
        section: String,
        left: PathBuf,
        left_lines: usize,
        right: PathBuf,
        right_lines: usize,
    },

    /// Paired configuration file lacks the section marker.
    #[error("{:?} has no {section} section", path.display())]
    MissingSection { path: PathBuf, section: String },

    /// Image compression failed.
    #[error("failed to compress {:?}", path.display())]
    Compression {
        #[source]
        source: ToolError,
        path: PathBuf,
    },

    /// Front matter cannot be parsed.
    #[error("invalid front matter in {:?}", path.display())]
    FrontMatter {
        #[source]
        source: FrontMatterError,
        path: PathBuf,
    },

    /// Text file is not valid UTF-8.
    #[error("{:?} is not valid UTF-8", path.display())]
    Encoding { path: PathBuf },

    /// External tool fails.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Work tree or index access fails.
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Friendly result alias :3
pub type Result<T, E = CheckError> = std::result::Result<T, E>;
