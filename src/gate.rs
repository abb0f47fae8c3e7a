// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Commit gate.
//!
//! The __commit gate__ runs once per commit attempt over the set of staged
//! files. It applies content policy checks, compresses images, keeps the
//! `updated` front matter field of markdown files current, and generates
//! derived artifacts. Any failure aborts the whole commit.
//!
//! # Pass Order
//!
//! 1. Per-file checks on every staged file that is not exempt: PNG
//!    compression, forbidden marker, script pairing, minification quality,
//!    and paired config parity.
//! 2. Markdown pass on every staged markdown file that is not exempt and not
//!    an index page: draft check, then `updated` maintenance for modified
//!    files whose body changed.
//! 3. Social card generation for new or body-changed markdown files.
//! 4. Font subsetting if the site configuration file was staged.
//!
//! # Atomicity
//!
//! Every file the gate rewrites, or hands to a generator that may rewrite
//! it, is recorded in a [`Journal`] before it is touched. Files are only
//! re-staged after every pass succeeded. If anything fails, the journal puts
//! the original bytes back, leaving the work tree and index as they were
//! before the run.

use crate::{
    checks::{self, CheckError},
    config::GateConfig,
    diff::DiffRegion,
    repo::{RepoError, RepoHandle},
    staged::{FileKind, StagedFile},
    tools::{Capability, ToolError, Toolbox},
};

use glob::Pattern;
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Summary of a successful gate run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GateReport {
    /// Number of staged files that went through the checks.
    pub checked: usize,

    /// Files the gate rewrote or generated, and re-staged.
    pub restaged: Vec<PathBuf>,
}

/// Commit gate over a repository.
pub struct Gate<'repo> {
    repo: &'repo RepoHandle,
    config: &'repo GateConfig,
    tools: &'repo Toolbox,
    exempt: Vec<Pattern>,
    index_pattern: Pattern,
}

impl<'repo> Gate<'repo> {
    /// Construct new commit gate.
    ///
    /// # Errors
    ///
    /// - Return [`GateError::Pattern`] if exempt or index patterns are not
    ///   valid globs.
    pub fn new(repo: &'repo RepoHandle, config: &'repo GateConfig, tools: &'repo Toolbox) -> Result<Self> {
        let exempt = config
            .gate
            .exempt
            .iter()
            .map(|pattern| compile(pattern))
            .collect::<Result<Vec<_>>>()?;
        let index_pattern = compile(&config.gate.index_pattern)?;

        Ok(Self {
            repo,
            config,
            tools,
            exempt,
            index_pattern,
        })
    }

    /// Run gate over all staged files.
    ///
    /// # Errors
    ///
    /// - Return [`GateError::Check`] if any content policy check fails.
    /// - Return [`GateError::Tool`] if an external tool fails.
    /// - Return [`GateError::Repo`] if work tree or index access fails.
    #[instrument(skip(self), level = "debug")]
    pub fn run(&self) -> Result<GateReport> {
        self.report_unavailable_tools();
        let staged = self.repo.staged_files(&self.config.scripts)?;
        let mut journal = Journal::new(self.repo);

        let result = self
            .run_passes(&staged, &mut journal)
            .and_then(|restage| {
                self.repo.stage(&restage)?;
                Ok(restage)
            });

        match result {
            Ok(restage) => Ok(GateReport {
                checked: staged.len(),
                restaged: restage.into_iter().collect(),
            }),
            Err(error) => {
                journal.rollback();
                Err(error)
            }
        }
    }

    fn run_passes(&self, staged: &[StagedFile], journal: &mut Journal<'_>) -> Result<BTreeSet<PathBuf>> {
        let mut restage = BTreeSet::new();
        let candidates = staged
            .iter()
            .filter(|file| !self.is_exempt(file))
            .collect::<Vec<_>>();

        for file in &candidates {
            self.check_file(file, journal, &mut restage)?;
        }

        let mut fresh_content = Vec::new();
        for file in candidates
            .iter()
            .filter(|file| file.kind() == FileKind::Markdown && !self.is_index(file))
        {
            if self.check_markdown(file, journal, &mut restage)? {
                fresh_content.push(*file);
            }
        }

        self.generate_cards(&fresh_content, journal, &mut restage)?;
        self.subset_fonts(staged, journal, &mut restage)?;

        Ok(restage)
    }

    /// Apply per-file checks in fixed order.
    fn check_file(
        &self,
        file: &StagedFile,
        journal: &mut Journal<'_>,
        restage: &mut BTreeSet<PathBuf>,
    ) -> Result<()> {
        debug!("check {file}");
        if file.kind() == FileKind::Png && self.compress_png(file, journal)? {
            restage.insert(file.path().to_path_buf());
        }

        checks::forbidden_marker(self.repo, file, &self.config.gate.forbidden_marker)?;
        checks::script_pairing(self.repo, file, &self.config.scripts)?;
        checks::minification_quality(self.repo, file, &self.config.scripts, &self.tools.minifiers)?;
        checks::config_parity(self.repo, file, &self.config.parity)?;

        Ok(())
    }

    /// Compress PNG in place, returning whether it changed.
    ///
    /// Output that ends up larger than the original is discarded.
    fn compress_png(&self, file: &StagedFile, journal: &mut Journal<'_>) -> Result<bool> {
        let Capability::Available(compressor) = &self.tools.compressor else {
            return Ok(false);
        };

        let original = journal.record(file.path())?;
        compressor
            .compress(&self.repo.resolve(file.path()))
            .map_err(|source| CheckError::Compression {
                source,
                path: file.path().to_path_buf(),
            })?;

        let compressed = self.repo.read(file.path())?;
        if compressed.len() > original.len() {
            debug!("{} grew {file}, keep original", compressor.name());
            self.repo.write(file.path(), &original)?;
            return Ok(false);
        }

        if compressed != original {
            info!(
                "compressed {file} with {}: {} -> {} bytes",
                compressor.name(),
                original.len(),
                compressed.len()
            );
        }

        Ok(true)
    }

    /// Run markdown pass, returning whether content is new or its body changed.
    fn check_markdown(
        &self,
        file: &StagedFile,
        journal: &mut Journal<'_>,
        restage: &mut BTreeSet<PathBuf>,
    ) -> Result<bool> {
        let delimiter = &self.config.front_matter.delimiter;
        checks::draft(self.repo, file, delimiter)?;

        if file.is_added() {
            return Ok(true);
        }

        let region = self.diff_region(file.path())?;
        if !region.touches_body() {
            debug!("only front matter of {file} changed, leave updated alone");
            return Ok(false);
        }

        if self.refresh_updated(file, journal)? {
            restage.insert(file.path().to_path_buf());
        }

        Ok(true)
    }

    fn diff_region(&self, path: &Path) -> Result<DiffRegion> {
        let changes = self.repo.line_changes(path)?;
        let old = self.repo.head_content(path)?.unwrap_or_default();
        let new = self.repo.staged_content(path)?.unwrap_or_default();

        Ok(DiffRegion::partition(
            &changes,
            &String::from_utf8_lossy(&old),
            &String::from_utf8_lossy(&new),
            &self.config.front_matter.delimiter,
        ))
    }

    /// Set `updated` to the file's last-modified date, returning whether the
    /// file was rewritten.
    fn refresh_updated(&self, file: &StagedFile, journal: &mut Journal<'_>) -> Result<bool> {
        let mut document =
            checks::read_document(self.repo, file.path(), &self.config.front_matter.delimiter)?;
        let Some(front_matter) = document.front_matter_mut() else {
            debug!("{file} has no front matter");
            return Ok(false);
        };
        let Some(date) = front_matter.date() else {
            debug!("{file} has no date field");
            return Ok(false);
        };

        let modified = self.repo.modified_date(file.path())?;
        if modified == date {
            debug!("{file} was modified on its creation date");
            return Ok(false);
        }

        let changed = front_matter
            .set_updated(modified)
            .map_err(|source| CheckError::FrontMatter {
                source,
                path: file.path().to_path_buf(),
            })?;
        if !changed {
            return Ok(false);
        }

        journal.record(file.path())?;
        self.repo.write(file.path(), document.to_string())?;
        info!("set updated = {modified} in {file}");

        Ok(true)
    }

    fn generate_cards(
        &self,
        files: &[&StagedFile],
        journal: &mut Journal<'_>,
        restage: &mut BTreeSet<PathBuf>,
    ) -> Result<()> {
        let Capability::Available(generator) = &self.tools.card_generator else {
            return Ok(());
        };

        for file in files {
            journal.record(file.path())?;
            let card = generator.generate(self.repo.workdir(), file.path())?;
            info!("generated social card {:?} for {file}", card.display());
            restage.insert(card);
            restage.insert(file.path().to_path_buf());
        }

        Ok(())
    }

    fn subset_fonts(
        &self,
        staged: &[StagedFile],
        journal: &mut Journal<'_>,
        restage: &mut BTreeSet<PathBuf>,
    ) -> Result<()> {
        let site_config = Path::new(&self.config.gate.site_config);
        let touched = staged
            .iter()
            .any(|file| file.is_top_level() && file.path() == site_config);
        if !touched {
            return Ok(());
        }

        match &self.tools.font_subsetter {
            Capability::Available(subsetter) => {
                if self.repo.is_file(subsetter.output()) {
                    journal.record(subsetter.output())?;
                }
                let stylesheet = subsetter.subset(self.repo.workdir())?;
                info!("regenerated font subset {:?}", stylesheet.display());
                restage.insert(stylesheet);
            }
            Capability::Unavailable { tool } => {
                info!("{tool} not installed, skip font subsetting");
            }
        }

        Ok(())
    }

    fn is_exempt(&self, file: &StagedFile) -> bool {
        let exempt = self
            .exempt
            .iter()
            .any(|pattern| pattern.matches_path(file.path()));
        if exempt {
            debug!("{file} is exempt");
        }
        exempt
    }

    fn is_index(&self, file: &StagedFile) -> bool {
        file.path()
            .file_name()
            .map(|name| self.index_pattern.matches(&name.to_string_lossy()))
            .unwrap_or(false)
    }

    fn report_unavailable_tools(&self) {
        let tools = &self.tools;
        let unavailable = [&tools.compressor]
            .into_iter()
            .filter_map(tool_name)
            .chain(tools.minifiers.iter().filter_map(tool_name))
            .chain(tool_name(&tools.card_generator))
            .chain(tool_name(&tools.font_subsetter));

        for tool in unavailable {
            info!("{tool} not installed, checks that need it are skipped");
        }
    }
}

fn tool_name<T>(capability: &Capability<T>) -> Option<&str> {
    match capability {
        Capability::Available(_) => None,
        Capability::Unavailable { tool } => Some(tool.as_str()),
    }
}

fn compile(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern).map_err(|source| GateError::Pattern {
        source,
        pattern: pattern.to_string(),
    })
}

/// Original contents of files the gate rewrote.
///
/// # Invariant
///
/// - Only the first recording of a path is kept, so rollback restores the
///   state from before the run.
pub struct Journal<'repo> {
    repo: &'repo RepoHandle,
    entries: Vec<(PathBuf, Vec<u8>)>,
}

impl<'repo> Journal<'repo> {
    pub fn new(repo: &'repo RepoHandle) -> Self {
        Self {
            repo,
            entries: Vec::new(),
        }
    }

    /// Record current content of path, and return it.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::Io`] if file cannot be read.
    pub fn record(&mut self, path: &Path) -> Result<Vec<u8>, RepoError> {
        let content = self.repo.read(path)?;
        if !self.entries.iter().any(|(recorded, _)| recorded == path) {
            self.entries.push((path.to_path_buf(), content.clone()));
        }

        Ok(content)
    }

    /// Put back original contents of every recorded file.
    pub fn rollback(self) {
        for (path, content) in self.entries.into_iter().rev() {
            match self.repo.write(&path, &content) {
                Ok(()) => warn!("restored {:?} after failed run", path.display()),
                Err(error) => warn!("cannot restore {:?}: {error}", path.display()),
            }
        }
    }
}

/// Gate error types.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// Content policy check fails.
    #[error(transparent)]
    Check(#[from] CheckError),

    /// External tool fails.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Work tree or index access fails.
    #[error(transparent)]
    Repo(#[from] RepoError),

    /// Configured glob pattern is invalid.
    #[error("invalid glob pattern {pattern:?}")]
    Pattern {
        #[source]
        source: glob::PatternError,
        pattern: String,
    },
}

/// Friendly result alias :3
pub type Result<T, E = GateError> = std::result::Result<T, E>;
