// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! External tool capabilities.
//!
//! The gate leans on external programs for PNG compression, script
//! minification, social card generation, and font subsetting. None of them
//! are required. Each is modeled as a capability trait, and wrapped in a
//! [`Capability`] that is either available or not. Checks treat an
//! unavailable capability as a pass-through rather than a failure.
//!
//! The `External*` types implement the capability traits by shelling out to
//! the programs named in [`ToolSettings`]. Calls block with no timeout.

use crate::{
    config::{SubsetCommand, ToolCommand, ToolSettings},
    path::find_program,
};

use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    process::Command,
};
use tracing::{debug, instrument};

/// Optional external tool.
#[derive(Debug)]
pub enum Capability<T> {
    /// Tool is installed and usable.
    Available(T),

    /// Tool is not installed.
    Unavailable {
        /// Name of the tool for logging.
        tool: String,
    },
}

impl<T> Capability<T> {
    pub fn unavailable(tool: impl Into<String>) -> Self {
        Self::Unavailable { tool: tool.into() }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

/// Compress PNG images in place.
pub trait Compressor {
    fn name(&self) -> &str;

    fn compress(&self, image: &Path) -> Result<()>;
}

/// Minify scripts into bytes.
pub trait Minifier {
    fn name(&self) -> &str;

    fn minify(&self, script: &Path) -> Result<Vec<u8>>;
}

/// Generate social media card for a content file.
///
/// Generators may rewrite the content file, e.g., to point its front matter
/// at the new card.
pub trait CardGenerator {
    /// Generate card and return path of generated image relative to work tree.
    fn generate(&self, workdir: &Path, content: &Path) -> Result<PathBuf>;
}

/// Subset fonts down to the glyphs a site uses.
pub trait FontSubsetter {
    /// Stylesheet the subsetter writes, relative to work tree.
    fn output(&self) -> &Path;

    /// Run subsetter and return path of generated stylesheet relative to work
    /// tree.
    fn subset(&self, workdir: &Path) -> Result<PathBuf>;
}

/// Full set of external tools the gate may use.
pub struct Toolbox {
    pub compressor: Capability<Box<dyn Compressor>>,
    pub minifiers: Vec<Capability<Box<dyn Minifier>>>,
    pub card_generator: Capability<Box<dyn CardGenerator>>,
    pub font_subsetter: Capability<Box<dyn FontSubsetter>>,
}

impl Toolbox {
    /// Toolbox where nothing is installed.
    pub fn empty() -> Self {
        Self {
            compressor: Capability::unavailable("png compressor"),
            minifiers: Vec::new(),
            card_generator: Capability::unavailable("card generator"),
            font_subsetter: Capability::unavailable("font subsetter"),
        }
    }

    /// Detect installed tools from configured commands.
    ///
    /// The first installed compressor wins. Every configured minifier is kept
    /// so unavailable ones can be reported.
    #[instrument(skip(settings), level = "debug")]
    pub fn detect(settings: &ToolSettings) -> Self {
        let compressor = settings
            .compressors
            .iter()
            .find_map(|command| {
                find_program(&command.program).map(|program| {
                    debug!("using png compressor {program:?}");
                    Box::new(ExternalCompressor::new(program, command)) as Box<dyn Compressor>
                })
            })
            .map(Capability::Available)
            .unwrap_or_else(|| Capability::unavailable("png compressor"));

        let minifiers = settings
            .minifiers
            .iter()
            .map(|command| match find_program(&command.program) {
                Some(program) => Capability::Available(
                    Box::new(ExternalMinifier::new(program, command)) as Box<dyn Minifier>,
                ),
                None => Capability::unavailable(command.program.clone()),
            })
            .collect();

        let card_generator = match &settings.card_generator {
            Some(command) => match find_program(&command.program) {
                Some(program) => Capability::Available(Box::new(ExternalCardGenerator::new(
                    program, command,
                )) as Box<dyn CardGenerator>),
                None => Capability::unavailable(command.program.clone()),
            },
            None => Capability::unavailable("card generator"),
        };

        let font_subsetter = match &settings.font_subsetter {
            Some(subset) => match find_program(&subset.command.program) {
                Some(program) => Capability::Available(Box::new(ExternalFontSubsetter::new(
                    program, subset,
                )) as Box<dyn FontSubsetter>),
                None => Capability::unavailable(subset.command.program.clone()),
            },
            None => Capability::unavailable("font subsetter"),
        };

        Self {
            compressor,
            minifiers,
            card_generator,
            font_subsetter,
        }
    }
}

/// PNG compressor backed by an external program, e.g., `oxipng`.
#[derive(Debug, Clone)]
pub struct ExternalCompressor {
    program: PathBuf,
    args: Vec<String>,
    name: String,
}

impl ExternalCompressor {
    pub fn new(program: PathBuf, command: &ToolCommand) -> Self {
        Self {
            program,
            args: command.args.clone(),
            name: command.program.clone(),
        }
    }
}

impl Compressor for ExternalCompressor {
    fn name(&self) -> &str {
        self.name.as_str()
    }

    fn compress(&self, image: &Path) -> Result<()> {
        let args = self.args.iter().map(OsStr::new).chain([image.as_os_str()]);
        syscall_non_interactive(&self.program, args, None)?;
        Ok(())
    }
}

/// Script minifier backed by an external program, e.g., `terser`.
#[derive(Debug, Clone)]
pub struct ExternalMinifier {
    program: PathBuf,
    args: Vec<String>,
    name: String,
}

impl ExternalMinifier {
    pub fn new(program: PathBuf, command: &ToolCommand) -> Self {
        Self {
            program,
            args: command.args.clone(),
            name: command.program.clone(),
        }
    }
}

impl Minifier for ExternalMinifier {
    fn name(&self) -> &str {
        self.name.as_str()
    }

    fn minify(&self, script: &Path) -> Result<Vec<u8>> {
        let args = self.args.iter().map(OsStr::new).chain([script.as_os_str()]);
        syscall_non_interactive(&self.program, args, None)
    }
}

/// Social card generator backed by an external program.
///
/// The program receives the content file path as its last argument, and must
/// print the path of the generated image on stdout.
#[derive(Debug, Clone)]
pub struct ExternalCardGenerator {
    program: PathBuf,
    args: Vec<String>,
}

impl ExternalCardGenerator {
    pub fn new(program: PathBuf, command: &ToolCommand) -> Self {
        Self {
            program,
            args: command.args.clone(),
        }
    }
}

impl CardGenerator for ExternalCardGenerator {
    fn generate(&self, workdir: &Path, content: &Path) -> Result<PathBuf> {
        let args = self.args.iter().map(OsStr::new).chain([content.as_os_str()]);
        let stdout = syscall_non_interactive(&self.program, args, Some(workdir))?;
        let output = String::from_utf8_lossy(&stdout).trim().to_string();
        if output.is_empty() {
            return Err(ToolError::NoOutput(self.program.clone()));
        }

        let output = PathBuf::from(output);
        Ok(output
            .strip_prefix(workdir)
            .map(Path::to_path_buf)
            .unwrap_or(output))
    }
}

/// Font subsetter backed by an external program.
#[derive(Debug, Clone)]
pub struct ExternalFontSubsetter {
    program: PathBuf,
    args: Vec<String>,
    output: PathBuf,
}

impl ExternalFontSubsetter {
    pub fn new(program: PathBuf, subset: &SubsetCommand) -> Self {
        Self {
            program,
            args: subset.command.args.clone(),
            output: PathBuf::from(&subset.output),
        }
    }
}

impl FontSubsetter for ExternalFontSubsetter {
    fn output(&self) -> &Path {
        self.output.as_path()
    }

    fn subset(&self, workdir: &Path) -> Result<PathBuf> {
        syscall_non_interactive(&self.program, &self.args, Some(workdir))?;
        Ok(self.output.clone())
    }
}

fn syscall_non_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
    current_dir: Option<&Path>,
) -> Result<Vec<u8>> {
    let mut command = Command::new(cmd.as_ref());
    command.args(args);
    if let Some(dir) = current_dir {
        command.current_dir(dir);
    }

    let output = command.output().map_err(|source| ToolError::Spawn {
        source,
        program: PathBuf::from(cmd.as_ref()),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(output.stderr.as_slice());

        // INVARIANT: Chomp trailing newlines.
        let stderr = stderr.trim_end().to_string();
        return Err(ToolError::Failed {
            program: PathBuf::from(cmd.as_ref()),
            stderr,
        });
    }

    Ok(output.stdout)
}

/// External tool error types.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Program could not be started.
    #[error("failed to run {:?}", program.display())]
    Spawn {
        #[source]
        source: std::io::Error,
        program: PathBuf,
    },

    /// Program exited with nonzero status.
    #[error("command {:?} failed: {stderr}", program.display())]
    Failed { program: PathBuf, stderr: String },

    /// Program succeeded without reporting what it generated.
    #[error("command {:?} produced no output path", .0.display())]
    NoOutput(PathBuf),
}

/// Friendly result alias :3
pub type Result<T, E = ToolError> = std::result::Result<T, E>;
