// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the gate configuration file to simplify the process
//! of serialization and deserialization. Every field carries a default, so an
//! empty file, or no file at all, yields the stock hook behavior for a theme
//! repository. File lookup is left to [`crate::path`].

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    str::FromStr,
};

/// Gate configuration layout.
///
/// # General Layout
///
/// The configuration is composed of five tables: general gate settings,
/// front matter settings, script naming, paired config parity, and external
/// tool commands. All of them may be omitted.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GateConfig {
    pub gate: GateSettings,
    pub front_matter: FrontMatterSettings,
    pub scripts: ScriptSettings,
    pub parity: ParitySettings,
    pub tools: ToolSettings,
}

impl FromStr for GateConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: GateConfig = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every program field.
        for command in config.tools.commands_mut() {
            command.program = shellexpand::full(command.program.as_str())
                .map_err(ConfigError::ShellExpansion)?
                .into_owned();
        }

        Ok(config)
    }
}

impl Display for GateConfig {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// General gate settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GateSettings {
    /// Glob patterns of paths exempt from every per-file check.
    pub exempt: Vec<String>,

    /// Placeholder token that must never be committed.
    pub forbidden_marker: String,

    /// Glob pattern on file names of section index pages.
    pub index_pattern: String,

    /// Site configuration file whose change triggers font subsetting.
    pub site_config: String,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            exempt: vec![
                "pre-commit".into(),
                ".githooks/pre-commit".into(),
                "CHANGELOG.md".into(),
            ],
            forbidden_marker: "TODO".into(),
            index_pattern: "_index*.md".into(),
            site_config: "config.toml".into(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FrontMatterSettings {
    /// Marker line that opens and closes the front matter block.
    pub delimiter: String,
}

impl Default for FrontMatterSettings {
    fn default() -> Self {
        Self {
            delimiter: "+++".into(),
        }
    }
}

/// Script naming convention.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScriptSettings {
    /// Extension of script files, without the dot.
    pub extension: String,

    /// Suffix inserted before the extension of minified scripts.
    pub minified_suffix: String,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            extension: "js".into(),
            minified_suffix: "min".into(),
        }
    }
}

/// Paired configuration files that must keep section lengths in sync.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ParitySettings {
    /// Top-level files to compare.
    pub files: Vec<String>,

    /// Section marker line to count from.
    pub section: String,
}

impl Default for ParitySettings {
    fn default() -> Self {
        Self {
            files: vec!["config.toml".into(), "theme.toml".into()],
            section: "[extra]".into(),
        }
    }
}

/// External tool commands.
///
/// Compressors and minifiers are listed in preference order. The card
/// generator and font subsetter are optional by nature.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolSettings {
    pub compressors: Vec<ToolCommand>,
    pub minifiers: Vec<ToolCommand>,
    pub card_generator: Option<ToolCommand>,
    pub font_subsetter: Option<SubsetCommand>,
}

impl ToolSettings {
    fn commands_mut(&mut self) -> impl Iterator<Item = &mut ToolCommand> {
        self.compressors
            .iter_mut()
            .chain(self.minifiers.iter_mut())
            .chain(self.card_generator.iter_mut())
            .chain(self.font_subsetter.iter_mut().map(|subset| &mut subset.command))
    }
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            compressors: vec![
                ToolCommand::new("oxipng", ["-o", "max", "--strip", "safe", "--alpha"]),
                ToolCommand::new("optipng", ["-o", "7", "-silent"]),
            ],
            minifiers: vec![
                ToolCommand::new("uglifyjs", ["--compress", "--mangle", "--"]),
                ToolCommand::new("terser", ["--compress", "--mangle", "--"]),
            ],
            card_generator: None,
            font_subsetter: None,
        }
    }
}

/// Program with leading arguments.
///
/// The file operated on is appended after the arguments.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ToolCommand {
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Font subsetter command.
///
/// Runs at the work tree root with its arguments verbatim, and produces a
/// stylesheet at `output`.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct SubsetCommand {
    #[serde(flatten)]
    pub command: ToolCommand,

    /// Generated stylesheet relative to the work tree.
    pub output: String,
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
