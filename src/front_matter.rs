// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Front matter handling.
//!
//! Markdown content files carry a __front matter__ block at the very top,
//! delimited by a fixed marker line (`+++` for TOML front matter):
//!
//! ```text
//! +++
//! title = "Hello"
//! date = 2024-01-01
//! updated = 2024-03-05
//!
//! [extra]
//! toc = true
//! +++
//!
//! Body text starts here.
//! ```
//!
//! # Record Layout
//!
//! The block is parsed into an ordered record of lines. Top-level
//! `key = value` lines become addressable [`Field`]s. Everything else, i.e.,
//! comments, blank lines, table headers and all lines under a table header,
//! is kept verbatim. Fields keep the exact text around their value, so a
//! record that was not mutated serializes back byte-for-byte.
//!
//! Values are decoded lazily through the `toml` crate. Thus, bare TOML dates,
//! quoted dates, and full datetimes all resolve to the same calendar date.

use chrono::NaiveDate;
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};
use toml::{Table, Value};

/// Markdown document split into front matter and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    front_matter: Option<FrontMatter>,
    body: String,
}

impl Document {
    /// Parse document with target front matter delimiter.
    ///
    /// Documents that do not open with the delimiter line have no front
    /// matter, and their entire text is treated as body.
    ///
    /// # Errors
    ///
    /// - Return [`FrontMatterError::Unterminated`] if the opening delimiter is
    ///   never closed.
    pub fn parse(text: &str, delimiter: &str) -> Result<Self> {
        let mut lines = text.split_inclusive('\n');
        let open = match lines.next() {
            Some(line) if is_delimiter(line, delimiter) => line.to_string(),
            _ => {
                return Ok(Self {
                    front_matter: None,
                    body: text.to_string(),
                })
            }
        };

        let mut fields = Vec::new();
        let mut in_table = false;
        let mut consumed = open.len();
        let mut close = None;
        for line in lines.by_ref() {
            consumed += line.len();
            if is_delimiter(line, delimiter) {
                close = Some(line.to_string());
                break;
            }

            // INVARIANT: Everything after the first table header belongs to that table.
            if line.trim_start().starts_with('[') {
                in_table = true;
            }

            match Field::parse(line) {
                Some(field) if !in_table => fields.push(Line::Field(field)),
                _ => fields.push(Line::Verbatim(line.to_string())),
            }
        }

        let close = close.ok_or(FrontMatterError::Unterminated)?;
        Ok(Self {
            front_matter: Some(FrontMatter {
                open,
                lines: fields,
                close,
            }),
            body: text[consumed..].to_string(),
        })
    }

    pub fn front_matter(&self) -> Option<&FrontMatter> {
        self.front_matter.as_ref()
    }

    pub fn front_matter_mut(&mut self) -> Option<&mut FrontMatter> {
        self.front_matter.as_mut()
    }

    pub fn body(&self) -> &str {
        self.body.as_str()
    }
}

impl Display for Document {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        if let Some(front_matter) = &self.front_matter {
            write!(fmt, "{front_matter}")?;
        }
        fmt.write_str(&self.body)
    }
}

/// Front matter block.
///
/// # Invariant
///
/// - Each entry in `lines` corresponds to exactly one physical line.
/// - Only top-level fields are addressable by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatter {
    open: String,
    lines: Vec<Line>,
    close: String,
}

impl FrontMatter {
    /// Get first top-level field with target key.
    pub fn get(&self, key: &str) -> Option<&Field> {
        self.fields().find(|field| field.key == key)
    }

    /// Iterate through top-level fields in order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.lines.iter().filter_map(|line| match line {
            Line::Field(field) => Some(field),
            Line::Verbatim(_) => None,
        })
    }

    /// Creation date.
    pub fn date(&self) -> Option<NaiveDate> {
        self.get("date").and_then(Field::as_date)
    }

    /// Last-modified date.
    pub fn updated(&self) -> Option<NaiveDate> {
        self.get("updated").and_then(Field::as_date)
    }

    /// Check if document is flagged as a draft.
    pub fn is_draft(&self) -> bool {
        self.get("draft")
            .and_then(|field| field.decode())
            .and_then(|value| value.as_bool())
            .unwrap_or(false)
    }

    /// Line number of the closing delimiter, counting from 1.
    pub fn end_line(&self) -> usize {
        self.lines.len() + 2
    }

    /// Set `updated` field to target date.
    ///
    /// Replaces the value of an existing `updated` field in place, keeping
    /// its quoting style and any trailing comment. Otherwise, inserts a new
    /// `updated` field right after the first `date` field, following the
    /// quoting style of `date`. Returns whether the record changed.
    ///
    /// # Errors
    ///
    /// - Return [`FrontMatterError::MissingField`] if there is no `updated`
    ///   field and no `date` field to position a new one after.
    pub fn set_updated(&mut self, date: NaiveDate) -> Result<bool> {
        if self.updated() == Some(date) {
            return Ok(false);
        }

        if let Some(updated) = self.field_mut("updated") {
            let value = format_date(date, updated.is_quoted());
            updated.replace_value(&value);
            return Ok(true);
        }

        let position = self
            .lines
            .iter()
            .position(|line| matches!(line, Line::Field(field) if field.key == "date"))
            .ok_or(FrontMatterError::MissingField("date"))?;
        let (quoted, ending) = match &self.lines[position] {
            Line::Field(field) => (field.is_quoted(), field.ending.clone()),
            Line::Verbatim(_) => (false, "\n".to_string()),
        };
        self.lines.insert(
            position + 1,
            Line::Field(Field {
                key: "updated".into(),
                lead: "updated = ".into(),
                value: format_date(date, quoted),
                ending,
            }),
        );

        Ok(true)
    }

    fn field_mut(&mut self, key: &str) -> Option<&mut Field> {
        self.lines.iter_mut().find_map(|line| match line {
            Line::Field(field) if field.key == key => Some(field),
            _ => None,
        })
    }
}

impl Display for FrontMatter {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(&self.open)?;
        for line in &self.lines {
            match line {
                Line::Field(field) => write!(fmt, "{field}")?,
                Line::Verbatim(text) => fmt.write_str(text)?,
            }
        }
        fmt.write_str(&self.close)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Field(Field),
    Verbatim(String),
}

/// Top-level `key = value` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    key: String,
    lead: String,
    value: String,
    ending: String,
}

impl Field {
    fn parse(line: &str) -> Option<Self> {
        let (content, ending) = split_ending(line);
        let trimmed = content.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('[') {
            return None;
        }

        let (left, right) = content.split_once('=')?;
        let key = left.trim();
        if key.is_empty() || !key.chars().all(is_bare_key_char) {
            return None;
        }

        let value = right.trim_start();
        let lead_len = content.len() - value.len();
        Some(Self {
            key: key.to_string(),
            lead: content[..lead_len].to_string(),
            value: value.to_string(),
            ending: ending.to_string(),
        })
    }

    /// Decode value as TOML.
    pub fn decode(&self) -> Option<Value> {
        let table: Table = toml::from_str(&format!("value = {}", self.value.trim())).ok()?;
        table.get("value").cloned()
    }

    /// Decode value as calendar date.
    ///
    /// Accepts TOML dates, TOML datetimes, and strings that start with an
    /// ISO-8601 date.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self.decode()? {
            Value::Datetime(datetime) => {
                let date = datetime.date?;
                NaiveDate::from_ymd_opt(date.year.into(), date.month.into(), date.day.into())
            }
            Value::String(text) => NaiveDate::parse_from_str(text.get(..10)?, "%Y-%m-%d").ok(),
            _ => None,
        }
    }

    fn is_quoted(&self) -> bool {
        self.value.starts_with('"') || self.value.starts_with('\'')
    }

    /// Swap value text, keeping whatever trails it on the line.
    fn replace_value(&mut self, value: &str) {
        let current = strip_comment(&self.value);
        let trailer = self.value[current.len()..].to_string();
        self.value = format!("{value}{trailer}");
    }
}

impl Display for Field {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{}{}{}", self.lead, self.value, self.ending)
    }
}

/// Locate closing delimiter line of text without fully parsing it.
///
/// Returns [`None`] when text has no terminated front matter block.
pub fn end_line(text: &str, delimiter: &str) -> Option<usize> {
    let mut lines = text.split_inclusive('\n');
    if !is_delimiter(lines.next()?, delimiter) {
        return None;
    }

    lines
        .position(|line| is_delimiter(line, delimiter))
        .map(|index| index + 2)
}

/// Format date for front matter, e.g., `2024-03-05` or `"2024-03-05"`.
pub fn format_date(date: NaiveDate, quoted: bool) -> String {
    let date = date.format("%Y-%m-%d");
    if quoted {
        format!("\"{date}\"")
    } else {
        date.to_string()
    }
}

/// Strip trailing `#` comment outside of quotes, and whitespace before it.
fn strip_comment(value: &str) -> &str {
    let mut quote = None;
    for (index, c) in value.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(open), _) if c == open => quote = None,
            (None, '#') => return value[..index].trim_end(),
            _ => {}
        }
    }

    value.trim_end()
}

fn is_delimiter(line: &str, delimiter: &str) -> bool {
    line.trim_end() == delimiter
}

fn is_bare_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn split_ending(line: &str) -> (&str, &str) {
    if let Some(content) = line.strip_suffix("\r\n") {
        (content, "\r\n")
    } else if let Some(content) = line.strip_suffix('\n') {
        (content, "\n")
    } else {
        (line, "")
    }
}

impl FromStr for Document {
    type Err = FrontMatterError;

    /// Parse document with the default `+++` delimiter.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text, "+++")
    }
}

/// Front matter error types.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FrontMatterError {
    /// Opening delimiter has no matching closing delimiter.
    #[error("front matter block is never closed")]
    Unterminated,

    /// Required field is absent.
    #[error("front matter has no {0:?} field")]
    MissingField(&'static str),
}

/// Friendly result alias :3
pub type Result<T, E = FrontMatterError> = std::result::Result<T, E>;
