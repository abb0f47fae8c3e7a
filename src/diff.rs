// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Diff region partitioning.
//!
//! A __diff region__ is the set of lines the pending commit changes in a
//! file, split into lines that fall inside the front matter block and lines
//! that fall outside of it. Added lines are located against the staged text,
//! and removed lines against the HEAD text, because the front matter span can
//! differ between the two.

use crate::front_matter;

/// Line numbers touched by the pending commit, counting from 1.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineChanges {
    /// Lines present in the staged text but not in HEAD.
    pub added: Vec<u32>,

    /// Lines present in HEAD but not in the staged text.
    pub removed: Vec<u32>,
}

/// Changed lines partitioned by front matter span.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiffRegion {
    inside: usize,
    outside: usize,
}

impl DiffRegion {
    /// Partition line changes against old and new text.
    ///
    /// A line counts as inside front matter if it lies on or before the
    /// closing delimiter of its own side of the diff. Text without a
    /// terminated front matter block has every line outside.
    pub fn partition(changes: &LineChanges, old: &str, new: &str, delimiter: &str) -> Self {
        let old_end = front_matter::end_line(old, delimiter).unwrap_or(0);
        let new_end = front_matter::end_line(new, delimiter).unwrap_or(0);

        let mut region = Self::default();
        let sides = [(&changes.added, new_end), (&changes.removed, old_end)];
        for (lines, end) in sides {
            for line in lines {
                if (*line as usize) <= end {
                    region.inside += 1;
                } else {
                    region.outside += 1;
                }
            }
        }

        region
    }

    /// Number of changed lines inside front matter.
    pub fn inside(&self) -> usize {
        self.inside
    }

    /// Number of changed lines outside front matter.
    pub fn outside(&self) -> usize {
        self.outside
    }

    /// Check if any changed line falls in the body.
    pub fn touches_body(&self) -> bool {
        self.outside > 0
    }
}
