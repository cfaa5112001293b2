//! Header parsing and semantic column resolution.
//!
//! An export header lists its columns between a `Columns <n>` line and the
//! `Data` line that opens the data section:
//!
//! ```text
//! Columns 4
//!   "ID" Char(20)
//!   "Element" Char(20)
//!   "depth2d" Float
//!   "speed2d" Float
//! Data
//! ```
//!
//! Column order varies between exports, so the depth and speed positions are
//! looked up by name for every timestep.

use crate::config::SemanticColumn;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColumnError {
    #[error("no column matches {semantic} (expected {canonical:?} or a name containing {fragment:?})")]
    ColumnNotFound {
        semantic: String,
        canonical: String,
        fragment: String,
    },
}

/// A column picked for a semantic field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedColumn<'a> {
    pub name: &'a str,
    pub position: usize,
}

// Column name -> zero-based position, in header order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnIndex {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    pub fn new() -> Self {
        ColumnIndex {
            names: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Appends the next header column. A repeated name keeps its first
    /// position but still occupies a slot.
    pub fn push(&mut self, name: &str) {
        let position = self.names.len();
        self.names.push(name.to_string());
        self.positions.entry(name.to_string()).or_insert(position);
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Column names in header order.
    pub fn names(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names.iter().enumerate().map(|(i, n)| (i, n.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Picks the column holding `column`.
    ///
    /// An exact, case-insensitive match on the canonical name wins. Failing
    /// that, the first column (in header order) whose upper-cased name
    /// contains the fragment is used.
    pub fn resolve(&self, column: &SemanticColumn) -> Result<ResolvedColumn<'_>, ColumnError> {
        let fragment = column.fragment.to_uppercase();

        let found = self
            .names
            .iter()
            .find(|n| n.eq_ignore_ascii_case(&column.canonical))
            .or_else(|| {
                self.names
                    .iter()
                    .find(|n| n.to_uppercase().contains(&fragment))
            });

        match found {
            Some(name) => Ok(ResolvedColumn {
                name,
                position: self.positions[name.as_str()],
            }),
            None => Err(ColumnError::ColumnNotFound {
                semantic: column.semantic.clone(),
                canonical: column.canonical.clone(),
                fragment: column.fragment.clone(),
            }),
        }
    }
}

fn is_keyword(line: &str, keyword: &str) -> bool {
    line.get(..keyword.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(keyword))
}

/// Builds a [`ColumnIndex`] from header lines. Reading stops at the `Data`
/// marker; anything before the `Columns` line is ignored.
pub fn parse_header<I, S>(lines: I) -> ColumnIndex
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut index = ColumnIndex::new();
    let mut in_columns = false;

    for line in lines {
        let line = line.as_ref().trim();

        if !in_columns {
            let mut tokens = line.split_whitespace();
            if tokens.next().is_some_and(|t| t.eq_ignore_ascii_case("columns"))
                && tokens.next().is_some_and(|n| n.parse::<usize>().is_ok())
            {
                in_columns = true;
            }
            continue;
        }

        if is_keyword(line, "data") {
            break;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() >= 2 {
            index.push(&tokens[0].replace('"', ""));
        }
    }

    index
}
