// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Data table argument of a [`PickleStep`].
//!
//! [`PickleStep`]: super::PickleStep

use std::collections::HashMap;

/// Rectangular table of cells attached to a step, with placeholders already
/// substituted.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DataTable {
    rows: Vec<Vec<String>>,
}

impl DataTable {
    /// Creates a new [`DataTable`] out of the given `rows`.
    #[must_use]
    pub const fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Returns every row, including the header one.
    #[must_use]
    pub fn raw(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Returns every row, except the header one.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or_default()
    }

    /// Returns the header row, if any.
    #[must_use]
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Returns every non-header row as a map keyed by the header cells.
    #[must_use]
    pub fn hashes(&self) -> Vec<HashMap<&str, &str>> {
        let Some(header) = self.header() else {
            return Vec::new();
        };
        self.rows()
            .iter()
            .map(|row| {
                header
                    .iter()
                    .map(String::as_str)
                    .zip(row.iter().map(String::as_str))
                    .collect()
            })
            .collect()
    }

    /// Returns a two-column table as a map of its first column to its second
    /// one, or [`None`] if some row isn't exactly two cells wide.
    #[must_use]
    pub fn rows_hash(&self) -> Option<HashMap<&str, &str>> {
        self.rows
            .iter()
            .map(|row| match row.as_slice() {
                [k, v] => Some((k.as_str(), v.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Returns the width of the first row, if all rows have the same width.
    pub(crate) fn width(&self) -> Option<usize> {
        let width = self.rows.first().map_or(0, Vec::len);
        self.rows.iter().all(|r| r.len() == width).then_some(width)
    }
}
