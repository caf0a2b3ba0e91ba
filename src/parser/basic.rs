// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Default [`Parser`] of `.feature` files.

use std::{path::Path, sync::Arc};

use super::{Error, Parser, Result};

/// Default [`Parser`].
///
/// Parses a single `.feature` file, or every `*.feature` file inside a
/// directory (recursively, case-insensitively, sorted by path).
#[derive(Clone, Copy, Debug, Default)]
pub struct Basic;

impl Basic {
    /// Creates a new [`Basic`] [`Parser`].
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl<I: AsRef<Path>> Parser<I> for Basic {
    fn parse(self, input: I) -> Result<Vec<gherkin::Feature>> {
        let path = input.as_ref().canonicalize().map_err(|e| Error::Io {
            path: input.as_ref().to_owned(),
            error: Arc::new(e),
        })?;
        let env = gherkin::GherkinEnv::default();

        if path.is_file() {
            return Ok(vec![gherkin::Feature::parse_path(&path, env)?]);
        }

        let walker = globwalk::GlobWalkerBuilder::new(&path, "*.feature")
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::Walk { path: path.clone(), message: e.to_string() })?;
        let mut files = walker
            .filter_map(|entry| match entry {
                Ok(e) => Some(e.into_path()),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable entry");
                    None
                }
            })
            .collect::<Vec<_>>();
        files.sort();
        tracing::debug!(dir = %path.display(), files = files.len(), "found feature files");

        files
            .into_iter()
            .map(|f| gherkin::Feature::parse_path(f, gherkin::GherkinEnv::default()))
            .collect::<std::result::Result<_, _>>()
            .map_err(Into::into)
    }
}
