// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`Parser`] of feature sources kept in memory.

use std::sync::Arc;

use super::{Error, Parser, Result};

/// [`Parser`] of feature sources given as strings.
#[derive(Clone, Copy, Debug, Default)]
pub struct Inline;

impl<I, S> Parser<I> for Inline
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fn parse(self, input: I) -> Result<Vec<gherkin::Feature>> {
        input
            .into_iter()
            .enumerate()
            .map(|(index, src)| {
                gherkin::Feature::parse(src.as_ref(), gherkin::GherkinEnv::default())
                    .map_err(|e| Error::Inline { index, error: Arc::new(e) })
            })
            .collect()
    }
}
