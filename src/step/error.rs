// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt;

use derive_more::with_trait::Error;

use super::Location;

/// Error of a step text matching several step definitions of a
/// [`Collection`].
///
/// [`Collection`]: super::Collection
#[derive(Clone, Debug, Default, Eq, Error, PartialEq)]
pub struct AmbiguousMatchError {
    /// Sources of the matching patterns, in registration order.
    pub possible_matches: Vec<(String, Option<Location>)>,
}

impl AmbiguousMatchError {
    /// Returns an iterator over the sources of the matching patterns.
    pub fn patterns(&self) -> impl Iterator<Item = &str> + '_ {
        self.possible_matches.iter().map(|(p, _)| p.as_str())
    }
}

impl fmt::Display for AmbiguousMatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Possible matches:")?;
        for (pattern, loc) in &self.possible_matches {
            write!(f, "\n{pattern}")?;
            if let Some(loc) = loc {
                write!(f, " --> {loc}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{AmbiguousMatchError, Location};

    #[test]
    fn lists_candidates_in_order() {
        let err = AmbiguousMatchError {
            possible_matches: vec![
                ("I eat (\\d+)".into(), Some(Location { path: "steps.rs", line: 3, column: 9 })),
                ("I eat {int}".into(), None),
            ],
        };

        assert_eq!(err.patterns().collect::<Vec<_>>(), ["I eat (\\d+)", "I eat {int}"]);
        assert_eq!(
            err.to_string(),
            "Possible matches:\nI eat (\\d+) --> steps.rs:3:9\nI eat {int}",
        );
    }
}
