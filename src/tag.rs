// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Extension of a [`TagOperation`].

use gherkin::tagexpr::TagOperation;
use sealed::sealed;

/// Extension of a [`TagOperation`] allowing to evaluate it against the tags of
/// a [`Pickle`].
///
/// Tags are compared without their leading `@`, on both sides.
///
/// [`Pickle`]: crate::Pickle
#[sealed]
pub trait Ext {
    /// Evaluates this [`TagOperation`] for the given `tags`.
    #[must_use]
    fn eval<I, S>(&self, tags: I) -> bool
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S> + Clone;
}

#[sealed]
impl Ext for TagOperation {
    fn eval<I, S>(&self, tags: I) -> bool
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S> + Clone,
    {
        match self {
            Self::And(l, r) => l.eval(tags.clone()) & r.eval(tags),
            Self::Or(l, r) => l.eval(tags.clone()) | r.eval(tags),
            Self::Not(t) => !t.eval(tags),
            Self::Tag(t) => {
                let t = normalize(t);
                tags.into_iter().any(|tag| normalize(tag.as_ref()) == t)
            }
        }
    }
}

/// Strips the leading `@` of a tag, if any.
#[must_use]
pub fn normalize(tag: &str) -> &str {
    tag.strip_prefix('@').unwrap_or(tag)
}

#[cfg(test)]
mod tests {
    use super::{normalize, Ext as _};
    use gherkin::tagexpr::TagOperation;

    fn op(s: &str) -> TagOperation {
        s.parse().unwrap_or_else(|e| panic!("invalid `{s}`: {e}"))
    }

    #[test]
    fn normalizes_tags() {
        assert_eq!(normalize("@wip"), "wip");
        assert_eq!(normalize("wip"), "wip");
    }

    #[test]
    fn evaluates_expressions() {
        let tags = ["smoke", "slow"];

        assert!(op("@smoke").eval(tags));
        assert!(op("@smoke and @slow").eval(tags));
        assert!(!op("@smoke and not @slow").eval(tags));
        assert!(op("@wip or @slow").eval(tags));
        assert!(!op("@wip").eval(tags));
    }

    #[test]
    fn ignores_at_sign_on_pickle_side() {
        assert!(op("@smoke").eval(["@smoke"]));
    }
}
