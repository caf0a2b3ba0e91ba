// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! CLI options of a [`Basic`] runner and per-[`Pickle`] retry options.
//!
//! [`Basic`]: super::Basic
//! [`Pickle`]: crate::Pickle

use std::time::Duration;

use gherkin::tagexpr::TagOperation;

use crate::tag::Ext as _;

/// CLI options of a [`Basic`] runner.
///
/// [`Basic`]: super::Basic
#[derive(Clone, Debug, Default, clap::Args)]
#[group(skip)]
pub struct Cli {
    /// Number of scenarios to run concurrently. If not specified, uses the
    /// value configured in tests runner, or 1 by default.
    #[arg(
        long,
        short,
        value_name = "int",
        value_parser = clap::value_parser!(u64).range(1..),
        global = true,
    )]
    pub concurrency: Option<u64>,

    /// Stop dispatching scenarios after the first failure.
    #[arg(long, global = true, visible_alias = "ff")]
    pub fail_fast: bool,

    /// Number of times a scenario will be retried in case of a retryable
    /// failure.
    #[arg(long, value_name = "int", global = true)]
    pub retry: Option<usize>,

    /// Delay between each scenario retry attempt.
    ///
    /// Duration is represented in a human-readable format like `12min5s`.
    /// Supported suffixes:
    /// - `nsec`, `ns` - nanoseconds.
    /// - `usec`, `us` - microseconds.
    /// - `msec`, `ms` - milliseconds.
    /// - `seconds`, `second`, `sec`, `s` - seconds.
    /// - `minutes`, `minute`, `min`, `m` - minutes.
    #[arg(
        long,
        value_name = "duration",
        value_parser = humantime::parse_duration,
        verbatim_doc_comment,
        global = true,
    )]
    pub retry_after: Option<Duration>,

    /// Tag expression to filter retried scenarios.
    #[arg(long, value_name = "tagexpr", global = true)]
    pub retry_tag_filter: Option<TagOperation>,

    /// Treat undefined and pending steps as failures.
    #[arg(long, global = true)]
    pub strict: bool,
}

/// Retry options of a single [`Pickle`].
///
/// [`Pickle`]: crate::Pickle
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RetryOptions {
    /// Number of extra attempts.
    pub retries: usize,

    /// Delay before each extra attempt.
    pub after: Option<Duration>,
}

impl RetryOptions {
    /// Resolves the [`RetryOptions`] of a [`Pickle`] out of its `tags`.
    ///
    /// A `@retry(n)` tag overrides the number of retries, and a
    /// `@retry(n).after(3s)` one the delay too; a bare `@retry` uses the
    /// `default` number, or `1` if there is none. Without such a tag, the
    /// `default` applies to the [`Pickle`]s matching the `filter` (or to all
    /// of them, if there is no `filter`).
    ///
    /// [`Pickle`]: crate::Pickle
    #[must_use]
    pub fn from_tags<S: AsRef<str>>(
        tags: &[S],
        default: Self,
        filter: Option<&TagOperation>,
    ) -> Self {
        let from_tag = tags.iter().find_map(|t| parse_tag(t.as_ref()));

        match from_tag {
            Some((retries, after)) => Self {
                retries: retries.unwrap_or(default.retries.max(1)),
                after: after.or(default.after),
            },
            None if filter.map_or(true, |op| op.eval(tags)) => default,
            None => Self::default(),
        }
    }
}

/// Parses a `retry`, `retry(n)` or `retry(n).after(duration)` tag.
fn parse_tag(tag: &str) -> Option<(Option<usize>, Option<Duration>)> {
    let rest = crate::tag::normalize(tag).strip_prefix("retry")?;

    let (num, rest) = match rest.strip_prefix('(') {
        Some(r) => {
            let (num, rest) = r.split_once(')')?;
            (Some(num.trim().parse().ok()?), rest)
        }
        None => (None, rest),
    };

    let after = match rest.strip_prefix(".after(") {
        Some(r) => {
            let (dur, tail) = r.split_once(')')?;
            if !tail.is_empty() {
                return None;
            }
            Some(humantime::parse_duration(dur.trim()).ok()?)
        }
        None if rest.is_empty() => None,
        None => return None,
    };

    Some((num, after))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use gherkin::tagexpr::TagOperation;

    use super::RetryOptions;

    const NONE: RetryOptions = RetryOptions { retries: 0, after: None };

    #[test]
    fn parses_retry_tags() {
        assert_eq!(
            RetryOptions::from_tags(&["retry(3)"], NONE, None),
            RetryOptions { retries: 3, after: None },
        );
        assert_eq!(
            RetryOptions::from_tags(&["smoke", "@retry(2).after(150ms)"], NONE, None),
            RetryOptions { retries: 2, after: Some(Duration::from_millis(150)) },
        );
        assert_eq!(
            RetryOptions::from_tags(&["retry"], NONE, None),
            RetryOptions { retries: 1, after: None },
        );
    }

    #[test]
    fn ignores_malformed_tags() {
        for tag in ["retry(x)", "retry(2).after(soon)", "retryable", "retry(1)x"] {
            assert_eq!(RetryOptions::from_tags(&[tag], NONE, None), NONE, "{tag}");
        }
    }

    #[test]
    fn applies_defaults_through_filter() {
        let default = RetryOptions { retries: 4, after: Some(Duration::from_secs(1)) };
        let filter = "@flaky".parse::<TagOperation>().unwrap();

        assert_eq!(RetryOptions::from_tags(&["flaky"], default, Some(&filter)), default);
        assert_eq!(RetryOptions::from_tags(&["stable"], default, Some(&filter)), NONE);
        assert_eq!(RetryOptions::from_tags::<&str>(&[], default, None), default);
        assert_eq!(
            RetryOptions::from_tags(&["retry(1)"], default, Some(&filter)),
            RetryOptions { retries: 1, after: Some(Duration::from_secs(1)) },
        );
    }
}
