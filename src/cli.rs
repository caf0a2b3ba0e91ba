// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! CLI options of a [`Suite`] run.
//!
//! Values given on the command line override the ones configured through
//! the [`Suite`] builder methods.
//!
//! [`Suite`]: crate::Suite

use std::path::PathBuf;

use gherkin::tagexpr::TagOperation;
use regex::Regex;

use crate::{runner, writer};

pub use clap::{Args, Parser};

/// Root CLI (command line interface) of a [`Suite`] run.
///
/// Extra options may be added with a `Custom` [`Args`] implementor.
///
/// [`Suite`]: crate::Suite
#[derive(clap::Parser, Clone, Debug, Default)]
#[command(
    name = "pickler",
    about = "Run Gherkin scenarios against registered steps",
    long_about = None
)]
pub struct Opts<Custom = Empty>
where
    Custom: Args,
{
    /// Regex to filter scenarios by their name.
    #[arg(
        id = "name",
        long = "name",
        short = 'n',
        value_name = "regex",
        visible_alias = "scenario-name",
        global = true
    )]
    pub re_filter: Option<Regex>,

    /// Tag expression to filter scenarios by.
    ///
    /// Note: Tags from Feature, Rule, Scenario and Examples are merged
    /// together on filtering.
    #[arg(
        id = "tags",
        long = "tags",
        short = 't',
        value_name = "tagexpr",
        global = true
    )]
    pub tags_filter: Option<TagOperation>,

    /// Comma-separated output formats: `pretty`, `progress`, `json[:path]`,
    /// `junit[:path]`.
    #[arg(long, short, value_name = "formats", global = true)]
    pub format: Option<writer::Formats>,

    /// Paths to `.feature` files or directories containing them.
    #[arg(value_name = "path")]
    pub paths: Vec<PathBuf>,

    /// [`Runner`] CLI options.
    ///
    /// [`Runner`]: crate::runner::Basic
    #[command(flatten)]
    pub runner: runner::Cli,

    /// Terminal [`Writer`] CLI options.
    ///
    /// [`Writer`]: crate::Writer
    #[command(flatten)]
    pub writer: writer::basic::Cli,

    /// Additional custom CLI options.
    #[command(flatten)]
    pub custom: Custom,
}

impl<Custom: Args> Opts<Custom> {
    /// Shortcut for [`clap::Parser::parse()`], which doesn't require the trait
    /// being imported.
    #[must_use]
    pub fn parsed() -> Self {
        <Self as clap::Parser>::parse()
    }
}

/// Empty CLI options.
#[derive(Args, Clone, Copy, Debug, Default)]
#[group(skip)]
pub struct Empty;

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, time::Duration};

    use clap::Parser as _;

    use super::Opts;
    use crate::writer::{Coloring, Format};

    #[test]
    fn parses_every_option() {
        let opts = Opts::<super::Empty>::try_parse_from([
            "pickler",
            "-c",
            "4",
            "--retry",
            "2",
            "--retry-after",
            "150ms",
            "--ff",
            "--strict",
            "-t",
            "@smoke and not @slow",
            "-n",
            "^eat",
            "-f",
            "pretty,junit:out.xml",
            "--color",
            "never",
            "-vv",
            "features/",
        ])
        .unwrap();

        assert_eq!(opts.runner.concurrency, Some(4));
        assert_eq!(opts.runner.retry, Some(2));
        assert_eq!(opts.runner.retry_after, Some(Duration::from_millis(150)));
        assert!(opts.runner.fail_fast);
        assert!(opts.runner.strict);
        assert!(opts.tags_filter.is_some());
        assert!(opts.re_filter.unwrap().is_match("eat cucumbers"));
        assert_eq!(
            opts.format.unwrap().0,
            [Format::Pretty, Format::JUnit(Some(PathBuf::from("out.xml")))],
        );
        assert_eq!(opts.writer.color, Coloring::Never);
        assert_eq!(opts.writer.verbose, 2);
        assert_eq!(opts.paths, [PathBuf::from("features/")]);
    }

    #[test]
    fn rejects_zero_concurrency() {
        assert!(Opts::<super::Empty>::try_parse_from(["pickler", "-c", "0"]).is_err());
    }
}
