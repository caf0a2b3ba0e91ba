// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Flat executable cases compiled out of [`gherkin::Feature`]s.
//!
//! Every plain [`gherkin::Scenario`] becomes one [`Pickle`], and every row of
//! every [`gherkin::Examples`] table of a [Scenario Outline][1] becomes one
//! [`Pickle`] with its placeholders substituted. Background steps of the
//! feature and of the enclosing [`gherkin::Rule`] are prepended.
//!
//! [1]: https://cucumber.io/docs/gherkin/reference#scenario-outline

mod builder;
pub mod table;

use derive_more::with_trait::{AsRef, Display, From};
use gherkin::{LineCol, StepType};

use crate::event::Source;

#[doc(inline)]
pub use self::{
    builder::{build, BuildError},
    table::DataTable,
};

/// Stable identity of a [`Pickle`] inside a run: `<uri>:<line>`, where
/// `<uri>` is the path (or the name) of the feature and `<line>` is the line of
/// the scenario, or of the examples row for outlines.
#[derive(AsRef, Clone, Debug, Display, Eq, From, Hash, Ord, PartialEq, PartialOrd)]
#[as_ref(forward)]
pub struct PickleId(String);

impl PickleId {
    /// Returns this [`PickleId`] as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Stable identity of a [`PickleStep`]: `<pickle id>;<index>`.
#[derive(AsRef, Clone, Debug, Display, Eq, From, Hash, Ord, PartialEq, PartialOrd)]
#[as_ref(forward)]
pub struct StepId(String);

impl StepId {
    /// Creates the [`StepId`] of the `index`th step of the given [`Pickle`].
    #[must_use]
    pub fn new(pickle: &PickleId, index: usize) -> Self {
        Self(format!("{pickle};{index}"))
    }

    /// Returns this [`StepId`] as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Executable case: one scenario, or one examples row of an outline.
#[derive(Clone, Debug)]
pub struct Pickle {
    /// Identity of this [`Pickle`].
    pub id: PickleId,

    /// Scenario name with placeholders substituted.
    pub name: String,

    /// [`gherkin::Feature`] this [`Pickle`] comes from.
    pub feature: Source<gherkin::Feature>,

    /// [`gherkin::Rule`] enclosing the scenario, if any.
    pub rule: Option<Source<gherkin::Rule>>,

    /// Scenario (or outline) this [`Pickle`] comes from.
    pub scenario: Source<gherkin::Scenario>,

    /// Steps to execute: feature background, rule background, then own ones.
    pub steps: Vec<Source<PickleStep>>,

    /// Tags of the feature, rule, scenario and examples, without the leading
    /// `@` and deduplicated.
    pub tags: Vec<String>,

    /// Zero-based index of the examples row across all the examples blocks of
    /// the outline.
    pub example_row: Option<usize>,

    /// Position of the scenario, or of the examples row.
    pub position: LineCol,
}

impl Pickle {
    /// Indicates whether this [`Pickle`] carries the given tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = crate::tag::normalize(tag);
        self.tags.iter().any(|t| t == tag)
    }
}

/// Single step of a [`Pickle`].
#[derive(Clone, Debug)]
pub struct PickleStep {
    /// Identity of this [`PickleStep`].
    pub id: StepId,

    /// Keyword as written in the feature (`Given `, `And `, ...).
    pub keyword: String,

    /// Resolved [`StepType`], with `And`/`But` inheriting the previous one.
    pub ty: StepType,

    /// Step text with placeholders substituted.
    pub text: String,

    /// Doc-string or data table argument.
    pub argument: Option<Argument>,

    /// Whether this step comes from a background.
    pub is_background: bool,

    /// Position of the step in its feature file.
    pub position: LineCol,
}

impl PickleStep {
    /// Returns the data table argument, if any.
    #[must_use]
    pub const fn table(&self) -> Option<&DataTable> {
        match &self.argument {
            Some(Argument::Table(t)) => Some(t),
            Some(Argument::DocString(_)) | None => None,
        }
    }

    /// Returns the doc-string argument, if any.
    #[must_use]
    pub fn docstring(&self) -> Option<&str> {
        match &self.argument {
            Some(Argument::DocString(s)) => Some(s),
            Some(Argument::Table(_)) | None => None,
        }
    }
}

/// Argument attached to a [`PickleStep`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Argument {
    /// Data table.
    Table(DataTable),

    /// Doc-string.
    DocString(String),
}
