// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Compilation of [`gherkin::Feature`]s into [`Pickle`]s.

use std::collections::HashMap;

use derive_more::with_trait::{Display, Error};
use gherkin::LineCol;
use lazy_regex::regex;

use crate::{event::Source, tag};

use super::{Argument, DataTable, Pickle, PickleId, PickleStep, StepId};

/// Error of compiling [`gherkin::Feature`]s into [`Pickle`]s.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
pub enum BuildError {
    /// Placeholder doesn't name any column of the examples table.
    #[display(
        "Placeholder `<{name}>` of `{pickle}` at {}:{} doesn't name any \
         examples column",
        position.line,
        position.col,
    )]
    UnknownPlaceholder {
        /// Name of the placeholder, without angle brackets.
        #[error(not(source))]
        name: String,

        /// [`Pickle`] being built.
        #[error(not(source))]
        pickle: PickleId,

        /// Position of the step containing the placeholder.
        #[error(not(source))]
        position: LineCol,
    },

    /// Rows of a table have different widths.
    #[display("Table of `{uri}` at {}:{} has rows of different widths", position.line, position.col)]
    RaggedTable {
        /// Path or name of the feature.
        #[error(not(source))]
        uri: String,

        /// Position of the table.
        #[error(not(source))]
        position: LineCol,
    },

    /// Examples block has no table header.
    #[display("Examples of `{uri}` at {}:{} have no table header", position.line, position.col)]
    EmptyExamples {
        /// Path or name of the feature.
        #[error(not(source))]
        uri: String,

        /// Position of the examples block.
        #[error(not(source))]
        position: LineCol,
    },
}

/// Compiles the given [`gherkin::Feature`]s into [`Pickle`]s, in document
/// order: feature scenarios first, then the scenarios of every rule.
///
/// # Errors
///
/// See [`BuildError`] for details. No [`Pickle`] is returned if any of the
/// features is malformed.
pub fn build(features: &[gherkin::Feature]) -> Result<Vec<Pickle>, BuildError> {
    let mut builder = Builder::default();
    for feature in features {
        builder.feature(feature)?;
    }
    Ok(builder.pickles)
}

/// State of a single [`build()`] call.
#[derive(Debug, Default)]
struct Builder {
    /// Already built [`Pickle`]s.
    pickles: Vec<Pickle>,

    /// Number of times every base [`PickleId`] has been produced.
    ids: HashMap<String, usize>,
}

/// Values of a single examples row, keyed by column name.
type Row<'a> = HashMap<&'a str, &'a str>;

/// Scope a scenario is compiled in.
struct Scope<'a> {
    uri: &'a str,
    feature: &'a Source<gherkin::Feature>,
    rule: Option<&'a Source<gherkin::Rule>>,
    background: Vec<&'a gherkin::Step>,
}

impl Builder {
    fn feature(&mut self, feature: &gherkin::Feature) -> Result<(), BuildError> {
        let uri = feature.path.as_ref().map_or_else(
            || feature.name.clone(),
            |p| p.display().to_string(),
        );
        let source = Source::new(feature.clone());
        let feature_bg = feature
            .background
            .iter()
            .flat_map(|b| &b.steps)
            .collect::<Vec<_>>();

        let scope = Scope {
            uri: &uri,
            feature: &source,
            rule: None,
            background: feature_bg.clone(),
        };
        for scenario in &source.scenarios {
            self.scenario(&scope, scenario)?;
        }

        for rule in &source.rules {
            let rule = Source::new(rule.clone());
            let scope = Scope {
                uri: &uri,
                feature: &source,
                rule: Some(&rule),
                background: feature_bg
                    .iter()
                    .copied()
                    .chain(rule.background.iter().flat_map(|b| &b.steps))
                    .collect(),
            };
            for scenario in &rule.scenarios {
                self.scenario(&scope, scenario)?;
            }
        }
        Ok(())
    }

    fn scenario(
        &mut self,
        scope: &Scope<'_>,
        scenario: &gherkin::Scenario,
    ) -> Result<(), BuildError> {
        let source = Source::new(scenario.clone());

        if scenario.examples.is_empty() {
            let id = self.next_id(scope.uri, scenario.position.line);
            let pickle =
                self.pickle(scope, &source, id, None, &[], scenario.position)?;
            self.pickles.push(pickle);
            return Ok(());
        }

        let mut row_idx = 0;
        for examples in &scenario.examples {
            let table = examples
                .table
                .as_ref()
                .filter(|t| !t.rows.is_empty())
                .ok_or_else(|| BuildError::EmptyExamples {
                    uri: scope.uri.to_owned(),
                    position: examples.position,
                })?;
            let (header, values) = table.rows.split_first().ok_or_else(|| {
                BuildError::EmptyExamples {
                    uri: scope.uri.to_owned(),
                    position: examples.position,
                }
            })?;
            if values.iter().any(|r| r.len() != header.len()) {
                return Err(BuildError::RaggedTable {
                    uri: scope.uri.to_owned(),
                    position: table.position,
                });
            }

            for (n, values) in values.iter().enumerate() {
                let row = header
                    .iter()
                    .map(String::as_str)
                    .zip(values.iter().map(String::as_str))
                    .collect::<Row<'_>>();
                let position = LineCol {
                    line: table.position.line + 1 + n,
                    col: table.position.col,
                };
                let id = self.next_id(scope.uri, position.line);
                let pickle = self.pickle(
                    scope,
                    &source,
                    id,
                    Some((row_idx, &row)),
                    &examples.tags,
                    position,
                )?;
                self.pickles.push(pickle);
                row_idx += 1;
            }
        }
        Ok(())
    }

    fn pickle(
        &self,
        scope: &Scope<'_>,
        scenario: &Source<gherkin::Scenario>,
        id: PickleId,
        row: Option<(usize, &Row<'_>)>,
        examples_tags: &[String],
        position: LineCol,
    ) -> Result<Pickle, BuildError> {
        let name = match row {
            Some((_, values)) => substitute_lenient(&scenario.name, values),
            None => scenario.name.clone(),
        };

        let background = scope
            .background
            .iter()
            .map(|s| (*s, true, None::<&Row<'_>>));
        let own = scenario
            .steps
            .iter()
            .map(|s| (s, false, row.map(|(_, r)| r)));

        let steps = background
            .chain(own)
            .enumerate()
            .map(|(idx, (step, is_background, values))| {
                self.step(scope.uri, &id, idx, step, is_background, values)
                    .map(Source::new)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut tags = Vec::<String>::new();
        let all_tags = scope
            .feature
            .tags
            .iter()
            .chain(scope.rule.iter().flat_map(|r| &r.tags))
            .chain(&scenario.tags)
            .chain(examples_tags);
        for t in all_tags {
            let t = tag::normalize(t);
            if !tags.iter().any(|seen| seen == t) {
                tags.push(t.to_owned());
            }
        }

        Ok(Pickle {
            id,
            name,
            feature: scope.feature.clone(),
            rule: scope.rule.cloned(),
            scenario: scenario.clone(),
            steps,
            tags,
            example_row: row.map(|(idx, _)| idx),
            position,
        })
    }

    fn step(
        &self,
        uri: &str,
        pickle: &PickleId,
        idx: usize,
        step: &gherkin::Step,
        is_background: bool,
        row: Option<&Row<'_>>,
    ) -> Result<PickleStep, BuildError> {
        let subst = |s: &str| match row {
            Some(values) => substitute(s, values, pickle, step.position),
            None => Ok(s.to_owned()),
        };

        let argument = if let Some(table) = &step.table {
            let width = table.rows.first().map_or(0, Vec::len);
            if table.rows.iter().any(|r| r.len() != width) {
                return Err(BuildError::RaggedTable {
                    uri: uri.to_owned(),
                    position: table.position,
                });
            }
            let rows = table
                .rows
                .iter()
                .map(|r| r.iter().map(|c| subst(c)).collect())
                .collect::<Result<_, _>>()?;
            Some(Argument::Table(DataTable::new(rows)))
        } else if let Some(doc) = &step.docstring {
            Some(Argument::DocString(subst(doc)?))
        } else {
            None
        };

        Ok(PickleStep {
            id: StepId::new(pickle, idx),
            keyword: step.keyword.clone(),
            ty: step.ty,
            text: subst(&step.value)?,
            argument,
            is_background,
            position: step.position,
        })
    }

    /// Produces a unique [`PickleId`] for the given `uri` and `line`, suffixing
    /// it with `#<n>` on collisions.
    fn next_id(&mut self, uri: &str, line: usize) -> PickleId {
        let base = format!("{uri}:{line}");
        let seen = self.ids.entry(base.clone()).or_default();
        *seen += 1;
        if *seen == 1 {
            PickleId::from(base)
        } else {
            PickleId::from(format!("{base}#{}", *seen - 1))
        }
    }
}

/// Substitutes every `<placeholder>` in `s` with the value of its column.
///
/// # Errors
///
/// If a placeholder names no column of the row.
fn substitute(
    s: &str,
    row: &Row<'_>,
    pickle: &PickleId,
    position: LineCol,
) -> Result<String, BuildError> {
    let mut err = None;
    let replaced = regex!(r"<([^>\s]+)>")
        .replace_all(s, |cap: &regex::Captures<'_>| {
            let name = &cap[1];
            row.get(name).copied().unwrap_or_else(|| {
                if err.is_none() {
                    err = Some(BuildError::UnknownPlaceholder {
                        name: name.to_owned(),
                        pickle: pickle.clone(),
                        position,
                    });
                }
                ""
            })
        })
        .into_owned();
    err.map_or(Ok(replaced), Err)
}

/// Substitutes the known `<placeholder>`s in `s`, leaving the unknown ones as
/// is.
fn substitute_lenient(s: &str, row: &Row<'_>) -> String {
    regex!(r"<([^>\s]+)>")
        .replace_all(s, |cap: &regex::Captures<'_>| {
            row.get(&cap[1])
                .map_or_else(|| cap[0].to_owned(), |v| (*v).to_owned())
        })
        .into_owned()
}
