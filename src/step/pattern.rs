// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Step patterns: anchored regular expressions or [Cucumber Expressions][1].
//!
//! [1]: https://github.com/cucumber/cucumber-expressions#readme

use cucumber_expressions::Expression;
use derive_more::with_trait::{Display, Error};
use regex::Regex;

use super::binder::ParamType;

/// Kind of a [`Pattern`].
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Kind {
    /// Regular expression, implicitly anchored at both ends.
    #[display("regex")]
    Regex,

    /// [Cucumber Expression][1].
    ///
    /// [1]: https://github.com/cucumber/cucumber-expressions#readme
    #[display("expression")]
    Expression,
}

/// Uncompiled pattern of a step definition.
///
/// Strings and [`Regex`]es convert into [`Kind::Regex`] patterns.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[display("{source}")]
pub struct Pattern {
    source: String,
    kind: Kind,
    params: Option<Vec<ParamType>>,
}

impl Pattern {
    /// Creates a new regular expression [`Pattern`].
    #[must_use]
    pub fn regex(source: impl Into<String>) -> Self {
        Self { source: source.into(), kind: Kind::Regex, params: None }
    }

    /// Creates a new [Cucumber Expression][1] [`Pattern`].
    ///
    /// [1]: https://github.com/cucumber/cucumber-expressions#readme
    #[must_use]
    pub fn expr(source: impl Into<String>) -> Self {
        Self { source: source.into(), kind: Kind::Expression, params: None }
    }

    /// Declares the [`ParamType`]s of the capture groups of a regex
    /// [`Pattern`], which are all [`ParamType::Any`] otherwise.
    #[must_use]
    pub fn with_params(mut self, params: impl IntoIterator<Item = ParamType>) -> Self {
        self.params = Some(params.into_iter().collect());
        self
    }

    /// Returns the source of this [`Pattern`] as written.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the [`Kind`] of this [`Pattern`].
    #[must_use]
    pub const fn kind(&self) -> Kind {
        self.kind
    }

    /// Compiles this [`Pattern`] into an anchored [`Regex`] with a
    /// [`ParamType`] for each of its parameters.
    ///
    /// # Errors
    ///
    /// See [`PatternError`] for details.
    pub fn compile(&self) -> Result<Compiled, PatternError> {
        match self.kind {
            Kind::Regex => {
                let regex = Regex::new(&format!("^(?:{})$", self.source))
                    .map_err(|e| PatternError::Regex {
                        pattern: self.source.clone(),
                        message: e.to_string(),
                    })?;
                let groups = regex.captures_len() - 1;
                let params = match &self.params {
                    Some(p) if p.len() != groups => {
                        return Err(PatternError::ParamCount {
                            pattern: self.source.clone(),
                            groups,
                            declared: p.len(),
                        });
                    }
                    Some(p) => p.clone(),
                    None => vec![ParamType::Any; groups],
                };
                let groups = (1..=params.len()).map(|i| vec![i]).collect();
                Ok(Compiled { regex, params, groups })
            }
            Kind::Expression => {
                let params = expression_params(&self.source)
                    .map_err(|name| PatternError::UnknownParameter {
                        pattern: self.source.clone(),
                        name,
                    })?;
                let regex = Expression::regex(self.source.as_str()).map_err(|e| {
                    PatternError::Expression {
                        pattern: self.source.clone(),
                        message: e.to_string(),
                    }
                })?;
                let groups = expression_groups(&regex);
                if groups.len() != params.len() {
                    return Err(PatternError::ParamCount {
                        pattern: self.source.clone(),
                        groups: groups.len(),
                        declared: params.len(),
                    });
                }
                Ok(Compiled { regex, params, groups })
            }
        }
    }
}

/// Compiled [`Pattern`].
#[derive(Clone, Debug)]
pub struct Compiled {
    /// Anchored [`Regex`] of the [`Pattern`].
    pub regex: Regex,

    /// [`ParamType`] of every parameter.
    pub params: Vec<ParamType>,

    /// Alternative capture group indices of every parameter.
    groups: Vec<Vec<usize>>,
}

impl Compiled {
    /// Matches the given `text`, returning the captured text of every
    /// parameter, or [`None`] if it doesn't match.
    #[must_use]
    pub fn captures<'t>(&self, text: &'t str) -> Option<Vec<Option<&'t str>>> {
        let caps = self.regex.captures(text)?;
        Some(
            self.groups
                .iter()
                .map(|alts| alts.iter().find_map(|i| caps.get(*i)).map(|m| m.as_str()))
                .collect(),
        )
    }
}

/// Groups the capture groups of an expanded Cucumber Expression by parameter.
///
/// Unnamed groups are parameters of their own, while groups named
/// `__<param>_<alt>` are alternatives of the same parameter (one per quote
/// style of a `{string}`).
fn expression_groups(regex: &Regex) -> Vec<Vec<usize>> {
    let mut groups: Vec<(Option<&str>, Vec<usize>)> = Vec::new();
    for (i, name) in regex.capture_names().enumerate().skip(1) {
        let param = name
            .and_then(|n| n.strip_prefix("__"))
            .and_then(|n| n.split_once('_'))
            .map(|(param, _)| param);
        match groups.last_mut() {
            Some((Some(last), alts)) if param == Some(*last) => alts.push(i),
            _ => groups.push((param, vec![i])),
        }
    }
    groups.into_iter().map(|(_, alts)| alts).collect()
}

impl From<&str> for Pattern {
    fn from(source: &str) -> Self {
        Self::regex(source)
    }
}

impl From<String> for Pattern {
    fn from(source: String) -> Self {
        Self::regex(source)
    }
}

impl From<Regex> for Pattern {
    fn from(regex: Regex) -> Self {
        Self::regex(regex.as_str())
    }
}

/// Error of compiling a [`Pattern`].
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
pub enum PatternError {
    /// Regular expression is malformed.
    #[display("`{pattern}`: {message}")]
    Regex {
        /// Source of the [`Pattern`].
        #[error(not(source))]
        pattern: String,

        /// Compilation error.
        #[error(not(source))]
        message: String,
    },

    /// Cucumber Expression is malformed.
    #[display("`{pattern}`: {message}")]
    Expression {
        /// Source of the [`Pattern`].
        #[error(not(source))]
        pattern: String,

        /// Parsing error.
        #[error(not(source))]
        message: String,
    },

    /// Cucumber Expression uses an unsupported parameter type.
    #[display("`{pattern}`: unknown parameter type `{{{name}}}`")]
    UnknownParameter {
        /// Source of the [`Pattern`].
        #[error(not(source))]
        pattern: String,

        /// Name of the parameter type.
        #[error(not(source))]
        name: String,
    },

    /// Number of declared [`ParamType`]s differs from the number of capture
    /// groups.
    #[display("`{pattern}`: {declared} parameter types declared for {groups} capture groups")]
    ParamCount {
        /// Source of the [`Pattern`].
        #[error(not(source))]
        pattern: String,

        /// Number of capture groups.
        #[error(not(source))]
        groups: usize,

        /// Number of declared [`ParamType`]s.
        #[error(not(source))]
        declared: usize,
    },
}

/// Collects the [`ParamType`]s of the `{parameters}` of a Cucumber Expression,
/// skipping the escaped `\{` ones.
///
/// # Errors
///
/// With the name of the first unsupported parameter type.
fn expression_params(source: &str) -> Result<Vec<ParamType>, String> {
    let mut params = Vec::new();
    let mut chars = source.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                _ = chars.next();
            }
            '{' => {
                let name = chars.by_ref().take_while(|c| *c != '}').collect::<String>();
                params.push(ParamType::from_expression(&name).ok_or(name)?);
            }
            _ => {}
        }
    }
    Ok(params)
}
