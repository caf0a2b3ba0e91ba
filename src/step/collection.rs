// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Ordered registry of step definitions and resolution of step texts.

use std::fmt;

use futures::future::LocalBoxFuture;
use itertools::Itertools as _;

use super::{
    binder::{self, ConversionError, ParamType, Value},
    context::Context,
    error::AmbiguousMatchError,
    location::Location,
    pattern::{Compiled, Pattern, PatternError},
};

/// Step handler: an async function over the [`World`] and the [`Context`].
///
/// [`World`]: crate::World
pub type Handler<W> =
    Box<dyn for<'a> Fn(&'a mut W, Context) -> LocalBoxFuture<'a, super::Result>>;

/// Policy of resolving a step text matching several step definitions.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MatchPolicy {
    /// Several matches resolve to [`Match::Ambiguous`].
    #[default]
    Ambiguous,

    /// The first registered definition wins, with the rest reported as
    /// [`Resolved::shadowed`].
    FirstMatch,
}

/// Registered step definition.
struct Definition<W> {
    pattern: Pattern,
    compiled: Compiled,
    location: Option<Location>,
    handler: Handler<W>,
}

/// Ordered collection of step definitions.
///
/// Definitions are tried in registration order and are never replaced, so
/// registering the same pattern twice is allowed and leads to ambiguity.
/// Keywords don't take part in matching: a `given` definition matches a
/// `Then` step as well.
pub struct Collection<W> {
    definitions: Vec<Definition<W>>,
    errors: Vec<PatternError>,
    policy: MatchPolicy,
}

impl<W> fmt::Debug for Collection<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field(
                "definitions",
                &self
                    .definitions
                    .iter()
                    .map(|d| (d.pattern.source(), d.location, format!("{:p}", d.handler)))
                    .collect::<Vec<_>>(),
            )
            .field("errors", &self.errors)
            .field("policy", &self.policy)
            .finish()
    }
}

// Implemented manually to omit redundant `W: Default` trait bound, imposed by
// `#[derive(Default)]`.
impl<W> Default for Collection<W> {
    fn default() -> Self {
        Self { definitions: Vec::new(), errors: Vec::new(), policy: MatchPolicy::default() }
    }
}

impl<W> Collection<W> {
    /// Creates a new empty [`Collection`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the [`MatchPolicy`] of this [`Collection`].
    #[must_use]
    pub fn match_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Registers a step definition matching the given `pattern`.
    ///
    /// Invalid patterns are not registered, and are reported by
    /// [`Collection::validate()`] instead.
    #[must_use]
    #[track_caller]
    pub fn step<P, F>(mut self, pattern: P, handler: F) -> Self
    where
        P: Into<Pattern>,
        F: for<'a> Fn(&'a mut W, Context) -> LocalBoxFuture<'a, super::Result>
            + 'static,
    {
        let location = Location::caller();
        self.push(pattern.into(), Some(location), Box::new(handler));
        self
    }

    /// Registers a [Given] step definition. Alias of [`Collection::step()`].
    ///
    /// [Given]: https://cucumber.io/docs/gherkin/reference#given
    #[must_use]
    #[track_caller]
    pub fn given<P, F>(self, pattern: P, handler: F) -> Self
    where
        P: Into<Pattern>,
        F: for<'a> Fn(&'a mut W, Context) -> LocalBoxFuture<'a, super::Result>
            + 'static,
    {
        self.step(pattern, handler)
    }

    /// Registers a [When] step definition. Alias of [`Collection::step()`].
    ///
    /// [When]: https://cucumber.io/docs/gherkin/reference#when
    #[must_use]
    #[track_caller]
    pub fn when<P, F>(self, pattern: P, handler: F) -> Self
    where
        P: Into<Pattern>,
        F: for<'a> Fn(&'a mut W, Context) -> LocalBoxFuture<'a, super::Result>
            + 'static,
    {
        self.step(pattern, handler)
    }

    /// Registers a [Then] step definition. Alias of [`Collection::step()`].
    ///
    /// [Then]: https://cucumber.io/docs/gherkin/reference#then
    #[must_use]
    #[track_caller]
    pub fn then<P, F>(self, pattern: P, handler: F) -> Self
    where
        P: Into<Pattern>,
        F: for<'a> Fn(&'a mut W, Context) -> LocalBoxFuture<'a, super::Result>
            + 'static,
    {
        self.step(pattern, handler)
    }

    /// Registers an already boxed [`Handler`].
    pub fn push(
        &mut self,
        pattern: Pattern,
        location: Option<Location>,
        handler: Handler<W>,
    ) {
        match pattern.compile() {
            Ok(compiled) => {
                self.definitions.push(Definition { pattern, compiled, location, handler });
            }
            Err(e) => self.errors.push(e),
        }
    }

    /// Number of registered step definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Indicates whether no step definition is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Checks that every registered pattern has compiled.
    ///
    /// # Errors
    ///
    /// With the first [`PatternError`] met during registration.
    pub fn validate(&self) -> Result<(), PatternError> {
        self.errors.first().cloned().map_or(Ok(()), Err)
    }

    /// Returns the sources of the patterns registered more than once.
    #[must_use]
    pub fn duplicates(&self) -> Vec<&str> {
        self.definitions
            .iter()
            .map(|d| (d.pattern.kind(), d.pattern.source()))
            .duplicates()
            .map(|(_, source)| source)
            .collect()
    }

    /// Resolves the given step `text` against every definition, in
    /// registration order.
    ///
    /// The result depends only on the `text` and the registration order.
    #[must_use]
    pub fn resolve(&self, text: &str) -> Match<'_, W> {
        let mut found = self
            .definitions
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.compiled.captures(text).map(|c| (i, d, c)));

        let Some((index, def, captures)) = found.next() else {
            return Match::Undefined;
        };
        let rest = found
            .map(|(_, d, _)| (d.pattern.source().to_owned(), d.location))
            .collect::<Vec<_>>();

        if !rest.is_empty() && self.policy == MatchPolicy::Ambiguous {
            let mut possible_matches = vec![(def.pattern.source().to_owned(), def.location)];
            possible_matches.extend(rest);
            return Match::Ambiguous(AmbiguousMatchError { possible_matches });
        }

        Match::Resolved(Resolved {
            index,
            pattern: &def.pattern,
            location: def.location,
            handler: &def.handler,
            captures: captures.into_iter().map(|c| c.map(str::to_owned)).collect(),
            params: &def.compiled.params,
            shadowed: rest,
        })
    }
}

/// Outcome of resolving a step text against a [`Collection`].
#[derive(Debug)]
pub enum Match<'me, W> {
    /// No definition matches.
    Undefined,

    /// Exactly one definition matches, or the first one under
    /// [`MatchPolicy::FirstMatch`].
    Resolved(Resolved<'me, W>),

    /// Several definitions match.
    Ambiguous(AmbiguousMatchError),
}

/// Step definition a step text has been resolved to.
pub struct Resolved<'me, W> {
    /// Registration index of the definition.
    pub index: usize,

    /// [`Pattern`] of the definition.
    pub pattern: &'me Pattern,

    /// Where the definition was registered.
    pub location: Option<Location>,

    /// Handler of the definition.
    pub handler: &'me Handler<W>,

    /// Captured text of every parameter.
    pub captures: Vec<Option<String>>,

    /// Declared [`ParamType`] of every parameter.
    pub params: &'me [ParamType],

    /// Other matching definitions, hidden by [`MatchPolicy::FirstMatch`].
    pub shadowed: Vec<(String, Option<Location>)>,
}

impl<W> fmt::Debug for Resolved<'_, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolved")
            .field("index", &self.index)
            .field("pattern", &self.pattern)
            .field("location", &self.location)
            .field("captures", &self.captures)
            .field("params", &self.params)
            .field("shadowed", &self.shadowed)
            .finish_non_exhaustive()
    }
}

impl<W> Resolved<'_, W> {
    /// Binds the [`Resolved::captures`] to their declared [`ParamType`]s.
    ///
    /// # Errors
    ///
    /// See [`ConversionError`] for details.
    pub fn bind(&self) -> Result<Vec<Value>, ConversionError> {
        let captures = self.captures.iter().map(Option::as_deref).collect::<Vec<_>>();
        binder::bind(self.params, &captures)
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt as _;

    use super::{Collection, Match, MatchPolicy};
    use crate::step::{Pattern, Value};

    fn noop(_: &mut (), _: crate::Context) -> futures::future::LocalBoxFuture<'_, crate::step::Result> {
        async { Ok(()) }.boxed_local()
    }

    fn overlapping() -> Collection<()> {
        Collection::new()
            .given(r"I eat (\d+) cucumbers", noop)
            .when(Pattern::expr("I eat {int} cucumbers"), noop)
            .then("something else", noop)
    }

    #[test]
    fn resolves_unique_match() {
        let steps = overlapping();
        let Match::Resolved(r) = steps.resolve("something else") else {
            panic!("expected resolved match");
        };

        assert_eq!(r.index, 2);
        assert!(r.shadowed.is_empty());
        assert!(r.location.is_some());
    }

    #[test]
    fn ignores_keywords() {
        let steps = Collection::<()>::new().then("a fridge", noop);

        assert!(matches!(steps.resolve("a fridge"), Match::Resolved(_)));
    }

    #[test]
    fn undefined_when_nothing_matches() {
        assert!(matches!(overlapping().resolve("I eat cucumbers"), Match::Undefined));
    }

    #[test]
    fn reports_every_candidate_as_ambiguous() {
        let steps = overlapping();
        let Match::Ambiguous(err) = steps.resolve("I eat 5 cucumbers") else {
            panic!("expected ambiguous match");
        };

        assert_eq!(
            err.patterns().collect::<Vec<_>>(),
            [r"I eat (\d+) cucumbers", "I eat {int} cucumbers"],
        );
    }

    #[test]
    fn first_match_policy_is_deterministic() {
        let steps = overlapping().match_policy(MatchPolicy::FirstMatch);

        for _ in 0..3 {
            let Match::Resolved(r) = steps.resolve("I eat 5 cucumbers") else {
                panic!("expected resolved match");
            };
            assert_eq!(r.index, 0);
            assert_eq!(r.shadowed.len(), 1);
            assert_eq!(r.shadowed[0].0, "I eat {int} cucumbers");
            assert_eq!(r.bind().unwrap(), [Value::Str("5".into())]);
        }
    }

    #[test]
    fn binds_expression_params() {
        let steps = Collection::<()>::new().given(Pattern::expr("I eat {int} cucumbers"), noop);

        let Match::Resolved(r) = steps.resolve("I eat 5 cucumbers") else {
            panic!("expected resolved match");
        };
        assert_eq!(r.bind().unwrap(), [Value::Int(5)]);
    }

    #[test]
    fn collects_registration_errors_and_duplicates() {
        let steps = Collection::<()>::new()
            .given("(", noop)
            .given("a fridge", noop)
            .when("a fridge", noop)
            .given(Pattern::expr("a fridge"), noop);

        assert!(steps.validate().is_err());
        assert_eq!(steps.len(), 3);
        assert_eq!(steps.duplicates(), ["a fridge"]);
    }
}
