// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Callbacks executed around the suite, every [`Pickle`] and every step.
//!
//! Every hook registered for a boundary runs, in registration order, even if
//! a previous one has failed. Errors and panics are both caught.

use std::{fmt, panic::AssertUnwindSafe};

use futures::{future::LocalBoxFuture, FutureExt as _};

use crate::{
    event::{coerce_panic, HookError, HookType},
    Pickle, PickleStep, Status,
};

/// Result of a hook.
pub type Result = anyhow::Result<()>;

/// Before-suite or after-suite hook.
pub type Suite = Box<dyn Fn() -> LocalBoxFuture<'static, Result>>;

/// Before-scenario hook.
pub type BeforeScenario<W> =
    Box<dyn for<'a> Fn(&'a Pickle, &'a mut W) -> LocalBoxFuture<'a, Result>>;

/// After-scenario hook, given the aggregated [`Status`] of the steps.
pub type AfterScenario<W> = Box<
    dyn for<'a> Fn(&'a Pickle, Status, &'a mut W) -> LocalBoxFuture<'a, Result>,
>;

/// Before-step hook.
pub type BeforeStep<W> =
    Box<dyn for<'a> Fn(&'a PickleStep, &'a mut W) -> LocalBoxFuture<'a, Result>>;

/// After-step hook, given the [`Status`] of the step.
pub type AfterStep<W> = Box<
    dyn for<'a> Fn(&'a PickleStep, Status, &'a mut W) -> LocalBoxFuture<'a, Result>,
>;

/// Ordered hooks of every [`HookType`].
pub struct Hooks<W> {
    before_suite: Vec<Suite>,
    after_suite: Vec<Suite>,
    before_scenario: Vec<BeforeScenario<W>>,
    after_scenario: Vec<AfterScenario<W>>,
    before_step: Vec<BeforeStep<W>>,
    after_step: Vec<AfterStep<W>>,
}

// Implemented manually to omit redundant `W: Default` trait bound, imposed by
// `#[derive(Default)]`.
impl<W> Default for Hooks<W> {
    fn default() -> Self {
        Self {
            before_suite: Vec::new(),
            after_suite: Vec::new(),
            before_scenario: Vec::new(),
            after_scenario: Vec::new(),
            before_step: Vec::new(),
            after_step: Vec::new(),
        }
    }
}

impl<W> fmt::Debug for Hooks<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before_suite", &self.before_suite.len())
            .field("after_suite", &self.after_suite.len())
            .field("before_scenario", &self.before_scenario.len())
            .field("after_scenario", &self.after_scenario.len())
            .field("before_step", &self.before_step.len())
            .field("after_step", &self.after_step.len())
            .finish()
    }
}

impl<W> Hooks<W> {
    /// Registers a before-suite hook.
    pub fn before_suite<F>(&mut self, hook: F)
    where
        F: Fn() -> LocalBoxFuture<'static, Result> + 'static,
    {
        self.before_suite.push(Box::new(hook));
    }

    /// Registers an after-suite hook.
    pub fn after_suite<F>(&mut self, hook: F)
    where
        F: Fn() -> LocalBoxFuture<'static, Result> + 'static,
    {
        self.after_suite.push(Box::new(hook));
    }

    /// Registers a before-scenario hook.
    pub fn before_scenario<F>(&mut self, hook: F)
    where
        F: for<'a> Fn(&'a Pickle, &'a mut W) -> LocalBoxFuture<'a, Result> + 'static,
    {
        self.before_scenario.push(Box::new(hook));
    }

    /// Registers an after-scenario hook.
    pub fn after_scenario<F>(&mut self, hook: F)
    where
        F: for<'a> Fn(&'a Pickle, Status, &'a mut W) -> LocalBoxFuture<'a, Result>
            + 'static,
    {
        self.after_scenario.push(Box::new(hook));
    }

    /// Registers a before-step hook.
    pub fn before_step<F>(&mut self, hook: F)
    where
        F: for<'a> Fn(&'a PickleStep, &'a mut W) -> LocalBoxFuture<'a, Result>
            + 'static,
    {
        self.before_step.push(Box::new(hook));
    }

    /// Registers an after-step hook.
    pub fn after_step<F>(&mut self, hook: F)
    where
        F: for<'a> Fn(&'a PickleStep, Status, &'a mut W) -> LocalBoxFuture<'a, Result>
            + 'static,
    {
        self.after_step.push(Box::new(hook));
    }

    /// Indicates whether any hook is registered for the given [`HookType`].
    #[must_use]
    pub fn has(&self, which: HookType) -> bool {
        match which {
            HookType::BeforeSuite => !self.before_suite.is_empty(),
            HookType::AfterSuite => !self.after_suite.is_empty(),
            HookType::BeforeScenario => !self.before_scenario.is_empty(),
            HookType::AfterScenario => !self.after_scenario.is_empty(),
            HookType::BeforeStep => !self.before_step.is_empty(),
            HookType::AfterStep => !self.after_step.is_empty(),
        }
    }

    /// Runs every before-suite or after-suite hook.
    ///
    /// # Errors
    ///
    /// With the first failure, after every hook has run.
    pub async fn run_suite(&self, which: HookType) -> std::result::Result<(), HookError> {
        let hooks = match which {
            HookType::BeforeSuite => &self.before_suite,
            HookType::AfterSuite => &self.after_suite,
            HookType::BeforeScenario
            | HookType::AfterScenario
            | HookType::BeforeStep
            | HookType::AfterStep => return Ok(()),
        };
        let mut first = None;
        for hook in hooks {
            record(&mut first, catch(hook()).await);
        }
        first.map_or(Ok(()), Err)
    }

    /// Runs every before-scenario hook.
    ///
    /// # Errors
    ///
    /// With the first failure, after every hook has run.
    pub async fn run_before_scenario(
        &self,
        pickle: &Pickle,
        world: &mut W,
    ) -> std::result::Result<(), HookError> {
        let mut first = None;
        for hook in &self.before_scenario {
            record(&mut first, catch(hook(pickle, world)).await);
        }
        first.map_or(Ok(()), Err)
    }

    /// Runs every after-scenario hook.
    ///
    /// # Errors
    ///
    /// With the first failure, after every hook has run.
    pub async fn run_after_scenario(
        &self,
        pickle: &Pickle,
        status: Status,
        world: &mut W,
    ) -> std::result::Result<(), HookError> {
        let mut first = None;
        for hook in &self.after_scenario {
            record(&mut first, catch(hook(pickle, status, world)).await);
        }
        first.map_or(Ok(()), Err)
    }

    /// Runs every before-step hook.
    ///
    /// # Errors
    ///
    /// With the first failure, after every hook has run.
    pub async fn run_before_step(
        &self,
        step: &PickleStep,
        world: &mut W,
    ) -> std::result::Result<(), HookError> {
        let mut first = None;
        for hook in &self.before_step {
            record(&mut first, catch(hook(step, world)).await);
        }
        first.map_or(Ok(()), Err)
    }

    /// Runs every after-step hook.
    ///
    /// # Errors
    ///
    /// With the first failure, after every hook has run.
    pub async fn run_after_step(
        &self,
        step: &PickleStep,
        status: Status,
        world: &mut W,
    ) -> std::result::Result<(), HookError> {
        let mut first = None;
        for hook in &self.after_step {
            record(&mut first, catch(hook(step, status, world)).await);
        }
        first.map_or(Ok(()), Err)
    }
}

/// Awaits the given hook, catching its panic.
async fn catch(fut: LocalBoxFuture<'_, Result>) -> std::result::Result<(), HookError> {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(HookError::from(e)),
        Err(info) => Err(HookError::Panic(coerce_panic(&*info))),
    }
}

/// Keeps the first failure only, logging the others.
fn record(first: &mut Option<HookError>, res: std::result::Result<(), HookError>) {
    if let Err(e) = res {
        if first.is_some() {
            tracing::debug!(error = %e, "subsequent hook failure");
        } else {
            *first = Some(e);
        }
    }
}
