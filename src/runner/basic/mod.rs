// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Default runner executing [`Pickle`]s with bounded concurrency.
//!
//! [`Pickle`]: crate::Pickle

mod cli;
mod executor;
mod ordering;

use std::{fmt, panic, sync::Arc, time::Duration};

use futures::{
    channel::mpsc,
    future::{self, Either, LocalBoxFuture},
    stream::{self, FuturesUnordered, LocalBoxStream},
    FutureExt as _, StreamExt as _,
};
use gherkin::tagexpr::TagOperation;

use crate::{
    event::{self, HookType, Source},
    hook::Hooks,
    interceptor::{Interceptor, Interceptors},
    step,
    store::ResultStore,
    Event, Pickle, World,
};

use self::{executor::Executor, ordering::Queue};

#[doc(inline)]
pub use self::cli::{Cli, RetryOptions};

use super::Cancellation;

/// Asynchronous delay used between retry attempts.
pub type Sleep = Box<dyn Fn(Duration) -> LocalBoxFuture<'static, ()>>;

/// Default runner.
///
/// Runs up to [`Basic::max_concurrency()`] [`Pickle`]s at once, each one with
/// all its attempts owned by a single slot, and emits their events strictly
/// in input order.
///
/// [`Pickle`]: crate::Pickle
pub struct Basic<W> {
    max_concurrency: usize,
    retries: RetryOptions,
    retry_filter: Option<TagOperation>,
    fail_fast: bool,
    strict: bool,
    steps: step::Collection<W>,
    hooks: Hooks<W>,
    interceptors: Interceptors,
    cancellation: Cancellation,
    sleep: Sleep,
}

// Implemented manually to omit redundant `W: Default` trait bound, imposed by
// `#[derive(Default)]`.
impl<W> Default for Basic<W> {
    fn default() -> Self {
        Self {
            max_concurrency: 1,
            retries: RetryOptions::default(),
            retry_filter: None,
            fail_fast: false,
            strict: false,
            steps: step::Collection::new(),
            hooks: Hooks::default(),
            interceptors: Interceptors::default(),
            cancellation: Cancellation::new(),
            sleep: Box::new(executor::thread_sleep),
        }
    }
}

impl<W> fmt::Debug for Basic<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Basic")
            .field("max_concurrency", &self.max_concurrency)
            .field("retries", &self.retries)
            .field("retry_filter", &self.retry_filter)
            .field("fail_fast", &self.fail_fast)
            .field("strict", &self.strict)
            .field("steps", &self.steps)
            .field("hooks", &self.hooks)
            .field("interceptors", &self.interceptors)
            .field("cancellation", &self.cancellation)
            .finish_non_exhaustive()
    }
}

impl<W> Basic<W> {
    /// Creates a new [`Basic`] runner with no steps, running one [`Pickle`]
    /// at a time.
    ///
    /// [`Pickle`]: crate::Pickle
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of concurrently running [`Pickle`]s. Zero is
    /// treated as one.
    ///
    /// [`Pickle`]: crate::Pickle
    #[must_use]
    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// Sets the number of extra attempts of a [`Pickle`] failing with
    /// [`step::Failure::Retry`].
    ///
    /// [`Pickle`]: crate::Pickle
    #[must_use]
    pub fn retries(mut self, retries: usize) -> Self {
        self.retries.retries = retries;
        self
    }

    /// Sets the delay before each extra attempt.
    #[must_use]
    pub fn retry_after(mut self, after: Option<Duration>) -> Self {
        self.retries.after = after;
        self
    }

    /// Limits [`Basic::retries()`] to the [`Pickle`]s matching the given tag
    /// expression. `@retry` tags are honored regardless.
    ///
    /// [`Pickle`]: crate::Pickle
    #[must_use]
    pub fn retry_filter(mut self, filter: impl Into<Option<TagOperation>>) -> Self {
        self.retry_filter = filter.into();
        self
    }

    /// Stops dispatching [`Pickle`]s after the first failed one.
    ///
    /// [`Pickle`]: crate::Pickle
    #[must_use]
    pub fn fail_fast(mut self) -> Self {
        self.fail_fast = true;
        self
    }

    /// Treats undefined and pending steps as failures.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Replaces the step definitions of this runner.
    #[must_use]
    pub fn steps(mut self, steps: step::Collection<W>) -> Self {
        self.steps = steps;
        self
    }

    /// Replaces the hooks of this runner.
    #[must_use]
    pub fn hooks(mut self, hooks: Hooks<W>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Appends the given [`Interceptor`] to the chain.
    #[must_use]
    pub fn intercept(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Uses the given [`Cancellation`] signal for runs.
    #[must_use]
    pub fn cancellation(mut self, signal: Cancellation) -> Self {
        self.cancellation = signal;
        self
    }

    /// Sets the delay function used between retry attempts.
    ///
    /// By default, a background thread is slept, so no async runtime is
    /// required.
    #[must_use]
    pub fn sleep<F>(mut self, sleep: F) -> Self
    where
        F: Fn(Duration) -> LocalBoxFuture<'static, ()> + 'static,
    {
        self.sleep = Box::new(sleep);
        self
    }

    /// Overrides the configured options with the given [`Cli`] ones.
    #[must_use]
    pub fn with_cli(mut self, cli: &Cli) -> Self {
        if let Some(c) = cli.concurrency {
            self.max_concurrency = usize::try_from(c).unwrap_or(usize::MAX).max(1);
        }
        if let Some(r) = cli.retry {
            self.retries.retries = r;
        }
        if let Some(after) = cli.retry_after {
            self.retries.after = Some(after);
        }
        if let Some(filter) = &cli.retry_tag_filter {
            self.retry_filter = Some(filter.clone());
        }
        self.fail_fast |= cli.fail_fast;
        self.strict |= cli.strict;
        self
    }

    /// Returns the step definitions of this runner for registration.
    pub fn steps_mut(&mut self) -> &mut step::Collection<W> {
        &mut self.steps
    }

    /// Returns the hooks of this runner for registration.
    pub fn hooks_mut(&mut self) -> &mut Hooks<W> {
        &mut self.hooks
    }

    /// Returns the step definitions of this runner.
    #[must_use]
    pub const fn step_definitions(&self) -> &step::Collection<W> {
        &self.steps
    }

    /// Returns the [`Cancellation`] signal of this runner.
    #[must_use]
    pub const fn cancellation_signal(&self) -> &Cancellation {
        &self.cancellation
    }

    /// Indicates whether undefined and pending steps are failures.
    #[must_use]
    pub const fn is_strict(&self) -> bool {
        self.strict
    }
}

impl<W: World> Basic<W> {
    /// Executes the given [`Pickle`]s, recording their results into the
    /// `store` and emitting their events in input order.
    ///
    /// [`Pickle`]: crate::Pickle
    pub fn run(
        self,
        pickles: Vec<Source<Pickle>>,
        store: Arc<ResultStore>,
    ) -> LocalBoxStream<'static, Event<event::Run>> {
        let (sender, receiver) = mpsc::unbounded();

        stream::select(
            receiver.map(Either::Left),
            execute(self, pickles, store, sender).into_stream().map(Either::Right),
        )
        .filter_map(|r| {
            future::ready(match r {
                Either::Left(ev) => Some(ev),
                Either::Right(()) => None,
            })
        })
        .boxed_local()
    }
}

/// Executes [`Pickle`]s with bounded concurrency.
///
/// [`Pickle`]: crate::Pickle
async fn execute<W: World>(
    runner: Basic<W>,
    pickles: Vec<Source<Pickle>>,
    store: Arc<ResultStore>,
    sender: mpsc::UnboundedSender<Event<event::Run>>,
) {
    // Panics of steps and hooks are caught and reported by writers, so the
    // default hook printing them is silenced for the run.
    let panic_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));

    let Basic {
        max_concurrency,
        retries,
        retry_filter,
        fail_fast,
        strict,
        steps,
        hooks,
        interceptors,
        cancellation,
        sleep,
    } = runner;

    let mut queue = Queue::new(sender);
    store.register(&pickles);
    queue.send(Event::new(event::Run::Started { pickles: pickles.len() }));

    let mut stopped = !suite_hooks(&hooks, HookType::BeforeSuite, &store, &queue).await;
    if stopped {
        tracing::debug!("before suite hooks failed, aborting run");
    }

    let (pickle_sender, mut pickle_events) = mpsc::unbounded();
    let executor = Executor {
        collection: &steps,
        hooks: &hooks,
        interceptors: &interceptors,
        store: &store,
        cancellation: &cancellation,
        sleep: &sleep,
        sender: pickle_sender,
    };

    let mut running = FuturesUnordered::new();
    let mut next = 0;
    loop {
        while !stopped && !cancellation.is_cancelled() && running.len() < max_concurrency {
            let Some(pickle) = pickles.get(next) else {
                break;
            };
            let options = RetryOptions::from_tags(&pickle.tags, retries, retry_filter.as_ref());
            tracing::debug!(id = %pickle.id, index = next, ?options, "dispatching pickle");
            queue.dispatch(next, pickle.clone());
            running.push(executor.run_pickle(next, pickle.clone(), options));
            next += 1;
        }
        if running.is_empty() {
            break;
        }

        let happened = match future::select(running.next(), pickle_events.next()).await {
            Either::Left((finished, _)) => Either::Left(finished),
            Either::Right((ev, _)) => Either::Right(ev),
        };
        match happened {
            Either::Left(finished) => {
                while let Ok(Some((index, ev))) = pickle_events.try_next() {
                    queue.push(index, ev);
                }
                if let Some((index, status)) = finished {
                    queue.finish(index);
                    if fail_fast && !stopped && status.is_failure(strict) {
                        tracing::debug!(index, %status, "failing fast");
                        stopped = true;
                    }
                }
            }
            Either::Right(Some((index, ev))) => queue.push(index, ev),
            Either::Right(None) => {}
        }
    }

    for (index, pickle) in pickles.iter().enumerate().skip(next) {
        store.abort(&pickle.id);
        queue.dispatch(index, pickle.clone());
        queue.push(index, Event::new(event::Pickle::Aborted));
        queue.finish(index);
    }
    if next < pickles.len() {
        tracing::debug!(aborted = pickles.len() - next, "pickles were never dispatched");
    }
    queue.close();

    _ = suite_hooks(&hooks, HookType::AfterSuite, &store, &queue).await;
    queue.send(Event::new(event::Run::Finished(store.summary())));

    panic::set_hook(panic_hook);
}

/// Runs the before-suite or after-suite hooks, returning whether they passed.
async fn suite_hooks<W>(
    hooks: &Hooks<W>,
    which: HookType,
    store: &ResultStore,
    queue: &Queue,
) -> bool {
    if !hooks.has(which) {
        return true;
    }
    queue.send(Event::new(event::Run::Hook(which, event::Hook::Started)));
    match hooks.run_suite(which).await {
        Ok(()) => {
            queue.send(Event::new(event::Run::Hook(which, event::Hook::Passed)));
            true
        }
        Err(e) => {
            tracing::debug!(%which, error = %e, "suite hook failed");
            store.suite_hook_error(which, e.clone());
            queue.send(Event::new(event::Run::Hook(which, event::Hook::Failed(e))));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        convert::Infallible,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    use futures::{FutureExt as _, StreamExt as _};
    use gherkin::GherkinEnv;

    use super::Basic;
    use crate::{
        event::{self, Source},
        pickle,
        step::{self, Failure, Pattern},
        store::ResultStore,
        Event, Status, World,
    };

    #[derive(Debug, Default)]
    struct Basket(u64);

    impl World for Basket {
        type Error = Infallible;

        async fn new() -> Result<Self, Infallible> {
            Ok(Self::default())
        }
    }

    fn pickles(src: &str) -> Vec<Source<crate::Pickle>> {
        let feature = gherkin::Feature::parse(src, GherkinEnv::default()).unwrap();
        pickle::build(&[feature]).unwrap().into_iter().map(Source::new).collect()
    }

    fn steps() -> step::Collection<Basket> {
        step::Collection::new()
            .given(Pattern::expr("{int} apples"), |w: &mut Basket, ctx| {
                async move {
                    w.0 = ctx.arg(0)?;
                    Ok(())
                }
                .boxed_local()
            })
            .when("it breaks", |_: &mut Basket, _| {
                async { Err(anyhow::anyhow!("broken").into()) }.boxed_local()
            })
            .then(Pattern::expr("{int} left"), |w: &mut Basket, ctx| {
                async move {
                    let expected = ctx.arg::<u64>(0)?;
                    if w.0 != expected {
                        return Err(anyhow::anyhow!("got {}", w.0).into());
                    }
                    Ok(())
                }
                .boxed_local()
            })
    }

    async fn run(runner: Basic<Basket>, src: &str) -> (Vec<Event<event::Run>>, Arc<ResultStore>) {
        let store = Arc::new(ResultStore::new());
        let events = runner.run(pickles(src), Arc::clone(&store)).collect().await;
        (events, store)
    }

    #[tokio::test]
    async fn skips_after_first_failure() {
        let (_, store) = run(
            Basic::new().steps(steps()),
            "Feature: F\n  Scenario: S\n    Given 3 apples\n    When it breaks\n    Then 3 left\n",
        )
        .await;

        let results = store.pickles();
        let result = &results[0];
        assert_eq!(
            result.steps.iter().map(|s| s.status).collect::<Vec<_>>(),
            [Status::Passed, Status::Failed, Status::Skipped],
        );
        assert_eq!(result.status(), Some(Status::Failed));
    }

    #[tokio::test]
    async fn emits_run_lifecycle() {
        let (events, store) = run(
            Basic::new().steps(steps()),
            "Feature: F\n  Scenario: S\n    Given 3 apples\n    Then 3 left\n",
        )
        .await;

        assert!(matches!(events[0].value, event::Run::Started { pickles: 1 }));
        assert!(matches!(
            events[1].value,
            event::Run::Feature(_, event::Feature::Started),
        ));
        let event::Run::Finished(summary) = &events.last().unwrap().value else {
            panic!("expected `Run::Finished` last");
        };
        assert_eq!(summary.steps.passed, 2);
        assert_eq!(store.summary().pickles.passed, 1);
    }

    #[tokio::test]
    async fn retries_only_retryable_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let steps = step::Collection::<Basket>::new().given("it flakes", move |_: &mut Basket, _| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    return Err(Failure::retry(anyhow::anyhow!("flaky #{n}")));
                }
                Ok(())
            }
            .boxed_local()
        });

        let (events, store) = run(
            Basic::new().steps(steps).retries(3).sleep(|_| async {}.boxed_local()),
            "Feature: F\n  Scenario: S\n    Given it flakes\n",
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let results = store.pickles();
        let result = &results[0];
        assert_eq!(result.attempt, 3);
        assert_eq!(result.status(), Some(Status::Passed));
        let started = events
            .iter()
            .filter(|e| {
                matches!(
                    e.value,
                    event::Run::Feature(_, event::Feature::Pickle(_, event::Pickle::Started { .. })),
                )
            })
            .count();
        assert_eq!(started, 1);
    }

    #[tokio::test]
    async fn exhausted_retries_keep_last_status() {
        let steps = step::Collection::<Basket>::new().given("it flakes", |_: &mut Basket, _| {
            async { Err(Failure::retry(anyhow::anyhow!("always"))) }.boxed_local()
        });

        let (_, store) = run(
            Basic::new()
                .steps(steps)
                .retries(2)
                .retry_after(Some(Duration::from_millis(1))),
            "Feature: F\n  Scenario: S\n    Given it flakes\n",
        )
        .await;

        let results = store.pickles();
        let result = &results[0];
        assert_eq!(result.attempt, 3);
        assert_eq!(result.status(), Some(Status::Failed));
    }

    #[tokio::test]
    async fn fail_fast_aborts_undispatched() {
        let (_, store) = run(
            Basic::new().steps(steps()).fail_fast(),
            "Feature: F\n  Scenario: A\n    When it breaks\n  Scenario: B\n    Given 1 apples\n",
        )
        .await;

        let summary = store.summary();
        assert_eq!(summary.pickles.failed, 1);
        assert_eq!(summary.aborted, 1);
    }
}
