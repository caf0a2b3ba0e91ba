// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Execution of a single [`Pickle`] with all its attempts.

use std::{
    panic::AssertUnwindSafe,
    sync::Arc,
    time::{Duration, Instant},
};

use futures::{channel::mpsc, FutureExt as _};
use gherkin::StepType;
use tracing::Instrument as _;

use crate::{
    event::{self, coerce_panic, HookError, HookType, Retries, Source, StepError},
    hook::Hooks,
    interceptor::{Interceptor as _, Interceptors},
    runner::Cancellation,
    step::{self, context::Attachments, snippet, Context, Failure, Match},
    store::{ResultStore, StepResult},
    Event, Pickle, PickleStep, Status, World,
};

use super::{RetryOptions, Sleep};

/// Sender of the events of the [`Pickle`] at the given input index.
pub(super) type EventSender = mpsc::UnboundedSender<(usize, Event<event::Pickle>)>;

/// Runs [`Pickle`]s, recording their results into a [`ResultStore`] and
/// notifying about their events.
pub(super) struct Executor<'r, W> {
    pub(super) collection: &'r step::Collection<W>,
    pub(super) hooks: &'r Hooks<W>,
    pub(super) interceptors: &'r Interceptors,
    pub(super) store: &'r ResultStore,
    pub(super) cancellation: &'r Cancellation,
    pub(super) sleep: &'r Sleep,
    pub(super) sender: EventSender,
}

/// Events of a single attempt.
///
/// Events of an attempt that may still be retried are held back, so only the
/// final attempt is ever reported.
struct Attempt<'s> {
    index: usize,
    sender: &'s EventSender,
    held: Option<Vec<Event<event::Pickle>>>,
}

impl Attempt<'_> {
    fn send(&mut self, event: event::Pickle) {
        let event = Event::new(event);
        match &mut self.held {
            Some(held) => held.push(event),
            None => {
                _ = self.sender.unbounded_send((self.index, event));
            }
        }
    }

    fn step(&mut self, step: &Source<PickleStep>, event: event::Step) {
        self.send(event::Pickle::step(step.clone(), event));
    }

    fn hook(&mut self, which: HookType, event: event::Hook) {
        self.send(event::Pickle::Hook(which, event));
    }

    fn flush(self) {
        for ev in self.held.into_iter().flatten() {
            _ = self.sender.unbounded_send((self.index, ev));
        }
    }
}

/// Outcome of a single attempt.
struct Outcome {
    status: Status,
    retryable: bool,
}

impl<W: World> Executor<'_, W> {
    /// Runs every attempt of the given [`Pickle`], returning its final
    /// aggregated [`Status`].
    pub(super) async fn run_pickle(
        &self,
        index: usize,
        pickle: Source<Pickle>,
        options: RetryOptions,
    ) -> (usize, Status) {
        let mut retries = Retries::initial(options.retries);
        loop {
            let mut attempt = Attempt {
                index,
                sender: &self.sender,
                held: (retries.left > 0).then(Vec::new),
            };
            let span = tracing::debug_span!(
                "pickle",
                id = %pickle.id,
                attempt = retries.attempt(),
            );
            let outcome = self
                .run_attempt(&pickle, retries, options.retries > 0, &mut attempt)
                .instrument(span)
                .await;

            if outcome.retryable && !self.cancellation.is_cancelled() {
                if let Some(next) = retries.next_try() {
                    tracing::debug!(
                        id = %pickle.id,
                        attempt = next.attempt(),
                        left = next.left,
                        "retrying pickle",
                    );
                    if let Some(after) = options.after {
                        (self.sleep)(after).await;
                    }
                    retries = next;
                    continue;
                }
            }

            self.store.finish(&pickle.id, outcome.status);
            attempt.send(event::Pickle::Finished(outcome.status));
            attempt.flush();
            return (index, outcome.status);
        }
    }

    async fn run_attempt(
        &self,
        pickle: &Source<Pickle>,
        retries: Retries,
        retried: bool,
        out: &mut Attempt<'_>,
    ) -> Outcome {
        let attempt = retries.attempt();
        self.store.start(&pickle.id, attempt);
        out.send(event::Pickle::Started { retries: retried.then_some(retries) });

        let world = match AssertUnwindSafe(W::new()).catch_unwind().await {
            Ok(Ok(w)) => Ok(w),
            Ok(Err(e)) => Err(HookError::WorldInit(e.to_string())),
            Err(info) => Err(HookError::Panic(coerce_panic(&*info))),
        };
        let mut world = match world {
            Ok(w) => w,
            Err(e) => {
                tracing::debug!(id = %pickle.id, error = %e, "world initialization failed");
                out.hook(HookType::BeforeScenario, event::Hook::Started);
                self.hook_failed(pickle, HookType::BeforeScenario, e, out);
                for step in &pickle.steps {
                    self.skip(step, attempt, out);
                }
                return Outcome { status: Status::Failed, retryable: false };
            }
        };

        let mut before_failed = false;
        if self.hooks.has(HookType::BeforeScenario) {
            out.hook(HookType::BeforeScenario, event::Hook::Started);
            match self.hooks.run_before_scenario(pickle, &mut world).await {
                Ok(()) => out.hook(HookType::BeforeScenario, event::Hook::Passed),
                Err(e) => {
                    self.hook_failed(pickle, HookType::BeforeScenario, e, out);
                    before_failed = true;
                }
            }
        }

        let mut statuses = Vec::with_capacity(pickle.steps.len());
        let mut retryable = false;
        let mut stop = before_failed;
        for step in &pickle.steps {
            if stop || self.cancellation.is_cancelled() {
                self.skip(step, attempt, out);
                statuses.push(Status::Skipped);
                continue;
            }

            let result = self.run_step(step, &mut world, attempt, out).await;
            stop = result.status != Status::Passed;
            retryable |= result.status == Status::Failed
                && result.error.as_ref().is_some_and(StepError::is_retryable);
            statuses.push(result.status);
            self.store.put(result);
        }

        let mut status = Status::aggregate(statuses);
        if before_failed {
            status = status.worst(Status::Failed);
        }

        if self.hooks.has(HookType::AfterScenario) {
            out.hook(HookType::AfterScenario, event::Hook::Started);
            match self.hooks.run_after_scenario(pickle, status, &mut world).await {
                Ok(()) => out.hook(HookType::AfterScenario, event::Hook::Passed),
                Err(e) => {
                    self.hook_failed(pickle, HookType::AfterScenario, e, out);
                    status = status.worst(Status::Failed);
                }
            }
        }

        Outcome { status, retryable }
    }

    async fn run_step(
        &self,
        step: &Source<PickleStep>,
        world: &mut W,
        attempt: usize,
        out: &mut Attempt<'_>,
    ) -> StepResult {
        let started = Instant::now();
        let attachments = Attachments::default();
        let mut pattern = None;
        let mut location = None;
        out.step(step, event::Step::Started);

        let (status, error) = if let Some(error) =
            self.step_hook(HookType::BeforeStep, step, None, world, out).await
        {
            (Status::Failed, Some(error))
        } else {
            match self.collection.resolve(&step.text) {
                Match::Undefined => {
                    tracing::debug!(step = %step.id, text = %step.text, "step is undefined");
                    let keyword = match step.ty {
                        StepType::Given => "Given",
                        StepType::When => "When",
                        StepType::Then => "Then",
                    };
                    let snippet = snippet::render(keyword, &step.text);
                    (Status::Undefined, Some(StepError::NotFound { snippet }))
                }
                Match::Ambiguous(e) => {
                    tracing::debug!(step = %step.id, matches = e.possible_matches.len(), "step is ambiguous");
                    (Status::Ambiguous, Some(StepError::AmbiguousMatch(e)))
                }
                Match::Resolved(resolved) => {
                    if !resolved.shadowed.is_empty() {
                        tracing::debug!(
                            step = %step.id,
                            pattern = resolved.pattern.source(),
                            shadowed = ?resolved.shadowed,
                            "first match shadows other definitions",
                        );
                    }
                    pattern = Some(resolved.pattern.source().to_owned());
                    location = resolved.location;
                    out.step(
                        step,
                        event::Step::Matched {
                            pattern: resolved.pattern.source().to_owned(),
                            location: resolved.location,
                        },
                    );

                    match resolved.bind() {
                        Err(e) => (Status::Failed, Some(StepError::Conversion(e))),
                        Ok(args) => {
                            let ctx = Context::new(
                                step.clone(),
                                resolved.captures.clone(),
                                args,
                                attachments.clone(),
                            );
                            let fut = (resolved.handler)(world, ctx);
                            match AssertUnwindSafe(fut).catch_unwind().await {
                                Ok(Ok(())) => (Status::Passed, None),
                                Ok(Err(Failure::Error(e))) => {
                                    (Status::Failed, Some(StepError::Failed(Arc::new(e))))
                                }
                                Ok(Err(Failure::Pending(msg))) => {
                                    (Status::Pending, Some(StepError::Pending(msg)))
                                }
                                Ok(Err(Failure::Retry(e))) => {
                                    (Status::Failed, Some(StepError::Retryable(Arc::new(e))))
                                }
                                Err(info) => {
                                    (Status::Failed, Some(StepError::Panic(coerce_panic(&*info))))
                                }
                            }
                        }
                    }
                }
            }
        };

        let (mut status, mut error) = if self.interceptors.is_empty() {
            (status, error)
        } else {
            self.interceptors.intercept(step, status, error)
        };

        if let Some(e) = self.step_hook(HookType::AfterStep, step, Some(status), world, out).await {
            if status == Status::Passed || error.is_none() {
                error = Some(e);
            }
            status = status.worst(Status::Failed);
        }

        out.step(step, event::Step::outcome(status, error.clone()));

        StepResult {
            step: step.clone(),
            status,
            error,
            duration: started.elapsed(),
            attachments: attachments.take(),
            pattern,
            location,
            attempt,
        }
    }

    /// Runs before-step (no `status`) or after-step hooks, returning the
    /// [`StepError`] of their failure.
    async fn step_hook(
        &self,
        which: HookType,
        step: &PickleStep,
        status: Option<Status>,
        world: &mut W,
        out: &mut Attempt<'_>,
    ) -> Option<StepError> {
        if !self.hooks.has(which) {
            return None;
        }
        out.hook(which, event::Hook::Started);
        let res = match status {
            None => self.hooks.run_before_step(step, world).await,
            Some(s) => self.hooks.run_after_step(step, s, world).await,
        };
        match res {
            Ok(()) => {
                out.hook(which, event::Hook::Passed);
                None
            }
            Err(error) => {
                tracing::debug!(step = %step.id, %which, %error, "step hook failed");
                out.hook(which, event::Hook::Failed(error.clone()));
                Some(StepError::Hook { which, error })
            }
        }
    }

    fn hook_failed(
        &self,
        pickle: &Pickle,
        which: HookType,
        error: HookError,
        out: &mut Attempt<'_>,
    ) {
        tracing::debug!(id = %pickle.id, %which, %error, "scenario hook failed");
        self.store.hook_error(&pickle.id, which, error.clone());
        out.hook(which, event::Hook::Failed(error));
    }

    fn skip(&self, step: &Source<PickleStep>, attempt: usize, out: &mut Attempt<'_>) {
        self.store.put(StepResult::skipped(step.clone(), attempt));
        out.step(step, event::Step::Skipped);
    }
}

/// Default [`Sleep`] of a [`Basic`] runner, not bound to any async runtime.
///
/// [`Basic`]: super::Basic
pub(super) fn thread_sleep(duration: Duration) -> futures::future::LocalBoxFuture<'static, ()> {
    let (tx, rx) = futures::channel::oneshot::channel();
    _ = std::thread::Builder::new()
        .name("pickler-retry-delay".into())
        .spawn(move || {
            std::thread::sleep(duration);
            _ = tx.send(());
        });
    async move {
        _ = rx.await;
    }
    .boxed_local()
}
