// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Concurrent storage of step and [`Pickle`] results.
//!
//! The store is the only structure mutated by several [`Pickle`]s at once, so
//! it's backed by [`DashMap`]s keyed by [`StepId`] and [`PickleId`]. A new
//! attempt of a retried [`Pickle`] drops the results of the previous one, so
//! only the final attempt is ever visible.

mod summary;

use std::{
    sync::{Mutex, PoisonError},
    time::{Duration, Instant, SystemTime},
};

use dashmap::DashMap;

use crate::{
    event::{HookError, HookType, Source, StepError},
    pickle::{PickleId, StepId},
    step::{Attachment, Location},
    Pickle, PickleStep, Status,
};

#[doc(inline)]
pub use self::summary::{Stats, Summary};

/// Result of a single [`PickleStep`] execution.
#[derive(Clone, Debug)]
pub struct StepResult {
    /// Executed [`PickleStep`].
    pub step: Source<PickleStep>,

    /// Final [`Status`], after interception.
    pub status: Status,

    /// Error behind a non-passing [`Status`], if any.
    pub error: Option<StepError>,

    /// Time spent executing the step and its hooks.
    pub duration: Duration,

    /// [`Attachment`]s added by the handler, in order.
    pub attachments: Vec<Attachment>,

    /// Source of the matched pattern, if resolved.
    pub pattern: Option<String>,

    /// Where the matched definition was registered.
    pub location: Option<Location>,

    /// One-based attempt of the [`Pickle`] this result belongs to.
    pub attempt: usize,
}

impl StepResult {
    /// Creates a [`StepResult`] of a step that wasn't executed.
    #[must_use]
    pub const fn skipped(step: Source<PickleStep>, attempt: usize) -> Self {
        Self {
            step,
            status: Status::Skipped,
            error: None,
            duration: Duration::ZERO,
            attachments: Vec::new(),
            pattern: None,
            location: None,
            attempt,
        }
    }
}

/// Lifecycle state of a [`Pickle`] inside a run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PickleState {
    /// Not dispatched yet.
    Queued,

    /// Being executed.
    Running {
        /// One-based number of the running attempt.
        attempt: usize,
    },

    /// Finished with the aggregated [`Status`].
    Finished(Status),

    /// Never dispatched, as the run was cancelled.
    Aborted,
}

/// Final outcome of a [`Pickle`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// [`Pickle`] has run to its end.
    Finished(Status),

    /// [`Pickle`] has never been dispatched.
    Aborted,
}

/// Result of a [`Pickle`]: its final attempt.
#[derive(Clone, Debug)]
pub struct PickleResult {
    /// The [`Pickle`] itself.
    pub pickle: Source<Pickle>,

    /// Position of the [`Pickle`] in the run input.
    pub index: usize,

    /// Current [`PickleState`].
    pub state: PickleState,

    /// One-based number of the final attempt, zero if never started.
    pub attempt: usize,

    /// Results of the executed steps, in order.
    pub steps: Vec<StepResult>,

    /// Failures of the scenario hooks of the final attempt.
    pub hook_errors: Vec<(HookType, HookError)>,

    /// When the final attempt has started.
    pub started_at: Option<SystemTime>,

    /// Duration of the final attempt.
    pub duration: Duration,
}

impl PickleResult {
    /// Returns the [`Outcome`] of the [`Pickle`], unless it's still queued or
    /// running.
    #[must_use]
    pub const fn outcome(&self) -> Option<Outcome> {
        match self.state {
            PickleState::Finished(s) => Some(Outcome::Finished(s)),
            PickleState::Aborted => Some(Outcome::Aborted),
            PickleState::Queued | PickleState::Running { .. } => None,
        }
    }

    /// Returns the aggregated [`Status`] of the [`Pickle`], if it has
    /// finished.
    #[must_use]
    pub const fn status(&self) -> Option<Status> {
        match self.state {
            PickleState::Finished(s) => Some(s),
            PickleState::Queued | PickleState::Running { .. } | PickleState::Aborted => {
                None
            }
        }
    }
}

/// Bookkeeping of a single [`Pickle`].
#[derive(Debug)]
struct Record {
    pickle: Source<Pickle>,
    index: usize,
    state: PickleState,
    attempt: usize,
    hook_errors: Vec<(HookType, HookError)>,
    started_at: Option<SystemTime>,
    started: Option<Instant>,
    duration: Duration,
}

/// Thread-safe storage of the results of a run.
#[derive(Debug)]
pub struct ResultStore {
    steps: DashMap<StepId, StepResult>,
    pickles: DashMap<PickleId, Record>,
    suite_hook_errors: Mutex<Vec<(HookType, HookError)>>,
    started: Instant,
}

impl Default for ResultStore {
    fn default() -> Self {
        Self {
            steps: DashMap::new(),
            pickles: DashMap::new(),
            suite_hook_errors: Mutex::new(Vec::new()),
            started: Instant::now(),
        }
    }
}

const _: fn() = || {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ResultStore>();
};

impl ResultStore {
    /// Creates a new empty [`ResultStore`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the given [`Pickle`]s as [`PickleState::Queued`], keeping
    /// their order as the iteration order of [`ResultStore::pickles()`].
    pub fn register<'p>(&self, pickles: impl IntoIterator<Item = &'p Source<Pickle>>) {
        let offset = self.pickles.len();
        for (n, pickle) in pickles.into_iter().enumerate() {
            _ = self.pickles.insert(
                pickle.id.clone(),
                Record {
                    pickle: pickle.clone(),
                    index: offset + n,
                    state: PickleState::Queued,
                    attempt: 0,
                    hook_errors: Vec::new(),
                    started_at: None,
                    started: None,
                    duration: Duration::ZERO,
                },
            );
        }
    }

    /// Marks the given attempt of a [`Pickle`] as started, discarding every
    /// result of its previous attempt.
    pub fn start(&self, pickle: &PickleId, attempt: usize) {
        let Some(mut rec) = self.pickles.get_mut(pickle) else {
            tracing::warn!(%pickle, "starting unregistered pickle");
            return;
        };
        for step in &rec.pickle.steps {
            _ = self.steps.remove(&step.id);
        }
        rec.state = PickleState::Running { attempt };
        rec.attempt = attempt;
        rec.hook_errors.clear();
        rec.started_at = Some(SystemTime::now());
        rec.started = Some(Instant::now());
        rec.duration = Duration::ZERO;
    }

    /// Stores the given [`StepResult`], replacing the previous one of the
    /// same step.
    pub fn put(&self, result: StepResult) {
        _ = self.steps.insert(result.step.id.clone(), result);
    }

    /// Records a failure of a scenario hook of the given [`Pickle`].
    pub fn hook_error(&self, pickle: &PickleId, which: HookType, error: HookError) {
        if let Some(mut rec) = self.pickles.get_mut(pickle) {
            rec.hook_errors.push((which, error));
        }
    }

    /// Records a failure of a suite hook.
    pub fn suite_hook_error(&self, which: HookType, error: HookError) {
        self.suite_hook_errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((which, error));
    }

    /// Marks the given [`Pickle`] as finished with the aggregated `status`.
    pub fn finish(&self, pickle: &PickleId, status: Status) {
        if let Some(mut rec) = self.pickles.get_mut(pickle) {
            rec.state = PickleState::Finished(status);
            rec.duration = rec.started.map(|s| s.elapsed()).unwrap_or_default();
        }
    }

    /// Marks the given [`Pickle`] as aborted.
    pub fn abort(&self, pickle: &PickleId) {
        if let Some(mut rec) = self.pickles.get_mut(pickle) {
            rec.state = PickleState::Aborted;
        }
    }

    /// Returns the latest [`StepResult`] of the given step.
    #[must_use]
    pub fn get(&self, step: &StepId) -> Option<StepResult> {
        self.steps.get(step).map(|r| r.clone())
    }

    /// Returns the [`Attachment`]s of the given step.
    #[must_use]
    pub fn attachments(&self, step: &StepId) -> Vec<Attachment> {
        self.steps
            .get(step)
            .map(|r| r.attachments.clone())
            .unwrap_or_default()
    }

    /// Returns the [`PickleState`] of the given [`Pickle`].
    #[must_use]
    pub fn state(&self, pickle: &PickleId) -> Option<PickleState> {
        self.pickles.get(pickle).map(|r| r.state)
    }

    /// Returns the [`PickleResult`] of the given [`Pickle`].
    #[must_use]
    pub fn pickle(&self, pickle: &PickleId) -> Option<PickleResult> {
        let rec = self.pickles.get(pickle)?;
        Some(self.result_of(&rec))
    }

    /// Returns the [`PickleResult`]s of every registered [`Pickle`], in input
    /// order.
    #[must_use]
    pub fn pickles(&self) -> Vec<PickleResult> {
        let mut all = self
            .pickles
            .iter()
            .map(|rec| self.result_of(&rec))
            .collect::<Vec<_>>();
        all.sort_by_key(|r| r.index);
        all
    }

    /// Returns the failures of the suite hooks.
    #[must_use]
    pub fn suite_hook_errors(&self) -> Vec<(HookType, HookError)> {
        self.suite_hook_errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Computes the [`Summary`] of everything stored so far.
    #[must_use]
    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            hook_errors: self.suite_hook_errors().len(),
            duration: self.started.elapsed(),
            ..Summary::default()
        };
        for p in self.pickles() {
            summary.hook_errors += p.hook_errors.len();
            match p.state {
                PickleState::Finished(status) => {
                    summary.pickles.add(status);
                    for s in &p.steps {
                        summary.steps.add(s.status);
                    }
                    if p.attempt > 1 {
                        summary.retried += 1;
                    }
                }
                PickleState::Aborted => summary.aborted += 1,
                PickleState::Queued | PickleState::Running { .. } => {}
            }
        }
        summary
    }

    fn result_of(&self, rec: &Record) -> PickleResult {
        PickleResult {
            pickle: rec.pickle.clone(),
            index: rec.index,
            state: rec.state,
            attempt: rec.attempt,
            steps: rec
                .pickle
                .steps
                .iter()
                .filter_map(|s| self.get(&s.id))
                .collect(),
            hook_errors: rec.hook_errors.clone(),
            started_at: rec.started_at,
            duration: rec.duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use gherkin::GherkinEnv;

    use super::{PickleState, ResultStore, StepResult};
    use crate::{
        event::{coerce_panic, Source, StepError},
        pickle,
        step::Attachment,
        Status,
    };

    fn pickles() -> Vec<Source<crate::Pickle>> {
        let feature = gherkin::Feature::parse(
            "Feature: Store\n  Scenario: one\n    Given a\n    Then b\n  Scenario: two\n    Given a\n",
            GherkinEnv::default(),
        )
        .unwrap();
        pickle::build(&[feature]).unwrap().into_iter().map(Source::new).collect()
    }

    fn passed(step: &Source<crate::PickleStep>, attempt: usize) -> StepResult {
        StepResult { status: Status::Passed, ..StepResult::skipped(step.clone(), attempt) }
    }

    #[test]
    fn keeps_only_latest_attempt() {
        let pickles = pickles();
        let store = ResultStore::new();
        store.register(&pickles);
        let p = &pickles[0];

        store.start(&p.id, 1);
        store.put(passed(&p.steps[0], 1));
        store.put(StepResult { status: Status::Failed, ..StepResult::skipped(p.steps[1].clone(), 1) });
        store.start(&p.id, 2);
        store.put(passed(&p.steps[0], 2));
        assert!(store.get(&p.steps[1].id).is_none());
        store.put(passed(&p.steps[1], 2));
        store.finish(&p.id, Status::Passed);

        let result = store.pickle(&p.id).unwrap();
        assert_eq!(result.attempt, 2);
        assert!(result.steps.iter().all(|s| s.attempt == 2 && s.status == Status::Passed));
        assert_eq!(store.summary().retried, 1);
    }

    #[test]
    fn iterates_in_input_order() {
        let pickles = pickles();
        let store = ResultStore::new();
        store.register(&pickles);

        store.start(&pickles[1].id, 1);
        store.finish(&pickles[1].id, Status::Passed);
        store.abort(&pickles[0].id);

        let all = store.pickles();
        assert_eq!(all[0].pickle.id, pickles[0].id);
        assert_eq!(all[0].state, PickleState::Aborted);
        assert_eq!(all[1].state, PickleState::Finished(Status::Passed));

        let summary = store.summary();
        assert_eq!(summary.aborted, 1);
        assert_eq!(summary.pickles.passed, 1);
    }

    #[test]
    fn stores_attachments_per_step() {
        let pickles = pickles();
        let store = ResultStore::new();
        store.register(&pickles);
        let step = &pickles[0].steps[0];

        store.put(StepResult {
            attachments: vec![Attachment::text("a"), Attachment::text("b")],
            ..passed(step, 1)
        });

        let attachments = store.attachments(&step.id);
        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments[1].data, b"b");
        assert!(store.attachments(&pickles[0].steps[1].id).is_empty());
    }

    #[test]
    fn accepts_concurrent_writers() {
        let pickles = pickles();
        let store = Arc::new(ResultStore::new());
        store.register(&pickles);

        let handles = pickles
            .iter()
            .cloned()
            .map(|p| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store.start(&p.id, 1);
                    for s in &p.steps {
                        store.put(passed(s, 1));
                    }
                    store.finish(&p.id, Status::Passed);
                })
            })
            .collect::<Vec<_>>();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.summary().steps.passed, 3);
        assert_eq!(store.summary().pickles.passed, 2);
    }

    #[test]
    fn shares_panicked_results_across_threads() {
        let pickles = pickles();
        let store = Arc::new(ResultStore::new());
        store.register(&pickles);
        let step = pickles[0].steps[0].clone();

        let writer = Arc::clone(&store);
        thread::spawn(move || {
            writer.put(StepResult {
                status: Status::Failed,
                error: Some(StepError::Panic(coerce_panic(&"boom"))),
                ..StepResult::skipped(step, 1)
            });
        })
        .join()
        .unwrap();

        let reader = Arc::clone(&store);
        let id = pickles[0].steps[0].id.clone();
        let message = thread::spawn(move || reader.get(&id).and_then(|r| r.error))
            .join()
            .unwrap()
            .map(|e| e.to_string());

        assert_eq!(message.as_deref(), Some("Step panicked. Captured output: boom"));
    }
}
