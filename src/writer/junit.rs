// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [JUnit XML report][1] [`Writer`] implementation.
//!
//! [1]: https://llg.cubic.org/docs/junit

use std::{io, time::SystemTime};

use async_trait::async_trait;
use itertools::Itertools as _;
use junit_report::{Duration, Report, TestCase, TestCaseBuilder, TestSuite, TestSuiteBuilder};

use crate::{
    event::{self, Source},
    store::{PickleResult, PickleState},
    writer::{out, progress},
    Event, ResultStore, Status, Writer,
};

/// [JUnit XML report][1] [`Writer`] implementation outputting XML to an
/// [`io::Write`] implementor.
///
/// Every [`gherkin::Feature`] becomes a test suite and every [`Pickle`] a
/// test case of it:
/// - failed one is reported as a `failure`;
/// - ambiguous one, or one with a failed hook, as an `error`;
/// - aborted, skipped, pending or undefined one as `skipped`.
///
/// Failed suite hooks are reported as `error`s of an extra `Hooks` suite.
///
/// [`Pickle`]: crate::Pickle
/// [1]: https://llg.cubic.org/docs/junit
#[derive(Debug)]
pub struct JUnit<Out: io::Write> {
    output: Out,
}

impl<Out: io::Write> JUnit<Out> {
    /// Creates a new [`JUnit`] [`Writer`] outputting XML into the given
    /// `output`.
    #[must_use]
    pub const fn new(output: Out) -> Self {
        Self { output }
    }

    /// Returns the output of this [`JUnit`] [`Writer`].
    #[must_use]
    pub const fn output(&self) -> &Out {
        &self.output
    }
}

#[async_trait(?Send)]
impl<Out: io::Write> Writer for JUnit<Out> {
    async fn handle_event(&mut self, event: Event<event::Run>, store: &ResultStore) {
        if !matches!(event.value, event::Run::Finished(_)) {
            return;
        }
        let res = report(store, event.at)
            .write_xml(&mut self.output)
            .map_err(|e| io::Error::other(e.to_string()))
            .and_then(|()| self.output.flush());
        out::log_failure(res, "junit");
    }
}

/// Builds the JUnit [`Report`] of every [`Pickle`] stored so far.
///
/// [`Pickle`]: crate::Pickle
#[must_use]
pub fn report(store: &ResultStore, finished_at: SystemTime) -> Report {
    let mut report = Report::new();

    let mut suites: Vec<(Source<gherkin::Feature>, Vec<PickleResult>)> = Vec::new();
    for p in store.pickles() {
        match suites.last_mut() {
            Some((f, cases)) if *f == p.pickle.feature => cases.push(p),
            _ => suites.push((p.pickle.feature.clone(), vec![p])),
        }
    }

    for (feature, pickles) in suites {
        let started = pickles
            .iter()
            .filter_map(|p| p.started_at)
            .min()
            .unwrap_or(finished_at);
        let name = match &feature.path {
            Some(path) => format!("{}: {}: {}", feature.keyword, feature.name, path.display()),
            None => format!("{}: {}", feature.keyword, feature.name),
        };
        let mut suite = TestSuiteBuilder::new(&name);
        _ = suite.set_timestamp(started.into());
        for p in &pickles {
            _ = suite.add_testcase(test_case(p));
        }
        report.add_testsuite(suite.build());
    }

    let hook_errors = store.suite_hook_errors();
    if !hook_errors.is_empty() {
        report.add_testsuite(hooks_suite(&hook_errors, finished_at));
    }

    report
}

fn test_case(p: &PickleResult) -> TestCase {
    let pickle = &p.pickle;
    let name = format!(
        "{}{}: {}: {}",
        pickle
            .rule
            .as_ref()
            .map(|r| format!("{}: {}: ", r.keyword, r.name))
            .unwrap_or_default(),
        pickle.scenario.keyword,
        pickle.name,
        pickle.id,
    );
    let duration = Duration::try_from(p.duration).unwrap_or_else(|e| {
        tracing::warn!(pickle = %pickle.id, error = %e, "duration out of range");
        Duration::ZERO
    });
    let first_error = || {
        p.steps
            .iter()
            .find_map(|s| s.error.as_ref().map(|e| (s, e)))
            .map(|(s, e)| format!("{} {}: {e}", s.step.keyword.trim(), s.step.text))
            .unwrap_or_default()
    };

    let mut case = match p.state {
        PickleState::Finished(_) if !p.hook_errors.is_empty() => {
            let msg = p.hook_errors.iter().map(|(w, e)| format!("{w} hook failed: {e}")).join("\n");
            TestCaseBuilder::error(&name, duration, "Hook Failed", &msg).build()
        }
        PickleState::Finished(Status::Passed) => TestCaseBuilder::success(&name, duration).build(),
        PickleState::Finished(Status::Failed) => {
            TestCaseBuilder::failure(&name, duration, "Step Failed", &first_error()).build()
        }
        PickleState::Finished(Status::Ambiguous) => {
            TestCaseBuilder::error(&name, duration, "Step Ambiguous", &first_error()).build()
        }
        PickleState::Finished(Status::Skipped | Status::Pending | Status::Undefined)
        | PickleState::Aborted
        | PickleState::Queued
        | PickleState::Running { .. } => TestCaseBuilder::skipped(&name).build(),
    };

    if !p.steps.is_empty() {
        let out = p
            .steps
            .iter()
            .map(|s| {
                format!(
                    "{} {} {} ({})",
                    progress::symbol(s.status),
                    s.step.keyword.trim(),
                    s.step.text,
                    s.status,
                )
            })
            .join("\n");
        case.set_system_out(&out);
    }
    case
}

fn hooks_suite(errors: &[(event::HookType, event::HookError)], at: SystemTime) -> TestSuite {
    let mut suite = TestSuiteBuilder::new("Hooks");
    _ = suite.set_timestamp(at.into());
    for (which, err) in errors {
        _ = suite.add_testcase(
            TestCaseBuilder::error(
                &which.to_string(),
                Duration::ZERO,
                "Hook Failed",
                &err.to_string(),
            )
            .build(),
        );
    }
    suite.build()
}
