// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`Writer`]-wrapper for printing a [`Summary`] of the run.

use std::io;

use async_trait::async_trait;

use crate::{
    event,
    store::{PickleState, Summary},
    writer::{
        basic::Coloring,
        out::{self, Styles, WriteStrExt as _},
    },
    Event, ResultStore, Status, Writer,
};

/// Wrapper of a [`Writer`] printing the [`Summary`] of the run, along with
/// every non-passing scenario, once the wrapped [`Writer`] has handled
/// [`event::Run::Finished`].
#[derive(Debug)]
pub struct Summarized<W, Out: io::Write = io::Stdout> {
    writer: W,
    output: Out,
    styles: Styles,
    summary: Option<Summary>,
}

impl<W> Summarized<W> {
    /// Wraps the given [`Writer`] to print into [`io::Stdout`].
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self::with_output(writer, io::stdout(), Coloring::Auto)
    }
}

impl<W, Out: io::Write> Summarized<W, Out> {
    /// Wraps the given [`Writer`] to print into the given `output`.
    #[must_use]
    pub fn with_output(writer: W, output: Out, coloring: Coloring) -> Self {
        Self { writer, output, styles: Styles::new(coloring), summary: None }
    }

    /// Returns the [`Summary`] of the finished run, if any.
    #[must_use]
    pub const fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    /// Returns the wrapped [`Writer`].
    #[must_use]
    pub const fn inner(&self) -> &W {
        &self.writer
    }

    /// Returns the output of the [`Summary`].
    #[must_use]
    pub const fn output(&self) -> &Out {
        &self.output
    }

    fn print(&mut self, summary: &Summary, store: &ResultStore) -> io::Result<()> {
        self.output.write_line(self.styles.bold("[Summary]"))?;
        let color = if summary.has_failures(false) {
            Status::Failed
        } else if summary.pickles.total() > summary.pickles.passed {
            Status::Pending
        } else {
            Status::Passed
        };
        self.output.write_line(self.styles.status(color, summary.to_string()))?;

        let mut failures = Vec::new();
        for (which, err) in store.suite_hook_errors() {
            failures.push(format!("{which} hook failed: {err}"));
        }
        for p in store.pickles() {
            let status = match p.state {
                PickleState::Finished(Status::Passed | Status::Skipped) => continue,
                PickleState::Finished(s) => s,
                PickleState::Aborted => continue,
                PickleState::Queued | PickleState::Running { .. } => {
                    tracing::warn!(pickle = %p.pickle.id, "summarizing unfinished pickle");
                    continue;
                }
            };
            let mut lines = vec![format!("{} {} ({status})", p.pickle.id, p.pickle.name)];
            for (which, err) in &p.hook_errors {
                lines.push(format!("  {which} hook failed: {err}"));
            }
            for s in p.steps.iter().filter(|s| s.error.is_some()) {
                let err = s.error.as_ref().map(ToString::to_string).unwrap_or_default();
                lines.push(format!(
                    "  {} {}: {}",
                    s.step.keyword.trim(),
                    s.step.text,
                    err.lines().next().unwrap_or_default(),
                ));
            }
            failures.push(lines.join("\n"));
        }

        if !failures.is_empty() {
            self.output.write_line(self.styles.bold("[Failures]"))?;
            for f in failures {
                self.output.write_line(self.styles.err(f))?;
            }
        }
        self.output.flush()
    }
}

#[async_trait(?Send)]
impl<W: Writer, Out: io::Write> Writer for Summarized<W, Out> {
    async fn handle_event(&mut self, event: Event<event::Run>, store: &ResultStore) {
        let finished = match &event.value {
            event::Run::Finished(summary) => Some(*summary),
            _ => None,
        };

        self.writer.handle_event(event, store).await;

        if let Some(summary) = finished {
            let res = self.print(&summary, store);
            out::log_failure(res, "summary");
            self.summary = Some(summary);
        }
    }
}
