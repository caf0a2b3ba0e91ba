// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Default pretty [`Writer`] implementation.

mod cli;

use std::io;

use async_trait::async_trait;
use itertools::Itertools as _;

use crate::{
    event::{self, HookError, HookType, Source},
    pickle::Argument,
    writer::out::{self, Styles, WriteStrExt as _},
    Event, Pickle, PickleStep, ResultStore, Status, Writer,
};

#[doc(inline)]
pub use self::cli::{Cli, Coloring};

/// Default [`Writer`] implementation outputting a human-readable report.
///
/// Steps are printed once they finish:
/// ```text
/// Feature: Eating
///   Scenario: eat some
///     ✔> Given there are 12 cucumbers
///     ✘  When I eat 5 cucumbers
///        Step failed: not hungry
///     ?  Then I have 7 cucumbers (skipped)
/// ```
/// Background steps are marked with `>`.
#[derive(Debug)]
pub struct Basic<Out: io::Write = io::Stdout> {
    output: Out,
    styles: Styles,
    verbose: u8,
    rule: Option<Source<gherkin::Rule>>,
    matched: Option<String>,
}

impl Default for Basic {
    fn default() -> Self {
        Self::stdout()
    }
}

impl Basic {
    /// Creates a new [`Basic`] [`Writer`] outputting to [`io::Stdout`].
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout(), Cli::default())
    }
}

impl<Out: io::Write> Basic<Out> {
    /// Creates a new [`Basic`] [`Writer`] outputting to the given `output`.
    #[must_use]
    pub fn new(output: Out, cli: Cli) -> Self {
        Self {
            output,
            styles: Styles::new(cli.color),
            verbose: cli.verbose,
            rule: None,
            matched: None,
        }
    }

    /// Returns the output of this [`Basic`] [`Writer`].
    #[must_use]
    pub const fn output(&self) -> &Out {
        &self.output
    }

    fn feature_started(&mut self, feature: &gherkin::Feature) -> io::Result<()> {
        self.rule = None;
        let line = format!("{}: {}", feature.keyword, feature.name);
        self.output.write_line(self.styles.bold(line))
    }

    fn pickle(&mut self, pickle: &Source<Pickle>, ev: &event::Pickle) -> io::Result<()> {
        match ev {
            event::Pickle::Started { retries } => {
                self.rule_changed(pickle)?;
                let mut line = format!(
                    "{}{}: {}",
                    indent(pickle),
                    pickle.scenario.keyword,
                    pickle.name,
                );
                if let Some(r) = retries.filter(|r| r.current > 0) {
                    line.push_str(&format!(
                        " | Retry attempt {}/{}",
                        r.attempt(),
                        r.attempt() + r.left,
                    ));
                }
                self.output.write_line(self.styles.ok(line))
            }
            event::Pickle::Aborted => {
                self.rule_changed(pickle)?;
                let line = format!(
                    "{}{}: {} (aborted)",
                    indent(pickle),
                    pickle.scenario.keyword,
                    pickle.name,
                );
                self.output.write_line(self.styles.skipped(line))
            }
            event::Pickle::Hook(which, event::Hook::Failed(err)) => {
                self.hook_failed(*which, err, indent(pickle).len() + 2)
            }
            event::Pickle::Step(step, ev) => self.step(pickle, step, ev),
            event::Pickle::Hook(..) | event::Pickle::Finished(_) => Ok(()),
        }
    }

    fn rule_changed(&mut self, pickle: &Source<Pickle>) -> io::Result<()> {
        if self.rule == pickle.rule {
            return Ok(());
        }
        self.rule.clone_from(&pickle.rule);
        match &pickle.rule {
            Some(r) => {
                let line = format!("  {}: {}", r.keyword, r.name);
                self.output.write_line(self.styles.bold(line))
            }
            None => Ok(()),
        }
    }

    fn hook_failed(
        &mut self,
        which: HookType,
        err: &HookError,
        offset: usize,
    ) -> io::Result<()> {
        let line = format!("{}\u{2718}  {which} hook failed: {err}", " ".repeat(offset));
        self.output.write_line(self.styles.err(line))
    }

    fn step(
        &mut self,
        pickle: &Source<Pickle>,
        step: &PickleStep,
        ev: &event::Step,
    ) -> io::Result<()> {
        let status = match ev {
            event::Step::Started => {
                self.matched = None;
                return Ok(());
            }
            event::Step::Matched { pattern, location } => {
                self.matched = Some(match location {
                    Some(loc) => format!("{pattern} --> {loc}"),
                    None => pattern.clone(),
                });
                return Ok(());
            }
            ev => ev.status().unwrap_or(Status::Skipped),
        };

        let offset = indent(pickle).len() + 2;
        let glyph = match status {
            Status::Passed => '\u{2714}',
            Status::Failed | Status::Ambiguous => '\u{2718}',
            Status::Skipped | Status::Pending | Status::Undefined => '?',
        };
        let marker = if step.is_background { '>' } else { ' ' };
        let suffix = match status {
            Status::Skipped => " (skipped)",
            Status::Pending => " (pending)",
            Status::Undefined => " (undefined)",
            Status::Passed | Status::Failed | Status::Ambiguous => "",
        };
        let mut lines = vec![format!(
            "{}{glyph}{marker} {} {}{suffix}",
            " ".repeat(offset),
            step.keyword.trim(),
            step.text,
        )];

        let mut details = Vec::new();
        if self.verbose >= 2 {
            if let Some(m) = self.matched.take() {
                details.push(format!("Matched: {m}"));
            }
        }
        if self.verbose >= 1 {
            details.extend(argument(step));
        }
        match ev {
            event::Step::Failed(err) => details.push(format!("Step failed: {err}")),
            event::Step::Ambiguous(err) => {
                details.push(format!("Step match is ambiguous: {err}"));
            }
            event::Step::Undefined { snippet } if !snippet.is_empty() => {
                details.push(format!("Step can be implemented with:\n{snippet}"));
            }
            event::Step::Pending(Some(msg)) => details.push(msg.clone()),
            _ => {}
        }
        let pad = " ".repeat(offset + 3);
        lines.extend(
            details
                .iter()
                .flat_map(|d| d.lines())
                .map(|l| format!("{pad}{l}")),
        );

        self.output.write_line(self.styles.status(status, lines.join("\n")))
    }
}

#[async_trait(?Send)]
impl<Out: io::Write> Writer for Basic<Out> {
    async fn handle_event(&mut self, event: Event<event::Run>, _: &ResultStore) {
        let res = match &event.value {
            event::Run::Started { .. } | event::Run::Finished(_) => Ok(()),
            event::Run::Hook(which, event::Hook::Failed(err)) => {
                self.hook_failed(*which, err, 0)
            }
            event::Run::Hook(..) => Ok(()),
            event::Run::Feature(f, ev) => match ev {
                event::Feature::Started => self.feature_started(f),
                event::Feature::Pickle(p, ev) => self.pickle(p, ev),
                event::Feature::Finished => self.output.flush(),
            },
        };
        out::log_failure(res, "basic");
    }
}

fn indent(pickle: &Pickle) -> &'static str {
    if pickle.rule.is_some() {
        "    "
    } else {
        "  "
    }
}

/// Renders the data table or the doc string of the given `step`.
fn argument(step: &PickleStep) -> Option<String> {
    match step.argument.as_ref()? {
        Argument::Table(table) => Some(
            table
                .raw()
                .iter()
                .map(|row| format!("| {} |", row.iter().join(" | ")))
                .join("\n"),
        ),
        Argument::DocString(doc) => Some(format!("\"\"\"\n{doc}\n\"\"\"")),
    }
}
