// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Compact [`Writer`] printing a single character per step.

use std::io;

use async_trait::async_trait;

use crate::{
    event,
    writer::{
        basic::Cli,
        out::{self, Styles, WriteStrExt as _},
    },
    Event, ResultStore, Status, Writer,
};

/// [`Writer`] printing a single character per finished step:
///
/// | char | status    |
/// |------|-----------|
/// | `.`  | passed    |
/// | `F`  | failed    |
/// | `-`  | skipped   |
/// | `U`  | undefined |
/// | `P`  | pending   |
/// | `A`  | ambiguous |
///
/// Aborted scenarios are printed as `_`, and the line is terminated once the
/// run finishes.
#[derive(Debug)]
pub struct Progress<Out: io::Write = io::Stdout> {
    output: Out,
    styles: Styles,
}

impl Default for Progress {
    fn default() -> Self {
        Self::new(io::stdout(), Cli::default())
    }
}

impl<Out: io::Write> Progress<Out> {
    /// Creates a new [`Progress`] [`Writer`] outputting to the given `output`.
    #[must_use]
    pub fn new(output: Out, cli: Cli) -> Self {
        Self { output, styles: Styles::new(cli.color) }
    }

    /// Returns the output of this [`Progress`] [`Writer`].
    #[must_use]
    pub const fn output(&self) -> &Out {
        &self.output
    }
}

/// Returns the progress character of the given [`Status`].
#[must_use]
pub const fn symbol(status: Status) -> char {
    match status {
        Status::Passed => '.',
        Status::Failed => 'F',
        Status::Skipped => '-',
        Status::Undefined => 'U',
        Status::Pending => 'P',
        Status::Ambiguous => 'A',
    }
}

#[async_trait(?Send)]
impl<Out: io::Write> Writer for Progress<Out> {
    async fn handle_event(&mut self, event: Event<event::Run>, _: &ResultStore) {
        use event::{Feature, Pickle, Run};

        let res = match &event.value {
            Run::Feature(_, Feature::Pickle(_, Pickle::Step(_, ev))) => {
                match ev.status() {
                    Some(s) => {
                        let c = self.styles.status(s, symbol(s).to_string());
                        self.output.write_str(c).and_then(|()| self.output.flush())
                    }
                    None => Ok(()),
                }
            }
            Run::Feature(_, Feature::Pickle(_, Pickle::Aborted)) => {
                let c = self.styles.skipped("_");
                self.output.write_str(c)
            }
            Run::Finished(_) => self.output.write_line(""),
            Run::Started { .. } | Run::Hook(..) | Run::Feature(..) => Ok(()),
        };
        out::log_failure(res, "progress");
    }
}
