// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::{fmt, time::Duration};

use itertools::Itertools as _;

use crate::{ExitCode, Status};

/// Number of [`Pickle`]s (or steps) per [`Status`].
///
/// [`Pickle`]: crate::Pickle
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Stats {
    /// Number of [`Status::Passed`] ones.
    pub passed: usize,

    /// Number of [`Status::Skipped`] ones.
    pub skipped: usize,

    /// Number of [`Status::Pending`] ones.
    pub pending: usize,

    /// Number of [`Status::Failed`] ones.
    pub failed: usize,

    /// Number of [`Status::Undefined`] ones.
    pub undefined: usize,

    /// Number of [`Status::Ambiguous`] ones.
    pub ambiguous: usize,
}

impl Stats {
    /// Counts one more of the given [`Status`].
    pub fn add(&mut self, status: Status) {
        *self.get_mut(status) += 1;
    }

    /// Returns the count of the given [`Status`].
    #[must_use]
    pub const fn get(&self, status: Status) -> usize {
        match status {
            Status::Passed => self.passed,
            Status::Skipped => self.skipped,
            Status::Pending => self.pending,
            Status::Failed => self.failed,
            Status::Undefined => self.undefined,
            Status::Ambiguous => self.ambiguous,
        }
    }

    fn get_mut(&mut self, status: Status) -> &mut usize {
        match status {
            Status::Passed => &mut self.passed,
            Status::Skipped => &mut self.skipped,
            Status::Pending => &mut self.pending,
            Status::Failed => &mut self.failed,
            Status::Undefined => &mut self.undefined,
            Status::Ambiguous => &mut self.ambiguous,
        }
    }

    /// Returns the total count.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.passed
            + self.skipped
            + self.pending
            + self.failed
            + self.undefined
            + self.ambiguous
    }

    /// Indicates whether any counted [`Status`] fails the run.
    #[must_use]
    pub fn has_failures(&self, strict: bool) -> bool {
        Status::ALL
            .into_iter()
            .any(|s| s.is_failure(strict) && self.get(s) > 0)
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = Status::ALL
            .into_iter()
            .rev()
            .filter(|s| self.get(*s) > 0)
            .map(|s| format!("{} {s}", self.get(s)))
            .join(", ");
        if parts.is_empty() {
            Ok(())
        } else {
            write!(f, " ({parts})")
        }
    }
}

/// Totals of a finished run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Summary {
    /// Finished [`Pickle`]s per aggregated [`Status`].
    ///
    /// [`Pickle`]: crate::Pickle
    pub pickles: Stats,

    /// Steps of the finished [`Pickle`]s per [`Status`].
    ///
    /// [`Pickle`]: crate::Pickle
    pub steps: Stats,

    /// Number of [`Pickle`]s never dispatched due to cancellation.
    ///
    /// [`Pickle`]: crate::Pickle
    pub aborted: usize,

    /// Number of [`Pickle`]s finished after more than one attempt.
    ///
    /// [`Pickle`]: crate::Pickle
    pub retried: usize,

    /// Number of failed hooks, suite ones included.
    pub hook_errors: usize,

    /// Wall-clock duration of the run.
    pub duration: Duration,
}

impl Summary {
    /// Total number of [`Pickle`]s, aborted ones included.
    ///
    /// [`Pickle`]: crate::Pickle
    #[must_use]
    pub const fn total(&self) -> usize {
        self.pickles.total() + self.aborted
    }

    /// Indicates whether this run has failed.
    #[must_use]
    pub fn has_failures(&self, strict: bool) -> bool {
        self.pickles.has_failures(strict) || self.aborted > 0 || self.hook_errors > 0
    }

    /// Returns the [`ExitCode`] of this run.
    #[must_use]
    pub fn exit_code(&self, strict: bool) -> ExitCode {
        if self.total() == 0 {
            ExitCode::NoPickles
        } else if self.has_failures(strict) {
            ExitCode::Failure
        } else {
            ExitCode::Success
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = |n: usize, what: &str| {
            format!("{n} {what}{}", if n == 1 { "" } else { "s" })
        };

        writeln!(f, "{}{}", plural(self.pickles.total(), "scenario"), self.pickles)?;
        write!(f, "{}{}", plural(self.steps.total(), "step"), self.steps)?;
        if self.aborted > 0 {
            write!(f, "\n{} aborted", plural(self.aborted, "scenario"))?;
        }
        if self.retried > 0 {
            write!(f, "\n{} retried", plural(self.retried, "scenario"))?;
        }
        if self.hook_errors > 0 {
            write!(f, "\n{}", plural(self.hook_errors, "hook error"))?;
        }
        write!(f, "\n{}", humantime::format_duration(self.duration))
    }
}
