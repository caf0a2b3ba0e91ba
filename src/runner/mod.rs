// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tools for executing [`Pickle`]s.
//!
//! # Order guarantees
//!
//! [`Pickle`]s may complete in any order, but the emitted [`Event`]s are
//! always released in the input order of the [`Pickle`]s: every event of a
//! [`Pickle`] precedes every event of the next one. Within a [`Pickle`], step
//! events follow the order of its steps.
//!
//! [`Event`]: crate::Event
//! [`Pickle`]: crate::Pickle

pub mod basic;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

#[doc(inline)]
pub use self::basic::{Basic, Cli, RetryOptions};

/// Cooperative cancellation signal of a run.
///
/// Once cancelled, no new [`Pickle`] or retry attempt is dispatched, and the
/// in-flight [`Pickle`]s skip their remaining steps after the current one.
/// Undispatched [`Pickle`]s are reported as aborted.
///
/// [`Pickle`]: crate::Pickle
#[derive(Clone, Debug, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    /// Creates a new, not yet cancelled, [`Cancellation`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the run. Every clone observes it.
    pub fn cancel(&self) {
        if !self.0.swap(true, Ordering::SeqCst) {
            tracing::debug!("run cancelled");
        }
    }

    /// Indicates whether the run has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::Cancellation;

    #[test]
    fn clones_share_signal() {
        let signal = Cancellation::new();
        let clone = signal.clone();
        assert!(!clone.is_cancelled());

        signal.cancel();
        signal.cancel();

        assert!(clone.is_cancelled());
    }
}
