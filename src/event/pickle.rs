// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use super::{Hook, HookType, Retries, Source, Status, Step};

/// Event specific to a particular [`Pickle`].
///
/// Only events of the final attempt of a retried [`Pickle`] are reported.
///
/// [`Pickle`]: crate::Pickle
#[derive(Clone, Debug)]
pub enum Pickle {
    /// Pickle attempt being started.
    Started {
        /// Retry state of this attempt, if retries are enabled.
        retries: Option<Retries>,
    },

    /// Before-scenario or after-scenario hook event.
    Hook(HookType, Hook),

    /// Step event.
    Step(Source<crate::PickleStep>, Step),

    /// Pickle has finished with the aggregated [`Status`].
    Finished(Status),

    /// Pickle has never been dispatched, as the run was cancelled.
    Aborted,
}

impl Pickle {
    /// Constructs an event of the given `step`.
    #[must_use]
    pub fn step(step: Source<crate::PickleStep>, event: Step) -> Self {
        Self::Step(step, event)
    }

    /// Indicates whether this event ends the [`Pickle`].
    ///
    /// [`Pickle`]: crate::Pickle
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished(_) | Self::Aborted)
    }
}
