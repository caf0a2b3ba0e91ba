// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::sync::Arc;

use derive_more::with_trait::{Display, Error};

use super::Info;

/// Boundary a hook is executed at.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum HookType {
    /// Once, before any [`Pickle`] is dispatched.
    ///
    /// [`Pickle`]: crate::Pickle
    #[display("before suite")]
    BeforeSuite,

    /// Once, after every [`Pickle`] has finished.
    ///
    /// [`Pickle`]: crate::Pickle
    #[display("after suite")]
    AfterSuite,

    /// Before the first step of every [`Pickle`] attempt.
    ///
    /// [`Pickle`]: crate::Pickle
    #[display("before scenario")]
    BeforeScenario,

    /// After the last step of every [`Pickle`] attempt, regardless of its
    /// outcome.
    ///
    /// [`Pickle`]: crate::Pickle
    #[display("after scenario")]
    AfterScenario,

    /// Before every executed step.
    #[display("before step")]
    BeforeStep,

    /// After every executed step.
    #[display("after step")]
    AfterStep,
}

/// Event of running the hooks registered for some [`HookType`].
#[derive(Clone, Debug)]
pub enum Hook {
    /// Hooks execution being started.
    Started,

    /// Every hook passed.
    Passed,

    /// At least one hook failed. Holds the first failure.
    Failed(HookError),
}

/// Failure of a hook.
#[derive(Clone, Debug, Display, Error)]
pub enum HookError {
    /// Hook returned an error.
    #[display("{_0}")]
    Failed(#[error(not(source))] Arc<anyhow::Error>),

    /// Hook panicked.
    #[display("Hook panicked: {_0}")]
    Panic(#[error(not(source))] Info),

    /// [`World`] cannot be created.
    ///
    /// [`World`]: crate::World
    #[display("Failed to initialize World: {_0}")]
    WorldInit(#[error(not(source))] String),
}

impl From<anyhow::Error> for HookError {
    fn from(err: anyhow::Error) -> Self {
        Self::Failed(Arc::new(err))
    }
}
