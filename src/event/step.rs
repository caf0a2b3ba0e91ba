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

use derive_more::with_trait::{Display, Error, From};

use crate::step;

use super::{HookError, HookType, Info, Status};

/// Event specific to a particular [`PickleStep`].
///
/// [`PickleStep`]: crate::PickleStep
#[derive(Clone, Debug)]
pub enum Step {
    /// Step execution being started.
    Started,

    /// Step text has been resolved to exactly one step definition.
    Matched {
        /// Source of the matched pattern.
        pattern: String,

        /// Where the matched definition was registered.
        location: Option<step::Location>,
    },

    /// No step definition matches the step text.
    Undefined {
        /// Suggested pattern for implementing the step.
        snippet: String,
    },

    /// Several step definitions match the step text.
    Ambiguous(step::AmbiguousMatchError),

    /// Step passed.
    Passed,

    /// Step failed.
    Failed(StepError),

    /// Step wasn't executed, as a previous one didn't pass.
    Skipped,

    /// Step handler is not implemented yet.
    Pending(Option<String>),
}

impl Step {
    /// Builds the terminal event of a step out of its final `status` and
    /// `error`.
    #[must_use]
    pub fn outcome(status: Status, error: Option<StepError>) -> Self {
        match status {
            Status::Passed => Self::Passed,
            Status::Skipped => Self::Skipped,
            Status::Failed => {
                Self::Failed(error.unwrap_or(StepError::Intercepted))
            }
            Status::Pending => Self::Pending(match error {
                Some(StepError::Pending(msg)) => msg,
                _ => None,
            }),
            Status::Undefined => Self::Undefined {
                snippet: match error {
                    Some(StepError::NotFound { snippet }) => snippet,
                    _ => String::new(),
                },
            },
            Status::Ambiguous => Self::Ambiguous(match error {
                Some(StepError::AmbiguousMatch(e)) => e,
                _ => step::AmbiguousMatchError::default(),
            }),
        }
    }

    /// Returns the [`Status`] of this event, if it's a terminal one.
    #[must_use]
    pub const fn status(&self) -> Option<Status> {
        Some(match self {
            Self::Started | Self::Matched { .. } => return None,
            Self::Undefined { .. } => Status::Undefined,
            Self::Ambiguous(_) => Status::Ambiguous,
            Self::Passed => Status::Passed,
            Self::Failed(_) => Status::Failed,
            Self::Skipped => Status::Skipped,
            Self::Pending(_) => Status::Pending,
        })
    }
}

/// Error of executing a [`PickleStep`].
///
/// [`PickleStep`]: crate::PickleStep
#[derive(Clone, Debug, Display, Error, From)]
pub enum StepError {
    /// Step doesn't match any step definition.
    #[display("Step doesn't match any function")]
    #[from(ignore)]
    NotFound {
        /// Suggested pattern for implementing the step.
        #[error(not(source))]
        snippet: String,
    },

    /// Step matches several step definitions.
    #[display("Step match is ambiguous: {_0}")]
    AmbiguousMatch(step::AmbiguousMatchError),

    /// Captured text cannot be bound to a declared parameter type.
    #[display("Cannot bind step argument: {_0}")]
    Conversion(step::ConversionError),

    /// Step handler returned an error.
    #[display("{_0}")]
    #[from(ignore)]
    Failed(#[error(not(source))] Arc<anyhow::Error>),

    /// Step handler panicked.
    #[display("Step panicked. Captured output: {_0}")]
    #[from(ignore)]
    Panic(#[error(not(source))] Info),

    /// Step handler asked for the whole [`Pickle`] to be retried.
    ///
    /// [`Pickle`]: crate::Pickle
    #[display("{_0}")]
    #[from(ignore)]
    Retryable(#[error(not(source))] Arc<anyhow::Error>),

    /// Step handler is not implemented yet.
    #[display("Step is pending{}", _0.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    #[from(ignore)]
    Pending(#[error(not(source))] Option<String>),

    /// Before-step or after-step hook failed.
    #[display("{which} hook failed: {error}")]
    #[from(ignore)]
    Hook {
        /// Boundary of the failed hook.
        #[error(not(source))]
        which: HookType,

        /// Failure of the hook.
        error: HookError,
    },

    /// Step result was turned into a failure by an interceptor.
    #[display("Step was failed by an interceptor")]
    #[from(ignore)]
    Intercepted,
}

impl StepError {
    /// Indicates whether this error asks for the [`Pickle`] to be retried.
    ///
    /// [`Pickle`]: crate::Pickle
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }
}
