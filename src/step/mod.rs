// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Step definitions: patterns, handlers, matching and argument binding.

pub mod binder;
pub mod collection;
pub mod context;
pub mod error;
pub mod location;
pub mod pattern;
pub mod snippet;

use std::fmt;

#[doc(inline)]
pub use self::{
    binder::{ConversionError, FromValue, ParamType, Value},
    collection::{Collection, Handler, Match, MatchPolicy, Resolved},
    context::{Attachment, Context},
    error::AmbiguousMatchError,
    location::Location,
    pattern::{Kind, Pattern, PatternError},
};

/// Result of a step handler.
pub type Result = std::result::Result<(), Failure>;

/// Non-passing outcome of a step handler.
///
/// Any error converts into [`Failure::Error`], so handlers may use `?` freely.
pub enum Failure {
    /// Step failed.
    Error(anyhow::Error),

    /// Step is not implemented yet, with an optional message.
    Pending(Option<String>),

    /// Step failed in a way worth re-running the whole [`Pickle`] for.
    ///
    /// [`Pickle`]: crate::Pickle
    Retry(anyhow::Error),
}

impl Failure {
    /// Creates a [`Failure::Pending`] without a message.
    #[must_use]
    pub const fn pending() -> Self {
        Self::Pending(None)
    }

    /// Creates a [`Failure::Pending`] with the given message.
    #[must_use]
    pub fn pending_with(msg: impl Into<String>) -> Self {
        Self::Pending(Some(msg.into()))
    }

    /// Creates a [`Failure::Retry`] out of the given error.
    #[must_use]
    pub fn retry(err: impl Into<anyhow::Error>) -> Self {
        Self::Retry(err.into())
    }
}

impl<E: Into<anyhow::Error>> From<E> for Failure {
    fn from(err: E) -> Self {
        Self::Error(err.into())
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(e) => f.debug_tuple("Error").field(e).finish(),
            Self::Pending(m) => f.debug_tuple("Pending").field(m).finish(),
            Self::Retry(e) => f.debug_tuple("Retry").field(e).finish(),
        }
    }
}
