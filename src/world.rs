// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Per-[`Pickle`] user state.
//!
//! [`Pickle`]: crate::Pickle

use std::{fmt::Display, future::Future};

/// Represents a user-defined state living on a per-[`Pickle`] basis.
///
/// A fresh [`World`] is created for every attempt of every [`Pickle`] and is
/// exclusively owned by it, so it's never observed by two [`Pickle`]s at once.
/// If some state should be shared between [`Pickle`]s (ex. a database
/// connection pool), keep it behind a [`std::sync::LazyLock`] or pass it into
/// the step handlers' closures.
///
/// Failing to create a [`World`] fails the [`Pickle`] the same way as a failed
/// before-scenario hook does.
///
/// [`Pickle`]: crate::Pickle
pub trait World: Sized + 'static {
    /// Error of creating a new [`World`] instance.
    type Error: Display;

    /// Creates a new [`World`] instance.
    fn new() -> impl Future<Output = Result<Self, Self::Error>>;
}
