// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tools for outputting [`Run`] events.
//!
//! Every [`Writer`] receives the events in [`Pickle`] input order, along with
//! the [`ResultStore`] they have been recorded into, so report formats may
//! either stream the events or render everything on [`Run::Finished`].
//!
//! [`Pickle`]: crate::Pickle
//! [`Run`]: event::Run
//! [`Run::Finished`]: event::Run::Finished

pub mod basic;
pub mod fanout;
pub mod formats;
#[cfg(feature = "output-json")]
pub mod json;
#[cfg(feature = "output-junit")]
pub mod junit;
pub mod out;
pub mod progress;
pub mod summary;
pub mod tee;

use async_trait::async_trait;
use sealed::sealed;

use crate::{event, Event, ResultStore};

#[cfg(feature = "output-json")]
#[doc(inline)]
pub use self::json::Json;
#[cfg(feature = "output-junit")]
#[doc(inline)]
pub use self::junit::JUnit;
#[doc(inline)]
pub use self::{
    basic::{Basic, Coloring},
    fanout::Fanout,
    formats::{Format, FormatError, Formats},
    progress::Progress,
    summary::Summarized,
    tee::Tee,
};

/// Writer of [`Run`] events to some output.
///
/// [`Run`]: event::Run
#[async_trait(?Send)]
pub trait Writer {
    /// Handles the given [`Run`] event.
    ///
    /// [`Run`]: event::Run
    async fn handle_event(&mut self, event: Event<event::Run>, store: &ResultStore);
}

#[async_trait(?Send)]
impl<T: Writer + ?Sized> Writer for Box<T> {
    async fn handle_event(&mut self, event: Event<event::Run>, store: &ResultStore) {
        (**self).handle_event(event, store).await;
    }
}

/// Extension of [`Writer`] for composing it with other ones.
#[sealed]
pub trait Ext: Writer + Sized {
    /// Passes events to both this and the `other` [`Writer`].
    #[must_use]
    fn tee<R: Writer>(self, other: R) -> Tee<Self, R>;

    /// Wraps this [`Writer`] to print a [`Summary`] once the run finishes.
    ///
    /// [`Summary`]: crate::store::Summary
    #[must_use]
    fn summarized(self) -> Summarized<Self>;

    /// Boxes this [`Writer`] to be used in a [`Fanout`].
    #[must_use]
    fn boxed(self) -> Box<dyn Writer>
    where
        Self: 'static;
}

#[sealed]
impl<T: Writer> Ext for T {
    fn tee<R: Writer>(self, other: R) -> Tee<Self, R> {
        Tee::new(self, other)
    }

    fn summarized(self) -> Summarized<Self> {
        Summarized::new(self)
    }

    fn boxed(self) -> Box<dyn Writer>
    where
        Self: 'static,
    {
        Box::new(self)
    }
}
