// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Key occurrences in a lifecycle of a run.
//!
//! The top-level enum here is [`Run`]. Each event enum contains variants
//! indicating what stage of execution the [`runner`] is at, and variants with
//! detailed content about the precise sub-event.
//!
//! Events reach [`Writer`]s in the input order of [`Pickle`]s, regardless of
//! the order they have actually completed in.
//!
//! [`Pickle`]: crate::Pickle
//! [`Writer`]: crate::Writer
//! [`runner`]: crate::runner

mod hook;
mod pickle;
mod retries;
mod source;
mod status;
mod step;

use std::{any::Any, sync::Arc, time::SystemTime};

use derive_more::with_trait::{AsRef, Deref, DerefMut};

use crate::store::Summary;

#[doc(inline)]
pub use self::{
    hook::{Hook, HookError, HookType},
    pickle::Pickle,
    retries::Retries,
    source::Source,
    status::Status,
    step::{Step, StepError},
};

/// Message of a panic caught with [`catch_unwind()`].
///
/// [`catch_unwind()`]: std::panic::catch_unwind()
pub type Info = Arc<str>;

/// Arbitrary event, paired with the time it has happened at.
#[derive(AsRef, Clone, Copy, Debug, Deref, DerefMut)]
#[non_exhaustive]
pub struct Event<T: ?Sized> {
    /// [`SystemTime`] when this [`Event`] has happened.
    pub at: SystemTime,

    /// Actual value of this [`Event`].
    #[as_ref]
    #[deref]
    #[deref_mut]
    pub value: T,
}

impl<T> Event<T> {
    /// Creates a new [`Event`] out of the given `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self { at: SystemTime::now(), value }
    }

    /// Unwraps the inner [`Event::value`] loosing the attached time.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Splits this [`Event`] to the inner [`Event::value`] and its time.
    #[must_use]
    pub fn split(self) -> (T, SystemTime) {
        (self.value, self.at)
    }

    /// Maps the inner [`Event::value`] with the given function, keeping the
    /// original time.
    #[must_use]
    pub fn map<V>(self, f: impl FnOnce(T) -> V) -> Event<V> {
        Event { at: self.at, value: f(self.value) }
    }
}

/// Top-level run event.
#[derive(Clone, Debug)]
pub enum Run {
    /// Run has started, with the number of [`Pickle`]s to be executed.
    ///
    /// [`Pickle`]: crate::Pickle
    Started {
        /// Number of [`Pickle`]s left after filtering.
        ///
        /// [`Pickle`]: crate::Pickle
        pickles: usize,
    },

    /// Before-suite or after-suite hook event.
    Hook(HookType, Hook),

    /// [`Feature`] event.
    Feature(Source<gherkin::Feature>, Feature),

    /// Run has finished.
    Finished(Summary),
}

impl Run {
    /// Constructs an event of a [`Pickle`] being emitted inside its feature.
    ///
    /// [`Pickle`]: crate::Pickle
    #[must_use]
    pub fn pickle(pickle: Source<crate::Pickle>, event: Pickle) -> Self {
        Self::Feature(pickle.feature.clone(), Feature::Pickle(pickle, event))
    }
}

/// Event specific to a particular [Feature].
///
/// [Feature]: https://cucumber.io/docs/gherkin/reference#feature
#[derive(Clone, Debug)]
pub enum Feature {
    /// First [`Pickle`] of this [`Feature`] is about to be reported.
    ///
    /// [`Pickle`]: crate::Pickle
    Started,

    /// [`Pickle`] event.
    ///
    /// [`Pickle`]: crate::Pickle
    Pickle(Source<crate::Pickle>, Pickle),

    /// Every [`Pickle`] of this [`Feature`] has been reported.
    ///
    /// [`Pickle`]: crate::Pickle
    Finished,
}

/// Coerces a [`catch_unwind()`] payload into a human-readable [`Info`].
///
/// [`catch_unwind()`]: std::panic::catch_unwind()
#[must_use]
pub fn coerce_panic(payload: &(dyn Any + Send)) -> Info {
    payload
        .downcast_ref::<String>()
        .map(|s| s.as_str().into())
        .or_else(|| payload.downcast_ref::<&str>().map(|s| (*s).into()))
        .unwrap_or_else(|| "(Could not resolve panic payload)".into())
}

#[cfg(test)]
mod tests {
    use super::{coerce_panic, Event};

    #[test]
    fn map_keeps_time() {
        let ev = Event::new(2);
        let at = ev.at;

        let mapped = ev.map(|v| v * 10);

        assert_eq!(mapped.at, at);
        assert_eq!(*mapped, 20);
    }

    #[test]
    fn coerces_panic_payloads() {
        assert_eq!(&*coerce_panic(&"owned".to_owned()), "owned");
        assert_eq!(&*coerce_panic(&"borrowed"), "borrowed");
        assert_eq!(&*coerce_panic(&42_u8), "(Could not resolve panic payload)");
    }
}
