// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::{
    hash::{Hash, Hasher},
    sync::Arc,
};

use derive_more::with_trait::{AsRef, Debug, Deref, From, Into};

/// Shared handle to a read-only part of the run: a [`gherkin`] node, a
/// [`Pickle`] or a [`PickleStep`].
///
/// [`Clone`] is cheap, while [`PartialEq`] and [`Hash`] compare identity
/// rather than contents, so two textually equal scenarios stay distinct.
///
/// [`Pickle`]: crate::Pickle
/// [`PickleStep`]: crate::PickleStep
#[derive(AsRef, Debug, Deref, From, Into)]
#[as_ref(forward)]
#[debug("{:?}", **_0)]
#[debug(bound(T: std::fmt::Debug))]
#[deref(forward)]
pub struct Source<T: ?Sized>(Arc<T>);

impl<T> Source<T> {
    /// Wraps the provided `value` into a new [`Source`].
    #[must_use]
    pub fn new(value: T) -> Self {
        Self(Arc::new(value))
    }
}

// Manual implementation is required to omit the redundant `T: Clone` trait
// bound imposed by `#[derive(Clone)]`.
impl<T: ?Sized> Clone for Source<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: ?Sized> Eq for Source<T> {}

impl<T: ?Sized> PartialEq for Source<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: ?Sized> Hash for Source<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).cast::<()>().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::Source;

    #[test]
    fn compares_by_identity() {
        let a = Source::new("scenario".to_owned());
        let b = Source::new("scenario".to_owned());

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(*a, *b);
    }
}
