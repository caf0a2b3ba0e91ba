// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Passing events to two [`Writer`]s simultaneously.

use async_trait::async_trait;
use futures::future;

use crate::{event, Event, ResultStore, Writer};

/// Wrapper for passing events to two [`Writer`]s simultaneously.
#[derive(Clone, Debug)]
pub struct Tee<L, R> {
    /// Left [`Writer`].
    left: L,

    /// Right [`Writer`].
    right: R,
}

impl<L, R> Tee<L, R> {
    /// Creates a new [`Tee`] [`Writer`], which passes events both to the `left`
    /// and `right` [`Writer`]s simultaneously.
    #[must_use]
    pub const fn new(left: L, right: R) -> Self {
        Self { left, right }
    }

    /// Returns the left [`Writer`].
    #[must_use]
    pub const fn left(&self) -> &L {
        &self.left
    }

    /// Returns the right [`Writer`].
    #[must_use]
    pub const fn right(&self) -> &R {
        &self.right
    }
}

#[async_trait(?Send)]
impl<L: Writer, R: Writer> Writer for Tee<L, R> {
    async fn handle_event(&mut self, event: Event<event::Run>, store: &ResultStore) {
        _ = future::join(
            self.left.handle_event(event.clone(), store),
            self.right.handle_event(event, store),
        )
        .await;
    }
}
