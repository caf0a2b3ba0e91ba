// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Passing events to a runtime-selected set of [`Writer`]s.

use std::fmt;

use async_trait::async_trait;
use futures::future;

use crate::{event, Event, ResultStore, Writer};

/// [`Writer`] passing every event to each of its boxed [`Writer`]s.
///
/// Unlike a [`Tee`], the set of [`Writer`]s may be chosen at runtime, for
/// example out of the `--format` CLI option.
///
/// [`Tee`]: super::Tee
#[derive(Default)]
pub struct Fanout {
    writers: Vec<Box<dyn Writer>>,
}

impl fmt::Debug for Fanout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fanout").field("writers", &self.writers.len()).finish()
    }
}

impl Fanout {
    /// Creates a new empty [`Fanout`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the given [`Writer`] to this [`Fanout`].
    #[must_use]
    pub fn with(mut self, writer: impl Writer + 'static) -> Self {
        self.push(Box::new(writer));
        self
    }

    /// Adds the given boxed [`Writer`] to this [`Fanout`].
    pub fn push(&mut self, writer: Box<dyn Writer>) {
        self.writers.push(writer);
    }

    /// Returns the number of [`Writer`]s in this [`Fanout`].
    #[must_use]
    pub fn len(&self) -> usize {
        self.writers.len()
    }

    /// Indicates whether this [`Fanout`] has no [`Writer`]s.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }
}

#[async_trait(?Send)]
impl Writer for Fanout {
    async fn handle_event(&mut self, event: Event<event::Run>, store: &ResultStore) {
        _ = future::join_all(
            self.writers.iter_mut().map(|w| w.handle_event(event.clone(), store)),
        )
        .await;
    }
}
