// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Release of [`Pickle`] events in input order.
//!
//! [`Pickle`]: crate::Pickle

use std::mem;

use futures::channel::mpsc;
use linked_hash_map::LinkedHashMap;

use crate::{
    event::{self, Source},
    Event, Pickle,
};

/// Events of a dispatched [`Pickle`] waiting for the preceding ones.
#[derive(Debug)]
struct Buffer {
    pickle: Source<Pickle>,
    events: Vec<Event<event::Pickle>>,
    done: bool,
}

/// Queue releasing the events of concurrently running [`Pickle`]s strictly in
/// their input order.
///
/// [`Pickle`]s are dispatched in input order, so the front of the queue is
/// always the earliest unfinished one. Its events are released as they come,
/// while the events of the others are buffered until it finishes.
/// [`event::Feature::Started`] and [`event::Feature::Finished`] are emitted
/// around the released events of every [`gherkin::Feature`].
#[derive(Debug)]
pub(super) struct Queue {
    pending: LinkedHashMap<usize, Buffer>,
    feature: Option<Source<gherkin::Feature>>,
    sender: mpsc::UnboundedSender<Event<event::Run>>,
}

impl Queue {
    pub(super) fn new(sender: mpsc::UnboundedSender<Event<event::Run>>) -> Self {
        Self { pending: LinkedHashMap::new(), feature: None, sender }
    }

    /// Sends the given run-level event right away.
    pub(super) fn send(&self, event: Event<event::Run>) {
        // Receiver being dropped means no one is interested in events anymore.
        _ = self.sender.unbounded_send(event);
    }

    /// Marks the [`Pickle`] at the given input `index` as dispatched.
    pub(super) fn dispatch(&mut self, index: usize, pickle: Source<Pickle>) {
        _ = self.pending.insert(index, Buffer { pickle, events: Vec::new(), done: false });
    }

    /// Releases or buffers the given event of the [`Pickle`] at `index`.
    pub(super) fn push(&mut self, index: usize, event: Event<event::Pickle>) {
        if self.front() == Some(index) {
            if let Some(pickle) = self.pending.get(&index).map(|b| b.pickle.clone()) {
                self.release(&pickle, event);
            }
        } else if let Some(buffer) = self.pending.get_mut(&index) {
            buffer.events.push(event);
        } else {
            tracing::warn!(index, "event of undispatched pickle");
        }
    }

    /// Marks the [`Pickle`] at `index` as finished, releasing every buffered
    /// event that may now go.
    pub(super) fn finish(&mut self, index: usize) {
        if let Some(buffer) = self.pending.get_mut(&index) {
            buffer.done = true;
        }

        while let Some(front) = self.front() {
            let Some(buffer) = self.pending.get_mut(&front) else {
                break;
            };
            let events = mem::take(&mut buffer.events);
            let (pickle, done) = (buffer.pickle.clone(), buffer.done);
            for ev in events {
                self.release(&pickle, ev);
            }
            if !done {
                break;
            }
            _ = self.pending.pop_front();
        }
    }

    /// Emits [`event::Feature::Finished`] for the last released
    /// [`gherkin::Feature`].
    pub(super) fn close(&mut self) {
        if !self.pending.is_empty() {
            tracing::warn!(left = self.pending.len(), "closing queue of unfinished pickles");
        }
        if let Some(f) = self.feature.take() {
            self.send(Event::new(event::Run::Feature(f, event::Feature::Finished)));
        }
    }

    fn front(&self) -> Option<usize> {
        self.pending.front().map(|(i, _)| *i)
    }

    fn release(&mut self, pickle: &Source<Pickle>, event: Event<event::Pickle>) {
        if self.feature.as_ref() != Some(&pickle.feature) {
            if let Some(prev) = self.feature.replace(pickle.feature.clone()) {
                self.send(Event::new(event::Run::Feature(prev, event::Feature::Finished)));
            }
            self.send(Event::new(event::Run::Feature(
                pickle.feature.clone(),
                event::Feature::Started,
            )));
        }
        let pickle = pickle.clone();
        self.send(event.map(|ev| event::Run::pickle(pickle, ev)));
    }
}

#[cfg(test)]
mod tests {
    use futures::{channel::mpsc, StreamExt as _};
    use gherkin::GherkinEnv;

    use super::Queue;
    use crate::{
        event::{self, Source},
        pickle, Event, Status,
    };

    fn pickles() -> Vec<Source<crate::Pickle>> {
        let parse = |src: &str| gherkin::Feature::parse(src, GherkinEnv::default()).unwrap();
        let features = [
            parse("Feature: A\n  Scenario: a1\n    Given x\n  Scenario: a2\n    Given x\n"),
            parse("Feature: B\n  Scenario: b1\n    Given x\n"),
        ];
        pickle::build(&features).unwrap().into_iter().map(Source::new).collect()
    }

    fn describe(ev: &event::Run) -> String {
        match ev {
            event::Run::Feature(f, event::Feature::Started) => format!("start {}", f.name),
            event::Run::Feature(f, event::Feature::Finished) => format!("finish {}", f.name),
            event::Run::Feature(_, event::Feature::Pickle(p, ev)) => {
                format!("{} {}", p.name, if ev.is_terminal() { "done" } else { "started" })
            }
            event::Run::Started { .. } | event::Run::Hook(..) | event::Run::Finished(_) => {
                "run".into()
            }
        }
    }

    #[test]
    fn releases_in_input_order() {
        let pickles = pickles();
        let (tx, rx) = mpsc::unbounded();
        let mut queue = Queue::new(tx);
        for (i, p) in pickles.iter().enumerate() {
            queue.dispatch(i, p.clone());
        }
        let started = || Event::new(event::Pickle::Started { retries: None });
        let finished = || Event::new(event::Pickle::Finished(Status::Passed));

        queue.push(2, started());
        queue.push(2, finished());
        queue.finish(2);
        queue.push(1, started());
        queue.push(0, started());
        queue.push(1, finished());
        queue.finish(1);
        queue.push(0, finished());
        queue.finish(0);
        queue.close();
        drop(queue);

        let events = futures::executor::block_on(rx.map(|e| describe(&e)).collect::<Vec<_>>());
        assert_eq!(
            events,
            [
                "start A",
                "a1 started",
                "a1 done",
                "a2 started",
                "a2 done",
                "finish A",
                "start B",
                "b1 started",
                "b1 done",
                "finish B",
            ],
        );
    }
}
