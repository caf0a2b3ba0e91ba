// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Context a step handler is invoked with.

use std::{
    mem,
    sync::{Arc, Mutex, PoisonError},
};

use anyhow::anyhow;

use crate::{event::Source, pickle::DataTable, PickleStep};

use super::binder::{FromValue, Value};

/// Context for a step handler execution.
#[derive(Clone, Debug)]
pub struct Context {
    /// [`PickleStep`] being executed.
    pub step: Source<PickleStep>,

    /// Captured text of every parameter, [`None`] for non-participating
    /// groups.
    pub matches: Vec<Option<String>>,

    /// Typed arguments bound out of the [`Context::matches`].
    pub args: Vec<Value>,

    attachments: Attachments,
}

impl Context {
    pub(crate) const fn new(
        step: Source<PickleStep>,
        matches: Vec<Option<String>>,
        args: Vec<Value>,
        attachments: Attachments,
    ) -> Self {
        Self { step, matches, args, attachments }
    }

    /// Returns the `index`th bound argument converted into `T`.
    ///
    /// # Errors
    ///
    /// If there is no such argument, or it cannot be converted into `T`.
    pub fn arg<T: FromValue>(&self, index: usize) -> anyhow::Result<T> {
        let value = self.args.get(index).ok_or_else(|| {
            anyhow!("step `{}` has no argument #{index}", self.step.text)
        })?;
        T::from_value(value).ok_or_else(|| {
            anyhow!(
                "argument #{index} `{value}` of step `{}` cannot be converted \
                 into `{}`",
                self.step.text,
                std::any::type_name::<T>(),
            )
        })
    }

    /// Returns the data table argument of the step, if any.
    #[must_use]
    pub fn table(&self) -> Option<&DataTable> {
        self.step.table()
    }

    /// Returns the doc-string argument of the step, if any.
    #[must_use]
    pub fn docstring(&self) -> Option<&str> {
        self.step.docstring()
    }

    /// Attaches the given [`Attachment`] to the step being executed.
    pub fn attach(&self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    /// Attaches all the given [`Attachment`]s to the step being executed, in
    /// order.
    pub fn attach_all(&self, attachments: impl IntoIterator<Item = Attachment>) {
        for a in attachments {
            self.attach(a);
        }
    }
}

/// Data attached to a step by its handler.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attachment {
    /// Raw bytes.
    pub data: Vec<u8>,

    /// Media type of the [`Attachment::data`] (`text/plain`,
    /// `application/json`, `image/png`, ...).
    pub media_type: String,

    /// Optional file name.
    pub name: Option<String>,
}

impl Attachment {
    /// Creates a new [`Attachment`].
    #[must_use]
    pub fn new(data: impl Into<Vec<u8>>, media_type: impl Into<String>) -> Self {
        Self { data: data.into(), media_type: media_type.into(), name: None }
    }

    /// Creates a new `text/plain` [`Attachment`].
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(text.into(), "text/plain")
    }

    /// Sets the file name of this [`Attachment`].
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Shared buffer collecting the [`Attachment`]s of a single step execution.
#[derive(Clone, Debug, Default)]
pub(crate) struct Attachments(Arc<Mutex<Vec<Attachment>>>);

impl Attachments {
    fn push(&self, attachment: Attachment) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(attachment);
    }

    /// Takes every [`Attachment`] collected so far.
    pub(crate) fn take(&self) -> Vec<Attachment> {
        mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use gherkin::{LineCol, StepType};

    use super::{Attachment, Attachments, Context};
    use crate::{
        event::Source,
        pickle::{Argument, DataTable, PickleId, StepId},
        step::Value,
        PickleStep,
    };

    fn context(argument: Option<Argument>) -> (Context, Attachments) {
        let step = PickleStep {
            id: StepId::new(&PickleId::from("f:1".to_owned()), 0),
            keyword: "Given ".into(),
            ty: StepType::Given,
            text: "I have 5 cucumbers".into(),
            argument,
            is_background: false,
            position: LineCol { line: 2, col: 5 },
        };
        let attachments = Attachments::default();
        let ctx = Context::new(
            Source::new(step),
            vec![Some("5".into())],
            vec![Value::Int(5)],
            attachments.clone(),
        );
        (ctx, attachments)
    }

    #[test]
    fn converts_arguments() {
        let (ctx, _) = context(None);

        assert_eq!(ctx.arg::<u8>(0).unwrap(), 5);
        assert_eq!(ctx.arg::<String>(0).unwrap(), "5");
        assert!(ctx.arg::<i64>(1).is_err());
    }

    #[test]
    fn exposes_step_arguments() {
        let table = DataTable::new(vec![vec!["a".into()]]);
        let (ctx, _) = context(Some(Argument::Table(table.clone())));

        assert_eq!(ctx.table(), Some(&table));
        assert_eq!(ctx.docstring(), None);

        let (ctx, _) = context(Some(Argument::DocString("doc".into())));
        assert_eq!(ctx.docstring(), Some("doc"));
    }

    #[test]
    fn collects_attachments_in_order() {
        let (ctx, attachments) = context(None);

        ctx.attach(Attachment::text("first"));
        ctx.clone().attach_all([
            Attachment::new(b"{}".to_vec(), "application/json"),
            Attachment::text("third").named("log.txt"),
        ]);

        let taken = attachments.take();
        assert_eq!(taken.len(), 3);
        assert_eq!(taken[0].data, b"first");
        assert_eq!(taken[1].media_type, "application/json");
        assert_eq!(taken[2].name.as_deref(), Some("log.txt"));
        assert!(attachments.take().is_empty());
    }
}
