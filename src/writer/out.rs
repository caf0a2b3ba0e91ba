// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tools for writing output.

use std::{borrow::Cow, io, str};

use console::Style;
use derive_more::with_trait::{Deref, DerefMut, Display, From, Into};

use crate::Status;

use super::basic::Coloring;

/// [`Style`]s for terminal output.
#[derive(Clone, Debug)]
pub struct Styles {
    /// [`Style`] for rendering passed steps.
    pub ok: Style,

    /// [`Style`] for rendering skipped steps.
    pub skipped: Style,

    /// [`Style`] for rendering pending and undefined steps.
    pub warn: Style,

    /// [`Style`] for rendering failures.
    pub err: Style,

    /// [`Style`] for rendering headers.
    pub header: Style,

    /// [`Style`] for rendering __bold__.
    pub bold: Style,

    /// Indicates whether styles are applied at all.
    pub is_present: bool,
}

impl Default for Styles {
    fn default() -> Self {
        Self {
            ok: Style::new().green(),
            skipped: Style::new().cyan(),
            warn: Style::new().yellow(),
            err: Style::new().red(),
            header: Style::new().blue(),
            bold: Style::new().bold(),
            is_present: console::colors_enabled(),
        }
    }
}

impl Styles {
    /// Creates new [`Styles`], applied according to the given [`Coloring`].
    #[must_use]
    pub fn new(coloring: Coloring) -> Self {
        let mut styles = Self::default();
        styles.apply_coloring(coloring);
        styles
    }

    /// Applies the given [`Coloring`] to these [`Styles`].
    pub fn apply_coloring(&mut self, coloring: Coloring) {
        self.is_present = match coloring {
            Coloring::Auto => console::colors_enabled(),
            Coloring::Always => true,
            Coloring::Never => false,
        };
        for s in [
            &mut self.ok,
            &mut self.skipped,
            &mut self.warn,
            &mut self.err,
            &mut self.header,
            &mut self.bold,
        ] {
            *s = s.clone().force_styling(self.is_present);
        }
    }

    /// Colors `input` with the [`Style`] of the given [`Status`].
    #[must_use]
    pub fn status<'a>(&self, status: Status, input: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
        let style = match status {
            Status::Passed => &self.ok,
            Status::Skipped => &self.skipped,
            Status::Pending | Status::Undefined => &self.warn,
            Status::Failed | Status::Ambiguous => &self.err,
        };
        self.apply(style, input)
    }

    /// Colors `input` with [`Styles::ok`].
    #[must_use]
    pub fn ok<'a>(&self, input: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
        self.apply(&self.ok, input)
    }

    /// Colors `input` with [`Styles::skipped`].
    #[must_use]
    pub fn skipped<'a>(&self, input: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
        self.apply(&self.skipped, input)
    }

    /// Colors `input` with [`Styles::err`].
    #[must_use]
    pub fn err<'a>(&self, input: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
        self.apply(&self.err, input)
    }

    /// Colors `input` with [`Styles::header`].
    #[must_use]
    pub fn header<'a>(&self, input: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
        self.apply(&self.header, input)
    }

    /// Makes `input` __bold__.
    #[must_use]
    pub fn bold<'a>(&self, input: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
        self.apply(&self.bold, input)
    }

    fn apply<'a>(&self, style: &Style, input: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
        if self.is_present {
            style.apply_to(input.into()).to_string().into()
        } else {
            input.into()
        }
    }
}

/// [`io::Write`] extension for easier manipulation with strings.
pub trait WriteStrExt: io::Write {
    /// Writes the given `string` into this writer.
    ///
    /// # Errors
    ///
    /// If this writer fails to write the given `string`.
    fn write_str(&mut self, string: impl AsRef<str>) -> io::Result<()> {
        self.write_all(string.as_ref().as_bytes())
    }

    /// Writes the given `string` into this writer followed by a newline.
    ///
    /// # Errors
    ///
    /// If this writer fails to write the given `string`.
    fn write_line(&mut self, string: impl AsRef<str>) -> io::Result<()> {
        self.write_str(string.as_ref())?;
        self.write_str("\n")
    }
}

impl<T: io::Write + ?Sized> WriteStrExt for T {}

/// [`String`] wrapper implementing [`io::Write`].
#[derive(
    Clone, Debug, Default, Deref, DerefMut, Display, Eq, From, Hash, Into, PartialEq,
)]
pub struct WritableString(pub String);

impl io::Write for WritableString {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.push_str(
            str::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
        );
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Logs a failure to write output instead of aborting the run.
pub(crate) fn log_failure(res: io::Result<()>, writer: &str) {
    if let Err(e) = res {
        tracing::error!(writer, error = %e, "failed to write output");
    }
}
