// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Setup errors aborting a run before any [`Pickle`] is executed, and the
//! process exit contract.
//!
//! [`Pickle`]: crate::Pickle

use std::process;

use derive_more::with_trait::{Display, From};

use crate::{parser, pickle, step, writer};

/// Error preventing a run from being executed at all.
///
/// Errors of [`Step`]s and hooks never end up here: they are reported through
/// events and the [`ResultStore`] instead.
///
/// [`ResultStore`]: crate::ResultStore
/// [`Step`]: crate::PickleStep
#[derive(Clone, Debug, Display, derive_more::with_trait::Error, From)]
pub enum Error {
    /// Failed to read or parse a `.feature` file.
    #[display("Failed to parse feature: {_0}")]
    Parsing(parser::Error),

    /// [`Pickle`]s cannot be built from the parsed features.
    ///
    /// [`Pickle`]: crate::Pickle
    #[display("Failed to build pickles: {_0}")]
    Build(pickle::BuildError),

    /// Step pattern cannot be compiled.
    #[display("Invalid step pattern: {_0}")]
    Pattern(step::PatternError),

    /// The same step pattern is registered several times while duplicates are
    /// denied.
    #[display("Duplicate step pattern `{_0}`")]
    #[from(ignore)]
    DuplicatePattern(#[error(not(source))] String),

    /// Requested output format cannot be set up.
    #[display("Failed to set up output: {_0}")]
    Format(writer::FormatError),
}

/// Exit status of a run.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum ExitCode {
    /// Every executed [`Pickle`] passed.
    ///
    /// [`Pickle`]: crate::Pickle
    #[display("success")]
    Success = 0,

    /// At least one [`Pickle`] failed, was aborted, or a hook failed.
    ///
    /// [`Pickle`]: crate::Pickle
    #[display("failure")]
    Failure = 1,

    /// Parsing, building or configuration failed before the run.
    #[display("setup error")]
    SetupError = 2,

    /// No [`Pickle`] matched the filters.
    ///
    /// [`Pickle`]: crate::Pickle
    #[display("no pickles")]
    NoPickles = 77,
}

impl ExitCode {
    /// Returns the numeric process status of this [`ExitCode`].
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code.code())
    }
}

impl From<&Error> for ExitCode {
    fn from(_: &Error) -> Self {
        Self::SetupError
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ExitCode};

    #[test]
    fn exit_codes_are_stable() {
        assert_eq!(ExitCode::Success.code(), 0);
        assert_eq!(ExitCode::Failure.code(), 1);
        assert_eq!(ExitCode::SetupError.code(), 2);
        assert_eq!(ExitCode::NoPickles.code(), 77);
    }

    #[test]
    fn setup_errors_map_to_setup_exit_code() {
        let err = Error::DuplicatePattern("I eat (\\d+)".into());

        assert_eq!(ExitCode::from(&err), ExitCode::SetupError);
        assert_eq!(err.to_string(), "Duplicate step pattern `I eat (\\d+)`");
    }
}
