// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tools for obtaining [`gherkin::Feature`]s to run.

pub mod basic;
pub mod inline;

use std::{io, path::PathBuf, sync::Arc};

use derive_more::with_trait::Display;

#[doc(inline)]
pub use self::{basic::Basic, inline::Inline};

/// Source of [`gherkin::Feature`]s.
pub trait Parser<I> {
    /// Parses the given `input` into [`gherkin::Feature`]s.
    ///
    /// # Errors
    ///
    /// If the `input` cannot be read or parsed.
    fn parse(self, input: I) -> Result<Vec<gherkin::Feature>>;
}

/// Result of parsing [`gherkin::Feature`]s.
pub type Result<T> = std::result::Result<T, Error>;

/// Error of parsing [`gherkin::Feature`]s.
#[derive(Clone, Debug, Display, derive_more::with_trait::Error)]
pub enum Error {
    /// `.feature` file cannot be parsed.
    #[display("{_0}")]
    File(Arc<gherkin::ParseFileError>),

    /// Inline feature source cannot be parsed.
    #[display("Failed to parse inline feature #{index}: {error}")]
    Inline {
        /// Position of the source among the inline ones.
        #[error(not(source))]
        index: usize,

        /// Underlying error.
        error: Arc<gherkin::ParseError>,
    },

    /// Path cannot be accessed.
    #[display("Cannot access `{}`: {error}", path.display())]
    Io {
        /// Accessed path.
        #[error(not(source))]
        path: PathBuf,

        /// Underlying error.
        error: Arc<io::Error>,
    },

    /// Directory cannot be walked.
    #[display("Cannot walk `{}`: {message}", path.display())]
    Walk {
        /// Walked directory.
        #[error(not(source))]
        path: PathBuf,

        /// Description of the failure.
        #[error(not(source))]
        message: String,
    },
}

impl From<gherkin::ParseFileError> for Error {
    fn from(err: gherkin::ParseFileError) -> Self {
        Self::File(Arc::new(err))
    }
}
