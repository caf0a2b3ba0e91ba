// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::panic;

use derive_more::with_trait::Display;

/// Location in source code where a step definition was registered.
///
/// Filled from the caller of the registration method via `#[track_caller]`.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("{path}:{line}:{column}")]
pub struct Location {
    /// Path to the file where the step definition is registered.
    pub path: &'static str,

    /// Line of the file where the step definition is registered.
    pub line: u32,

    /// Column of the file where the step definition is registered.
    pub column: u32,
}

impl Location {
    /// Returns the [`Location`] of the caller of the function this is called
    /// in, provided that function is annotated with `#[track_caller]`.
    #[must_use]
    #[track_caller]
    pub fn caller() -> Self {
        let loc = panic::Location::caller();
        Self { path: loc.file(), line: loc.line(), column: loc.column() }
    }
}
