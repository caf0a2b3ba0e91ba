// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![doc = include_str!("../README.md")]
#![deny(nonstandard_style, rustdoc::all, trivial_casts, trivial_numeric_casts)]
#![forbid(non_ascii_idents, unsafe_code)]
#![warn(
    clippy::unwrap_used,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unused_import_braces,
    unused_labels,
    unused_qualifications,
    unused_results
)]

pub mod cli;
pub mod error;
pub mod event;
pub mod hook;
pub mod interceptor;
pub mod parser;
pub mod pickle;
pub mod runner;
pub mod step;
pub mod store;
pub mod suite;
pub mod tag;
pub mod world;
pub mod writer;

#[doc(no_inline)]
pub use gherkin;

#[doc(inline)]
pub use self::{
    error::{Error, ExitCode},
    event::{Event, Status},
    pickle::{Pickle, PickleStep},
    step::{Attachment, Context, Failure},
    store::ResultStore,
    suite::{Report, Suite},
    world::World,
    writer::{Ext as WriterExt, Writer},
};
