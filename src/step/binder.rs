// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Binding of captured step text into typed argument [`Value`]s.

use derive_more::with_trait::{Display, Error};

/// Declared type of a step parameter.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ParamType {
    /// Signed integer, bound as [`i64`]. Expression `{int}`.
    #[display("int")]
    Int,

    /// Floating point number, bound as [`f64`]. Expression `{float}`.
    #[display("float")]
    Float,

    /// Single word, bound as is. Expression `{word}`.
    #[display("word")]
    Word,

    /// Quoted string, bound without its surrounding quotes. Expression
    /// `{string}`.
    #[display("string")]
    String,

    /// Anything, bound as is. Expression `{}` and every regex capture group
    /// by default.
    #[display("anonymous")]
    Any,
}

impl ParamType {
    /// Parses the name of a Cucumber Expression parameter.
    #[must_use]
    pub fn from_expression(name: &str) -> Option<Self> {
        Some(match name {
            "int" => Self::Int,
            "float" => Self::Float,
            "word" => Self::Word,
            "string" => Self::String,
            "" => Self::Any,
            _ => return None,
        })
    }
}

/// Argument bound out of the step text.
#[derive(Clone, Debug, Display, PartialEq)]
pub enum Value {
    /// [`ParamType::Int`] argument.
    Int(i64),

    /// [`ParamType::Float`] argument.
    Float(f64),

    /// Textual argument.
    Str(String),
}

/// Error of binding a captured text to its declared [`ParamType`].
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
#[display("argument #{index} `{text}` is not a valid {expected}")]
pub struct ConversionError {
    /// Zero-based index of the argument.
    #[error(not(source))]
    pub index: usize,

    /// Captured text.
    #[error(not(source))]
    pub text: String,

    /// Declared type of the argument.
    #[error(not(source))]
    pub expected: ParamType,
}

/// Binds `captures` (one per capture group, [`None`] for non-participating
/// ones) according to the declared `params`.
///
/// # Errors
///
/// If a capture cannot be converted into its [`ParamType`].
pub fn bind(
    params: &[ParamType],
    captures: &[Option<&str>],
) -> Result<Vec<Value>, ConversionError> {
    params
        .iter()
        .zip(captures.iter().copied().chain(std::iter::repeat(None)))
        .enumerate()
        .map(|(index, (ty, text))| {
            let err = || ConversionError {
                index,
                text: text.unwrap_or_default().to_owned(),
                expected: *ty,
            };
            match ty {
                ParamType::Int => text
                    .and_then(|t| t.trim().parse().ok())
                    .map(Value::Int)
                    .ok_or_else(err),
                ParamType::Float => text
                    .and_then(|t| t.trim().parse().ok())
                    .map(Value::Float)
                    .ok_or_else(err),
                ParamType::String => {
                    Ok(Value::Str(unquote(text.unwrap_or_default()).to_owned()))
                }
                ParamType::Word | ParamType::Any => {
                    Ok(Value::Str(text.unwrap_or_default().to_owned()))
                }
            }
        })
        .collect()
}

/// Strips a pair of surrounding `"` or `'` quotes, if any.
fn unquote(s: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(q).and_then(|s| s.strip_suffix(q)) {
            return inner;
        }
    }
    s
}

/// Conversion of a bound [`Value`] into a concrete Rust type.
pub trait FromValue: Sized {
    /// Converts the given [`Value`], if it's compatible.
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! from_int {
    ($($ty:ty),*) => {$(
        impl FromValue for $ty {
            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::Int(i) => (*i).try_into().ok(),
                    Value::Str(s) => s.trim().parse().ok(),
                    Value::Float(_) => None,
                }
            }
        }
    )*};
}

from_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl FromValue for f64 {
    #[expect(clippy::cast_precision_loss, reason = "ints are exact up to 2^53")]
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as Self),
            Value::Str(s) => s.trim().parse().ok(),
        }
    }
}

impl FromValue for f32 {
    #[expect(clippy::cast_possible_truncation, reason = "user asked for f32")]
    fn from_value(value: &Value) -> Option<Self> {
        f64::from_value(value).map(|f| f as Self)
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.to_string())
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}
