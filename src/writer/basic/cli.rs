// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! CLI options of terminal [`Writer`]s.
//!
//! [`Writer`]: crate::Writer

use std::str::FromStr;

use smart_default::SmartDefault;

/// CLI options of a [`Basic`] and a [`Progress`] [`Writer`].
///
/// [`Basic`]: super::Basic
/// [`Progress`]: crate::writer::Progress
/// [`Writer`]: crate::Writer
#[derive(Clone, Copy, Debug, SmartDefault, clap::Args)]
#[group(skip)]
pub struct Cli {
    /// Verbosity of an output.
    ///
    /// `-v` additionally outputs step's data table or doc string (if
    /// present), `-vv` additionally outputs matched patterns and their
    /// locations.
    #[arg(short, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Coloring policy for a console output.
    #[arg(
        long,
        value_name = "auto|always|never",
        default_value = "auto",
        global = true
    )]
    #[default(Coloring::Auto)]
    pub color: Coloring,
}

/// Possible policies of a [`console`] output coloring.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Coloring {
    /// Letting [`console::colors_enabled()`] to decide, whether output should
    /// be colored.
    Auto,

    /// Forcing of a colored output.
    Always,

    /// Forcing of a non-colored output.
    Never,
}

impl FromStr for Coloring {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            _ => Err("possible options: auto, always, never"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Coloring};

    #[test]
    fn parses_coloring() {
        assert_eq!("ALWAYS".parse(), Ok(Coloring::Always));
        assert_eq!("never".parse(), Ok(Coloring::Never));
        assert!("sometimes".parse::<Coloring>().is_err());
    }

    #[test]
    fn defaults_to_auto() {
        let cli = Cli::default();

        assert_eq!(cli.color, Coloring::Auto);
        assert_eq!(cli.verbose, 0);
    }
}
