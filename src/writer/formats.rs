// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Runtime selection of output formats.

use std::{
    fs, io,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

use derive_more::with_trait::{Display, Error};

use super::{basic, Basic, Fanout, Progress};

/// Single output format, optionally written into a file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Format {
    /// Human-readable [`Basic`] output.
    Pretty,

    /// Single character per step [`Progress`] output.
    Progress,

    /// [Cucumber JSON format][1], into the given file or to stdout.
    ///
    /// [1]: https://github.com/cucumber/cucumber-json-schema
    Json(Option<PathBuf>),

    /// [JUnit XML report][1], into the given file or to stdout.
    ///
    /// [1]: https://llg.cubic.org/docs/junit
    JUnit(Option<PathBuf>),
}

impl FromStr for Format {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, path) = match s.trim().split_once(':') {
            Some((name, path)) => (name, Some(path.trim())),
            None => (s.trim(), None),
        };
        if path.is_some_and(str::is_empty) {
            return Err(FormatError::MissingPath(name.into()));
        }
        let path = path.map(PathBuf::from);

        match name.to_ascii_lowercase().as_str() {
            "pretty" | "basic" if path.is_none() => Ok(Self::Pretty),
            "progress" if path.is_none() => Ok(Self::Progress),
            "json" | "cucumber" => Ok(Self::Json(path)),
            "junit" => Ok(Self::JUnit(path)),
            _ => Err(FormatError::Unknown(s.trim().into())),
        }
    }
}

/// Comma-separated list of [`Format`]s, like
/// `pretty,json:out.json,junit:out.xml`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Formats(pub Vec<Format>);

impl Default for Formats {
    fn default() -> Self {
        Self(vec![Format::Pretty])
    }
}

impl FromStr for Formats {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let formats = s
            .split(',')
            .filter(|f| !f.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<_>, _>>()?;
        if formats.is_empty() {
            return Err(FormatError::Unknown(s.into()));
        }
        Ok(Self(formats))
    }
}

impl Formats {
    /// Builds a [`Fanout`] of the [`Writer`]s of these [`Formats`], creating
    /// the output files.
    ///
    /// # Errors
    ///
    /// If an output file cannot be created, or a [`Format`] is disabled by
    /// crate features.
    ///
    /// [`Writer`]: crate::Writer
    pub fn into_writer(self, cli: basic::Cli) -> Result<Fanout, FormatError> {
        let mut fanout = Fanout::new();
        for format in self.0 {
            tracing::debug!(?format, "selecting output format");
            match format {
                Format::Pretty => fanout.push(Box::new(Basic::new(io::stdout(), cli))),
                Format::Progress => fanout.push(Box::new(Progress::new(io::stdout(), cli))),
                Format::Json(path) => json(&mut fanout, path.as_deref())?,
                Format::JUnit(path) => junit(&mut fanout, path.as_deref())?,
            }
        }
        Ok(fanout)
    }
}

#[cfg(feature = "output-json")]
fn json(fanout: &mut Fanout, path: Option<&Path>) -> Result<(), FormatError> {
    match path {
        Some(p) => fanout.push(Box::new(super::Json::new(create(p)?))),
        None => fanout.push(Box::new(super::Json::new(io::stdout()))),
    }
    Ok(())
}

#[cfg(not(feature = "output-json"))]
fn json(_: &mut Fanout, _: Option<&Path>) -> Result<(), FormatError> {
    Err(FormatError::Disabled("json"))
}

#[cfg(feature = "output-junit")]
fn junit(fanout: &mut Fanout, path: Option<&Path>) -> Result<(), FormatError> {
    match path {
        Some(p) => fanout.push(Box::new(super::JUnit::new(create(p)?))),
        None => fanout.push(Box::new(super::JUnit::new(io::stdout()))),
    }
    Ok(())
}

#[cfg(not(feature = "output-junit"))]
fn junit(_: &mut Fanout, _: Option<&Path>) -> Result<(), FormatError> {
    Err(FormatError::Disabled("junit"))
}

#[cfg_attr(
    not(any(feature = "output-json", feature = "output-junit")),
    expect(dead_code, reason = "used by file formats only")
)]
fn create(path: &Path) -> Result<fs::File, FormatError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| FormatError::io(path, e))?;
    }
    fs::File::create(path).map_err(|e| FormatError::io(path, e))
}

/// Error of selecting output [`Format`]s.
#[derive(Clone, Debug, Display, Error)]
pub enum FormatError {
    /// Unknown format name.
    #[display(
        "Unknown output format `{_0}`, expected one of: pretty, progress, \
         json[:path], junit[:path]"
    )]
    Unknown(#[error(not(source))] String),

    /// Format name followed by an empty path.
    #[display("Output format `{_0}` requires a path after `:`")]
    MissingPath(#[error(not(source))] String),

    /// Format is disabled by crate features.
    #[display("Output format `{_0}` is disabled by crate features")]
    Disabled(#[error(not(source))] &'static str),

    /// Output file cannot be created.
    #[display("Cannot create `{}`: {error}", path.display())]
    Io {
        /// Path to the output file.
        #[error(not(source))]
        path: PathBuf,

        /// Underlying error.
        error: Arc<io::Error>,
    },
}

impl FormatError {
    fn io(path: &Path, error: io::Error) -> Self {
        Self::Io { path: path.to_owned(), error: Arc::new(error) }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{Format, FormatError, Formats};
    use crate::writer::basic::{Cli, Coloring};

    #[test]
    fn parses_format_list() {
        let formats = "pretty, json:out/report.json,junit:out.xml,progress"
            .parse::<Formats>()
            .unwrap();

        assert_eq!(
            formats.0,
            [
                Format::Pretty,
                Format::Json(Some(PathBuf::from("out/report.json"))),
                Format::JUnit(Some(PathBuf::from("out.xml"))),
                Format::Progress,
            ],
        );
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json(None));
    }

    #[test]
    fn rejects_unknown_formats() {
        assert!(matches!("html".parse::<Formats>(), Err(FormatError::Unknown(f)) if f == "html"));
        assert!(matches!("json:".parse::<Format>(), Err(FormatError::MissingPath(_))));
        assert!(matches!("pretty:out.txt".parse::<Format>(), Err(FormatError::Unknown(_))));
        assert!("".parse::<Formats>().is_err());
    }

    #[cfg(all(feature = "output-json", feature = "output-junit"))]
    #[test]
    fn creates_output_files() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("nested/report.json");
        let junit = dir.path().join("report.xml");
        let formats = Formats(vec![
            Format::Json(Some(json.clone())),
            Format::JUnit(Some(junit.clone())),
        ]);

        let fanout = formats
            .into_writer(Cli { verbose: 0, color: Coloring::Never })
            .unwrap();

        assert_eq!(fanout.len(), 2);
        assert!(json.exists());
        assert!(junit.exists());
    }
}
