// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Top-level [`Suite`] tying registration, execution and reporting together.

use std::{
    fmt, io, mem,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use futures::{future::LocalBoxFuture, StreamExt as _};
use gherkin::tagexpr::TagOperation;
use regex::Regex;

use crate::{
    cli,
    event::{self, Source},
    hook,
    interceptor::Interceptor,
    parser::{self, Parser as _},
    pickle,
    runner::{self, Cancellation},
    step::{self, Context, Location, MatchPolicy, Pattern},
    store::Summary,
    tag::Ext as _,
    writer::{self, Format, Formats},
    Error, ExitCode, Pickle, PickleStep, ResultStore, Status, World, Writer, WriterExt as _,
};

/// Predicate selecting the [`Pickle`]s to run.
type Filter = Box<dyn Fn(&Pickle) -> bool>;

/// Outcome of a finished [`Suite`] run.
#[derive(Debug)]
pub struct Report {
    /// Aggregated counts of the run.
    pub summary: Summary,

    /// Process exit status of the run.
    pub exit_code: ExitCode,

    /// Every recorded result, for inspection after the run.
    pub store: Arc<ResultStore>,
}

/// Top-level entry point: registers steps and hooks, then runs
/// [`gherkin::Feature`]s through a [`runner::Basic`] and a [`Writer`].
///
/// Without an explicit [`Suite::with_writer()`], the configured [`Formats`]
/// are written (pretty output to STDOUT by default), followed by a summary.
///
/// ```rust
/// # use futures::FutureExt as _;
/// # use pickler::{Suite, World};
/// #
/// #[derive(Default)]
/// struct Kitchen {
///     cookies: u32,
/// }
///
/// impl World for Kitchen {
///     type Error = std::convert::Infallible;
///
///     async fn new() -> Result<Self, Self::Error> {
///         Ok(Self::default())
///     }
/// }
///
/// # futures::executor::block_on(async {
/// let report = Suite::<Kitchen>::new()
///     .given(r"^(\d+) cookies$", |w, ctx| {
///         async move {
///             w.cookies = ctx.arg(0)?;
///             Ok(())
///         }
///         .boxed_local()
///     })
///     .run_inline(["Feature: Kitchen\n  Scenario: bake\n    Given 3 cookies\n"])
///     .await
///     .unwrap();
///
/// assert_eq!(report.exit_code, pickler::ExitCode::Success);
/// # });
/// ```
pub struct Suite<W> {
    runner: runner::Basic<W>,
    writer: Option<Box<dyn Writer>>,
    formats: Formats,
    output: writer::basic::Cli,
    tags: Option<TagOperation>,
    name: Option<Regex>,
    filter: Option<Filter>,
    deny_duplicates: bool,
    paths: Vec<PathBuf>,
}

impl<W> Default for Suite<W> {
    fn default() -> Self {
        Self {
            runner: runner::Basic::default(),
            writer: None,
            formats: Formats::default(),
            output: writer::basic::Cli::default(),
            tags: None,
            name: None,
            filter: None,
            deny_duplicates: false,
            paths: Vec::new(),
        }
    }
}

impl<W> fmt::Debug for Suite<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suite")
            .field("runner", &self.runner)
            .field("writer", &self.writer.is_some())
            .field("formats", &self.formats)
            .field("tags", &self.tags)
            .field("name", &self.name)
            .field("deny_duplicates", &self.deny_duplicates)
            .finish_non_exhaustive()
    }
}

impl<W> Suite<W> {
    /// Creates a new [`Suite`] with no steps, hooks or filters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a step definition matching the given `pattern`.
    ///
    /// A plain string is a regular expression; use
    /// [`Pattern::expr()`] for a [Cucumber Expression][1].
    ///
    /// [1]: https://github.com/cucumber/cucumber-expressions
    #[must_use]
    #[track_caller]
    pub fn step<P, F>(mut self, pattern: P, handler: F) -> Self
    where
        P: Into<Pattern>,
        F: for<'a> Fn(&'a mut W, Context) -> LocalBoxFuture<'a, step::Result>
            + 'static,
    {
        let location = Location::caller();
        self.runner.steps_mut().push(pattern.into(), Some(location), Box::new(handler));
        self
    }

    /// Registers a `Given` step definition. Alias of [`Suite::step()`].
    #[must_use]
    #[track_caller]
    pub fn given<P, F>(self, pattern: P, handler: F) -> Self
    where
        P: Into<Pattern>,
        F: for<'a> Fn(&'a mut W, Context) -> LocalBoxFuture<'a, step::Result>
            + 'static,
    {
        self.step(pattern, handler)
    }

    /// Registers a `When` step definition. Alias of [`Suite::step()`].
    #[must_use]
    #[track_caller]
    pub fn when<P, F>(self, pattern: P, handler: F) -> Self
    where
        P: Into<Pattern>,
        F: for<'a> Fn(&'a mut W, Context) -> LocalBoxFuture<'a, step::Result>
            + 'static,
    {
        self.step(pattern, handler)
    }

    /// Registers a `Then` step definition. Alias of [`Suite::step()`].
    #[must_use]
    #[track_caller]
    pub fn then<P, F>(self, pattern: P, handler: F) -> Self
    where
        P: Into<Pattern>,
        F: for<'a> Fn(&'a mut W, Context) -> LocalBoxFuture<'a, step::Result>
            + 'static,
    {
        self.step(pattern, handler)
    }

    /// Replaces every registered step definition with the given ones.
    #[must_use]
    pub fn steps(mut self, steps: step::Collection<W>) -> Self {
        self.runner = self.runner.steps(steps);
        self
    }

    /// Sets the [`MatchPolicy`] of resolving steps matching several
    /// definitions.
    #[must_use]
    pub fn match_policy(mut self, policy: MatchPolicy) -> Self {
        let steps = mem::take(self.runner.steps_mut());
        *self.runner.steps_mut() = steps.match_policy(policy);
        self
    }

    /// Makes the run fail with [`Error::DuplicatePattern`] if the same
    /// pattern is registered more than once.
    #[must_use]
    pub fn deny_duplicates(mut self) -> Self {
        self.deny_duplicates = true;
        self
    }

    /// Registers a hook running once before any [`Pickle`].
    #[must_use]
    pub fn before_suite<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> LocalBoxFuture<'static, hook::Result> + 'static,
    {
        self.runner.hooks_mut().before_suite(hook);
        self
    }

    /// Registers a hook running once after every [`Pickle`].
    #[must_use]
    pub fn after_suite<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> LocalBoxFuture<'static, hook::Result> + 'static,
    {
        self.runner.hooks_mut().after_suite(hook);
        self
    }

    /// Registers a hook running before the steps of every [`Pickle`].
    #[must_use]
    pub fn before_scenario<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a Pickle, &'a mut W) -> LocalBoxFuture<'a, hook::Result>
            + 'static,
    {
        self.runner.hooks_mut().before_scenario(hook);
        self
    }

    /// Registers a hook running after the steps of every [`Pickle`].
    #[must_use]
    pub fn after_scenario<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a Pickle, Status, &'a mut W) -> LocalBoxFuture<'a, hook::Result>
            + 'static,
    {
        self.runner.hooks_mut().after_scenario(hook);
        self
    }

    /// Registers a hook running before every step.
    #[must_use]
    pub fn before_step<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a PickleStep, &'a mut W) -> LocalBoxFuture<'a, hook::Result>
            + 'static,
    {
        self.runner.hooks_mut().before_step(hook);
        self
    }

    /// Registers a hook running after every step.
    #[must_use]
    pub fn after_step<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a PickleStep, Status, &'a mut W) -> LocalBoxFuture<'a, hook::Result>
            + 'static,
    {
        self.runner.hooks_mut().after_step(hook);
        self
    }

    /// Appends an [`Interceptor`] rewriting step outcomes.
    #[must_use]
    pub fn intercept(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.runner = self.runner.intercept(interceptor);
        self
    }

    /// Runs only the [`Pickle`]s whose tags satisfy the given expression.
    #[must_use]
    pub fn filter_tags(mut self, tags: TagOperation) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Runs only the [`Pickle`]s whose name matches the given [`Regex`].
    #[must_use]
    pub fn filter_name(mut self, name: Regex) -> Self {
        self.name = Some(name);
        self
    }

    /// Runs only the [`Pickle`]s satisfying the given predicate, on top of
    /// the tag and name filters.
    #[must_use]
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Pickle) -> bool + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Sets the maximum number of concurrently running [`Pickle`]s.
    #[must_use]
    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.runner = self.runner.max_concurrency(max);
        self
    }

    /// Sets the default number of retries of a failed [`Pickle`].
    #[must_use]
    pub fn retries(mut self, retries: usize) -> Self {
        self.runner = self.runner.retries(retries);
        self
    }

    /// Sets the default delay before each retry attempt.
    #[must_use]
    pub fn retry_after(mut self, after: impl Into<Option<Duration>>) -> Self {
        self.runner = self.runner.retry_after(after.into());
        self
    }

    /// Applies the default retries only to the [`Pickle`]s whose tags
    /// satisfy the given expression.
    #[must_use]
    pub fn retry_filter(mut self, filter: impl Into<Option<TagOperation>>) -> Self {
        self.runner = self.runner.retry_filter(filter);
        self
    }

    /// Stops dispatching [`Pickle`]s after the first failure.
    #[must_use]
    pub fn fail_fast(mut self) -> Self {
        self.runner = self.runner.fail_fast();
        self
    }

    /// Treats undefined and pending steps as failures.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.runner = self.runner.strict(strict);
        self
    }

    /// Replaces the function used to wait before retry attempts.
    #[must_use]
    pub fn sleep<F>(mut self, sleep: F) -> Self
    where
        F: Fn(Duration) -> LocalBoxFuture<'static, ()> + 'static,
    {
        self.runner = self.runner.sleep(sleep);
        self
    }

    /// Uses the given [`Cancellation`] signal for the run.
    #[must_use]
    pub fn cancellation(mut self, signal: Cancellation) -> Self {
        self.runner = self.runner.cancellation(signal);
        self
    }

    /// Returns the [`Cancellation`] signal of the run, to cancel it from
    /// elsewhere.
    #[must_use]
    pub fn cancellation_signal(&self) -> Cancellation {
        self.runner.cancellation_signal().clone()
    }

    /// Sets the output [`Formats`] used when no explicit [`Writer`] is set.
    #[must_use]
    pub fn formats(mut self, formats: Formats) -> Self {
        self.formats = formats;
        self
    }

    /// Sets the [`Writer`] handling the events of the run, instead of the
    /// configured [`Formats`].
    #[must_use]
    pub fn with_writer(mut self, writer: impl Writer + 'static) -> Self {
        self.writer = Some(writer.boxed());
        self
    }

    /// Applies the given [`cli::Opts`], overriding the values configured so
    /// far.
    #[must_use]
    pub fn with_cli<Custom: cli::Args>(mut self, opts: cli::Opts<Custom>) -> Self {
        self.runner = self.runner.with_cli(&opts.runner);
        if let Some(tags) = opts.tags_filter {
            self.tags = Some(tags);
        }
        if let Some(name) = opts.re_filter {
            self.name = Some(name);
        }
        if let Some(formats) = opts.format {
            self.formats = formats;
        }
        if !opts.paths.is_empty() {
            self.paths = opts.paths;
        }
        self.output = opts.writer;
        self
    }
}

impl<W: World> Suite<W> {
    /// Runs the given [`gherkin::Feature`]s.
    ///
    /// # Errors
    ///
    /// If a step pattern is invalid or duplicated while
    /// [denied](Suite::deny_duplicates), if the features cannot be turned
    /// into [`Pickle`]s, or if an output format cannot be set up. Failures of
    /// steps and hooks are reported through the [`Report`] instead.
    pub async fn run(self, features: Vec<gherkin::Feature>) -> Result<Report, Error> {
        let Self { runner, writer, formats, output, tags, name, filter, deny_duplicates, .. } =
            self;

        runner.step_definitions().validate()?;
        if deny_duplicates {
            if let Some(dup) = runner.step_definitions().duplicates().first() {
                return Err(Error::DuplicatePattern((*dup).to_owned()));
            }
        }

        let total = features.len();
        let pickles = pickle::build(&features)?
            .into_iter()
            .filter(|p| tags.as_ref().map_or(true, |op| op.eval(&p.tags)))
            .filter(|p| name.as_ref().map_or(true, |re| re.is_match(&p.name)))
            .filter(|p| filter.as_ref().map_or(true, |f| f(p)))
            .map(Source::new)
            .collect::<Vec<_>>();
        tracing::debug!(features = total, pickles = pickles.len(), "built pickles");

        let mut writer = match writer {
            Some(w) => w,
            None => default_writer(formats, output)?,
        };

        let strict = runner.is_strict();
        let store = Arc::new(ResultStore::new());
        let mut events = runner.run(pickles, Arc::clone(&store));
        let mut summary = None;
        while let Some(ev) = events.next().await {
            if let event::Run::Finished(s) = &ev.value {
                summary = Some(*s);
            }
            writer.handle_event(ev, &store).await;
        }

        let summary = summary.unwrap_or_else(|| store.summary());
        Ok(Report { exit_code: summary.exit_code(strict), summary, store })
    }

    /// Parses every `.feature` file found at the given `paths` and runs them.
    ///
    /// # Errors
    ///
    /// If a path cannot be read or parsed, or as [`Suite::run()`] does.
    pub async fn run_paths<P: AsRef<Path>>(
        self,
        paths: impl IntoIterator<Item = P>,
    ) -> Result<Report, Error> {
        let mut features = Vec::new();
        for path in paths {
            features.extend(parser::Basic::new().parse(path)?);
        }
        self.run(features).await
    }

    /// Parses the given in-memory feature sources and runs them.
    ///
    /// # Errors
    ///
    /// If a source cannot be parsed, or as [`Suite::run()`] does.
    pub async fn run_inline<I, S>(self, sources: I) -> Result<Report, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let features = parser::Inline.parse(sources)?;
        self.run(features).await
    }

    /// Parses the process CLI arguments, runs the feature paths given there
    /// (or the `default_paths` if none are), and returns the [`ExitCode`] to
    /// exit the process with.
    ///
    /// Setup errors are printed to STDERR and result in
    /// [`ExitCode::SetupError`].
    pub async fn run_cli<P: Into<PathBuf>>(
        self,
        default_paths: impl IntoIterator<Item = P>,
    ) -> ExitCode {
        let mut suite = self.with_cli(cli::Opts::<cli::Empty>::parsed());
        let paths = if suite.paths.is_empty() {
            default_paths.into_iter().map(Into::into).collect()
        } else {
            mem::take(&mut suite.paths)
        };

        match suite.run_paths(paths).await {
            Ok(report) => report.exit_code,
            Err(e) => {
                tracing::error!(error = %e, "run aborted before execution");
                eprintln!("{e}");
                ExitCode::from(&e)
            }
        }
    }
}

/// Builds the [`Writer`] of the given [`Formats`], followed by a summary if
/// any of them is a console one.
fn default_writer(
    formats: Formats,
    output: writer::basic::Cli,
) -> Result<Box<dyn Writer>, writer::FormatError> {
    let console = formats.0.iter().any(|f| matches!(f, Format::Pretty | Format::Progress));
    let fanout = formats.into_writer(output)?;
    Ok(if console {
        writer::Summarized::with_output(fanout, io::stdout(), output.color).boxed()
    } else {
        fanout.boxed()
    })
}
