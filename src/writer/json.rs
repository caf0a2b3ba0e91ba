// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [Cucumber JSON format][1] [`Writer`] implementation.
//!
//! [1]: https://github.com/cucumber/cucumber-json-schema

use std::{io, time::Duration};

use async_trait::async_trait;
use base64::Engine as _;
use inflector::Inflector as _;
use serde::Serialize;

use crate::{
    event::{self, HookError, HookType},
    store::{PickleResult, PickleState, StepResult},
    step::Attachment,
    writer::out,
    Event, PickleStep, ResultStore, Status, Writer,
};

/// [Cucumber JSON format][1] [`Writer`] implementation outputting JSON to an
/// [`io::Write`] implementor.
///
/// The report is rendered out of the [`ResultStore`] once the run finishes,
/// so it always reflects the final attempt of every retried scenario.
/// Aborted scenarios are reported with all their steps skipped.
///
/// [1]: https://github.com/cucumber/cucumber-json-schema
#[derive(Clone, Debug)]
pub struct Json<Out: io::Write> {
    output: Out,
}

impl<Out: io::Write> Json<Out> {
    /// Creates a new [`Json`] [`Writer`] outputting JSON into the given
    /// `output`.
    #[must_use]
    pub const fn new(output: Out) -> Self {
        Self { output }
    }

    /// Returns the output of this [`Json`] [`Writer`].
    #[must_use]
    pub const fn output(&self) -> &Out {
        &self.output
    }
}

#[async_trait(?Send)]
impl<Out: io::Write> Writer for Json<Out> {
    async fn handle_event(&mut self, event: Event<event::Run>, store: &ResultStore) {
        if !matches!(event.value, event::Run::Finished(_)) {
            return;
        }
        let features = report(store);
        let res = serde_json::to_writer(&mut self.output, &features)
            .map_err(io::Error::from)
            .and_then(|()| self.output.flush());
        out::log_failure(res, "json");
    }
}

/// Builds the [Cucumber JSON][1] report of every [`Pickle`] stored so far,
/// grouped by [`gherkin::Feature`] in input order.
///
/// [`Pickle`]: crate::Pickle
/// [1]: https://github.com/cucumber/cucumber-json-schema
#[must_use]
pub fn report(store: &ResultStore) -> Vec<Feature> {
    let mut features: Vec<(event::Source<gherkin::Feature>, Feature)> = Vec::new();
    for p in store.pickles() {
        let element = Element::new(&p);
        match features.last_mut() {
            Some((f, json)) if *f == p.pickle.feature => json.elements.push(element),
            _ => {
                let mut json = Feature::new(&p.pickle.feature, p.pickle.id.as_str());
                json.elements.push(element);
                features.push((p.pickle.feature.clone(), json));
            }
        }
    }
    features.into_iter().map(|(_, f)| f).collect()
}

/// [`base64`] encoded data.
#[derive(Clone, Debug, Serialize)]
#[serde(transparent)]
pub struct Base64(String);

impl Base64 {
    /// Used [`base64::engine`].
    const ENGINE: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

    /// Encodes `bytes` as [`base64`].
    #[must_use]
    pub fn encode(bytes: impl AsRef<[u8]>) -> Self {
        Self(Self::ENGINE.encode(bytes))
    }
}

/// Data embedded into a [`Step`] out of an [`Attachment`].
#[derive(Clone, Debug, Serialize)]
pub struct Embedding {
    /// [`base64`] encoded data.
    pub data: Base64,

    /// Media type of the [`Embedding::data`].
    pub mime_type: String,

    /// Name of the [`Embedding`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Embedding {
    fn new(attachment: &Attachment) -> Self {
        let mime_type = attachment
            .media_type
            .parse::<mime::Mime>()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM);
        Self {
            data: Base64::encode(&attachment.data),
            mime_type: mime_type.to_string(),
            name: attachment.name.clone(),
        }
    }
}

/// Tag of a [`Feature`] or an [`Element`].
#[derive(Clone, Debug, Serialize)]
pub struct Tag {
    /// Name of the [`Tag`], with the leading `@`.
    pub name: String,

    /// Line number of the tagged item.
    pub line: usize,
}

impl Tag {
    fn all(tags: &[String], line: usize) -> Vec<Self> {
        tags.iter()
            .map(|t| Self { name: format!("@{}", crate::tag::normalize(t)), line })
            .collect()
    }
}

/// Possible statuses of a run [`Step`].
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonStatus {
    /// Passed.
    Passed,

    /// Failed.
    Failed,

    /// Skipped.
    Skipped,

    /// Ambiguous.
    Ambiguous,

    /// Undefined.
    Undefined,

    /// Pending.
    Pending,
}

impl From<Status> for JsonStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Passed => Self::Passed,
            Status::Failed => Self::Failed,
            Status::Skipped => Self::Skipped,
            Status::Ambiguous => Self::Ambiguous,
            Status::Undefined => Self::Undefined,
            Status::Pending => Self::Pending,
        }
    }
}

/// Run result of a [`Step`] or a hook.
#[derive(Clone, Debug, Serialize)]
pub struct RunResult {
    /// [`JsonStatus`] of the run.
    pub status: JsonStatus,

    /// Execution time in nanoseconds.
    pub duration: u128,

    /// Error message, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Location of the step definition a [`Step`] has matched.
#[derive(Clone, Debug, Serialize)]
pub struct Match {
    /// Source location, or the pattern if unknown.
    pub location: String,
}

/// Executed step of a [`Pickle`].
///
/// [`Pickle`]: crate::Pickle
#[derive(Clone, Debug, Serialize)]
pub struct Step {
    /// Keyword with trailing whitespace.
    pub keyword: String,

    /// Line number in the `.feature` file.
    pub line: usize,

    /// Step text.
    pub name: String,

    /// Never [`true`] and is here only to fully describe the schema.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,

    /// Matched step definition.
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub matched: Option<Match>,

    /// Run result.
    pub result: RunResult,

    /// Attachments of the step.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeddings: Vec<Embedding>,
}

impl Step {
    fn new(step: &PickleStep, result: Option<&StepResult>) -> Self {
        let (status, duration, error) = result.map_or((Status::Skipped, Duration::ZERO, None), |r| {
            (r.status, r.duration, r.error.as_ref().map(ToString::to_string))
        });
        Self {
            keyword: format!("{} ", step.keyword.trim()),
            line: step.position.line,
            name: step.text.clone(),
            hidden: false,
            matched: result.and_then(|r| {
                let location = r
                    .location
                    .map(|l| l.to_string())
                    .or_else(|| r.pattern.clone())?;
                Some(Match { location })
            }),
            result: RunResult {
                status: status.into(),
                duration: duration.as_nanos(),
                error_message: error,
            },
            embeddings: result
                .map(|r| r.attachments.iter().map(Embedding::new).collect())
                .unwrap_or_default(),
        }
    }
}

/// Failed scenario hook.
#[derive(Clone, Debug, Serialize)]
pub struct HookResult {
    /// Run result of the hook.
    pub result: RunResult,
}

impl HookResult {
    fn failed(err: &HookError) -> Self {
        Self {
            result: RunResult {
                status: JsonStatus::Failed,
                duration: 0,
                error_message: Some(err.to_string()),
            },
        }
    }
}

/// Single [`Pickle`] of a [`Feature`].
///
/// [`Pickle`]: crate::Pickle
#[derive(Clone, Debug, Serialize)]
pub struct Element {
    /// Failed after-scenario hooks.
    pub after: Vec<HookResult>,

    /// Failed before-scenario hooks.
    pub before: Vec<HookResult>,

    /// Keyword with trailing whitespace.
    pub keyword: String,

    /// Always `scenario`, as backgrounds are inlined into their scenarios.
    #[serde(rename = "type")]
    pub ty: &'static str,

    /// Identifier: the kebab-cased feature, rule and scenario names.
    pub id: String,

    /// Line number of the scenario, or of the examples row.
    pub line: usize,

    /// Scenario name with placeholders substituted.
    pub name: String,

    /// Tags of the [`Pickle`].
    ///
    /// [`Pickle`]: crate::Pickle
    pub tags: Vec<Tag>,

    /// Steps of the [`Pickle`].
    ///
    /// [`Pickle`]: crate::Pickle
    pub steps: Vec<Step>,
}

impl Element {
    fn new(p: &PickleResult) -> Self {
        let pickle = &p.pickle;
        let hooks = |which: HookType| {
            p.hook_errors
                .iter()
                .filter(|(w, _)| *w == which)
                .map(|(_, e)| HookResult::failed(e))
                .collect()
        };
        let executed = !matches!(p.state, PickleState::Aborted);
        Self {
            after: hooks(HookType::AfterScenario),
            before: hooks(HookType::BeforeScenario),
            keyword: format!("{} ", pickle.scenario.keyword),
            ty: "scenario",
            id: format!(
                "{}{};{}",
                pickle.feature.name.to_kebab_case(),
                pickle
                    .rule
                    .as_ref()
                    .map(|r| format!(";{}", r.name.to_kebab_case()))
                    .unwrap_or_default(),
                pickle.name.to_kebab_case(),
            ),
            line: pickle.position.line,
            name: pickle.name.clone(),
            tags: Tag::all(&pickle.tags, pickle.scenario.position.line),
            steps: pickle
                .steps
                .iter()
                .map(|s| {
                    let result = executed.then(|| p.steps.iter().find(|r| r.step.id == s.id)).flatten();
                    Step::new(s, result)
                })
                .collect(),
        }
    }
}

/// [`gherkin::Feature`] with its [`Element`]s.
#[derive(Clone, Debug, Serialize)]
pub struct Feature {
    /// Path to the `.feature` file, or the name of an inline feature.
    pub uri: String,

    /// Kebab-cased feature name.
    pub id: String,

    /// Keyword with trailing whitespace.
    pub keyword: String,

    /// Feature name.
    pub name: String,

    /// Feature description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Line number of the feature.
    pub line: usize,

    /// Tags of the feature.
    pub tags: Vec<Tag>,

    /// [`Element`]s of the feature.
    pub elements: Vec<Element>,
}

impl Feature {
    fn new(feature: &gherkin::Feature, pickle_id: &str) -> Self {
        // Ids are `<uri>:<line>`, possibly suffixed with `#<n>`.
        let uri = pickle_id
            .rsplit_once(':')
            .map_or(pickle_id, |(uri, _)| uri)
            .to_owned();
        Self {
            uri,
            id: feature.name.to_kebab_case(),
            keyword: format!("{} ", feature.keyword),
            name: feature.name.clone(),
            description: feature.description.clone(),
            line: feature.position.line,
            tags: Tag::all(&feature.tags, feature.position.line),
            elements: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::executor::block_on;

    use super::{report, Json};
    use crate::{
        event::{self, Source},
        pickle,
        store::StepResult,
        step::Attachment,
        writer::out::WritableString,
        Event, ResultStore, Status, Writer as _,
    };

    fn store() -> (ResultStore, Vec<Source<crate::Pickle>>) {
        let feature = gherkin::Feature::parse(
            "@web\n\
             Feature: Online Shop\n\
             \x20 @smoke\n\
             \x20 Scenario: Add Item\n\
             \x20   Given a cart\n\
             \x20   When I add 2 apples\n\
             \x20 Scenario: Pay\n\
             \x20   Given a cart\n",
            gherkin::GherkinEnv::default(),
        )
        .unwrap();
        let pickles = pickle::build(&[feature])
            .unwrap()
            .into_iter()
            .map(Source::new)
            .collect::<Vec<_>>();
        let store = ResultStore::new();
        store.register(&pickles);
        (store, pickles)
    }

    #[test]
    fn reports_steps_with_embeddings() {
        let (store, pickles) = store();
        let p = &pickles[0];
        store.start(&p.id, 1);
        store.put(StepResult {
            status: Status::Passed,
            duration: Duration::from_nanos(1500),
            attachments: vec![Attachment::text("hi").named("note")],
            pattern: Some("a cart".into()),
            ..StepResult::skipped(p.steps[0].clone(), 1)
        });
        store.put(StepResult::skipped(p.steps[1].clone(), 1));
        store.finish(&p.id, Status::Passed);
        store.abort(&pickles[1].id);

        let json = serde_json::to_value(report(&store)).unwrap();

        let feature = &json[0];
        assert_eq!(feature["name"], "Online Shop");
        assert_eq!(feature["id"], "online-shop");
        assert_eq!(feature["tags"][0]["name"], "@web");
        let element = &feature["elements"][0];
        assert_eq!(element["id"], "online-shop;add-item");
        assert_eq!(element["type"], "scenario");
        assert_eq!(element["tags"][1]["name"], "@smoke");
        let step = &element["steps"][0];
        assert_eq!(step["keyword"], "Given ");
        assert_eq!(step["result"]["status"], "passed");
        assert_eq!(step["result"]["duration"], 1500);
        assert_eq!(step["match"]["location"], "a cart");
        assert_eq!(step["embeddings"][0]["data"], "aGk=");
        assert_eq!(step["embeddings"][0]["mime_type"], "text/plain");
        assert_eq!(step["embeddings"][0]["name"], "note");
        assert_eq!(element["steps"][1]["result"]["status"], "skipped");
        assert_eq!(feature["elements"][1]["steps"][0]["result"]["status"], "skipped");
    }

    #[test]
    fn writes_on_run_finished_only() {
        let (store, _) = store();
        let mut w = Json::new(WritableString::default());

        block_on(w.handle_event(Event::new(event::Run::Started { pickles: 2 }), &store));
        assert!(w.output().0.is_empty());

        block_on(w.handle_event(Event::new(event::Run::Finished(store.summary())), &store));
        let parsed: serde_json::Value = serde_json::from_str(&w.output().0).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(1));
    }
}
