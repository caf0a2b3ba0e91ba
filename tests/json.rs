use std::io::Read as _;

use futures::FutureExt as _;
use pickler::{writer, Attachment, ExitCode, Suite, World, WriterExt as _};
use serde_json::Value;
use tempfile::NamedTempFile;

#[derive(Debug, Default)]
struct Pages;

impl World for Pages {
    type Error = std::convert::Infallible;

    async fn new() -> Result<Self, Self::Error> {
        Ok(Self)
    }
}

const FEATURE: &str = "\
@web
Feature: Pages
  Scenario: home
    Given I open the home page
    Then I see a greeting

  @slow
  Scenario: about
    Given I open the about page
    Then I see a greeting
";

async fn run(writer: impl pickler::Writer + 'static) -> ExitCode {
    Suite::<Pages>::new()
        .given(r"^I open the (\w+) page$", |_: &mut Pages, ctx| {
            async move {
                let page: String = ctx.arg(0)?;
                ctx.attach(Attachment::text("hello").named("log.txt"));
                if page == "about" {
                    return Err(anyhow::anyhow!("404 for {page}").into());
                }
                Ok(())
            }
            .boxed_local()
        })
        .then("^I see a greeting$", |_: &mut Pages, _| async { Ok(()) }.boxed_local())
        .with_writer(writer)
        .run_inline([FEATURE])
        .await
        .unwrap()
        .exit_code
}

fn read(file: &mut NamedTempFile) -> Value {
    let mut buffer = String::new();
    _ = file.read_to_string(&mut buffer).unwrap();
    serde_json::from_str(&buffer).unwrap_or_else(|e| panic!("invalid JSON ({e}):\n{buffer}"))
}

#[tokio::test]
async fn writes_cucumber_json() {
    let mut file = NamedTempFile::new().unwrap();

    let code = run(writer::Json::new(file.reopen().unwrap())).await;
    assert_eq!(code, ExitCode::Failure);

    let json = read(&mut file);
    let features = json.as_array().unwrap();
    assert_eq!(features.len(), 1);

    let feature = &features[0];
    assert_eq!(feature["name"], "Pages");
    assert_eq!(feature["keyword"], "Feature ");
    assert_eq!(feature["tags"][0]["name"], "@web");

    let elements = feature["elements"].as_array().unwrap();
    assert_eq!(elements.len(), 2);
    assert_eq!(elements[0]["name"], "home");
    assert_eq!(elements[0]["type"], "scenario");
    assert_eq!(elements[0]["id"], "pages;home");
    assert_eq!(elements[1]["tags"].as_array().unwrap().len(), 2);

    let home = elements[0]["steps"].as_array().unwrap();
    assert_eq!(home[0]["keyword"], "Given ");
    assert_eq!(home[0]["name"], "I open the home page");
    assert_eq!(home[0]["result"]["status"], "passed");
    assert_eq!(home[0]["match"]["location"].as_str().map(|l| l.contains("json.rs")), Some(true));
    assert_eq!(home[0]["embeddings"][0]["data"], "aGVsbG8=");
    assert_eq!(home[0]["embeddings"][0]["mime_type"], "text/plain");
    assert_eq!(home[0]["embeddings"][0]["name"], "log.txt");
    assert_eq!(home[1]["result"]["status"], "passed");
    assert!(home[1].get("embeddings").is_none());

    let about = elements[1]["steps"].as_array().unwrap();
    assert_eq!(about[0]["result"]["status"], "failed");
    assert!(about[0]["result"]["error_message"].as_str().unwrap().contains("404 for about"));
    assert_eq!(about[1]["result"]["status"], "skipped");
}

#[tokio::test]
async fn tees_with_other_writers() {
    let mut file = NamedTempFile::new().unwrap();

    let code = run(writer::Json::new(file.reopen().unwrap()).tee(writer::Fanout::new())).await;
    assert_eq!(code, ExitCode::Failure);

    let json = read(&mut file);
    assert_eq!(json[0]["elements"].as_array().map(Vec::len), Some(2));
}
