use std::io::Read as _;

use futures::FutureExt as _;
use pickler::{writer, ExitCode, Failure, Suite, World};
use tempfile::NamedTempFile;

#[derive(Debug, Default)]
struct Jobs;

impl World for Jobs {
    type Error = std::convert::Infallible;

    async fn new() -> Result<Self, Self::Error> {
        Ok(Self)
    }
}

const BUILDS: &str = "\
Feature: Builds
  Scenario: compiles
    Given the job compiles
  Scenario: links
    Given the job links
  Scenario: deploys
    Given the job deploys
";

const RELEASES: &str = "\
Feature: Releases
  Scenario: tags
    Given the job tags
";

#[tokio::test]
async fn writes_suite_per_feature_and_case_per_pickle() {
    let mut file = NamedTempFile::new().unwrap();

    let report = Suite::<Jobs>::new()
        .given(r"^the job (\w+)$", |_: &mut Jobs, ctx| {
            async move {
                let job: String = ctx.arg(0)?;
                match job.as_str() {
                    "links" => Err(anyhow::anyhow!("undefined symbol").into()),
                    "deploys" => Err(Failure::pending_with("no cluster yet")),
                    _ => Ok(()),
                }
            }
            .boxed_local()
        })
        .with_writer(writer::JUnit::new(file.reopen().unwrap()))
        .run_inline([BUILDS, RELEASES])
        .await
        .unwrap();
    assert_eq!(report.exit_code, ExitCode::Failure);

    let mut xml = String::new();
    _ = file.read_to_string(&mut xml).unwrap();

    assert_eq!(xml.matches("<testsuite ").count(), 2, "{xml}");
    assert_eq!(xml.matches("<testcase ").count(), 4, "{xml}");
    assert!(xml.contains(r#"name="Feature: Builds""#), "{xml}");
    assert!(xml.contains(r#"name="Feature: Releases""#), "{xml}");
    assert_eq!(xml.matches("<failure").count(), 1, "{xml}");
    assert!(xml.contains("undefined symbol"), "{xml}");
    assert_eq!(xml.matches("<skipped").count(), 1, "{xml}");
    assert!(!xml.contains("<error"), "{xml}");
}

#[tokio::test]
async fn failed_scenario_hooks_are_errors() {
    let mut file = NamedTempFile::new().unwrap();

    let report = Suite::<Jobs>::new()
        .step(".*", |_, _| async { Ok(()) }.boxed_local())
        .after_scenario(|_, _, _| async { Err(anyhow::anyhow!("disk full")) }.boxed_local())
        .with_writer(writer::JUnit::new(file.reopen().unwrap()))
        .run_inline([RELEASES])
        .await
        .unwrap();
    assert_eq!(report.exit_code, ExitCode::Failure);

    let mut xml = String::new();
    _ = file.read_to_string(&mut xml).unwrap();

    assert!(xml.contains("<error"), "{xml}");
    assert!(xml.contains("Hook Failed"), "{xml}");
    assert!(xml.contains("disk full"), "{xml}");
}
