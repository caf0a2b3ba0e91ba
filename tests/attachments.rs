use futures::FutureExt as _;
use pickler::{writer::Fanout, Attachment, ExitCode, Suite, World};

#[derive(Debug, Default)]
struct Browser;

impl World for Browser {
    type Error = std::convert::Infallible;

    async fn new() -> Result<Self, Self::Error> {
        Ok(Self)
    }
}

const FEATURE: &str = "\
Feature: Screenshots
  Scenario: login page
    Given I open the login page
    When I log in
    Then I see the dashboard
";

fn suite() -> Suite<Browser> {
    Suite::new()
        .given("^I open the login page$", |_: &mut Browser, ctx| {
            ctx.attach(Attachment::text("opened"));
            ctx.attach(Attachment::new(vec![0x89, b'P', b'N', b'G'], "image/png").named("page.png"));
            async { Ok(()) }.boxed_local()
        })
        .when("^I log in$", |_: &mut Browser, _| async { Ok(()) }.boxed_local())
        .then("^I see the dashboard$", |_: &mut Browser, ctx| {
            async move {
                ctx.attach_all([Attachment::text("first"), Attachment::text("second")]);
                Err(anyhow::anyhow!("no dashboard").into())
            }
            .boxed_local()
        })
        .with_writer(Fanout::new())
}

#[tokio::test]
async fn attachments_are_kept_per_step_in_order() {
    let report = suite().run_inline([FEATURE]).await.unwrap();
    assert_eq!(report.exit_code, ExitCode::Failure);

    let results = report.store.pickles();
    let pickle = &results[0].pickle;
    let [open, login, dashboard] = &pickle.steps[..] else {
        panic!("expected 3 steps, got {}", pickle.steps.len());
    };

    let opened = report.store.attachments(&open.id);
    assert_eq!(opened.len(), 2);
    assert_eq!(opened[0].data, b"opened");
    assert_eq!(opened[0].media_type, "text/plain");
    assert_eq!(opened[1].media_type, "image/png");
    assert_eq!(opened[1].name.as_deref(), Some("page.png"));

    assert!(report.store.attachments(&login.id).is_empty());

    let texts = report
        .store
        .attachments(&dashboard.id)
        .into_iter()
        .map(|a| String::from_utf8(a.data).unwrap())
        .collect::<Vec<_>>();
    assert_eq!(texts, ["first", "second"]);
}

#[tokio::test]
async fn attachments_are_readable_from_step_results() {
    let report = suite().run_inline([FEATURE]).await.unwrap();

    let results = report.store.pickles();
    let result = &results[0];
    let counts = result.steps.iter().map(|s| s.attachments.len()).collect::<Vec<_>>();
    assert_eq!(counts, [2, 0, 2]);
}
