use std::{cell::RefCell, rc::Rc};

use futures::FutureExt as _;
use pickler::{
    event::StepError,
    step::{MatchPolicy, Pattern},
    writer::Fanout,
    ExitCode, Status, Suite, World,
};

#[derive(Debug, Default)]
struct Belly {
    last: Option<&'static str>,
}

impl World for Belly {
    type Error = std::convert::Infallible;

    async fn new() -> Result<Self, Self::Error> {
        Ok(Self::default())
    }
}

const FEATURE: &str = "\
Feature: Eating
  Scenario: cucumbers
    Given I eat 5 cucumbers
";

fn specific(suite: Suite<Belly>) -> Suite<Belly> {
    suite.given(Pattern::expr("I eat {int} cucumbers"), |w: &mut Belly, _| {
        async move {
            w.last = Some("specific");
            Ok(())
        }
        .boxed_local()
    })
}

fn generic(suite: Suite<Belly>) -> Suite<Belly> {
    suite.given(r"^I eat (\d+) (\w+)$", |w: &mut Belly, _| {
        async move {
            w.last = Some("generic");
            Ok(())
        }
        .boxed_local()
    })
}

#[tokio::test]
async fn overlapping_patterns_are_ambiguous_in_any_order() {
    for suite in [
        generic(specific(Suite::new())),
        specific(generic(Suite::new())),
    ] {
        let report = suite.with_writer(Fanout::new()).run_inline([FEATURE]).await.unwrap();

        assert_eq!(report.exit_code, ExitCode::Failure);
        assert_eq!(report.summary.pickles.ambiguous, 1);
        let results = report.store.pickles();
        let Some(StepError::AmbiguousMatch(e)) = &results[0].steps[0].error else {
            panic!("expected ambiguity, got {:?}", results[0].steps[0].error);
        };
        let mut patterns = e.patterns().collect::<Vec<_>>();
        patterns.sort_unstable();
        assert_eq!(patterns, ["I eat {int} cucumbers", r"^I eat (\d+) (\w+)$"]);
    }
}

#[tokio::test]
async fn first_match_policy_picks_first_registered() {
    for (suite, expected) in [
        (generic(specific(Suite::new())), "I eat {int} cucumbers"),
        (specific(generic(Suite::new())), r"^I eat (\d+) (\w+)$"),
    ] {
        let report = suite
            .match_policy(MatchPolicy::FirstMatch)
            .with_writer(Fanout::new())
            .run_inline([FEATURE])
            .await
            .unwrap();

        assert_eq!(report.exit_code, ExitCode::Success);
        let results = report.store.pickles();
        assert_eq!(results[0].steps[0].pattern.as_deref(), Some(expected));
    }
}

#[tokio::test]
async fn keywords_do_not_take_part_in_matching() {
    let report = specific(Suite::new())
        .with_writer(Fanout::new())
        .run_inline(["Feature: F\n  Scenario: S\n    Then I eat 5 cucumbers\n"])
        .await
        .unwrap();

    assert_eq!(report.exit_code, ExitCode::Success);
}

#[tokio::test]
async fn conversion_errors_fail_the_step() {
    let report = Suite::<Belly>::new()
        .given(r"^I eat (\w+) cucumbers$", |_: &mut Belly, ctx| {
            async move {
                let _: u8 = ctx.arg(0)?;
                Ok(())
            }
            .boxed_local()
        })
        .with_writer(Fanout::new())
        .run_inline(["Feature: F\n  Scenario: S\n    Given I eat many cucumbers\n"])
        .await
        .unwrap();

    let results = report.store.pickles();
    assert_eq!(results[0].steps[0].status, Status::Failed);
    assert_eq!(report.exit_code, ExitCode::Failure);
}

#[tokio::test]
async fn undefined_steps_suggest_a_snippet() {
    let report = Suite::<Belly>::new()
        .with_writer(Fanout::new())
        .run_inline(["Feature: F\n  Scenario: S\n    Given I drink 2 glasses\n"])
        .await
        .unwrap();

    let results = report.store.pickles();
    let Some(StepError::NotFound { snippet }) = &results[0].steps[0].error else {
        panic!("expected undefined step, got {:?}", results[0].steps[0].error);
    };
    assert!(snippet.contains("given"), "{snippet}");
    assert_eq!(results[0].steps[0].status, Status::Undefined);
}

#[tokio::test]
async fn binds_strings_in_either_quote_style() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let recorded = Rc::clone(&seen);

    let report = Suite::<Belly>::new()
        .given(Pattern::expr("the {string} jar holds {int} pickles"), move |_: &mut Belly, ctx| {
            let recorded = Rc::clone(&recorded);
            async move {
                let jar: String = ctx.arg(0)?;
                let count: i64 = ctx.arg(1)?;
                recorded.borrow_mut().push((jar, count));
                Ok(())
            }
            .boxed_local()
        })
        .with_writer(Fanout::new())
        .run_inline([r#"
Feature: Jars
  Scenario: quotes
    Given the "dill" jar holds 3 pickles
    And the 'sweet' jar holds 12 pickles
    And the "" jar holds -1 pickles
"#])
        .await
        .unwrap();

    assert_eq!(report.exit_code, ExitCode::Success);
    assert_eq!(
        *seen.borrow(),
        [("dill".to_owned(), 3), ("sweet".to_owned(), 12), (String::new(), -1)],
    );
}
