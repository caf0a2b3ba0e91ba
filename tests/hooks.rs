use std::{cell::RefCell, rc::Rc};

use futures::FutureExt as _;
use pickler::{
    event::HookType, store::PickleState, writer::Fanout, ExitCode, Status, Suite, World,
};

type Log = Rc<RefCell<Vec<String>>>;

#[derive(Debug, Default)]
struct Door;

impl World for Door {
    type Error = std::convert::Infallible;

    async fn new() -> Result<Self, Self::Error> {
        Ok(Self)
    }
}

const FEATURE: &str = "\
Feature: Doors
  Scenario: open
    Given a door
    When I open it
";

fn suite(log: &Log) -> Suite<Door> {
    let (l1, l2, l3, l4, l5, l6, l7) = (
        Rc::clone(log),
        Rc::clone(log),
        Rc::clone(log),
        Rc::clone(log),
        Rc::clone(log),
        Rc::clone(log),
        Rc::clone(log),
    );
    Suite::new()
        .step(".*", move |_: &mut Door, ctx| {
            l1.borrow_mut().push(format!("step {}", ctx.step.text));
            async { Ok(()) }.boxed_local()
        })
        .before_suite(move || {
            l2.borrow_mut().push("before suite".into());
            async { Ok(()) }.boxed_local()
        })
        .after_suite(move || {
            l3.borrow_mut().push("after suite".into());
            async { Ok(()) }.boxed_local()
        })
        .before_scenario(move |p, _| {
            l4.borrow_mut().push(format!("before {}", p.name));
            async { Ok(()) }.boxed_local()
        })
        .after_scenario(move |p, status, _| {
            l5.borrow_mut().push(format!("after {} {status}", p.name));
            async { Ok(()) }.boxed_local()
        })
        .before_step(move |s, _| {
            l6.borrow_mut().push(format!("before step {}", s.text));
            async { Ok(()) }.boxed_local()
        })
        .after_step(move |s, status, _| {
            l7.borrow_mut().push(format!("after step {} {status}", s.text));
            async { Ok(()) }.boxed_local()
        })
        .with_writer(Fanout::new())
}

#[tokio::test]
async fn hooks_run_around_everything_in_order() {
    let log = Log::default();

    let report = suite(&log).run_inline([FEATURE]).await.unwrap();

    assert_eq!(report.exit_code, ExitCode::Success);
    assert_eq!(
        *log.borrow(),
        [
            "before suite",
            "before open",
            "before step a door",
            "step a door",
            "after step a door passed",
            "before step I open it",
            "step I open it",
            "after step I open it passed",
            "after open passed",
            "after suite",
        ],
    );
}

#[tokio::test]
async fn failed_before_scenario_skips_steps_and_fails_pickle() {
    let log = Log::default();

    let report = suite(&log)
        .before_scenario(|_, _| async { Err(anyhow::anyhow!("locked")) }.boxed_local())
        .run_inline([FEATURE])
        .await
        .unwrap();

    assert_eq!(report.exit_code, ExitCode::Failure);
    let results = report.store.pickles();
    assert_eq!(results[0].status(), Some(Status::Failed));
    assert!(results[0].steps.iter().all(|s| s.status == Status::Skipped));
    assert!(results[0]
        .hook_errors
        .iter()
        .any(|(which, e)| *which == HookType::BeforeScenario && e.to_string().contains("locked")));
    assert!(!log.borrow().iter().any(|l| l.starts_with("step ")));
    // Every registered hook still runs.
    assert!(log.borrow().iter().any(|l| l == "after open failed"));
}

#[tokio::test]
async fn failed_before_suite_aborts_every_pickle() {
    let log = Log::default();

    let report = suite(&log)
        .before_suite(|| async { Err(anyhow::anyhow!("no database")) }.boxed_local())
        .run_inline([FEATURE])
        .await
        .unwrap();

    assert_eq!(report.exit_code, ExitCode::Failure);
    assert_eq!(report.summary.aborted, 1);
    let results = report.store.pickles();
    assert_eq!(results[0].state, PickleState::Aborted);
    assert_eq!(report.store.suite_hook_errors().len(), 1);
    assert!(log.borrow().iter().any(|l| l == "after suite"));
}

#[tokio::test]
async fn failed_after_step_fails_the_step() {
    let log = Log::default();

    let report = suite(&log)
        .after_step(|_, _, _| async { Err(anyhow::anyhow!("cleanup")) }.boxed_local())
        .run_inline([FEATURE])
        .await
        .unwrap();

    let results = report.store.pickles();
    assert_eq!(results[0].steps[0].status, Status::Failed);
    assert_eq!(results[0].steps[1].status, Status::Skipped);
    assert_eq!(report.exit_code, ExitCode::Failure);
}

#[derive(Debug)]
struct Broken;

impl World for Broken {
    type Error = &'static str;

    async fn new() -> Result<Self, Self::Error> {
        Err("cannot connect")
    }
}

#[tokio::test]
async fn world_init_failure_is_a_before_scenario_failure() {
    let report = Suite::<Broken>::new()
        .step(".*", |_, _| async { Ok(()) }.boxed_local())
        .with_writer(Fanout::new())
        .run_inline([FEATURE])
        .await
        .unwrap();

    assert_eq!(report.exit_code, ExitCode::Failure);
    let results = report.store.pickles();
    let (which, err) = &results[0].hook_errors[0];
    assert_eq!(*which, HookType::BeforeScenario);
    assert!(err.to_string().contains("cannot connect"), "{err}");
}
