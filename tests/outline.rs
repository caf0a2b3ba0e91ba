use std::{cell::RefCell, rc::Rc};

use futures::FutureExt as _;
use pickler::{writer::Fanout, ExitCode, Suite, World};

#[derive(Debug, Default)]
struct Cart {
    items: Vec<String>,
}

impl World for Cart {
    type Error = std::convert::Infallible;

    async fn new() -> Result<Self, Self::Error> {
        Ok(Self::default())
    }
}

const FEATURE: &str = "\
Feature: Shopping
  Background:
    Given an empty cart

  Scenario Outline: adding <fruit>
    When I add <count> <fruit>
    Then the cart has <count> items

    Examples:
      | fruit  | count |
      | apple  | 1     |
      | banana | 2     |

    @big
    Examples:
      | fruit  | count |
      | cherry | 30    |
";

#[tokio::test]
async fn expands_every_examples_row() {
    let texts = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&texts);

    let report = Suite::<Cart>::new()
        .given("^an empty cart$", |w: &mut Cart, _| {
            async move {
                w.items.clear();
                Ok(())
            }
            .boxed_local()
        })
        .when(r"^I add (\d+) (\w+)$", move |w: &mut Cart, ctx| {
            let seen = Rc::clone(&seen);
            async move {
                let count: usize = ctx.arg(0)?;
                let fruit: String = ctx.arg(1)?;
                seen.borrow_mut().push(format!("{count} {fruit}"));
                w.items.extend(std::iter::repeat(fruit).take(count));
                Ok(())
            }
            .boxed_local()
        })
        .then(r"^the cart has (\d+) items$", |w: &mut Cart, ctx| {
            async move {
                let count: usize = ctx.arg(0)?;
                if w.items.len() != count {
                    return Err(anyhow::anyhow!("cart has {} items", w.items.len()).into());
                }
                Ok(())
            }
            .boxed_local()
        })
        .with_writer(Fanout::new())
        .run_inline([FEATURE])
        .await
        .unwrap();

    assert_eq!(report.exit_code, ExitCode::Success);
    assert_eq!(*texts.borrow(), ["1 apple", "2 banana", "30 cherry"]);

    let pickles = report.store.pickles();
    assert_eq!(pickles.len(), 3);
    for p in &pickles {
        assert!(!p.pickle.name.contains('<'), "{}", p.pickle.name);
        assert!(p.pickle.steps.iter().all(|s| !s.text.contains('<')));
        assert_eq!(p.pickle.steps.len(), 3);
        assert!(p.pickle.steps[0].is_background);
    }
    assert_eq!(pickles[0].pickle.name, "adding apple");
    assert_eq!(pickles[1].pickle.example_row, Some(1));
    assert!(pickles[2].pickle.tags.iter().any(|t| pickler::tag::normalize(t) == "big"));
}

#[tokio::test]
async fn tag_filter_applies_to_examples_tags() {
    let report = Suite::<Cart>::new()
        .step(".*", |_, _| async { Ok(()) }.boxed_local())
        .filter_tags("@big".parse().unwrap())
        .with_writer(Fanout::new())
        .run_inline([FEATURE])
        .await
        .unwrap();

    assert_eq!(report.summary.pickles.total(), 1);
    assert_eq!(report.store.pickles()[0].pickle.name, "adding cherry");
}

#[tokio::test]
async fn unknown_placeholder_fails_the_build() {
    let src = "\
Feature: Broken
  Scenario Outline: nothing <x>
    Given <y>

    Examples:
      | x |
      | 1 |
";
    let err = Suite::<Cart>::new()
        .with_writer(Fanout::new())
        .run_inline([src])
        .await
        .unwrap_err();

    assert!(matches!(err, pickler::Error::Build(_)), "{err}");
}
