// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Post-processing of step results before they are recorded.

use std::fmt;

use crate::{event::StepError, PickleStep, Status};

/// Filter rewriting the outcome of a step.
///
/// Runs after the step handler, before the outcome is recorded and before
/// the remaining steps are skipped, so flipping a failure into
/// [`Status::Passed`] lets the [`Pickle`] go on.
///
/// [`Pickle`]: crate::Pickle
pub trait Interceptor {
    /// Returns the new outcome of the given `step`.
    fn intercept(
        &self,
        step: &PickleStep,
        status: Status,
        error: Option<StepError>,
    ) -> (Status, Option<StepError>);
}

impl<F> Interceptor for F
where
    F: Fn(&PickleStep, Status, Option<StepError>) -> (Status, Option<StepError>),
{
    fn intercept(
        &self,
        step: &PickleStep,
        status: Status,
        error: Option<StepError>,
    ) -> (Status, Option<StepError>) {
        self(step, status, error)
    }
}

/// Ordered chain of [`Interceptor`]s, each one seeing the output of the
/// previous.
#[derive(Default)]
pub struct Interceptors(Vec<Box<dyn Interceptor>>);

impl fmt::Debug for Interceptors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Interceptors").field(&self.0.len()).finish()
    }
}

impl Interceptors {
    /// Appends the given [`Interceptor`] to the chain.
    pub fn push(&mut self, interceptor: impl Interceptor + 'static) {
        self.0.push(Box::new(interceptor));
    }

    /// Indicates whether the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Interceptor for Interceptors {
    fn intercept(
        &self,
        step: &PickleStep,
        status: Status,
        error: Option<StepError>,
    ) -> (Status, Option<StepError>) {
        self.0.iter().fold((status, error), |(status, error), i| {
            let (new_status, new_error) = i.intercept(step, status, error);
            if new_status != status {
                tracing::debug!(
                    step = %step.id,
                    from = %status,
                    to = %new_status,
                    "step result intercepted",
                );
            }
            (new_status, new_error)
        })
    }
}

#[cfg(test)]
mod tests {
    use gherkin::{LineCol, StepType};

    use super::{Interceptor as _, Interceptors};
    use crate::{
        event::StepError,
        pickle::{PickleId, StepId},
        PickleStep, Status,
    };

    fn step() -> PickleStep {
        PickleStep {
            id: StepId::new(&PickleId::from("f:1".to_owned()), 0),
            keyword: "Then ".into(),
            ty: StepType::Then,
            text: "it's flaky".into(),
            argument: None,
            is_background: false,
            position: LineCol { line: 3, col: 5 },
        }
    }

    #[test]
    fn chains_in_order() {
        let mut chain = Interceptors::default();
        chain.push(
            |_: &PickleStep, status: Status, _: Option<StepError>| -> (Status, Option<StepError>) {
                (if status == Status::Failed { Status::Passed } else { status }, None)
            },
        );
        chain.push(|s: &PickleStep, status: Status, err: Option<StepError>| {
            assert_eq!(status, Status::Passed);
            (status, err.or_else(|| s.text.contains("flaky").then_some(StepError::Intercepted)))
        });

        let (status, err) = chain.intercept(&step(), Status::Failed, None);

        assert_eq!(status, Status::Passed);
        assert!(matches!(err, Some(StepError::Intercepted)));
    }

    #[test]
    fn empty_chain_keeps_result() {
        let chain = Interceptors::default();

        let (status, err) = chain.intercept(&step(), Status::Pending, None);

        assert!(chain.is_empty());
        assert_eq!(status, Status::Pending);
        assert!(err.is_none());
    }
}
