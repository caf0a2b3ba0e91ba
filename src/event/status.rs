// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use derive_more::with_trait::Display;

/// Outcome of a [`PickleStep`] or a whole [`Pickle`].
///
/// Variants are ordered by their [severity](Status::severity), which is the
/// only ranking used for aggregation, summaries, exit codes and output.
///
/// [`Pickle`]: crate::Pickle
/// [`PickleStep`]: crate::PickleStep
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Status {
    /// Step handler completed successfully.
    #[display("passed")]
    Passed,

    /// Step wasn't executed because a previous one didn't pass.
    #[display("skipped")]
    Skipped,

    /// Step handler declared itself not implemented yet.
    #[display("pending")]
    Pending,

    /// Step handler, hook or argument binding failed.
    #[display("failed")]
    Failed,

    /// No step definition matches the step text.
    #[display("undefined")]
    Undefined,

    /// Several step definitions match the step text.
    #[display("ambiguous")]
    Ambiguous,
}

impl Status {
    /// Returns the severity of this [`Status`]:
    ///
    /// | status    | severity |
    /// |-----------|----------|
    /// | Ambiguous | 5        |
    /// | Undefined | 4        |
    /// | Failed    | 3        |
    /// | Pending   | 2        |
    /// | Skipped   | 1        |
    /// | Passed    | 0        |
    #[must_use]
    pub const fn severity(self) -> u8 {
        match self {
            Self::Passed => 0,
            Self::Skipped => 1,
            Self::Pending => 2,
            Self::Failed => 3,
            Self::Undefined => 4,
            Self::Ambiguous => 5,
        }
    }

    /// Aggregates the given step statuses into the status of their
    /// [`Pickle`]: the most severe one, or [`Status::Passed`] if none.
    ///
    /// [`Pickle`]: crate::Pickle
    #[must_use]
    pub fn aggregate<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        statuses
            .into_iter()
            .max_by_key(|s| s.severity())
            .unwrap_or(Self::Passed)
    }

    /// Returns the more severe of two [`Status`]es.
    #[must_use]
    pub const fn worst(self, other: Self) -> Self {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }

    /// Indicates whether this [`Status`] fails the run.
    ///
    /// [`Undefined`] and [`Pending`] count as failures only in `strict` mode.
    ///
    /// [`Pending`]: Status::Pending
    /// [`Undefined`]: Status::Undefined
    #[must_use]
    pub const fn is_failure(self, strict: bool) -> bool {
        match self {
            Self::Failed | Self::Ambiguous => true,
            Self::Undefined | Self::Pending => strict,
            Self::Passed | Self::Skipped => false,
        }
    }

    /// All the [`Status`]es, from the least to the most severe.
    pub const ALL: [Self; 6] = [
        Self::Passed,
        Self::Skipped,
        Self::Pending,
        Self::Failed,
        Self::Undefined,
        Self::Ambiguous,
    ];
}

#[cfg(test)]
mod tests {
    use super::Status;

    #[test]
    fn aggregates_by_severity() {
        use Status as S;

        assert_eq!(S::aggregate([S::Passed, S::Pending, S::Skipped]), S::Pending);
        assert_eq!(S::aggregate([S::Passed, S::Undefined]), S::Undefined);
        assert_eq!(S::aggregate([S::Passed, S::Passed]), S::Passed);
        assert_eq!(S::aggregate([S::Undefined, S::Ambiguous]), S::Ambiguous);
        assert_eq!(S::aggregate([S::Failed, S::Undefined]), S::Undefined);
        assert_eq!(S::aggregate([]), S::Passed);
    }

    #[test]
    fn order_matches_severity() {
        for pair in Status::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].severity() < pair[1].severity());
        }
    }

    #[test]
    fn strict_mode_escalates() {
        assert!(!Status::Undefined.is_failure(false));
        assert!(Status::Undefined.is_failure(true));
        assert!(!Status::Pending.is_failure(false));
        assert!(Status::Pending.is_failure(true));
        assert!(Status::Ambiguous.is_failure(false));
        assert!(!Status::Skipped.is_failure(true));
    }
}
