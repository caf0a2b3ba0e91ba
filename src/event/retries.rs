// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

/// Retry state of a [`Pickle`].
///
/// [`Pickle`]: crate::Pickle
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Retries {
    /// Zero-based number of the current attempt.
    pub current: usize,

    /// Attempts left after the current one.
    pub left: usize,
}

impl Retries {
    /// Creates initial [`Retries`] allowing `left` extra attempts.
    #[must_use]
    pub const fn initial(left: usize) -> Self {
        Self { left, current: 0 }
    }

    /// Returns [`Some`], in case next retry attempt is available, or [`None`]
    /// otherwise.
    #[must_use]
    pub fn next_try(self) -> Option<Self> {
        self.left
            .checked_sub(1)
            .map(|left| Self { left, current: self.current + 1 })
    }

    /// One-based number of the current attempt.
    #[must_use]
    pub const fn attempt(self) -> usize {
        self.current + 1
    }
}

#[cfg(test)]
mod tests {
    use super::Retries;

    #[test]
    fn exhausts_after_left_attempts() {
        let first = Retries::initial(2);
        let second = first.next_try().unwrap();
        let third = second.next_try().unwrap();

        assert_eq!(first.attempt(), 1);
        assert_eq!(third, Retries { current: 2, left: 0 });
        assert_eq!(third.next_try(), None);
    }
}
