// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Truncated exponential backoff for polling loops.
//!
//! This module provides an implementation of truncated [exponential backoff]
//! without jitter. It implements the [PollingBackoffPolicy] trait.
//!
//! [exponential backoff]: https://en.wikipedia.org/wiki/Exponential_backoff
//! [PollingBackoffPolicy]: crate::polling_backoff_policy::PollingBackoffPolicy

use crate::polling_state::PollingState;
use std::time::Duration;

/// The error type for exponential backoff creation.
#[derive(thiserror::Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("the scaling value ({0}) should be >= 1.0")]
    InvalidScalingFactor(f64),
    #[error(
        "the maximum delay ({maximum:?}) should be greater than or equal to the initial delay ({initial:?})"
    )]
    EmptyRange {
        maximum: Duration,
        initial: Duration,
    },
}

/// Builds [ExponentialBackoff] policies.
///
/// The defaults match the operation waiter: a two second initial delay,
/// growing by a factor of 1.4 until it reaches three minutes.
#[derive(Clone, Debug)]
pub struct ExponentialBackoffBuilder {
    initial_delay: Duration,
    maximum_delay: Duration,
    scaling: f64,
}

impl ExponentialBackoffBuilder {
    /// Creates a builder with the default parameters.
    ///
    /// # Example
    /// ```
    /// # use cloudsdk_gax::exponential_backoff::Error;
    /// # use cloudsdk_gax::exponential_backoff::ExponentialBackoffBuilder;
    /// use std::time::Duration;
    ///
    /// let policy = ExponentialBackoffBuilder::new()
    ///         .with_initial_delay(Duration::from_millis(100))
    ///         .with_maximum_delay(Duration::from_secs(5))
    ///         .with_scaling(4.0)
    ///         .build()?;
    /// # Ok::<(), Error>(())
    /// ```
    pub fn new() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            maximum_delay: Duration::from_secs(180),
            scaling: 1.4,
        }
    }

    /// Change the initial delay.
    ///
    /// A zero initial delay is allowed, it results in back-to-back polls.
    pub fn with_initial_delay<V: Into<Duration>>(mut self, v: V) -> Self {
        self.initial_delay = v.into();
        self
    }

    /// Change the maximum delay.
    pub fn with_maximum_delay<V: Into<Duration>>(mut self, v: V) -> Self {
        self.maximum_delay = v.into();
        self
    }

    /// Change the scaling factor in this backoff policy.
    pub fn with_scaling<V: Into<f64>>(mut self, v: V) -> Self {
        self.scaling = v.into();
        self
    }

    /// Creates a new exponential backoff policy.
    ///
    /// # Example
    /// ```
    /// # use cloudsdk_gax::exponential_backoff::Error;
    /// # use cloudsdk_gax::exponential_backoff::ExponentialBackoffBuilder;
    /// use cloudsdk_gax::polling_backoff_policy::PollingBackoffPolicy;
    /// use cloudsdk_gax::polling_state::PollingState;
    /// use std::time::Duration;
    /// let backoff = ExponentialBackoffBuilder::new()
    ///     .with_initial_delay(Duration::from_secs(5))
    ///     .with_maximum_delay(Duration::from_secs(50))
    ///     .with_scaling(2.0)
    ///     .build()?;
    /// let p = backoff.wait_period(&PollingState::default().set_attempt_count(1_u32));
    /// assert_eq!(p, Duration::from_secs(5));
    /// let p = backoff.wait_period(&PollingState::default().set_attempt_count(2_u32));
    /// assert_eq!(p, Duration::from_secs(10));
    /// # Ok::<(), Error>(())
    /// ```
    pub fn build(self) -> Result<ExponentialBackoff, Error> {
        // Written as a negation so NaN is rejected too.
        if !(self.scaling >= 1.0) {
            return Err(Error::InvalidScalingFactor(self.scaling));
        }
        if self.maximum_delay < self.initial_delay {
            return Err(Error::EmptyRange {
                maximum: self.maximum_delay,
                initial: self.initial_delay,
            });
        }
        Ok(ExponentialBackoff {
            maximum_delay: self.maximum_delay,
            scaling: self.scaling,
            initial_delay: self.initial_delay,
        })
    }
}

impl Default for ExponentialBackoffBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Implements truncated exponential backoff.
///
/// The delay after the `n`-th in-progress poll is
/// `initial_delay * scaling^(n - 1)`, capped at `maximum_delay`.
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    maximum_delay: Duration,
    scaling: f64,
}

impl ExponentialBackoff {
    /// The delay before the first re-poll.
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// The upper bound for all delays.
    pub fn maximum_delay(&self) -> Duration {
        self.maximum_delay
    }

    /// The growth factor between consecutive delays.
    pub fn scaling(&self) -> f64 {
        self.scaling
    }

    fn delay(&self, attempt_count: u32) -> Duration {
        if self.initial_delay.is_zero() {
            return Duration::ZERO;
        }
        let exp = std::cmp::min(i32::MAX as u32, attempt_count.saturating_sub(1)) as i32;
        let scaling = self.scaling.powi(exp);
        if scaling >= self.maximum_delay.div_duration_f64(self.initial_delay) {
            self.maximum_delay
        } else {
            // .mul_f64() cannot panic: scaling >= 1.0 and the product is
            // below `maximum_delay`.
            self.initial_delay.mul_f64(scaling)
        }
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            maximum_delay: Duration::from_secs(180),
            scaling: 1.4,
        }
    }
}

impl crate::polling_backoff_policy::PollingBackoffPolicy for ExponentialBackoff {
    fn wait_period(&self, state: &PollingState) -> Duration {
        self.delay(state.attempt_count)
    }
}
