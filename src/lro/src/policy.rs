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

use gax::exponential_backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use gax::polling_error_policy::{
    LimitedElapsedTime, LimitedErrorCount, PollingErrorPolicyExt, TransientErrors,
};
use std::time::Duration;

const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(30 * 60);
const DEFAULT_TRANSIENT_RETRIES: u32 = 3;

/// The error returned by [WaitPolicyBuilder::build].
#[derive(thiserror::Error, Debug, PartialEq)]
#[error("invalid wait policy: {0}")]
pub struct PolicyError(#[from] gax::exponential_backoff::Error);

/// Configures how long, and how often, to poll an operation.
///
/// # Example
/// ```
/// # use cloudsdk_lro::WaitPolicy;
/// use std::time::Duration;
/// let policy = WaitPolicy::builder()
///     .with_max_wait(Duration::from_secs(600))
///     .with_initial_delay(Duration::from_secs(1))
///     .build()?;
/// assert_eq!(policy.max_wait(), Duration::from_secs(600));
/// assert_eq!(policy.backoff_multiplier(), 1.4);
/// # Ok::<(), cloudsdk_lro::PolicyError>(())
/// ```
#[derive(Clone, Debug)]
pub struct WaitPolicy {
    max_wait: Duration,
    backoff: ExponentialBackoff,
    transient_retries: u32,
    pre_start_delay: Duration,
}

impl WaitPolicy {
    pub fn builder() -> WaitPolicyBuilder {
        WaitPolicyBuilder::default()
    }

    /// The maximum time to wait for the operation.
    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// The delay after the first poll that finds the operation in progress.
    pub fn initial_delay(&self) -> Duration {
        self.backoff.initial_delay()
    }

    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff.scaling()
    }

    /// The maximum delay between polls.
    pub fn backoff_ceiling(&self) -> Duration {
        self.backoff.maximum_delay()
    }

    /// How many times a poll that fails with a transient error is retried.
    pub fn transient_retries(&self) -> u32 {
        self.transient_retries
    }

    /// How long to wait before the first poll.
    pub fn pre_start_delay(&self) -> Duration {
        self.pre_start_delay
    }

    pub(crate) fn backoff_policy(&self) -> ExponentialBackoff {
        self.backoff.clone()
    }

    pub(crate) fn error_policy(&self) -> LimitedElapsedTime<LimitedErrorCount<TransientErrors>> {
        TransientErrors
            .with_error_limit(self.transient_retries.saturating_add(1))
            .with_time_limit(self.max_wait)
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            max_wait: DEFAULT_MAX_WAIT,
            backoff: ExponentialBackoff::default(),
            transient_retries: DEFAULT_TRANSIENT_RETRIES,
            pre_start_delay: Duration::ZERO,
        }
    }
}

/// Builds [WaitPolicy] instances.
///
/// The defaults are a 30 minute deadline, a two second initial delay growing
/// by a factor of 1.4 up to three minutes, and three retries for transient
/// errors.
#[derive(Clone, Debug)]
pub struct WaitPolicyBuilder {
    max_wait: Duration,
    backoff: ExponentialBackoffBuilder,
    transient_retries: u32,
    pre_start_delay: Duration,
}

impl WaitPolicyBuilder {
    pub fn with_max_wait<V: Into<Duration>>(mut self, v: V) -> Self {
        self.max_wait = v.into();
        self
    }

    pub fn with_initial_delay<V: Into<Duration>>(mut self, v: V) -> Self {
        self.backoff = self.backoff.with_initial_delay(v);
        self
    }

    pub fn with_backoff_multiplier<V: Into<f64>>(mut self, v: V) -> Self {
        self.backoff = self.backoff.with_scaling(v);
        self
    }

    pub fn with_backoff_ceiling<V: Into<Duration>>(mut self, v: V) -> Self {
        self.backoff = self.backoff.with_maximum_delay(v);
        self
    }

    pub fn with_transient_retries<V: Into<u32>>(mut self, v: V) -> Self {
        self.transient_retries = v.into();
        self
    }

    /// Sleeps before the first poll, for operations that are known to take a
    /// while. The sleep counts against the maximum wait.
    pub fn with_pre_start_delay<V: Into<Duration>>(mut self, v: V) -> Self {
        self.pre_start_delay = v.into();
        self
    }

    /// Validates the configuration and creates the policy.
    ///
    /// Fails if the multiplier is less than 1.0, or if the ceiling is less
    /// than the initial delay.
    pub fn build(self) -> Result<WaitPolicy, PolicyError> {
        Ok(WaitPolicy {
            max_wait: self.max_wait,
            backoff: self.backoff.build()?,
            transient_retries: self.transient_retries,
            pre_start_delay: self.pre_start_delay,
        })
    }
}

impl Default for WaitPolicyBuilder {
    fn default() -> Self {
        Self {
            max_wait: DEFAULT_MAX_WAIT,
            backoff: ExponentialBackoffBuilder::new(),
            transient_retries: DEFAULT_TRANSIENT_RETRIES,
            pre_start_delay: Duration::ZERO,
        }
    }
}
