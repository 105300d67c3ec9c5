// Copyright 2024 Google LLC
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

//! Defines the types for polling error policies.
//!
//! # Example
//! ```
//! # use cloudsdk_gax::polling_error_policy::*;
//! use std::time::Duration;
//! // Poll for at most 30 minutes, and give up after 3 failed polls in a row:
//! // whichever limit is reached first stops the polling loop.
//! let policy = TransientErrors
//!     .with_error_limit(3)
//!     .with_time_limit(Duration::from_secs(30 * 60));
//! ```
//!
//! The operation waiter needs to (1) distinguish between transient and
//! permanent errors while reading the operation status, (2) limit how many
//! transient errors it tolerates in a row, and (3) limit the total duration of
//! the polling loop.
//!
//! The trait in this module captures these decisions, the types implement the
//! common cases, and they can be composed as decorators.

use crate::error::Error;
use crate::loop_state::LoopState;
use crate::polling_state::PollingState;
use std::sync::Arc;
use std::time::Duration;

/// Determines how errors are handled in the polling loop.
///
/// Implementations of this trait determine if polling errors may resolve in
/// future attempts, and for how long the polling loop may continue.
pub trait PollingErrorPolicy: Send + Sync + std::fmt::Debug {
    /// Query the polling policy after a failed poll.
    ///
    /// # Parameters
    /// * `state` - the state of the polling loop. The `error_count` already
    ///   includes this error.
    /// * `error` - the error returned by the poll.
    fn on_error(&self, state: &PollingState, error: Error) -> LoopState;

    /// Called when the operation is successfully polled, but it is still in
    /// progress.
    ///
    /// Returns an error if the loop must stop.
    fn on_in_progress(&self, _state: &PollingState, _operation_name: &str) -> Option<Error> {
        None
    }

    /// The time left before the policy stops the loop, if the policy has a
    /// deadline.
    fn remaining_time(&self, _state: &PollingState) -> Option<Duration> {
        None
    }
}

impl<T: PollingErrorPolicy + ?Sized> PollingErrorPolicy for Arc<T> {
    fn on_error(&self, state: &PollingState, error: Error) -> LoopState {
        self.as_ref().on_error(state, error)
    }
    fn on_in_progress(&self, state: &PollingState, operation_name: &str) -> Option<Error> {
        self.as_ref().on_in_progress(state, operation_name)
    }
    fn remaining_time(&self, state: &PollingState) -> Option<Duration> {
        self.as_ref().remaining_time(state)
    }
}

/// Extension trait for [PollingErrorPolicy]
pub trait PollingErrorPolicyExt: PollingErrorPolicy + Sized {
    /// Decorate a [PollingErrorPolicy] to limit the total elapsed time in the
    /// polling loop.
    ///
    /// While the time spent in the polling loop (including time in backoff) is
    /// less than the prescribed duration the `on_error()` method returns the
    /// results of the inner policy. After that time it returns
    /// [Exhausted][LoopState::Exhausted] if the inner policy returns
    /// [Continue][LoopState::Continue], and `on_in_progress()` returns an
    /// [exhausted][Error::is_exhausted] error.
    ///
    /// # Example
    /// ```
    /// # use cloudsdk_gax::*;
    /// use polling_error_policy::*;
    /// use polling_state::PollingState;
    /// use std::time::Duration;
    /// let policy = TransientErrors.with_time_limit(Duration::from_secs(10));
    /// let state = PollingState::default();
    /// assert_eq!(policy.remaining_time(&state), Some(Duration::from_secs(10)));
    /// ```
    fn with_time_limit(self, maximum_duration: Duration) -> LimitedElapsedTime<Self> {
        LimitedElapsedTime::custom(self, maximum_duration)
    }

    /// Decorate a [PollingErrorPolicy] to limit the number of consecutive
    /// failed polls.
    ///
    /// The policy passes through the results from the inner policy as long as
    /// `error_count < maximum_errors`. Once the maximum is reached, the policy
    /// returns [Exhausted][LoopState::Exhausted] if the inner policy returns
    /// [Continue][LoopState::Continue], and passes the inner policy result
    /// otherwise.
    ///
    /// # Example
    /// ```
    /// # use cloudsdk_gax::*;
    /// use polling_error_policy::*;
    /// use polling_state::PollingState;
    /// let policy = TransientErrors.with_error_limit(3);
    /// let state = PollingState::default();
    /// assert!(policy.on_error(&state.clone().set_error_count(2_u32), transient_error()).is_continue());
    /// assert!(policy.on_error(&state.set_error_count(3_u32), transient_error()).is_exhausted());
    ///
    /// use cloudsdk_gax::error::{Error, rpc::Code, rpc::Status};
    /// fn transient_error() -> Error { Error::service(Status::default().set_code(Code::Unavailable)) }
    /// ```
    fn with_error_limit(self, maximum_errors: u32) -> LimitedErrorCount<Self> {
        LimitedErrorCount::custom(self, maximum_errors)
    }
}

impl<T: PollingErrorPolicy> PollingErrorPolicyExt for T {}

/// A polling policy that continues on transient errors.
///
/// Reading the status of an operation is always safe to repeat, so this
/// policy treats as transient any error that may resolve on its own:
/// - I/O errors, where no HTTP response was received.
/// - Request timeouts.
/// - HTTP responses with a 5xx status code.
/// - Service errors with the `UNAVAILABLE` code.
///
/// All other errors are permanent.
///
/// This policy must be decorated to limit the number of polling attempts or the
/// duration of the polling loop.
///
/// # Example
/// ```
/// # use cloudsdk_gax::*;
/// # use cloudsdk_gax::polling_error_policy::*;
/// # use cloudsdk_gax::polling_state::PollingState;
/// let policy = TransientErrors;
/// let state = PollingState::default();
/// assert!(policy.on_error(&state, transient_error()).is_continue());
/// assert!(policy.on_error(&state, permanent_error()).is_permanent());
///
/// use cloudsdk_gax::error::{Error, rpc::Code, rpc::Status};
/// fn transient_error() -> Error { Error::service(Status::default().set_code(Code::Unavailable)) }
/// fn permanent_error() -> Error { Error::service(Status::default().set_code(Code::PermissionDenied)) }
/// ```
#[derive(Clone, Debug)]
pub struct TransientErrors;

impl TransientErrors {
    /// Returns true if `error` may resolve in a future poll.
    pub fn is_transient(error: &Error) -> bool {
        if error.is_io() || error.is_timeout() {
            return true;
        }
        if let Some(status) = error.status() {
            return status.code == crate::error::rpc::Code::Unavailable;
        }
        matches!(error.http_status_code(), Some(code) if (500..600).contains(&code))
    }
}

impl PollingErrorPolicy for TransientErrors {
    fn on_error(&self, _state: &PollingState, error: Error) -> LoopState {
        if Self::is_transient(&error) {
            LoopState::Continue(error)
        } else {
            LoopState::Permanent(error)
        }
    }
}

/// A polling policy decorator that limits the total time in the polling loop.
///
/// This policy decorates an inner policy and limits the duration of polling
/// loops. While the time spent in the polling loop (including time in backoff)
/// is less than the prescribed duration the `on_error()` method returns the
/// results of the inner policy. After that time it returns
/// [Exhausted][LoopState::Exhausted] if the inner policy returns
/// [Continue][LoopState::Continue].
///
/// The `remaining_time()` function returns the remaining time. This is always
/// [Duration::ZERO] once or after the policy's deadline is reached.
///
/// # Parameters
/// * `P` - the inner polling policy, defaults to [TransientErrors].
#[derive(Debug)]
pub struct LimitedElapsedTime<P = TransientErrors>
where
    P: PollingErrorPolicy,
{
    inner: P,
    maximum_duration: Duration,
}

impl LimitedElapsedTime {
    /// Creates a new instance, with the default inner policy.
    pub fn new(maximum_duration: Duration) -> Self {
        Self {
            inner: TransientErrors,
            maximum_duration,
        }
    }
}

impl<P> LimitedElapsedTime<P>
where
    P: PollingErrorPolicy,
{
    /// Creates a new instance with a custom inner policy.
    pub fn custom(inner: P, maximum_duration: Duration) -> Self {
        Self {
            inner,
            maximum_duration,
        }
    }

    /// The maximum duration of the polling loop.
    pub fn maximum_duration(&self) -> Duration {
        self.maximum_duration
    }

    fn in_progress_impl(&self, state: &PollingState, operation_name: &str) -> Option<Error> {
        let elapsed = state.elapsed();
        if elapsed < self.maximum_duration {
            return None;
        }
        Some(Error::exhausted(Exhausted::new(
            operation_name,
            "elapsed time",
            format!("{elapsed:?}"),
            format!("{:?}", self.maximum_duration),
        )))
    }
}

impl<P> PollingErrorPolicy for LimitedElapsedTime<P>
where
    P: PollingErrorPolicy + 'static,
{
    fn on_error(&self, state: &PollingState, error: Error) -> LoopState {
        match self.inner.on_error(state, error) {
            LoopState::Permanent(e) => LoopState::Permanent(e),
            LoopState::Exhausted(e) => LoopState::Exhausted(e),
            LoopState::Continue(e) => {
                if state.elapsed() >= self.maximum_duration {
                    LoopState::Exhausted(e)
                } else {
                    LoopState::Continue(e)
                }
            }
        }
    }

    fn on_in_progress(&self, state: &PollingState, operation_name: &str) -> Option<Error> {
        self.inner
            .on_in_progress(state, operation_name)
            .or_else(|| self.in_progress_impl(state, operation_name))
    }

    fn remaining_time(&self, state: &PollingState) -> Option<Duration> {
        let remaining = self.maximum_duration.saturating_sub(state.elapsed());
        match self.inner.remaining_time(state) {
            Some(inner) => Some(std::cmp::min(inner, remaining)),
            None => Some(remaining),
        }
    }
}

/// A polling policy decorator that limits the number of consecutive failed
/// polls.
///
/// The policy passes through the results from the inner policy as long as
/// `error_count < maximum_errors`. However, once the maximum number of errors
/// is reached, the policy replaces any [Continue][LoopState::Continue] result
/// with [Exhausted][LoopState::Exhausted].
///
/// Setting the maximum to 0 or 1 stops the loop on the first failed poll.
///
/// # Parameters
/// * `P` - the inner polling policy, defaults to [TransientErrors].
#[derive(Debug)]
pub struct LimitedErrorCount<P = TransientErrors>
where
    P: PollingErrorPolicy,
{
    inner: P,
    maximum_errors: u32,
}

impl LimitedErrorCount {
    /// Creates a new instance, with the default inner policy.
    pub fn new(maximum_errors: u32) -> Self {
        Self {
            inner: TransientErrors,
            maximum_errors,
        }
    }
}

impl<P> LimitedErrorCount<P>
where
    P: PollingErrorPolicy,
{
    /// Creates a new instance with a custom inner policy.
    pub fn custom(inner: P, maximum_errors: u32) -> Self {
        Self {
            inner,
            maximum_errors,
        }
    }
}

impl<P> PollingErrorPolicy for LimitedErrorCount<P>
where
    P: PollingErrorPolicy,
{
    fn on_error(&self, state: &PollingState, error: Error) -> LoopState {
        match self.inner.on_error(state, error) {
            LoopState::Permanent(e) => LoopState::Permanent(e),
            LoopState::Exhausted(e) => LoopState::Exhausted(e),
            LoopState::Continue(e) => {
                if state.error_count >= self.maximum_errors {
                    LoopState::Exhausted(e)
                } else {
                    LoopState::Continue(e)
                }
            }
        }
    }

    fn on_in_progress(&self, state: &PollingState, operation_name: &str) -> Option<Error> {
        self.inner.on_in_progress(state, operation_name)
    }

    fn remaining_time(&self, state: &PollingState) -> Option<Duration> {
        self.inner.remaining_time(state)
    }
}

/// Indicates that a polling loop has been exhausted.
#[derive(Debug)]
pub struct Exhausted {
    operation_name: String,
    limit_name: &'static str,
    value: String,
    limit: String,
}

impl Exhausted {
    pub fn new(
        operation_name: &str,
        limit_name: &'static str,
        value: String,
        limit: String,
    ) -> Self {
        Self {
            operation_name: operation_name.to_string(),
            limit_name,
            value,
            limit,
        }
    }
}

impl std::fmt::Display for Exhausted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "polling loop for {} exhausted, {} value ({}) exceeds limit ({})",
            self.operation_name, self.limit_name, self.value, self.limit
        )
    }
}

impl std::error::Error for Exhausted {}
