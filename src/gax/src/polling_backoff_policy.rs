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

//! Defines the trait for polling backoff policies.
//!
//! The operation waiter backs off between polls to avoid overloading the
//! service. Polling backoff policies do not use jitter: the delays are
//! predictable so the progress output and the deadline math stay predictable.
//!
//! The most common implementation is truncated [exponential backoff]
//! **without** jitter. The backoff period grows exponentially until some limit
//! is reached. This works well when the expected execution time is not known
//! in advance.
//!
//! # Example
//! ```
//! # use cloudsdk_gax::exponential_backoff::Error;
//! # use cloudsdk_gax::exponential_backoff::ExponentialBackoffBuilder;
//! use cloudsdk_gax::polling_backoff_policy::PollingBackoffPolicy;
//! use cloudsdk_gax::polling_state::PollingState;
//! use std::time::Duration;
//!
//! let policy = ExponentialBackoffBuilder::new()
//!     .with_initial_delay(Duration::from_millis(100))
//!     .with_maximum_delay(Duration::from_secs(5))
//!     .with_scaling(4.0)
//!     .build()?;
//! let state = PollingState::default().set_attempt_count(2_u32);
//! assert_eq!(policy.wait_period(&state), Duration::from_millis(400));
//! # Ok::<(), Error>(())
//! ```
//!
//! [exponential backoff]: https://en.wikipedia.org/wiki/Exponential_backoff

use crate::polling_state::PollingState;
use std::sync::Arc;

/// Defines the trait implemented by all polling backoff strategies.
pub trait PollingBackoffPolicy: Send + Sync + std::fmt::Debug {
    /// Returns the delay before the next poll.
    ///
    /// # Parameters
    /// * `state` - the state of the polling loop. This method is always called
    ///   after at least one poll.
    fn wait_period(&self, state: &PollingState) -> std::time::Duration;
}

impl<T: PollingBackoffPolicy + ?Sized> PollingBackoffPolicy for Arc<T> {
    fn wait_period(&self, state: &PollingState) -> std::time::Duration {
        self.as_ref().wait_period(state)
    }
}

impl<T: PollingBackoffPolicy + ?Sized> PollingBackoffPolicy for Box<T> {
    fn wait_period(&self, state: &PollingState) -> std::time::Duration {
        self.as_ref().wait_period(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exponential_backoff::ExponentialBackoffBuilder;
    use std::time::Duration;

    #[test]
    fn smart_pointers() -> anyhow::Result<()> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_delay(Duration::from_secs(1))
            .with_maximum_delay(Duration::from_secs(4))
            .with_scaling(2.0)
            .build()?;
        let state = PollingState::default().set_attempt_count(3_u32);

        let shared: Arc<dyn PollingBackoffPolicy> = Arc::new(policy);
        assert_eq!(shared.wait_period(&state), Duration::from_secs(4));

        let boxed: Box<dyn PollingBackoffPolicy> = Box::new(shared.clone());
        assert_eq!(boxed.wait_period(&state), Duration::from_secs(4));
        Ok(())
    }
}
