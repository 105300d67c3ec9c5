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

//! Defines the types to query polling policies.

use tokio::time::Instant;

/// The input into polling policy queries.
///
/// The polling loop owns one instance of this type and updates it after each
/// poll. The loop-control policies only read it.
///
/// The start time uses [tokio::time::Instant], so loops driven under a paused
/// tokio clock observe the paused time.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct PollingState {
    /// The start time for this polling loop.
    pub start: Instant,

    /// The number of polls that found the operation still in progress.
    ///
    /// This drives the backoff: failed polls do not advance it.
    pub attempt_count: u32,

    /// The number of consecutive failed polls.
    ///
    /// Reset to zero by any successful poll.
    pub error_count: u32,
}

impl PollingState {
    /// Creates a new instance, starting the loop now.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the start time, useful in mocks.
    pub fn set_start<T: Into<Instant>>(mut self, v: T) -> Self {
        self.start = v.into();
        self
    }

    /// Update the attempt count, useful in mocks.
    pub fn set_attempt_count<T: Into<u32>>(mut self, v: T) -> Self {
        self.attempt_count = v.into();
        self
    }

    /// Update the error count, useful in mocks.
    pub fn set_error_count<T: Into<u32>>(mut self, v: T) -> Self {
        self.error_count = v.into();
        self
    }

    /// The time since the loop started.
    pub fn elapsed(&self) -> std::time::Duration {
        Instant::now().saturating_duration_since(self.start)
    }

    /// Records a poll that found the operation still in progress.
    pub fn record_in_progress(&mut self) {
        self.attempt_count = self.attempt_count.saturating_add(1);
        self.error_count = 0;
    }

    /// Records a failed poll.
    pub fn record_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }

    /// Records a poll that found the operation completed.
    pub fn record_done(&mut self) {
        self.error_count = 0;
    }
}

impl std::default::Default for PollingState {
    fn default() -> Self {
        Self {
            start: Instant::now(),
            attempt_count: 0,
            error_count: 0,
        }
    }
}
