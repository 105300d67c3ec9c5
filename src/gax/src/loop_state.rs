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

//! Polling loop control types.
//!
//! Applications only need to use these types when implementing their own
//! polling error policies.

use crate::error::Error;

/// The result of a loop control decision after a failed poll.
#[derive(Debug)]
pub enum LoopState {
    /// The error is not transient, stop the loop.
    Permanent(Error),

    /// The error is transient, but the policy is stopping the loop.
    ///
    /// Policies stop the loop on transient errors when too many errors happen
    /// in a row, or when the loop runs past its deadline.
    Exhausted(Error),

    /// The error is transient, poll again.
    Continue(Error),
}

impl LoopState {
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted(_))
    }
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_))
    }

    /// Consumes the decision, returning the error that triggered it.
    pub fn into_error(self) -> Error {
        match self {
            Self::Permanent(e) | Self::Exhausted(e) | Self::Continue(e) => e,
        }
    }
}
