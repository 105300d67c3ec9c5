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

//! Cloud SDK API helpers.
//!
//! This crate contains the error model and the loop-control policies shared by
//! the Cloud SDK operation waiter and its transports. The types here know
//! nothing about any specific API: they classify errors, decide when a polling
//! loop must stop, and compute how long to wait between polls.

/// An alias of [std::result::Result] where the error is always [crate::error::Error].
///
/// This is the result type used by all functions wrapping RPCs.
pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// The core error types used by the transports and the operation waiter.
pub mod error;

pub mod exponential_backoff;
pub mod loop_state;
pub mod polling_backoff_policy;
pub mod polling_error_policy;
pub mod polling_state;
