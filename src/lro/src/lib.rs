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

//! Wait for long-running operations.
//!
//! Many Cloud API methods start a long-running operation (LRO) and return a
//! handle to it. Commands that call these methods typically block until the
//! operation completes, showing progress while they wait, and then print the
//! resource created or modified by the operation.
//!
//! This crate implements that wait, once, for all services:
//! * [OperationReference] validates the operation name against the path
//!   template of its collection.
//! * [Poller] polls the operation with truncated exponential backoff, retrying
//!   transient errors, until the operation completes or the deadline expires.
//! * [fetcher] produces the final resource.
//! * [Waiter] and [wait_for] put all the pieces together.
//!
//! The crate does not know how to call any particular service. The caller
//! provides the `query` and `fetch` capabilities as closures.

/// The result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

mod error;
pub use error::{Error, ErrorCategory};

pub mod fetcher;

mod poller;
pub use poller::{Poller, PollingResult};

mod policy;
pub use policy::{PolicyError, WaitPolicy, WaitPolicyBuilder};

pub mod progress;

mod reference;
pub use reference::{Collection, OperationReference, resolve};

mod status;
pub use status::{Operation, OperationStatus, State};

mod wait;
pub use wait::{Waiter, wait_for};
