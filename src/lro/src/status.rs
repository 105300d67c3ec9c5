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

use gax::error::rpc::Status;
use serde::{Deserialize, Serialize};

/// A long-running operation, as returned by the service.
///
/// This mirrors the `google.longrunning.Operation` message in its JSON
/// representation. The `response` and `metadata` fields are service specific,
/// they are kept as opaque JSON values.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct Operation {
    /// The server-assigned name of the operation.
    pub name: String,

    /// If `false`, the operation is still in progress.
    pub done: bool,

    /// The error result of the operation, in case of failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Status>,

    /// The normal response of the operation, in case of success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,

    /// Service-specific metadata, such as progress information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Operation {
    /// Sets the value of [name][Operation::name].
    pub fn set_name<T: Into<String>>(mut self, v: T) -> Self {
        self.name = v.into();
        self
    }

    /// Sets the value of [done][Operation::done].
    pub fn set_done<T: Into<bool>>(mut self, v: T) -> Self {
        self.done = v.into();
        self
    }

    /// Sets the value of [error][Operation::error].
    pub fn set_error<T: Into<Status>>(mut self, v: T) -> Self {
        self.error = Some(v.into());
        self
    }

    /// Sets the value of [response][Operation::response].
    pub fn set_response<T: Into<serde_json::Value>>(mut self, v: T) -> Self {
        self.response = Some(v.into());
        self
    }

    /// Sets the value of [metadata][Operation::metadata].
    pub fn set_metadata<T: Into<serde_json::Value>>(mut self, v: T) -> Self {
        self.metadata = Some(v.into());
        self
    }
}

/// The state of an operation, as observed in one poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Pending,
    DoneSuccess,
    DoneError,
}

/// One polled snapshot of an operation.
///
/// Snapshots are normalized on construction: pending operations carry neither
/// an error nor a result, and failed operations carry no result.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OperationStatus {
    name: String,
    done: bool,
    error: Option<Status>,
    result: Option<serde_json::Value>,
    metadata: Option<serde_json::Value>,
}

impl OperationStatus {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn done(&self) -> bool {
        self.done
    }

    pub fn error(&self) -> Option<&Status> {
        self.error.as_ref()
    }

    /// The result payload, only present for successful operations.
    pub fn result(&self) -> Option<&serde_json::Value> {
        self.result.as_ref()
    }

    pub fn metadata(&self) -> Option<&serde_json::Value> {
        self.metadata.as_ref()
    }

    pub fn state(&self) -> State {
        match (self.done, &self.error) {
            (false, _) => State::Pending,
            (true, Some(_)) => State::DoneError,
            (true, None) => State::DoneSuccess,
        }
    }

    /// Consumes the snapshot, returning the result payload.
    pub fn into_result(self) -> Option<serde_json::Value> {
        self.result
    }
}

impl From<Operation> for OperationStatus {
    fn from(value: Operation) -> Self {
        let (error, result) = match (value.done, value.error) {
            (false, _) => (None, None),
            (true, Some(e)) => (Some(e), None),
            (true, None) => (None, value.response),
        };
        Self {
            name: value.name,
            done: value.done,
            error,
            result,
            metadata: value.metadata,
        }
    }
}
