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
use std::time::Duration;

/// The errors returned while waiting for a long-running operation.
///
/// Each error maps to an [ErrorCategory], which callers use to present the
/// error and to pick an exit code.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The operation name does not match the path template of its collection.
    #[error(
        "the operation name [{name}] does not match the template [{template}] of collection [{collection}]"
    )]
    MalformedOperationName {
        name: String,
        collection: String,
        template: String,
    },

    /// The service reports the operation completed with an error.
    #[error("operation [{operation}] failed: {status}")]
    Operation { operation: String, status: Status },

    /// The operation was still pending when the wait deadline expired.
    #[error(
        "operation [{operation}] has not finished after {elapsed:?}. The operation may still be running; check its status manually"
    )]
    OperationTimeout {
        operation: String,
        elapsed: Duration,
        #[source]
        source: gax::error::Error,
    },

    /// The operation status could not be read, or the result could not be
    /// fetched.
    #[error("cannot get the status of operation [{operation}]: {source}")]
    Transport {
        operation: String,
        #[source]
        source: gax::error::Error,
    },

    /// The operation completed successfully, but its result is not available.
    #[error("operation [{operation}] completed, but its result is not available")]
    MissingResult {
        operation: String,
        #[source]
        source: Option<gax::error::Error>,
    },
}

/// The user-facing category of an [Error].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// The caller provided an invalid input, retrying will not help.
    InvalidInput,
    /// The operation ran and failed in the service.
    OperationFailed,
    /// The caller stopped waiting, the operation may still complete.
    Timeout,
    /// The service could not be reached, or returned errors.
    Connectivity,
    /// The service responses are inconsistent.
    Internal,
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MalformedOperationName { .. } => ErrorCategory::InvalidInput,
            Self::Operation { .. } => ErrorCategory::OperationFailed,
            Self::OperationTimeout { .. } => ErrorCategory::Timeout,
            Self::Transport { .. } => ErrorCategory::Connectivity,
            Self::MissingResult { .. } => ErrorCategory::Internal,
        }
    }

    /// The name of the operation, if the error refers to one.
    pub fn operation(&self) -> Option<&str> {
        match self {
            Self::MalformedOperationName { .. } => None,
            Self::Operation { operation, .. }
            | Self::OperationTimeout { operation, .. }
            | Self::Transport { operation, .. }
            | Self::MissingResult { operation, .. } => Some(operation.as_str()),
        }
    }

    /// The status reported by the service for a failed operation.
    pub fn status(&self) -> Option<&Status> {
        match self {
            Self::Operation { status, .. } => Some(status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::OperationTimeout { .. })
    }
}
