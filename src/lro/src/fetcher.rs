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

//! Fetch the result of a successful operation.
//!
//! Some services embed the final resource in the operation response, others
//! only return a reference to it, and the caller must fetch it with a separate
//! RPC. The waiter receives the fetch capability as a closure. This module
//! provides the common capabilities.

use crate::Result;
use crate::error::Error;
use crate::reference::OperationReference;
use crate::status::OperationStatus;
use serde::de::DeserializeOwned;
use std::future::{Future, Ready, ready};

/// Returns a fetch capability that decodes the operation response.
///
/// The capability issues no RPCs. It returns `None` when the operation has no
/// response, and a deserialization error if the response is not a valid `R`.
///
/// # Example
/// ```
/// # use cloudsdk_lro::{Operation, OperationStatus, fetcher};
/// #[derive(serde::Deserialize)]
/// struct Trigger { id: String }
///
/// let status = OperationStatus::from(
///     Operation::default().set_done(true).set_response(serde_json::json!({"id": "x"})));
/// let mut fetch = fetcher::embedded::<Trigger>();
/// let trigger = fetch(status).into_inner()?;
/// assert_eq!(trigger.map(|t| t.id).as_deref(), Some("x"));
/// # Ok::<(), gax::error::Error>(())
/// ```
pub fn embedded<R>() -> impl FnMut(OperationStatus) -> Ready<gax::Result<Option<R>>>
where
    R: DeserializeOwned,
{
    |status: OperationStatus| {
        ready(
            status
                .into_result()
                .map(serde_json::from_value::<R>)
                .transpose()
                .map_err(gax::error::Error::deser),
        )
    }
}

/// Returns a fetch capability that never produces a result.
///
/// Use with `has_result == false`, where the capability is never called.
pub fn none<R>() -> impl FnMut(OperationStatus) -> Ready<gax::Result<Option<R>>> {
    |_: OperationStatus| ready(Ok(None))
}

/// Extracts the name of the resource created or modified by the operation.
///
/// Uses the `name` field of the operation response, if present. Otherwise uses
/// the `target` field of the operation metadata, which many services populate.
pub fn target_name(status: &OperationStatus) -> Option<&str> {
    let from_response = status
        .result()
        .and_then(|r| r.get("name"))
        .and_then(serde_json::Value::as_str);
    let from_metadata = || {
        status
            .metadata()
            .and_then(|m| m.get("target"))
            .and_then(serde_json::Value::as_str)
    };
    from_response.or_else(from_metadata).filter(|n| !n.is_empty())
}

/// Fetches the result for a successful operation, if the caller wants one.
pub(crate) async fn fetch_result<F, FF, R>(
    fetch: &mut F,
    status: OperationStatus,
    has_result: bool,
    reference: &OperationReference,
) -> Result<Option<R>>
where
    F: FnMut(OperationStatus) -> FF,
    FF: Future<Output = gax::Result<Option<R>>>,
{
    if !has_result {
        return Ok(None);
    }
    let operation = reference.relative_name();
    match fetch(status).await {
        Ok(Some(r)) => Ok(Some(r)),
        Ok(None) => Err(Error::MissingResult {
            operation,
            source: None,
        }),
        Err(e) if e.is_deserialization() => Err(Error::MissingResult {
            operation,
            source: Some(e),
        }),
        Err(source) => Err(Error::Transport { operation, source }),
    }
}
