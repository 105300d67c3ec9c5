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

use cloudsdk_lro::Operation;
use gax::error::rpc::{Code, Status};
use httptest::http::StatusCode;
use serde_json::json;

type Result<T> = anyhow::Result<T>;

pub fn pending(name: impl Into<String>, percent: u32) -> Result<(StatusCode, String)> {
    let operation = Operation::default()
        .set_name(name)
        .set_metadata(json!({"percent": percent}));
    let payload = serde_json::to_string(&operation)?;
    Ok((StatusCode::OK, payload))
}

pub fn success(
    name: impl Into<String>,
    response: serde_json::Value,
) -> Result<(StatusCode, String)> {
    let operation = Operation::default()
        .set_name(name)
        .set_done(true)
        .set_metadata(json!({"percent": 100}))
        .set_response(response);
    let payload = serde_json::to_string(&operation)?;
    Ok((StatusCode::OK, payload))
}

pub fn operation_error(name: impl Into<String>, code: i32) -> Result<(StatusCode, String)> {
    let error = Status::default()
        .set_code(code)
        .set_message("the resource is not in the expected state");
    let operation = Operation::default()
        .set_name(name)
        .set_done(true)
        .set_error(error);
    let payload = serde_json::to_string(&operation)?;
    Ok((StatusCode::OK, payload))
}

pub fn service_error(status: StatusCode, code: Code) -> (StatusCode, String) {
    let body = json!({"error": {
        "code": status.as_u16(),
        "message": format!("the service reports {}", code.name()),
        "status": code.name(),
    }});
    (status, body.to_string())
}
