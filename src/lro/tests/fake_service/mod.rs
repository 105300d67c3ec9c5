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

//! A fake operations service.
//!
//! The service returns a scripted sequence of responses for one operation,
//! and optionally serves the resource created by the operation.

use httptest::http::{Response, StatusCode};
use httptest::{Expectation, Server, matchers::*};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub struct ServerState {
    /// The path of the operation, e.g. `/v1/projects/p/locations/l/operations/o`.
    pub operation: String,
    /// The responses to `GET {operation}`, in order.
    pub poll: VecDeque<(StatusCode, String)>,
    /// The resources served by the fake, as `(path, body)` pairs.
    pub resources: Vec<(String, String)>,
}

pub fn start(initial_state: ServerState) -> (String, Server) {
    let num_poll = initial_state.poll.len() + 1;
    let operation = initial_state.operation.clone();
    let resources = initial_state.resources.clone();
    let state = Arc::new(Mutex::new(initial_state));
    let server = Server::run();

    let poll_state = Arc::clone(&state);
    server.expect(
        Expectation::matching(all_of![
            request::method("GET"),
            request::path(operation)
        ])
        .times(0..num_poll)
        .respond_with(move || {
            let mut state = poll_state.lock().expect("shared state is poisoned");
            let (status, body) = state.poll.pop_front().unwrap_or_else(|| {
                (StatusCode::BAD_REQUEST, "exhausted poll data".to_string())
            });
            Response::builder()
                .status(status)
                .body(body.into_bytes())
                .unwrap()
        }),
    );

    for (path, body) in resources {
        server.expect(
            Expectation::matching(all_of![request::method("GET"), request::path(path)])
                .times(0..2)
                .respond_with(move || {
                    Response::builder()
                        .status(StatusCode::OK)
                        .body(body.clone().into_bytes())
                        .unwrap()
                }),
        );
    }

    let endpoint = format!("http://{}", server.addr());
    (endpoint, server)
}
