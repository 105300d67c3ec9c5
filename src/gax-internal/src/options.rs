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

use std::time::Duration;

/// The client configuration for [crate::http::ReqwestClient].
#[derive(Clone, Debug, Default)]
pub struct ClientConfig {
    pub endpoint: Option<String>,
    pub access_token: Option<String>,
    pub user_agent: Option<String>,
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint<V: Into<String>>(mut self, v: V) -> Self {
        self.endpoint = Some(v.into());
        self
    }

    /// Sends `Authorization: Bearer {v}` with every request.
    pub fn with_access_token<V: Into<String>>(mut self, v: V) -> Self {
        self.access_token = Some(v.into());
        self
    }

    pub fn with_user_agent<V: Into<String>>(mut self, v: V) -> Self {
        self.user_agent = Some(v.into());
        self
    }

    /// The timeout for each request, including the time to read the body.
    pub fn with_timeout<V: Into<Duration>>(mut self, v: V) -> Self {
        self.timeout = Some(v.into());
        self
    }
}

/// The user agent sent when the configuration does not set one.
pub(crate) fn default_user_agent() -> String {
    format!("cloudsdk-gax-internal/{}", env!("CARGO_PKG_VERSION"))
}
