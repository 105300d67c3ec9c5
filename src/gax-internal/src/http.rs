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

use crate::options::ClientConfig;
use gax::Result;
use gax::error::Error;
use reqwest::header::{AUTHORIZATION, HeaderValue, USER_AGENT};

/// Errors creating a [ReqwestClient].
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum BuilderError {
    #[error("missing endpoint, the client configuration must include one")]
    MissingEndpoint,
    #[error("the endpoint ({0}) must be an http:// or https:// URL")]
    InvalidEndpoint(String),
    #[error("the access token is not a valid HTTP header value")]
    InvalidAccessToken(#[source] reqwest::header::InvalidHeaderValue),
    #[error("the user agent is not a valid HTTP header value")]
    InvalidUserAgent(#[source] reqwest::header::InvalidHeaderValue),
    #[error("cannot create the HTTP client")]
    Transport(#[source] reqwest::Error),
}

/// A JSON-over-HTTP client for Cloud APIs.
///
/// The client is cheap to clone, clones share the connection pool.
#[derive(Clone, Debug)]
pub struct ReqwestClient {
    inner: reqwest::Client,
    endpoint: String,
    authorization: Option<HeaderValue>,
    user_agent: HeaderValue,
    timeout: Option<std::time::Duration>,
}

impl ReqwestClient {
    pub fn new(config: ClientConfig) -> std::result::Result<Self, BuilderError> {
        let endpoint = config.endpoint.ok_or(BuilderError::MissingEndpoint)?;
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(BuilderError::InvalidEndpoint(endpoint));
        }
        let endpoint = endpoint.trim_end_matches('/').to_string();
        let authorization = config
            .access_token
            .map(|t| {
                let mut value = HeaderValue::from_str(&format!("Bearer {t}"))
                    .map_err(BuilderError::InvalidAccessToken)?;
                value.set_sensitive(true);
                Ok(value)
            })
            .transpose()?;
        let user_agent = config
            .user_agent
            .unwrap_or_else(crate::options::default_user_agent);
        let user_agent =
            HeaderValue::from_str(&user_agent).map_err(BuilderError::InvalidUserAgent)?;
        let inner = reqwest::Client::builder()
            .build()
            .map_err(BuilderError::Transport)?;
        Ok(Self {
            inner,
            endpoint,
            authorization,
            user_agent,
            timeout: config.timeout,
        })
    }

    pub fn builder(&self, method: reqwest::Method, path: String) -> reqwest::RequestBuilder {
        self.inner
            .request(method, format!("{}{path}", &self.endpoint))
    }

    /// Sends `GET {endpoint}{path}` and parses the response as `O`.
    pub async fn get<O: serde::de::DeserializeOwned + Default>(&self, path: String) -> Result<O> {
        let builder = self.builder(reqwest::Method::GET, path);
        self.execute(builder).await
    }

    pub async fn execute<O: serde::de::DeserializeOwned + Default>(
        &self,
        mut builder: reqwest::RequestBuilder,
    ) -> Result<O> {
        builder = builder.header(USER_AGENT, self.user_agent.clone());
        if let Some(value) = &self.authorization {
            builder = builder.header(AUTHORIZATION, value.clone());
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let response = builder.send().await.map_err(Self::map_send_error)?;
        tracing::debug!(
            status = response.status().as_u16(),
            url = %response.url(),
            "received HTTP response"
        );
        if !response.status().is_success() {
            return self::to_http_error(response).await;
        }
        self::to_http_response(response).await
    }

    fn map_send_error(err: reqwest::Error) -> Error {
        match err {
            e if e.is_timeout() => Error::timeout(e),
            e => Error::io(e),
        }
    }
}

pub async fn to_http_error<O>(response: reqwest::Response) -> Result<O> {
    let status_code = response.status().as_u16();
    let headers = response.headers().clone();
    let body = response.bytes().await.map_err(Error::io)?;

    let error = match gax::error::rpc::Status::try_from(&body) {
        Ok(status) => Error::service_with_http_metadata(status, Some(status_code), Some(headers)),
        Err(_) => Error::http(status_code, headers, body),
    };
    Err(error)
}

async fn to_http_response<O: serde::de::DeserializeOwned + Default>(
    response: reqwest::Response,
) -> Result<O> {
    // 204 No Content has no body and throws EOF error if we try to parse with serde::json
    let no_content_status = response.status() == reqwest::StatusCode::NO_CONTENT;
    let body = response.bytes().await.map_err(Error::io)?;

    match body {
        content if (content.is_empty() && no_content_status) => Ok(O::default()),
        content => serde_json::from_slice::<O>(&content).map_err(Error::deser),
    }
}
