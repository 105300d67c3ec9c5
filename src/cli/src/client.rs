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

use gaxi::http::{BuilderError, ReqwestClient};
use gaxi::options::ClientConfig;
use lro::{Operation, OperationReference};

/// Reads operations and resources from a Cloud API over JSON/HTTP.
///
/// The waiter receives this client through the `query` and `fetch` closures.
#[derive(Clone, Debug)]
pub struct OperationsClient {
    inner: ReqwestClient,
    api_version: String,
}

impl OperationsClient {
    pub fn new<V: Into<String>>(config: ClientConfig, api_version: V) -> Result<Self, BuilderError> {
        Ok(Self {
            inner: ReqwestClient::new(config)?,
            api_version: api_version.into(),
        })
    }

    /// Returns the current state of the operation.
    ///
    /// The API version recorded in the reference, if any, takes precedence
    /// over the configured one.
    pub async fn get_operation(&self, reference: OperationReference) -> gax::Result<Operation> {
        let version = reference.api_version().unwrap_or(self.api_version.as_str());
        self.inner
            .get::<Operation>(format!("/{version}/{}", reference.relative_name()))
            .await
    }

    /// Returns the resource with the given relative name.
    pub async fn get_resource(&self, name: &str) -> gax::Result<serde_json::Value> {
        self.inner
            .get::<serde_json::Value>(format!("/{}/{name}", self.api_version))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httptest::{Expectation, Server, matchers::*, responders::*};
    use lro::Collection;
    use serde_json::json;

    type TestResult = anyhow::Result<()>;

    const OP: &str = "projects/p/locations/l/operations/o";

    fn client(server: &Server) -> anyhow::Result<OperationsClient> {
        let config = ClientConfig::new()
            .with_endpoint(format!("http://{}", server.addr()))
            .with_access_token("test-only-token");
        Ok(OperationsClient::new(config, "v1")?)
    }

    #[tokio::test]
    async fn get_operation() -> TestResult {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", format!("/v1/{OP}")),
                request::headers(contains(("authorization", "Bearer test-only-token"))),
            ])
            .respond_with(json_encoded(json!({"name": OP, "done": true}))),
        );
        let client = client(&server)?;
        let collection = Collection::new("projects.locations.operations");
        let reference = OperationReference::parse(OP, &collection, Some("v1"))?;
        let operation = client.get_operation(reference).await?;
        assert_eq!(operation.name, OP);
        assert!(operation.done);
        Ok(())
    }

    #[tokio::test]
    async fn get_operation_uses_uri_version() -> TestResult {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", format!("/v2/{OP}")))
                .respond_with(json_encoded(json!({"name": OP}))),
        );
        let client = client(&server)?;
        let collection = Collection::new("projects.locations.operations");
        let uri = format!("https://eventarc.googleapis.com/v2/{OP}");
        let reference = OperationReference::parse(&uri, &collection, Some("v2"))?;
        let operation = client.get_operation(reference).await?;
        assert!(!operation.done);
        Ok(())
    }

    #[tokio::test]
    async fn get_resource() -> TestResult {
        const TRIGGER: &str = "projects/p/locations/l/triggers/t";
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", format!("/v1/{TRIGGER}")))
                .respond_with(json_encoded(json!({"name": TRIGGER}))),
        );
        let client = client(&server)?;
        let resource = client.get_resource(TRIGGER).await?;
        assert_eq!(resource, json!({"name": TRIGGER}));
        Ok(())
    }

    #[test]
    fn missing_endpoint() {
        let err = OperationsClient::new(ClientConfig::new(), "v1").unwrap_err();
        assert!(matches!(err, BuilderError::MissingEndpoint), "{err:?}");
    }
}
