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

use crate::Result;
use crate::fetcher;
use crate::poller::Poller;
use crate::policy::WaitPolicy;
use crate::progress::{NoProgress, Outcome, Progress};
use crate::reference::OperationReference;
use crate::status::{Operation, OperationStatus};
use std::future::Future;

/// Waits for long-running operations.
///
/// The waiter is parameterized by two capabilities:
/// * `query` reads the status of the operation, typically by calling the
///   `GetOperation` RPC of the service.
/// * `fetch` produces the final resource once the operation completes
///   successfully, see [fetcher][crate::fetcher] for common implementations.
///
/// # Example
/// ```
/// # use cloudsdk_lro::*;
/// # async fn sample() -> Result<()> {
/// let collection = Collection::new("eventarc.projects.locations.operations");
/// let reference = OperationReference::parse(
///     "projects/p/locations/l/operations/o", &collection, Some("v1"))?;
/// let query = |r: OperationReference| async move {
///     // Call the service, e.g. `GET https://eventarc.googleapis.com/v1/{name}`.
///     Ok::<_, gax::error::Error>(Operation::default().set_name(r.relative_name()).set_done(true))
/// };
/// let policy = WaitPolicy::builder()
///     .with_max_wait(std::time::Duration::from_secs(600))
///     .build()
///     .expect("valid policy");
/// let trigger = Waiter::new(query, fetcher::embedded::<serde_json::Value>())
///     .with_policy(policy)
///     .with_progress(progress::Tracker::stderr())
///     .wait_for(&reference, "Creating trigger", true)
///     .await?;
/// println!("{trigger:?}");
/// # Ok(()) }
/// ```
pub struct Waiter<Q, F> {
    query: Q,
    fetch: F,
    policy: WaitPolicy,
    progress: Box<dyn Progress>,
}

impl<Q, F> Waiter<Q, F> {
    /// Creates a waiter with the default policy and no progress output.
    pub fn new(query: Q, fetch: F) -> Self {
        Self {
            query,
            fetch,
            policy: WaitPolicy::default(),
            progress: Box::new(NoProgress),
        }
    }

    pub fn with_policy(mut self, policy: WaitPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_progress<P: Progress + 'static>(mut self, progress: P) -> Self {
        self.progress = Box::new(progress);
        self
    }

    /// Waits for the operation to complete.
    ///
    /// Returns the final resource if `has_result` is true, and `None`
    /// otherwise. The `message` is displayed by the progress sink while
    /// waiting.
    pub async fn wait_for<QF, FF, R>(
        &mut self,
        reference: &OperationReference,
        message: &str,
        has_result: bool,
    ) -> Result<Option<R>>
    where
        Q: FnMut(OperationReference) -> QF,
        QF: Future<Output = gax::Result<Operation>>,
        F: FnMut(OperationStatus) -> FF,
        FF: Future<Output = gax::Result<Option<R>>>,
    {
        let start = tokio::time::Instant::now();
        tracing::debug!(operation = %reference, has_result, "waiting for operation");
        self.progress.start(message, reference);
        let poller = Poller::new(&mut self.query, reference.clone(), &self.policy);
        let result = match poller.until_done(self.progress.as_mut()).await {
            Ok(status) => {
                fetcher::fetch_result(&mut self.fetch, status, has_result, reference).await
            }
            Err(e) => Err(e),
        };
        let outcome = match &result {
            Ok(_) => Outcome::Done,
            Err(e) => Outcome::from(e),
        };
        self.progress.finish(outcome);
        tracing::info!(
            operation = %reference,
            ?outcome,
            elapsed = ?start.elapsed(),
            "finished waiting for operation"
        );
        result
    }
}

/// Waits for an operation with the default policy and no progress output.
pub async fn wait_for<Q, QF, F, FF, R>(
    query: Q,
    fetch: F,
    reference: &OperationReference,
    message: &str,
    has_result: bool,
) -> Result<Option<R>>
where
    Q: FnMut(OperationReference) -> QF,
    QF: Future<Output = gax::Result<Operation>>,
    F: FnMut(OperationStatus) -> FF,
    FF: Future<Output = gax::Result<Option<R>>>,
{
    Waiter::new(query, fetch)
        .wait_for(reference, message, has_result)
        .await
}
