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

use crate::error::Error;
use crate::policy::WaitPolicy;
use crate::progress::Progress;
use crate::reference::OperationReference;
use crate::status::{Operation, OperationStatus, State};
use crate::Result;
use gax::loop_state::LoopState;
use gax::polling_backoff_policy::PollingBackoffPolicy;
use gax::polling_error_policy::PollingErrorPolicy;
use gax::polling_state::PollingState;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// The result of polling a long-running operation once.
#[derive(Debug)]
pub enum PollingResult {
    /// The operation is still in progress.
    InProgress(OperationStatus),
    /// The operation completed, or the poller stopped waiting for it.
    ///
    /// This includes the final status on success, or the error that ended
    /// the loop.
    Completed(Result<OperationStatus>),
    /// An error trying to poll the operation.
    ///
    /// The error policy decided the error is transient, the next poll may
    /// succeed.
    PollingError(gax::error::Error),
}

/// Polls a long-running operation until it completes.
///
/// The poller calls `query` to read the status of the operation. The first
/// poll happens immediately, unless a pre-start delay is configured.
/// Subsequent polls are spaced by the backoff policy. Neither the sleeps nor
/// the polls themselves go past the deadline of the error policy.
pub struct Poller<Q> {
    query: Q,
    reference: Option<OperationReference>,
    error_policy: Arc<dyn PollingErrorPolicy>,
    backoff_policy: Arc<dyn PollingBackoffPolicy>,
    pre_start_delay: Duration,
    state: PollingState,
}

impl<Q, QF> Poller<Q>
where
    Q: FnMut(OperationReference) -> QF,
    QF: Future<Output = gax::Result<Operation>>,
{
    /// Creates a poller configured by `policy`.
    pub fn new(query: Q, reference: OperationReference, policy: &WaitPolicy) -> Self {
        Self::with_policies(
            query,
            reference,
            Arc::new(policy.error_policy()),
            Arc::new(policy.backoff_policy()),
        )
        .with_pre_start_delay(policy.pre_start_delay())
    }

    /// Creates a poller with custom loop-control policies.
    pub fn with_policies(
        query: Q,
        reference: OperationReference,
        error_policy: Arc<dyn PollingErrorPolicy>,
        backoff_policy: Arc<dyn PollingBackoffPolicy>,
    ) -> Self {
        Self {
            query,
            reference: Some(reference),
            error_policy,
            backoff_policy,
            pre_start_delay: Duration::ZERO,
            state: PollingState::default(),
        }
    }

    /// Delays the first poll in [until_done][Poller::until_done].
    ///
    /// The delay is clamped to the deadline of the error policy.
    pub fn with_pre_start_delay(mut self, delay: Duration) -> Self {
        self.pre_start_delay = delay;
        self
    }

    /// Polls the operation once.
    ///
    /// Returns `None` once the poller has returned a
    /// [Completed][PollingResult::Completed] result.
    pub async fn poll(&mut self) -> Option<PollingResult> {
        let reference = self.reference.take()?;
        let name = reference.relative_name();
        tracing::debug!(
            operation = %name,
            attempt = self.state.attempt_count,
            errors = self.state.error_count,
            "polling operation"
        );
        let query = (self.query)(reference.clone());
        let result = match self.error_policy.remaining_time(&self.state) {
            Some(remaining) => tokio::time::timeout(remaining, query).await,
            None => Ok(query.await),
        };
        let (reference, poll) = match result {
            Err(elapsed) => {
                tracing::warn!(operation = %name, "polling request did not complete before the deadline");
                let error = Error::OperationTimeout {
                    operation: name,
                    elapsed: self.state.elapsed(),
                    source: gax::error::Error::timeout(elapsed),
                };
                (None, PollingResult::Completed(Err(error)))
            }
            Ok(Err(e)) => {
                self.state.record_error();
                let flow = self.error_policy.on_error(&self.state, e);
                self::handle_polling_error(flow, reference, name)
            }
            Ok(Ok(o)) => {
                let status = OperationStatus::from(o);
                match status.state() {
                    State::Pending => {
                        self.state.record_in_progress();
                        let stop = self.error_policy.on_in_progress(&self.state, &name);
                        self::handle_in_progress(stop, &self.state, reference, name, status)
                    }
                    State::DoneSuccess | State::DoneError => {
                        self.state.record_done();
                        (None, self::handle_polling_done(name, status))
                    }
                }
            }
        };
        self.reference = reference;
        Some(poll)
    }

    /// The time to wait before the next poll.
    pub fn next_delay(&self) -> Duration {
        let delay = self.backoff_policy.wait_period(&self.state);
        match self.error_policy.remaining_time(&self.state) {
            Some(remaining) => std::cmp::min(delay, remaining),
            None => delay,
        }
    }

    /// Polls the operation until it completes, or the policies stop the loop.
    ///
    /// `progress` receives a tick for each poll that finds the operation in
    /// progress.
    pub async fn until_done(mut self, progress: &mut dyn Progress) -> Result<OperationStatus> {
        if !self.pre_start_delay.is_zero() {
            let delay = match self.error_policy.remaining_time(&self.state) {
                Some(remaining) => std::cmp::min(self.pre_start_delay, remaining),
                None => self.pre_start_delay,
            };
            tokio::time::sleep(delay).await;
        }
        while let Some(p) = self.poll().await {
            match p {
                // Return, the operation completed or the policies stopped the
                // loop.
                PollingResult::Completed(r) => return r,
                PollingResult::InProgress(status) => progress.tick(&status),
                // Continue, the error policy decided the error is transient.
                PollingResult::PollingError(_) => (),
            }
            tokio::time::sleep(self.next_delay()).await;
        }
        // `poll()` only returns `None` after it returned
        // `PollingResult::Completed`, and the loop returns on that branch.
        unreachable!("loop should exit via the `Completed` branch vs. this line");
    }
}

fn handle_polling_error(
    flow: LoopState,
    reference: OperationReference,
    operation: String,
) -> (Option<OperationReference>, PollingResult) {
    match flow {
        LoopState::Continue(e) => {
            tracing::warn!(%operation, error = %e, "transient error polling operation, retrying");
            (Some(reference), PollingResult::PollingError(e))
        }
        LoopState::Exhausted(source) | LoopState::Permanent(source) => {
            let error = Error::Transport { operation, source };
            (None, PollingResult::Completed(Err(error)))
        }
    }
}

fn handle_in_progress(
    stop: Option<gax::error::Error>,
    state: &PollingState,
    reference: OperationReference,
    operation: String,
    status: OperationStatus,
) -> (Option<OperationReference>, PollingResult) {
    match stop {
        None => (Some(reference), PollingResult::InProgress(status)),
        Some(source) if source.is_exhausted() => {
            let error = Error::OperationTimeout {
                operation,
                elapsed: state.elapsed(),
                source,
            };
            (None, PollingResult::Completed(Err(error)))
        }
        Some(source) => {
            let error = Error::Transport { operation, source };
            (None, PollingResult::Completed(Err(error)))
        }
    }
}

fn handle_polling_done(operation: String, status: OperationStatus) -> PollingResult {
    match status.error() {
        None => PollingResult::Completed(Ok(status)),
        Some(s) => PollingResult::Completed(Err(Error::Operation {
            operation,
            status: s.clone(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use crate::reference::Collection;
    use gax::error::rpc::{Code, Status};
    use std::collections::VecDeque;
    use std::future::{Ready, ready};
    use std::pin::Pin;
    use std::sync::Mutex;
    use tokio::time::Instant;

    type TestResult = anyhow::Result<()>;
    type Calls = Arc<Mutex<Vec<Instant>>>;
    type OperationFuture = Pin<Box<dyn Future<Output = gax::Result<Operation>>>>;

    const NAME: &str = "projects/p/locations/l/operations/o";

    mockall::mock! {
        #[derive(Debug)]
        Backoff {}
        impl PollingBackoffPolicy for Backoff {
            fn wait_period(&self, state: &PollingState) -> Duration;
        }
    }

    fn reference() -> anyhow::Result<OperationReference> {
        let collection = Collection::new("projects.locations.operations");
        Ok(OperationReference::parse(NAME, &collection, Some("v1"))?)
    }

    fn pending() -> gax::Result<Operation> {
        Ok(Operation::default().set_name(NAME))
    }

    fn success() -> gax::Result<Operation> {
        Ok(Operation::default()
            .set_name(NAME)
            .set_done(true)
            .set_response(serde_json::json!({"id": "x"})))
    }

    fn failed() -> gax::Result<Operation> {
        Ok(Operation::default().set_name(NAME).set_done(true).set_error(
            Status::default()
                .set_code(Code::FailedPrecondition)
                .set_message("the trigger already exists"),
        ))
    }

    fn unavailable() -> gax::Result<Operation> {
        Err(gax::error::Error::service(
            Status::default()
                .set_code(Code::Unavailable)
                .set_message("try again"),
        ))
    }

    fn permission_denied() -> gax::Result<Operation> {
        Err(gax::error::Error::service(
            Status::default()
                .set_code(Code::PermissionDenied)
                .set_message("denied"),
        ))
    }

    // Returns the responses in order, then reports the operation as pending
    // forever. Records the (paused) time of each call.
    fn fake_query(
        responses: Vec<gax::Result<Operation>>,
    ) -> (
        impl FnMut(OperationReference) -> Ready<gax::Result<Operation>>,
        Calls,
    ) {
        let calls = Calls::default();
        let recorder = calls.clone();
        let mut responses = VecDeque::from(responses);
        let query = move |r: OperationReference| {
            assert_eq!(r.relative_name(), NAME);
            recorder.lock().expect("mutex is poisoned").push(Instant::now());
            ready(responses.pop_front().unwrap_or_else(pending))
        };
        (query, calls)
    }

    fn intervals(calls: &Calls) -> Vec<Duration> {
        let calls = calls.lock().expect("mutex is poisoned");
        calls.windows(2).map(|w| w[1] - w[0]).collect()
    }

    fn assert_close(got: Duration, want: Duration) {
        let delta = if got > want { got - want } else { want - got };
        assert!(
            delta <= Duration::from_millis(2),
            "got={got:?}, want={want:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_success() -> TestResult {
        let (query, calls) = fake_query(vec![success()]);
        let start = Instant::now();
        let poller = Poller::new(query, reference()?, &WaitPolicy::default());
        let status = poller.until_done(&mut NoProgress).await?;
        assert_eq!(status.result(), Some(&serde_json::json!({"id": "x"})));
        assert_eq!(calls.lock().expect("mutex is poisoned").len(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_failure_without_sleep() -> TestResult {
        let (query, calls) = fake_query(vec![failed()]);
        let start = Instant::now();
        let poller = Poller::new(query, reference()?, &WaitPolicy::default());
        let err = poller.until_done(&mut NoProgress).await.unwrap_err();
        match &err {
            Error::Operation { operation, status } => {
                assert_eq!(operation, NAME);
                assert_eq!(status.code, Code::FailedPrecondition);
                assert_eq!(status.message, "the trigger already exists");
            }
            _ => panic!("unexpected error {err:?}"),
        }
        assert_eq!(calls.lock().expect("mutex is poisoned").len(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn pending_then_done() -> TestResult {
        let (query, calls) = fake_query(vec![pending(), pending(), pending(), success()]);
        let policy = WaitPolicy::builder()
            .with_initial_delay(Duration::from_secs(1))
            .with_backoff_multiplier(2.0)
            .build()?;
        let poller = Poller::new(query, reference()?, &policy);
        let status = poller.until_done(&mut NoProgress).await?;
        assert_eq!(status.state(), State::DoneSuccess);
        let got = intervals(&calls);
        assert_eq!(got.len(), 3, "{got:?}");
        for (got, want) in got.into_iter().zip([1, 2, 4]) {
            assert_close(got, Duration::from_secs(want));
        }
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_is_bounded_and_non_decreasing() -> TestResult {
        let mut responses = (0..12).map(|_| pending()).collect::<Vec<_>>();
        responses.push(success());
        let (query, calls) = fake_query(responses);
        let policy = WaitPolicy::builder()
            .with_initial_delay(Duration::from_secs(1))
            .with_backoff_ceiling(Duration::from_secs(10))
            .build()?;
        let poller = Poller::new(query, reference()?, &policy);
        poller.until_done(&mut NoProgress).await?;
        let got = intervals(&calls);
        assert_eq!(got.len(), 12, "{got:?}");
        for w in got.windows(2) {
            assert!(w[0] <= w[1] + Duration::from_millis(2), "{got:?}");
        }
        for i in &got {
            assert!(*i <= Duration::from_millis(10_001), "{got:?}");
        }
        assert_close(got[0], Duration::from_secs(1));
        assert_close(got[1], Duration::from_millis(1400));
        assert_close(got[11], Duration::from_secs(10));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn timeout() -> TestResult {
        let (query, calls) = fake_query(Vec::new());
        let policy = WaitPolicy::builder()
            .with_max_wait(Duration::from_secs(5))
            .with_initial_delay(Duration::from_secs(1))
            .build()?;
        let start = Instant::now();
        let poller = Poller::new(query, reference()?, &policy);
        let err = poller.until_done(&mut NoProgress).await.unwrap_err();
        let elapsed = start.elapsed();
        assert!(err.is_timeout(), "{err:?}");
        assert_eq!(err.operation(), Some(NAME));
        assert!(elapsed >= Duration::from_secs(5), "{elapsed:?}");
        assert!(elapsed <= Duration::from_secs(6), "{elapsed:?}");
        // Polls at 0, 1, 2.4, 4.36, and the last one clamped to the deadline.
        assert_eq!(calls.lock().expect("mutex is poisoned").len(), 5);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn zero_max_wait() -> TestResult {
        let (query, calls) = fake_query(Vec::new());
        let policy = WaitPolicy::builder().with_max_wait(Duration::ZERO).build()?;
        let poller = Poller::new(query, reference()?, &policy);
        let err = poller.until_done(&mut NoProgress).await.unwrap_err();
        assert!(err.is_timeout(), "{err:?}");
        assert_eq!(calls.lock().expect("mutex is poisoned").len(), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_retry_in_place() -> TestResult {
        let (query, calls) = fake_query(vec![
            pending(),
            unavailable(),
            unavailable(),
            pending(),
            success(),
        ]);
        let policy = WaitPolicy::builder()
            .with_initial_delay(Duration::from_secs(1))
            .with_backoff_multiplier(2.0)
            .build()?;
        let poller = Poller::new(query, reference()?, &policy);
        let status = poller.until_done(&mut NoProgress).await?;
        assert_eq!(status.state(), State::DoneSuccess);
        let got = intervals(&calls);
        assert_eq!(got.len(), 4, "{got:?}");
        // The failed polls do not advance the backoff.
        for (got, want) in got.into_iter().zip([1, 1, 1, 2]) {
            assert_close(got, Duration::from_secs(want));
        }
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_exhausted() -> TestResult {
        let (query, calls) = fake_query(vec![
            unavailable(),
            unavailable(),
            unavailable(),
            unavailable(),
            success(),
        ]);
        let poller = Poller::new(query, reference()?, &WaitPolicy::default());
        let err = poller.until_done(&mut NoProgress).await.unwrap_err();
        match &err {
            Error::Transport { operation, source } => {
                assert_eq!(operation, NAME);
                assert_eq!(source.status().map(|s| s.code), Some(Code::Unavailable));
            }
            _ => panic!("unexpected error {err:?}"),
        }
        // One poll and three retries.
        assert_eq!(calls.lock().expect("mutex is poisoned").len(), 4);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn success_resets_error_count() -> TestResult {
        let (query, calls) = fake_query(vec![
            unavailable(),
            unavailable(),
            pending(),
            unavailable(),
            unavailable(),
            success(),
        ]);
        let policy = WaitPolicy::builder()
            .with_transient_retries(2_u32)
            .build()?;
        let poller = Poller::new(query, reference()?, &policy);
        let status = poller.until_done(&mut NoProgress).await?;
        assert_eq!(status.state(), State::DoneSuccess);
        assert_eq!(calls.lock().expect("mutex is poisoned").len(), 6);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_error() -> TestResult {
        let (query, calls) = fake_query(vec![pending(), permission_denied(), success()]);
        let poller = Poller::new(query, reference()?, &WaitPolicy::default());
        let err = poller.until_done(&mut NoProgress).await.unwrap_err();
        assert!(matches!(err, Error::Transport { .. }), "{err:?}");
        assert_eq!(calls.lock().expect("mutex is poisoned").len(), 2);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn step_wise() -> TestResult {
        let (query, _calls) = fake_query(vec![pending(), unavailable(), failed()]);
        let mut poller = Poller::new(query, reference()?, &WaitPolicy::default());

        let p = poller.poll().await;
        match p {
            Some(PollingResult::InProgress(status)) => assert_eq!(status.name(), NAME),
            _ => panic!("unexpected result {p:?}"),
        }
        assert_eq!(poller.next_delay(), Duration::from_secs(2));

        let p = poller.poll().await;
        assert!(matches!(p, Some(PollingResult::PollingError(_))), "{p:?}");
        assert_eq!(poller.next_delay(), Duration::from_secs(2));

        let p = poller.poll().await;
        assert!(
            matches!(p, Some(PollingResult::Completed(Err(Error::Operation { .. })))),
            "{p:?}"
        );
        let p = poller.poll().await;
        assert!(p.is_none(), "{p:?}");
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn next_delay_clamped_to_deadline() -> TestResult {
        let (query, _calls) = fake_query(Vec::new());
        let policy = WaitPolicy::builder()
            .with_max_wait(Duration::from_secs(10))
            .build()?;
        let mut poller = Poller::new(query, reference()?, &policy);
        assert!(matches!(
            poller.poll().await,
            Some(PollingResult::InProgress(_))
        ));
        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(poller.next_delay(), Duration::from_secs(1));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn custom_backoff_policy() -> TestResult {
        let mut seq = mockall::Sequence::new();
        let mut backoff = MockBackoff::new();
        backoff
            .expect_wait_period()
            .once()
            .in_sequence(&mut seq)
            .withf(|s| s.attempt_count == 1)
            .return_const(Duration::from_millis(100));
        backoff
            .expect_wait_period()
            .once()
            .in_sequence(&mut seq)
            .withf(|s| s.attempt_count == 2)
            .return_const(Duration::from_millis(300));

        let (query, calls) = fake_query(vec![pending(), pending(), success()]);
        let error_policy = Arc::new(WaitPolicy::default().error_policy());
        let poller = Poller::with_policies(query, reference()?, error_policy, Arc::new(backoff));
        poller.until_done(&mut NoProgress).await?;
        let got = intervals(&calls);
        assert_eq!(got.len(), 2, "{got:?}");
        assert_close(got[0], Duration::from_millis(100));
        assert_close(got[1], Duration::from_millis(300));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_poll_stops_at_deadline() -> TestResult {
        let calls = Calls::default();
        let recorder = calls.clone();
        // The second poll never completes in any reasonable time.
        let query = move |_: OperationReference| -> OperationFuture {
            let mut calls = recorder.lock().expect("mutex is poisoned");
            calls.push(Instant::now());
            let stalled = calls.len() >= 2;
            Box::pin(async move {
                if stalled {
                    tokio::time::sleep(Duration::from_secs(600)).await;
                }
                pending()
            })
        };
        let policy = WaitPolicy::builder()
            .with_max_wait(Duration::from_secs(5))
            .with_initial_delay(Duration::from_secs(1))
            .build()?;
        let start = Instant::now();
        let poller = Poller::new(query, reference()?, &policy);
        let err = poller.until_done(&mut NoProgress).await.unwrap_err();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(5), "{elapsed:?}");
        assert!(elapsed <= Duration::from_secs(6), "{elapsed:?}");
        match &err {
            Error::OperationTimeout { operation, source, .. } => {
                assert_eq!(operation, NAME);
                assert!(source.is_timeout(), "{source:?}");
            }
            _ => panic!("unexpected error {err:?}"),
        }
        assert_eq!(calls.lock().expect("mutex is poisoned").len(), 2);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_past_deadline() -> TestResult {
        let (query, calls) = fake_query((0..10).map(|_| unavailable()).collect());
        let policy = WaitPolicy::builder()
            .with_max_wait(Duration::from_secs(3))
            .with_initial_delay(Duration::from_secs(1))
            .with_transient_retries(100_u32)
            .build()?;
        let start = Instant::now();
        let poller = Poller::new(query, reference()?, &policy);
        let err = poller.until_done(&mut NoProgress).await.unwrap_err();
        // The retry budget is not exhausted, the deadline is. The last error
        // is reported as a connectivity problem, not as a timeout.
        match &err {
            Error::Transport { source, .. } => {
                assert_eq!(source.status().map(|s| s.code), Some(Code::Unavailable));
            }
            _ => panic!("unexpected error {err:?}"),
        }
        assert!(!err.is_timeout(), "{err:?}");
        assert_close(start.elapsed(), Duration::from_secs(3));
        // Polls at 0, 1, 2, and 3.
        assert_eq!(calls.lock().expect("mutex is poisoned").len(), 4);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn pre_start_delay() -> TestResult {
        let (query, calls) = fake_query(vec![success()]);
        let policy = WaitPolicy::builder()
            .with_pre_start_delay(Duration::from_secs(3))
            .build()?;
        let start = Instant::now();
        let poller = Poller::new(query, reference()?, &policy);
        poller.until_done(&mut NoProgress).await?;
        let calls = calls.lock().expect("mutex is poisoned");
        assert_eq!(calls.len(), 1);
        assert_close(calls[0] - start, Duration::from_secs(3));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn pre_start_delay_clamped_to_deadline() -> TestResult {
        let (query, calls) = fake_query(Vec::new());
        let policy = WaitPolicy::builder()
            .with_max_wait(Duration::from_secs(5))
            .with_pre_start_delay(Duration::from_secs(60))
            .build()?;
        let start = Instant::now();
        let poller = Poller::new(query, reference()?, &policy);
        let err = poller.until_done(&mut NoProgress).await.unwrap_err();
        assert!(err.is_timeout(), "{err:?}");
        assert_close(start.elapsed(), Duration::from_secs(5));
        assert_eq!(calls.lock().expect("mutex is poisoned").len(), 1);
        Ok(())
    }
}
