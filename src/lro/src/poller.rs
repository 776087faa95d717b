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

use crate::decoder::{Decoder, Json};
use crate::detector::detect;
use crate::result::extract;
use crate::resume_token::ResumeToken;
use crate::state::PollerState;
use crate::status::OperationStatus;
use crate::strategy::FinalStateVia;
use gax::Result;
use gax::error::Error;
use gax::http_client::{HttpRequest, HttpResponse, Transport};
use gax::loop_state::LoopState;
use gax::polling_error_policy::{PollingErrorPolicy, PollingErrorPolicyArg};
use gax::polling_state::PollingState;
use gax::response::Response;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// The label used for operations when the application does not set one.
pub const DEFAULT_OPERATION: &str = "lro";

/// The result of a single [Poller::poll] step.
#[derive(Debug)]
pub enum PollingResult<T> {
    /// The operation is still in progress.
    InProgress,
    /// The operation completed. This includes the result.
    Completed(Result<Response<T>>),
    /// An error trying to poll the operation.
    ///
    /// The [PollingErrorPolicy] decided the error may go away in a future
    /// poll, for example, a poll response that could not be interpreted.
    /// Errors the policy considers permanent are reported as
    /// [Completed][PollingResult::Completed].
    PollingError(Error),
}

/// Configures and creates a [Poller].
///
/// # Example
/// ```
/// # use lro_poller::{Poller, PollerBuilder};
/// # use gax::http_client::{HttpRequest, HttpResponse, Transport};
/// # use std::sync::Arc;
/// # async fn sample(transport: Arc<dyn Transport>) -> anyhow::Result<()> {
/// let request = HttpRequest::new(http::Method::DELETE, "https://example.com/resources/1");
/// let response = transport.send(request.clone()).await?;
/// let mut poller: Poller<()> = PollerBuilder::new(transport)
///     .with_operation("resources.delete")
///     .begin(&request, response)?;
/// let cancel = tokio_util::sync::CancellationToken::new();
/// poller.until_done(std::time::Duration::from_secs(5), &cancel).await?;
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct PollerBuilder<D = Json> {
    transport: Arc<dyn Transport>,
    operation: String,
    final_state_via: Option<FinalStateVia>,
    error_policy: Arc<dyn PollingErrorPolicy>,
    decoder: D,
}

impl PollerBuilder {
    /// Creates a builder sending polls through `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            operation: DEFAULT_OPERATION.to_string(),
            final_state_via: None,
            error_policy: Arc::new(gax::polling_error_policy::default_policy()),
            decoder: Json,
        }
    }
}

impl<D> PollerBuilder<D> {
    /// Sets the label identifying the kind of operation.
    ///
    /// Resume tokens record this label, resuming a token under a different
    /// label fails.
    pub fn with_operation<V: Into<String>>(mut self, v: V) -> Self {
        self.operation = v.into();
        self
    }

    /// Sets where the final result of async-operation tracked operations is
    /// found.
    ///
    /// Resumed pollers use the value recorded in the resume token.
    pub fn with_final_state_via(mut self, v: FinalStateVia) -> Self {
        self.final_state_via = Some(v);
        self
    }

    /// Sets the policy deciding which polling errors are transient.
    ///
    /// # Example
    /// ```
    /// # use lro_poller::PollerBuilder;
    /// # use gax::http_client::Transport;
    /// # use std::sync::Arc;
    /// use gax::polling_error_policy::*;
    /// use std::time::Duration;
    /// # fn sample(transport: Arc<dyn Transport>) -> PollerBuilder {
    /// PollerBuilder::new(transport).with_polling_error_policy(
    ///     TransientMalformed
    ///         .with_malformed_limit(5)
    ///         .with_time_limit(Duration::from_secs(600)),
    /// )
    /// # }
    /// ```
    pub fn with_polling_error_policy<V: Into<PollingErrorPolicyArg>>(mut self, v: V) -> Self {
        self.error_policy = v.into().0;
        self
    }

    /// Sets the decoder for the final result.
    pub fn with_decoder<D2>(self, decoder: D2) -> PollerBuilder<D2> {
        PollerBuilder {
            transport: self.transport,
            operation: self.operation,
            final_state_via: self.final_state_via,
            error_policy: self.error_policy,
            decoder,
        }
    }

    /// Creates a poller from the request that started an operation and its
    /// response.
    ///
    /// Fails with an [unrecognized shape][Error::is_unrecognized_shape] error
    /// if the response does not follow any polling convention.
    pub fn begin<T>(self, request: &HttpRequest, response: HttpResponse) -> Result<Poller<T>>
    where
        D: Decoder<T> + 'static,
    {
        let state = detect(request, response, self.final_state_via)?;
        Ok(self.build(state))
    }

    /// Creates a poller from a [ResumeToken].
    ///
    /// The new poller has no status until it polls again. Fails if the token
    /// was created for a different operation label.
    pub fn resume<T>(self, token: &ResumeToken) -> Result<Poller<T>>
    where
        D: Decoder<T> + 'static,
    {
        let state = token.decode(&self.operation)?;
        tracing::debug!(
            operation = %self.operation,
            strategy = ?state.strategy(),
            poll_url = %state.poll_url(),
            "resuming poller"
        );
        Ok(self.build(state))
    }

    fn build<T>(self, state: PollerState) -> Poller<T>
    where
        D: Decoder<T> + 'static,
    {
        Poller {
            operation: self.operation,
            state,
            transport: self.transport,
            error_policy: self.error_policy,
            decoder: Arc::new(self.decoder),
            polling: PollingState::new(),
            done: false,
        }
    }
}

/// Waits for a long-running operation.
///
/// A poller exclusively owns the state of one operation. Applications may run
/// many pollers concurrently, they share nothing but the transport.
#[derive(Debug)]
pub struct Poller<T> {
    operation: String,
    state: PollerState,
    transport: Arc<dyn Transport>,
    error_policy: Arc<dyn PollingErrorPolicy>,
    decoder: Arc<dyn Decoder<T>>,
    polling: PollingState,
    done: bool,
}

impl<T> Poller<T> {
    /// The label identifying the kind of operation.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// The state of the operation, as of the last poll.
    pub fn state(&self) -> &PollerState {
        &self.state
    }

    /// The status of the operation, as of the last poll.
    pub fn status(&self) -> OperationStatus {
        self.state.status()
    }

    /// Returns true once the operation reached a terminal status.
    pub fn done(&self) -> bool {
        self.state.status().is_terminal()
    }

    /// Snapshots the poller so polling can continue elsewhere.
    ///
    /// Operations that completed with the initiating response, or whose
    /// terminal status was already observed, are not resumable.
    pub fn resume_token(&self) -> Result<ResumeToken> {
        ResumeToken::encode(&self.operation, &self.state)
    }

    /// Sends one poll, unless the operation already reached a terminal
    /// status.
    ///
    /// Returns the status after the poll. Errors leave the status unchanged,
    /// except for transport failures and unsuccessful poll responses, which
    /// fail the operation.
    pub async fn poll_once(&mut self) -> Result<OperationStatus> {
        let status = self.state.status();
        if status.is_terminal() {
            return Ok(status);
        }
        let Some(request) = self.state.poll_request() else {
            return Ok(status);
        };
        self.polling.on_attempt();
        tracing::debug!(
            operation = %self.operation,
            attempt = self.polling.attempt_count,
            url = %request.url,
            "polling operation"
        );
        let response = match self.transport.send(request).await {
            Ok(r) => r,
            Err(e) => {
                self.state.on_transport_error();
                return Err(e);
            }
        };
        match self.state.on_poll_response(response) {
            Ok(status) => {
                self.polling.on_wellformed();
                if status.is_terminal() {
                    tracing::info!(
                        operation = %self.operation,
                        %status,
                        attempts = self.polling.attempt_count,
                        "operation completed"
                    );
                }
                Ok(status)
            }
            Err(e) if e.is_malformed() => {
                self.polling.on_malformed();
                tracing::warn!(
                    operation = %self.operation,
                    malformed_count = self.polling.malformed_count,
                    "ignoring poll response: {e}"
                );
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// The final result of a completed operation.
    ///
    /// Successful operations may need one more request to fetch the result.
    pub async fn final_result(&self) -> Result<Response<T>> {
        extract(&self.state, self.transport.as_ref(), self.decoder.as_ref()).await
    }

    /// Polls the operation once and applies the polling error policy.
    ///
    /// Returns `None` after the poller returned
    /// [Completed][PollingResult::Completed].
    pub async fn poll(&mut self) -> Option<PollingResult<T>> {
        if self.done {
            return None;
        }
        let result = self.step().await;
        if matches!(result, PollingResult::Completed(_)) {
            self.done = true;
        }
        Some(result)
    }

    async fn step(&mut self) -> PollingResult<T> {
        if self.state.status().is_terminal() {
            return PollingResult::Completed(self.final_result().await);
        }
        match self.poll_once().await {
            Ok(status) if status.is_terminal() => {
                PollingResult::Completed(self.final_result().await)
            }
            Ok(_) => match self
                .error_policy
                .on_in_progress(&self.polling, &self.operation)
            {
                Some(e) => PollingResult::Completed(Err(e)),
                None => PollingResult::InProgress,
            },
            // Transport failures and unsuccessful polls fail the operation,
            // there is nothing the policy can recover.
            Err(e) if self.state.status().is_terminal() => PollingResult::Completed(Err(e)),
            Err(e) => match self.error_policy.on_error(&self.polling, e) {
                LoopState::Continue(e) => PollingResult::PollingError(e),
                flow => PollingResult::Completed(Err(flow.into_error())),
            },
        }
    }

    /// Polls until the operation completes, returning its final result.
    ///
    /// Sleeps `frequency` between polls, unless the last poll response asked
    /// for a different delay with a `Retry-After` header. A `Retry-After` on
    /// the initiating response delays the first poll. Both the polls and
    /// the sleeps stop as soon as `cancel` is canceled. A canceled poller
    /// keeps the state of its last completed poll, so it can be resumed.
    pub async fn until_done(
        &mut self,
        frequency: Duration,
        cancel: &CancellationToken,
    ) -> Result<Response<T>> {
        if self.polling.attempt_count == 0 && !self.state.status().is_terminal() {
            if let Some(delay) = self.state.retry_after() {
                tracing::debug!(
                    operation = %self.operation,
                    ?delay,
                    "waiting before the first poll"
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(canceled()),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
        loop {
            if cancel.is_cancelled() {
                return Err(canceled());
            }
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(canceled()),
                r = self.poll() => r,
            };
            match result {
                Some(PollingResult::Completed(r)) => return r,
                Some(PollingResult::InProgress) | Some(PollingResult::PollingError(_)) => {}
                None => {
                    return Err(Error::other(
                        "the poller already returned the final result",
                    ));
                }
            }
            let delay = self.state.retry_after().unwrap_or(frequency);
            tracing::debug!(operation = %self.operation, ?delay, "waiting before the next poll");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(canceled()),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Converts the poller into a [futures::Stream] of [PollingResult]s.
    ///
    /// The stream polls once per item and ends after the
    /// [Completed][PollingResult::Completed] item. The application controls
    /// the pace by how often it reads from the stream.
    #[cfg(feature = "unstable-stream")]
    pub fn into_stream(self) -> impl futures::Stream<Item = PollingResult<T>> + Unpin {
        use futures::stream::unfold;
        Box::pin(unfold(self, |mut poller| async move {
            poller.poll().await.map(|r| (r, poller))
        }))
    }
}

fn canceled() -> Error {
    Error::canceled("the application stopped waiting for the operation")
}
