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

//! The operation state machine.

use crate::headers;
use crate::status::OperationStatus;
use crate::strategy::{FinalStateVia, PollStrategyKind};
use gax::Result;
use gax::error::{Error, HttpError};
use gax::http_client::{HttpRequest, HttpResponse};
use http::Method;
use std::time::Duration;

/// The state of one polling session.
///
/// The strategy and the initiating method never change. The status only
/// moves forward: `NotStarted`, then `InProgress`, then one of the terminal
/// statuses, where it stays.
#[derive(Clone, Debug)]
pub struct PollerState {
    strategy: PollStrategyKind,
    poll_url: String,
    method: Method,
    status: OperationStatus,
    last_response: Option<HttpResponse>,
    final_get_url: Option<String>,
    final_state_via: Option<FinalStateVia>,
    retry_after: Option<Duration>,
    transport_failed: bool,
}

impl PollerState {
    pub(crate) fn new(
        strategy: PollStrategyKind,
        method: Method,
        poll_url: String,
        status: OperationStatus,
    ) -> Self {
        Self {
            strategy,
            poll_url,
            method,
            status,
            last_response: None,
            final_get_url: None,
            final_state_via: None,
            retry_after: None,
            transport_failed: false,
        }
    }

    pub(crate) fn with_final_state_via(mut self, v: Option<FinalStateVia>) -> Self {
        self.final_state_via = v;
        self
    }

    pub(crate) fn with_final_get_url(mut self, v: Option<String>) -> Self {
        self.final_get_url = v;
        self
    }

    pub(crate) fn with_last_response(mut self, response: HttpResponse) -> Self {
        self.retry_after = headers::retry_after(&response.headers);
        self.last_response = Some(response);
        self
    }

    /// The convention used to track this operation.
    pub fn strategy(&self) -> PollStrategyKind {
        self.strategy
    }

    /// The next URL to poll. Empty for [PassThrough][PollStrategyKind::PassThrough].
    pub fn poll_url(&self) -> &str {
        &self.poll_url
    }

    /// The method of the request that started the operation.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The last observed status.
    pub fn status(&self) -> OperationStatus {
        self.status
    }

    /// The most recent response, from a poll or the initiating request.
    pub fn last_response(&self) -> Option<&HttpResponse> {
        self.last_response.as_ref()
    }

    /// Where the final result is fetched from, if not from the last response.
    pub fn final_get_url(&self) -> Option<&str> {
        self.final_get_url.as_deref()
    }

    /// How the final result of an async-operation is located.
    pub fn final_state_via(&self) -> Option<FinalStateVia> {
        self.final_state_via
    }

    /// The delay requested by the most recent response.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    pub(crate) fn transport_failed(&self) -> bool {
        self.transport_failed
    }

    pub(crate) fn poll_request(&self) -> Option<HttpRequest> {
        self.strategy.build_poll_request(self)
    }

    /// Moves to `next`, unless the status is already terminal.
    pub(crate) fn advance(&mut self, next: OperationStatus) {
        if self.status.is_terminal() || self.status == next {
            return;
        }
        tracing::debug!(
            from = %self.status,
            to = %next,
            url = %self.poll_url,
            "operation status changed"
        );
        self.status = next;
    }

    /// Applies a poll response.
    ///
    /// Unsuccessful responses fail the operation, the service state cannot
    /// be trusted once the tracking endpoint itself fails. Responses that
    /// cannot be interpreted leave the state untouched, except that any
    /// pending `Retry-After` hint is dropped.
    pub(crate) fn on_poll_response(&mut self, response: HttpResponse) -> Result<OperationStatus> {
        if self.status.is_terminal() {
            return Ok(self.status);
        }
        if !response.is_success() {
            let error = Error::http(HttpError::from(&response));
            self.retry_after = None;
            self.last_response = Some(response);
            self.advance(OperationStatus::Failed);
            return Err(error);
        }
        let outcome = match self.strategy.interpret(self, &response) {
            Ok(o) => o,
            Err(e) => {
                // The hint from an earlier response no longer applies.
                self.retry_after = None;
                return Err(e);
            }
        };
        if let Some(url) = outcome.poll_url {
            tracing::debug!(from = %self.poll_url, to = %url, "poll URL changed");
            self.poll_url = url;
        }
        if let Some(url) = outcome.final_get_url {
            self.final_get_url = Some(url);
        }
        self.retry_after = headers::retry_after(&response.headers);
        self.last_response = Some(response);
        self.advance(outcome.status);
        Ok(self.status)
    }

    /// Records a poll that the transport could not complete.
    pub(crate) fn on_transport_error(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.transport_failed = true;
        self.retry_after = None;
        self.advance(OperationStatus::Failed);
    }
}
