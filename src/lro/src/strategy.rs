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

//! The polling conventions and how each one builds and reads polls.
//!
//! The set of conventions is closed, so they are a plain enum dispatched with
//! `match`. Each convention only differs in how it builds the next poll
//! request and how it interprets a successful poll response.

use crate::headers;
use crate::state::PollerState;
use crate::status::OperationStatus;
use bytes::Bytes;
use gax::Result;
use gax::error::Error;
use gax::http_client::{HttpRequest, HttpResponse};
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The convention used by the service to report the operation progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PollStrategyKind {
    /// The initiating response carries a tracking URL in the
    /// `Azure-AsyncOperation` or `Operation-Location` header. The document at
    /// that URL has a `status` field.
    AsyncOperationHeader,
    /// The initiating response carries a `Location` header. Polling that URL
    /// returns `202 Accepted` until the operation completes.
    LocationHeader,
    /// The resource itself has a `provisioningState` field, updated in place.
    /// The poller re-reads the resource at the initiating URL.
    ProvisioningState,
    /// The operation completed within the initiating response.
    PassThrough,
}

/// Where the final result of an [AsyncOperationHeader] operation lives.
///
/// [AsyncOperationHeader]: PollStrategyKind::AsyncOperationHeader
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinalStateVia {
    /// The result is the async-operation status document, no final GET.
    AzureAsyncOperation,
    /// Fetch the result from the most recent `Location` header, if any.
    Location,
    /// Fetch the result from the initiating URL.
    OriginalUri,
}

impl FinalStateVia {
    /// The convention used when the application does not choose one.
    pub(crate) fn default_for(method: &Method) -> Self {
        match *method {
            Method::PUT | Method::PATCH => Self::OriginalUri,
            Method::DELETE => Self::AzureAsyncOperation,
            _ => Self::Location,
        }
    }
}

/// The result of interpreting one successful poll response.
#[derive(Debug, PartialEq)]
pub(crate) struct PollOutcome {
    pub status: OperationStatus,
    pub poll_url: Option<String>,
    pub final_get_url: Option<String>,
}

impl PollOutcome {
    fn status(status: OperationStatus) -> Self {
        Self {
            status,
            poll_url: None,
            final_get_url: None,
        }
    }
}

impl PollStrategyKind {
    /// The next poll request, `None` if this convention never polls.
    pub(crate) fn build_poll_request(&self, state: &PollerState) -> Option<HttpRequest> {
        match self {
            Self::PassThrough => None,
            Self::AsyncOperationHeader | Self::LocationHeader | Self::ProvisioningState => {
                Some(HttpRequest::get(state.poll_url()))
            }
        }
    }

    /// Interprets a `2xx` poll response.
    ///
    /// Unsuccessful responses never reach this function, the state machine
    /// fails the operation first.
    pub(crate) fn interpret(
        &self,
        state: &PollerState,
        response: &HttpResponse,
    ) -> Result<PollOutcome> {
        match self {
            Self::AsyncOperationHeader => interpret_async(state, response),
            Self::LocationHeader => interpret_location(state, response),
            Self::ProvisioningState => interpret_provisioning(response),
            Self::PassThrough => Ok(PollOutcome::status(OperationStatus::Succeeded)),
        }
    }
}

fn interpret_async(state: &PollerState, response: &HttpResponse) -> Result<PollOutcome> {
    let body = parse_body(&response.body)?
        .ok_or_else(|| Error::malformed("empty async operation status document"))?;
    let status = body
        .get("status")
        .and_then(Value::as_str)
        .or_else(|| provisioning_state(&body))
        .ok_or_else(|| Error::malformed("missing `status` in async operation status document"))?;
    let final_get_url = match (state.final_state_via(), headers::location(&response.headers)) {
        (Some(FinalStateVia::Location), Some(location)) => Some(
            resolve(state.poll_url(), location)
                .map_err(|e| Error::malformed(format!("invalid Location header: {e}")))?,
        ),
        _ => None,
    };
    Ok(PollOutcome {
        status: OperationStatus::from_service(status),
        poll_url: None,
        final_get_url,
    })
}

fn interpret_location(state: &PollerState, response: &HttpResponse) -> Result<PollOutcome> {
    if response.status != StatusCode::ACCEPTED {
        return Ok(PollOutcome::status(OperationStatus::Succeeded));
    }
    let poll_url = headers::location(&response.headers)
        .map(|location| resolve(state.poll_url(), location))
        .transpose()
        .map_err(|e| Error::malformed(format!("invalid Location header: {e}")))?
        .filter(|url| url != state.poll_url());
    Ok(PollOutcome {
        status: OperationStatus::InProgress,
        poll_url,
        final_get_url: None,
    })
}

fn interpret_provisioning(response: &HttpResponse) -> Result<PollOutcome> {
    // Some services drop the field, or the body, once the operation is done.
    let status = parse_body(&response.body)?
        .as_ref()
        .and_then(provisioning_state)
        .map(OperationStatus::from_service)
        .unwrap_or(OperationStatus::Succeeded);
    Ok(PollOutcome::status(status))
}

/// Parses a JSON body, `None` when the body is empty.
pub(crate) fn parse_body(body: &Bytes) -> Result<Option<Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice::<Value>(body)
        .map(Some)
        .map_err(Error::malformed)
}

/// The provisioning state, either nested under `properties` or at the top
/// level of the resource.
pub(crate) fn provisioning_state(body: &Value) -> Option<&str> {
    body.pointer("/properties/provisioningState")
        .or_else(|| body.get("provisioningState"))
        .and_then(Value::as_str)
}

/// Resolves a possibly relative URL against `base`.
pub(crate) fn resolve(base: &str, reference: &str) -> std::result::Result<String, url::ParseError> {
    let url = url::Url::parse(base)?.join(reference)?;
    Ok(url.into())
}
