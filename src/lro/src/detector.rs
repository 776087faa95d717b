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

//! Classifies the response to the request that started an operation.

use crate::headers;
use crate::state::PollerState;
use crate::status::OperationStatus;
use crate::strategy::{FinalStateVia, PollStrategyKind, parse_body, provisioning_state, resolve};
use gax::Result;
use gax::error::{Error, HttpError};
use gax::http_client::{HttpRequest, HttpResponse};
use http::StatusCode;

/// Selects the polling convention for a new operation.
///
/// The first matching rule wins, as responses may carry more than one
/// signal:
/// 1. an async-operation tracking header,
/// 2. a `Location` header,
/// 3. a provisioning state in a successful response body,
/// 4. a `200`, `201` or `204` response without any tracking signal.
///
/// Anything else, including unsuccessful responses, is an
/// [unrecognized shape][Error::is_unrecognized_shape].
pub(crate) fn detect(
    request: &HttpRequest,
    response: HttpResponse,
    final_state_via: Option<FinalStateVia>,
) -> Result<PollerState> {
    let original = url::Url::parse(&request.url).map_err(|e| {
        Error::unrecognized_shape(format!("invalid request URL {}: {e}", request.url))
    })?;
    if !response.is_success() {
        return Err(Error::unrecognized_shape(HttpError::from(&response)));
    }
    let method = request.method.clone();
    let resolve_header = |name: &str, value: &str| {
        resolve(original.as_str(), value)
            .map_err(|e| Error::unrecognized_shape(format!("invalid {name} header {value}: {e}")))
    };

    if let Some(tracking) = headers::async_operation(&response.headers) {
        let poll_url = resolve_header("async operation", tracking)?;
        let via = final_state_via.unwrap_or_else(|| FinalStateVia::default_for(&method));
        let final_get_url = match via {
            FinalStateVia::AzureAsyncOperation => None,
            FinalStateVia::OriginalUri => Some(original.to_string()),
            FinalStateVia::Location => headers::location(&response.headers)
                .map(|l| resolve_header("Location", l))
                .transpose()?,
        };
        let state = PollerState::new(
            PollStrategyKind::AsyncOperationHeader,
            method,
            poll_url,
            OperationStatus::InProgress,
        )
        .with_final_state_via(Some(via))
        .with_final_get_url(final_get_url)
        .with_last_response(response);
        return Ok(detected(state));
    }

    if let Some(location) = headers::location(&response.headers) {
        let poll_url = resolve_header("Location", location)?;
        let state = PollerState::new(
            PollStrategyKind::LocationHeader,
            method,
            poll_url,
            OperationStatus::InProgress,
        )
        .with_last_response(response);
        return Ok(detected(state));
    }

    let provisioning = parse_body(&response.body)
        .ok()
        .flatten()
        .as_ref()
        .and_then(provisioning_state)
        .map(OperationStatus::from_service);
    if let Some(status) = provisioning {
        let state = PollerState::new(
            PollStrategyKind::ProvisioningState,
            method,
            original.to_string(),
            status,
        )
        .with_last_response(response);
        return Ok(detected(state));
    }

    if matches!(
        response.status,
        StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT
    ) {
        let state = PollerState::new(
            PollStrategyKind::PassThrough,
            method,
            String::new(),
            OperationStatus::Succeeded,
        )
        .with_last_response(response);
        return Ok(detected(state));
    }

    Err(Error::unrecognized_shape(format!(
        "{} response without async operation, Location, or provisioning state",
        response.status
    )))
}

fn detected(state: PollerState) -> PollerState {
    tracing::debug!(
        strategy = ?state.strategy(),
        status = %state.status(),
        poll_url = %state.poll_url(),
        final_get_url = ?state.final_get_url(),
        "detected polling strategy"
    );
    state
}
