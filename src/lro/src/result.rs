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

//! Produces the final result once an operation reaches a terminal status.

use crate::decoder::Decoder;
use crate::state::PollerState;
use crate::status::OperationStatus;
use crate::strategy::PollStrategyKind;
use gax::Result;
use gax::error::{Error, HttpError};
use gax::http_client::{HttpRequest, HttpResponse, Transport};
use gax::response::{Parts, Response};
use http::Method;

pub(crate) async fn extract<T>(
    state: &PollerState,
    transport: &dyn Transport,
    decoder: &dyn Decoder<T>,
) -> Result<Response<T>> {
    match state.status() {
        OperationStatus::Succeeded => succeeded(state, transport, decoder).await,
        OperationStatus::Failed | OperationStatus::Canceled => Err(failed(state)),
        status => Err(Error::other(format!(
            "the operation has not completed, its status is {status}"
        ))),
    }
}

async fn succeeded<T>(
    state: &PollerState,
    transport: &dyn Transport,
    decoder: &dyn Decoder<T>,
) -> Result<Response<T>> {
    if let Some(url) = state.final_get_url() {
        tracing::debug!(url, "fetching the final result");
        let response = transport.send(HttpRequest::get(url)).await?;
        if !response.is_success() {
            return Err(Error::http(HttpError::from(&response)));
        }
        return decode(&response, decoder);
    }
    if *state.method() == Method::DELETE
        && state.strategy() == PollStrategyKind::AsyncOperationHeader
    {
        // The status document describes the operation, not the deleted resource.
        let body = decoder.empty()?;
        return Ok(match state.last_response() {
            Some(r) => Response::from_parts(parts(r), body),
            None => Response::from(body),
        });
    }
    match state.last_response() {
        Some(r) => decode(r, decoder),
        None => decoder.empty().map(Response::from),
    }
}

fn decode<T>(response: &HttpResponse, decoder: &dyn Decoder<T>) -> Result<Response<T>> {
    let body = if response.body.iter().all(u8::is_ascii_whitespace) {
        decoder.empty()?
    } else {
        decoder.decode(&response.body)?
    };
    Ok(Response::from_parts(parts(response), body))
}

fn parts(response: &HttpResponse) -> Parts {
    Parts::new()
        .set_status(response.status)
        .set_headers(response.headers.clone())
}

fn failed(state: &PollerState) -> Error {
    match state.last_response() {
        Some(r) if !r.is_success() => Error::http(HttpError::from(r)),
        _ if state.transport_failed() => {
            Error::io("the transport could not complete the last poll")
        }
        Some(r) => Error::server_failure(state.status().as_str(), HttpError::from(r)),
        None => Error::server_failure(
            state.status().as_str(),
            HttpError::new(0, http::HeaderMap::new(), None),
        ),
    }
}
