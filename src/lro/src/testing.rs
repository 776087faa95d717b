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

//! Helpers shared by the unit tests in this crate.

use gax::Result;
use gax::error::Error;
use gax::http_client::{HttpRequest, HttpResponse, Transport};
use http::{HeaderValue, StatusCode};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A [Transport] returning scripted responses and recording every request.
#[derive(Debug, Default)]
pub(crate) struct FakeTransport {
    responses: Mutex<VecDeque<Result<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub(crate) fn new(responses: Vec<Result<HttpResponse>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::default(),
        }
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("lock is never poisoned").clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().expect("lock is never poisoned").len()
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests
            .lock()
            .expect("lock is never poisoned")
            .push(request);
        self.responses
            .lock()
            .expect("lock is never poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(Error::io("no more scripted responses")))
    }
}

pub(crate) fn json_response(code: StatusCode, body: Value) -> HttpResponse {
    HttpResponse::new(code).set_body(body.to_string())
}

pub(crate) fn status_response(status: &str) -> HttpResponse {
    json_response(StatusCode::OK, serde_json::json!({ "status": status }))
}

pub(crate) fn accepted(location: &'static str) -> HttpResponse {
    HttpResponse::new(StatusCode::ACCEPTED)
        .set_header("location", HeaderValue::from_static(location))
}
