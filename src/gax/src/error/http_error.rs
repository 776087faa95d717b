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

use bytes::Bytes;
use http::HeaderMap;

/// The HTTP details of a failed exchange.
///
/// Captures the status code, headers, and payload of a response that ended a
/// polling loop. For a [ServerReportedFailure][super::ErrorKind::ServerReportedFailure]
/// the payload is the body that reported the failed or canceled operation,
/// typically including a service specific error object.
#[derive(Debug, Default, Clone)]
pub struct HttpError {
    status_code: u16,
    headers: HeaderMap,
    payload: Option<Bytes>,
}

impl HttpError {
    /// Creates a new [HttpError] with the given status code, headers, and payload.
    pub fn new(status_code: u16, headers: HeaderMap, payload: Option<Bytes>) -> Self {
        Self {
            status_code,
            headers,
            payload: payload.filter(|p| !p.is_empty()),
        }
    }

    /// Returns the status code associated with the HTTP response.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Returns the payload associated with the HTTP response, if it was not
    /// empty.
    pub fn payload(&self) -> Option<&Bytes> {
        self.payload.as_ref()
    }

    /// Returns the headers associated with the HTTP response.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "HTTP error: code={}, headers={:?}",
            self.status_code, self.headers
        )?;
        if let Some(payload) = self.payload() {
            match std::str::from_utf8(payload) {
                Ok(s) => write!(f, ", payload:\n{s}")?,
                Err(_) => write!(f, ", payload:\n{payload:?}")?,
            }
        }
        Ok(())
    }
}

impl std::error::Error for HttpError {}
