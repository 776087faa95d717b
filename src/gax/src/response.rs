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

//! Response types.
//!
//! Pollers return the final result of an operation as a [Response]: the
//! decoded body plus the status code and headers of the HTTP response that
//! carried it.
//!
//! # Example
//!
//! ```no_run
//! # use lro_gax::Result;
//! # use lro_gax::response::Response;
//! // A type representing the resource created by the operation.
//! struct Resource {
//!   // ...
//! }
//!
//! async fn wait_for_resource() -> Result<Response<Resource>> {
//!   // ...
//! # panic!()
//! }
//!
//! # tokio_test::block_on(async {
//! let response = wait_for_resource().await?;
//! println!("final status code = {}", response.status());
//! if let Some(etag) = response.headers().get("ETag") {
//!     // do something with the etag
//! }
//! let resource = response.body();
//! # Result::<()>::Ok(()) });
//! ```

/// The result of a completed operation.
///
/// Consists of a body (potentially the unit type), and the metadata of the
/// HTTP response that carried it.
///
/// Applications may create responses directly when mocking pollers in their
/// own tests:
///
/// ```
/// # use lro_gax::response::Response;
/// #[derive(Default)]
/// struct Resource {
///   // ...
/// }
///
/// let response = Response::from(Resource::default());
/// assert_eq!(response.status(), http::StatusCode::OK);
/// ```
#[derive(Clone, Debug)]
pub struct Response<T> {
    parts: Parts,
    body: T,
}

impl<T> Response<T> {
    /// Creates a response from the body, with a `200 OK` status and no
    /// headers.
    pub fn from(body: T) -> Self {
        Self {
            body,
            parts: Parts::default(),
        }
    }

    /// Creates a response from the given parts.
    ///
    /// # Example
    /// ```
    /// # use lro_gax::response::{Parts, Response};
    /// let mut headers = http::HeaderMap::new();
    /// headers.insert(http::header::CONTENT_TYPE, http::HeaderValue::from_static("application/json"));
    /// let parts = Parts::new()
    ///     .set_status(http::StatusCode::CREATED)
    ///     .set_headers(headers);
    /// let response = Response::from_parts(parts, "body");
    /// assert_eq!(response.status(), http::StatusCode::CREATED);
    /// assert!(response.headers().get(http::header::CONTENT_TYPE).is_some());
    /// ```
    pub fn from_parts(parts: Parts, body: T) -> Self {
        Self { parts, body }
    }

    /// Returns the HTTP status code of the response carrying the result.
    pub fn status(&self) -> http::StatusCode {
        self.parts.status
    }

    /// Returns the headers associated with this response.
    pub fn headers(&self) -> &http::HeaderMap<http::HeaderValue> {
        &self.parts.headers
    }

    /// Returns the body associated with this response.
    pub fn body(&self) -> &T {
        &self.body
    }

    /// Consumes the response returning the metadata, and body.
    ///
    /// # Example
    /// ```
    /// # use lro_gax::response::Response;
    /// let response = Response::from("test".to_string());
    /// let (parts, body) = response.into_parts();
    /// assert_eq!(body.as_str(), "test");
    /// assert!(parts.headers.is_empty());
    /// ```
    pub fn into_parts(self) -> (Parts, T) {
        (self.parts, self.body)
    }

    /// Consumes the response returning only its body.
    pub fn into_body(self) -> T {
        self.body
    }

    /// Transforms the body, keeping the metadata.
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            parts: self.parts,
            body: f(self.body),
        }
    }
}

/// Component parts of a response.
///
/// The response parts, other than the body, consist of the status code and
/// headers.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Parts {
    /// The HTTP status code.
    pub status: http::StatusCode,
    /// The HTTP headers.
    pub headers: http::HeaderMap<http::HeaderValue>,
}

impl Parts {
    /// Create a new instance, with a `200 OK` status and no headers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the status code.
    pub fn set_status(mut self, v: http::StatusCode) -> Self {
        self.status = v;
        self
    }

    /// Set the headers.
    pub fn set_headers<V>(mut self, v: V) -> Self
    where
        V: Into<http::HeaderMap>,
    {
        self.headers = v.into();
        self
    }
}

impl Default for Parts {
    fn default() -> Self {
        Self {
            status: http::StatusCode::OK,
            headers: http::HeaderMap::new(),
        }
    }
}
