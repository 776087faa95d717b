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

//! The HTTP transport used by pollers.
//!
//! Pollers never talk to the network directly. They build [HttpRequest]s and
//! hand them to a [Transport]. Applications typically use [ReqwestTransport],
//! tests and applications with their own HTTP stack may implement the trait
//! themselves.

use crate::Result;
use crate::backoff_policy::BackoffPolicy;
use crate::client_config::ClientConfig;
use crate::error::{Error, HttpError};
use crate::retry_loop_internal::retry_loop;
use crate::retry_policy::{RETRYABLE_STATUS_CODES, RetryPolicy};
use bytes::Bytes;
use http::header::{HeaderValue, IntoHeaderName};
use http::{HeaderMap, Method, StatusCode};
use std::sync::Arc;
use std::time::Duration;

/// A request sent by a poller.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Creates a request without headers or body.
    pub fn new<U: Into<String>>(method: Method, url: U) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Creates a `GET` request, the only kind a poller sends.
    pub fn get<U: Into<String>>(url: U) -> Self {
        Self::new(Method::GET, url)
    }

    /// Adds a header to the request.
    pub fn set_header<K: IntoHeaderName>(mut self, k: K, v: HeaderValue) -> Self {
        self.headers.append(k, v);
        self
    }

    /// Sets the request body.
    pub fn set_body<V: Into<Bytes>>(mut self, v: V) -> Self {
        self.body = Some(v.into());
        self
    }
}

/// A response received by a poller.
///
/// The body is fully buffered, operation status documents are small.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    /// Creates a response without headers or body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Adds a header to the response.
    ///
    /// # Example
    /// ```
    /// # use lro_gax::http_client::HttpResponse;
    /// use http::{HeaderValue, StatusCode};
    /// let response = HttpResponse::new(StatusCode::ACCEPTED)
    ///     .set_header("location", HeaderValue::from_static("https://example.com/op/1"));
    /// assert!(response.headers.contains_key("Location"));
    /// ```
    pub fn set_header<K: IntoHeaderName>(mut self, k: K, v: HeaderValue) -> Self {
        self.headers.append(k, v);
        self
    }

    /// Sets the response body.
    pub fn set_body<V: Into<Bytes>>(mut self, v: V) -> Self {
        self.body = v.into();
        self
    }

    /// Returns true for `2xx` status codes.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

impl From<&HttpResponse> for HttpError {
    fn from(value: &HttpResponse) -> Self {
        HttpError::new(
            value.status.as_u16(),
            value.headers.clone(),
            Some(value.body.clone()),
        )
    }
}

/// Sends requests on behalf of a poller.
///
/// Implementations should retry transient failures on their own. An `Err`
/// result is terminal for the polling session. Responses with unsuccessful
/// status codes that are not retried should be returned as `Ok`, the poller
/// classifies them.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Sends a request and buffers the full response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// A [Transport] implemented with [reqwest].
///
/// Connection failures and responses with a
/// [retryable status code][RETRYABLE_STATUS_CODES] are retried as prescribed
/// by the retry and backoff policies in the [ClientConfig]. Once the retry
/// policy stops the loop, the last error is returned.
///
/// # Example
/// ```
/// # use lro_gax::client_config::ClientConfig;
/// # use lro_gax::http_client::ReqwestTransport;
/// # fn sample() -> lro_gax::Result<()> {
/// let transport = ReqwestTransport::new(ClientConfig::new().set_user_agent("my-app/1.0"))?;
/// # Ok(()) }
/// ```
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
    retry_policy: Arc<dyn RetryPolicy>,
    backoff_policy: Arc<dyn BackoffPolicy>,
    user_agent: Option<HeaderValue>,
}

impl ReqwestTransport {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let inner = reqwest::Client::builder().build().map_err(Error::io)?;
        let user_agent = config
            .user_agent
            .as_deref()
            .map(HeaderValue::from_str)
            .transpose()
            .map_err(Error::other)?;
        Ok(Self {
            inner,
            retry_policy: config.retry_policy(),
            backoff_policy: config.backoff_policy(),
            user_agent,
        })
    }

    async fn send_attempt(
        &self,
        request: &HttpRequest,
        remaining_time: Option<Duration>,
    ) -> Result<HttpResponse> {
        let mut builder = self
            .inner
            .request(request.method.clone(), request.url.as_str())
            .headers(request.headers.clone());
        if let Some(user_agent) = &self.user_agent {
            builder = builder.header(http::header::USER_AGENT, user_agent.clone());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        if let Some(timeout) = remaining_time {
            builder = builder.timeout(timeout);
        }
        let response = builder.send().await.map_err(Error::io)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(Error::io)?;
        let response = HttpResponse {
            status,
            headers,
            body,
        };
        if RETRYABLE_STATUS_CODES.contains(&status.as_u16()) {
            return Err(Error::http(HttpError::from(&response)));
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        tracing::debug!(method = %request.method, url = %request.url, "sending request");
        let request = &request;
        retry_loop(
            |remaining_time| self.send_attempt(request, remaining_time),
            tokio::time::sleep,
            self.retry_policy.clone(),
            self.backoff_policy.clone(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn request_builders() {
        let request = HttpRequest::get("https://example.com/op")
            .set_header("x-test", HeaderValue::from_static("v1"))
            .set_body("payload");
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.url, "https://example.com/op");
        assert_eq!(
            request.headers.get("x-test"),
            Some(&HeaderValue::from_static("v1"))
        );
        assert_eq!(request.body, Some(Bytes::from_static(b"payload")));

        let request = HttpRequest::new(Method::DELETE, "https://example.com/r");
        assert_eq!(request.method, Method::DELETE);
        assert!(request.headers.is_empty());
        assert!(request.body.is_none());
    }

    #[test]
    fn response_builders() {
        let response = HttpResponse::new(StatusCode::CREATED)
            .set_header("location", HeaderValue::from_static("/op/1"))
            .set_body(r#"{"status":"InProgress"}"#);
        assert!(response.is_success());
        assert_eq!(
            response.headers.get("Location"),
            Some(&HeaderValue::from_static("/op/1"))
        );
        assert_eq!(response.body, Bytes::from_static(br#"{"status":"InProgress"}"#));

        let response = HttpResponse::new(StatusCode::NOT_FOUND);
        assert!(!response.is_success());
        assert!(response.body.is_empty());
    }

    #[test]
    fn response_to_http_error() {
        let response = HttpResponse::new(StatusCode::CONFLICT)
            .set_header("x-ms-request-id", HeaderValue::from_static("abc"))
            .set_body("conflict");
        let error = HttpError::from(&response);
        assert_eq!(error.status_code(), 409);
        assert_eq!(error.payload(), Some(&Bytes::from_static(b"conflict")));
        assert!(error.headers().contains_key("x-ms-request-id"));

        let error = HttpError::from(&HttpResponse::new(StatusCode::CONFLICT));
        assert!(error.payload().is_none(), "{error:?}");
    }

    #[test]
    fn transport_new() -> TestResult {
        let transport = ReqwestTransport::new(ClientConfig::new().set_user_agent("test/1.0"))?;
        assert_eq!(
            transport.user_agent,
            Some(HeaderValue::from_static("test/1.0"))
        );
        Ok(())
    }

    #[test]
    fn transport_new_bad_user_agent() {
        let result = ReqwestTransport::new(ClientConfig::new().set_user_agent("bad\nagent"));
        let error = result.expect_err("newlines are invalid in header values");
        assert_eq!(error.kind(), crate::error::ErrorKind::Other);
    }

    #[test]
    fn transport_is_object_safe() {
        static_assertions::assert_obj_safe!(Transport);
        static_assertions::assert_impl_all!(ReqwestTransport: Transport, Send, Sync);
    }
}
