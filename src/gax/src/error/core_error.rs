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

use super::HttpError;
use std::error::Error as StdError;

type BoxError = Box<dyn StdError + Send + Sync>;

/// The category of an [Error].
///
/// Each polling session ends with exactly one outcome. When that outcome is
/// an error, its kind tells the application which failure occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The response to the initiating request does not match any known
    /// polling convention.
    UnrecognizedOperationShape,
    /// A poll response could not be interpreted, for example, the body is not
    /// JSON or lacks the expected status field.
    ///
    /// Pollers treat these as transient until they recur past the limit set
    /// by the polling error policy.
    MalformedPollResponse,
    /// The transport could not complete a request, even after its own
    /// retries, or a polling endpoint returned an unsuccessful HTTP status.
    Transport,
    /// The service reported that the operation failed or was canceled.
    ServerReportedFailure,
    /// The caller abandoned the wait. The poller remains resumable.
    Canceled,
    /// A resume token does not belong to the operation being resumed.
    TokenMismatch,
    /// The operation cannot produce a resume token, typically because it
    /// already completed.
    NotResumable,
    /// The final result could not be decoded.
    Deserialization,
    /// A polling policy stopped the loop, for example, because the maximum
    /// polling time elapsed.
    Exhausted,
    /// A problem that does not fit any other category.
    Other,
}

/// The error returned by pollers and transports.
///
/// Most applications will just return the error or log it. Applications that
/// need to react to specific failures can use [kind()][Error::kind] or the
/// predicates, and query the HTTP details of the last response observed.
///
/// # Example
/// ```
/// use lro_gax::error::Error;
/// match example_function() {
///     Err(e) if e.is_server_failure() => {
///         println!("operation {:?}: {e}", e.operation_status());
///     }
///     Err(e) if e.is_canceled() => println!("gave up waiting: {e}"),
///     Err(e) => println!("some other error {e}"),
///     Ok(_) => println!("success, how boring"),
/// }
///
/// fn example_function() -> Result<String, Error> {
///     // ... details omitted ...
///     # use lro_gax::error::HttpError;
///     # Err(Error::server_failure("Failed", HttpError::new(200, http::HeaderMap::new(), None)))
/// }
/// ```
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    http: Option<Box<HttpError>>,
    operation_status: Option<String>,
    source: Option<BoxError>,
}

impl Error {
    fn new(kind: ErrorKind, source: Option<BoxError>) -> Self {
        Self {
            kind,
            http: None,
            operation_status: None,
            source,
        }
    }

    /// Creates an error representing a response that no polling convention
    /// recognizes.
    ///
    /// # Example
    /// ```
    /// use lro_gax::error::Error;
    /// let error = Error::unrecognized_shape("202 Accepted without tracking headers");
    /// assert!(error.is_unrecognized_shape());
    /// ```
    pub fn unrecognized_shape<T: Into<BoxError>>(source: T) -> Self {
        Self::new(ErrorKind::UnrecognizedOperationShape, Some(source.into()))
    }

    /// The initiating response could not be classified.
    ///
    /// This error is fatal, the poller is never created.
    pub fn is_unrecognized_shape(&self) -> bool {
        matches!(self.kind, ErrorKind::UnrecognizedOperationShape)
    }

    /// Creates an error representing a poll response that could not be
    /// interpreted.
    ///
    /// # Example
    /// ```
    /// use lro_gax::error::Error;
    /// let error = Error::malformed("missing `status` field");
    /// assert!(error.is_malformed());
    /// ```
    pub fn malformed<T: Into<BoxError>>(source: T) -> Self {
        Self::new(ErrorKind::MalformedPollResponse, Some(source.into()))
    }

    /// A poll response could not be interpreted.
    ///
    /// The poller state is unchanged when this error is returned, polling
    /// again may succeed.
    pub fn is_malformed(&self) -> bool {
        matches!(self.kind, ErrorKind::MalformedPollResponse)
    }

    /// Creates an error representing a transport failure without an HTTP
    /// response, for example, a connection that could not be established.
    ///
    /// # Example
    /// ```
    /// use lro_gax::error::Error;
    /// let error = Error::io("connection reset");
    /// assert!(error.is_transport());
    /// assert!(error.http_status_code().is_none());
    /// ```
    pub fn io<T: Into<BoxError>>(source: T) -> Self {
        Self::new(ErrorKind::Transport, Some(source.into()))
    }

    /// Creates an error representing an unsuccessful HTTP response.
    ///
    /// # Example
    /// ```
    /// use lro_gax::error::{Error, HttpError};
    /// let error = Error::http(HttpError::new(503, http::HeaderMap::new(), None));
    /// assert!(error.is_transport());
    /// assert_eq!(error.http_status_code(), Some(503));
    /// ```
    pub fn http(http: HttpError) -> Self {
        Self {
            http: Some(Box::new(http)),
            ..Self::new(ErrorKind::Transport, None)
        }
    }

    /// The request could not be completed.
    ///
    /// The transport already retried the request, as prescribed by its retry
    /// policy. Pollers treat these errors as fatal: the operation is
    /// considered failed because its state cannot be trusted across HTTP tier
    /// failures.
    pub fn is_transport(&self) -> bool {
        matches!(self.kind, ErrorKind::Transport)
    }

    /// Creates an error representing an operation that the service reports
    /// as failed or canceled.
    ///
    /// # Example
    /// ```
    /// use lro_gax::error::{Error, HttpError};
    /// let http = HttpError::new(200, http::HeaderMap::new(), None);
    /// let error = Error::server_failure("Canceled", http);
    /// assert!(error.is_server_failure());
    /// assert_eq!(error.operation_status(), Some("Canceled"));
    /// assert_eq!(error.http_status_code(), Some(200));
    /// ```
    pub fn server_failure<S: Into<String>>(operation_status: S, http: HttpError) -> Self {
        Self {
            http: Some(Box::new(http)),
            operation_status: Some(operation_status.into()),
            ..Self::new(ErrorKind::ServerReportedFailure, None)
        }
    }

    /// The service reports the operation as failed or canceled.
    ///
    /// The HTTP payload typically contains the service error details.
    pub fn is_server_failure(&self) -> bool {
        matches!(self.kind, ErrorKind::ServerReportedFailure)
    }

    /// Creates an error representing a wait abandoned by the caller.
    ///
    /// # Example
    /// ```
    /// use lro_gax::error::Error;
    /// let error = Error::canceled("shutdown requested");
    /// assert!(error.is_canceled());
    /// ```
    pub fn canceled<T: Into<BoxError>>(source: T) -> Self {
        Self::new(ErrorKind::Canceled, Some(source.into()))
    }

    /// The caller canceled the wait.
    ///
    /// Only local polling stopped, the operation continues in the service.
    pub fn is_canceled(&self) -> bool {
        matches!(self.kind, ErrorKind::Canceled)
    }

    /// Creates an error representing a resume token for a different operation.
    pub fn token_mismatch<T: Into<BoxError>>(source: T) -> Self {
        Self::new(ErrorKind::TokenMismatch, Some(source.into()))
    }

    /// The resume token cannot be used with the operation being resumed.
    pub fn is_token_mismatch(&self) -> bool {
        matches!(self.kind, ErrorKind::TokenMismatch)
    }

    /// Creates an error representing an operation that cannot be resumed.
    pub fn not_resumable<T: Into<BoxError>>(source: T) -> Self {
        Self::new(ErrorKind::NotResumable, Some(source.into()))
    }

    /// The operation cannot produce a resume token.
    pub fn is_not_resumable(&self) -> bool {
        matches!(self.kind, ErrorKind::NotResumable)
    }

    /// Creates an error representing a final result that cannot be decoded.
    ///
    /// # Example
    /// ```
    /// use lro_gax::error::Error;
    /// let error = Error::deser("expected an object");
    /// assert!(error.is_deserialization());
    /// ```
    pub fn deser<T: Into<BoxError>>(source: T) -> Self {
        Self::new(ErrorKind::Deserialization, Some(source.into()))
    }

    /// The final result could not be decoded.
    ///
    /// # Troubleshooting
    ///
    /// The most common cause is a result type that does not match the
    /// operation. Operations that do not return a resource, for example most
    /// DELETE operations, should use `()` or `Option<T>` as their result type.
    pub fn is_deserialization(&self) -> bool {
        matches!(self.kind, ErrorKind::Deserialization)
    }

    /// Creates an error representing an exhausted polling policy.
    pub fn exhausted<T: Into<BoxError>>(source: T) -> Self {
        Self::new(ErrorKind::Exhausted, Some(source.into()))
    }

    /// A polling policy stopped the loop before the operation completed.
    pub fn is_exhausted(&self) -> bool {
        matches!(self.kind, ErrorKind::Exhausted)
    }

    /// Creates an error for problems that do not fit any other category.
    pub fn other<T: Into<BoxError>>(source: T) -> Self {
        Self::new(ErrorKind::Other, Some(source.into()))
    }

    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The HTTP status code of the last response observed, if any.
    ///
    /// # Example
    /// ```
    /// use lro_gax::error::{Error, HttpError};
    /// let error = Error::http(HttpError::new(404, http::HeaderMap::new(), None));
    /// assert_eq!(error.http_status_code(), Some(404));
    /// ```
    pub fn http_status_code(&self) -> Option<u16> {
        self.http.as_ref().map(|h| h.status_code())
    }

    /// The headers of the last response observed, if any.
    pub fn http_headers(&self) -> Option<&http::HeaderMap> {
        self.http.as_ref().map(|h| h.headers())
    }

    /// The payload of the last response observed, if any and not empty.
    ///
    /// For [server failures][Error::is_server_failure] this is the body
    /// reporting the failure.
    pub fn http_payload(&self) -> Option<&bytes::Bytes> {
        self.http.as_ref().and_then(|h| h.payload())
    }

    /// The terminal operation status reported by the service, if any.
    pub fn operation_status(&self) -> Option<&str> {
        self.operation_status.as_deref()
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.kind, &self.source, &self.http) {
            (ErrorKind::UnrecognizedOperationShape, Some(e), _) => write!(
                f,
                "the initiating response does not match any polling convention: {e}"
            ),
            (ErrorKind::MalformedPollResponse, Some(e), _) => {
                write!(f, "cannot interpret the poll response: {e}")
            }
            (ErrorKind::Transport, _, Some(h)) => {
                write!(f, "the request failed with {h}")
            }
            (ErrorKind::Transport, Some(e), None) => {
                write!(f, "the transport could not complete the request: {e}")
            }
            (ErrorKind::ServerReportedFailure, _, Some(h)) => write!(
                f,
                "the service reports the operation as {} in a response with {h}",
                self.operation_status.as_deref().unwrap_or("failed")
            ),
            (ErrorKind::Canceled, Some(e), _) => write!(f, "polling was canceled: {e}"),
            (ErrorKind::TokenMismatch, Some(e), _) => {
                write!(f, "the resume token does not match the operation: {e}")
            }
            (ErrorKind::NotResumable, Some(e), _) => {
                write!(f, "the operation cannot be resumed: {e}")
            }
            (ErrorKind::Deserialization, Some(e), _) => {
                write!(f, "cannot deserialize the final result: {e}")
            }
            (ErrorKind::Exhausted, Some(e), _) => write!(f, "{e}"),
            (ErrorKind::Other, Some(e), _) => {
                write!(f, "an unclassified problem polling the operation: {e}")
            }
            (_, _, _) => unreachable!("no constructor allows this"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
            .or_else(|| {
                self.http
                    .as_ref()
                    .map(|h| h.as_ref() as &(dyn StdError + 'static))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::HeaderMap;

    #[test]
    fn unrecognized_shape() {
        let error = Error::unrecognized_shape("test-only");
        assert_eq!(error.kind(), ErrorKind::UnrecognizedOperationShape);
        assert!(error.is_unrecognized_shape(), "{error:?}");
        assert!(error.source().is_some(), "{error:?}");
        assert!(error.to_string().contains("test-only"), "{error}");
        assert!(error.http_status_code().is_none(), "{error:?}");
    }

    #[test]
    fn malformed() {
        let error = Error::malformed("missing status");
        assert!(error.is_malformed(), "{error:?}");
        assert!(!error.is_transport(), "{error:?}");
        assert!(error.to_string().contains("missing status"), "{error}");
    }

    #[test]
    fn io() {
        let error = Error::io("connection reset");
        assert!(error.is_transport(), "{error:?}");
        assert!(error.http_status_code().is_none(), "{error:?}");
        assert!(error.to_string().contains("connection reset"), "{error}");
    }

    #[test]
    fn http() {
        let error = Error::http(HttpError::new(
            503,
            HeaderMap::new(),
            Some(Bytes::from_static(b"try again")),
        ));
        assert!(error.is_transport(), "{error:?}");
        assert_eq!(error.http_status_code(), Some(503));
        assert_eq!(error.http_payload(), Some(&Bytes::from_static(b"try again")));
        assert!(error.http_headers().is_some_and(|h| h.is_empty()));
        assert!(error.to_string().contains("code=503"), "{error}");
        let source = error
            .source()
            .and_then(|e| e.downcast_ref::<HttpError>())
            .map(|h| h.status_code());
        assert_eq!(source, Some(503));
    }

    #[test]
    fn server_failure() {
        let payload = Bytes::from_static(br#"{"status":"Failed","error":{"code":"Oops"}}"#);
        let error = Error::server_failure(
            "Failed",
            HttpError::new(200, HeaderMap::new(), Some(payload.clone())),
        );
        assert!(error.is_server_failure(), "{error:?}");
        assert_eq!(error.operation_status(), Some("Failed"));
        assert_eq!(error.http_status_code(), Some(200));
        assert_eq!(error.http_payload(), Some(&payload));
        assert!(error.to_string().contains("as Failed"), "{error}");
    }

    #[test]
    fn canceled() {
        let error = Error::canceled("test-only");
        assert_eq!(error.kind(), ErrorKind::Canceled);
        assert!(error.is_canceled(), "{error:?}");
        assert!(error.operation_status().is_none(), "{error:?}");
    }

    #[test]
    fn resume_errors() {
        let error = Error::token_mismatch("wrong operation");
        assert!(error.is_token_mismatch(), "{error:?}");
        assert!(error.to_string().contains("wrong operation"), "{error}");

        let error = Error::not_resumable("already done");
        assert!(error.is_not_resumable(), "{error:?}");
        assert!(error.to_string().contains("already done"), "{error}");
    }

    #[test]
    fn deser_exhausted_other() {
        let error = Error::deser("bad json");
        assert!(error.is_deserialization(), "{error:?}");
        let error = Error::exhausted("too long");
        assert!(error.is_exhausted(), "{error:?}");
        assert_eq!(error.to_string(), "too long");
        let error = Error::other("who knows");
        assert_eq!(error.kind(), ErrorKind::Other);
    }

    #[test]
    fn is_send_and_sync() {
        static_assertions::assert_impl_all!(Error: Send, Sync, std::error::Error);
    }
}
