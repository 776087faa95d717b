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

//! Waits for long-running operations started with plain HTTP requests.
//!
//! Services report the progress of long-running operations (LROs) in a few
//! different ways: a tracking URL in an `Azure-AsyncOperation` or
//! `Operation-Location` header, a `Location` header that returns
//! `202 Accepted` while the operation runs, or a `provisioningState` field in
//! the resource itself. Some operations complete in the initiating response.
//!
//! A [Poller] detects the convention from the initiating request and response,
//! polls the service until the operation reaches a terminal status, and
//! produces the final result. Pollers can be snapshotted into a
//! [ResumeToken] and resumed in a different process.
//!
//! # Example
//! ```
//! # use lro_poller::{Poller, PollerBuilder};
//! use gax::client_config::ClientConfig;
//! use gax::http_client::{HttpRequest, ReqwestTransport, Transport};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Debug, serde::Deserialize)]
//! struct Resource {
//!     name: String,
//! }
//!
//! # async fn sample() -> anyhow::Result<()> {
//! let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(ClientConfig::default())?);
//! let request = HttpRequest::new(http::Method::PUT, "https://example.com/resources/r1")
//!     .set_body(r#"{"size": 42}"#);
//! let response = transport.send(request.clone()).await?;
//!
//! let mut poller: Poller<Resource> = PollerBuilder::new(transport)
//!     .with_operation("resources.create")
//!     .begin(&request, response)?;
//! let resource = poller
//!     .until_done(Duration::from_secs(10), &CancellationToken::new())
//!     .await?
//!     .into_body();
//! println!("created {}", resource.name);
//! # Ok(()) }
//! ```

pub use gax::Result;
pub use gax::error::Error;

mod decoder;
mod detector;
mod headers;
mod poller;
mod result;
mod resume_token;
mod state;
mod status;
mod strategy;
#[cfg(test)]
mod testing;

pub use decoder::{Decoder, Json};
pub use poller::{DEFAULT_OPERATION, Poller, PollerBuilder, PollingResult};
pub use resume_token::ResumeToken;
pub use state::PollerState;
pub use status::OperationStatus;
pub use strategy::{FinalStateVia, PollStrategyKind};
