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

//! Long-running operation helpers.
//!
//! This crate contains the types shared by long-running operation (LRO)
//! pollers and the transports they run on: the error type, the HTTP
//! transport abstraction and its default `reqwest` implementation, the retry
//! policies used by that transport, and the policies controlling polling
//! loops.
//!
//! Pollers consume these types as opaque collaborators. Applications
//! typically create a [ReqwestTransport][http_client::ReqwestTransport] once,
//! configure it with a [ClientConfig][client_config::ClientConfig], and share
//! it across any number of pollers.

/// An alias of [std::result::Result] where the error is always [crate::error::Error].
///
/// This is the result type used by all functions that send HTTP requests or
/// drive a polling loop.
pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// The core error types used by pollers and transports.
pub mod error;

/// Defines the transport abstraction consumed by pollers.
pub mod http_client;

pub mod backoff_policy;
pub mod client_config;
pub mod exponential_backoff;
pub mod loop_state;
pub mod polling_error_policy;
pub mod polling_state;
pub mod response;
pub mod retry_policy;

mod retry_loop_internal;
