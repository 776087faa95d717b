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

//! Defines traits for backoff policies and a common implementations.
//!
//! The transport automatically retries requests that fail with transient
//! errors, such as a dropped connection or a `503 Service Unavailable`
//! response. Retry strategies should avoid immediately retrying a request, as
//! the service may need time to recover. [Exponential backoff] is a well known
//! algorithm to find an acceptable delay between retries.
//!
//! # Example
//! ```
//! # use lro_gax::*;
//! # use lro_gax::backoff_policy::*;
//! use exponential_backoff::ExponentialBackoffBuilder;
//! use std::time::Duration;
//!
//! fn configure_backoff(config: client_config::ClientConfig) -> std::result::Result<client_config::ClientConfig, exponential_backoff::Error> {
//!     let policy = ExponentialBackoffBuilder::new()
//!         .with_initial_delay(Duration::from_millis(100))
//!         .with_maximum_delay(Duration::from_secs(5))
//!         .with_scaling(4.0)
//!         .build()?;
//!     Ok(config.set_backoff_policy(policy))
//! }
//! ```
//!
//! [Exponential backoff]: https://en.wikipedia.org/wiki/Exponential_backoff

use std::sync::Arc;

/// Defines the trait implemented by all backoff strategies.
pub trait BackoffPolicy: Send + Sync + std::fmt::Debug {
    /// Returns the backoff delay on a failure.
    ///
    /// # Parameters
    /// * `loop_start` - when the retry loop started.
    /// * `attempt_count` - the number of attempts. This method is always called
    ///   after the first attempt.
    fn on_failure(&self, loop_start: std::time::Instant, attempt_count: u32)
    -> std::time::Duration;
}

/// A helper type to use [BackoffPolicy] in client configuration.
#[derive(Clone, Debug)]
pub struct BackoffPolicyArg(pub(crate) Arc<dyn BackoffPolicy>);

impl<T: BackoffPolicy + 'static> std::convert::From<T> for BackoffPolicyArg {
    fn from(value: T) -> Self {
        Self(Arc::new(value))
    }
}

impl std::convert::From<Arc<dyn BackoffPolicy>> for BackoffPolicyArg {
    fn from(value: Arc<dyn BackoffPolicy>) -> Self {
        Self(value)
    }
}
