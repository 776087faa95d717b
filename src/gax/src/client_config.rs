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

//! Configuration for the HTTP transport.

use crate::backoff_policy::{BackoffPolicy, BackoffPolicyArg};
use crate::exponential_backoff::ExponentialBackoff;
use crate::retry_policy::{RetryPolicy, RetryPolicyArg};
use std::sync::Arc;

/// Configure a transport.
///
/// The default configuration should work for most applications. Some
/// applications may need to override the retry policy, the backoff between
/// retries, or identify themselves with a custom user agent.
///
/// # Example
/// ```
/// # use lro_gax::client_config::ClientConfig;
/// # use lro_gax::retry_policy::*;
/// use std::time::Duration;
/// let config = ClientConfig::new()
///     .set_retry_policy(TransientErrors.with_attempt_limit(5))
///     .set_user_agent("my-application/1.0");
/// ```
#[derive(Clone, Debug, Default)]
pub struct ClientConfig {
    pub(crate) retry_policy: Option<Arc<dyn RetryPolicy>>,
    pub(crate) backoff_policy: Option<Arc<dyn BackoffPolicy>>,
    pub(crate) user_agent: Option<String>,
}

impl ClientConfig {
    /// Returns a default [ClientConfig].
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the retry policy.
    pub fn set_retry_policy<V: Into<RetryPolicyArg>>(mut self, v: V) -> Self {
        self.retry_policy = Some(v.into().0);
        self
    }

    /// Configure the retry backoff policy.
    pub fn set_backoff_policy<V: Into<BackoffPolicyArg>>(mut self, v: V) -> Self {
        self.backoff_policy = Some(v.into().0);
        self
    }

    /// Configure the `User-Agent` header sent with every request.
    pub fn set_user_agent<V: Into<String>>(mut self, v: V) -> Self {
        self.user_agent = Some(v.into());
        self
    }

    pub(crate) fn retry_policy(&self) -> Arc<dyn RetryPolicy> {
        self.retry_policy
            .clone()
            .unwrap_or_else(|| Arc::new(crate::retry_policy::default_policy()))
    }

    pub(crate) fn backoff_policy(&self) -> Arc<dyn BackoffPolicy> {
        self.backoff_policy
            .clone()
            .unwrap_or_else(|| Arc::new(ExponentialBackoff::default()))
    }
}
