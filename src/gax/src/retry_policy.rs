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

//! Defines traits for retry policies and some common implementations.
//!
//! The transport automatically retries requests that fail with transient
//! errors. Every request a poller sends is a GET, or the initial request that
//! the application already completed, so retrying is always safe.
//!
//! Applications may override the default behavior, for example, to retry for
//! a longer period or to stop retrying on specific errors.
//!
//! # Example
//! ```
//! # use lro_gax::retry_policy::*;
//! use std::time::Duration;
//! // Retry at most 5 times, and for no more than 30 seconds.
//! let policy = TransientErrors
//!     .with_attempt_limit(5)
//!     .with_time_limit(Duration::from_secs(30));
//! ```

use crate::error::Error;
use crate::loop_state::LoopState;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The HTTP status codes that indicate a transient failure.
pub const RETRYABLE_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Determines how errors are handled in the transport retry loop.
pub trait RetryPolicy: Send + Sync + std::fmt::Debug {
    /// Query the retry policy after an error.
    ///
    /// # Parameters
    /// * `loop_start` - when the retry loop started.
    /// * `attempt_count` - the number of attempts, including the initial
    ///   attempt. This method is always called after an attempt, so this is
    ///   always non-zero.
    /// * `error` - the error from the last attempt.
    fn on_error(&self, loop_start: Instant, attempt_count: u32, error: Error) -> LoopState;

    /// The remaining time in the retry policy.
    ///
    /// For policies based on time, this returns the remaining time in the
    /// policy. The retry loop uses this value to bound each request and to
    /// avoid sleeping past the deadline. For policies that are not time based
    /// this returns `None`.
    fn remaining_time(&self, _loop_start: Instant, _attempt_count: u32) -> Option<Duration> {
        None
    }
}

/// The retry policy used by transports unless the application provides one.
pub fn default_policy() -> LimitedAttemptCount<TransientErrors> {
    TransientErrors.with_attempt_limit(3)
}

/// A helper type to use [RetryPolicy] in client configuration.
#[derive(Clone, Debug)]
pub struct RetryPolicyArg(pub(crate) Arc<dyn RetryPolicy>);

impl<T> std::convert::From<T> for RetryPolicyArg
where
    T: RetryPolicy + 'static,
{
    fn from(value: T) -> Self {
        Self(Arc::new(value))
    }
}

impl std::convert::From<Arc<dyn RetryPolicy>> for RetryPolicyArg {
    fn from(value: Arc<dyn RetryPolicy>) -> Self {
        Self(value)
    }
}

/// Extension trait for [RetryPolicy]
pub trait RetryPolicyExt: RetryPolicy + Sized {
    /// Decorate a [RetryPolicy] to limit the total elapsed time in the retry
    /// loop.
    ///
    /// # Example
    /// ```
    /// # use lro_gax::retry_policy::*;
    /// use std::time::{Duration, Instant};
    /// let policy = TransientErrors.with_time_limit(Duration::from_secs(10));
    /// let start = Instant::now() - Duration::from_secs(20);
    /// let error = lro_gax::error::Error::io("connection reset");
    /// assert!(policy.on_error(start, 1, error).is_exhausted());
    /// ```
    fn with_time_limit(self, maximum_duration: Duration) -> LimitedElapsedTime<Self> {
        LimitedElapsedTime::custom(self, maximum_duration)
    }

    /// Decorate a [RetryPolicy] to limit the number of attempts.
    ///
    /// Once `attempt_count >= maximum_attempts` the policy replaces any
    /// [Continue][LoopState::Continue] result with
    /// [Exhausted][LoopState::Exhausted]. Setting the maximum to 0 or 1
    /// disables retries.
    ///
    /// # Example
    /// ```
    /// # use lro_gax::retry_policy::*;
    /// use std::time::Instant;
    /// let policy = TransientErrors.with_attempt_limit(2);
    /// let error = || lro_gax::error::Error::io("connection reset");
    /// assert!(policy.on_error(Instant::now(), 1, error()).is_continue());
    /// assert!(policy.on_error(Instant::now(), 2, error()).is_exhausted());
    /// ```
    fn with_attempt_limit(self, maximum_attempts: u32) -> LimitedAttemptCount<Self> {
        LimitedAttemptCount::custom(self, maximum_attempts)
    }
}

impl<T: RetryPolicy> RetryPolicyExt for T {}

/// A retry policy that continues on connection failures and on the
/// [retryable status codes][RETRYABLE_STATUS_CODES].
///
/// This policy must be decorated to limit the number of attempts or the
/// duration of the retry loop.
#[derive(Clone, Debug)]
pub struct TransientErrors;

impl RetryPolicy for TransientErrors {
    fn on_error(&self, _loop_start: Instant, _attempt_count: u32, error: Error) -> LoopState {
        if !error.is_transport() {
            return LoopState::Permanent(error);
        }
        match error.http_status_code() {
            None => LoopState::Continue(error),
            Some(code) if RETRYABLE_STATUS_CODES.contains(&code) => LoopState::Continue(error),
            Some(_) => LoopState::Permanent(error),
        }
    }
}

/// A retry policy that never retries.
#[derive(Clone, Debug)]
pub struct NeverRetry;

impl RetryPolicy for NeverRetry {
    fn on_error(&self, _loop_start: Instant, _attempt_count: u32, error: Error) -> LoopState {
        LoopState::Permanent(error)
    }
}

/// A retry policy decorator that limits the total time in the retry loop.
///
/// # Parameters
/// * `P` - the inner retry policy, defaults to [TransientErrors].
#[derive(Debug)]
pub struct LimitedElapsedTime<P = TransientErrors>
where
    P: RetryPolicy,
{
    inner: P,
    maximum_duration: Duration,
}

impl LimitedElapsedTime {
    /// Creates a new instance, with the default inner policy.
    pub fn new(maximum_duration: Duration) -> Self {
        Self::custom(TransientErrors, maximum_duration)
    }
}

impl<P> LimitedElapsedTime<P>
where
    P: RetryPolicy,
{
    /// Creates a new instance with a custom inner policy.
    pub fn custom(inner: P, maximum_duration: Duration) -> Self {
        Self {
            inner,
            maximum_duration,
        }
    }

    fn deadline(&self, loop_start: Instant) -> Instant {
        loop_start + self.maximum_duration
    }
}

impl<P> RetryPolicy for LimitedElapsedTime<P>
where
    P: RetryPolicy,
{
    fn on_error(&self, loop_start: Instant, attempt_count: u32, error: Error) -> LoopState {
        match self.inner.on_error(loop_start, attempt_count, error) {
            LoopState::Continue(e) if Instant::now() >= self.deadline(loop_start) => {
                LoopState::Exhausted(e)
            }
            flow => flow,
        }
    }

    fn remaining_time(&self, loop_start: Instant, attempt_count: u32) -> Option<Duration> {
        let remaining = self
            .deadline(loop_start)
            .saturating_duration_since(Instant::now());
        let inner = self.inner.remaining_time(loop_start, attempt_count);
        Some(inner.map_or(remaining, |i| i.min(remaining)))
    }
}

/// A retry policy decorator that limits the number of attempts.
///
/// # Parameters
/// * `P` - the inner retry policy, defaults to [TransientErrors].
#[derive(Debug)]
pub struct LimitedAttemptCount<P = TransientErrors>
where
    P: RetryPolicy,
{
    inner: P,
    maximum_attempts: u32,
}

impl LimitedAttemptCount {
    /// Creates a new instance, with the default inner policy.
    pub fn new(maximum_attempts: u32) -> Self {
        Self::custom(TransientErrors, maximum_attempts)
    }
}

impl<P> LimitedAttemptCount<P>
where
    P: RetryPolicy,
{
    /// Creates a new instance with a custom inner policy.
    pub fn custom(inner: P, maximum_attempts: u32) -> Self {
        Self {
            inner,
            maximum_attempts,
        }
    }
}

impl<P> RetryPolicy for LimitedAttemptCount<P>
where
    P: RetryPolicy,
{
    fn on_error(&self, loop_start: Instant, attempt_count: u32, error: Error) -> LoopState {
        match self.inner.on_error(loop_start, attempt_count, error) {
            LoopState::Continue(e) if attempt_count >= self.maximum_attempts => {
                LoopState::Exhausted(e)
            }
            flow => flow,
        }
    }

    fn remaining_time(&self, loop_start: Instant, attempt_count: u32) -> Option<Duration> {
        self.inner.remaining_time(loop_start, attempt_count)
    }
}
