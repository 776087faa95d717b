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

//! Defines the types for polling error policies.
//!
//! # Example
//! ```
//! # use lro_gax::polling_error_policy::*;
//! use std::time::Duration;
//! // Tolerate up to 5 consecutive malformed poll responses, and stop waiting
//! // after 15 minutes, whichever limit is reached first.
//! let policy = TransientMalformed
//!     .with_malformed_limit(5)
//!     .with_time_limit(Duration::from_secs(15 * 60));
//! ```
//!
//! Pollers need to distinguish errors that may resolve in a future poll from
//! errors that end the polling session. A poll response that cannot be
//! interpreted (say, a proxy returned an HTML page) may be followed by a
//! perfectly good response. A transport failure, on the other hand, means the
//! operation state can no longer be trusted.
//!
//! This module defines a trait that applications may implement to customize
//! that decision, and some common implementations that should meet most
//! needs.

use crate::error::Error;
use crate::loop_state::LoopState;
use crate::polling_state::PollingState;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The maximum number of consecutive malformed poll responses tolerated by
/// [default_policy].
pub const DEFAULT_MALFORMED_LIMIT: u32 = 3;

/// Determines how errors are handled in the polling loop.
///
/// Implementations of this trait determine if polling errors may resolve in
/// future attempts, and for how long the polling loop may continue.
pub trait PollingErrorPolicy: Send + Sync + std::fmt::Debug {
    /// Query the polling policy after an error.
    ///
    /// # Parameters
    /// * `state` - the counters for the current polling loop. The counters
    ///   already include the attempt that produced `error`.
    /// * `error` - the last error when polling the operation.
    fn on_error(&self, state: &PollingState, error: Error) -> LoopState;

    /// Called when the operation is successfully polled, but it is still in
    /// progress.
    ///
    /// Returning an error stops the polling loop.
    fn on_in_progress(&self, _state: &PollingState, _operation: &str) -> Option<Error> {
        None
    }
}

/// The policy used by pollers unless the application provides one.
///
/// Malformed poll responses are transient, up to
/// [DEFAULT_MALFORMED_LIMIT] consecutive occurrences. Every other error is
/// permanent.
pub fn default_policy() -> LimitedMalformedCount<TransientMalformed> {
    TransientMalformed.with_malformed_limit(DEFAULT_MALFORMED_LIMIT)
}

/// A helper type to use [PollingErrorPolicy] in poller configuration.
#[derive(Clone, Debug)]
pub struct PollingErrorPolicyArg(pub Arc<dyn PollingErrorPolicy>);

impl<T> std::convert::From<T> for PollingErrorPolicyArg
where
    T: PollingErrorPolicy + 'static,
{
    fn from(value: T) -> Self {
        Self(Arc::new(value))
    }
}

impl std::convert::From<Arc<dyn PollingErrorPolicy>> for PollingErrorPolicyArg {
    fn from(value: Arc<dyn PollingErrorPolicy>) -> Self {
        Self(value)
    }
}

/// Extension trait for [PollingErrorPolicy]
pub trait PollingErrorPolicyExt: PollingErrorPolicy + Sized {
    /// Decorate a [PollingErrorPolicy] to limit the total elapsed time in the
    /// polling loop.
    ///
    /// While the time spent in the polling loop (including the time between
    /// polls) is less than the prescribed duration the `on_error()` method
    /// returns the results of the inner policy. After that time it returns
    /// [Exhausted][LoopState::Exhausted] if the inner policy returns
    /// [Continue][LoopState::Continue], and `on_in_progress()` stops the loop.
    ///
    /// # Example
    /// ```
    /// # use lro_gax::*;
    /// use polling_error_policy::*;
    /// use polling_state::PollingState;
    /// use std::time::{Duration, Instant};
    /// let policy = AlwaysContinue.with_time_limit(Duration::from_secs(10));
    /// let state = PollingState::starting_at(Instant::now() - Duration::from_secs(20));
    /// let error = error::Error::malformed("missing status");
    /// assert!(policy.on_error(&state, error).is_exhausted());
    /// ```
    fn with_time_limit(self, maximum_duration: Duration) -> LimitedElapsedTime<Self> {
        LimitedElapsedTime::custom(self, maximum_duration)
    }

    /// Decorate a [PollingErrorPolicy] to limit the number of consecutive
    /// malformed poll responses.
    ///
    /// The policy passes through the results from the inner policy as long as
    /// `malformed_count <= maximum`. Past that, the policy replaces any
    /// [Continue][LoopState::Continue] result for a malformed response with
    /// [Exhausted][LoopState::Exhausted]. Other errors are passed through
    /// unchanged.
    ///
    /// # Example
    /// ```
    /// # use lro_gax::*;
    /// use polling_error_policy::*;
    /// use polling_state::PollingState;
    /// let policy = TransientMalformed.with_malformed_limit(2);
    /// let mut state = PollingState::new();
    /// state.malformed_count = 2;
    /// assert!(policy.on_error(&state, error::Error::malformed("bad")).is_continue());
    /// state.malformed_count = 3;
    /// assert!(policy.on_error(&state, error::Error::malformed("bad")).is_exhausted());
    /// ```
    fn with_malformed_limit(self, maximum: u32) -> LimitedMalformedCount<Self> {
        LimitedMalformedCount::custom(self, maximum)
    }
}

impl<T: PollingErrorPolicy> PollingErrorPolicyExt for T {}

/// A polling policy that continues only on malformed poll responses.
///
/// This policy should be decorated to limit the number of consecutive
/// malformed responses, see [default_policy].
///
/// Transport failures, failures reported by the service, and cancellation are
/// all permanent.
///
/// # Example
/// ```
/// # use lro_gax::*;
/// # use lro_gax::polling_error_policy::*;
/// # use lro_gax::polling_state::PollingState;
/// let state = PollingState::new();
/// assert!(TransientMalformed.on_error(&state, error::Error::malformed("bad")).is_continue());
/// assert!(TransientMalformed.on_error(&state, error::Error::io("reset")).is_permanent());
/// ```
#[derive(Clone, Debug)]
pub struct TransientMalformed;

impl PollingErrorPolicy for TransientMalformed {
    fn on_error(&self, _state: &PollingState, error: Error) -> LoopState {
        if error.is_malformed() {
            return LoopState::Continue(error);
        }
        LoopState::Permanent(error)
    }
}

/// A polling policy that continues on any error.
///
/// This policy must be decorated to limit the duration of the polling loop.
/// Note that pollers always stop on transport failures, as the operation
/// state has already moved to failed.
#[derive(Clone, Debug)]
pub struct AlwaysContinue;

impl PollingErrorPolicy for AlwaysContinue {
    fn on_error(&self, _state: &PollingState, error: Error) -> LoopState {
        LoopState::Continue(error)
    }
}

/// A polling policy decorator that limits the total time in the polling loop.
///
/// # Parameters
/// * `P` - the inner polling policy, defaults to [TransientMalformed].
#[derive(Debug)]
pub struct LimitedElapsedTime<P = TransientMalformed>
where
    P: PollingErrorPolicy,
{
    inner: P,
    maximum_duration: Duration,
}

impl LimitedElapsedTime {
    /// Creates a new instance, with the default inner policy.
    pub fn new(maximum_duration: Duration) -> Self {
        Self::custom(TransientMalformed, maximum_duration)
    }
}

impl<P> LimitedElapsedTime<P>
where
    P: PollingErrorPolicy,
{
    /// Creates a new instance with a custom inner policy.
    pub fn custom(inner: P, maximum_duration: Duration) -> Self {
        Self {
            inner,
            maximum_duration,
        }
    }

    fn expired(&self, start: Instant, now: Instant) -> bool {
        now >= start + self.maximum_duration
    }

    fn in_progress_impl(&self, start: Instant, operation: &str) -> Option<Error> {
        let now = Instant::now();
        if !self.expired(start, now) {
            return None;
        }
        Some(Error::exhausted(Exhausted::new(
            operation,
            "elapsed time",
            format!("{:?}", now.saturating_duration_since(start)),
            format!("{:?}", self.maximum_duration),
        )))
    }
}

impl<P> PollingErrorPolicy for LimitedElapsedTime<P>
where
    P: PollingErrorPolicy + 'static,
{
    fn on_error(&self, state: &PollingState, error: Error) -> LoopState {
        match self.inner.on_error(state, error) {
            LoopState::Continue(e) if self.expired(state.loop_start, Instant::now()) => {
                LoopState::Exhausted(e)
            }
            flow => flow,
        }
    }

    fn on_in_progress(&self, state: &PollingState, operation: &str) -> Option<Error> {
        self.inner
            .on_in_progress(state, operation)
            .or_else(|| self.in_progress_impl(state.loop_start, operation))
    }
}

/// A polling policy decorator that limits consecutive malformed responses.
///
/// # Parameters
/// * `P` - the inner polling policy, defaults to [TransientMalformed].
#[derive(Debug)]
pub struct LimitedMalformedCount<P = TransientMalformed>
where
    P: PollingErrorPolicy,
{
    inner: P,
    maximum: u32,
}

impl LimitedMalformedCount {
    /// Creates a new instance, with the default inner policy.
    pub fn new(maximum: u32) -> Self {
        Self::custom(TransientMalformed, maximum)
    }
}

impl<P> LimitedMalformedCount<P>
where
    P: PollingErrorPolicy,
{
    /// Creates a new instance with a custom inner policy.
    pub fn custom(inner: P, maximum: u32) -> Self {
        Self { inner, maximum }
    }
}

impl<P> PollingErrorPolicy for LimitedMalformedCount<P>
where
    P: PollingErrorPolicy,
{
    fn on_error(&self, state: &PollingState, error: Error) -> LoopState {
        match self.inner.on_error(state, error) {
            LoopState::Continue(e) if e.is_malformed() && state.malformed_count > self.maximum => {
                LoopState::Exhausted(e)
            }
            flow => flow,
        }
    }

    fn on_in_progress(&self, state: &PollingState, operation: &str) -> Option<Error> {
        self.inner.on_in_progress(state, operation)
    }
}

/// Indicates that a polling loop has been exhausted.
#[derive(Debug)]
pub struct Exhausted {
    operation: String,
    limit_name: &'static str,
    value: String,
    limit: String,
}

impl Exhausted {
    pub fn new(operation: &str, limit_name: &'static str, value: String, limit: String) -> Self {
        Self {
            operation: operation.to_string(),
            limit_name,
            value,
            limit,
        }
    }
}

impl std::fmt::Display for Exhausted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "polling loop for {} exhausted, {} value ({}) exceeds limit ({})",
            self.operation, self.limit_name, self.value, self.limit
        )
    }
}

impl std::error::Error for Exhausted {}
