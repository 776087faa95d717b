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

//! Truncated exponential backoff for transport retries.
//!
//! The transport uses this policy to space out attempts after transient
//! failures. The delay grows by a scaling factor on each attempt, up to a
//! maximum, and is randomized with full jitter so concurrent pollers do not
//! retry in lockstep.
//!
//! Pollers do not use this policy between polls. The delay between polls is
//! set by the caller or by the service through `Retry-After`.

use std::time::{Duration, Instant};

/// The error type for exponential backoff creation.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("the scaling value ({0}) should be >= 1.0")]
    InvalidScalingFactor(f64),
    #[error("the initial delay ({0:?}) should be greater than zero")]
    InvalidInitialDelay(Duration),
    #[error(
        "the maximum delay ({maximum:?}) should be greater than or equal to the initial delay ({initial:?})"
    )]
    EmptyRange {
        maximum: Duration,
        initial: Duration,
    },
}

/// Configures an [ExponentialBackoff] policy.
#[derive(Clone, Debug)]
pub struct ExponentialBackoffBuilder {
    initial_delay: Duration,
    maximum_delay: Duration,
    scaling: f64,
}

impl ExponentialBackoffBuilder {
    /// Creates a builder with the default parameters.
    ///
    /// The defaults start at 100 milliseconds, double on each attempt, and
    /// never exceed 10 seconds. Transport retries are short lived, the
    /// polling loop handles longer waits.
    ///
    /// # Example
    /// ```
    /// # use lro_gax::exponential_backoff::Error;
    /// # use lro_gax::exponential_backoff::ExponentialBackoffBuilder;
    /// use std::time::Duration;
    ///
    /// let policy = ExponentialBackoffBuilder::new()
    ///         .with_initial_delay(Duration::from_millis(250))
    ///         .with_maximum_delay(Duration::from_secs(5))
    ///         .with_scaling(4.0)
    ///         .build()?;
    /// # Ok::<(), Error>(())
    /// ```
    pub fn new() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            maximum_delay: Duration::from_secs(10),
            scaling: 2.0,
        }
    }

    /// Change the delay after the first failure.
    pub fn with_initial_delay<V: Into<Duration>>(mut self, v: V) -> Self {
        self.initial_delay = v.into();
        self
    }

    /// Change the upper bound for the delay.
    pub fn with_maximum_delay<V: Into<Duration>>(mut self, v: V) -> Self {
        self.maximum_delay = v.into();
        self
    }

    /// Change the growth factor between attempts.
    pub fn with_scaling<V: Into<f64>>(mut self, v: V) -> Self {
        self.scaling = v.into();
        self
    }

    /// Validates the parameters and creates the policy.
    ///
    /// # Example
    /// ```
    /// # use lro_gax::exponential_backoff::Error;
    /// # use lro_gax::exponential_backoff::ExponentialBackoffBuilder;
    /// # use lro_gax::backoff_policy::BackoffPolicy;
    /// use std::time::Duration;
    /// use std::time::Instant;
    /// let backoff = ExponentialBackoffBuilder::new()
    ///     .with_initial_delay(Duration::from_secs(5))
    ///     .with_maximum_delay(Duration::from_secs(50))
    ///     .build()?;
    /// let p = backoff.on_failure(Instant::now(), 2);
    /// assert!(p <= Duration::from_secs(10));
    /// # Ok::<(), Error>(())
    /// ```
    pub fn build(self) -> Result<ExponentialBackoff, Error> {
        if self.scaling < 1.0 {
            return Err(Error::InvalidScalingFactor(self.scaling));
        }
        if self.initial_delay.is_zero() {
            return Err(Error::InvalidInitialDelay(self.initial_delay));
        }
        if self.maximum_delay < self.initial_delay {
            return Err(Error::EmptyRange {
                maximum: self.maximum_delay,
                initial: self.initial_delay,
            });
        }
        Ok(ExponentialBackoff {
            initial_delay: self.initial_delay,
            maximum_delay: self.maximum_delay,
            scaling: self.scaling,
        })
    }

    /// Creates the policy, forcing each parameter into a usable range.
    ///
    /// The maximum delay is clamped to `[1ms, 1h]`, then the initial delay to
    /// `[1ms, maximum]`, and the scaling factor to `[1.0, 32.0]`.
    pub fn clamp(self) -> ExponentialBackoff {
        let maximum_delay = self
            .maximum_delay
            .clamp(Duration::from_millis(1), Duration::from_secs(60 * 60));
        ExponentialBackoff {
            initial_delay: self
                .initial_delay
                .clamp(Duration::from_millis(1), maximum_delay),
            maximum_delay,
            scaling: self.scaling.clamp(1.0, 32.0),
        }
    }
}

impl Default for ExponentialBackoffBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Implements truncated exponential backoff with full jitter.
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    maximum_delay: Duration,
    scaling: f64,
}

impl ExponentialBackoff {
    /// The upper bound of the delay after `attempt_count` attempts.
    fn ceiling(&self, attempt_count: u32) -> Duration {
        let exp = attempt_count.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.scaling.powi(exp);
        if factor >= self.maximum_delay.div_duration_f64(self.initial_delay) {
            return self.maximum_delay;
        }
        // Cannot overflow, the product is below `maximum_delay`.
        self.initial_delay.mul_f64(factor)
    }

    fn jittered(&self, attempt_count: u32, rng: &mut impl rand::Rng) -> Duration {
        rng.random_range(Duration::ZERO..=self.ceiling(attempt_count))
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        ExponentialBackoffBuilder::new().clamp()
    }
}

impl crate::backoff_policy::BackoffPolicy for ExponentialBackoff {
    fn on_failure(&self, _loop_start: Instant, attempt_count: u32) -> Duration {
        self.jittered(attempt_count, &mut rand::rng())
    }
}
