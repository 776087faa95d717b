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

//! Bookkeeping for a single polling loop.

use std::time::Instant;

/// The counters a poller keeps while it waits for an operation.
///
/// Pollers pass this to their [PollingErrorPolicy] so policies can limit the
/// loop by elapsed time, attempts, or recurring malformed responses.
///
/// [PollingErrorPolicy]: crate::polling_error_policy::PollingErrorPolicy
#[derive(Clone, Debug)]
pub struct PollingState {
    /// When the poller was created or resumed.
    pub loop_start: Instant,
    /// The number of polls sent so far.
    pub attempt_count: u32,
    /// The number of consecutive malformed poll responses. Reset by any
    /// response that can be interpreted.
    pub malformed_count: u32,
}

impl PollingState {
    /// Creates a new instance, starting the clock now.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Creates a new instance with an explicit start time.
    pub fn starting_at(loop_start: Instant) -> Self {
        Self {
            loop_start,
            attempt_count: 0,
            malformed_count: 0,
        }
    }

    /// Records a poll that was sent, regardless of its outcome.
    pub fn on_attempt(&mut self) {
        self.attempt_count = self.attempt_count.saturating_add(1);
    }

    /// Records a poll response that could not be interpreted.
    pub fn on_malformed(&mut self) {
        self.malformed_count = self.malformed_count.saturating_add(1);
    }

    /// Records a poll response that could be interpreted.
    pub fn on_wellformed(&mut self) {
        self.malformed_count = 0;
    }
}

impl Default for PollingState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters() {
        let mut state = PollingState::default();
        assert_eq!(state.attempt_count, 0);
        assert_eq!(state.malformed_count, 0);

        state.on_attempt();
        state.on_malformed();
        state.on_attempt();
        state.on_malformed();
        assert_eq!(state.attempt_count, 2);
        assert_eq!(state.malformed_count, 2);

        state.on_attempt();
        state.on_wellformed();
        assert_eq!(state.attempt_count, 3);
        assert_eq!(state.malformed_count, 0);
    }

    #[test]
    fn saturates() {
        let mut state = PollingState::default();
        state.attempt_count = u32::MAX;
        state.malformed_count = u32::MAX;
        state.on_attempt();
        state.on_malformed();
        assert_eq!(state.attempt_count, u32::MAX);
        assert_eq!(state.malformed_count, u32::MAX);
    }

    #[test]
    fn starting_at() {
        let start = Instant::now();
        let state = PollingState::starting_at(start);
        assert_eq!(state.loop_start, start);
    }
}
