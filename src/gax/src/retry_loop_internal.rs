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

use super::Result;
use super::backoff_policy::BackoffPolicy;
use super::loop_state::LoopState;
use super::retry_policy::RetryPolicy;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Runs the retry loop for a given function.
///
/// This functions calls an inner function as long as (1) the retry policy has
/// not expired, and (2) the inner function has not returned a successful
/// response.
///
/// The inner function receives the remaining time in the retry policy, if
/// any, and should use it to bound the request. In between calls the
/// function waits the amount of time prescribed by the backoff policy, using
/// `sleep` to implement any sleep.
///
/// When the loop stops on an error, that error is returned unchanged. Callers
/// see one terminal error per request, not one per attempt.
pub async fn retry_loop<F, Fut, S, SF, Response>(
    mut inner: F,
    sleep: S,
    retry_policy: Arc<dyn RetryPolicy>,
    backoff_policy: Arc<dyn BackoffPolicy>,
) -> Result<Response>
where
    F: FnMut(Option<Duration>) -> Fut,
    Fut: Future<Output = Result<Response>>,
    S: Fn(Duration) -> SF,
    SF: Future<Output = ()>,
{
    let loop_start = tokio::time::Instant::now().into_std();
    let mut attempt_count = 0;
    loop {
        let remaining_time = retry_policy.remaining_time(loop_start, attempt_count);
        attempt_count += 1;
        let error = match inner(remaining_time).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };
        let error = match retry_policy.on_error(loop_start, attempt_count, error) {
            LoopState::Permanent(e) | LoopState::Exhausted(e) => return Err(e),
            LoopState::Continue(e) => e,
        };
        let delay = backoff_policy.on_failure(loop_start, attempt_count);
        if retry_policy
            .remaining_time(loop_start, attempt_count)
            .is_some_and(|remaining| remaining < delay)
        {
            return Err(error);
        }
        tracing::warn!(attempt_count, ?delay, "retrying after transient error: {error}");
        sleep(delay).await;
    }
}
