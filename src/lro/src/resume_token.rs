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

//! Serializes enough of a [PollerState] to resume polling elsewhere.
//!
//! The token is a URL-safe base64 encoding of a small, versioned JSON
//! document. The status and the last response are not included, a resumed
//! poller always polls again before reporting anything.

use crate::state::PollerState;
use crate::status::OperationStatus;
use crate::strategy::{FinalStateVia, PollStrategyKind};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use gax::Result;
use gax::error::Error;
use http::Method;
use serde::{Deserialize, Serialize};

const VERSION: u32 = 1;

/// An opaque snapshot of an in-progress operation.
///
/// Obtain one with [Poller::resume_token][crate::Poller::resume_token], store
/// it as a string, and pass it to
/// [PollerBuilder::resume][crate::PollerBuilder::resume] to continue waiting
/// for the same operation.
///
/// # Example
/// ```
/// # use lro_poller::ResumeToken;
/// # fn sample(token: &ResumeToken) -> anyhow::Result<()> {
/// let saved = token.to_string();
/// let restored = saved.parse::<ResumeToken>()?;
/// assert_eq!(&restored, token);
/// # Ok(()) }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResumeToken(String);

impl ResumeToken {
    /// The token as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn encode(operation: &str, state: &PollerState) -> Result<Self> {
        if state.strategy() == PollStrategyKind::PassThrough {
            return Err(Error::not_resumable(
                "the operation completed with the initiating response",
            ));
        }
        if state.status().is_terminal() {
            return Err(Error::not_resumable(format!(
                "the operation already reached a terminal status ({})",
                state.status()
            )));
        }
        let payload = Payload {
            version: VERSION,
            operation: operation.to_string(),
            strategy: state.strategy(),
            poll_url: state.poll_url().to_string(),
            method: state.method().to_string(),
            final_get_url: state.final_get_url().map(str::to_string),
            final_state_via: state.final_state_via(),
        };
        let json = serde_json::to_vec(&payload).map_err(Error::other)?;
        Ok(Self(URL_SAFE_NO_PAD.encode(json)))
    }

    /// Rebuilds the state of a poller for `operation`.
    pub(crate) fn decode(&self, operation: &str) -> Result<PollerState> {
        let json = URL_SAFE_NO_PAD
            .decode(self.0.as_bytes())
            .map_err(|e| Error::deser(format!("resume token is not valid base64: {e}")))?;
        let payload = serde_json::from_slice::<Payload>(&json).map_err(Error::deser)?;
        if payload.version != VERSION {
            return Err(Error::token_mismatch(format!(
                "unsupported resume token version {}, expected {VERSION}",
                payload.version
            )));
        }
        if payload.operation != operation {
            return Err(Error::token_mismatch(format!(
                "the token was created for `{}`, not `{operation}`",
                payload.operation
            )));
        }
        if payload.strategy == PollStrategyKind::PassThrough {
            return Err(Error::not_resumable(
                "pass-through operations cannot be resumed",
            ));
        }
        let method = payload
            .method
            .parse::<Method>()
            .map_err(|e| Error::deser(format!("invalid method in resume token: {e}")))?;
        let urls = std::iter::once(payload.poll_url.as_str())
            .chain(payload.final_get_url.as_deref());
        for url in urls {
            url::Url::parse(url)
                .map_err(|e| Error::deser(format!("invalid URL {url} in resume token: {e}")))?;
        }
        Ok(PollerState::new(
            payload.strategy,
            method,
            payload.poll_url,
            OperationStatus::NotStarted,
        )
        .with_final_state_via(payload.final_state_via)
        .with_final_get_url(payload.final_get_url))
    }
}

impl std::fmt::Display for ResumeToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ResumeToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::deser("empty resume token"));
        }
        Ok(Self(s.to_string()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Payload {
    version: u32,
    operation: String,
    strategy: PollStrategyKind,
    poll_url: String,
    method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    final_get_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    final_state_via: Option<FinalStateVia>,
}
