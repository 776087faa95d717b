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

//! Converts final result payloads into application types.

use bytes::Bytes;
use gax::Result;
use gax::error::Error;
use serde::de::DeserializeOwned;

/// Decodes the payload holding the final result of an operation.
///
/// Pollers use [Json] unless the application provides a different decoder
/// with [PollerBuilder::with_decoder][crate::PollerBuilder::with_decoder].
pub trait Decoder<T>: Send + Sync + std::fmt::Debug {
    /// Decodes a non-empty payload.
    fn decode(&self, payload: &Bytes) -> Result<T>;

    /// The result of operations that complete without a payload, such as
    /// most deletes.
    fn empty(&self) -> Result<T>;
}

/// Decodes payloads as JSON.
///
/// Empty payloads decode as JSON `null`, which works for `()`, `Option<_>`,
/// and [serde_json::Value].
#[derive(Clone, Copy, Debug, Default)]
pub struct Json;

impl<T> Decoder<T> for Json
where
    T: DeserializeOwned,
{
    fn decode(&self, payload: &Bytes) -> Result<T> {
        serde_json::from_slice(payload).map_err(Error::deser)
    }

    fn empty(&self) -> Result<T> {
        serde_json::from_value(serde_json::Value::Null).map_err(Error::deser)
    }
}
