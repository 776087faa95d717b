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

/// The lifecycle status of a long-running operation.
///
/// `Succeeded`, `Failed` and `Canceled` are terminal. Once a poller observes
/// a terminal status it never changes again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationStatus {
    /// The poller was resumed and has not dispatched a poll yet.
    NotStarted,
    /// The operation is running.
    InProgress,
    /// The operation completed successfully.
    Succeeded,
    /// The operation completed with an error.
    Failed,
    /// The operation was canceled by the service or by another client.
    Canceled,
}

impl OperationStatus {
    /// Returns true for the terminal statuses.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Succeeded | Self::Failed | Self::Canceled => true,
            Self::NotStarted | Self::InProgress => false,
        }
    }

    /// Maps a status reported by the service.
    ///
    /// The comparison is case-insensitive and accepts the British spelling of
    /// "canceled". Any value that is not a known terminal status means the
    /// operation is still running.
    ///
    /// # Example
    /// ```
    /// # use lro_poller::OperationStatus;
    /// assert_eq!(OperationStatus::from_service("succeeded"), OperationStatus::Succeeded);
    /// assert_eq!(OperationStatus::from_service("Cancelled"), OperationStatus::Canceled);
    /// assert_eq!(OperationStatus::from_service("Updating"), OperationStatus::InProgress);
    /// ```
    pub fn from_service(value: &str) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case("succeeded") {
            Self::Succeeded
        } else if value.eq_ignore_ascii_case("failed") {
            Self::Failed
        } else if value.eq_ignore_ascii_case("canceled") || value.eq_ignore_ascii_case("cancelled")
        {
            Self::Canceled
        } else {
            Self::InProgress
        }
    }

    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "NotStarted",
            Self::InProgress => "InProgress",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Canceled => "Canceled",
        }
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
