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

//! Errors returned by pollers and transports.
//!
//! A poller reports exactly one outcome per wait: either the typed result, or
//! an [Error]. The error [kind][Error::kind] identifies which failure
//! occurred, and the accessors on [Error] return the last HTTP status,
//! headers, and payload observed, when there was one.
//!
//! # Examples
//!
//! ```
//! use lro_gax::error::{Error, ErrorKind};
//! fn handle_error(e: Error) {
//!     match e.kind() {
//!         ErrorKind::ServerReportedFailure => {
//!             println!("operation ended as {:?}: {e}", e.operation_status());
//!         }
//!         ErrorKind::Canceled => println!("abandoned, the poller can be resumed"),
//!         _ => println!("polling failed with HTTP status {:?}", e.http_status_code()),
//!     }
//! }
//! ```

mod core_error;
mod http_error;
pub use core_error::*;
pub use http_error::*;
