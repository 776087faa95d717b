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

//! Header names and parsers for the polling conventions.

use chrono::{DateTime, Utc};
use http::HeaderMap;
use std::time::{Duration, SystemTime};

pub(crate) const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";
pub(crate) const OPERATION_LOCATION: &str = "operation-location";
pub(crate) const LOCATION: &str = "location";
pub(crate) const RETRY_AFTER: &str = "retry-after";
pub(crate) const RETRY_AFTER_MS: &str = "retry-after-ms";
pub(crate) const X_MS_RETRY_AFTER_MS: &str = "x-ms-retry-after-ms";

fn non_empty<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// The async-operation tracking URL, `Azure-AsyncOperation` taking
/// precedence over `Operation-Location`.
pub(crate) fn async_operation(headers: &HeaderMap) -> Option<&str> {
    non_empty(headers, AZURE_ASYNC_OPERATION).or_else(|| non_empty(headers, OPERATION_LOCATION))
}

pub(crate) fn location(headers: &HeaderMap) -> Option<&str> {
    non_empty(headers, LOCATION)
}

/// The delay requested by the service before the next poll.
pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    retry_after_at(headers, SystemTime::now().into())
}

fn retry_after_at(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    for name in [RETRY_AFTER_MS, X_MS_RETRY_AFTER_MS] {
        if let Some(ms) = non_empty(headers, name).and_then(|v| v.parse::<u64>().ok()) {
            return Some(Duration::from_millis(ms));
        }
    }
    let value = non_empty(headers, RETRY_AFTER)?;
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    // HTTP-date, in the past means "now".
    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let delta = date.with_timezone(&Utc) - now;
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use test_case::test_case;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (k, v) in pairs {
            headers.insert(*k, HeaderValue::from_static(v));
        }
        headers
    }

    #[test]
    fn async_operation_precedence() {
        let h = headers(&[
            ("operation-location", "https://example.com/ol"),
            ("azure-asyncoperation", "https://example.com/aao"),
        ]);
        assert_eq!(async_operation(&h), Some("https://example.com/aao"));

        let h = headers(&[("operation-location", "https://example.com/ol")]);
        assert_eq!(async_operation(&h), Some("https://example.com/ol"));

        let h = headers(&[("azure-asyncoperation", "  ")]);
        assert_eq!(async_operation(&h), None);
        assert_eq!(async_operation(&HeaderMap::new()), None);
    }

    #[test]
    fn location_header() {
        let h = headers(&[("location", "/r/1")]);
        assert_eq!(location(&h), Some("/r/1"));
        assert_eq!(location(&HeaderMap::new()), None);
    }

    #[test_case(&[("retry-after-ms", "250")], Some(Duration::from_millis(250)); "retry-after-ms")]
    #[test_case(&[("x-ms-retry-after-ms", "1500")], Some(Duration::from_millis(1500)); "x-ms-retry-after-ms")]
    #[test_case(&[("retry-after", "3")], Some(Duration::from_secs(3)); "seconds")]
    #[test_case(&[("retry-after", "0")], Some(Duration::ZERO); "zero")]
    #[test_case(&[("retry-after-ms", "100"), ("retry-after", "3")], Some(Duration::from_millis(100)); "ms wins")]
    #[test_case(&[("retry-after-ms", "soon"), ("retry-after", "3")], Some(Duration::from_secs(3)); "bad ms ignored")]
    #[test_case(&[("retry-after", "later")], None; "garbage")]
    #[test_case(&[], None; "absent")]
    fn retry_after_values(pairs: &[(&'static str, &'static str)], want: Option<Duration>) {
        assert_eq!(retry_after(&headers(pairs)), want);
    }

    #[test]
    fn retry_after_http_date() -> anyhow::Result<()> {
        let now = DateTime::parse_from_rfc2822("Sun, 06 Nov 1994 08:49:30 GMT")?.with_timezone(&Utc);
        let h = headers(&[("retry-after", "Sun, 06 Nov 1994 08:49:37 GMT")]);
        assert_eq!(retry_after_at(&h, now), Some(Duration::from_secs(7)));

        let h = headers(&[("retry-after", "Sun, 06 Nov 1994 08:49:00 GMT")]);
        assert_eq!(retry_after_at(&h, now), Some(Duration::ZERO));
        Ok(())
    }
}
