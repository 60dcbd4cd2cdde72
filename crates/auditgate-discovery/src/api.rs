//! # API Status Probe
//!
//! One bounded GET against a tool's health-check endpoint.
//!
//! - 2xx: `active`, version taken from `api-version` / `x-api-version`
//! - any other status: `unreachable`, status code kept
//! - timeout or transport failure: `error`, with a diagnostic

use auditgate_core::{ApiStatus, DiscoveryMethod, ToolPatch};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Response headers that may carry the API version, in priority order.
const VERSION_HEADERS: [&str; 2] = ["x-api-version", "api-version"];

/// What one health check observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiObservation {
    pub endpoint: String,
    pub status: ApiStatus,
    pub status_code: Option<u16>,
    pub version: Option<String>,
    pub diagnostic: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl ApiObservation {
    /// Turn the observation into an `api-probe` patch.
    #[must_use]
    pub fn to_patch(&self) -> ToolPatch {
        ToolPatch {
            version: self.version.clone(),
            api_status: Some(self.status),
            api_endpoint: Some(self.endpoint.clone()),
            status_code: self.status_code,
            diagnostic: self.diagnostic.clone(),
            last_discovery: Some(self.checked_at),
            ..ToolPatch::discovered_by(DiscoveryMethod::ApiProbe)
        }
    }
}

/// Probe `endpoint` once, giving up after `timeout`.
pub async fn probe_endpoint(
    client: &reqwest::Client,
    endpoint: &str,
    timeout: Duration,
) -> ApiObservation {
    let outcome = tokio::time::timeout(timeout, client.get(endpoint).send()).await;
    let mut observation = ApiObservation {
        endpoint: endpoint.to_string(),
        status: ApiStatus::Error,
        status_code: None,
        version: None,
        diagnostic: None,
        checked_at: Utc::now(),
    };

    match outcome {
        Ok(Ok(resp)) => {
            let status = resp.status();
            observation.status_code = Some(status.as_u16());
            if status.is_success() {
                observation.status = ApiStatus::Active;
                observation.version = version_header(resp.headers());
            } else {
                observation.status = ApiStatus::Unreachable;
                observation.diagnostic = Some(format!("HTTP {}", status.as_u16()));
            }
        }
        Ok(Err(e)) if e.is_timeout() => {
            observation.diagnostic = Some(timeout_diagnostic(timeout));
        }
        Ok(Err(e)) => {
            observation.diagnostic = Some(format!("request failed: {e}"));
        }
        Err(_) => {
            observation.diagnostic = Some(timeout_diagnostic(timeout));
        }
    }
    observation
}

fn timeout_diagnostic(timeout: Duration) -> String {
    format!("timed out after {} ms", timeout.as_millis())
}

fn version_header(headers: &reqwest::header::HeaderMap) -> Option<String> {
    VERSION_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn x_api_version_takes_priority() {
        let mut headers = HeaderMap::new();
        headers.insert("api-version", HeaderValue::from_static("1"));
        headers.insert("x-api-version", HeaderValue::from_static("2"));
        assert_eq!(version_header(&headers).as_deref(), Some("2"));

        let mut headers = HeaderMap::new();
        headers.insert("api-version", HeaderValue::from_static(" 2024-06 "));
        assert_eq!(version_header(&headers).as_deref(), Some("2024-06"));
        assert_eq!(version_header(&HeaderMap::new()), None);
    }

    #[test]
    fn patch_is_tagged_and_timestamped() {
        let observation = ApiObservation {
            endpoint: "https://api.github.com/user".into(),
            status: ApiStatus::Unreachable,
            status_code: Some(401),
            version: None,
            diagnostic: Some("HTTP 401".into()),
            checked_at: Utc::now(),
        };
        let patch = observation.to_patch();
        assert_eq!(patch.discovery_method, Some(DiscoveryMethod::ApiProbe));
        assert_eq!(patch.status_code, Some(401));
        assert_eq!(patch.last_discovery, Some(observation.checked_at));
        assert_eq!(patch.category, None);
    }
}
