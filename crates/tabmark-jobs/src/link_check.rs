//! Link health checks.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use tracing::debug;

use tabmark_core::{defaults, HealthStatus, Result};

/// Outcome of a single link check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCheckResult {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LinkCheckResult {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }

    /// Human-readable reason for a broken link.
    pub fn describe(&self) -> String {
        match (&self.error, self.http_status) {
            (Some(e), _) => format!("Link unreachable: {}", e),
            (None, Some(code)) => format!("Link returned HTTP {}", code),
            (None, None) => "Link unreachable".to_string(),
        }
    }
}

/// HTTP link checker. Sends `HEAD`, retrying with `GET` when the server
/// answers 405. Redirects are followed; any final 2xx/3xx is healthy.
#[derive(Debug, Clone)]
pub struct LinkChecker {
    client: Client,
}

impl LinkChecker {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(defaults::LINK_CHECK_USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// Checker configured from `LINK_CHECK_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        let secs = std::env::var("LINK_CHECK_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|s| *s > 0)
            .unwrap_or(defaults::LINK_CHECK_TIMEOUT_SECS);
        Self::new(Duration::from_secs(secs))
    }

    pub async fn check(&self, url: &str) -> LinkCheckResult {
        let result = match self.send(Method::HEAD, url).await {
            Ok(StatusCode::METHOD_NOT_ALLOWED) => self.send(Method::GET, url).await,
            other => other,
        };

        let outcome = match result {
            Ok(code) if code.is_success() || code.is_redirection() => LinkCheckResult {
                status: HealthStatus::Healthy,
                http_status: Some(code.as_u16()),
                error: None,
            },
            Ok(code) => LinkCheckResult {
                status: HealthStatus::Broken,
                http_status: Some(code.as_u16()),
                error: None,
            },
            Err(e) => LinkCheckResult {
                status: HealthStatus::Broken,
                http_status: None,
                error: Some(e.to_string()),
            },
        };

        debug!(
            subsystem = "links",
            component = "link_checker",
            op = "check",
            url,
            status = outcome.status.as_str(),
            http_status = outcome.http_status,
            "Link checked"
        );
        outcome
    }

    async fn send(&self, method: Method, url: &str) -> std::result::Result<StatusCode, reqwest::Error> {
        let response = self.client.request(method, url).send().await?;
        Ok(response.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let http = LinkCheckResult {
            status: HealthStatus::Broken,
            http_status: Some(404),
            error: None,
        };
        assert_eq!(http.describe(), "Link returned HTTP 404");

        let net = LinkCheckResult {
            status: HealthStatus::Broken,
            http_status: None,
            error: Some("connection refused".to_string()),
        };
        assert!(net.describe().contains("connection refused"));
    }
}
