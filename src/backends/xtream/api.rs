use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::errors::XtreamApiError;
use super::retry::RetryPolicy;
use crate::config::NetworkConfig;
use crate::models::{ContentKind, Credentials};

const API_PATH: &str = "/player_api.php";

/// `player_api.php` endpoint for a profile URL
pub fn api_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.ends_with(API_PATH) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, API_PATH)
    }
}

pub fn categories_action(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Channel => "get_live_categories",
        ContentKind::Movie => "get_vod_categories",
        ContentKind::Show => "get_series_categories",
    }
}

pub fn streams_action(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Channel => "get_live_streams",
        ContentKind::Movie => "get_vod_streams",
        ContentKind::Show => "get_series",
    }
}

#[derive(Clone)]
pub struct XtreamApi {
    client: reqwest::Client,
    api_url: String,
    credentials: Credentials,
    retry_policy: RetryPolicy,
}

impl std::fmt::Debug for XtreamApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XtreamApi")
            .field("api_url", &self.api_url)
            .field("username", &self.credentials.username)
            .finish()
    }
}

impl XtreamApi {
    pub fn new(credentials: Credentials, network: &NetworkConfig) -> Result<Self> {
        Self::with_retry_policy(
            credentials,
            network.timeout(),
            RetryPolicy::from_config(network),
        )
    }

    pub fn with_retry_policy(
        credentials: Credentials,
        timeout: Duration,
        retry_policy: RetryPolicy,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_url: api_url(&credentials.url),
            credentials,
            retry_policy,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// GET `player_api.php` with the account parameters, `action` when given
    /// and `extra` pairs. The body must be JSON.
    pub async fn request(&self, action: Option<&str>, extra: &[(&str, &str)]) -> Result<Value> {
        self.request_with(&self.retry_policy, action, extra).await
    }

    pub async fn request_with(
        &self,
        policy: &RetryPolicy,
        action: Option<&str>,
        extra: &[(&str, &str)],
    ) -> Result<Value> {
        let operation_name = action.unwrap_or("account_info");
        let mut query: Vec<(&str, &str)> = vec![
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.as_str()),
        ];
        if let Some(action) = action {
            query.push(("action", action));
        }
        query.extend_from_slice(extra);

        let value = policy
            .execute(operation_name, || async {
                debug!("[{}] GET {}", operation_name, self.api_url);

                let response = self
                    .client
                    .get(&self.api_url)
                    .query(&query)
                    .send()
                    .await
                    .map_err(XtreamApiError::from_reqwest)?;

                let status = response.status();
                debug!("[{}] Response: {}", operation_name, status);

                if !status.is_success() {
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "<failed to read response body>".to_string());
                    warn!(
                        "[{}] Error response - Status: {}, Body: {}",
                        operation_name,
                        status.as_u16(),
                        body
                    );
                    return Err(XtreamApiError::from_status(status.as_u16(), body));
                }

                let text = response.text().await.map_err(XtreamApiError::from_reqwest)?;
                serde_json::from_str::<Value>(&text)
                    .map_err(|e| XtreamApiError::ParseError(e.to_string()))
            })
            .await
            .with_context(|| format!("{} request to {} failed", operation_name, self.api_url))?;

        Ok(value)
    }
}
