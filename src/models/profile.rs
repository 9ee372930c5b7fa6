use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ProfileId;
use crate::utils::errors::{CatalogError, CatalogResult};

pub const DEFAULT_OUTPUT_FORMAT: &str = "m3u8";

/// Xtream-Codes account credentials.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub url: String,
    pub username: String,
    pub password: String,
    pub format: Option<String>,
}

impl Credentials {
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            username: username.into(),
            password: password.into(),
            format: None,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn output_format(&self) -> &str {
        self.format.as_deref().unwrap_or(DEFAULT_OUTPUT_FORMAT)
    }

    /// Server root with any trailing `/player_api.php` and `/` removed.
    pub fn base_url(&self) -> &str {
        let trimmed = self.url.trim().trim_end_matches('/');
        trimmed
            .strip_suffix("/player_api.php")
            .unwrap_or(trimmed)
            .trim_end_matches('/')
    }

    pub fn validate(&self) -> CatalogResult<()> {
        if self.username.trim().is_empty() {
            return Err(CatalogError::InvalidCredentials(
                "username is required".to_string(),
            ));
        }

        let parsed = url::Url::parse(self.base_url())
            .map_err(|e| CatalogError::InvalidCredentials(format!("{}: {}", self.url, e)))?;

        match parsed.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(CatalogError::InvalidCredentials(format!(
                "unsupported scheme {}",
                scheme
            ))),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("format", &self.format)
            .finish()
    }
}

/// Account details reported by the server for the logged-in user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub username: String,
    pub email: Option<String>,
    pub status: Option<String>,
    pub exp_date: Option<String>,
    pub is_active: bool,
    pub created_at: Option<String>,
    pub max_connections: u32,
    pub active_connections: u32,
    pub allowed_output_formats: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub url: String,
    pub port: String,
    pub https_port: String,
    pub server_protocol: String,
    pub rtmp_port: String,
    pub timezone: String,
    pub timestamp_now: i64,
    pub time_now: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub name: String,
    pub credentials: Credentials,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
    pub cached_user_info: Option<UserInfo>,
    pub cached_server_info: Option<ServerInfo>,
}

impl Profile {
    /// Unsaved, inactive profile with a fresh id.
    pub fn new(name: impl Into<String>, credentials: Credentials) -> Self {
        let now = Utc::now();
        Self {
            id: ProfileId::generate(),
            name: name.into(),
            credentials,
            is_active: false,
            created_at: now,
            last_used: Some(now),
            cached_user_info: None,
            cached_server_info: None,
        }
    }
}
