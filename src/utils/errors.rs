use thiserror::Error;

use crate::models::{ContentKind, ProfileId};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Profile not found: {0}")]
    ProfileNotFound(ProfileId),

    #[error("No active profile")]
    NoActiveProfile,

    #[error("Failed to fetch {kind}: {message}")]
    RemoteFetchFailed { kind: ContentKind, message: String },

    #[error("Failed to fetch account info: {0}")]
    AccountFetchFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponseShape(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("No item {id} among {kind}")]
    ContentNotFound { kind: ContentKind, id: String },

    #[error("Download of {0} already running")]
    DownloadInProgress(ContentKind),

    #[error("Download of {0} cancelled")]
    Cancelled(ContentKind),

    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl CatalogError {
    pub fn remote(kind: ContentKind, error: impl std::fmt::Display) -> Self {
        CatalogError::RemoteFetchFailed {
            kind,
            message: error.to_string(),
        }
    }

    /// Keeps typed errors raised inside a backend, wraps everything else as
    /// a failed fetch of `kind`.
    pub fn from_backend(kind: ContentKind, error: anyhow::Error) -> Self {
        match error.downcast::<CatalogError>() {
            Ok(typed) => typed,
            Err(other) => CatalogError::remote(kind, format!("{:#}", other)),
        }
    }

    /// Errors that should send the user back to profile management.
    pub fn needs_profile_selection(&self) -> bool {
        matches!(
            self,
            CatalogError::ProfileNotFound(_) | CatalogError::NoActiveProfile
        )
    }
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
