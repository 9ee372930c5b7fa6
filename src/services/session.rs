use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::backends::CatalogBackend;
use crate::models::{Profile, ProfileId};
use crate::utils::errors::{CatalogError, CatalogResult};

/// Snapshot of the current profile handed to cache and download operations.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub profile: Profile,
    pub backend: Arc<dyn CatalogBackend>,
    /// Cancelled when the profile stops being current
    pub cancel: CancellationToken,
}

impl SessionHandle {
    pub fn profile_id(&self) -> &ProfileId {
        &self.profile.id
    }
}

/// Sole owner of "which profile is current" once started.
#[derive(Debug, Default)]
pub struct Session {
    current: RwLock<Option<SessionHandle>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `profile` current. The previous profile's token is cancelled
    /// before the swap. Returns the previous profile id.
    pub async fn activate(
        &self,
        profile: Profile,
        backend: Arc<dyn CatalogBackend>,
    ) -> Option<ProfileId> {
        let mut current = self.current.write().await;
        let previous = current.take().map(|handle| {
            handle.cancel.cancel();
            handle.profile.id
        });

        debug!(
            "Session now on profile {} (previous: {:?})",
            profile.id, previous
        );
        *current = Some(SessionHandle {
            profile,
            backend,
            cancel: CancellationToken::new(),
        });
        previous
    }

    /// Drops the current profile, cancelling its work.
    pub async fn clear(&self) -> Option<ProfileId> {
        let mut current = self.current.write().await;
        current.take().map(|handle| {
            handle.cancel.cancel();
            handle.profile.id
        })
    }

    pub async fn handle(&self) -> Option<SessionHandle> {
        self.current.read().await.clone()
    }

    /// Current handle or `NoActiveProfile`.
    pub async fn require(&self) -> CatalogResult<SessionHandle> {
        self.handle().await.ok_or(CatalogError::NoActiveProfile)
    }

    pub async fn profile_id(&self) -> Option<ProfileId> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|handle| handle.profile.id.clone())
    }

    pub async fn current_profile(&self) -> Option<Profile> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|handle| handle.profile.clone())
    }

    /// Replaces the stored record when `profile` is the current one.
    pub async fn update_profile(&self, profile: &Profile) -> bool {
        let mut current = self.current.write().await;
        match current.as_mut() {
            Some(handle) if handle.profile.id == profile.id => {
                handle.profile = profile.clone();
                true
            }
            _ => false,
        }
    }

    pub async fn is_current(&self, id: &ProfileId) -> bool {
        self.profile_id().await.as_ref() == Some(id)
    }
}
