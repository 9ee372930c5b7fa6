use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::backends::CatalogBackend;
use crate::config::ProfilesConfig;
use crate::db::Store;
use crate::events::{EventBus, EventType};
use crate::models::{Credentials, Profile, ProfileId};
use crate::utils::errors::{CatalogError, CatalogResult};

/// Configured accounts and which one is active.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    store: Store,
    event_bus: Arc<EventBus>,
    purge_content_on_delete: bool,
}

impl ProfileRegistry {
    pub fn new(store: Store, event_bus: Arc<EventBus>, config: &ProfilesConfig) -> Self {
        Self {
            store,
            event_bus,
            purge_content_on_delete: config.purge_content_on_delete,
        }
    }

    pub async fn list_profiles(&self) -> Vec<Profile> {
        self.store.list_profiles().await
    }

    /// Validated, unsaved profile with a fresh id.
    pub fn create_profile(
        &self,
        name: impl Into<String>,
        credentials: Credentials,
    ) -> CatalogResult<Profile> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CatalogError::InvalidCredentials(
                "profile name is required".to_string(),
            ));
        }
        credentials.validate()?;
        Ok(Profile::new(name.trim(), credentials))
    }

    /// Upserts by id. Returns whether the record was persisted.
    pub async fn save_profile(&self, profile: &Profile) -> bool {
        let existed = self.store.get_profile(&profile.id).await.is_some();
        if !self.store.save_profile(profile).await {
            warn!("Profile {} was not persisted", profile.id);
            return false;
        }

        let event_type = if existed {
            EventType::ProfileUpdated
        } else {
            EventType::ProfileCreated
        };
        let _ = self
            .event_bus
            .emit_profile(event_type, profile.id.clone(), Some(profile.name.clone()))
            .await;
        true
    }

    pub async fn get_profile(&self, id: &ProfileId) -> CatalogResult<Profile> {
        self.store
            .get_profile(id)
            .await
            .ok_or_else(|| CatalogError::ProfileNotFound(id.clone()))
    }

    /// First profile flagged active; only consulted at cold start.
    pub async fn get_active_profile(&self) -> Option<Profile> {
        self.store.active_profile().await
    }

    /// Removes the profile record. Catalog and user data of the profile are
    /// purged too when `purge_content_on_delete` is set.
    pub async fn delete_profile(&self, id: &ProfileId) -> CatalogResult<()> {
        let profile = self.get_profile(id).await?;

        if !self.store.delete_profile(id).await {
            return Err(CatalogError::StorageUnavailable(format!(
                "could not delete profile {}",
                id
            )));
        }

        if self.purge_content_on_delete {
            let content = self.store.purge_profile_content(id).await;
            let user_data = self.store.purge_profile_user_data(id).await;
            debug!(
                "Purged data of profile {} (content: {}, user data: {})",
                id, content, user_data
            );
        }

        info!("Deleted profile {} ({})", profile.name, id);
        let _ = self
            .event_bus
            .emit_profile(EventType::ProfileDeleted, id.clone(), Some(profile.name))
            .await;
        Ok(())
    }

    /// Flags `id` as the only active profile and refreshes its `last_used`.
    pub async fn set_active_profile(&self, id: &ProfileId) -> CatalogResult<Profile> {
        let mut profile = self.get_profile(id).await?;

        if self.store.set_active_profile(id).await {
            if let Some(updated) = self.store.get_profile(id).await {
                profile = updated;
            }
        } else {
            warn!("Activation of profile {} was not persisted", id);
            profile.is_active = true;
            profile.last_used = Some(chrono::Utc::now());
        }

        info!("Activated profile {} ({})", profile.name, id);
        let _ = self
            .event_bus
            .emit_profile(
                EventType::ProfileActivated,
                id.clone(),
                Some(profile.name.clone()),
            )
            .await;
        Ok(profile)
    }

    /// Fetches user and server info through `backend` and caches them on the
    /// profile record.
    pub async fn refresh_account_info(
        &self,
        id: &ProfileId,
        backend: &dyn CatalogBackend,
    ) -> CatalogResult<Profile> {
        let mut profile = self.get_profile(id).await?;

        let user_info = backend.get_user_profile().await.map_err(account_error)?;
        let server_info = backend.get_server_info().await.map_err(account_error)?;

        if !self
            .store
            .update_account_info(id, Some(&user_info), Some(&server_info))
            .await
        {
            warn!("Account info of profile {} was not persisted", id);
        }

        profile.cached_user_info = Some(user_info);
        profile.cached_server_info = Some(server_info);

        let _ = self
            .event_bus
            .emit_profile(
                EventType::ProfileUpdated,
                id.clone(),
                Some(profile.name.clone()),
            )
            .await;
        Ok(profile)
    }
}

fn account_error(error: anyhow::Error) -> CatalogError {
    match error.downcast::<CatalogError>() {
        Ok(typed) => typed,
        Err(other) => CatalogError::AccountFetchFailed(format!("{:#}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Collection;
    use crate::models::{Category, CategoryId, ContentKind};
    use crate::test_utils::{MockCatalogBackend, TestDatabase};

    async fn registry(db: &TestDatabase, purge: bool) -> ProfileRegistry {
        ProfileRegistry::new(
            Store::from_connection(db.connection()),
            Arc::new(EventBus::default()),
            &ProfilesConfig {
                purge_content_on_delete: purge,
            },
        )
    }

    fn credentials() -> Credentials {
        Credentials::new("http://tv.example.com", "user", "pass")
    }

    #[tokio::test]
    async fn test_create_profile_validates_input() {
        let db = TestDatabase::new().await.unwrap();
        let registry = registry(&db, false).await;

        assert!(registry.create_profile("Home", credentials()).is_ok());
        assert!(matches!(
            registry.create_profile("  ", credentials()),
            Err(CatalogError::InvalidCredentials(_))
        ));
        assert!(matches!(
            registry.create_profile("Home", Credentials::new("tv", "user", "pass")),
            Err(CatalogError::InvalidCredentials(_))
        ));

        let a = registry.create_profile("A", credentials()).unwrap();
        let b = registry.create_profile("B", credentials()).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_activation_is_exclusive() {
        let db = TestDatabase::new().await.unwrap();
        let registry = registry(&db, false).await;

        let a = registry.create_profile("A", credentials()).unwrap();
        let b = registry.create_profile("B", credentials()).unwrap();
        assert!(registry.save_profile(&a).await);
        assert!(registry.save_profile(&b).await);

        registry.set_active_profile(&a.id).await.unwrap();
        let active = registry.set_active_profile(&b.id).await.unwrap();
        assert!(active.is_active);

        let flagged: Vec<ProfileId> = registry
            .list_profiles()
            .await
            .into_iter()
            .filter(|p| p.is_active)
            .map(|p| p.id)
            .collect();
        assert_eq!(flagged, vec![b.id.clone()]);
        assert_eq!(registry.get_active_profile().await.unwrap().id, b.id);
    }

    #[tokio::test]
    async fn test_concurrent_activation_leaves_one_active() {
        let db = TestDatabase::new().await.unwrap();
        let registry = registry(&db, false).await;

        let mut ids = Vec::new();
        for name in ["A", "B", "C", "D"] {
            let profile = registry.create_profile(name, credentials()).unwrap();
            assert!(registry.save_profile(&profile).await);
            ids.push(profile.id);
        }
        registry.set_active_profile(&ids[0]).await.unwrap();

        for _ in 0..5 {
            let (a, b, c, d) = tokio::join!(
                registry.set_active_profile(&ids[3]),
                registry.set_active_profile(&ids[1]),
                registry.set_active_profile(&ids[2]),
                registry.set_active_profile(&ids[0]),
            );
            for result in [a, b, c, d] {
                assert!(result.is_ok());
            }

            let active: Vec<ProfileId> = registry
                .list_profiles()
                .await
                .into_iter()
                .filter(|p| p.is_active)
                .map(|p| p.id)
                .collect();
            assert_eq!(active.len(), 1);
            assert!(ids.contains(&active[0]));
        }
    }

    #[tokio::test]
    async fn test_unknown_profile_is_not_found() {
        let db = TestDatabase::new().await.unwrap();
        let registry = registry(&db, false).await;
        let missing = ProfileId::new("missing");

        assert!(matches!(
            registry.set_active_profile(&missing).await,
            Err(CatalogError::ProfileNotFound(_))
        ));
        assert!(matches!(
            registry.delete_profile(&missing).await,
            Err(CatalogError::ProfileNotFound(_))
        ));
    }

    async fn seed_content(store: &Store, profile_id: &ProfileId) {
        let category = Category {
            id: CategoryId::new("1"),
            name: "News".to_string(),
            parent_id: None,
            kind: ContentKind::Channel,
        };
        assert!(
            store
                .replace_categories(profile_id, ContentKind::Channel, &[category])
                .await
        );
    }

    #[tokio::test]
    async fn test_delete_keeps_content_by_default() {
        let db = TestDatabase::new().await.unwrap();
        let registry = registry(&db, false).await;
        let store = Store::from_connection(db.connection());

        let profile = registry.create_profile("A", credentials()).unwrap();
        registry.save_profile(&profile).await;
        seed_content(&store, &profile.id).await;

        registry.delete_profile(&profile.id).await.unwrap();
        assert!(registry.list_profiles().await.is_empty());
        assert_eq!(store.count(Collection::Categories).await, 1);
    }

    #[tokio::test]
    async fn test_delete_purges_content_when_configured() {
        let db = TestDatabase::new().await.unwrap();
        let registry = registry(&db, true).await;
        let store = Store::from_connection(db.connection());

        let profile = registry.create_profile("A", credentials()).unwrap();
        registry.save_profile(&profile).await;
        seed_content(&store, &profile.id).await;

        registry.delete_profile(&profile.id).await.unwrap();
        assert_eq!(store.count(Collection::Categories).await, 0);
    }

    #[tokio::test]
    async fn test_refresh_account_info_caches_details() {
        let db = TestDatabase::new().await.unwrap();
        let registry = registry(&db, false).await;

        let profile = registry.create_profile("A", credentials()).unwrap();
        registry.save_profile(&profile).await;

        let backend = MockCatalogBackend::new();
        let refreshed = registry
            .refresh_account_info(&profile.id, &backend)
            .await
            .unwrap();
        assert!(refreshed.cached_user_info.is_some());

        let stored = registry.get_profile(&profile.id).await.unwrap();
        assert_eq!(stored.cached_user_info, refreshed.cached_user_info);
        assert_eq!(stored.cached_server_info, refreshed.cached_server_info);
    }

    #[tokio::test]
    async fn test_save_emits_created_then_updated() {
        let db = TestDatabase::new().await.unwrap();
        let registry = registry(&db, false).await;
        let mut events = registry.event_bus.subscribe();

        let mut profile = registry.create_profile("A", credentials()).unwrap();
        registry.save_profile(&profile).await;
        profile.name = "Renamed".to_string();
        registry.save_profile(&profile).await;

        let types: Vec<EventType> = events.drain().into_iter().map(|e| e.event_type).collect();
        assert_eq!(
            types,
            vec![EventType::ProfileCreated, EventType::ProfileUpdated]
        );
    }
}
