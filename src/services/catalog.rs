use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use super::content_cache::ContentCache;
use super::downloads::{DownloadCoordinator, DownloadReport};
use super::profiles::ProfileRegistry;
use super::session::{Session, SessionHandle};
use super::user_data::UserDataService;
use crate::backends::{CatalogBackend, XtreamBackend};
use crate::config::{Config, NetworkConfig};
use crate::db::Store;
use crate::events::EventBus;
use crate::models::{
    AppSettings, Category, CategoryId, ContentDownloaded, ContentId, ContentItem, ContentKind,
    Credentials, DownloadProgress, FavoriteItem, FavoriteKind, HistoryKind, ItemDetails,
    MovieDetails, PerKind, Profile, ProfileId, Seasons, SettingsUpdate, ShowDetails, ShowId,
    StreamKind, StreamRequest, WatchHistoryEntry, build_stream_url,
};
use crate::utils::errors::{CatalogError, CatalogResult};

/// Builds the remote client for a profile.
pub trait BackendFactory: Send + Sync + std::fmt::Debug {
    fn create(&self, profile: &Profile) -> CatalogResult<Arc<dyn CatalogBackend>>;
}

#[derive(Debug, Clone, Default)]
pub struct XtreamBackendFactory {
    network: NetworkConfig,
}

impl XtreamBackendFactory {
    pub fn new(network: NetworkConfig) -> Self {
        Self { network }
    }
}

impl BackendFactory for XtreamBackendFactory {
    fn create(&self, profile: &Profile) -> CatalogResult<Arc<dyn CatalogBackend>> {
        let backend = XtreamBackend::new(profile.credentials.clone(), &self.network)
            .map_err(|e| CatalogError::InvalidCredentials(format!("{:#}", e)))?;
        Ok(Arc::new(backend))
    }
}

/// Entry point for front-ends: one session, one cache, one store.
#[derive(Debug)]
pub struct CatalogService {
    store: Store,
    event_bus: Arc<EventBus>,
    registry: ProfileRegistry,
    session: Session,
    cache: Arc<ContentCache>,
    downloads: DownloadCoordinator,
    user_data: UserDataService,
    backends: Arc<dyn BackendFactory>,
}

impl CatalogService {
    /// Opens the configured database (degrading when it cannot be opened)
    /// and talks to Xtream servers.
    pub async fn open(config: &Config) -> Self {
        let store = Store::open(&config.storage.database_path).await;
        let backends = Arc::new(XtreamBackendFactory::new(config.network.clone()));
        Self::new(store, config, backends)
    }

    pub fn new(store: Store, config: &Config, backends: Arc<dyn BackendFactory>) -> Self {
        let event_bus = Arc::new(EventBus::default());
        let cache = Arc::new(ContentCache::new(
            store.clone(),
            event_bus.clone(),
            &config.cache,
        ));

        Self {
            registry: ProfileRegistry::new(store.clone(), event_bus.clone(), &config.profiles),
            session: Session::new(),
            downloads: DownloadCoordinator::new(cache.clone(), store.clone(), event_bus.clone()),
            user_data: UserDataService::new(store.clone(), event_bus.clone(), &config.history),
            cache,
            store,
            event_bus,
            backends,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    async fn session(&self) -> CatalogResult<SessionHandle> {
        self.session.require().await
    }

    // Profiles

    /// Restores the session from the persisted active flag. Only used at
    /// start-up; afterwards the session decides which profile is current.
    pub async fn restore_session(&self) -> CatalogResult<Option<Profile>> {
        let Some(profile) = self.registry.get_active_profile().await else {
            return Ok(None);
        };
        let backend = self.backends.create(&profile)?;
        self.session.activate(profile.clone(), backend).await;
        info!("Restored session for profile {} ({})", profile.name, profile.id);
        Ok(Some(profile))
    }

    pub async fn current_profile(&self) -> Option<Profile> {
        self.session.current_profile().await
    }

    pub async fn list_profiles(&self) -> Vec<Profile> {
        self.registry.list_profiles().await
    }

    /// Validates and saves a new profile.
    pub async fn add_profile(
        &self,
        name: impl Into<String>,
        credentials: Credentials,
    ) -> CatalogResult<Profile> {
        let profile = self.registry.create_profile(name, credentials)?;
        if !self.registry.save_profile(&profile).await {
            return Err(CatalogError::StorageUnavailable(
                "profile could not be saved".to_string(),
            ));
        }
        Ok(profile)
    }

    /// Cancels work of the current profile, activates `id`, swaps the
    /// session, drops the previous profile's cached slices and warms the new
    /// profile's slices from storage.
    pub async fn switch_profile(&self, id: &ProfileId) -> CatalogResult<Profile> {
        let target = self.registry.get_profile(id).await?;
        let backend = self.backends.create(&target)?;

        if let Some(current) = self.session.handle().await {
            current.cancel.cancel();
        }

        let profile = self.registry.set_active_profile(id).await?;
        let previous = self.session.activate(profile.clone(), backend).await;
        if let Some(previous) = previous.filter(|previous| previous != id) {
            self.cache.invalidate(&previous).await;
        }
        self.cache.load_profile_content(id).await;
        Ok(profile)
    }

    pub async fn delete_profile(&self, id: &ProfileId) -> CatalogResult<()> {
        if self.session.is_current(id).await {
            self.session.clear().await;
        }
        self.registry.delete_profile(id).await?;
        self.cache.invalidate(id).await;
        Ok(())
    }

    /// Asks the server whether the profile's credentials work.
    pub async fn test_connection(&self, profile: &Profile) -> CatalogResult<bool> {
        let backend = self.backends.create(profile)?;
        backend
            .test_connection()
            .await
            .map_err(|e| CatalogError::AccountFetchFailed(format!("{:#}", e)))
    }

    /// Refreshes the cached user/server info of the current profile.
    pub async fn refresh_account_info(&self) -> CatalogResult<Profile> {
        let session = self.session().await?;
        let profile = self
            .registry
            .refresh_account_info(session.profile_id(), session.backend.as_ref())
            .await?;
        self.session.update_profile(&profile).await;
        Ok(profile)
    }

    // Catalog

    pub async fn content(
        &self,
        kind: ContentKind,
        category_id: Option<&CategoryId>,
    ) -> CatalogResult<Vec<ContentItem>> {
        let session = self.session().await?;
        Ok(self
            .cache
            .get_content(kind, session.profile_id(), category_id)
            .await)
    }

    pub async fn categories(&self, kind: ContentKind) -> CatalogResult<Vec<Category>> {
        let session = self.session().await?;
        Ok(self.cache.get_categories(kind, session.profile_id()).await)
    }

    pub async fn item(&self, kind: ContentKind, id: &ContentId) -> CatalogResult<ContentItem> {
        let session = self.session().await?;
        self.cache
            .get_item(kind, session.profile_id(), id)
            .await
            .ok_or_else(|| CatalogError::ContentNotFound {
                kind,
                id: id.to_string(),
            })
    }

    pub async fn check_content_exists(&self, kind: ContentKind) -> CatalogResult<bool> {
        let session = self.session().await?;
        Ok(self
            .cache
            .check_content_exists(session.profile_id(), kind)
            .await)
    }

    pub async fn download(&self, kind: ContentKind) -> CatalogResult<usize> {
        let session = self.session().await?;
        self.downloads.download(kind, &session).await
    }

    pub async fn download_all(&self) -> CatalogResult<DownloadReport> {
        let session = self.session().await?;
        Ok(self.downloads.download_all(&session).await)
    }

    /// Direct fetch of the categories and the unfiltered item listing of
    /// `kind`, replacing both together. Does not touch the downloaded flag.
    pub async fn refresh(&self, kind: ContentKind) -> CatalogResult<usize> {
        let session = self.session().await?;
        self.cache
            .fetch_catalog(kind, session.profile_id(), session.backend.as_ref())
            .await
    }

    /// Fetches show details; the episodes are persisted for later reads.
    pub async fn show_details(&self, show_id: &ShowId) -> CatalogResult<ShowDetails> {
        let session = self.session().await?;
        self.cache
            .fetch_show_details(session.profile_id(), session.backend.as_ref(), show_id)
            .await
    }

    pub async fn movie_details(&self, movie_id: &ContentId) -> CatalogResult<MovieDetails> {
        let session = self.session().await?;
        let details = session
            .backend
            .get_item_details(ContentKind::Movie, movie_id)
            .await
            .map_err(|e| CatalogError::from_backend(ContentKind::Movie, e))?;
        match details {
            ItemDetails::Movie(details) => Ok(details),
            ItemDetails::Show(_) => Err(CatalogError::InvalidResponseShape(format!(
                "movie {} returned show details",
                movie_id
            ))),
        }
    }

    /// Stored seasons of a show, fetched once when nothing is stored yet.
    pub async fn episodes(&self, show_id: &ShowId) -> CatalogResult<Seasons> {
        let session = self.session().await?;
        let stored = self.cache.get_episodes(session.profile_id(), show_id).await;
        if !stored.is_empty() {
            return Ok(stored);
        }
        Ok(self.show_details(show_id).await?.seasons)
    }

    /// Playable URL for a stream of the current profile.
    pub async fn stream_url(
        &self,
        kind: StreamKind,
        stream_id: &str,
        extension: &str,
    ) -> CatalogResult<String> {
        let session = self.session().await?;
        build_stream_url(
            &session.profile.credentials,
            &StreamRequest::new(kind, stream_id, extension),
        )
    }

    /// When the current profile's slices were last filled in memory.
    pub async fn cached_at(&self) -> CatalogResult<Option<DateTime<Utc>>> {
        let session = self.session().await?;
        Ok(self.cache.cached_at(session.profile_id()).await)
    }

    pub async fn content_downloaded(&self) -> CatalogResult<ContentDownloaded> {
        let session = self.session().await?;
        Ok(self.downloads.content_downloaded(session.profile_id()).await)
    }

    pub async fn progress(&self) -> CatalogResult<PerKind<DownloadProgress>> {
        let session = self.session().await?;
        Ok(self.downloads.all_progress(session.profile_id()).await)
    }

    /// Wipes the current profile's catalog and downloaded flags.
    pub async fn clear_content(&self) -> CatalogResult<bool> {
        let session = self.session().await?;
        Ok(self.downloads.clear_content(session.profile_id()).await)
    }

    // User data

    pub async fn favorites(&self) -> CatalogResult<Vec<FavoriteItem>> {
        let session = self.session().await?;
        Ok(self.user_data.favorites(session.profile_id()).await)
    }

    /// Favorites a catalog item of the current profile.
    pub async fn add_favorite(&self, kind: ContentKind, id: &ContentId) -> CatalogResult<bool> {
        let session = self.session().await?;
        let item = self.item(kind, id).await?;
        let favorite = FavoriteItem::from_content(session.profile_id().clone(), &item);
        Ok(self.user_data.add_favorite(favorite).await)
    }

    pub async fn remove_favorite(
        &self,
        kind: FavoriteKind,
        id: &ContentId,
    ) -> CatalogResult<bool> {
        let session = self.session().await?;
        Ok(self
            .user_data
            .remove_favorite(session.profile_id(), kind, id)
            .await)
    }

    pub async fn history(&self) -> CatalogResult<Vec<WatchHistoryEntry>> {
        let session = self.session().await?;
        Ok(self.user_data.history(session.profile_id()).await)
    }

    /// Records a view of `id` for the current profile.
    pub async fn record_view(
        &self,
        kind: HistoryKind,
        id: &ContentId,
        name: impl Into<String>,
        position: Option<u32>,
        duration: Option<u32>,
    ) -> CatalogResult<bool> {
        let session = self.session().await?;
        let mut entry =
            WatchHistoryEntry::new(session.profile_id().clone(), kind, id.clone(), name);
        entry.position = position;
        entry.duration = duration;

        let catalog_kind = match kind {
            HistoryKind::Channel => Some(ContentKind::Channel),
            HistoryKind::Movie => Some(ContentKind::Movie),
            HistoryKind::Episode => None,
        };
        if let Some(catalog_kind) = catalog_kind {
            if let Some(item) = self
                .cache
                .get_item(catalog_kind, session.profile_id(), id)
                .await
            {
                entry.stream_icon = item.stream_icon().map(str::to_string);
            }
        }

        Ok(self.user_data.add_to_history(entry).await)
    }

    pub async fn settings(&self) -> AppSettings {
        self.user_data.settings().await
    }

    pub async fn update_settings(&self, update: SettingsUpdate) -> AppSettings {
        let settings = self.user_data.update_settings(update).await;
        if !self.store.is_available() {
            warn!("Settings only live for this session");
        }
        settings
    }
}
