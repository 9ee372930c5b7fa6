use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::content_cache::ContentCache;
use super::session::SessionHandle;
use crate::backends::CatalogBackend;
use crate::db::Store;
use crate::events::{EventBus, EventType};
use crate::models::{
    Category, ContentDownloaded, ContentItem, ContentKind, DownloadProgress, ItemQuery, PerKind,
    ProfileId,
};
use crate::utils::errors::{CatalogError, CatalogResult};

/// Outcome of `download_all`, one result per kind.
pub type DownloadReport = PerKind<CatalogResult<usize>>;

/// Category-by-category bulk retrieval of a content kind.
///
/// A run either replaces the categories and items of its kind as one unit
/// and sets the content-downloaded flag, or leaves stored data untouched.
#[derive(Debug)]
pub struct DownloadCoordinator {
    cache: Arc<ContentCache>,
    store: Store,
    event_bus: Arc<EventBus>,
    progress: RwLock<HashMap<(ProfileId, ContentKind), DownloadProgress>>,
}

impl DownloadCoordinator {
    pub fn new(cache: Arc<ContentCache>, store: Store, event_bus: Arc<EventBus>) -> Self {
        Self {
            cache,
            store,
            event_bus,
            progress: RwLock::new(HashMap::new()),
        }
    }

    pub async fn progress(&self, profile_id: &ProfileId, kind: ContentKind) -> DownloadProgress {
        self.progress
            .read()
            .await
            .get(&(profile_id.clone(), kind))
            .copied()
            .unwrap_or_default()
    }

    pub async fn all_progress(&self, profile_id: &ProfileId) -> PerKind<DownloadProgress> {
        let progress = self.progress.read().await;
        let mut result = PerKind::<DownloadProgress>::default();
        for kind in ContentKind::ALL {
            if let Some(state) = progress.get(&(profile_id.clone(), kind)) {
                *result.get_mut(kind) = *state;
            }
        }
        result
    }

    /// Persisted content-downloaded flags of a profile.
    pub async fn content_downloaded(&self, profile_id: &ProfileId) -> ContentDownloaded {
        self.store.downloaded_flags(profile_id).await
    }

    async fn set_progress(&self, profile_id: &ProfileId, kind: ContentKind, state: DownloadProgress) {
        self.progress
            .write()
            .await
            .insert((profile_id.clone(), kind), state);
    }

    /// Marks the kind as downloading unless a run is already in flight.
    async fn claim(&self, profile_id: &ProfileId, kind: ContentKind) -> CatalogResult<()> {
        let mut progress = self.progress.write().await;
        let state = progress.entry((profile_id.clone(), kind)).or_default();
        if state.is_downloading {
            return Err(CatalogError::DownloadInProgress(kind));
        }
        *state = DownloadProgress::started();
        Ok(())
    }

    /// Downloads every category of `kind` for the session's profile and
    /// returns the number of items stored.
    pub async fn download(&self, kind: ContentKind, session: &SessionHandle) -> CatalogResult<usize> {
        let profile_id = session.profile_id().clone();
        self.claim(&profile_id, kind).await?;

        info!("Starting {} download for profile {}", kind, profile_id);
        let _ = self
            .event_bus
            .emit_download(
                EventType::DownloadStarted,
                profile_id.clone(),
                kind,
                DownloadProgress::started(),
                None,
            )
            .await;

        let outcome = match self
            .fetch_all(kind, &profile_id, session.backend.as_ref(), &session.cancel)
            .await
        {
            Ok((categories, items)) => self.commit(kind, &profile_id, categories, items).await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok(count) => {
                let done = DownloadProgress::finished(count);
                self.set_progress(&profile_id, kind, done).await;
                info!(
                    "Finished {} download for profile {}: {} items",
                    kind, profile_id, count
                );
                let _ = self
                    .event_bus
                    .emit_download(
                        EventType::DownloadCompleted,
                        profile_id.clone(),
                        kind,
                        done,
                        None,
                    )
                    .await;
                Ok(count)
            }
            Err(err) => {
                self.set_progress(&profile_id, kind, DownloadProgress::default())
                    .await;
                let event_type = if matches!(err, CatalogError::Cancelled(_)) {
                    info!("{} download for profile {} cancelled", kind, profile_id);
                    EventType::DownloadCancelled
                } else {
                    error!(
                        "{} download for profile {} failed: {}",
                        kind, profile_id, err
                    );
                    EventType::DownloadFailed
                };
                let _ = self
                    .event_bus
                    .emit_download(
                        event_type,
                        profile_id.clone(),
                        kind,
                        DownloadProgress::default(),
                        Some(err.to_string()),
                    )
                    .await;
                Err(err)
            }
        }
    }

    /// Writes a finished run. A store that is up but rejects the write fails
    /// the run; an unavailable store keeps it in memory only, flag unset.
    async fn commit(
        &self,
        kind: ContentKind,
        profile_id: &ProfileId,
        categories: Vec<Category>,
        items: Vec<ContentItem>,
    ) -> CatalogResult<usize> {
        let count = items.len();
        if self
            .cache
            .set_catalog(kind, profile_id, categories, items)
            .await
        {
            self.store.mark_downloaded(profile_id, kind, count).await;
            return Ok(count);
        }

        if self.store.is_available() {
            return Err(CatalogError::StorageUnavailable(format!(
                "{} of profile {} could not be written",
                kind, profile_id
            )));
        }
        warn!(
            "{} of profile {} were not persisted; downloaded flag stays unset",
            kind, profile_id
        );
        Ok(count)
    }

    /// Sequential per-category fetch. Progress after each category is
    /// `{ accumulated, accumulated + 1 }`; items repeated across categories
    /// are counted once.
    async fn fetch_all(
        &self,
        kind: ContentKind,
        profile_id: &ProfileId,
        backend: &dyn CatalogBackend,
        cancel: &CancellationToken,
    ) -> CatalogResult<(Vec<Category>, Vec<ContentItem>)> {
        if cancel.is_cancelled() {
            return Err(CatalogError::Cancelled(kind));
        }

        let categories = backend
            .get_categories(kind)
            .await
            .map_err(|e| CatalogError::from_backend(kind, e))?;
        debug!("{} categories of {} to download", categories.len(), kind);

        let mut seen = HashSet::new();
        let mut accumulated: Vec<ContentItem> = Vec::new();
        for category in &categories {
            if cancel.is_cancelled() {
                return Err(CatalogError::Cancelled(kind));
            }

            let items = backend
                .get_items(kind, &ItemQuery::in_category(category.id.clone()))
                .await
                .map_err(|e| CatalogError::from_backend(kind, e))?;
            debug!(
                "Category {} ({}) returned {} {}",
                category.name,
                category.id,
                items.len(),
                kind
            );

            accumulated.extend(
                items
                    .into_iter()
                    .filter(|item| seen.insert(item.id().clone())),
            );

            let state = DownloadProgress {
                is_downloading: true,
                progress: accumulated.len(),
                total: accumulated.len() + 1,
            };
            self.set_progress(profile_id, kind, state).await;
            let _ = self
                .event_bus
                .emit_download(
                    EventType::DownloadProgress,
                    profile_id.clone(),
                    kind,
                    state,
                    None,
                )
                .await;
        }

        if cancel.is_cancelled() {
            return Err(CatalogError::Cancelled(kind));
        }
        Ok((categories, accumulated))
    }

    /// Runs the three kinds concurrently; each result is independent.
    pub async fn download_all(&self, session: &SessionHandle) -> DownloadReport {
        let (channels, movies, shows) = tokio::join!(
            self.download(ContentKind::Channel, session),
            self.download(ContentKind::Movie, session),
            self.download(ContentKind::Show, session),
        );
        PerKind {
            channels,
            movies,
            shows,
        }
    }

    /// Wipes catalog data and downloaded flags of a profile.
    pub async fn clear_content(&self, profile_id: &ProfileId) -> bool {
        let cleared = self.store.purge_profile_content(profile_id).await;
        self.cache.invalidate(profile_id).await;
        self.progress
            .write()
            .await
            .retain(|(id, _), state| id != profile_id || state.is_downloading);

        let _ = self
            .event_bus
            .emit_cache(EventType::ContentCleared, Some(profile_id.clone()), None)
            .await;
        info!("Cleared content of profile {} (persisted: {})", profile_id, cleared);
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::events::EventPayload;
    use crate::models::{Credentials, Profile};
    use crate::test_utils::{MockCatalogBackend, TestDatabase};

    struct Fixture {
        _db: TestDatabase,
        store: Store,
        bus: Arc<EventBus>,
        cache: Arc<ContentCache>,
        coordinator: DownloadCoordinator,
    }

    async fn fixture() -> Fixture {
        let db = TestDatabase::new().await.unwrap();
        let store = Store::from_connection(db.connection());
        let bus = Arc::new(EventBus::new(1024));
        let cache = Arc::new(ContentCache::new(
            store.clone(),
            bus.clone(),
            &CacheConfig::default(),
        ));
        let coordinator = DownloadCoordinator::new(cache.clone(), store.clone(), bus.clone());
        Fixture {
            _db: db,
            store,
            bus,
            cache,
            coordinator,
        }
    }

    fn session(backend: MockCatalogBackend) -> SessionHandle {
        SessionHandle {
            profile: Profile::new("A", Credentials::new("http://tv.example.com", "u", "p")),
            backend: Arc::new(backend),
            cancel: CancellationToken::new(),
        }
    }

    fn channel_backend() -> MockCatalogBackend {
        MockCatalogBackend::new()
            .with_category(ContentKind::Channel, "1", 10)
            .with_category(ContentKind::Channel, "2", 15)
            .with_category(ContentKind::Channel, "3", 7)
    }

    fn download_progress(events: Vec<crate::events::CatalogEvent>) -> Vec<DownloadProgress> {
        events
            .into_iter()
            .filter_map(|event| match event.payload {
                EventPayload::Download { progress, .. } => Some(progress),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_download_channels_scenario() {
        let f = fixture().await;
        let mut events = f.bus.subscribe();
        let session = session(channel_backend());
        let profile_id = session.profile_id().clone();

        let count = f
            .coordinator
            .download(ContentKind::Channel, &session)
            .await
            .unwrap();

        assert_eq!(count, 32);
        assert_eq!(f.store.count_content(&profile_id, ContentKind::Channel).await, 32);
        assert_eq!(f.store.categories(&profile_id, ContentKind::Channel).await.len(), 3);
        assert!(f.coordinator.content_downloaded(&profile_id).await.channels);
        assert_eq!(
            f.coordinator.progress(&profile_id, ContentKind::Channel).await,
            DownloadProgress::finished(32)
        );

        let progress = download_progress(events.drain());
        assert_eq!(progress.last(), Some(&DownloadProgress::finished(32)));
        assert!(progress.windows(2).all(|w| w[0].progress <= w[1].progress));
        let running: Vec<(usize, usize)> = progress
            .iter()
            .filter(|p| p.is_downloading && p.progress > 0)
            .map(|p| (p.progress, p.total))
            .collect();
        assert_eq!(running, vec![(10, 11), (25, 26), (32, 33)]);
    }

    #[tokio::test]
    async fn test_failed_category_leaves_previous_content() {
        let f = fixture().await;
        let good = session(
            MockCatalogBackend::new()
                .with_category(ContentKind::Movie, "1", 4)
                .with_category(ContentKind::Movie, "2", 4)
                .with_category(ContentKind::Movie, "3", 4),
        );
        let profile_id = good.profile_id().clone();
        f.coordinator.download(ContentKind::Movie, &good).await.unwrap();
        let before = f.store.content(&profile_id, ContentKind::Movie).await;

        let failing = SessionHandle {
            backend: Arc::new(
                MockCatalogBackend::new()
                    .with_category(ContentKind::Movie, "1", 9)
                    .with_category(ContentKind::Movie, "2", 9)
                    .with_category(ContentKind::Movie, "3", 9)
                    .fail_on_item_request(2),
            ),
            ..good.clone()
        };
        let err = f
            .coordinator
            .download(ContentKind::Movie, &failing)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CatalogError::RemoteFetchFailed {
                kind: ContentKind::Movie,
                ..
            }
        ));
        assert_eq!(f.store.content(&profile_id, ContentKind::Movie).await, before);
        assert_eq!(
            f.cache.get_content(ContentKind::Movie, &profile_id, None).await,
            before
        );
        assert_eq!(
            f.coordinator.progress(&profile_id, ContentKind::Movie).await,
            DownloadProgress::default()
        );
        assert!(f.coordinator.content_downloaded(&profile_id).await.movies);
    }

    #[tokio::test]
    async fn test_failure_without_prior_download_keeps_flag_unset() {
        let f = fixture().await;
        let session = session(
            MockCatalogBackend::new()
                .with_category(ContentKind::Show, "1", 2)
                .with_category(ContentKind::Show, "2", 2)
                .fail_on_item_request(2),
        );
        let profile_id = session.profile_id().clone();

        assert!(f.coordinator.download(ContentKind::Show, &session).await.is_err());
        assert!(!f.coordinator.content_downloaded(&profile_id).await.shows);
        assert!(!f.cache.check_content_exists(&profile_id, ContentKind::Show).await);
    }

    #[tokio::test]
    async fn test_rejected_write_fails_the_run() {
        use sea_orm::ConnectionTrait;

        let f = fixture().await;
        let session = session(channel_backend());
        let profile_id = session.profile_id().clone();
        f._db
            .connection()
            .execute_unprepared("DROP TABLE categories")
            .await
            .unwrap();

        let err = f
            .coordinator
            .download(ContentKind::Channel, &session)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::StorageUnavailable(_)));
        assert!(
            f.cache
                .get_content(ContentKind::Channel, &profile_id, None)
                .await
                .is_empty()
        );
        assert!(!f.coordinator.content_downloaded(&profile_id).await.channels);
        assert_eq!(
            f.coordinator.progress(&profile_id, ContentKind::Channel).await,
            DownloadProgress::default()
        );
    }

    #[tokio::test]
    async fn test_cancelled_download_persists_nothing() {
        let f = fixture().await;
        let session = session(channel_backend());
        let profile_id = session.profile_id().clone();
        session.cancel.cancel();

        let err = f
            .coordinator
            .download(ContentKind::Channel, &session)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Cancelled(ContentKind::Channel)));
        assert_eq!(f.store.count_content(&profile_id, ContentKind::Channel).await, 0);
        assert!(!f.coordinator.content_downloaded(&profile_id).await.channels);
    }

    #[tokio::test]
    async fn test_concurrent_download_of_same_kind_is_rejected() {
        let f = fixture().await;
        let session = session(channel_backend().with_delay(std::time::Duration::from_millis(50)));

        let (first, second) = tokio::join!(
            f.coordinator.download(ContentKind::Channel, &session),
            f.coordinator.download(ContentKind::Channel, &session),
        );
        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().any(|r| matches!(
            r,
            Err(CatalogError::DownloadInProgress(ContentKind::Channel))
        )));
    }

    #[tokio::test]
    async fn test_download_all_failure_is_isolated() {
        let f = fixture().await;
        let session = session(
            MockCatalogBackend::new()
                .with_category(ContentKind::Channel, "1", 3)
                .with_category(ContentKind::Movie, "2", 4)
                .with_category(ContentKind::Show, "3", 5)
                .failing_kind(ContentKind::Movie),
        );
        let profile_id = session.profile_id().clone();

        let report = f.coordinator.download_all(&session).await;
        assert_eq!(report.channels.as_ref().ok(), Some(&3));
        assert!(report.movies.is_err());
        assert_eq!(report.shows.as_ref().ok(), Some(&5));

        let flags = f.coordinator.content_downloaded(&profile_id).await;
        assert!(flags.channels && flags.shows && !flags.movies);
    }

    #[tokio::test]
    async fn test_clear_content_resets_flags() {
        let f = fixture().await;
        let session = session(channel_backend());
        let profile_id = session.profile_id().clone();
        f.coordinator.download(ContentKind::Channel, &session).await.unwrap();

        assert!(f.coordinator.clear_content(&profile_id).await);
        assert!(!f.coordinator.content_downloaded(&profile_id).await.channels);
        assert!(
            f.cache
                .get_content(ContentKind::Channel, &profile_id, None)
                .await
                .is_empty()
        );
        assert_eq!(
            f.coordinator.progress(&profile_id, ContentKind::Channel).await,
            DownloadProgress::default()
        );
    }
}
