use chrono::{DateTime, Utc};
use lru::LruCache;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::backends::CatalogBackend;
use crate::config::CacheConfig;
use crate::db::Store;
use crate::events::{EventBus, EventType};
use crate::models::{
    Category, CategoryId, ContentId, ContentItem, ContentKind, Episode, ItemDetails, ItemQuery,
    PerKind, ProfileId, Seasons, ShowDetails, ShowId, group_into_seasons,
};
use crate::utils::errors::{CatalogError, CatalogResult};

/// In-memory projection of one profile's catalog. `None` slices were never
/// loaded, `Some(vec![])` slices are known to be empty.
#[derive(Debug, Clone)]
struct ProfileContent {
    items: PerKind<Option<Vec<ContentItem>>>,
    categories: PerKind<Option<Vec<Category>>>,
    touched: Instant,
    last_fetch: DateTime<Utc>,
}

impl ProfileContent {
    fn new() -> Self {
        Self {
            items: PerKind::default(),
            categories: PerKind::default(),
            touched: Instant::now(),
            last_fetch: Utc::now(),
        }
    }

    fn touch(&mut self) {
        self.touched = Instant::now();
        self.last_fetch = Utc::now();
    }

    fn is_expired(&self, ttl: Option<Duration>) -> bool {
        ttl.is_some_and(|ttl| self.touched.elapsed() >= ttl)
    }
}

type Entries = LruCache<ProfileId, ProfileContent>;

/// Profile-scoped catalog cache over the store.
///
/// Reads try memory, then the store; nothing here fetches remotely unless a
/// `fetch_*` method is called. The store stays authoritative; memory is only
/// a shortcut and may be dropped at any time.
#[derive(Debug)]
pub struct ContentCache {
    store: Store,
    event_bus: Arc<EventBus>,
    entries: RwLock<Entries>,
    ttl: Option<Duration>,
}

impl ContentCache {
    pub fn new(store: Store, event_bus: Arc<EventBus>, config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_profiles).unwrap_or(NonZeroUsize::MIN);
        Self {
            store,
            event_bus,
            entries: RwLock::new(LruCache::new(capacity)),
            ttl: config.ttl(),
        }
    }

    /// Live entry for `profile_id`; expired entries are evicted on sight.
    fn live_entry<'a>(
        entries: &'a mut Entries,
        profile_id: &ProfileId,
        ttl: Option<Duration>,
    ) -> Option<&'a mut ProfileContent> {
        let expired = entries
            .peek(profile_id)
            .is_some_and(|entry| entry.is_expired(ttl));
        if expired {
            debug!("Cache entry of profile {} expired", profile_id);
            entries.pop(profile_id);
            return None;
        }
        entries.get_mut(profile_id)
    }

    fn entry_or_insert<'a>(
        entries: &'a mut Entries,
        profile_id: &ProfileId,
        ttl: Option<Duration>,
    ) -> Option<&'a mut ProfileContent> {
        if Self::live_entry(entries, profile_id, ttl).is_none() {
            entries.put(profile_id.clone(), ProfileContent::new());
        }
        entries.get_mut(profile_id)
    }

    /// Whether a replacement may go into memory. When the store is up but
    /// rejected the write, memory keeps mirroring what is stored.
    fn should_mirror(&self, persisted: bool, kind: ContentKind, profile_id: &ProfileId) -> bool {
        if persisted || !self.store.is_available() {
            return true;
        }
        warn!(
            "Storage rejected {} of profile {}; keeping the previous slice",
            kind, profile_id
        );
        false
    }

    async fn cached_items(&self, profile_id: &ProfileId, kind: ContentKind) -> Option<Vec<ContentItem>> {
        let mut entries = self.entries.write().await;
        Self::live_entry(&mut entries, profile_id, self.ttl)
            .and_then(|entry| entry.items.get(kind).clone())
    }

    async fn remember_items(&self, profile_id: &ProfileId, kind: ContentKind, items: Vec<ContentItem>) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = Self::entry_or_insert(&mut entries, profile_id, self.ttl) {
            *entry.items.get_mut(kind) = Some(items);
            entry.touch();
        }
    }

    async fn cached_categories(&self, profile_id: &ProfileId, kind: ContentKind) -> Option<Vec<Category>> {
        let mut entries = self.entries.write().await;
        Self::live_entry(&mut entries, profile_id, self.ttl)
            .and_then(|entry| entry.categories.get(kind).clone())
    }

    async fn remember_categories(
        &self,
        profile_id: &ProfileId,
        kind: ContentKind,
        categories: Vec<Category>,
    ) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = Self::entry_or_insert(&mut entries, profile_id, self.ttl) {
            *entry.categories.get_mut(kind) = Some(categories);
            entry.touch();
        }
    }

    /// Items of `kind` for `profile_id`, optionally limited to one category.
    ///
    /// A category-filtered miss answers from the store's category index
    /// without warming memory. An unfiltered miss warms memory only when the
    /// store has something.
    pub async fn get_content(
        &self,
        kind: ContentKind,
        profile_id: &ProfileId,
        category_id: Option<&CategoryId>,
    ) -> Vec<ContentItem> {
        if let Some(items) = self.cached_items(profile_id, kind).await {
            debug!("Cache hit: {} of profile {}", kind, profile_id);
            return match category_id {
                Some(category_id) => items
                    .into_iter()
                    .filter(|item| item.category_id() == category_id)
                    .collect(),
                None => items,
            };
        }

        if let Some(category_id) = category_id {
            return self
                .store
                .content_in_category(profile_id, kind, category_id)
                .await;
        }

        let items = self.store.content(profile_id, kind).await;
        if !items.is_empty() {
            debug!(
                "Loaded {} {} of profile {} from storage",
                items.len(),
                kind,
                profile_id
            );
            self.remember_items(profile_id, kind, items.clone()).await;
        }
        items
    }

    /// Single item lookup: memory first, then the store.
    pub async fn get_item(
        &self,
        kind: ContentKind,
        profile_id: &ProfileId,
        id: &ContentId,
    ) -> Option<ContentItem> {
        if let Some(items) = self.cached_items(profile_id, kind).await {
            if let Some(item) = items.into_iter().find(|item| item.id() == id) {
                return Some(item);
            }
        }
        self.store.content_item(profile_id, kind, id).await
    }

    /// Replaces the whole `kind` slice of `profile_id` in memory and in the
    /// store. Returns whether the store accepted the write.
    pub async fn set_content(
        &self,
        kind: ContentKind,
        profile_id: &ProfileId,
        mut items: Vec<ContentItem>,
    ) -> bool {
        retain_replaceable(kind, &mut items);

        let persisted = self.store.replace_content(profile_id, kind, &items).await;
        if !self.should_mirror(persisted, kind, profile_id) {
            return false;
        }
        self.remember_items(profile_id, kind, items.clone()).await;
        debug!(
            "Replaced {} {} of profile {} (persisted: {})",
            items.len(),
            kind,
            profile_id,
            persisted
        );

        let _ = self
            .event_bus
            .emit_cache(EventType::CacheUpdated, Some(profile_id.clone()), Some(kind))
            .await;
        persisted
    }

    pub async fn get_categories(&self, kind: ContentKind, profile_id: &ProfileId) -> Vec<Category> {
        if let Some(categories) = self.cached_categories(profile_id, kind).await {
            return categories;
        }

        let categories = self.store.categories(profile_id, kind).await;
        if !categories.is_empty() {
            self.remember_categories(profile_id, kind, categories.clone())
                .await;
        }
        categories
    }

    pub async fn set_categories(
        &self,
        kind: ContentKind,
        profile_id: &ProfileId,
        categories: Vec<Category>,
    ) -> bool {
        let persisted = self
            .store
            .replace_categories(profile_id, kind, &categories)
            .await;
        if !self.should_mirror(persisted, kind, profile_id) {
            return false;
        }
        self.remember_categories(profile_id, kind, categories).await;

        let _ = self
            .event_bus
            .emit_cache(EventType::CacheUpdated, Some(profile_id.clone()), Some(kind))
            .await;
        persisted
    }

    /// Replaces categories and items of `kind` together; the store write is
    /// a single transaction.
    pub async fn set_catalog(
        &self,
        kind: ContentKind,
        profile_id: &ProfileId,
        categories: Vec<Category>,
        mut items: Vec<ContentItem>,
    ) -> bool {
        retain_replaceable(kind, &mut items);
        let persisted = self
            .store
            .replace_catalog(profile_id, kind, &categories, &items)
            .await;
        if !self.should_mirror(persisted, kind, profile_id) {
            return false;
        }

        {
            let mut entries = self.entries.write().await;
            if let Some(entry) = Self::entry_or_insert(&mut entries, profile_id, self.ttl) {
                *entry.categories.get_mut(kind) = Some(categories);
                *entry.items.get_mut(kind) = Some(items);
                entry.touch();
            }
        }

        let _ = self
            .event_bus
            .emit_cache(EventType::CacheUpdated, Some(profile_id.clone()), Some(kind))
            .await;
        persisted
    }

    /// Whether the store holds any `kind` content for the profile, without
    /// loading it.
    pub async fn check_content_exists(&self, profile_id: &ProfileId, kind: ContentKind) -> bool {
        self.store.has_content(profile_id, kind).await
    }

    /// Warms all six slices of a profile from the store and returns the item
    /// counts.
    pub async fn load_profile_content(&self, profile_id: &ProfileId) -> PerKind<usize> {
        let mut loaded = ProfileContent::new();
        let mut counts = PerKind::<usize>::default();
        for kind in ContentKind::ALL {
            let items = self.store.content(profile_id, kind).await;
            let categories = self.store.categories(profile_id, kind).await;
            *counts.get_mut(kind) = items.len();
            *loaded.items.get_mut(kind) = Some(items);
            *loaded.categories.get_mut(kind) = Some(categories);
        }

        self.entries.write().await.put(profile_id.clone(), loaded);
        info!(
            "Loaded profile {}: {} channels, {} movies, {} shows",
            profile_id, counts.channels, counts.movies, counts.shows
        );
        counts
    }

    /// When the memory entry of a profile was last filled.
    pub async fn cached_at(&self, profile_id: &ProfileId) -> Option<DateTime<Utc>> {
        let entries = self.entries.read().await;
        entries
            .peek(profile_id)
            .filter(|entry| !entry.is_expired(self.ttl))
            .map(|entry| entry.last_fetch)
    }

    pub async fn invalidate(&self, profile_id: &ProfileId) {
        let removed = self.entries.write().await.pop(profile_id).is_some();
        if removed {
            debug!("Invalidated cache of profile {}", profile_id);
            let _ = self
                .event_bus
                .emit_cache(EventType::CacheInvalidated, Some(profile_id.clone()), None)
                .await;
        }
    }

    pub async fn invalidate_all(&self) {
        self.entries.write().await.clear();
        let _ = self
            .event_bus
            .emit_cache(EventType::CacheInvalidated, None, None)
            .await;
    }

    /// Episodes of a show grouped by season. Episodes live in the store
    /// only.
    pub async fn get_episodes(&self, profile_id: &ProfileId, show_id: &ShowId) -> Seasons {
        group_into_seasons(self.store.episodes(profile_id, show_id).await)
    }

    pub async fn set_episodes(
        &self,
        profile_id: &ProfileId,
        show_id: &ShowId,
        seasons: &Seasons,
    ) -> bool {
        let episodes: Vec<Episode> = seasons.values().flatten().cloned().collect();
        self.store
            .replace_episodes(profile_id, show_id, &episodes)
            .await
    }

    /// Fetches every item of `kind` without a category filter and replaces
    /// the slice. On failure the cached slice is left as it was.
    pub async fn fetch_content(
        &self,
        kind: ContentKind,
        profile_id: &ProfileId,
        backend: &dyn CatalogBackend,
    ) -> CatalogResult<Vec<ContentItem>> {
        let items = backend
            .get_items(kind, &ItemQuery::all())
            .await
            .map_err(|e| CatalogError::from_backend(kind, e))?;
        self.set_content(kind, profile_id, items.clone()).await;
        Ok(items)
    }

    /// Fetches the categories and the unfiltered listing of `kind`, then
    /// replaces both in one write. Nothing changes unless both fetches
    /// succeed.
    pub async fn fetch_catalog(
        &self,
        kind: ContentKind,
        profile_id: &ProfileId,
        backend: &dyn CatalogBackend,
    ) -> CatalogResult<usize> {
        let categories = backend
            .get_categories(kind)
            .await
            .map_err(|e| CatalogError::from_backend(kind, e))?;
        let mut items = backend
            .get_items(kind, &ItemQuery::all())
            .await
            .map_err(|e| CatalogError::from_backend(kind, e))?;

        retain_replaceable(kind, &mut items);
        let count = items.len();
        if !self.set_catalog(kind, profile_id, categories, items).await
            && self.store.is_available()
        {
            return Err(CatalogError::StorageUnavailable(format!(
                "{} of profile {} could not be written",
                kind, profile_id
            )));
        }
        Ok(count)
    }

    /// Fetches show details and persists its episodes.
    pub async fn fetch_show_details(
        &self,
        profile_id: &ProfileId,
        backend: &dyn CatalogBackend,
        show_id: &ShowId,
    ) -> CatalogResult<ShowDetails> {
        let content_id = ContentId::new(show_id.as_str());
        let details = backend
            .get_item_details(ContentKind::Show, &content_id)
            .await
            .map_err(|e| CatalogError::from_backend(ContentKind::Show, e))?;

        let ItemDetails::Show(details) = details else {
            return Err(CatalogError::InvalidResponseShape(format!(
                "show {} returned movie details",
                show_id
            )));
        };

        if !self
            .set_episodes(profile_id, show_id, &details.seasons)
            .await
        {
            warn!("Episodes of show {} were not persisted", show_id);
        }
        Ok(details)
    }
}

/// Drops items of another kind and repeated ids, keeping first occurrences.
fn retain_replaceable(kind: ContentKind, items: &mut Vec<ContentItem>) {
    let mut seen = HashSet::new();
    items.retain(|item| {
        if item.kind() != kind {
            warn!(
                "Dropping {} item {} from {} replacement",
                item.kind().as_str(),
                item.id(),
                kind
            );
            return false;
        }
        seen.insert(item.id().clone())
    });
}
