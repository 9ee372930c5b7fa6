//! Typed access to every persisted collection.
//!
//! The store never fails: when the database could not be opened, or a
//! statement errors, the failure is logged and the call degrades to an empty
//! read or an unsuccessful write. Write methods return whether the data was
//! durably written, so callers can keep derived state such as the
//! content-downloaded flags honest.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use super::connection::{Database, DatabaseConnection};
use super::entities::{
    CategoryModel, ContentItemModel, EpisodeModel, FavoriteModel, ProfileModel,
    WatchHistoryModel, content_downloads, favorites, settings::APP_SETTINGS_KEY, watch_history,
};
use super::repository::{
    CategoryRepository, CategoryRepositoryImpl, ContentDownloadRepository,
    ContentDownloadRepositoryImpl, ContentRepository, ContentRepositoryImpl, EpisodeRepository,
    EpisodeRepositoryImpl, FavoriteRepository, FavoriteRepositoryImpl, HistoryRepository,
    HistoryRepositoryImpl, ProfileRepository, ProfileRepositoryImpl, Repository,
    SettingsRepository, SettingsRepositoryImpl,
};
use crate::models::{
    AppSettings, Category, CategoryId, ContentDownloaded, ContentId, ContentItem, ContentKind,
    Episode, FavoriteItem, FavoriteKind, HistoryKind, Profile, ProfileId, ServerInfo, ShowId,
    UserInfo, WatchHistoryEntry,
};

/// Persisted collections, for whole-collection operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Profiles,
    Categories,
    Content,
    Episodes,
    Favorites,
    History,
    Settings,
    Downloads,
}

#[derive(Debug)]
struct Repositories {
    profiles: ProfileRepositoryImpl,
    categories: CategoryRepositoryImpl,
    content: ContentRepositoryImpl,
    episodes: EpisodeRepositoryImpl,
    favorites: FavoriteRepositoryImpl,
    history: HistoryRepositoryImpl,
    settings: SettingsRepositoryImpl,
    downloads: ContentDownloadRepositoryImpl,
}

impl Repositories {
    fn new(db: DatabaseConnection) -> Self {
        Self {
            profiles: ProfileRepositoryImpl::new(db.clone()),
            categories: CategoryRepositoryImpl::new(db.clone()),
            content: ContentRepositoryImpl::new(db.clone()),
            episodes: EpisodeRepositoryImpl::new(db.clone()),
            favorites: FavoriteRepositoryImpl::new(db.clone()),
            history: HistoryRepositoryImpl::new(db.clone()),
            settings: SettingsRepositoryImpl::new(db.clone()),
            downloads: ContentDownloadRepositoryImpl::new(db),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Store {
    inner: Option<Arc<Repositories>>,
}

fn swallow<T: Default>(op: &str, result: anyhow::Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!("Storage operation {} failed: {:#}", op, e);
            T::default()
        }
    }
}

fn written(op: &str, result: anyhow::Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("Storage write {} failed: {:#}", op, e);
            false
        }
    }
}

/// Converts rows to domain records, skipping rows that no longer decode.
fn decode_rows<M, T>(op: &str, rows: Vec<M>) -> Vec<T>
where
    T: TryFrom<M, Error = anyhow::Error>,
{
    rows.into_iter()
        .filter_map(|row| match T::try_from(row) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Skipping undecodable row in {}: {:#}", op, e);
                None
            }
        })
        .collect()
}

fn decode_row<M, T>(op: &str, row: Option<M>) -> Option<T>
where
    T: TryFrom<M, Error = anyhow::Error>,
{
    decode_rows(op, row.into_iter().collect()).pop()
}

impl Store {
    /// Opens and migrates the database at `path`, degrading to an
    /// unavailable store when that fails.
    pub async fn open(path: &Path) -> Self {
        match Database::open(path).await {
            Ok(db) => Self::from_connection(db.connection()),
            Err(e) => {
                warn!("Storage unavailable, continuing without persistence: {:#}", e);
                Self::unavailable()
            }
        }
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(db: DatabaseConnection) -> Self {
        Self {
            inner: Some(Arc::new(Repositories::new(db))),
        }
    }

    /// A store where every read is empty and every write is dropped.
    pub fn unavailable() -> Self {
        Self { inner: None }
    }

    pub fn is_available(&self) -> bool {
        self.inner.is_some()
    }

    fn repos(&self, op: &str) -> Option<&Repositories> {
        if self.inner.is_none() {
            debug!("Storage unavailable, skipping {}", op);
        }
        self.inner.as_deref()
    }

    // Profiles

    pub async fn list_profiles(&self) -> Vec<Profile> {
        let Some(repos) = self.repos("list_profiles") else {
            return Vec::new();
        };
        let rows = swallow("list_profiles", repos.profiles.find_all().await);
        decode_rows("profiles", rows)
    }

    pub async fn get_profile(&self, id: &ProfileId) -> Option<Profile> {
        let repos = self.repos("get_profile")?;
        let row = swallow("get_profile", repos.profiles.find_by_id(id.as_str()).await);
        decode_row("profiles", row)
    }

    pub async fn active_profile(&self) -> Option<Profile> {
        let repos = self.repos("active_profile")?;
        let row = swallow("active_profile", repos.profiles.find_active().await);
        decode_row("profiles", row)
    }

    pub async fn save_profile(&self, profile: &Profile) -> bool {
        let Some(repos) = self.repos("save_profile") else {
            return false;
        };
        let result = async {
            let model = ProfileModel::try_from(profile)?;
            repos.profiles.upsert(model).await
        }
        .await;
        written("save_profile", result)
    }

    pub async fn delete_profile(&self, id: &ProfileId) -> bool {
        let Some(repos) = self.repos("delete_profile") else {
            return false;
        };
        written("delete_profile", repos.profiles.delete(id.as_str()).await)
    }

    /// Exclusive activation in one transaction; false when `id` is unknown.
    pub async fn set_active_profile(&self, id: &ProfileId) -> bool {
        let Some(repos) = self.repos("set_active_profile") else {
            return false;
        };
        swallow(
            "set_active_profile",
            repos.profiles.set_active(id.as_str()).await,
        )
    }

    pub async fn update_account_info(
        &self,
        id: &ProfileId,
        user_info: Option<&UserInfo>,
        server_info: Option<&ServerInfo>,
    ) -> bool {
        let Some(repos) = self.repos("update_account_info") else {
            return false;
        };
        let result = async {
            let user = user_info.map(serde_json::to_value).transpose()?;
            let server = server_info.map(serde_json::to_value).transpose()?;
            repos
                .profiles
                .update_account_info(id.as_str(), user, server)
                .await
        }
        .await;
        written("update_account_info", result)
    }

    // Catalog

    pub async fn categories(&self, profile_id: &ProfileId, kind: ContentKind) -> Vec<Category> {
        let Some(repos) = self.repos("categories") else {
            return Vec::new();
        };
        let rows = swallow(
            "categories",
            repos
                .categories
                .find_by_profile_kind(profile_id.as_str(), kind.as_str())
                .await,
        );
        decode_rows("categories", rows)
    }

    pub async fn replace_categories(
        &self,
        profile_id: &ProfileId,
        kind: ContentKind,
        categories: &[Category],
    ) -> bool {
        let Some(repos) = self.repos("replace_categories") else {
            return false;
        };
        let rows = category_rows(profile_id, categories);
        written(
            "replace_categories",
            repos
                .categories
                .replace_for_profile_kind(profile_id.as_str(), kind.as_str(), rows)
                .await,
        )
    }

    pub async fn content(&self, profile_id: &ProfileId, kind: ContentKind) -> Vec<ContentItem> {
        let Some(repos) = self.repos("content") else {
            return Vec::new();
        };
        let rows = swallow(
            "content",
            repos
                .content
                .find_by_profile_kind(profile_id.as_str(), kind.as_str())
                .await,
        );
        decode_rows("content_items", rows)
    }

    pub async fn content_in_category(
        &self,
        profile_id: &ProfileId,
        kind: ContentKind,
        category_id: &CategoryId,
    ) -> Vec<ContentItem> {
        let Some(repos) = self.repos("content_in_category") else {
            return Vec::new();
        };
        let rows = swallow(
            "content_in_category",
            repos
                .content
                .find_by_category(profile_id.as_str(), kind.as_str(), category_id.as_str())
                .await,
        );
        decode_rows("content_items", rows)
    }

    pub async fn content_item(
        &self,
        profile_id: &ProfileId,
        kind: ContentKind,
        id: &ContentId,
    ) -> Option<ContentItem> {
        let repos = self.repos("content_item")?;
        let key = super::entities::row_key(profile_id, kind, id.as_str());
        let row = swallow("content_item", repos.content.find_by_id(&key).await);
        decode_row("content_items", row)
    }

    /// Existence check that does not load the partition.
    pub async fn has_content(&self, profile_id: &ProfileId, kind: ContentKind) -> bool {
        let Some(repos) = self.repos("has_content") else {
            return false;
        };
        swallow(
            "has_content",
            repos
                .content
                .exists_for(profile_id.as_str(), kind.as_str())
                .await,
        )
    }

    pub async fn count_content(&self, profile_id: &ProfileId, kind: ContentKind) -> u64 {
        let Some(repos) = self.repos("count_content") else {
            return 0;
        };
        swallow(
            "count_content",
            repos
                .content
                .count_for(profile_id.as_str(), kind.as_str())
                .await,
        )
    }

    pub async fn replace_content(
        &self,
        profile_id: &ProfileId,
        kind: ContentKind,
        items: &[ContentItem],
    ) -> bool {
        let Some(repos) = self.repos("replace_content") else {
            return false;
        };
        let result = async {
            let rows = item_rows(profile_id, kind, items)?;
            repos
                .content
                .replace_for_profile_kind(profile_id.as_str(), kind.as_str(), rows)
                .await
        }
        .await;
        written("replace_content", result)
    }

    /// Replaces the categories and the items of `kind` as one unit.
    pub async fn replace_catalog(
        &self,
        profile_id: &ProfileId,
        kind: ContentKind,
        categories: &[Category],
        items: &[ContentItem],
    ) -> bool {
        let Some(repos) = self.repos("replace_catalog") else {
            return false;
        };
        let result = async {
            let category_rows = category_rows(profile_id, categories);
            let rows = item_rows(profile_id, kind, items)?;
            repos
                .content
                .replace_catalog(profile_id.as_str(), kind.as_str(), category_rows, rows)
                .await
        }
        .await;
        written("replace_catalog", result)
    }

    pub async fn episodes(&self, profile_id: &ProfileId, show_id: &ShowId) -> Vec<Episode> {
        let Some(repos) = self.repos("episodes") else {
            return Vec::new();
        };
        let rows = swallow(
            "episodes",
            repos
                .episodes
                .find_by_show(profile_id.as_str(), show_id.as_str())
                .await,
        );
        decode_rows("episodes", rows)
    }

    pub async fn replace_episodes(
        &self,
        profile_id: &ProfileId,
        show_id: &ShowId,
        episodes: &[Episode],
    ) -> bool {
        let Some(repos) = self.repos("replace_episodes") else {
            return false;
        };
        let result = async {
            let rows = episodes
                .iter()
                .map(|e| EpisodeModel::from_episode(profile_id, show_id, e))
                .collect::<anyhow::Result<Vec<_>>>()?;
            repos
                .episodes
                .replace_for_show(profile_id.as_str(), show_id.as_str(), rows)
                .await
        }
        .await;
        written("replace_episodes", result)
    }

    // Content-downloaded flags

    pub async fn downloaded_flags(&self, profile_id: &ProfileId) -> ContentDownloaded {
        let Some(repos) = self.repos("downloaded_flags") else {
            return ContentDownloaded::default();
        };
        let rows = swallow(
            "downloaded_flags",
            repos.downloads.find_by_profile(profile_id.as_str()).await,
        );
        let mut flags = ContentDownloaded::default();
        for kind in rows.iter().filter_map(content_downloads::Model::content_kind) {
            *flags.get_mut(kind) = true;
        }
        flags
    }

    pub async fn mark_downloaded(
        &self,
        profile_id: &ProfileId,
        kind: ContentKind,
        item_count: usize,
    ) -> bool {
        let Some(repos) = self.repos("mark_downloaded") else {
            return false;
        };
        written(
            "mark_downloaded",
            repos
                .downloads
                .mark(profile_id.as_str(), kind.as_str(), item_count as u64)
                .await,
        )
    }

    /// Removes every catalog row and download flag of a profile.
    pub async fn purge_profile_content(&self, profile_id: &ProfileId) -> bool {
        let Some(repos) = self.repos("purge_profile_content") else {
            return false;
        };
        let id = profile_id.as_str();
        let result = async {
            repos.content.delete_for_profile(id).await?;
            repos.categories.delete_for_profile(id).await?;
            repos.episodes.delete_for_profile(id).await?;
            repos.downloads.delete_for_profile(id).await?;
            Ok::<(), anyhow::Error>(())
        }
        .await;
        written("purge_profile_content", result)
    }

    /// Removes favorites and watch history of a profile.
    pub async fn purge_profile_user_data(&self, profile_id: &ProfileId) -> bool {
        let Some(repos) = self.repos("purge_profile_user_data") else {
            return false;
        };
        let id = profile_id.as_str();
        let result = async {
            repos.favorites.delete_for_profile(id).await?;
            repos.history.delete_for_profile(id).await?;
            Ok::<(), anyhow::Error>(())
        }
        .await;
        written("purge_profile_user_data", result)
    }

    // Favorites

    pub async fn favorites(&self, profile_id: &ProfileId) -> Vec<FavoriteItem> {
        let Some(repos) = self.repos("favorites") else {
            return Vec::new();
        };
        let rows = swallow(
            "favorites",
            repos.favorites.find_by_profile(profile_id.as_str()).await,
        );
        decode_rows("favorites", rows)
    }

    pub async fn favorites_of_kind(
        &self,
        profile_id: &ProfileId,
        kind: FavoriteKind,
    ) -> Vec<FavoriteItem> {
        let Some(repos) = self.repos("favorites_of_kind") else {
            return Vec::new();
        };
        let rows = swallow(
            "favorites_of_kind",
            repos
                .favorites
                .find_by_profile_type(profile_id.as_str(), kind.as_str())
                .await,
        );
        decode_rows("favorites", rows)
    }

    pub async fn favorite_exists(
        &self,
        profile_id: &ProfileId,
        kind: FavoriteKind,
        id: &ContentId,
    ) -> bool {
        let Some(repos) = self.repos("favorite_exists") else {
            return false;
        };
        let key = favorites::Model::key(profile_id, kind, id);
        swallow("favorite_exists", repos.favorites.find_by_id(&key).await).is_some()
    }

    /// No-op when the same id and kind is already a favorite.
    pub async fn put_favorite(&self, item: &FavoriteItem) -> bool {
        let Some(repos) = self.repos("put_favorite") else {
            return false;
        };
        written(
            "put_favorite",
            repos
                .favorites
                .insert_if_absent(FavoriteModel::from(item))
                .await,
        )
    }

    pub async fn delete_favorite(
        &self,
        profile_id: &ProfileId,
        kind: FavoriteKind,
        id: &ContentId,
    ) -> bool {
        let Some(repos) = self.repos("delete_favorite") else {
            return false;
        };
        let key = favorites::Model::key(profile_id, kind, id);
        written("delete_favorite", repos.favorites.delete(&key).await)
    }

    // Watch history

    pub async fn history(&self, profile_id: &ProfileId, limit: usize) -> Vec<WatchHistoryEntry> {
        let Some(repos) = self.repos("history") else {
            return Vec::new();
        };
        let rows = swallow(
            "history",
            repos
                .history
                .find_recent(profile_id.as_str(), limit as u64)
                .await,
        );
        decode_rows("watch_history", rows)
    }

    pub async fn history_entry(
        &self,
        profile_id: &ProfileId,
        kind: HistoryKind,
        id: &ContentId,
    ) -> Option<WatchHistoryEntry> {
        let repos = self.repos("history_entry")?;
        let key = watch_history::Model::key(profile_id, kind, id);
        let row = swallow("history_entry", repos.history.find_by_id(&key).await);
        decode_row("watch_history", row)
    }

    pub async fn put_history(&self, entry: &WatchHistoryEntry) -> bool {
        let Some(repos) = self.repos("put_history") else {
            return false;
        };
        written(
            "put_history",
            repos.history.upsert(WatchHistoryModel::from(entry)).await,
        )
    }

    pub async fn trim_history(&self, profile_id: &ProfileId, keep: usize) -> bool {
        let Some(repos) = self.repos("trim_history") else {
            return false;
        };
        let result = repos
            .history
            .trim(profile_id.as_str(), keep as u64)
            .await
            .map(|_| ());
        written("trim_history", result)
    }

    // Settings

    pub async fn settings(&self) -> Option<AppSettings> {
        let repos = self.repos("settings")?;
        let value = swallow("settings", repos.settings.get_value(APP_SETTINGS_KEY).await)?;
        match serde_json::from_value(value) {
            Ok(settings) => Some(settings),
            Err(e) => {
                warn!("Ignoring unreadable settings row: {}", e);
                None
            }
        }
    }

    pub async fn put_settings(&self, settings: &AppSettings) -> bool {
        let Some(repos) = self.repos("put_settings") else {
            return false;
        };
        let result = async {
            let value = serde_json::to_value(settings)?;
            repos.settings.put_value(APP_SETTINGS_KEY, value).await
        }
        .await;
        written("put_settings", result)
    }

    // Whole collections

    pub async fn count(&self, collection: Collection) -> u64 {
        let Some(repos) = self.repos("count") else {
            return 0;
        };
        let result = match collection {
            Collection::Profiles => repos.profiles.count().await,
            Collection::Categories => repos.categories.count().await,
            Collection::Content => repos.content.count().await,
            Collection::Episodes => repos.episodes.count().await,
            Collection::Favorites => repos.favorites.count().await,
            Collection::History => repos.history.count().await,
            Collection::Settings => repos.settings.count().await,
            Collection::Downloads => repos.downloads.count().await,
        };
        swallow("count", result)
    }

    pub async fn clear(&self, collection: Collection) -> bool {
        let Some(repos) = self.repos("clear") else {
            return false;
        };
        let result = match collection {
            Collection::Profiles => repos.profiles.delete_all().await,
            Collection::Categories => repos.categories.delete_all().await,
            Collection::Content => repos.content.delete_all().await,
            Collection::Episodes => repos.episodes.delete_all().await,
            Collection::Favorites => repos.favorites.delete_all().await,
            Collection::History => repos.history.delete_all().await,
            Collection::Settings => repos.settings.delete_all().await,
            Collection::Downloads => repos.downloads.delete_all().await,
        };
        written("clear", result.map(|_| ()))
    }
}

/// Rows for a category write; repeated ids keep their first occurrence.
fn category_rows(profile_id: &ProfileId, categories: &[Category]) -> Vec<CategoryModel> {
    let mut seen = HashSet::new();
    categories
        .iter()
        .filter(|category| seen.insert(category.id.as_str()))
        .enumerate()
        .map(|(position, category)| CategoryModel::from_category(profile_id, category, position))
        .collect()
}

/// Rows for a partition write; items of another kind are dropped with a
/// warning and repeated ids keep their first occurrence.
fn item_rows(
    profile_id: &ProfileId,
    kind: ContentKind,
    items: &[ContentItem],
) -> anyhow::Result<Vec<ContentItemModel>> {
    let mut seen = HashSet::new();
    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        if item.kind() != kind {
            warn!(
                "Dropping {} {} from a {} write",
                item.kind().as_str(),
                item.id(),
                kind.as_str()
            );
            continue;
        }
        if !seen.insert(item.id().as_str()) {
            debug!("Skipping repeated {} {}", kind.as_str(), item.id());
            continue;
        }
        rows.push(ContentItemModel::from_item(profile_id, item, rows.len())?);
    }
    Ok(rows)
}
