use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::HistoryConfig;
use crate::db::Store;
use crate::events::{CatalogEvent, EventBus, EventPayload, EventType};
use crate::models::{
    AppSettings, ContentId, FavoriteItem, FavoriteKind, ProfileId, SettingsUpdate,
    WatchHistoryEntry,
};

/// Favorites, watch history and application settings.
#[derive(Debug, Clone)]
pub struct UserDataService {
    store: Store,
    event_bus: Arc<EventBus>,
    history_limit: usize,
}

impl UserDataService {
    pub fn new(store: Store, event_bus: Arc<EventBus>, config: &HistoryConfig) -> Self {
        Self {
            store,
            event_bus,
            history_limit: config.max_entries,
        }
    }

    async fn notify(&self, event_type: EventType, profile_id: &ProfileId) {
        let _ = self
            .event_bus
            .publish(CatalogEvent::new(
                event_type,
                EventPayload::Profile {
                    id: profile_id.clone(),
                    name: None,
                },
            ))
            .await;
    }

    pub async fn favorites(&self, profile_id: &ProfileId) -> Vec<FavoriteItem> {
        self.store.favorites(profile_id).await
    }

    pub async fn favorites_of_kind(
        &self,
        profile_id: &ProfileId,
        kind: FavoriteKind,
    ) -> Vec<FavoriteItem> {
        self.store.favorites_of_kind(profile_id, kind).await
    }

    pub async fn is_favorite(
        &self,
        profile_id: &ProfileId,
        kind: FavoriteKind,
        id: &ContentId,
    ) -> bool {
        self.store.favorite_exists(profile_id, kind, id).await
    }

    /// Adds `item` unless the same id and type is already a favorite.
    /// Returns whether something was added.
    pub async fn add_favorite(&self, item: FavoriteItem) -> bool {
        if self
            .is_favorite(&item.profile_id, item.kind, &item.id)
            .await
        {
            debug!("{} {} already a favorite", item.kind.as_str(), item.id);
            return false;
        }
        if !self.store.put_favorite(&item).await {
            warn!("Favorite {} was not persisted", item.id);
            return false;
        }
        self.notify(EventType::FavoritesChanged, &item.profile_id)
            .await;
        true
    }

    pub async fn remove_favorite(
        &self,
        profile_id: &ProfileId,
        kind: FavoriteKind,
        id: &ContentId,
    ) -> bool {
        if !self.is_favorite(profile_id, kind, id).await {
            return false;
        }
        let removed = self.store.delete_favorite(profile_id, kind, id).await;
        if removed {
            self.notify(EventType::FavoritesChanged, profile_id).await;
        }
        removed
    }

    /// Newest first, at most `history.max_entries`.
    pub async fn history(&self, profile_id: &ProfileId) -> Vec<WatchHistoryEntry> {
        self.store.history(profile_id, self.history_limit).await
    }

    /// Records a view. An existing entry of the same id and type moves to the
    /// front and keeps its position/duration unless new ones are given.
    pub async fn add_to_history(&self, mut entry: WatchHistoryEntry) -> bool {
        if let Some(existing) = self
            .store
            .history_entry(&entry.profile_id, entry.kind, &entry.id)
            .await
        {
            entry.position = entry.position.or(existing.position);
            entry.duration = entry.duration.or(existing.duration);
            entry.stream_icon = entry.stream_icon.or(existing.stream_icon);
        }

        if !self.store.put_history(&entry).await {
            warn!("History entry {} was not persisted", entry.id);
            return false;
        }
        self.store
            .trim_history(&entry.profile_id, self.history_limit)
            .await;
        self.notify(EventType::HistoryChanged, &entry.profile_id)
            .await;
        true
    }

    /// Stored settings, or defaults when none were saved.
    pub async fn settings(&self) -> AppSettings {
        self.store.settings().await.unwrap_or_default()
    }

    /// Merges `update` into the stored settings and returns the result.
    pub async fn update_settings(&self, update: SettingsUpdate) -> AppSettings {
        let settings = self.settings().await.merge(update);
        if self.store.put_settings(&settings).await {
            let _ = self.event_bus.emit_settings_changed("app").await;
        } else {
            warn!("Settings were not persisted");
        }
        settings
    }
}
