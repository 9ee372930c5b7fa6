use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ContentKind, DownloadProgress, ProfileId};

/// Event published on the catalog bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEvent {
    pub id: String,
    pub event_type: EventType,
    pub payload: EventPayload,
    pub timestamp: DateTime<Utc>,
}

impl CatalogEvent {
    pub fn new(event_type: EventType, payload: EventPayload) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type,
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Profile the event concerns, if any.
    pub fn profile_id(&self) -> Option<&ProfileId> {
        match &self.payload {
            EventPayload::Profile { id, .. } => Some(id),
            EventPayload::Download { profile_id, .. } => Some(profile_id),
            EventPayload::Cache { profile_id, .. } => profile_id.as_ref(),
            EventPayload::Settings { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventType {
    ProfileCreated,
    ProfileUpdated,
    ProfileDeleted,
    ProfileActivated,

    DownloadStarted,
    DownloadProgress,
    DownloadCompleted,
    DownloadFailed,
    DownloadCancelled,

    CacheInvalidated,
    CacheUpdated,
    ContentCleared,

    FavoritesChanged,
    HistoryChanged,
    SettingsChanged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Profile {
        id: ProfileId,
        name: Option<String>,
    },
    Download {
        profile_id: ProfileId,
        kind: ContentKind,
        progress: DownloadProgress,
        error: Option<String>,
    },
    /// `None` fields mean every profile or every kind.
    Cache {
        profile_id: Option<ProfileId>,
        kind: Option<ContentKind>,
    },
    Settings {
        key: String,
    },
}
