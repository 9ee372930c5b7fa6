use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{ContentId, ContentItem, ContentKind, ProfileId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FavoriteKind {
    Channel,
    Movie,
    Show,
}

impl FavoriteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FavoriteKind::Channel => "channel",
            FavoriteKind::Movie => "movie",
            FavoriteKind::Show => "show",
        }
    }
}

impl From<ContentKind> for FavoriteKind {
    fn from(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Channel => FavoriteKind::Channel,
            ContentKind::Movie => FavoriteKind::Movie,
            ContentKind::Show => FavoriteKind::Show,
        }
    }
}

impl FromStr for FavoriteKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentKind::from_str(s).map(FavoriteKind::from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    Channel,
    Movie,
    Episode,
}

impl HistoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryKind::Channel => "channel",
            HistoryKind::Movie => "movie",
            HistoryKind::Episode => "episode",
        }
    }
}

impl FromStr for HistoryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "channel" => Ok(HistoryKind::Channel),
            "movie" => Ok(HistoryKind::Movie),
            "episode" => Ok(HistoryKind::Episode),
            other => Err(format!("unknown history type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteItem {
    pub id: ContentId,
    pub kind: FavoriteKind,
    pub name: String,
    pub stream_icon: Option<String>,
    pub added_at: DateTime<Utc>,
    pub profile_id: ProfileId,
}

impl FavoriteItem {
    /// Favorite entry for a catalog item, stamped now.
    pub fn from_content(profile_id: ProfileId, item: &ContentItem) -> Self {
        Self {
            id: item.id().clone(),
            kind: item.kind().into(),
            name: item.name().to_string(),
            stream_icon: item.stream_icon().map(str::to_string),
            added_at: Utc::now(),
            profile_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchHistoryEntry {
    pub id: ContentId,
    pub kind: HistoryKind,
    pub name: String,
    pub stream_icon: Option<String>,
    pub watched_at: DateTime<Utc>,
    /// Seconds
    pub duration: Option<u32>,
    /// Seconds
    pub position: Option<u32>,
    pub profile_id: ProfileId,
}

impl WatchHistoryEntry {
    pub fn new(
        profile_id: ProfileId,
        kind: HistoryKind,
        id: ContentId,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            stream_icon: None,
            watched_at: Utc::now(),
            duration: None,
            position: None,
            profile_id,
        }
    }

    pub fn with_position(mut self, position: u32, duration: Option<u32>) -> Self {
        self.position = Some(position);
        self.duration = duration;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub theme: Theme,
    pub autoplay: bool,
    pub default_quality: String,
    pub always_on_top: bool,
    pub minimize_to_tray: bool,
    pub start_with_system: bool,
    pub enable_notifications: bool,
    /// Megabytes
    pub cache_size: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            autoplay: false,
            default_quality: "m3u8".to_string(),
            always_on_top: false,
            minimize_to_tray: true,
            start_with_system: false,
            enable_notifications: true,
            cache_size: 500,
        }
    }
}

/// Partial settings change; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    pub theme: Option<Theme>,
    pub autoplay: Option<bool>,
    pub default_quality: Option<String>,
    pub always_on_top: Option<bool>,
    pub minimize_to_tray: Option<bool>,
    pub start_with_system: Option<bool>,
    pub enable_notifications: Option<bool>,
    pub cache_size: Option<u32>,
}

impl AppSettings {
    pub fn merge(mut self, update: SettingsUpdate) -> Self {
        if let Some(theme) = update.theme {
            self.theme = theme;
        }
        if let Some(autoplay) = update.autoplay {
            self.autoplay = autoplay;
        }
        if let Some(quality) = update.default_quality {
            self.default_quality = quality;
        }
        if let Some(on_top) = update.always_on_top {
            self.always_on_top = on_top;
        }
        if let Some(tray) = update.minimize_to_tray {
            self.minimize_to_tray = tray;
        }
        if let Some(start) = update.start_with_system {
            self.start_with_system = start;
        }
        if let Some(notify) = update.enable_notifications {
            self.enable_notifications = notify;
        }
        if let Some(size) = update.cache_size {
            self.cache_size = size;
        }
        self
    }
}
