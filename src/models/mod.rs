mod identifiers;
pub mod profile;
pub mod stream;
pub mod user_data;

pub use identifiers::{CategoryId, ContentId, ProfileId, ShowId};
pub use profile::{Credentials, Profile, ServerInfo, UserInfo};
pub use stream::{StreamKind, StreamRequest, build_stream_url};
pub use user_data::{
    AppSettings, FavoriteItem, FavoriteKind, HistoryKind, SettingsUpdate, Theme, WatchHistoryEntry,
};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The three catalog partitions a profile can download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Channel,
    Movie,
    Show,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [ContentKind::Channel, ContentKind::Movie, ContentKind::Show];

    /// Storage discriminator.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Channel => "channel",
            ContentKind::Movie => "movie",
            ContentKind::Show => "show",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            ContentKind::Channel => "channels",
            ContentKind::Movie => "movies",
            ContentKind::Show => "shows",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.plural())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "channel" | "channels" | "live" => Ok(ContentKind::Channel),
            "movie" | "movies" | "vod" => Ok(ContentKind::Movie),
            "show" | "shows" | "series" => Ok(ContentKind::Show),
            other => Err(format!("unknown content kind: {}", other)),
        }
    }
}

/// One value per content kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerKind<T> {
    pub channels: T,
    pub movies: T,
    pub shows: T,
}

impl<T> PerKind<T> {
    pub fn get(&self, kind: ContentKind) -> &T {
        match kind {
            ContentKind::Channel => &self.channels,
            ContentKind::Movie => &self.movies,
            ContentKind::Show => &self.shows,
        }
    }

    pub fn get_mut(&mut self, kind: ContentKind) -> &mut T {
        match kind {
            ContentKind::Channel => &mut self.channels,
            ContentKind::Movie => &mut self.movies,
            ContentKind::Show => &mut self.shows,
        }
    }
}

/// `{ channels, movies, shows }` flags: content of that kind was fully
/// downloaded and persisted for a profile at least once.
pub type ContentDownloaded = PerKind<bool>;

/// Bulk download progress of a single kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub is_downloading: bool,
    pub progress: usize,
    pub total: usize,
}

impl DownloadProgress {
    pub fn started() -> Self {
        Self {
            is_downloading: true,
            progress: 0,
            total: 0,
        }
    }

    pub fn finished(count: usize) -> Self {
        Self {
            is_downloading: false,
            progress: count,
            total: count,
        }
    }

    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            0
        } else {
            ((self.progress as f64 / self.total as f64) * 100.0) as u32
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub parent_id: Option<String>,
    pub kind: ContentKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ContentId,
    pub name: String,
    pub category_id: CategoryId,
    pub stream_type: String,
    pub stream_icon: Option<String>,
    pub epg_channel_id: Option<String>,
    pub added: Option<String>,
    pub custom_sid: Option<String>,
    pub tv_archive: u32,
    pub tv_archive_duration: Option<u32>,
    pub direct_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: ContentId,
    pub name: String,
    pub category_id: CategoryId,
    pub stream_type: String,
    pub stream_icon: Option<String>,
    pub rating: Option<f32>,
    pub year: Option<u32>,
    pub added: Option<String>,
    pub container_extension: String,
    pub custom_sid: Option<String>,
    pub direct_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Show {
    pub id: ContentId,
    pub name: String,
    pub category_id: CategoryId,
    pub stream_icon: Option<String>,
    pub rating: Option<f32>,
    pub year: Option<u32>,
    pub added: Option<String>,
    pub last_modified: Option<String>,
}

/// A catalog record of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentItem {
    Channel(Channel),
    Movie(Movie),
    Show(Show),
}

impl ContentItem {
    pub fn kind(&self) -> ContentKind {
        match self {
            ContentItem::Channel(_) => ContentKind::Channel,
            ContentItem::Movie(_) => ContentKind::Movie,
            ContentItem::Show(_) => ContentKind::Show,
        }
    }

    pub fn id(&self) -> &ContentId {
        match self {
            ContentItem::Channel(c) => &c.id,
            ContentItem::Movie(m) => &m.id,
            ContentItem::Show(s) => &s.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ContentItem::Channel(c) => &c.name,
            ContentItem::Movie(m) => &m.name,
            ContentItem::Show(s) => &s.name,
        }
    }

    pub fn category_id(&self) -> &CategoryId {
        match self {
            ContentItem::Channel(c) => &c.category_id,
            ContentItem::Movie(m) => &m.category_id,
            ContentItem::Show(s) => &s.category_id,
        }
    }

    pub fn stream_icon(&self) -> Option<&str> {
        match self {
            ContentItem::Channel(c) => c.stream_icon.as_deref(),
            ContentItem::Movie(m) => m.stream_icon.as_deref(),
            ContentItem::Show(s) => s.stream_icon.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeInfo {
    pub movie_image: Option<String>,
    pub plot: Option<String>,
    pub cast: Option<String>,
    pub director: Option<String>,
    pub genre: Option<String>,
    pub release_date: Option<String>,
    pub rating: Option<f32>,
    pub tmdb_id: Option<u64>,
    pub duration_secs: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: ContentId,
    pub episode_num: u32,
    pub season: u32,
    pub title: String,
    pub container_extension: String,
    pub added: Option<String>,
    pub custom_sid: Option<String>,
    pub info: EpisodeInfo,
}

/// Season number to episodes ordered by episode number.
pub type Seasons = BTreeMap<u32, Vec<Episode>>;

/// Groups episodes by season, ordering each season by episode number.
pub fn group_into_seasons(episodes: impl IntoIterator<Item = Episode>) -> Seasons {
    let mut seasons = Seasons::new();
    for episode in episodes {
        seasons.entry(episode.season).or_default().push(episode);
    }
    for list in seasons.values_mut() {
        list.sort_by_key(|e| e.episode_num);
    }
    seasons
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetails {
    pub movie: Movie,
    pub plot: Option<String>,
    pub cast: Option<String>,
    pub director: Option<String>,
    pub genre: Option<String>,
    pub release_date: Option<String>,
    pub rating_5based: Option<f32>,
    pub backdrop_path: Vec<String>,
    pub youtube_trailer: Option<String>,
    pub tmdb_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowDetails {
    pub show: Show,
    pub plot: Option<String>,
    pub cast: Option<String>,
    pub director: Option<String>,
    pub genre: Option<String>,
    pub release_date: Option<String>,
    pub rating_5based: Option<f32>,
    pub backdrop_path: Vec<String>,
    pub youtube_trailer: Option<String>,
    pub tmdb_id: Option<String>,
    pub seasons: Seasons,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemDetails {
    Movie(MovieDetails),
    Show(ShowDetails),
}

/// Filter and client-side paging for item listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemQuery {
    pub category_id: Option<CategoryId>,
    /// 1-based
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl ItemQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn in_category(category_id: CategoryId) -> Self {
        Self {
            category_id: Some(category_id),
            ..Self::default()
        }
    }

    pub fn with_page(mut self, page: usize, limit: usize) -> Self {
        self.page = Some(page);
        self.limit = Some(limit);
        self
    }

    /// Applies `page`/`limit` to an already filtered listing.
    pub fn paginate<T>(&self, items: Vec<T>) -> Vec<T> {
        match self.limit {
            Some(limit) => {
                let page = self.page.unwrap_or(1).max(1);
                items
                    .into_iter()
                    .skip((page - 1).saturating_mul(limit))
                    .take(limit)
                    .collect()
            }
            None => items,
        }
    }
}
