pub mod categories;
pub mod content_downloads;
pub mod content_items;
pub mod episodes;
pub mod favorites;
pub mod profiles;
pub mod settings;
pub mod watch_history;

use crate::models::{ContentKind, ProfileId};

// Re-export entities for convenience
pub use categories::{
    ActiveModel as CategoryActiveModel, Entity as CategoryEntity, Model as CategoryModel,
};
pub use content_downloads::{
    ActiveModel as ContentDownloadActiveModel, Entity as ContentDownload,
    Model as ContentDownloadModel,
};
pub use content_items::{
    ActiveModel as ContentItemActiveModel, Entity as ContentItemEntity, Model as ContentItemModel,
};
pub use episodes::{
    ActiveModel as EpisodeActiveModel, Entity as EpisodeEntity, Model as EpisodeModel,
};
pub use favorites::{
    ActiveModel as FavoriteActiveModel, Entity as Favorite, Model as FavoriteModel,
};
pub use profiles::{
    ActiveModel as ProfileActiveModel, Entity as ProfileEntity, Model as ProfileModel,
};
pub use settings::{ActiveModel as SettingActiveModel, Entity as Setting, Model as SettingModel};
pub use watch_history::{
    ActiveModel as WatchHistoryActiveModel, Entity as WatchHistory, Model as WatchHistoryModel,
};

/// Primary key of a catalog row: the same remote id under two profiles never collides.
pub fn row_key(profile_id: &ProfileId, kind: ContentKind, remote_id: &str) -> String {
    format!("{}:{}:{}", profile_id, kind.as_str(), remote_id)
}
