use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{ContentId, HistoryKind, ProfileId, WatchHistoryEntry};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "watch_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub profile_id: String,
    pub content_id: String,
    pub item_type: String,
    pub name: String,
    pub stream_icon: Option<String>,
    pub watched_at: DateTime,
    pub duration_secs: Option<i32>,
    pub position_secs: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn key(profile_id: &ProfileId, kind: HistoryKind, content_id: &ContentId) -> String {
        format!("{}:{}:{}", profile_id, kind.as_str(), content_id)
    }
}

impl From<&WatchHistoryEntry> for Model {
    fn from(entry: &WatchHistoryEntry) -> Self {
        Self {
            id: Self::key(&entry.profile_id, entry.kind, &entry.id),
            profile_id: entry.profile_id.to_string(),
            content_id: entry.id.to_string(),
            item_type: entry.kind.as_str().to_string(),
            name: entry.name.clone(),
            stream_icon: entry.stream_icon.clone(),
            watched_at: entry.watched_at.naive_utc(),
            duration_secs: entry.duration.map(|d| d as i32),
            position_secs: entry.position.map(|p| p as i32),
        }
    }
}

impl TryFrom<Model> for WatchHistoryEntry {
    type Error = anyhow::Error;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(WatchHistoryEntry {
            id: ContentId::new(model.content_id),
            kind: model.item_type.parse().map_err(anyhow::Error::msg)?,
            name: model.name,
            stream_icon: model.stream_icon,
            watched_at: model.watched_at.and_utc(),
            duration: model.duration_secs.map(|d| d.max(0) as u32),
            position: model.position_secs.map(|p| p.max(0) as u32),
            profile_id: ProfileId::new(model.profile_id),
        })
    }
}
