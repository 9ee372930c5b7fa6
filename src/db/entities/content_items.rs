use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{ContentItem, ProfileId};

/// Channels, movies and shows in one table, partitioned by `kind`.
/// The full record lives in `data`; the other columns back the indexes.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "content_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub profile_id: String,
    pub kind: String,
    pub remote_id: String,
    pub category_id: String,
    pub name: String,
    pub stream_icon: Option<String>,
    pub position: i32,
    #[sea_orm(column_type = "Json")]
    pub data: Json,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn from_item(
        profile_id: &ProfileId,
        item: &ContentItem,
        position: usize,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            id: super::row_key(profile_id, item.kind(), item.id().as_str()),
            profile_id: profile_id.to_string(),
            kind: item.kind().as_str().to_string(),
            remote_id: item.id().to_string(),
            category_id: item.category_id().to_string(),
            name: item.name().to_string(),
            stream_icon: item.stream_icon().map(str::to_string),
            position: position as i32,
            data: serde_json::to_value(item)?,
            updated_at: chrono::Utc::now().naive_utc(),
        })
    }
}

impl TryFrom<Model> for ContentItem {
    type Error = anyhow::Error;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(serde_json::from_value(model.data)?)
    }
}
