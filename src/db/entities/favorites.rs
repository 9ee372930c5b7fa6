use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{ContentId, FavoriteItem, FavoriteKind, ProfileId};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "favorites")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub profile_id: String,
    pub content_id: String,
    pub item_type: String,
    pub name: String,
    pub stream_icon: Option<String>,
    pub added_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn key(profile_id: &ProfileId, kind: FavoriteKind, content_id: &ContentId) -> String {
        format!("{}:{}:{}", profile_id, kind.as_str(), content_id)
    }
}

impl From<&FavoriteItem> for Model {
    fn from(item: &FavoriteItem) -> Self {
        Self {
            id: Self::key(&item.profile_id, item.kind, &item.id),
            profile_id: item.profile_id.to_string(),
            content_id: item.id.to_string(),
            item_type: item.kind.as_str().to_string(),
            name: item.name.clone(),
            stream_icon: item.stream_icon.clone(),
            added_at: item.added_at.naive_utc(),
        }
    }
}

impl TryFrom<Model> for FavoriteItem {
    type Error = anyhow::Error;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(FavoriteItem {
            id: ContentId::new(model.content_id),
            kind: model.item_type.parse().map_err(anyhow::Error::msg)?,
            name: model.name,
            stream_icon: model.stream_icon,
            added_at: model.added_at.and_utc(),
            profile_id: ProfileId::new(model.profile_id),
        })
    }
}
