use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{Category, CategoryId, ContentKind, ProfileId};

/// Categories of one profile and kind, keyed `{profile}:{kind}:{remote id}`
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub profile_id: String,
    pub kind: String,
    pub remote_id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn from_category(profile_id: &ProfileId, category: &Category, position: usize) -> Self {
        Self {
            id: super::row_key(profile_id, category.kind, category.id.as_str()),
            profile_id: profile_id.to_string(),
            kind: category.kind.as_str().to_string(),
            remote_id: category.id.to_string(),
            name: category.name.clone(),
            parent_id: category.parent_id.clone(),
            position: position as i32,
        }
    }
}

impl TryFrom<Model> for Category {
    type Error = anyhow::Error;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let kind: ContentKind = model.kind.parse().map_err(anyhow::Error::msg)?;
        Ok(Category {
            id: CategoryId::new(model.remote_id),
            name: model.name,
            parent_id: model.parent_id,
            kind,
        })
    }
}
