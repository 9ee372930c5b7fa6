use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::ContentKind;

/// One row per profile and kind whose catalog was fully downloaded
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "content_downloads")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub profile_id: String,
    pub kind: String,
    pub item_count: i32,
    pub downloaded_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn content_kind(&self) -> Option<ContentKind> {
        self.kind.parse().ok()
    }
}
