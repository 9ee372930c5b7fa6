use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{Episode, ProfileId, ShowId};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "episodes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub profile_id: String,
    pub show_id: String,
    pub remote_id: String,
    pub season: i32,
    pub episode_num: i32,
    #[sea_orm(column_type = "Json")]
    pub data: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn from_episode(
        profile_id: &ProfileId,
        show_id: &ShowId,
        episode: &Episode,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            id: format!("{}:{}:{}", profile_id, show_id, episode.id),
            profile_id: profile_id.to_string(),
            show_id: show_id.to_string(),
            remote_id: episode.id.to_string(),
            season: episode.season as i32,
            episode_num: episode.episode_num as i32,
            data: serde_json::to_value(episode)?,
        })
    }
}

impl TryFrom<Model> for Episode {
    type Error = anyhow::Error;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(serde_json::from_value(model.data)?)
    }
}
