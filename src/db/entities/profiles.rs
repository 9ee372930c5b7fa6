use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{Credentials, Profile, ProfileId};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub url: String,
    pub username: String,
    pub password: String,
    pub format: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime,
    pub last_used: Option<DateTime>,
    #[sea_orm(column_type = "Json")]
    pub cached_user_info: Option<Json>,
    #[sea_orm(column_type = "Json")]
    pub cached_server_info: Option<Json>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Profile {
    type Error = anyhow::Error;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let cached_user_info = model
            .cached_user_info
            .map(serde_json::from_value)
            .transpose()?;
        let cached_server_info = model
            .cached_server_info
            .map(serde_json::from_value)
            .transpose()?;

        Ok(Profile {
            id: ProfileId::new(model.id),
            name: model.name,
            credentials: Credentials {
                url: model.url,
                username: model.username,
                password: model.password,
                format: model.format,
            },
            is_active: model.is_active,
            created_at: model.created_at.and_utc(),
            last_used: model.last_used.map(|t| t.and_utc()),
            cached_user_info,
            cached_server_info,
        })
    }
}

impl TryFrom<&Profile> for Model {
    type Error = anyhow::Error;

    fn try_from(profile: &Profile) -> Result<Self, Self::Error> {
        Ok(Model {
            id: profile.id.to_string(),
            name: profile.name.clone(),
            url: profile.credentials.url.clone(),
            username: profile.credentials.username.clone(),
            password: profile.credentials.password.clone(),
            format: profile.credentials.format.clone(),
            is_active: profile.is_active,
            created_at: profile.created_at.naive_utc(),
            last_used: profile.last_used.map(|t| t.naive_utc()),
            cached_user_info: profile
                .cached_user_info
                .as_ref()
                .map(serde_json::to_value)
                .transpose()?,
            cached_server_info: profile
                .cached_server_info
                .as_ref()
                .map(serde_json::to_value)
                .transpose()?,
        })
    }
}
