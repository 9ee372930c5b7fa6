use super::{BaseRepository, Repository};
use crate::db::entities::{Setting, SettingModel, settings};
use anyhow::Result;
use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, PaginatorTrait, Set,
};
use std::sync::Arc;

/// Repository trait for keyed JSON settings
#[async_trait]
pub trait SettingsRepository: Repository<SettingModel> {
    async fn get_value(&self, key: &str) -> Result<Option<serde_json::Value>>;

    async fn put_value(&self, key: &str, value: serde_json::Value) -> Result<()>;
}

#[derive(Debug)]
pub struct SettingsRepositoryImpl {
    base: BaseRepository,
}

impl SettingsRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl Repository<SettingModel> for SettingsRepositoryImpl {
    type Entity = Setting;

    async fn find_by_id(&self, id: &str) -> Result<Option<SettingModel>> {
        Ok(Setting::find_by_id(id).one(self.base.db.as_ref()).await?)
    }

    async fn find_all(&self) -> Result<Vec<SettingModel>> {
        Ok(Setting::find().all(self.base.db.as_ref()).await?)
    }

    async fn insert(&self, entity: SettingModel) -> Result<SettingModel> {
        let active_model = entity.into_active_model().reset_all();
        Ok(active_model.insert(self.base.db.as_ref()).await?)
    }

    async fn update(&self, entity: SettingModel) -> Result<SettingModel> {
        let active_model = entity.into_active_model().reset_all();
        Ok(active_model.update(self.base.db.as_ref()).await?)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        Setting::delete_by_id(id)
            .exec(self.base.db.as_ref())
            .await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = Setting::delete_many().exec(self.base.db.as_ref()).await?;
        Ok(result.rows_affected)
    }

    async fn count(&self) -> Result<u64> {
        Ok(Setting::find().count(self.base.db.as_ref()).await?)
    }
}

#[async_trait]
impl SettingsRepository for SettingsRepositoryImpl {
    async fn get_value(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.find_by_id(key).await?.map(|row| row.value))
    }

    async fn put_value(&self, key: &str, value: serde_json::Value) -> Result<()> {
        let active_model = settings::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value),
            updated_at: Set(chrono::Utc::now().naive_utc()),
        };
        Setting::insert(active_model)
            .on_conflict(
                OnConflict::column(settings::Column::Key)
                    .update_columns([settings::Column::Value, settings::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(self.base.db.as_ref())
            .await?;
        Ok(())
    }
}
