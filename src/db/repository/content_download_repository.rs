use super::{BaseRepository, Repository};
use crate::db::entities::{ContentDownload, ContentDownloadModel, content_downloads};
use anyhow::Result;
use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, Set,
};
use std::sync::Arc;

/// Repository trait for the per-profile "content downloaded" markers
#[async_trait]
pub trait ContentDownloadRepository: Repository<ContentDownloadModel> {
    async fn find_by_profile(&self, profile_id: &str) -> Result<Vec<ContentDownloadModel>>;

    /// Record a completed download of `kind`
    async fn mark(&self, profile_id: &str, kind: &str, item_count: u64) -> Result<()>;

    async fn delete_for_profile(&self, profile_id: &str) -> Result<u64>;
}

#[derive(Debug)]
pub struct ContentDownloadRepositoryImpl {
    base: BaseRepository,
}

impl ContentDownloadRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl Repository<ContentDownloadModel> for ContentDownloadRepositoryImpl {
    type Entity = ContentDownload;

    async fn find_by_id(&self, id: &str) -> Result<Option<ContentDownloadModel>> {
        Ok(ContentDownload::find_by_id(id)
            .one(self.base.db.as_ref())
            .await?)
    }

    async fn find_all(&self) -> Result<Vec<ContentDownloadModel>> {
        Ok(ContentDownload::find().all(self.base.db.as_ref()).await?)
    }

    async fn insert(&self, entity: ContentDownloadModel) -> Result<ContentDownloadModel> {
        let active_model = entity.into_active_model().reset_all();
        Ok(active_model.insert(self.base.db.as_ref()).await?)
    }

    async fn update(&self, entity: ContentDownloadModel) -> Result<ContentDownloadModel> {
        let active_model = entity.into_active_model().reset_all();
        Ok(active_model.update(self.base.db.as_ref()).await?)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        ContentDownload::delete_by_id(id)
            .exec(self.base.db.as_ref())
            .await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = ContentDownload::delete_many()
            .exec(self.base.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    async fn count(&self) -> Result<u64> {
        Ok(ContentDownload::find().count(self.base.db.as_ref()).await?)
    }
}

#[async_trait]
impl ContentDownloadRepository for ContentDownloadRepositoryImpl {
    async fn find_by_profile(&self, profile_id: &str) -> Result<Vec<ContentDownloadModel>> {
        Ok(ContentDownload::find()
            .filter(content_downloads::Column::ProfileId.eq(profile_id))
            .all(self.base.db.as_ref())
            .await?)
    }

    async fn mark(&self, profile_id: &str, kind: &str, item_count: u64) -> Result<()> {
        let active_model = content_downloads::ActiveModel {
            id: Set(format!("{}:{}", profile_id, kind)),
            profile_id: Set(profile_id.to_string()),
            kind: Set(kind.to_string()),
            item_count: Set(item_count.min(i32::MAX as u64) as i32),
            downloaded_at: Set(chrono::Utc::now().naive_utc()),
        };
        ContentDownload::insert(active_model)
            .on_conflict(
                OnConflict::column(content_downloads::Column::Id)
                    .update_columns([
                        content_downloads::Column::ItemCount,
                        content_downloads::Column::DownloadedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.base.db.as_ref())
            .await?;
        Ok(())
    }

    async fn delete_for_profile(&self, profile_id: &str) -> Result<u64> {
        let result = ContentDownload::delete_many()
            .filter(content_downloads::Column::ProfileId.eq(profile_id))
            .exec(self.base.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }
}
