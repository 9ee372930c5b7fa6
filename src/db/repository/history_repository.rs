use super::{BaseRepository, Repository};
use crate::db::entities::{WatchHistory, WatchHistoryModel, watch_history};
use anyhow::Result;
use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use std::sync::Arc;

/// Repository trait for watch history entries
#[async_trait]
pub trait HistoryRepository: Repository<WatchHistoryModel> {
    /// Newest first, at most `limit` entries
    async fn find_recent(&self, profile_id: &str, limit: u64) -> Result<Vec<WatchHistoryModel>>;

    /// Insert, or refresh the existing entry with the same key
    async fn upsert(&self, entity: WatchHistoryModel) -> Result<()>;

    /// Delete everything past the newest `keep` entries of a profile
    async fn trim(&self, profile_id: &str, keep: u64) -> Result<u64>;

    async fn delete_for_profile(&self, profile_id: &str) -> Result<u64>;
}

#[derive(Debug)]
pub struct HistoryRepositoryImpl {
    base: BaseRepository,
}

impl HistoryRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl Repository<WatchHistoryModel> for HistoryRepositoryImpl {
    type Entity = WatchHistory;

    async fn find_by_id(&self, id: &str) -> Result<Option<WatchHistoryModel>> {
        Ok(WatchHistory::find_by_id(id)
            .one(self.base.db.as_ref())
            .await?)
    }

    async fn find_all(&self) -> Result<Vec<WatchHistoryModel>> {
        Ok(WatchHistory::find().all(self.base.db.as_ref()).await?)
    }

    async fn insert(&self, entity: WatchHistoryModel) -> Result<WatchHistoryModel> {
        let active_model = entity.into_active_model().reset_all();
        Ok(active_model.insert(self.base.db.as_ref()).await?)
    }

    async fn update(&self, entity: WatchHistoryModel) -> Result<WatchHistoryModel> {
        let active_model = entity.into_active_model().reset_all();
        Ok(active_model.update(self.base.db.as_ref()).await?)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        WatchHistory::delete_by_id(id)
            .exec(self.base.db.as_ref())
            .await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = WatchHistory::delete_many()
            .exec(self.base.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    async fn count(&self) -> Result<u64> {
        Ok(WatchHistory::find().count(self.base.db.as_ref()).await?)
    }
}

#[async_trait]
impl HistoryRepository for HistoryRepositoryImpl {
    async fn find_recent(&self, profile_id: &str, limit: u64) -> Result<Vec<WatchHistoryModel>> {
        Ok(WatchHistory::find()
            .filter(watch_history::Column::ProfileId.eq(profile_id))
            .order_by_desc(watch_history::Column::WatchedAt)
            .limit(limit)
            .all(self.base.db.as_ref())
            .await?)
    }

    async fn upsert(&self, entity: WatchHistoryModel) -> Result<()> {
        let active_model = entity.into_active_model().reset_all();
        WatchHistory::insert(active_model)
            .on_conflict(
                OnConflict::column(watch_history::Column::Id)
                    .update_columns([
                        watch_history::Column::Name,
                        watch_history::Column::StreamIcon,
                        watch_history::Column::WatchedAt,
                        watch_history::Column::DurationSecs,
                        watch_history::Column::PositionSecs,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.base.db.as_ref())
            .await?;
        Ok(())
    }

    async fn trim(&self, profile_id: &str, keep: u64) -> Result<u64> {
        let stale: Vec<String> = WatchHistory::find()
            .filter(watch_history::Column::ProfileId.eq(profile_id))
            .order_by_desc(watch_history::Column::WatchedAt)
            .offset(keep)
            .all(self.base.db.as_ref())
            .await?
            .into_iter()
            .map(|entry| entry.id)
            .collect();

        if stale.is_empty() {
            return Ok(0);
        }

        let result = WatchHistory::delete_many()
            .filter(watch_history::Column::Id.is_in(stale))
            .exec(self.base.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    async fn delete_for_profile(&self, profile_id: &str) -> Result<u64> {
        let result = WatchHistory::delete_many()
            .filter(watch_history::Column::ProfileId.eq(profile_id))
            .exec(self.base.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }
}
