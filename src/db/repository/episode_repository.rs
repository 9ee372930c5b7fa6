use super::{BaseRepository, INSERT_BATCH_SIZE, Repository};
use crate::db::entities::{EpisodeActiveModel, EpisodeEntity, EpisodeModel, episodes};
use anyhow::Result;
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use std::sync::Arc;

/// Repository trait for Episode entities
#[async_trait]
pub trait EpisodeRepository: Repository<EpisodeModel> {
    /// Episodes of a show ordered by season then episode number
    async fn find_by_show(&self, profile_id: &str, show_id: &str) -> Result<Vec<EpisodeModel>>;

    async fn replace_for_show(
        &self,
        profile_id: &str,
        show_id: &str,
        episodes: Vec<EpisodeModel>,
    ) -> Result<()>;

    async fn delete_for_profile(&self, profile_id: &str) -> Result<u64>;
}

#[derive(Debug)]
pub struct EpisodeRepositoryImpl {
    base: BaseRepository,
}

impl EpisodeRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl Repository<EpisodeModel> for EpisodeRepositoryImpl {
    type Entity = EpisodeEntity;

    async fn find_by_id(&self, id: &str) -> Result<Option<EpisodeModel>> {
        Ok(EpisodeEntity::find_by_id(id)
            .one(self.base.db.as_ref())
            .await?)
    }

    async fn find_all(&self) -> Result<Vec<EpisodeModel>> {
        Ok(EpisodeEntity::find().all(self.base.db.as_ref()).await?)
    }

    async fn insert(&self, entity: EpisodeModel) -> Result<EpisodeModel> {
        let active_model = entity.into_active_model().reset_all();
        Ok(active_model.insert(self.base.db.as_ref()).await?)
    }

    async fn update(&self, entity: EpisodeModel) -> Result<EpisodeModel> {
        let active_model = entity.into_active_model().reset_all();
        Ok(active_model.update(self.base.db.as_ref()).await?)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        EpisodeEntity::delete_by_id(id)
            .exec(self.base.db.as_ref())
            .await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = EpisodeEntity::delete_many()
            .exec(self.base.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    async fn count(&self) -> Result<u64> {
        Ok(EpisodeEntity::find().count(self.base.db.as_ref()).await?)
    }
}

#[async_trait]
impl EpisodeRepository for EpisodeRepositoryImpl {
    async fn find_by_show(&self, profile_id: &str, show_id: &str) -> Result<Vec<EpisodeModel>> {
        Ok(EpisodeEntity::find()
            .filter(episodes::Column::ProfileId.eq(profile_id))
            .filter(episodes::Column::ShowId.eq(show_id))
            .order_by_asc(episodes::Column::Season)
            .order_by_asc(episodes::Column::EpisodeNum)
            .all(self.base.db.as_ref())
            .await?)
    }

    async fn replace_for_show(
        &self,
        profile_id: &str,
        show_id: &str,
        episodes: Vec<EpisodeModel>,
    ) -> Result<()> {
        let txn = self.base.db.begin().await?;

        EpisodeEntity::delete_many()
            .filter(episodes::Column::ProfileId.eq(profile_id))
            .filter(episodes::Column::ShowId.eq(show_id))
            .exec(&txn)
            .await?;

        let active_models: Vec<EpisodeActiveModel> = episodes
            .into_iter()
            .map(|e| e.into_active_model().reset_all())
            .collect();

        for chunk in active_models.chunks(INSERT_BATCH_SIZE) {
            EpisodeEntity::insert_many(chunk.to_vec())
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(())
    }

    async fn delete_for_profile(&self, profile_id: &str) -> Result<u64> {
        let result = EpisodeEntity::delete_many()
            .filter(episodes::Column::ProfileId.eq(profile_id))
            .exec(self.base.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }
}
