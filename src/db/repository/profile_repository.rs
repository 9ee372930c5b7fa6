use super::{BaseRepository, Repository};
use crate::db::entities::{ProfileActiveModel, ProfileEntity, ProfileModel, profiles};
use anyhow::Result;
use async_trait::async_trait;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;

/// Repository trait for Profile entities
#[async_trait]
pub trait ProfileRepository: Repository<ProfileModel> {
    /// Insert or replace a profile by id
    async fn upsert(&self, entity: ProfileModel) -> Result<()>;

    /// First profile flagged active, oldest first
    async fn find_active(&self) -> Result<Option<ProfileModel>>;

    /// Flags `id` active and every other profile inactive in one transaction.
    /// Returns false when no profile has that id; nothing changes then.
    async fn set_active(&self, id: &str) -> Result<bool>;

    /// Store the account details last reported by the server
    async fn update_account_info(
        &self,
        id: &str,
        user_info: Option<serde_json::Value>,
        server_info: Option<serde_json::Value>,
    ) -> Result<()>;
}

#[derive(Debug)]
pub struct ProfileRepositoryImpl {
    base: BaseRepository,
}

impl ProfileRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl Repository<ProfileModel> for ProfileRepositoryImpl {
    type Entity = ProfileEntity;

    async fn find_by_id(&self, id: &str) -> Result<Option<ProfileModel>> {
        Ok(ProfileEntity::find_by_id(id)
            .one(self.base.db.as_ref())
            .await?)
    }

    async fn find_all(&self) -> Result<Vec<ProfileModel>> {
        Ok(ProfileEntity::find()
            .order_by_asc(profiles::Column::CreatedAt)
            .all(self.base.db.as_ref())
            .await?)
    }

    async fn insert(&self, entity: ProfileModel) -> Result<ProfileModel> {
        let active_model = entity.into_active_model().reset_all();
        Ok(active_model.insert(self.base.db.as_ref()).await?)
    }

    async fn update(&self, entity: ProfileModel) -> Result<ProfileModel> {
        let active_model = entity.into_active_model().reset_all();
        Ok(active_model.update(self.base.db.as_ref()).await?)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        ProfileEntity::delete_by_id(id)
            .exec(self.base.db.as_ref())
            .await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = ProfileEntity::delete_many()
            .exec(self.base.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    async fn count(&self) -> Result<u64> {
        Ok(ProfileEntity::find().count(self.base.db.as_ref()).await?)
    }
}

#[async_trait]
impl ProfileRepository for ProfileRepositoryImpl {
    async fn upsert(&self, entity: ProfileModel) -> Result<()> {
        let active_model = entity.into_active_model().reset_all();
        ProfileEntity::insert(active_model)
            .on_conflict(
                OnConflict::column(profiles::Column::Id)
                    .update_columns([
                        profiles::Column::Name,
                        profiles::Column::Url,
                        profiles::Column::Username,
                        profiles::Column::Password,
                        profiles::Column::Format,
                        profiles::Column::IsActive,
                        profiles::Column::LastUsed,
                        profiles::Column::CachedUserInfo,
                        profiles::Column::CachedServerInfo,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.base.db.as_ref())
            .await?;
        Ok(())
    }

    async fn find_active(&self) -> Result<Option<ProfileModel>> {
        Ok(ProfileEntity::find()
            .filter(profiles::Column::IsActive.eq(true))
            .order_by_asc(profiles::Column::CreatedAt)
            .one(self.base.db.as_ref())
            .await?)
    }

    async fn set_active(&self, id: &str) -> Result<bool> {
        let txn = self.base.db.begin().await?;

        let Some(profile) = ProfileEntity::find_by_id(id).one(&txn).await? else {
            txn.rollback().await?;
            return Ok(false);
        };

        ProfileEntity::update_many()
            .col_expr(profiles::Column::IsActive, Expr::value(false))
            .filter(profiles::Column::Id.ne(id))
            .exec(&txn)
            .await?;

        let mut active_model: ProfileActiveModel = profile.into();
        active_model.is_active = Set(true);
        active_model.last_used = Set(Some(chrono::Utc::now().naive_utc()));
        active_model.update(&txn).await?;

        txn.commit().await?;
        Ok(true)
    }

    async fn update_account_info(
        &self,
        id: &str,
        user_info: Option<serde_json::Value>,
        server_info: Option<serde_json::Value>,
    ) -> Result<()> {
        if let Some(profile) = self.find_by_id(id).await? {
            let mut active_model: ProfileActiveModel = profile.into();
            active_model.cached_user_info = Set(user_info);
            active_model.cached_server_info = Set(server_info);
            active_model.update(self.base.db.as_ref()).await?;
        }
        Ok(())
    }
}
