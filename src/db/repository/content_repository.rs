use super::category_repository;
use super::{BaseRepository, INSERT_BATCH_SIZE, Repository};
use crate::db::entities::{
    CategoryModel, ContentItemActiveModel, ContentItemEntity, ContentItemModel, content_items,
};
use anyhow::Result;
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use std::sync::Arc;

/// Repository trait for channel, movie and show rows
#[async_trait]
pub trait ContentRepository: Repository<ContentItemModel> {
    /// All items of one kind for a profile, in remote order
    async fn find_by_profile_kind(
        &self,
        profile_id: &str,
        kind: &str,
    ) -> Result<Vec<ContentItemModel>>;

    /// Items of one kind in one category for a profile
    async fn find_by_category(
        &self,
        profile_id: &str,
        kind: &str,
        category_id: &str,
    ) -> Result<Vec<ContentItemModel>>;

    /// Whether at least one row exists, without loading the partition
    async fn exists_for(&self, profile_id: &str, kind: &str) -> Result<bool>;

    async fn count_for(&self, profile_id: &str, kind: &str) -> Result<u64>;

    /// Replace the items of one kind for a profile in one transaction
    async fn replace_for_profile_kind(
        &self,
        profile_id: &str,
        kind: &str,
        items: Vec<ContentItemModel>,
    ) -> Result<()>;

    /// Replace both the categories and the items of one kind in one transaction
    async fn replace_catalog(
        &self,
        profile_id: &str,
        kind: &str,
        categories: Vec<CategoryModel>,
        items: Vec<ContentItemModel>,
    ) -> Result<()>;

    async fn delete_for_profile(&self, profile_id: &str) -> Result<u64>;
}

#[derive(Debug)]
pub struct ContentRepositoryImpl {
    base: BaseRepository,
}

impl ContentRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

async fn replace_partition<C: ConnectionTrait>(
    conn: &C,
    profile_id: &str,
    kind: &str,
    items: Vec<ContentItemModel>,
) -> Result<()> {
    ContentItemEntity::delete_many()
        .filter(content_items::Column::ProfileId.eq(profile_id))
        .filter(content_items::Column::Kind.eq(kind))
        .exec(conn)
        .await?;

    let active_models: Vec<ContentItemActiveModel> = items
        .into_iter()
        .map(|item| item.into_active_model().reset_all())
        .collect();

    for chunk in active_models.chunks(INSERT_BATCH_SIZE) {
        ContentItemEntity::insert_many(chunk.to_vec())
            .exec_without_returning(conn)
            .await?;
    }
    Ok(())
}

#[async_trait]
impl Repository<ContentItemModel> for ContentRepositoryImpl {
    type Entity = ContentItemEntity;

    async fn find_by_id(&self, id: &str) -> Result<Option<ContentItemModel>> {
        Ok(ContentItemEntity::find_by_id(id)
            .one(self.base.db.as_ref())
            .await?)
    }

    async fn find_all(&self) -> Result<Vec<ContentItemModel>> {
        Ok(ContentItemEntity::find().all(self.base.db.as_ref()).await?)
    }

    async fn insert(&self, entity: ContentItemModel) -> Result<ContentItemModel> {
        let active_model = entity.into_active_model().reset_all();
        Ok(active_model.insert(self.base.db.as_ref()).await?)
    }

    async fn update(&self, entity: ContentItemModel) -> Result<ContentItemModel> {
        let active_model = entity.into_active_model().reset_all();
        Ok(active_model.update(self.base.db.as_ref()).await?)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        ContentItemEntity::delete_by_id(id)
            .exec(self.base.db.as_ref())
            .await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = ContentItemEntity::delete_many()
            .exec(self.base.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    async fn count(&self) -> Result<u64> {
        Ok(ContentItemEntity::find()
            .count(self.base.db.as_ref())
            .await?)
    }
}

#[async_trait]
impl ContentRepository for ContentRepositoryImpl {
    async fn find_by_profile_kind(
        &self,
        profile_id: &str,
        kind: &str,
    ) -> Result<Vec<ContentItemModel>> {
        Ok(ContentItemEntity::find()
            .filter(content_items::Column::ProfileId.eq(profile_id))
            .filter(content_items::Column::Kind.eq(kind))
            .order_by_asc(content_items::Column::Position)
            .all(self.base.db.as_ref())
            .await?)
    }

    async fn find_by_category(
        &self,
        profile_id: &str,
        kind: &str,
        category_id: &str,
    ) -> Result<Vec<ContentItemModel>> {
        Ok(ContentItemEntity::find()
            .filter(content_items::Column::ProfileId.eq(profile_id))
            .filter(content_items::Column::Kind.eq(kind))
            .filter(content_items::Column::CategoryId.eq(category_id))
            .order_by_asc(content_items::Column::Position)
            .all(self.base.db.as_ref())
            .await?)
    }

    async fn exists_for(&self, profile_id: &str, kind: &str) -> Result<bool> {
        let first = ContentItemEntity::find()
            .filter(content_items::Column::ProfileId.eq(profile_id))
            .filter(content_items::Column::Kind.eq(kind))
            .one(self.base.db.as_ref())
            .await?;
        Ok(first.is_some())
    }

    async fn count_for(&self, profile_id: &str, kind: &str) -> Result<u64> {
        Ok(ContentItemEntity::find()
            .filter(content_items::Column::ProfileId.eq(profile_id))
            .filter(content_items::Column::Kind.eq(kind))
            .count(self.base.db.as_ref())
            .await?)
    }

    async fn replace_for_profile_kind(
        &self,
        profile_id: &str,
        kind: &str,
        items: Vec<ContentItemModel>,
    ) -> Result<()> {
        let txn = self.base.db.begin().await?;
        replace_partition(&txn, profile_id, kind, items).await?;
        txn.commit().await?;
        Ok(())
    }

    async fn replace_catalog(
        &self,
        profile_id: &str,
        kind: &str,
        categories: Vec<CategoryModel>,
        items: Vec<ContentItemModel>,
    ) -> Result<()> {
        let txn = self.base.db.begin().await?;
        category_repository::replace_partition(&txn, profile_id, kind, categories).await?;
        replace_partition(&txn, profile_id, kind, items).await?;
        txn.commit().await?;
        Ok(())
    }

    async fn delete_for_profile(&self, profile_id: &str) -> Result<u64> {
        let result = ContentItemEntity::delete_many()
            .filter(content_items::Column::ProfileId.eq(profile_id))
            .exec(self.base.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }
}
