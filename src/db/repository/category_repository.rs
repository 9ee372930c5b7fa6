use super::{BaseRepository, INSERT_BATCH_SIZE, Repository};
use crate::db::entities::{CategoryActiveModel, CategoryEntity, CategoryModel, categories};
use anyhow::Result;
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use std::sync::Arc;

/// Repository trait for Category entities
#[async_trait]
pub trait CategoryRepository: Repository<CategoryModel> {
    /// Categories of one kind for a profile, in remote order
    async fn find_by_profile_kind(&self, profile_id: &str, kind: &str)
    -> Result<Vec<CategoryModel>>;

    /// Replace the category set of one kind for a profile in one transaction
    async fn replace_for_profile_kind(
        &self,
        profile_id: &str,
        kind: &str,
        categories: Vec<CategoryModel>,
    ) -> Result<()>;

    async fn delete_for_profile(&self, profile_id: &str) -> Result<u64>;
}

#[derive(Debug)]
pub struct CategoryRepositoryImpl {
    base: BaseRepository,
}

impl CategoryRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

/// Deletes the profile+kind partition and inserts `categories` on `conn`.
pub(crate) async fn replace_partition<C: ConnectionTrait>(
    conn: &C,
    profile_id: &str,
    kind: &str,
    categories: Vec<CategoryModel>,
) -> Result<()> {
    CategoryEntity::delete_many()
        .filter(categories::Column::ProfileId.eq(profile_id))
        .filter(categories::Column::Kind.eq(kind))
        .exec(conn)
        .await?;

    let active_models: Vec<CategoryActiveModel> = categories
        .into_iter()
        .map(|c| c.into_active_model().reset_all())
        .collect();

    for chunk in active_models.chunks(INSERT_BATCH_SIZE) {
        CategoryEntity::insert_many(chunk.to_vec())
            .exec_without_returning(conn)
            .await?;
    }
    Ok(())
}

#[async_trait]
impl Repository<CategoryModel> for CategoryRepositoryImpl {
    type Entity = CategoryEntity;

    async fn find_by_id(&self, id: &str) -> Result<Option<CategoryModel>> {
        Ok(CategoryEntity::find_by_id(id)
            .one(self.base.db.as_ref())
            .await?)
    }

    async fn find_all(&self) -> Result<Vec<CategoryModel>> {
        Ok(CategoryEntity::find().all(self.base.db.as_ref()).await?)
    }

    async fn insert(&self, entity: CategoryModel) -> Result<CategoryModel> {
        let active_model = entity.into_active_model().reset_all();
        Ok(active_model.insert(self.base.db.as_ref()).await?)
    }

    async fn update(&self, entity: CategoryModel) -> Result<CategoryModel> {
        let active_model = entity.into_active_model().reset_all();
        Ok(active_model.update(self.base.db.as_ref()).await?)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        CategoryEntity::delete_by_id(id)
            .exec(self.base.db.as_ref())
            .await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = CategoryEntity::delete_many()
            .exec(self.base.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    async fn count(&self) -> Result<u64> {
        Ok(CategoryEntity::find().count(self.base.db.as_ref()).await?)
    }
}

#[async_trait]
impl CategoryRepository for CategoryRepositoryImpl {
    async fn find_by_profile_kind(
        &self,
        profile_id: &str,
        kind: &str,
    ) -> Result<Vec<CategoryModel>> {
        Ok(CategoryEntity::find()
            .filter(categories::Column::ProfileId.eq(profile_id))
            .filter(categories::Column::Kind.eq(kind))
            .order_by_asc(categories::Column::Position)
            .all(self.base.db.as_ref())
            .await?)
    }

    async fn replace_for_profile_kind(
        &self,
        profile_id: &str,
        kind: &str,
        categories: Vec<CategoryModel>,
    ) -> Result<()> {
        let txn = self.base.db.begin().await?;
        replace_partition(&txn, profile_id, kind, categories).await?;
        txn.commit().await?;
        Ok(())
    }

    async fn delete_for_profile(&self, profile_id: &str) -> Result<u64> {
        let result = CategoryEntity::delete_many()
            .filter(categories::Column::ProfileId.eq(profile_id))
            .exec(self.base.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, ContentKind, ProfileId};
    use crate::test_utils::TestDatabase;

    fn rows(profile: &str, kind: ContentKind, ids: &[&str]) -> Vec<CategoryModel> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| {
                let category = Category {
                    id: (*id).into(),
                    name: format!("Category {}", id),
                    parent_id: None,
                    kind,
                };
                CategoryModel::from_category(&ProfileId::new(profile), &category, i)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_replace_is_scoped_to_profile_and_kind() {
        let db = TestDatabase::new().await.unwrap();
        let repo = CategoryRepositoryImpl::new(db.connection());

        repo.replace_for_profile_kind("a", "channel", rows("a", ContentKind::Channel, &["1", "2"]))
            .await
            .unwrap();
        repo.replace_for_profile_kind("a", "movie", rows("a", ContentKind::Movie, &["1"]))
            .await
            .unwrap();
        // Same remote ids under another profile do not collide
        repo.replace_for_profile_kind("b", "channel", rows("b", ContentKind::Channel, &["1", "2"]))
            .await
            .unwrap();

        repo.replace_for_profile_kind("a", "channel", rows("a", ContentKind::Channel, &["3"]))
            .await
            .unwrap();

        let a_channels = repo.find_by_profile_kind("a", "channel").await.unwrap();
        assert_eq!(a_channels.len(), 1);
        assert_eq!(a_channels[0].remote_id, "3");
        assert_eq!(repo.find_by_profile_kind("a", "movie").await.unwrap().len(), 1);
        assert_eq!(repo.find_by_profile_kind("b", "channel").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_order_follows_position() {
        let db = TestDatabase::new().await.unwrap();
        let repo = CategoryRepositoryImpl::new(db.connection());

        repo.replace_for_profile_kind(
            "a",
            "show",
            rows("a", ContentKind::Show, &["z", "m", "a"]),
        )
        .await
        .unwrap();

        let ids: Vec<String> = repo
            .find_by_profile_kind("a", "show")
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.remote_id)
            .collect();
        assert_eq!(ids, vec!["z", "m", "a"]);
    }

    #[tokio::test]
    async fn test_delete_for_profile() {
        let db = TestDatabase::new().await.unwrap();
        let repo = CategoryRepositoryImpl::new(db.connection());

        repo.replace_for_profile_kind("a", "channel", rows("a", ContentKind::Channel, &["1"]))
            .await
            .unwrap();
        repo.replace_for_profile_kind("b", "channel", rows("b", ContentKind::Channel, &["1"]))
            .await
            .unwrap();

        assert_eq!(repo.delete_for_profile("a").await.unwrap(), 1);
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
