use super::{BaseRepository, Repository};
use crate::db::entities::{Favorite, FavoriteModel, favorites};
use anyhow::Result;
use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use std::sync::Arc;

/// Repository trait for Favorite entities
#[async_trait]
pub trait FavoriteRepository: Repository<FavoriteModel> {
    /// Favorites of a profile, most recently added first
    async fn find_by_profile(&self, profile_id: &str) -> Result<Vec<FavoriteModel>>;

    async fn find_by_profile_type(
        &self,
        profile_id: &str,
        item_type: &str,
    ) -> Result<Vec<FavoriteModel>>;

    /// Insert unless a row with the same key exists
    async fn insert_if_absent(&self, entity: FavoriteModel) -> Result<()>;

    async fn delete_for_profile(&self, profile_id: &str) -> Result<u64>;
}

#[derive(Debug)]
pub struct FavoriteRepositoryImpl {
    base: BaseRepository,
}

impl FavoriteRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl Repository<FavoriteModel> for FavoriteRepositoryImpl {
    type Entity = Favorite;

    async fn find_by_id(&self, id: &str) -> Result<Option<FavoriteModel>> {
        Ok(Favorite::find_by_id(id).one(self.base.db.as_ref()).await?)
    }

    async fn find_all(&self) -> Result<Vec<FavoriteModel>> {
        Ok(Favorite::find().all(self.base.db.as_ref()).await?)
    }

    async fn insert(&self, entity: FavoriteModel) -> Result<FavoriteModel> {
        let active_model = entity.into_active_model().reset_all();
        Ok(active_model.insert(self.base.db.as_ref()).await?)
    }

    async fn update(&self, entity: FavoriteModel) -> Result<FavoriteModel> {
        let active_model = entity.into_active_model().reset_all();
        Ok(active_model.update(self.base.db.as_ref()).await?)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        Favorite::delete_by_id(id)
            .exec(self.base.db.as_ref())
            .await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = Favorite::delete_many().exec(self.base.db.as_ref()).await?;
        Ok(result.rows_affected)
    }

    async fn count(&self) -> Result<u64> {
        Ok(Favorite::find().count(self.base.db.as_ref()).await?)
    }
}

#[async_trait]
impl FavoriteRepository for FavoriteRepositoryImpl {
    async fn find_by_profile(&self, profile_id: &str) -> Result<Vec<FavoriteModel>> {
        Ok(Favorite::find()
            .filter(favorites::Column::ProfileId.eq(profile_id))
            .order_by_desc(favorites::Column::AddedAt)
            .all(self.base.db.as_ref())
            .await?)
    }

    async fn find_by_profile_type(
        &self,
        profile_id: &str,
        item_type: &str,
    ) -> Result<Vec<FavoriteModel>> {
        Ok(Favorite::find()
            .filter(favorites::Column::ProfileId.eq(profile_id))
            .filter(favorites::Column::ItemType.eq(item_type))
            .order_by_desc(favorites::Column::AddedAt)
            .all(self.base.db.as_ref())
            .await?)
    }

    async fn insert_if_absent(&self, entity: FavoriteModel) -> Result<()> {
        let active_model = entity.into_active_model().reset_all();
        Favorite::insert(active_model)
            .on_conflict(
                OnConflict::column(favorites::Column::Id)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.base.db.as_ref())
            .await?;
        Ok(())
    }

    async fn delete_for_profile(&self, profile_id: &str) -> Result<u64> {
        let result = Favorite::delete_many()
            .filter(favorites::Column::ProfileId.eq(profile_id))
            .exec(self.base.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FavoriteItem, FavoriteKind, ProfileId};
    use crate::test_utils::TestDatabase;

    fn favorite(profile: &str, id: &str, kind: FavoriteKind) -> FavoriteModel {
        FavoriteModel::from(&FavoriteItem {
            id: id.into(),
            kind,
            name: format!("Item {}", id),
            stream_icon: None,
            added_at: chrono::Utc::now(),
            profile_id: ProfileId::new(profile),
        })
    }

    #[tokio::test]
    async fn test_insert_if_absent_deduplicates() {
        let db = TestDatabase::new().await.unwrap();
        let repo = FavoriteRepositoryImpl::new(db.connection());

        repo.insert_if_absent(favorite("a", "1", FavoriteKind::Movie))
            .await
            .unwrap();
        repo.insert_if_absent(favorite("a", "1", FavoriteKind::Movie))
            .await
            .unwrap();
        // Same id with another type is a different favorite
        repo.insert_if_absent(favorite("a", "1", FavoriteKind::Channel))
            .await
            .unwrap();

        assert_eq!(repo.find_by_profile("a").await.unwrap().len(), 2);
        assert_eq!(
            repo.find_by_profile_type("a", "movie").await.unwrap().len(),
            1
        );
        assert!(repo.find_by_profile("b").await.unwrap().is_empty());
    }
}
