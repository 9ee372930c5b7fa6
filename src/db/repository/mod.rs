pub mod category_repository;
pub mod content_download_repository;
pub mod content_repository;
pub mod episode_repository;
pub mod favorite_repository;
pub mod history_repository;
pub mod profile_repository;
pub mod settings_repository;

use anyhow::Result;
use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait};
use std::sync::Arc;

/// Rows per INSERT statement in bulk writes
pub const INSERT_BATCH_SIZE: usize = 100;

/// Base repository trait that all repositories should implement
#[async_trait]
pub trait Repository<T> {
    type Entity: EntityTrait;

    /// Find an entity by ID
    async fn find_by_id(&self, id: &str) -> Result<Option<T>>;

    /// Find all entities
    async fn find_all(&self) -> Result<Vec<T>>;

    /// Insert a new entity
    async fn insert(&self, entity: T) -> Result<T>;

    /// Update an existing entity
    async fn update(&self, entity: T) -> Result<T>;

    /// Delete an entity by ID
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete every row of the collection
    async fn delete_all(&self) -> Result<u64>;

    /// Count all entities
    async fn count(&self) -> Result<u64>;
}

/// Base repository implementation holder
#[derive(Debug, Clone)]
pub struct BaseRepository {
    pub db: Arc<DatabaseConnection>,
}

impl BaseRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

// Re-export specific repositories
pub use category_repository::{CategoryRepository, CategoryRepositoryImpl};
pub use content_download_repository::{ContentDownloadRepository, ContentDownloadRepositoryImpl};
pub use content_repository::{ContentRepository, ContentRepositoryImpl};
pub use episode_repository::{EpisodeRepository, EpisodeRepositoryImpl};
pub use favorite_repository::{FavoriteRepository, FavoriteRepositoryImpl};
pub use history_repository::{HistoryRepository, HistoryRepositoryImpl};
pub use profile_repository::{ProfileRepository, ProfileRepositoryImpl};
pub use settings_repository::{SettingsRepository, SettingsRepositoryImpl};
