#![cfg(test)]

use crate::backends::CatalogBackend;
use crate::db::{Database, DatabaseConnection};
use crate::models::*;
use crate::services::BackendFactory;
use crate::utils::errors::CatalogResult;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Test database wrapper that handles setup and teardown
pub struct TestDatabase {
    pub connection: DatabaseConnection,
    _temp_dir: TempDir,
}

impl TestDatabase {
    /// Create a new migrated database in a temporary directory
    pub async fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("test.db");

        let db = Database::open(&db_path).await?;

        Ok(Self {
            connection: db.connection(),
            _temp_dir: temp_dir,
        })
    }

    pub fn connection(&self) -> DatabaseConnection {
        self.connection.clone()
    }
}

pub fn category(id: &str, kind: ContentKind) -> Category {
    Category {
        id: id.into(),
        name: format!("Category {}", id),
        parent_id: None,
        kind,
    }
}

pub fn channel(id: &str, category: &str) -> ContentItem {
    ContentItem::Channel(Channel {
        id: id.into(),
        name: format!("Channel {}", id),
        category_id: category.into(),
        stream_type: "live".to_string(),
        stream_icon: Some(format!("http://img.example.com/{}.png", id)),
        epg_channel_id: None,
        added: None,
        custom_sid: None,
        tv_archive: 0,
        tv_archive_duration: None,
        direct_source: None,
    })
}

pub fn movie(id: &str, category: &str) -> ContentItem {
    ContentItem::Movie(Movie {
        id: id.into(),
        name: format!("Movie {}", id),
        category_id: category.into(),
        stream_type: "movie".to_string(),
        stream_icon: None,
        rating: Some(7.5),
        year: Some(2020),
        added: None,
        container_extension: "mkv".to_string(),
        custom_sid: None,
        direct_source: None,
    })
}

pub fn show(id: &str, category: &str) -> ContentItem {
    ContentItem::Show(Show {
        id: id.into(),
        name: format!("Show {}", id),
        category_id: category.into(),
        stream_icon: None,
        rating: None,
        year: None,
        added: None,
        last_modified: None,
    })
}

fn item(kind: ContentKind, id: &str, category: &str) -> ContentItem {
    match kind {
        ContentKind::Channel => channel(id, category),
        ContentKind::Movie => movie(id, category),
        ContentKind::Show => show(id, category),
    }
}

fn episode(season: u32, num: u32) -> Episode {
    Episode {
        id: format!("{}{:02}", season, num).into(),
        episode_num: num,
        season,
        title: format!("Episode {}", num),
        container_extension: "mp4".to_string(),
        added: None,
        custom_sid: None,
        info: EpisodeInfo::default(),
    }
}

#[derive(Debug, Default)]
struct Calls {
    items: AtomicUsize,
    details: AtomicUsize,
}

/// In-memory catalog. Clones share call counters, so a test can keep one
/// copy for assertions while the service owns another.
#[derive(Debug, Clone, Default)]
pub struct MockCatalogBackend {
    categories: Vec<Category>,
    sizes: Vec<usize>,
    fail_on_item_request: Option<usize>,
    fail_every_items: bool,
    failing_kind: Option<ContentKind>,
    delay: Option<Duration>,
    calls: Arc<Calls>,
}

impl MockCatalogBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a category holding `count` items with ids `{category}-{i}`.
    pub fn with_category(mut self, kind: ContentKind, id: &str, count: usize) -> Self {
        let mut category = category(id, kind);
        category.name = format!("{} {}", kind.as_str(), id);
        self.categories.push(category);
        self.sizes.push(count);
        self
    }

    /// The `n`th items request (1-based) fails.
    pub fn fail_on_item_request(mut self, n: usize) -> Self {
        self.fail_on_item_request = Some(n);
        self
    }

    pub fn failing_items(mut self) -> Self {
        self.fail_every_items = true;
        self
    }

    /// Every request of `kind` fails.
    pub fn failing_kind(mut self, kind: ContentKind) -> Self {
        self.failing_kind = Some(kind);
        self
    }

    /// Delays every categories and items response.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn item_requests(&self) -> usize {
        self.calls.items.load(Ordering::SeqCst)
    }

    pub fn detail_requests(&self) -> usize {
        self.calls.details.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check_kind(&self, kind: ContentKind) -> Result<()> {
        if self.failing_kind == Some(kind) {
            anyhow::bail!("Mock {} failure", kind);
        }
        Ok(())
    }

    fn items_of(&self, kind: ContentKind, category_id: Option<&CategoryId>) -> Vec<ContentItem> {
        self.categories
            .iter()
            .zip(&self.sizes)
            .filter(|(category, _)| category.kind == kind)
            .filter(|(category, _)| category_id.is_none_or(|id| &category.id == id))
            .flat_map(|(category, count)| {
                (0..*count).map(move |i| {
                    item(
                        kind,
                        &format!("{}-{}", category.id, i),
                        category.id.as_str(),
                    )
                })
            })
            .collect()
    }
}

#[async_trait]
impl CatalogBackend for MockCatalogBackend {
    async fn get_categories(&self, kind: ContentKind) -> Result<Vec<Category>> {
        self.wait().await;
        self.check_kind(kind)?;
        Ok(self
            .categories
            .iter()
            .filter(|category| category.kind == kind)
            .cloned()
            .collect())
    }

    async fn get_items(&self, kind: ContentKind, query: &ItemQuery) -> Result<Vec<ContentItem>> {
        let call = self.calls.items.fetch_add(1, Ordering::SeqCst) + 1;
        self.wait().await;
        self.check_kind(kind)?;
        if self.fail_every_items || self.fail_on_item_request == Some(call) {
            anyhow::bail!("Mock get_items failure on request {}", call);
        }
        Ok(query.paginate(self.items_of(kind, query.category_id.as_ref())))
    }

    async fn get_item_details(&self, kind: ContentKind, id: &ContentId) -> Result<ItemDetails> {
        self.calls.details.fetch_add(1, Ordering::SeqCst);
        self.check_kind(kind)?;
        match kind {
            ContentKind::Channel => anyhow::bail!("Mock has no channel details"),
            ContentKind::Movie => {
                let ContentItem::Movie(movie) = movie(id.as_str(), "0") else {
                    anyhow::bail!("Mock movie builder returned another kind");
                };
                Ok(ItemDetails::Movie(MovieDetails {
                    movie,
                    plot: Some("A mock movie".to_string()),
                    cast: None,
                    director: None,
                    genre: Some("Drama".to_string()),
                    release_date: None,
                    rating_5based: Some(3.5),
                    backdrop_path: Vec::new(),
                    youtube_trailer: None,
                    tmdb_id: None,
                }))
            }
            ContentKind::Show => {
                let ContentItem::Show(show) = show(id.as_str(), "0") else {
                    anyhow::bail!("Mock show builder returned another kind");
                };
                Ok(ItemDetails::Show(ShowDetails {
                    show,
                    plot: Some("A mock show".to_string()),
                    cast: None,
                    director: None,
                    genre: None,
                    release_date: None,
                    rating_5based: None,
                    backdrop_path: Vec::new(),
                    youtube_trailer: None,
                    tmdb_id: None,
                    seasons: group_into_seasons(vec![episode(1, 2), episode(1, 1), episode(2, 1)]),
                }))
            }
        }
    }

    async fn test_connection(&self) -> Result<bool> {
        Ok(self.failing_kind.is_none())
    }

    async fn get_user_profile(&self) -> Result<UserInfo> {
        Ok(UserInfo {
            username: "user".to_string(),
            status: Some("Active".to_string()),
            is_active: true,
            max_connections: 1,
            allowed_output_formats: vec!["m3u8".to_string(), "ts".to_string()],
            ..UserInfo::default()
        })
    }

    async fn get_server_info(&self) -> Result<ServerInfo> {
        Ok(ServerInfo {
            url: "tv.example.com".to_string(),
            port: "8080".to_string(),
            server_protocol: "http".to_string(),
            timezone: "UTC".to_string(),
            ..ServerInfo::default()
        })
    }
}

/// Hands every profile a clone of the same mock.
#[derive(Debug, Clone)]
pub struct MockBackendFactory {
    backend: MockCatalogBackend,
}

impl MockBackendFactory {
    pub fn new(backend: MockCatalogBackend) -> Self {
        Self { backend }
    }
}

impl BackendFactory for MockBackendFactory {
    fn create(&self, _profile: &Profile) -> CatalogResult<Arc<dyn CatalogBackend>> {
        Ok(Arc::new(self.backend.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_creation() {
        let db = TestDatabase::new().await.unwrap();

        use sea_orm::{ConnectionTrait, Statement};
        let result = db
            .connection
            .execute(Statement::from_string(
                sea_orm::DatabaseBackend::Sqlite,
                "SELECT 1",
            ))
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_mock_backend() {
        let backend = MockCatalogBackend::new()
            .with_category(ContentKind::Movie, "1", 2)
            .with_category(ContentKind::Movie, "2", 3)
            .fail_on_item_request(3);

        assert_eq!(backend.get_categories(ContentKind::Movie).await.unwrap().len(), 2);
        let one = backend
            .get_items(ContentKind::Movie, &ItemQuery::in_category("1".into()))
            .await
            .unwrap();
        assert_eq!(one[1].id().as_str(), "1-1");
        assert_eq!(
            backend
                .get_items(ContentKind::Movie, &ItemQuery::all())
                .await
                .unwrap()
                .len(),
            5
        );
        assert!(backend.get_items(ContentKind::Movie, &ItemQuery::all()).await.is_err());
        assert_eq!(backend.clone().item_requests(), 3);
    }
}
