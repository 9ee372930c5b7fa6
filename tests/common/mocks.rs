use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use xtview::backends::CatalogBackend;
use xtview::models::*;
use xtview::services::BackendFactory;
use xtview::utils::CatalogResult;

/// Scripted catalog: per-category item counts, an optional failing items
/// request and an optional delay before every response.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    categories: Vec<(Category, usize)>,
    fail_on_item_request: Option<usize>,
    delay: Option<Duration>,
    item_requests: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, kind: ContentKind, id: &str, count: usize) -> Self {
        let category = Category {
            id: id.into(),
            name: format!("Category {}", id),
            parent_id: None,
            kind,
        };
        self.categories.push((category, count));
        self
    }

    /// The `n`th items request (1-based) fails.
    pub fn fail_on_item_request(mut self, n: usize) -> Self {
        self.fail_on_item_request = Some(n);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn item_requests(&self) -> usize {
        self.item_requests.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn item(kind: ContentKind, id: String, category_id: &CategoryId) -> ContentItem {
    let name = format!("{} {}", kind.as_str(), id);
    match kind {
        ContentKind::Channel => ContentItem::Channel(Channel {
            id: id.into(),
            name,
            category_id: category_id.clone(),
            stream_type: "live".to_string(),
            stream_icon: None,
            epg_channel_id: None,
            added: None,
            custom_sid: None,
            tv_archive: 0,
            tv_archive_duration: None,
            direct_source: None,
        }),
        ContentKind::Movie => ContentItem::Movie(Movie {
            id: id.into(),
            name,
            category_id: category_id.clone(),
            stream_type: "movie".to_string(),
            stream_icon: None,
            rating: None,
            year: None,
            added: None,
            container_extension: "mp4".to_string(),
            custom_sid: None,
            direct_source: None,
        }),
        ContentKind::Show => ContentItem::Show(Show {
            id: id.into(),
            name,
            category_id: category_id.clone(),
            stream_icon: None,
            rating: None,
            year: None,
            added: None,
            last_modified: None,
        }),
    }
}

#[async_trait]
impl CatalogBackend for MockBackend {
    async fn get_categories(&self, kind: ContentKind) -> Result<Vec<Category>> {
        self.wait().await;
        Ok(self
            .categories
            .iter()
            .filter(|(category, _)| category.kind == kind)
            .map(|(category, _)| category.clone())
            .collect())
    }

    async fn get_items(&self, kind: ContentKind, query: &ItemQuery) -> Result<Vec<ContentItem>> {
        let call = self.item_requests.fetch_add(1, Ordering::SeqCst) + 1;
        self.wait().await;
        if self.fail_on_item_request == Some(call) {
            anyhow::bail!("connection reset on request {}", call);
        }

        let items = self
            .categories
            .iter()
            .filter(|(category, _)| category.kind == kind)
            .filter(|(category, _)| query.category_id.as_ref().is_none_or(|id| id == &category.id))
            .flat_map(|(category, count)| {
                (0..*count).map(move |i| item(kind, format!("{}-{}", category.id, i), &category.id))
            })
            .collect();
        Ok(query.paginate(items))
    }

    async fn get_item_details(&self, kind: ContentKind, _id: &ContentId) -> Result<ItemDetails> {
        anyhow::bail!("no {} details in this mock", kind)
    }

    async fn test_connection(&self) -> Result<bool> {
        Ok(true)
    }

    async fn get_user_profile(&self) -> Result<UserInfo> {
        Ok(UserInfo {
            username: "user".to_string(),
            is_active: true,
            ..UserInfo::default()
        })
    }

    async fn get_server_info(&self) -> Result<ServerInfo> {
        Ok(ServerInfo::default())
    }
}

/// Hands out a backend per profile name; unknown names get an empty mock.
#[derive(Debug, Default)]
pub struct MockFactory {
    by_name: Mutex<HashMap<String, MockBackend>>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(self, name: &str, backend: MockBackend) -> Self {
        self.by_name
            .lock()
            .unwrap()
            .insert(name.to_string(), backend);
        self
    }
}

impl BackendFactory for MockFactory {
    fn create(&self, profile: &Profile) -> CatalogResult<Arc<dyn CatalogBackend>> {
        let backend = self
            .by_name
            .lock()
            .unwrap()
            .get(&profile.name)
            .cloned()
            .unwrap_or_default();
        Ok(Arc::new(backend))
    }
}
