use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    Category, ContentId, ContentItem, ContentKind, ItemDetails, ItemQuery, ServerInfo, UserInfo,
};

/// Remote catalog of one account.
///
/// Listings come back in server order. Implementations raise on network
/// failures and rejected credentials; callers decide what that means for
/// cached data.
#[async_trait]
pub trait CatalogBackend: Send + Sync + std::fmt::Debug {
    async fn get_categories(&self, kind: ContentKind) -> Result<Vec<Category>>;

    /// Items of `kind`, filtered by `query.category_id` and paged by
    /// `query.page`/`query.limit` when set.
    async fn get_items(&self, kind: ContentKind, query: &ItemQuery) -> Result<Vec<ContentItem>>;

    /// Movie or show details; shows include their seasons.
    async fn get_item_details(&self, kind: ContentKind, id: &ContentId) -> Result<ItemDetails>;

    /// `Ok(false)` when the server is unreachable or refuses the account.
    async fn test_connection(&self) -> Result<bool>;

    async fn get_user_profile(&self) -> Result<UserInfo>;

    async fn get_server_info(&self) -> Result<ServerInfo>;
}
