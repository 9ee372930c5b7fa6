mod api;
mod errors;
pub mod normalize;
mod retry;

#[cfg(test)]
mod tests;

pub use api::{XtreamApi, api_url};
pub use errors::XtreamApiError;
pub use retry::RetryPolicy;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::traits::CatalogBackend;
use crate::config::NetworkConfig;
use crate::models::{
    Category, ContentId, ContentItem, ContentKind, Credentials, ItemDetails, ItemQuery,
    ServerInfo, UserInfo,
};
use crate::utils::errors::CatalogError;

/// Xtream-Codes `player_api.php` catalog
#[derive(Debug, Clone)]
pub struct XtreamBackend {
    api: XtreamApi,
}

impl XtreamBackend {
    pub fn new(credentials: Credentials, network: &NetworkConfig) -> Result<Self> {
        Ok(Self {
            api: XtreamApi::new(credentials, network)?,
        })
    }

    pub fn with_api(api: XtreamApi) -> Self {
        Self { api }
    }

    pub fn credentials(&self) -> &Credentials {
        self.api.credentials()
    }

    async fn account_document(&self) -> Result<serde_json::Value> {
        self.api.request(None, &[]).await
    }
}

#[async_trait]
impl CatalogBackend for XtreamBackend {
    async fn get_categories(&self, kind: ContentKind) -> Result<Vec<Category>> {
        let payload = self
            .api
            .request(Some(api::categories_action(kind)), &[])
            .await?;
        let categories = normalize::categories(kind, &payload)?;
        debug!("Fetched {} {} categories", categories.len(), kind.as_str());
        Ok(categories)
    }

    async fn get_items(&self, kind: ContentKind, query: &ItemQuery) -> Result<Vec<ContentItem>> {
        let action = api::streams_action(kind);
        let payload = match &query.category_id {
            Some(category_id) => {
                self.api
                    .request(Some(action), &[("category_id", category_id.as_str())])
                    .await?
            }
            None => self.api.request(Some(action), &[]).await?,
        };

        let items = normalize::items(kind, &payload, query.category_id.as_ref())?;
        debug!(
            "Fetched {} {} (category: {:?})",
            items.len(),
            kind.plural(),
            query.category_id
        );
        Ok(query.paginate(items))
    }

    async fn get_item_details(&self, kind: ContentKind, id: &ContentId) -> Result<ItemDetails> {
        match kind {
            ContentKind::Movie => {
                let payload = self
                    .api
                    .request(Some("get_vod_info"), &[("vod_id", id.as_str())])
                    .await?;
                Ok(ItemDetails::Movie(normalize::movie_details(id, &payload)?))
            }
            ContentKind::Show => {
                let payload = self
                    .api
                    .request(Some("get_series_info"), &[("series_id", id.as_str())])
                    .await?;
                Ok(ItemDetails::Show(normalize::show_details(id, &payload)?))
            }
            ContentKind::Channel => Err(CatalogError::Unsupported(
                "live channels have no detail endpoint".to_string(),
            )
            .into()),
        }
    }

    async fn test_connection(&self) -> Result<bool> {
        let payload = match self
            .api
            .request_with(&RetryPolicy::single_attempt(), None, &[])
            .await
        {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Connection test to {} failed: {:#}", self.api.api_url(), e);
                return Ok(false);
            }
        };

        match normalize::user_info(&payload) {
            Ok(user) => {
                info!("Connected to {} as {}", self.api.api_url(), user.username);
                Ok(true)
            }
            Err(e) => {
                warn!("Connection test to {} rejected: {}", self.api.api_url(), e);
                Ok(false)
            }
        }
    }

    async fn get_user_profile(&self) -> Result<UserInfo> {
        let payload = self.account_document().await?;
        Ok(normalize::user_info(&payload)?)
    }

    async fn get_server_info(&self) -> Result<ServerInfo> {
        let payload = self.account_document().await?;
        Ok(normalize::server_info(&payload)?)
    }
}
