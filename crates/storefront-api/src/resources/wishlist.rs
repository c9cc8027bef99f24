//! # Wishlist Endpoints

use storefront_core::{Page, ResourceId, WishlistItem};
use tracing::info;

use crate::client::ApiClient;
use crate::error::ApiResult;

/// Wishlist endpoints (protected). Obtain via [`ApiClient::wishlist`].
#[derive(Debug, Clone, Copy)]
pub struct Wishlist<'a> {
    client: &'a ApiClient,
}

impl<'a> Wishlist<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Wishlist { client }
    }

    pub async fn list(&self) -> ApiResult<Vec<WishlistItem>> {
        let request = self.client.get("/api/wishlist")?;
        let page: Page<WishlistItem> = self.client.send_json(request).await?;
        Ok(page.items)
    }

    /// Adds a product. Note the id is the product's, not a wishlist entry's.
    pub async fn add(&self, product_id: &ResourceId) -> ApiResult<()> {
        let request = self.client.post(&format!("/api/wishlist/add/{product_id}"))?;
        self.client.send_unit(request).await?;
        info!(product_id = %product_id, "Added to wishlist");
        Ok(())
    }

    /// Removes a wishlist entry by its own id.
    pub async fn remove(&self, item_id: &ResourceId) -> ApiResult<()> {
        let request = self.client.delete(&format!("/api/wishlist/{item_id}"))?;
        self.client.send_unit(request).await?;
        info!(item_id = %item_id, "Removed from wishlist");
        Ok(())
    }
}
