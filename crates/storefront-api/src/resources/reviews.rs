//! # Review Endpoints
//!
//! Reviews use JSON bodies. Creating, editing and deleting need a token;
//! reading a product's reviews does not.

use storefront_core::validation::{validate_new_review, validate_review_update};
use storefront_core::{NewReview, Page, ResourceId, Review, ReviewUpdate};
use tracing::info;

use crate::client::ApiClient;
use crate::error::ApiResult;

/// Review endpoints. Obtain via [`ApiClient::reviews`].
#[derive(Debug, Clone, Copy)]
pub struct Reviews<'a> {
    client: &'a ApiClient,
}

impl<'a> Reviews<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Reviews { client }
    }

    /// Every review (admin moderation list).
    pub async fn list(&self) -> ApiResult<Vec<Review>> {
        self.fetch("/api/reviews").await
    }

    /// Reviews of one product.
    pub async fn for_product(&self, product_id: &ResourceId) -> ApiResult<Vec<Review>> {
        self.fetch(&format!("/api/reviews/product/{product_id}")).await
    }

    /// Reviews written by the logged-in shopper.
    pub async fn mine(&self) -> ApiResult<Vec<Review>> {
        self.fetch("/api/users/reviews").await
    }

    pub async fn create(&self, review: &NewReview) -> ApiResult<()> {
        validate_new_review(review)?;
        let request = self.client.post("/api/reviews")?.json(review);
        self.client.send_unit(request).await?;
        info!(product_id = %review.product_id, rating = review.rating, "Review created");
        Ok(())
    }

    pub async fn update(&self, id: &ResourceId, update: &ReviewUpdate) -> ApiResult<()> {
        validate_review_update(update)?;
        let request = self.client.put(&format!("/api/reviews/{id}"))?.json(update);
        self.client.send_unit(request).await?;
        info!(review_id = %id, "Review updated");
        Ok(())
    }

    pub async fn delete(&self, id: &ResourceId) -> ApiResult<()> {
        let request = self.client.delete(&format!("/api/reviews/{id}"))?;
        self.client.send_unit(request).await?;
        info!(review_id = %id, "Review deleted");
        Ok(())
    }

    async fn fetch(&self, path: &str) -> ApiResult<Vec<Review>> {
        let request = self.client.get(path)?;
        let page: Page<Review> = self.client.send_json(request).await?;
        Ok(page.items)
    }
}
