//! # Hero Image Endpoints
//!
//! The home page shows a single banner: the most recently uploaded one.

use reqwest::multipart::Form;
use storefront_core::{HeroImage, Page, ResourceId, Upload};
use tracing::info;

use crate::client::{file_part, ApiClient};
use crate::error::ApiResult;

/// Hero image endpoints. Obtain via [`ApiClient::hero_images`].
#[derive(Debug, Clone, Copy)]
pub struct HeroImages<'a> {
    client: &'a ApiClient,
}

impl<'a> HeroImages<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        HeroImages { client }
    }

    pub async fn list(&self) -> ApiResult<Vec<HeroImage>> {
        let request = self.client.get("/api/hero-images")?;
        let page: Page<HeroImage> = self.client.send_json(request).await?;
        Ok(page.items)
    }

    pub async fn get(&self, id: &ResourceId) -> ApiResult<HeroImage> {
        let request = self.client.get(&format!("/api/hero-images/{id}"))?;
        self.client.send_json(request).await
    }

    /// The banner the home page displays, `None` when none was uploaded.
    pub async fn current(&self) -> ApiResult<Option<HeroImage>> {
        let images = self.list().await?;
        Ok(HeroImage::newest(&images).cloned())
    }

    /// Uploads a new banner (admin).
    pub async fn upload(&self, image: &Upload) -> ApiResult<()> {
        let form = Form::new().part("heroImage", file_part(image)?);
        let request = self.client.post("/api/hero-images")?.multipart(form);
        self.client.send_unit(request).await?;
        info!(file = %image.file_name, "Hero image uploaded");
        Ok(())
    }

    /// Replaces the file behind an existing banner (admin).
    pub async fn replace(&self, id: &ResourceId, image: &Upload) -> ApiResult<()> {
        let form = Form::new().part("heroImage", file_part(image)?);
        let request = self
            .client
            .put(&format!("/api/hero-images/{id}"))?
            .multipart(form);
        self.client.send_unit(request).await?;
        info!(hero_image_id = %id, "Hero image replaced");
        Ok(())
    }

    pub async fn delete(&self, id: &ResourceId) -> ApiResult<()> {
        let request = self.client.delete(&format!("/api/hero-images/{id}"))?;
        self.client.send_unit(request).await?;
        info!(hero_image_id = %id, "Hero image deleted");
        Ok(())
    }
}
