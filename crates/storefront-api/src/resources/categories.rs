//! # Category Endpoints

use reqwest::multipart::Form;
use storefront_core::validation::validate_new_category;
use storefront_core::{Category, NewCategory, Page, ResourceId};
use tracing::info;

use crate::client::{file_part, ApiClient};
use crate::error::ApiResult;

/// Category endpoints. Obtain via [`ApiClient::categories`].
#[derive(Debug, Clone, Copy)]
pub struct Categories<'a> {
    client: &'a ApiClient,
}

impl<'a> Categories<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Categories { client }
    }

    /// Lists every category.
    pub async fn list(&self) -> ApiResult<Vec<Category>> {
        let request = self.client.get("/api/categories")?;
        let page: Page<Category> = self.client.send_json(request).await?;
        Ok(page.items)
    }

    pub async fn get(&self, id: &ResourceId) -> ApiResult<Category> {
        let request = self.client.get(&format!("/api/categories/{id}"))?;
        self.client.send_json(request).await
    }

    /// Creates a category (admin). The image goes in the `file` field.
    pub async fn create(&self, category: &NewCategory) -> ApiResult<()> {
        validate_new_category(category)?;
        let request = self.client.post("/api/categories")?.multipart(category_form(category)?);
        self.client.send_unit(request).await?;
        info!(name = %category.name, "Category created");
        Ok(())
    }

    pub async fn update(&self, id: &ResourceId, category: &NewCategory) -> ApiResult<()> {
        validate_new_category(category)?;
        let request = self
            .client
            .put(&format!("/api/categories/{id}"))?
            .multipart(category_form(category)?);
        self.client.send_unit(request).await?;
        info!(category_id = %id, "Category updated");
        Ok(())
    }

    pub async fn delete(&self, id: &ResourceId) -> ApiResult<()> {
        let request = self.client.delete(&format!("/api/categories/{id}"))?;
        self.client.send_unit(request).await?;
        info!(category_id = %id, "Category deleted");
        Ok(())
    }
}

fn category_form(category: &NewCategory) -> ApiResult<Form> {
    let mut form = Form::new().text("name", category.name.trim().to_string());
    if let Some(ref image) = category.image {
        form = form.part("file", file_part(image)?);
    }
    Ok(form)
}
