//! # Product Endpoints
//!
//! Catalogue reads for shoppers and multipart writes for the admin console.
//!
//! ## Catalogue Queries
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  list(query)                                                            │
//! │    GET /api/products?search=kopi&minPrice=10000&sortBy=price&order=asc  │
//! │                                                                         │
//! │  by_category(id, query)                                                 │
//! │    GET /api/products/category?categoryId=3                              │
//! │                                                                         │
//! │  related(product, n)                                                    │
//! │    by_category(product's category) minus the product itself, first n   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use reqwest::multipart::Form;
use storefront_core::validation::validate_new_product;
use storefront_core::{ListQuery, NewProduct, Page, Product, ResourceId};
use tracing::{debug, info};

use super::query_pairs;
use crate::client::{file_part, ApiClient};
use crate::error::ApiResult;

/// Product endpoints. Obtain via [`ApiClient::products`].
#[derive(Debug, Clone, Copy)]
pub struct Products<'a> {
    client: &'a ApiClient,
}

impl<'a> Products<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Products { client }
    }

    /// Lists products matching `query`.
    ///
    /// ## Arguments
    /// * `query` - Search text, price range, sort key/direction, paging.
    ///   Unset fields are not sent.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let query = ListQuery::new()
    ///     .search("kopi")
    ///     .price_range(Some(Price::from_rupiah(10_000)), None);
    /// let page = client.products().list(&query).await?;
    /// ```
    pub async fn list(&self, query: &ListQuery) -> ApiResult<Page<Product>> {
        let pairs = query_pairs(query)?;
        let request = self.client.get("/api/products")?.query(&pairs);

        let page: Page<Product> = self.client.send_json(request).await?;
        debug!(count = page.items.len(), total = page.total_count, "Fetched products");
        Ok(page)
    }

    /// Lists the products of one category.
    pub async fn by_category(
        &self,
        category_id: &ResourceId,
        query: &ListQuery,
    ) -> ApiResult<Page<Product>> {
        let mut pairs = query_pairs(query)?;
        pairs.push(("categoryId", category_id.to_string()));
        let request = self.client.get("/api/products/category")?.query(&pairs);

        let page: Page<Product> = self.client.send_json(request).await?;
        debug!(
            category_id = %category_id,
            count = page.items.len(),
            "Fetched products by category"
        );
        Ok(page)
    }

    /// Gets a single product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Product found
    /// * `Err(ApiError::NotFound)` - No such product
    pub async fn get(&self, id: &ResourceId) -> ApiResult<Product> {
        let request = self.client.get(&format!("/api/products/{id}"))?;
        self.client.send_json(request).await
    }

    /// Up to `limit` other products from the same category as `product`.
    ///
    /// A product without a category has no related products.
    pub async fn related(&self, product: &Product, limit: usize) -> ApiResult<Vec<Product>> {
        let Some(category_id) = product.effective_category_id() else {
            return Ok(Vec::new());
        };

        let page = self.by_category(category_id, &ListQuery::new()).await?;
        Ok(page
            .items
            .into_iter()
            .filter(|p| p.id != product.id)
            .take(limit)
            .collect())
    }

    /// Creates a product (admin).
    pub async fn create(&self, product: &NewProduct) -> ApiResult<()> {
        validate_new_product(product)?;
        let request = self.client.post("/api/products")?.multipart(product_form(product)?);
        self.client.send_unit(request).await?;
        info!(title = %product.title, "Product created");
        Ok(())
    }

    /// Replaces a product's fields (admin). The image is only sent when set.
    pub async fn update(&self, id: &ResourceId, product: &NewProduct) -> ApiResult<()> {
        validate_new_product(product)?;
        let request = self
            .client
            .put(&format!("/api/products/{id}"))?
            .multipart(product_form(product)?);
        self.client.send_unit(request).await?;
        info!(product_id = %id, "Product updated");
        Ok(())
    }

    /// Deletes a product (admin).
    pub async fn delete(&self, id: &ResourceId) -> ApiResult<()> {
        let request = self.client.delete(&format!("/api/products/{id}"))?;
        self.client.send_unit(request).await?;
        info!(product_id = %id, "Product deleted");
        Ok(())
    }
}

fn product_form(product: &NewProduct) -> ApiResult<Form> {
    let mut form = Form::new()
        .text("title", product.title.trim().to_string())
        .text("description", product.description.clone())
        .text("price", product.price.rupiah().to_string())
        .text("categoryId", product.category_id.to_string())
        .text("stock", product.stock.to_string());
    if let Some(ref image) = product.image {
        form = form.part("image", file_part(image)?);
    }
    Ok(form)
}
