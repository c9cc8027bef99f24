//! # Article Endpoints
//!
//! Articles are the one resource paged by the server: the listing returns
//! `{ "articles": [...], "totalCount": N }` and the caller derives the page
//! count with [`Page::total_pages`].

use reqwest::multipart::Form;
use storefront_core::validation::validate_new_article;
use storefront_core::{Article, ListQuery, NewArticle, Page, ResourceId};
use tracing::{debug, info};

use super::query_pairs;
use crate::client::{file_part, ApiClient};
use crate::error::ApiResult;

/// Article endpoints. Obtain via [`ApiClient::articles`].
#[derive(Debug, Clone, Copy)]
pub struct Articles<'a> {
    client: &'a ApiClient,
}

impl<'a> Articles<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Articles { client }
    }

    /// Lists articles.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let page = client.articles().list(&ListQuery::new().page(2, 5)).await?;
    /// println!("page 2 of {}", page.total_pages(5));
    /// ```
    pub async fn list(&self, query: &ListQuery) -> ApiResult<Page<Article>> {
        let pairs = query_pairs(query)?;
        let request = self.client.get("/api/articles")?.query(&pairs);

        let page: Page<Article> = self.client.send_json(request).await?;
        debug!(count = page.items.len(), total = page.total_count, "Fetched articles");
        Ok(page)
    }

    /// The `count` most recent articles (home page "featured" strip).
    pub async fn latest(&self, count: u32) -> ApiResult<Vec<Article>> {
        let query = ListQuery::new().limit(count).newest_first();
        let page = self.list(&query).await?;
        Ok(page.items)
    }

    pub async fn get(&self, id: &ResourceId) -> ApiResult<Article> {
        let request = self.client.get(&format!("/api/articles/{id}"))?;
        self.client.send_json(request).await
    }

    /// Publishes a new article (admin).
    pub async fn create(&self, article: &NewArticle) -> ApiResult<()> {
        validate_new_article(article)?;
        let request = self.client.post("/api/articles")?.multipart(article_form(article)?);
        self.client.send_unit(request).await?;
        info!(title = %article.title, published = article.published, "Article created");
        Ok(())
    }

    pub async fn update(&self, id: &ResourceId, article: &NewArticle) -> ApiResult<()> {
        validate_new_article(article)?;
        let request = self
            .client
            .put(&format!("/api/articles/{id}"))?
            .multipart(article_form(article)?);
        self.client.send_unit(request).await?;
        info!(article_id = %id, "Article updated");
        Ok(())
    }

    pub async fn delete(&self, id: &ResourceId) -> ApiResult<()> {
        let request = self.client.delete(&format!("/api/articles/{id}"))?;
        self.client.send_unit(request).await?;
        info!(article_id = %id, "Article deleted");
        Ok(())
    }
}

fn article_form(article: &NewArticle) -> ApiResult<Form> {
    let mut form = Form::new()
        .text("title", article.title.trim().to_string())
        .text("content", article.content.clone())
        .text("author", article.author.clone())
        .text("published", article.published.to_string());
    if let Some(ref image) = article.featured_image {
        form = form.part("featuredImage", file_part(image)?);
    }
    Ok(form)
}
