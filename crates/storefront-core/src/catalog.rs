//! ============================================================================
//! Catalog Client - Read-only access to the product API
//! ============================================================================
//! Endpoints:
//! - GET /products              full product list (optionally ?limit=N)
//! - GET /products/{id}         one product, or nothing
//! - GET /products/categories   category names
//! - GET /products/category/{c} products in one category
//!
//! `ScopedCatalog` picks the limited or per-category endpoint for list loads.
//!
//! Non-2xx responses and bodies that are not the expected JSON are failures.
//! ============================================================================

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::config::StorefrontConfig;
use crate::types::{CatalogError, Product, ProductId};

/// Source of catalog data. The HTTP client is the production implementation;
/// controllers only see this trait.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn products(&self) -> Result<Vec<Product>, CatalogError>;

    /// `Ok(None)` when the catalog has no product with this id
    async fn product(&self, id: ProductId) -> Result<Option<Product>, CatalogError>;

    async fn categories(&self) -> Result<Vec<String>, CatalogError>;
}

/// HTTP client for the catalog service
pub struct CatalogClient {
    client: Client,
    base_url: String,
}

impl CatalogClient {
    /// Client for `base_url` with reqwest defaults
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Client built from configuration, with the configured request timeout
    pub fn from_config(config: &StorefrontConfig) -> Result<Self, CatalogError> {
        Self::with_timeout(&config.api_base, config.http_timeout())
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// First `limit` products
    pub async fn products_limited(&self, limit: u32) -> Result<Vec<Product>, CatalogError> {
        let url = format!("{}/products?limit={}", self.base_url, limit);
        self.get_json(&url).await
    }

    /// Products in one category, as filtered by the service
    pub async fn products_in_category(&self, category: &str) -> Result<Vec<Product>, CatalogError> {
        let url = format!(
            "{}/products/category/{}",
            self.base_url,
            urlencoding::encode(category)
        );
        self.get_json(&url).await
    }

    async fn get_body(&self, url: &str) -> Result<(StatusCode, String), CatalogError> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| CatalogError::Network(format!("GET {} failed: {}", url, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CatalogError::Network(format!("Failed to read response body: {}", e)))?;

        Ok((status, body))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, CatalogError> {
        let (status, body) = self.get_body(url).await?;
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }
        decode(&body)
    }
}

#[async_trait]
impl CatalogSource for CatalogClient {
    async fn products(&self) -> Result<Vec<Product>, CatalogError> {
        let url = format!("{}/products", self.base_url);
        self.get_json(&url).await
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        let url = format!("{}/products/{}", self.base_url, id);
        let (status, body) = self.get_body(&url).await?;

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }
        decode_optional(&body)
    }

    async fn categories(&self) -> Result<Vec<String>, CatalogError> {
        let url = format!("{}/products/categories", self.base_url);
        self.get_json(&url).await
    }
}

/// Product list narrowed on the service side: a category endpoint, a result
/// limit, or both. Single products and the category list pass straight
/// through to the client.
pub struct ScopedCatalog<'a> {
    client: &'a CatalogClient,
    category: Option<String>,
    limit: Option<u32>,
}

impl<'a> ScopedCatalog<'a> {
    pub fn new(client: &'a CatalogClient) -> Self {
        Self {
            client,
            category: None,
            limit: None,
        }
    }

    /// Fetch only this category's products
    pub fn category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    /// Fetch at most `limit` products
    pub fn limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit;
        self
    }
}

#[async_trait]
impl<'a> CatalogSource for ScopedCatalog<'a> {
    async fn products(&self) -> Result<Vec<Product>, CatalogError> {
        match (&self.category, self.limit) {
            (Some(category), limit) => {
                let mut products = self.client.products_in_category(category).await?;
                if let Some(limit) = limit {
                    products.truncate(limit as usize);
                }
                Ok(products)
            }
            (None, Some(limit)) => self.client.products_limited(limit).await,
            (None, None) => self.client.products().await,
        }
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        self.client.product(id).await
    }

    async fn categories(&self) -> Result<Vec<String>, CatalogError> {
        self.client.categories().await
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, CatalogError> {
    serde_json::from_str(body).map_err(|e| CatalogError::Decode(e.to_string()))
}

/// The service answers unknown ids with 200 and an empty (or `null`) body
fn decode_optional<T: DeserializeOwned>(body: &str) -> Result<Option<T>, CatalogError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    decode::<Option<T>>(body)
}
