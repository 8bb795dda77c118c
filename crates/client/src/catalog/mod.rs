//! Catalog API: products and categories behind the query cache.
//!
//! Reads go through [`QueryCache`]; admin mutations invalidate the tags
//! they affect once the backend confirms them. A failed mutation leaves the
//! cache untouched.

pub mod cache;
pub mod conversions;
pub mod queries;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use storefront_core::{Category, DocumentId, Product, ProductId, ProductInput, ProductPage};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::http::{ApiClient, AuthMode};

pub use cache::{CacheValue, Descriptor, QueryCache, Snapshot, Tag, TagKind};
use conversions::{
    CategoryData, ListResponse, ProductData, SingleResponse, convert_category, convert_product,
    convert_product_page,
};
pub use queries::{ProductQuery, ProductSort};
use queries::{category_params, product_populate_params};

/// Product and category reads plus admin product mutations.
#[derive(Clone)]
pub struct CatalogClient {
    api: ApiClient,
    cache: QueryCache,
    page_size: u32,
}

/// Request body for product create/update.
#[derive(Debug, Serialize)]
struct ProductPayload<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(with = "rust_decimal::serde::float")]
    price: Decimal,
    stock: i64,
    category: Option<&'a DocumentId>,
}

impl<'a> From<&'a ProductInput> for ProductPayload<'a> {
    fn from(input: &'a ProductInput) -> Self {
        Self {
            title: input.title.trim(),
            description: input.description.as_deref(),
            price: input.price,
            stock: input.stock,
            category: input.category.as_ref(),
        }
    }
}

impl CatalogClient {
    /// Create a catalog client.
    #[must_use]
    pub const fn new(api: ApiClient, cache: QueryCache, page_size: u32) -> Self {
        Self {
            api,
            cache,
            page_size,
        }
    }

    /// Underlying query cache.
    #[must_use]
    pub const fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// A first-page query using the configured page size.
    #[must_use]
    pub fn default_query(&self) -> ProductQuery {
        ProductQuery::with_page_size(self.page_size)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get one page of products.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails; nothing is cached in that case.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, ApiError> {
        let query = query.clone().normalized();
        let descriptor = Descriptor::ProductList(query.clone());

        let value = self
            .cache
            .query(&descriptor, || {
                let query = query.clone();
                async move {
                    let response: ListResponse<ProductData> = self
                        .api
                        .get("/products", &query.to_params(), AuthMode::IfPresent)
                        .await?;
                    convert_product_page(response, query.page, query.page_size)
                        .map(CacheValue::Products)
                }
            })
            .await?;

        match value {
            CacheValue::Products(page) => Ok(page),
            other => Err(unexpected(&descriptor, &other)),
        }
    }

    /// Get a product by document ID.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` with status 404 if the product does not exist.
    #[instrument(skip(self), fields(document_id = %document_id))]
    pub async fn get_product(&self, document_id: &DocumentId) -> Result<Product, ApiError> {
        let descriptor = Descriptor::Product(document_id.clone());
        let path = format!("/products/{document_id}");
        let path = path.as_str();

        let value = self
            .cache
            .query(&descriptor, move || async move {
                let response: SingleResponse<ProductData> = self
                    .api
                    .get(path, &product_populate_params(), AuthMode::IfPresent)
                    .await?;
                convert_product(response.data).map(|p| CacheValue::Product(Box::new(p)))
            })
            .await?;

        match value {
            CacheValue::Product(product) => Ok(*product),
            other => Err(unexpected(&descriptor, &other)),
        }
    }

    /// Get all categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        let descriptor = Descriptor::Categories;

        let value = self
            .cache
            .query(&descriptor, move || async move {
                let response: ListResponse<CategoryData> = self
                    .api
                    .get("/categories", &category_params(), AuthMode::IfPresent)
                    .await?;
                Ok(CacheValue::Categories(
                    response.data.into_iter().map(convert_category).collect(),
                ))
            })
            .await?;

        match value {
            CacheValue::Categories(categories) => Ok(categories),
            other => Err(unexpected(&descriptor, &other)),
        }
    }

    // =========================================================================
    // Admin mutations
    // =========================================================================

    /// Delete a product.
    ///
    /// On success, product list pages and entries containing the product are
    /// marked stale before this returns.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` without a stored token, or the backend error.
    #[instrument(skip(self), fields(id = %id, document_id = %document_id))]
    pub async fn delete_product(&self, id: ProductId, document_id: &DocumentId) -> Result<(), ApiError> {
        self.api
            .delete(&format!("/products/{document_id}"), AuthMode::Required)
            .await?;

        let affected = self.cache.invalidate(&[Tag::PRODUCTS_LIST, Tag::product(id)]);
        info!(affected, "Product deleted");
        Ok(())
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the input fails form rules (no request is
    /// sent), `Unauthenticated` without a token, or the backend error.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_product(&self, input: &ProductInput) -> Result<Product, ApiError> {
        input.validate()?;
        let body = json!({ "data": ProductPayload::from(input) });

        let response: SingleResponse<ProductData> = self
            .api
            .post("/products", &product_populate_params(), &body, AuthMode::Required)
            .await?;
        let product = convert_product(response.data)?;

        self.cache.invalidate(&[Tag::PRODUCTS_LIST]);
        info!(id = %product.id, "Product created");
        Ok(product)
    }

    /// Update a product.
    ///
    /// # Errors
    ///
    /// Same as [`CatalogClient::create_product`], plus 404 for an unknown ID.
    #[instrument(skip(self, input), fields(document_id = %document_id))]
    pub async fn update_product(
        &self,
        document_id: &DocumentId,
        input: &ProductInput,
    ) -> Result<Product, ApiError> {
        input.validate()?;
        let body = json!({ "data": ProductPayload::from(input) });

        let response: SingleResponse<ProductData> = self
            .api
            .put(
                &format!("/products/{document_id}"),
                &product_populate_params(),
                &body,
                AuthMode::Required,
            )
            .await?;
        let product = convert_product(response.data)?;

        self.cache
            .invalidate(&[Tag::PRODUCTS_LIST, Tag::product(product.id)]);
        info!(id = %product.id, "Product updated");
        Ok(product)
    }
}

fn unexpected(descriptor: &Descriptor, value: &CacheValue) -> ApiError {
    ApiError::Decode(format!(
        "cache entry for {descriptor} holds {}",
        match value {
            CacheValue::Products(_) => "a product page",
            CacheValue::Product(_) => "a product",
            CacheValue::Categories(_) => "categories",
        }
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_payload_shape() {
        let input = ProductInput {
            title: "  Mug ".to_string(),
            description: None,
            price: Decimal::new(1250, 2),
            stock: 3,
            category: Some(DocumentId::new("cat-1")),
        };
        let body = json!({ "data": ProductPayload::from(&input) });
        assert_eq!(
            body,
            json!({"data": {"title": "Mug", "price": 12.5, "stock": 3, "category": "cat-1"}})
        );
    }
}
