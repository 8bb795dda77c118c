//! Conversions from backend response envelopes to domain types.

use rust_decimal::Decimal;
use serde::Deserialize;
use storefront_core::{
    Category, CategoryId, DocumentId, Pagination, Price, Product, ProductId, ProductPage, User,
    UserId,
};

use crate::error::ApiError;

// =============================================================================
// Wire types
// =============================================================================

/// `{ data: [...], meta: {...} }` list envelope.
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub meta: Meta,
}

/// `{ data: {...} }` single-record envelope.
#[derive(Debug, Deserialize)]
pub struct SingleResponse<T> {
    pub data: T,
}

#[derive(Debug, Default, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub pagination: Option<PaginationData>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationData {
    pub page: u32,
    pub page_size: u32,
    pub page_count: u32,
    pub total: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductData {
    pub id: i32,
    pub document_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub thumbnail: Option<MediaData>,
    #[serde(default)]
    pub category: Option<CategoryData>,
}

#[derive(Debug, Deserialize)]
pub struct MediaData {
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryData {
    pub id: i32,
    pub document_id: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct UserData {
    pub id: i32,
    pub username: String,
    pub email: String,
}

/// `POST /auth/local` response.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub jwt: String,
    pub user: UserData,
}

// =============================================================================
// Conversions
// =============================================================================

pub fn convert_category(data: CategoryData) -> Category {
    Category {
        id: CategoryId::new(data.id),
        document_id: DocumentId::new(data.document_id),
        title: data.title,
    }
}

/// Convert a product record.
///
/// # Errors
///
/// Returns `ApiError::Decode` for a negative price or stock.
pub fn convert_product(data: ProductData) -> Result<Product, ApiError> {
    let price = Price::new(data.price)
        .map_err(|e| ApiError::Decode(format!("product {}: {e}", data.document_id)))?;
    let stock = u32::try_from(data.stock.unwrap_or(0)).map_err(|_| {
        ApiError::Decode(format!(
            "product {}: invalid stock {:?}",
            data.document_id, data.stock
        ))
    })?;

    Ok(Product {
        id: ProductId::new(data.id),
        document_id: DocumentId::new(data.document_id),
        title: data.title,
        description: data.description.filter(|d| !d.trim().is_empty()),
        price,
        stock,
        thumbnail: data.thumbnail.map(|m| m.url),
        category: data.category.map(convert_category),
    })
}

/// Convert a product list envelope into a page.
///
/// When the backend omits pagination metadata the page is treated as the
/// only one.
///
/// # Errors
///
/// Returns `ApiError::Decode` if any product fails to convert.
pub fn convert_product_page(
    response: ListResponse<ProductData>,
    requested_page: u32,
    requested_page_size: u32,
) -> Result<ProductPage, ApiError> {
    let products = response
        .data
        .into_iter()
        .map(convert_product)
        .collect::<Result<Vec<_>, _>>()?;

    let pagination = response.meta.pagination.map_or_else(
        || Pagination {
            page: requested_page,
            page_size: requested_page_size,
            page_count: u32::from(!products.is_empty()),
            total: u32::try_from(products.len()).unwrap_or(u32::MAX),
        },
        |p| Pagination {
            page: p.page,
            page_size: p.page_size,
            page_count: p.page_count,
            total: p.total,
        },
    );

    Ok(ProductPage {
        products,
        pagination,
    })
}

pub fn convert_user(data: UserData) -> User {
    User {
        id: UserId::new(data.id),
        username: data.username,
        email: data.email,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn product_json(id: i32) -> serde_json::Value {
        json!({
            "id": id,
            "documentId": format!("doc-{id}"),
            "title": format!("Product {id}"),
            "description": "",
            "price": 12.5,
            "stock": 4,
            "thumbnail": {"url": "/uploads/thumb.png"},
            "category": {"id": 2, "documentId": "cat-2", "title": "Candles"}
        })
    }

    #[test]
    fn test_convert_product() {
        let data: ProductData = serde_json::from_value(product_json(7)).unwrap();
        let product = convert_product(data).unwrap();
        assert_eq!(product.id, ProductId::new(7));
        assert_eq!(product.document_id.as_str(), "doc-7");
        assert_eq!(product.price.amount(), Decimal::new(125, 1));
        assert_eq!(product.description, None);
        assert_eq!(product.thumbnail.as_deref(), Some("/uploads/thumb.png"));
        assert_eq!(product.category.unwrap().title, "Candles");
    }

    #[test]
    fn test_negative_stock_is_decode_error() {
        let mut value = product_json(1);
        value["stock"] = json!(-2);
        let data: ProductData = serde_json::from_value(value).unwrap();
        assert!(matches!(convert_product(data), Err(ApiError::Decode(_))));
    }

    #[test]
    fn test_convert_page_with_meta() {
        let response: ListResponse<ProductData> = serde_json::from_value(json!({
            "data": [product_json(1), product_json(2)],
            "meta": {"pagination": {"page": 2, "pageSize": 2, "pageCount": 5, "total": 10}}
        }))
        .unwrap();
        let page = convert_product_page(response, 2, 2).unwrap();
        assert_eq!(page.products.len(), 2);
        assert_eq!(page.pagination.page_count, 5);
        assert!(page.pagination.has_next());
    }

    #[test]
    fn test_convert_page_without_meta() {
        let response: ListResponse<ProductData> =
            serde_json::from_value(json!({"data": [product_json(1)]})).unwrap();
        let page = convert_product_page(response, 1, 12).unwrap();
        assert_eq!(page.pagination.page_count, 1);
        assert_eq!(page.pagination.total, 1);
    }
}
