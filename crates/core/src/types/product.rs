//! Catalog domain types.
//!
//! These are the clean domain shapes; the client crate converts the raw
//! backend envelopes into them.

use serde::{Deserialize, Serialize};

use super::id::{CategoryId, DocumentId, ProductId, UserId};
use super::price::Price;
use crate::pagination::{PageItem, page_window};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category {
    /// Numeric ID.
    pub id: CategoryId,
    /// Stable document ID (used for filtering).
    pub document_id: DocumentId,
    /// Display title.
    pub title: String,
}

/// A product snapshot.
///
/// Snapshots embedded in the cart are never refreshed; the catalog cache
/// may hold a newer copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Numeric ID (cart key and cache tag).
    pub id: ProductId,
    /// Stable document ID (detail/update/delete paths).
    pub document_id: DocumentId,
    /// Product title.
    pub title: String,
    /// Long-form description.
    pub description: Option<String>,
    /// Unit price.
    pub price: Price,
    /// Units in stock.
    pub stock: u32,
    /// Thumbnail URL fragment, relative to the media host.
    pub thumbnail: Option<String>,
    /// Owning category.
    pub category: Option<Category>,
}

impl Product {
    /// Whether any units are available.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Pagination metadata for a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Current page (1-indexed).
    pub page: u32,
    /// Items per page.
    pub page_size: u32,
    /// Total number of pages.
    pub page_count: u32,
    /// Total number of items across all pages.
    pub total: u32,
}

impl Pagination {
    /// Page-number window for rendering pagination controls.
    #[must_use]
    pub fn window(&self) -> Vec<PageItem> {
        page_window(self.page_count, self.page)
    }

    /// Whether a page follows this one.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.page_count
    }

    /// Whether a page precedes this one.
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// One page of products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductPage {
    /// Products on this page.
    pub products: Vec<Product>,
    /// Pagination metadata.
    pub pagination: Pagination,
}

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Numeric ID.
    pub id: UserId,
    /// Username.
    pub username: String,
    /// Email address.
    pub email: String,
}
