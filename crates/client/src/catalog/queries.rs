//! Request descriptors and backend query-string shapes.
//!
//! The backend expects bracketed query keys for pagination, field
//! selection, relation population and filters, e.g.
//! `pagination[page]=2&populate[category][fields][0]=title`.

use std::fmt;

use rust_decimal::Decimal;
use storefront_core::DocumentId;

use crate::http::QueryParams;

/// Default products per page when none is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Scalar product fields requested on list and detail queries.
const PRODUCT_FIELDS: &[&str] = &["title", "description", "price", "stock"];

/// Product list ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    TitleAsc,
    Newest,
}

impl ProductSort {
    /// Backend `sort` value.
    #[must_use]
    pub const fn as_param(self) -> &'static str {
        match self {
            Self::PriceAsc => "price:asc",
            Self::PriceDesc => "price:desc",
            Self::TitleAsc => "title:asc",
            Self::Newest => "createdAt:desc",
        }
    }
}

impl std::str::FromStr for ProductSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price-asc" | "price:asc" => Ok(Self::PriceAsc),
            "price-desc" | "price:desc" => Ok(Self::PriceDesc),
            "title" | "title:asc" => Ok(Self::TitleAsc),
            "newest" | "createdAt:desc" => Ok(Self::Newest),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Parameters of a product list query.
///
/// Two queries with equal fields share a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductQuery {
    /// Page number (1-indexed).
    pub page: u32,
    /// Products per page.
    pub page_size: u32,
    /// Category document ID.
    pub category: Option<DocumentId>,
    /// Inclusive lower price bound.
    pub min_price: Option<Decimal>,
    /// Inclusive upper price bound.
    pub max_price: Option<Decimal>,
    /// Case-insensitive title search.
    pub search: Option<String>,
    /// Ordering.
    pub sort: Option<ProductSort>,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            category: None,
            min_price: None,
            max_price: None,
            search: None,
            sort: None,
        }
    }
}

impl ProductQuery {
    /// First page with the given page size.
    #[must_use]
    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    /// Same filters, different page.
    #[must_use]
    pub fn at_page(&self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }

    /// Normalize user input: page at least 1, blank search dropped.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.page_size = self.page_size.max(1);
        self.search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self
    }

    /// Backend query string for `GET /products`.
    #[must_use]
    pub fn to_params(&self) -> QueryParams {
        let mut params = vec![
            param("pagination[page]", self.page),
            param("pagination[pageSize]", self.page_size),
        ];
        params.extend(product_populate_params());

        if let Some(category) = &self.category {
            params.push(param("filters[category][documentId][$eq]", category));
        }
        if let Some(min) = self.min_price {
            params.push(param("filters[price][$gte]", min));
        }
        if let Some(max) = self.max_price {
            params.push(param("filters[price][$lte]", max));
        }
        if let Some(search) = &self.search {
            params.push(param("filters[title][$containsi]", search));
        }
        if let Some(sort) = self.sort {
            params.push(param("sort", sort.as_param()));
        }
        params
    }
}

/// Canonical descriptor form: only set parameters, in a fixed order.
impl fmt::Display for ProductQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page={}&pageSize={}", self.page, self.page_size)?;
        if let Some(category) = &self.category {
            write!(f, "&category={category}")?;
        }
        if let Some(min) = self.min_price {
            write!(f, "&minPrice={min}")?;
        }
        if let Some(max) = self.max_price {
            write!(f, "&maxPrice={max}")?;
        }
        if let Some(search) = &self.search {
            write!(f, "&search={search}")?;
        }
        if let Some(sort) = self.sort {
            write!(f, "&sort={}", sort.as_param())?;
        }
        Ok(())
    }
}

fn param(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}

/// Field selection and relation population shared by product queries.
#[must_use]
pub fn product_populate_params() -> QueryParams {
    let mut params: QueryParams = PRODUCT_FIELDS
        .iter()
        .enumerate()
        .map(|(i, field)| param(&format!("fields[{i}]"), field))
        .collect();
    params.push(param("populate[thumbnail][fields][0]", "url"));
    params.push(param("populate[category][fields][0]", "title"));
    params
}

/// Query string for `GET /categories`.
#[must_use]
pub fn category_params() -> QueryParams {
    vec![param("fields[0]", "title"), param("sort", "title:asc")]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has(params: &QueryParams, key: &str, value: &str) -> bool {
        params.iter().any(|(k, v)| k == key && v == value)
    }

    #[test]
    fn test_default_list_params() {
        let params = ProductQuery::default().to_params();
        assert!(has(&params, "pagination[page]", "1"));
        assert!(has(&params, "pagination[pageSize]", "12"));
        assert!(has(&params, "fields[0]", "title"));
        assert!(has(&params, "fields[3]", "stock"));
        assert!(has(&params, "populate[thumbnail][fields][0]", "url"));
        assert!(has(&params, "populate[category][fields][0]", "title"));
        assert!(!params.iter().any(|(k, _)| k.starts_with("filters")));
    }

    #[test]
    fn test_filter_params() {
        let query = ProductQuery {
            page: 3,
            category: Some(DocumentId::new("cat-9")),
            min_price: Some(Decimal::new(10, 0)),
            max_price: Some(Decimal::new(2550, 2)),
            search: Some("candle".to_string()),
            sort: Some(ProductSort::PriceDesc),
            ..ProductQuery::default()
        };
        let params = query.to_params();
        assert!(has(&params, "pagination[page]", "3"));
        assert!(has(&params, "filters[category][documentId][$eq]", "cat-9"));
        assert!(has(&params, "filters[price][$gte]", "10"));
        assert!(has(&params, "filters[price][$lte]", "25.50"));
        assert!(has(&params, "filters[title][$containsi]", "candle"));
        assert!(has(&params, "sort", "price:desc"));
    }

    #[test]
    fn test_canonical_form_lists_only_set_parameters() {
        let query = ProductQuery {
            page: 2,
            search: Some("mug".to_string()),
            ..ProductQuery::default()
        };
        assert_eq!(query.to_string(), "page=2&pageSize=12&search=mug");
    }

    #[test]
    fn test_normalized() {
        let query = ProductQuery {
            page: 0,
            search: Some("   ".to_string()),
            ..ProductQuery::default()
        }
        .normalized();
        assert_eq!(query.page, 1);
        assert_eq!(query.search, None);
    }

    #[test]
    fn test_at_page_keeps_filters() {
        let query = ProductQuery {
            category: Some(DocumentId::new("cat-1")),
            ..ProductQuery::default()
        };
        let next = query.at_page(2);
        assert_eq!(next.page, 2);
        assert_eq!(next.category, query.category);
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!("price-asc".parse::<ProductSort>(), Ok(ProductSort::PriceAsc));
        assert!("cheapest".parse::<ProductSort>().is_err());
    }
}
