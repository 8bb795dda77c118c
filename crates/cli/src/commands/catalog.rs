//! Catalog browsing commands.

use rust_decimal::Decimal;
use storefront_client::{ProductQuery, ProductSort, Storefront};
use storefront_core::{DocumentId, PageItem, Pagination, Product};

use super::CliError;

/// Filters for `sf products`.
pub struct ListFilters {
    pub page: u32,
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
    pub sort: Option<String>,
}

impl ListFilters {
    fn into_query(self, base: ProductQuery) -> Result<ProductQuery, CliError> {
        if let (Some(min), Some(max)) = (self.min_price, self.max_price)
            && min > max
        {
            return Err(CliError::InvalidArgument(format!(
                "--min {min} is greater than --max {max}"
            )));
        }
        let sort = self
            .sort
            .as_deref()
            .map(str::parse::<ProductSort>)
            .transpose()
            .map_err(CliError::InvalidArgument)?;

        Ok(ProductQuery {
            page: self.page,
            category: self.category.map(DocumentId::new),
            min_price: self.min_price,
            max_price: self.max_price,
            search: self.search,
            sort,
            ..base
        })
    }
}

/// `sf products`
pub async fn list_products(app: &Storefront, filters: ListFilters) -> Result<(), CliError> {
    let query = filters.into_query(app.catalog().default_query())?;
    let page = app.catalog().list_products(&query).await?;

    if page.products.is_empty() {
        println!("No products found.");
        return Ok(());
    }
    for product in &page.products {
        println!("{}", product_line(product));
    }
    println!();
    println!("{}", pager(&page.pagination));
    Ok(())
}

/// `sf product <documentId>`
pub async fn show_product(app: &Storefront, document_id: &str) -> Result<(), CliError> {
    let product = app
        .catalog()
        .get_product(&DocumentId::new(document_id))
        .await?;

    println!("{}", product.title);
    println!("  ID:       {} ({})", product.id, product.document_id);
    println!("  Price:    {}", product.price);
    println!("  Stock:    {}", product.stock);
    if let Some(category) = &product.category {
        println!("  Category: {}", category.title);
    }
    if let Some(thumbnail) = &product.thumbnail {
        println!("  Image:    {thumbnail}");
    }
    if let Some(description) = &product.description {
        println!();
        println!("{description}");
    }
    Ok(())
}

/// `sf categories`
pub async fn list_categories(app: &Storefront) -> Result<(), CliError> {
    for category in app.catalog().list_categories().await? {
        println!("{:<24} {}", category.document_id.as_str(), category.title);
    }
    Ok(())
}

fn product_line(product: &Product) -> String {
    let stock = if product.in_stock() {
        format!("{} in stock", product.stock)
    } else {
        "sold out".to_string()
    };
    format!(
        "{:>5}  {:<24} {:<32} {:>10}  {stock}",
        product.id.as_i32(),
        product.document_id.as_str(),
        product.title,
        product.price.to_string(),
    )
}

/// Render page links, e.g. `Page 5 of 10: 1 ... 4 [5] 6 ... 10`.
fn pager(pagination: &Pagination) -> String {
    let links = pagination
        .window()
        .into_iter()
        .map(|item| match item {
            PageItem::Page(n) if n == pagination.page => format!("[{n}]"),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "Page {} of {} ({} products): {links}",
        pagination.page, pagination.page_count, pagination.total
    )
}
