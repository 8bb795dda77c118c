//! Admin product commands.
//!
//! These require a stored session token; run `sf login` first.

use storefront_client::Storefront;
use storefront_core::DocumentId;

use super::CliError;

/// `sf admin delete <documentId>`
///
/// Looks the product up first to learn its numeric ID, which keys the
/// cache entries that the deletion invalidates.
pub async fn delete_product(app: &Storefront, document_id: &str) -> Result<(), CliError> {
    let document_id = DocumentId::new(document_id);
    let product = app.catalog().get_product(&document_id).await?;

    app.catalog()
        .delete_product(product.id, &document_id)
        .await?;
    println!("Deleted {} ({document_id}).", product.title);
    Ok(())
}
