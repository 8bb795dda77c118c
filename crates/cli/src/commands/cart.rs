//! Cart commands.

use std::num::NonZeroU32;

use storefront_client::Storefront;
use storefront_core::{CartState, DocumentId, ProductId};

use super::CliError;

/// `sf cart show`
pub fn show(app: &Storefront) {
    print!("{}", render(&app.cart().snapshot()));
}

/// `sf cart add <documentId> [--qty N]`
///
/// Fetches the product first so the cart holds a current snapshot.
pub async fn add(app: &Storefront, document_id: &str, qty: u32) -> Result<(), CliError> {
    let quantity = NonZeroU32::new(qty)
        .ok_or_else(|| CliError::InvalidArgument("--qty must be at least 1".to_string()))?;
    let product = app
        .catalog()
        .get_product(&DocumentId::new(document_id))
        .await?;
    if !product.in_stock() {
        tracing::warn!(document_id, "Adding a sold-out product to the cart");
    }

    let title = product.title.clone();
    app.cart().add_to_cart(product, quantity)?;
    println!(
        "Added {qty} x {title}. Cart now holds {} item(s).",
        app.cart().total_count()
    );
    Ok(())
}

/// `sf cart remove <id>`
pub fn remove(app: &Storefront, id: i32) -> Result<(), CliError> {
    if app.cart().remove_from_cart(ProductId::new(id))? {
        println!("Removed product {id}.");
    } else {
        println!("Product {id} is not in the cart.");
    }
    Ok(())
}

/// `sf cart set <id> <qty>`
pub fn set_quantity(app: &Storefront, id: i32, qty: u32) -> Result<(), CliError> {
    if app.cart().update_quantity(ProductId::new(id), qty)? {
        println!("Product {id} quantity set to {qty}.");
    } else {
        println!("Product {id} is not in the cart.");
    }
    Ok(())
}

/// `sf cart clear`
pub fn clear(app: &Storefront) -> Result<(), CliError> {
    app.cart().clear()?;
    println!("Cart cleared.");
    Ok(())
}

fn render(cart: &CartState) -> String {
    if cart.is_empty() {
        return "Your cart is empty.\n".to_string();
    }
    let mut out = String::new();
    for entry in cart.entries() {
        out.push_str(&format!(
            "{:>5}  {:<32} {:>3} x {:>10} = ${:.2}\n",
            entry.product.id.as_i32(),
            entry.product.title,
            entry.quantity,
            entry.product.price.to_string(),
            entry.line_total(),
        ));
    }
    out.push_str(&format!(
        "{} item(s), subtotal ${:.2}\n",
        cart.total_count(),
        cart.subtotal()
    ));
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use storefront_core::{Price, Product};

    use super::*;

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&CartState::new()), "Your cart is empty.\n");
    }

    #[test]
    fn test_render_lines_and_subtotal() {
        let mut cart = CartState::new();
        cart.add(
            Product {
                id: ProductId::new(3),
                document_id: DocumentId::new("doc-3"),
                title: "Mug".to_string(),
                description: None,
                price: Price::from_cents(1250).unwrap(),
                stock: 5,
                thumbnail: None,
                category: None,
            },
            NonZeroU32::new(2).unwrap(),
        )
        .unwrap();
        let out = render(&cart);
        assert!(out.contains("Mug"));
        assert!(out.contains("= $25.00"));
        assert!(out.ends_with("2 item(s), subtotal $25.00\n"));
    }
}
